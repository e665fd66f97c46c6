//! Purchase coordinator
//!
//! Owns the requested quantity, the latest applied observation, the quote
//! derived from both, the purchase phase and the last purchase outcome.
//!
//! ## Rounds
//!
//! Every quantity change (and every explicit refresh) starts a new view
//! round tagged with a monotonically increasing id. When a round finishes
//! its result is applied only if its id is still the latest issued one;
//! otherwise it is dropped. In-flight queries are never cancelled, only
//! their effect is suppressed.
//!
//! ## Purchases
//!
//! `Idle -> Buying -> (Succeeded | Failed)`. Purchase triggers while
//! `Buying` are ignored. The state lock is never held across an await.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{Config, ContractConfig, ExplorerConfig};
use crate::errors::PurchaseError;
use crate::explorer;
use crate::metrics::metrics;
use crate::observability::CorrelationId;
use crate::quote::{Observation, Quantity, QuoteState};
use crate::submitter::PurchaseSubmitter;
use crate::view_client::{fetch_round, ViewClient};
use crate::wallet::WalletCapability;

/// Purchase lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchasePhase {
    Idle,
    Buying,
    Succeeded,
    Failed,
}

/// Result of the most recent purchase attempt; replaced, never merged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOutcome {
    pub transaction_reference: Option<String>,
    pub error_message: Option<String>,
    pub success_message: Option<String>,
}

impl PurchaseOutcome {
    fn succeeded(hash: String, message: String) -> Self {
        Self {
            transaction_reference: Some(hash),
            error_message: None,
            success_message: Some(message),
        }
    }

    fn failed(message: String) -> Self {
        Self {
            transaction_reference: None,
            error_message: Some(message),
            success_message: None,
        }
    }
}

/// What happened to a view round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    /// Latest round succeeded; quote updated
    Applied,
    /// Latest round failed; quote reset to unavailable
    Unavailable,
    /// A newer round started while this one was in flight; result dropped
    Superseded,
    /// Quantity did not change; no round was started
    Unchanged,
}

/// Why a purchase trigger did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotConnected,
    Busy,
}

/// Result of a purchase trigger
#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseAttempt {
    Succeeded { hash: String },
    Failed { message: String },
    Skipped(SkipReason),
}

#[derive(Debug)]
struct CoordinatorState {
    quantity: Quantity,
    latest_round: u64,
    observation: Option<Observation>,
    quote: QuoteState,
    phase: PurchasePhase,
    outcome: PurchaseOutcome,
}

impl CoordinatorState {
    /// Bump the round id and recompute the quote for `quantity` from the
    /// last applied observation while the new round is in flight.
    fn begin_round(&mut self, quantity: Quantity) -> u64 {
        self.quantity = quantity;
        self.latest_round += 1;
        self.quote = QuoteState::derive(self.observation.as_ref(), quantity, true);
        self.latest_round
    }
}

/// Returns the phase to `Idle` if a purchase future is dropped before it
/// records an outcome.
struct BuyingGuard<'a> {
    state: &'a Mutex<CoordinatorState>,
    armed: bool,
}

impl BuyingGuard<'_> {
    fn complete(mut self, phase: PurchasePhase, outcome: Option<PurchaseOutcome>) {
        let mut state = self.state.lock();
        state.phase = phase;
        if let Some(outcome) = outcome {
            state.outcome = outcome;
        }
        drop(state);
        self.armed = false;
    }
}

impl Drop for BuyingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.state.lock();
            if state.phase == PurchasePhase::Buying {
                state.phase = PurchasePhase::Idle;
            }
        }
    }
}

/// Point-in-time view of everything a UI renders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub account: Option<String>,
    pub token_symbol: String,
    pub quantity: Quantity,
    pub quote: QuoteState,
    pub phase: PurchasePhase,
    pub outcome: PurchaseOutcome,
    pub can_purchase: bool,
    pub explorer_url: Option<String>,
}

const PLACEHOLDER: &str = "—";

fn or_placeholder<T: fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| PLACEHOLDER.to_string())
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.account {
            Some(address) => writeln!(f, "Connected: {}", explorer::short_address(address))?,
            None => writeln!(f, "Wallet: Not connected")?,
        }
        writeln!(
            f,
            "Base Price: {} | Supply: {} | Est. Payment: {} (x{} {})",
            or_placeholder(self.quote.base_price),
            or_placeholder(self.quote.supply),
            or_placeholder(self.quote.estimated_payment),
            self.quantity,
            self.token_symbol,
        )?;
        if let Some(error) = &self.outcome.error_message {
            writeln!(f, "Error: {}", error)?;
        }
        if let Some(success) = &self.outcome.success_message {
            writeln!(f, "{}", success)?;
        }
        if let Some(url) = &self.explorer_url {
            writeln!(f, "Transaction: {}", url)?;
        }
        Ok(())
    }
}

pub struct PurchaseCoordinator<V: ?Sized, W: ?Sized> {
    view: Arc<V>,
    submitter: PurchaseSubmitter<W>,
    contract: ContractConfig,
    explorer: ExplorerConfig,
    fallback_unit_payment: f64,
    state: Mutex<CoordinatorState>,
}

impl<V, W> PurchaseCoordinator<V, W>
where
    V: ViewClient + ?Sized,
    W: WalletCapability + ?Sized,
{
    pub fn new(view: Arc<V>, wallet: Arc<W>, config: &Config) -> Self {
        Self {
            view,
            submitter: PurchaseSubmitter::new(wallet, config.contract.buy_function()),
            contract: config.contract.clone(),
            explorer: config.explorer.clone(),
            fallback_unit_payment: config.purchase.fallback_unit_payment,
            state: Mutex::new(CoordinatorState {
                quantity: Quantity::ONE,
                latest_round: 0,
                observation: None,
                quote: QuoteState::unavailable(),
                phase: PurchasePhase::Idle,
                outcome: PurchaseOutcome::default(),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Quote side
    // ------------------------------------------------------------------

    /// Clamp `n` to `>= 1`, store it and run a view round for it.
    ///
    /// Setting the quantity it already has does not start another round.
    pub async fn set_quantity(&self, n: i64) -> RoundOutcome {
        self.update_quantity(Quantity::new(n)).await
    }

    /// Same as [`set_quantity`](Self::set_quantity) for raw text input
    pub async fn set_quantity_input(&self, raw: &str) -> RoundOutcome {
        self.update_quantity(Quantity::parse_input(raw)).await
    }

    async fn update_quantity(&self, quantity: Quantity) -> RoundOutcome {
        let round = {
            let mut state = self.state.lock();
            if state.quantity == quantity && state.latest_round > 0 {
                debug!(quantity = %quantity, "Quantity unchanged, no new round");
                return RoundOutcome::Unchanged;
            }
            state.begin_round(quantity)
        };
        self.run_round(round, quantity).await
    }

    /// Start a round for the current quantity (initial load, periodic refresh)
    pub async fn refresh(&self) -> RoundOutcome {
        let (round, quantity) = {
            let mut state = self.state.lock();
            let quantity = state.quantity;
            (state.begin_round(quantity), quantity)
        };
        self.run_round(round, quantity).await
    }

    async fn run_round(&self, round: u64, quantity: Quantity) -> RoundOutcome {
        metrics().rounds_started.inc();
        debug!(round, quantity = %quantity, "View round started");

        let result = fetch_round(self.view.as_ref(), &self.contract).await;

        let mut state = self.state.lock();
        if round != state.latest_round {
            metrics().rounds_superseded.inc();
            debug!(round, latest = state.latest_round, "Discarding superseded view round");
            return RoundOutcome::Superseded;
        }

        match result {
            Ok(observation) => {
                metrics().rounds_applied.inc();
                state.observation = Some(observation);
                state.quote = QuoteState::derive(Some(&observation), state.quantity, false);
                debug!(
                    round,
                    base_price = observation.base_price,
                    supply = observation.supply,
                    estimated_payment = ?state.quote.estimated_payment,
                    "View round applied"
                );
                RoundOutcome::Applied
            }
            Err(e) => {
                metrics().rounds_failed.inc();
                warn!(round, error = %e, "Failed to fetch price/supply");
                state.observation = None;
                state.quote = QuoteState::unavailable();
                RoundOutcome::Unavailable
            }
        }
    }

    pub fn quantity(&self) -> Quantity {
        self.state.lock().quantity
    }

    pub fn quote(&self) -> QuoteState {
        self.state.lock().quote
    }

    // ------------------------------------------------------------------
    // Purchase side
    // ------------------------------------------------------------------

    /// Buy exactly one unit
    pub async fn buy_one(&self) -> PurchaseAttempt {
        self.purchase(Quantity::ONE).await
    }

    /// Buy the currently requested quantity
    pub async fn buy_current_quantity(&self) -> PurchaseAttempt {
        let quantity = self.quantity();
        self.purchase(quantity).await
    }

    /// Quote-based payment, or `fallback_unit_payment * quantity` when no
    /// quote is available. Returns whether the fallback was used.
    fn payment_for(&self, observation: Option<&Observation>, quantity: Quantity) -> (f64, bool) {
        match observation.and_then(|obs| obs.payment_for(quantity)) {
            Some(payment) => (payment, false),
            None => (self.fallback_unit_payment * quantity.get() as f64, true),
        }
    }

    async fn purchase(&self, quantity: Quantity) -> PurchaseAttempt {
        if self.submitter.wallet().current_account().is_none() {
            debug!("Purchase ignored: no active account");
            return PurchaseAttempt::Skipped(SkipReason::NotConnected);
        }

        let (guard, payment, used_fallback) = {
            let mut state = self.state.lock();
            if state.phase == PurchasePhase::Buying {
                metrics().purchases_rejected_busy.inc();
                debug!("Purchase ignored: another purchase is in flight");
                return PurchaseAttempt::Skipped(SkipReason::Busy);
            }
            state.phase = PurchasePhase::Buying;
            let (payment, used_fallback) = self.payment_for(state.observation.as_ref(), quantity);
            let guard = BuyingGuard {
                state: &self.state,
                armed: true,
            };
            (guard, payment, used_fallback)
        };

        let correlation_id = CorrelationId::new();
        if used_fallback {
            metrics().purchases_fallback_payment.inc();
            warn!(
                correlation_id = %correlation_id,
                quantity = %quantity,
                payment,
                "No quote available, using fallback payment"
            );
        }

        let symbol = self.contract.token_symbol.clone();
        match self.submitter.buy(&symbol, quantity, payment, &correlation_id).await {
            Ok(tx) => {
                let message = format!("Successfully bought {} {}", quantity, symbol);
                info!(correlation_id = %correlation_id, hash = %tx.hash, "{}", message);
                guard.complete(
                    PurchasePhase::Succeeded,
                    Some(PurchaseOutcome::succeeded(tx.hash.clone(), message)),
                );
                PurchaseAttempt::Succeeded { hash: tx.hash }
            }
            Err(PurchaseError::WalletNotConnected) => {
                // Account went away between the guard check and submission
                guard.complete(PurchasePhase::Idle, None);
                PurchaseAttempt::Skipped(SkipReason::NotConnected)
            }
            Err(e) => {
                let message = e.to_string();
                guard.complete(PurchasePhase::Failed, Some(PurchaseOutcome::failed(message.clone())));
                PurchaseAttempt::Failed { message }
            }
        }
    }

    pub fn phase(&self) -> PurchasePhase {
        self.state.lock().phase
    }

    pub fn is_buying(&self) -> bool {
        self.phase() == PurchasePhase::Buying
    }

    pub fn outcome(&self) -> PurchaseOutcome {
        self.state.lock().outcome.clone()
    }

    // ------------------------------------------------------------------
    // Wallet delegation
    // ------------------------------------------------------------------

    pub fn available_wallets(&self) -> Vec<String> {
        self.submitter.wallet().available_wallets()
    }

    /// Ask the wallet adapter to connect; failures are logged only
    pub async fn connect(&self, wallet_name: &str) -> bool {
        match self.submitter.wallet().connect(wallet_name).await {
            Ok(()) => {
                info!(wallet = %wallet_name, "Wallet connected");
                true
            }
            Err(e) => {
                warn!(wallet = %wallet_name, error = %e, "Connect error");
                false
            }
        }
    }

    /// Ask the wallet adapter to disconnect; failures are logged only
    pub async fn disconnect(&self) -> bool {
        match self.submitter.wallet().disconnect().await {
            Ok(()) => {
                info!("Wallet disconnected");
                true
            }
            Err(e) => {
                warn!(error = %e, "Disconnect error");
                false
            }
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let account = self.submitter.wallet().current_account();
        let state = self.state.lock();
        let explorer_url = state
            .outcome
            .transaction_reference
            .as_deref()
            .map(|hash| explorer::transaction_url(&self.explorer.host, &self.explorer.network, hash));

        StatusSnapshot {
            can_purchase: account.is_some()
                && state.phase != PurchasePhase::Buying
                && !state.quote.fetching,
            account: account.map(|a| a.address),
            token_symbol: self.contract.token_symbol.clone(),
            quantity: state.quantity,
            quote: state.quote,
            phase: state.phase,
            outcome: state.outcome.clone(),
            explorer_url,
        }
    }
}
