//! Purchase submitter
//!
//! Builds the `buy_token` entry-function payload and hands it to the wallet's
//! sign-and-submit capability. One call is exactly one submission attempt.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::PurchaseError;
use crate::metrics::{metrics, Timer};
use crate::observability::CorrelationId;
use crate::quote::Quantity;
use crate::wallet::{SubmittedTransaction, WalletCapability};

/// Purchase intent, built immediately before submission and never kept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub token_symbol: String,
    pub quantity: Quantity,
    pub payment: f64,
}

impl PurchaseRequest {
    pub fn new(token_symbol: &str, quantity: Quantity, payment: f64) -> Result<Self, PurchaseError> {
        if token_symbol.trim().is_empty() {
            return Err(PurchaseError::InvalidRequest("token symbol is empty".to_string()));
        }
        if !payment.is_finite() || payment < 0.0 {
            return Err(PurchaseError::InvalidRequest(format!(
                "payment must be a finite non-negative number, got {}",
                payment
            )));
        }
        if payment.ceil() > u64::MAX as f64 {
            return Err(PurchaseError::InvalidRequest(format!("payment {} overflows u64", payment)));
        }
        Ok(Self {
            token_symbol: token_symbol.to_string(),
            quantity,
            payment,
        })
    }

    /// On-chain amount. Fractions are rounded up so the transaction never
    /// underpays the estimate.
    pub fn payment_amount(&self) -> u64 {
        self.payment.ceil() as u64
    }
}

/// Entry-function payload handed to the wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub function: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<Value>,
}

impl TransactionRequest {
    /// `buy_token(symbol, quantity, payment)`; integers are sent as strings
    pub fn buy(function: &str, purchase: &PurchaseRequest) -> Self {
        Self {
            function: function.to_string(),
            type_arguments: Vec::new(),
            arguments: vec![
                Value::String(purchase.token_symbol.clone()),
                Value::String(purchase.quantity.get().to_string()),
                Value::String(purchase.payment_amount().to_string()),
            ],
        }
    }
}

pub struct PurchaseSubmitter<W: ?Sized> {
    wallet: Arc<W>,
    buy_function: String,
}

impl<W> PurchaseSubmitter<W>
where
    W: WalletCapability + ?Sized,
{
    pub fn new(wallet: Arc<W>, buy_function: impl Into<String>) -> Self {
        Self {
            wallet,
            buy_function: buy_function.into(),
        }
    }

    pub fn wallet(&self) -> &Arc<W> {
        &self.wallet
    }

    /// Submit one purchase transaction
    pub async fn buy(
        &self,
        token_symbol: &str,
        quantity: Quantity,
        payment: f64,
        correlation_id: &CorrelationId,
    ) -> Result<SubmittedTransaction, PurchaseError> {
        let account = self
            .wallet
            .current_account()
            .ok_or(PurchaseError::WalletNotConnected)?;

        let purchase = PurchaseRequest::new(token_symbol, quantity, payment)?;
        let request = TransactionRequest::buy(&self.buy_function, &purchase);
        debug!(
            correlation_id = %correlation_id,
            function = %request.function,
            arguments = ?request.arguments,
            "Built purchase transaction"
        );

        info!(
            correlation_id = %correlation_id,
            account = %account.address,
            token = %purchase.token_symbol,
            quantity = %purchase.quantity,
            payment = purchase.payment_amount(),
            "Submitting purchase transaction"
        );

        let timer = Timer::new();
        metrics().purchases_attempted.inc();
        let result = self.wallet.sign_and_submit(request).await;
        timer.observe_duration(&metrics().purchase_latency);

        match result {
            Ok(tx) => {
                metrics().purchases_succeeded.inc();
                info!(
                    correlation_id = %correlation_id,
                    hash = %tx.hash,
                    latency_ms = (timer.elapsed_secs() * 1000.0) as u64,
                    "Purchase transaction accepted"
                );
                Ok(tx)
            }
            Err(e) => {
                metrics().purchases_failed.inc();
                warn!(correlation_id = %correlation_id, error = %e, "Purchase transaction failed");
                Err(e.into())
            }
        }
    }
}
