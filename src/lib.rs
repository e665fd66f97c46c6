//! Bonding-curve purchase client
//!
//! Keeps a live price/supply quote for a bonding-curve token sale, guards it
//! against stale view rounds, and submits purchases through a wallet
//! capability with a payment consistent with the quote observed at
//! submission time.

pub mod config;
pub mod coordinator;
pub mod endpoints;
pub mod errors;
pub mod explorer;
pub mod metrics;
pub mod observability;
pub mod quote;
pub mod submitter;
pub mod view_client;
pub mod wallet;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::{
    PurchaseAttempt, PurchaseCoordinator, PurchaseOutcome, PurchasePhase, RoundOutcome, SkipReason,
    StatusSnapshot,
};
pub use errors::{PurchaseError, ViewError, WalletError};
pub use quote::{compute_quote, Observation, Quantity, QuoteState};
pub use view_client::{HttpViewClient, ViewClient};
pub use wallet::{Account, SimulatedWallet, SubmittedTransaction, WalletCapability};
