//! Wallet capability
//!
//! The coordinator only sees this narrow interface. Connection lifecycle,
//! wallet selection, signing and broadcast belong to whatever adapter
//! implements it.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::WalletError;
use crate::submitter::TransactionRequest;

/// Connected wallet account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: String,
}

impl Account {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

/// Transaction accepted by the wallet/node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedTransaction {
    pub hash: String,
}

/// Sign-and-submit capability provided by a wallet adapter
#[async_trait]
pub trait WalletCapability: Send + Sync {
    /// Currently active account, if any
    fn current_account(&self) -> Option<Account>;

    /// Names of the wallets the adapter can connect to
    fn available_wallets(&self) -> Vec<String> {
        Vec::new()
    }

    async fn connect(&self, wallet_name: &str) -> Result<(), WalletError>;

    async fn disconnect(&self) -> Result<(), WalletError>;

    /// Sign and broadcast; resolves once the node accepted the transaction
    async fn sign_and_submit(&self, request: TransactionRequest) -> Result<SubmittedTransaction, WalletError>;
}

/// In-process wallet that accepts every request and returns synthetic hashes.
///
/// Nothing reaches a chain. Used for dry runs from the command line.
pub struct SimulatedWallet {
    wallets: Vec<String>,
    address: String,
    account: Mutex<Option<Account>>,
    submitted: Mutex<Vec<TransactionRequest>>,
}

impl SimulatedWallet {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            wallets: vec!["Simulated".to_string()],
            address: address.into(),
            account: Mutex::new(None),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Start already connected
    pub fn connected(address: impl Into<String>) -> Self {
        let wallet = Self::new(address);
        *wallet.account.lock() = Some(Account::new(wallet.address.clone()));
        wallet
    }

    /// Requests submitted so far
    pub fn submitted(&self) -> Vec<TransactionRequest> {
        self.submitted.lock().clone()
    }
}

#[async_trait]
impl WalletCapability for SimulatedWallet {
    fn current_account(&self) -> Option<Account> {
        self.account.lock().clone()
    }

    fn available_wallets(&self) -> Vec<String> {
        self.wallets.clone()
    }

    async fn connect(&self, wallet_name: &str) -> Result<(), WalletError> {
        if !self.wallets.iter().any(|w| w == wallet_name) {
            return Err(WalletError::Adapter(format!("Unknown wallet: {}", wallet_name)));
        }
        *self.account.lock() = Some(Account::new(self.address.clone()));
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        *self.account.lock() = None;
        Ok(())
    }

    async fn sign_and_submit(&self, request: TransactionRequest) -> Result<SubmittedTransaction, WalletError> {
        if self.account.lock().is_none() {
            return Err(WalletError::NotConnected);
        }
        self.submitted.lock().push(request);
        Ok(SubmittedTransaction {
            hash: format!("0x{}", Uuid::new_v4().simple()),
        })
    }
}
