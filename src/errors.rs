//! Error types for view queries, the wallet capability and purchases
//!
//! Every asynchronous failure in this crate ends up as one of these and is
//! converted into coordinator state at the boundary that issued it. Nothing
//! here is retried automatically.

use thiserror::Error;

/// Failure of a read-only view query round
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewError {
    /// The node answered with a non-success HTTP status
    #[error("View call failed: {status} (function: {function})")]
    Network {
        /// Numeric HTTP status returned by the node
        status: u16,
        function: String,
    },

    /// The request never produced a response (DNS, TLS, connection reset, timeout)
    #[error("View transport error: {message} (function: {function})")]
    Transport { function: String, message: String },

    /// The node responded but the value list could not be read as a number
    #[error("Undecodable view response for {function}: {reason}")]
    Decode { function: String, reason: String },
}

impl ViewError {
    /// HTTP status carried by the error, if the node produced one
    pub fn status(&self) -> Option<u16> {
        match self {
            ViewError::Network { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Fully qualified view function the failing query targeted
    pub fn function(&self) -> &str {
        match self {
            ViewError::Network { function, .. }
            | ViewError::Transport { function, .. }
            | ViewError::Decode { function, .. } => function,
        }
    }
}

/// Errors reported by the wallet capability
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("No active wallet account")]
    NotConnected,

    /// The user declined the signature request
    #[error("User rejected the request: {0}")]
    Rejected(String),

    /// Anything else the adapter or the node reported (insufficient funds,
    /// node rejection, unknown wallet name)
    #[error("{0}")]
    Adapter(String),
}

/// Purchase submission failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PurchaseError {
    #[error("Wallet not connected")]
    WalletNotConnected,

    /// The wallet or the node refused the purchase transaction
    #[error("Purchase failed: {0}")]
    Submission(String),

    /// The request was malformed before it reached the wallet
    #[error("Invalid purchase request: {0}")]
    InvalidRequest(String),
}

impl From<WalletError> for PurchaseError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::NotConnected => PurchaseError::WalletNotConnected,
            other => PurchaseError::Submission(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_error_keeps_status() {
        let err = ViewError::Network {
            status: 500,
            function: "0x1::BondingCurve::get_token_price".to_string(),
        };

        assert_eq!(err.status(), Some(500));
        assert_eq!(err.function(), "0x1::BondingCurve::get_token_price");
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_decode_error_has_no_status() {
        let err = ViewError::Decode {
            function: "f".to_string(),
            reason: "empty".to_string(),
        };
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_wallet_error_conversion() {
        assert_eq!(
            PurchaseError::from(WalletError::NotConnected),
            PurchaseError::WalletNotConnected
        );

        let converted = PurchaseError::from(WalletError::Rejected("closed popup".to_string()));
        assert_eq!(
            converted,
            PurchaseError::Submission("User rejected the request: closed popup".to_string())
        );
    }
}
