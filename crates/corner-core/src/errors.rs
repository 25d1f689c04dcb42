//! Error types for Open Corner

use thiserror::Error;

/// Core errors that can occur in Open Corner
#[derive(Debug, Error)]
pub enum Error {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors talking to the external ledger, its signer, or its indexer.
///
/// These are kept apart from pool-math errors: they may be transient and
/// worth retrying, pool-math errors never are.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger unreachable at {url}")]
    Unreachable { url: String },

    #[error("Ledger RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Failed to parse ledger response: {0}")]
    ParseError(String),

    #[error("Object not found: {id}")]
    ObjectNotFound { id: String },

    #[error("Invalid object ID: {id}")]
    InvalidObjectId { id: String },

    #[error("Ledger request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("No transaction signer configured")]
    SignerUnavailable,

    #[error("Transaction rejected: {message}")]
    Rejected { message: String },
}

impl LedgerError {
    /// Get an HTTP-friendly error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unreachable { .. } => "ledger_unreachable",
            Self::Rpc { .. } => "ledger_rpc_error",
            Self::ParseError(_) => "ledger_parse_error",
            Self::ObjectNotFound { .. } => "object_not_found",
            Self::InvalidObjectId { .. } => "invalid_object_id",
            Self::Timeout { .. } => "ledger_timeout",
            Self::SignerUnavailable => "signer_unavailable",
            Self::Rejected { .. } => "transaction_rejected",
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidObjectId { .. } => 400,
            Self::ObjectNotFound { .. } => 404,
            Self::Timeout { .. } => 504,
            Self::SignerUnavailable => 503,
            Self::Unreachable { .. }
            | Self::Rpc { .. }
            | Self::ParseError(_)
            | Self::Rejected { .. } => 502,
        }
    }

    /// A timed-out call may still have landed on the ledger
    pub fn outcome_unknown(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_error_codes() {
        let err = LedgerError::Timeout { secs: 30 };
        assert_eq!(err.error_code(), "ledger_timeout");
        assert_eq!(err.status_code(), 504);
        assert!(err.outcome_unknown());

        let err = LedgerError::Rejected {
            message: "MoveAbort".into(),
        };
        assert_eq!(err.error_code(), "transaction_rejected");
        assert_eq!(err.status_code(), 502);
        assert!(!err.outcome_unknown());
    }

    #[test]
    fn test_error_from_ledger() {
        let err: Error = LedgerError::SignerUnavailable.into();
        assert_eq!(err.to_string(), "Ledger error: No transaction signer configured");
    }
}
