//! Error types for the Enumivo SDK.
//!
//! This module provides a unified error type [`EnuError`] that encompasses
//! all possible errors that can occur when using the SDK.

use thiserror::Error;

/// A specialized Result type for Enumivo SDK operations.
pub type EnuResult<T> = Result<T, EnuError>;

/// The main error type for the Enumivo SDK.
///
/// This enum covers all possible error conditions that can occur when
/// assembling, signing, or broadcasting transactions through this SDK.
#[derive(Error, Debug)]
pub enum EnuError {
    /// Error occurred during HTTP communication
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Error occurred during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error occurred during URL parsing
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Error occurred during hex encoding/decoding
    #[error("Hex error: {0}")]
    Hex(#[from] hex::FromHexError),

    /// No ABI is cached for the account and no raw ABI was supplied
    #[error("ABI for account {0} is not cached")]
    NotCached(String),

    /// An ABI document failed to parse or validate
    #[error("Invalid ABI for account {account}: {message}")]
    InvalidAbi {
        /// Account the ABI belongs to
        account: String,
        /// What was wrong with the document
        message: String,
    },

    /// A structured action payload is missing a field its ABI struct requires
    #[error("Missing field `{field}` in `{type_name}`")]
    MissingField {
        /// The ABI struct being encoded
        type_name: String,
        /// The absent field
        field: String,
    },

    /// An asset amount does not match the declared symbol precision
    #[error("Precision mismatch: `{value}` does not match symbol `{expected}`")]
    PrecisionMismatch {
        /// The offending asset string
        value: String,
        /// The expected symbol, as `precision,CODE`
        expected: String,
    },

    /// A transaction-level option was requested while a transaction was
    /// already being assembled
    #[error("callback during a transaction")]
    NestedCallback,

    /// Key negotiation completed without producing any usable private key
    #[error("No signing key available for this transaction")]
    NoSigningKey,

    /// Invalid account, action, or permission name
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Invalid asset or symbol literal
    #[error("Invalid asset: {0}")]
    InvalidAsset(String),

    /// Invalid private or public key material
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Invalid signature material
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Wire serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Transaction assembly error
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// API returned an error response
    #[error("API error ({status_code}): {message}")]
    Api {
        /// HTTP status code
        status_code: u16,
        /// Error message from the node
        message: String,
        /// Optional error code from the node
        error_code: Option<u64>,
    },

    /// Mock broadcast was configured to fail
    #[error("fake error: mock broadcast rejected transaction {0}")]
    MockFailure(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EnuError {
    /// Creates a new invalid-ABI error.
    pub fn invalid_abi(account: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidAbi {
            account: account.into(),
            message: message.into(),
        }
    }

    /// Creates a new missing-field error.
    pub fn missing_field(type_name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            type_name: type_name.into(),
            field: field.into(),
        }
    }

    /// Creates a new serialization error.
    pub fn serialize(msg: impl Into<String>) -> Self {
        Self::Serialize(msg.into())
    }

    /// Creates a new transaction error.
    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }

    /// Creates a new API error from response details.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
            error_code: None,
        }
    }

    /// Creates a new API error with the node's error code.
    pub fn api_with_code(
        status_code: u16,
        message: impl Into<String>,
        error_code: Option<u64>,
    ) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
            error_code,
        }
    }

    /// Returns true if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotCached(_)
                | Self::Api {
                    status_code: 404,
                    ..
                }
        )
    }

    /// Returns true if this is a transient error that might succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status_code, .. } => {
                matches!(status_code, 429 | 500 | 502 | 503 | 504)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EnuError::InvalidName("INVALID".to_string());
        assert_eq!(err.to_string(), "Invalid name: INVALID");
    }

    #[test]
    fn test_not_cached_display() {
        let err = EnuError::NotCached("enu.msig".to_string());
        assert!(err.to_string().contains("not cached"));
        assert!(err.to_string().contains("enu.msig"));
    }

    #[test]
    fn test_nested_callback_display() {
        let err = EnuError::NestedCallback;
        assert_eq!(err.to_string(), "callback during a transaction");
    }

    #[test]
    fn test_mock_failure_contains_marker() {
        let err = EnuError::MockFailure("abc123".to_string());
        assert!(err.to_string().contains("fake error"));
        assert!(err.to_string().contains("abc123"));
    }

    #[test]
    fn test_is_not_found() {
        assert!(EnuError::NotCached("currency".to_string()).is_not_found());
        assert!(EnuError::api(404, "not found").is_not_found());
        assert!(!EnuError::api(500, "server error").is_not_found());
    }

    #[test]
    fn test_is_retryable() {
        assert!(EnuError::api(429, "rate limited").is_retryable());
        assert!(EnuError::api(503, "unavailable").is_retryable());
        assert!(EnuError::api(500, "internal error").is_retryable());
        assert!(!EnuError::api(400, "bad request").is_retryable());
        assert!(!EnuError::NoSigningKey.is_retryable());
    }

    #[test]
    fn test_missing_field() {
        let err = EnuError::missing_field("transfer", "quantity");
        assert!(err.to_string().contains("quantity"));
        assert!(err.to_string().contains("transfer"));
    }

    #[test]
    fn test_precision_mismatch_display() {
        let err = EnuError::PrecisionMismatch {
            value: "10000.00 SYM".to_string(),
            expected: "0,SYM".to_string(),
        };
        assert!(err.to_string().contains("Precision mismatch"));
        assert!(err.to_string().contains("10000.00 SYM"));
    }

    #[test]
    fn test_api_error_with_code() {
        let err = EnuError::api_with_code(500, "unknown key", Some(3_060_003));
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("unknown key"));
    }
}
