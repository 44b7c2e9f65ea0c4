//! Error types for the Reelhouse wagering backend
//!
//! One root error carries the wager taxonomy plus the storage and
//! configuration failures that can surface underneath it.

use crate::money::Money;
use thiserror::Error;

/// Root error type for all Reelhouse operations
#[derive(Debug, Error)]
pub enum CasinoError {
    /// Non-numeric, negative or non-finite bet / coin value
    #[error("Invalid wager: {0}")]
    InvalidWager(String),

    /// Balance does not cover the bet amount
    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: Money, required: Money },

    /// Account key could not be resolved
    #[error("Account not found: {0}")]
    NotFound(String),

    /// Game id is absent from the catalog
    #[error("Unknown game: {0}")]
    UnknownGame(String),

    /// Storage failure during a read or a commit
    #[error("Persistence error: {0}")]
    Persistence(#[from] StorageError),

    /// Configuration or catalog problems (startup only)
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The transaction did not settle within the request deadline
    #[error("Request timed out after {0}ms")]
    Timeout(u64),
}

/// Storage system errors
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Database open failed: {0}")]
    DatabaseOpenFailed(String),
    #[error("Read failed: {0}")]
    ReadFailed(String),
    #[error("Write failed: {0}")]
    WriteFailed(String),
    #[error("Corrupted data: {0}")]
    CorruptedData(String),
}

/// Configuration and validation errors
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),
    #[error("Missing required field: {0}")]
    MissingRequired(String),
    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
    #[error("Invalid game catalog: {0}")]
    InvalidCatalog(String),
}

impl CasinoError {
    /// Message safe to hand back to a client. Internal causes stay in the logs.
    pub fn client_message(&self) -> String {
        match self {
            CasinoError::InvalidWager(_) => "Invalid bet or coin value.".to_string(),
            CasinoError::InsufficientFunds { .. } => "Insufficient balance.".to_string(),
            CasinoError::NotFound(_) => "Account not found.".to_string(),
            CasinoError::UnknownGame(id) => format!("Unknown game '{}'.", id),
            CasinoError::Persistence(_) | CasinoError::Timeout(_) => {
                "Storage is unavailable, please retry.".to_string()
            }
            CasinoError::Configuration(_) => "Server misconfigured.".to_string(),
        }
    }

    /// Stable code used in logs and error payloads
    pub fn code(&self) -> &'static str {
        match self {
            CasinoError::InvalidWager(_) => "INVALID_WAGER",
            CasinoError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            CasinoError::NotFound(_) => "NOT_FOUND",
            CasinoError::UnknownGame(_) => "UNKNOWN_GAME",
            CasinoError::Persistence(_) | CasinoError::Timeout(_) => "PERSISTENCE_ERROR",
            CasinoError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }
}

// External error conversions
impl From<rocksdb::Error> for StorageError {
    fn from(e: rocksdb::Error) -> Self {
        StorageError::WriteFailed(e.to_string())
    }
}

impl From<rocksdb::Error> for CasinoError {
    fn from(e: rocksdb::Error) -> Self {
        CasinoError::Persistence(e.into())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::CorruptedData(e.to_string())
    }
}

impl From<toml::de::Error> for ConfigurationError {
    fn from(e: toml::de::Error) -> Self {
        ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e))
    }
}

impl From<tokio::task::JoinError> for StorageError {
    fn from(e: tokio::task::JoinError) -> Self {
        StorageError::ReadFailed(format!("storage task failed: {}", e))
    }
}

/// Convenience type alias for Results
pub type CasinoResult<T> = Result<T, CasinoError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let err = CasinoError::InsufficientFunds {
            balance: Money::from_cents(5),
            required: Money::from_cents(10),
        };

        assert!(err.to_string().contains("balance 0.05"));
        assert!(err.to_string().contains("required 0.10"));
    }

    #[test]
    fn test_storage_error_is_persistence() {
        let err: CasinoError = StorageError::WriteFailed("disk full".to_string()).into();

        match &err {
            CasinoError::Persistence(StorageError::WriteFailed(_)) => {}
            _ => panic!("Expected persistence error"),
        }
        assert!(err.source().is_some());
        assert_eq!(err.code(), "PERSISTENCE_ERROR");
    }

    #[test]
    fn test_client_message_hides_internal_cause() {
        let err: CasinoError = StorageError::CorruptedData("row 17: trailing bytes".to_string()).into();
        assert!(!err.client_message().contains("row 17"));

        let timeout = CasinoError::Timeout(5000);
        assert_eq!(timeout.client_message(), err.client_message());
    }

    #[test]
    fn test_unknown_game_message_names_game() {
        let err = CasinoError::UnknownGame("lucky-7".to_string());
        assert!(err.client_message().contains("lucky-7"));
        assert_eq!(err.code(), "UNKNOWN_GAME");
    }
}
