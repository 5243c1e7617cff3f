use thiserror::Error;

/// Broadcast operation errors
#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Message violates broadcast contract: {0}")]
    ContractViolation(#[from] validator::ValidationErrors),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Transport is not connected")]
    Closed,
}

/// Result type for broadcast operations
pub type BroadcastResult<T> = Result<T, BroadcastError>;
