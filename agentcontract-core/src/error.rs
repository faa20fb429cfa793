//! Error types for AgentContract operations

use crate::replay::StubError;

/// Result type for AgentContract operations
pub type Result<T> = std::result::Result<T, ContractError>;

/// Error types for recording, persisting and replaying trajectories
///
/// Assertion and policy failures are not errors; they are reported as
/// [`CheckResult`](crate::assertions::CheckResult) values.
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    /// A turn carried a role outside the closed role set
    #[error("Invalid turn role: {0:?}")]
    InvalidRole(String),

    /// A cassette turn had no role
    #[error("Turn is missing required field 'role'")]
    MissingRole,

    /// The cassette document is not shaped like a run
    #[error("Invalid cassette: {0}")]
    InvalidCassette(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Replay stub refused a call
    #[error("Replay error: {0}")]
    Replay(#[from] StubError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Whether this error came from role validation (ingestion or decode)
    pub fn is_role_error(&self) -> bool {
        matches!(self, ContractError::InvalidRole(_) | ContractError::MissingRole)
    }
}
