//! Error types for spider_select.
//!
//! These cover failures of the collaborators and of configuration. The
//! selection pipeline itself never returns them: it folds them into a typed
//! [`SelectionResult`](crate::SelectionResult) failure.

/// Errors raised by configuration checks and external collaborators.
#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    /// Configuration is inconsistent.
    #[error("invalid config: {0}")]
    Config(String),
    /// The model provider failed.
    #[error("model error: {0}")]
    Model(String),
    /// The model provider is rate limited.
    #[error("rate limit exceeded")]
    RateLimited,
    /// A call exceeded its time budget.
    #[error("request timed out")]
    Timeout,
    /// The snapshot provider failed.
    #[error("snapshot error: {0}")]
    Snapshot(String),
    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for spider_select operations.
pub type SelectResult<T> = Result<T, SelectError>;
