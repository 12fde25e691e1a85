use thiserror::Error;

/// The main error type for stager operations
#[derive(Debug, Error)]
pub enum StagerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Schema error: {0}")]
    Schema(String),

    /// Rejected before any task or operation exists (unsupported version, bad layout).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The target is not in a state the operation may touch. Nothing was written.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Required host configuration is missing.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("A task is currently active: {0}")]
    TaskActive(String),

    #[error("Task error: {0}")]
    Task(String),

    #[error("Operation error: {0}")]
    Operation(String),
}

/// Result type alias for stager operations
pub type StagerResult<T> = Result<T, StagerError>;
