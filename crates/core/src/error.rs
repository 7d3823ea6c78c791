use thiserror::Error;

pub type RgrResult<T> = Result<T, RgrError>;

#[derive(Error, Debug)]
pub enum RgrError {
    /// Caller supplied something the engine refuses to act on. Never retried.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dataset error in {file}: {reason}")]
    Dataset { file: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl RgrError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Whether the error was caused by the request rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::NotFound(_))
    }
}

impl From<config::ConfigError> for RgrError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
