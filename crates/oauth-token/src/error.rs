//! Error types for token, storage and exchange operations

/// Errors from token construction, storage and token endpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid scope '{0}'")]
    InvalidScope(String),

    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("state should be a non-empty string")]
    InvalidState,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    pub(crate) fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Result alias for token operations.
pub type Result<T> = std::result::Result<T, Error>;
