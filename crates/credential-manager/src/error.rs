//! Error types for credential manager operations

/// Errors from credential manager operations.
///
/// Expired tokens and rejected refresh tokens are not errors: they resolve
/// to `Ok(None)`, meaning the user must re-authorize.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Token(#[from] oauth_token::Error),

    #[error("unable to store state: {0}")]
    StateNotStored(oauth_token::Error),
}

impl Error {
    /// Malformed caller input (scope, field or state value).
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Error::Token(
                oauth_token::Error::InvalidScope(_)
                    | oauth_token::Error::MissingField(_)
                    | oauth_token::Error::InvalidField { .. }
                    | oauth_token::Error::InvalidState
            )
        )
    }

    /// A persistence operation failed.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Error::StateNotStored(_)
                | Error::Token(
                    oauth_token::Error::Storage(_)
                        | oauth_token::Error::Io(_)
                        | oauth_token::Error::Serialization(_)
                )
        )
    }
}

/// Result alias for credential manager operations.
pub type Result<T> = std::result::Result<T, Error>;
