//! Request context: which user, which scope

use crate::error::{Error, Result};
use crate::scope::Scope;

/// Caller-supplied identification of the credential being requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    user_id: String,
    scope: Option<Scope>,
}

impl Context {
    /// Build a context, validating the user id and canonicalizing the scope.
    ///
    /// `Some("")` is an invalid scope; pass `None` to request no scope.
    pub fn new(user_id: impl Into<String>, scope: Option<&str>) -> Result<Self> {
        let user_id = user_id.into();
        if user_id.is_empty() {
            return Err(Error::invalid_field(
                "user_id",
                "needs to be a non-empty string",
            ));
        }
        let scope = scope.map(Scope::parse).transpose()?;
        Ok(Self { user_id, scope })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }

    /// Scope used as the storage key component: the empty scope when the
    /// context carries none.
    pub fn lookup_scope(&self) -> Scope {
        self.scope.clone().unwrap_or_default()
    }
}
