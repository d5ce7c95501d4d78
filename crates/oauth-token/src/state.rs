//! CSRF state records for the authorization-code flow
//!
//! One live `AuthState` exists per `(client_config_id, user_id)`. Issuing a
//! new one replaces the old, which makes a state single-use per session
//! without any explicit invalidation step.

use serde::Serialize;
use subtle::ConstantTimeEq;

use crate::error::Result;
use crate::fields::{self, Fields, deserialize_from_fields};
use crate::scope::Scope;
use crate::token::TokenIdentity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthState {
    #[serde(flatten)]
    identity: TokenIdentity,
    issue_time: u64,
    state: String,
}

impl AuthState {
    pub fn new(identity: TokenIdentity, issue_time: u64, state: impl Into<String>) -> Result<Self> {
        Ok(Self {
            identity,
            issue_time: fields::positive("issue_time", issue_time)?,
            state: fields::non_empty("state", state.into())?,
        })
    }

    /// Build from a persisted field mapping.
    pub fn from_fields(f: &Fields) -> Result<Self> {
        Ok(Self {
            identity: TokenIdentity::from_fields(f)?,
            issue_time: fields::positive_integer(f, "issue_time")?,
            state: fields::non_empty_string(f, "state")?,
        })
    }

    pub fn identity(&self) -> &TokenIdentity {
        &self.identity
    }

    pub fn client_config_id(&self) -> &str {
        self.identity.client_config_id()
    }

    pub fn user_id(&self) -> &str {
        self.identity.user_id()
    }

    /// Scope requested when the authorization redirect was issued; empty when
    /// the request carried none.
    pub fn scope(&self) -> &Scope {
        self.identity.scope()
    }

    pub fn issue_time(&self) -> u64 {
        self.issue_time
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    /// Whether the `state` query parameter of a callback matches this record.
    ///
    /// Compared in constant time. Deleting the record after a successful
    /// match is the callback handler's job.
    pub fn matches(&self, callback_state: &str) -> bool {
        self.state.as_bytes().ct_eq(callback_state.as_bytes()).into()
    }
}

deserialize_from_fields!(AuthState);
