//! Access and refresh token value objects
//!
//! Both token kinds are immutable once constructed. Construction is the only
//! validation point: a token that exists is a token whose identity fields are
//! non-empty, whose scope is canonical and whose timestamps are sane.

use common::Secret;
use serde::Serialize;

use crate::error::Result;
use crate::fields::{self, Fields, deserialize_from_fields};
use crate::scope::Scope;

/// The storage key shared by every persisted record: which client
/// configuration, which user, which scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TokenIdentity {
    client_config_id: String,
    user_id: String,
    scope: Scope,
}

impl TokenIdentity {
    pub fn new(
        client_config_id: impl Into<String>,
        user_id: impl Into<String>,
        scope: Scope,
    ) -> Result<Self> {
        Ok(Self {
            client_config_id: fields::non_empty("client_config_id", client_config_id.into())?,
            user_id: fields::non_empty("user_id", user_id.into())?,
            scope,
        })
    }

    /// Lookup key; never persisted, so it skips validation.
    pub(crate) fn key(client_config_id: &str, user_id: &str, scope: Scope) -> Self {
        Self {
            client_config_id: client_config_id.to_owned(),
            user_id: user_id.to_owned(),
            scope,
        }
    }

    pub(crate) fn from_fields(f: &Fields) -> Result<Self> {
        Ok(Self {
            client_config_id: fields::non_empty_string(f, "client_config_id")?,
            user_id: fields::non_empty_string(f, "user_id")?,
            scope: fields::scope(f)?,
        })
    }

    pub fn client_config_id(&self) -> &str {
        &self.client_config_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Parse `raw` and compare it against this identity's canonical scope.
    pub fn has_scope(&self, raw: &str) -> Result<bool> {
        Ok(Scope::parse(raw)? == self.scope)
    }
}

/// A short-lived bearer credential.
///
/// Expiry is absolute: `issue_time + expires_in`, in Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessToken {
    #[serde(flatten)]
    identity: TokenIdentity,
    access_token: Secret<String>,
    token_type: String,
    issue_time: u64,
    expires_in: u64,
}

impl AccessToken {
    pub fn new(
        identity: TokenIdentity,
        access_token: impl Into<String>,
        token_type: impl Into<String>,
        issue_time: u64,
        expires_in: u64,
    ) -> Result<Self> {
        Ok(Self {
            identity,
            access_token: Secret::new(fields::non_empty("access_token", access_token.into())?),
            token_type: fields::non_empty("token_type", token_type.into())?,
            issue_time: fields::positive("issue_time", issue_time)?,
            expires_in,
        })
    }

    /// Build from a persisted field mapping.
    pub fn from_fields(f: &Fields) -> Result<Self> {
        Ok(Self {
            identity: TokenIdentity::from_fields(f)?,
            access_token: Secret::new(fields::non_empty_string(f, "access_token")?),
            token_type: fields::non_empty_string(f, "token_type")?,
            issue_time: fields::positive_integer(f, "issue_time")?,
            expires_in: fields::non_negative_integer(f, "expires_in")?,
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

    pub fn scope(&self) -> &Scope {
        self.identity.scope()
    }

    pub fn has_scope(&self, raw: &str) -> Result<bool> {
        self.identity.has_scope(raw)
    }

    /// The bearer value to present to the resource server.
    pub fn access_token(&self) -> &str {
        self.access_token.expose()
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    pub fn issue_time(&self) -> u64 {
        self.issue_time
    }

    pub fn expires_in(&self) -> u64 {
        self.expires_in
    }

    /// Absolute expiry as a Unix timestamp in seconds.
    pub fn expires_at(&self) -> u64 {
        self.issue_time.saturating_add(self.expires_in)
    }

    /// A token is no longer usable from the second it expires.
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at() <= now
    }
}

/// A long-lived credential used to obtain new access tokens.
///
/// Carries no expiry: it is valid until the authorization server rejects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshToken {
    #[serde(flatten)]
    identity: TokenIdentity,
    refresh_token: Secret<String>,
    issue_time: u64,
}

impl RefreshToken {
    pub fn new(
        identity: TokenIdentity,
        refresh_token: impl Into<String>,
        issue_time: u64,
    ) -> Result<Self> {
        Ok(Self {
            identity,
            refresh_token: Secret::new(fields::non_empty("refresh_token", refresh_token.into())?),
            issue_time: fields::positive("issue_time", issue_time)?,
        })
    }

    /// Build from a persisted field mapping.
    pub fn from_fields(f: &Fields) -> Result<Self> {
        Ok(Self {
            identity: TokenIdentity::from_fields(f)?,
            refresh_token: Secret::new(fields::non_empty_string(f, "refresh_token")?),
            issue_time: fields::positive_integer(f, "issue_time")?,
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

    pub fn scope(&self) -> &Scope {
        self.identity.scope()
    }

    pub fn has_scope(&self, raw: &str) -> Result<bool> {
        self.identity.has_scope(raw)
    }

    pub fn refresh_token(&self) -> &str {
        self.refresh_token.expose()
    }

    pub fn issue_time(&self) -> u64 {
        self.issue_time
    }
}

deserialize_from_fields!(AccessToken, RefreshToken);
