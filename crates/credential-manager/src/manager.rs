//! Credential lifecycle state machine
//!
//! All state lives in `Storage`; the manager only holds its fixed
//! configuration. Each operation is one sequential read/decide/write pass
//! with at most one call to the token endpoint:
//!
//! - cached access token, not expired → returned as-is
//! - cached access token, expired → deleted, then treated as absent
//! - no access token, refresh token present → exchanged; on success the new
//!   access token (and rotated refresh token, if any) is stored; on failure
//!   the refresh token is deleted as revoked
//! - nothing usable → `None`, the user must re-authorize
//!
//! No locking across calls: two concurrent refreshes for the same key can
//! both consume the refresh token. Callers that care serialize externally.

use std::sync::Arc;

use oauth_token::{
    AccessToken, AuthState, ClientConfig, Context, RefreshToken, Scope, Storage, TokenExchanger,
    TokenIdentity, TokenResponse,
};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::metrics;
use crate::random::{RandomStateGenerator, StateGenerator};

/// Decides whether cached credentials are usable, refreshes them when they
/// are not, and issues CSRF states for authorization redirects.
pub struct CredentialManager {
    client_config_id: String,
    client_config: Arc<dyn ClientConfig>,
    storage: Arc<dyn Storage>,
    exchanger: Arc<dyn TokenExchanger>,
    clock: Arc<dyn Clock>,
    state_generator: Arc<dyn StateGenerator>,
}

impl CredentialManager {
    /// Create a manager for one client configuration.
    ///
    /// Uses the system clock and a cryptographic state generator; see
    /// `with_clock` and `with_state_generator` to substitute them.
    pub fn new(
        client_config_id: impl Into<String>,
        client_config: Arc<dyn ClientConfig>,
        storage: Arc<dyn Storage>,
        exchanger: Arc<dyn TokenExchanger>,
    ) -> Result<Self> {
        let client_config_id = client_config_id.into();
        if client_config_id.is_empty() {
            return Err(oauth_token::Error::InvalidField {
                field: "client_config_id",
                reason: "needs to be a non-empty string".into(),
            }
            .into());
        }
        Ok(Self {
            client_config_id,
            client_config,
            storage,
            exchanger,
            clock: Arc::new(SystemClock),
            state_generator: Arc::new(RandomStateGenerator),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_state_generator(mut self, state_generator: Arc<dyn StateGenerator>) -> Self {
        self.state_generator = state_generator;
        self
    }

    pub fn client_config_id(&self) -> &str {
        &self.client_config_id
    }

    /// Stored refresh token for the context, if any. No side effects.
    pub async fn get_refresh_token(&self, context: &Context) -> Result<Option<RefreshToken>> {
        let scope = context.lookup_scope();
        Ok(self
            .storage
            .get_refresh_token(&self.client_config_id, context.user_id(), &scope)
            .await?)
    }

    /// A usable access token for the context, refreshing if necessary.
    ///
    /// `Ok(None)` means no credential is available and the authorization
    /// flow has to run again.
    pub async fn get_access_token(&self, context: &Context) -> Result<Option<AccessToken>> {
        let scope = context.lookup_scope();
        let user_id = context.user_id();

        if let Some(token) = self
            .storage
            .get_access_token(&self.client_config_id, user_id, &scope)
            .await?
        {
            if !token.is_expired(self.clock.now()) {
                debug!(
                    client_config_id = %self.client_config_id,
                    user_id,
                    scope = %scope,
                    expires_at = token.expires_at(),
                    "access token cache hit"
                );
                metrics::record_lookup("hit");
                return Ok(Some(token));
            }

            debug!(
                client_config_id = %self.client_config_id,
                user_id,
                scope = %scope,
                "access token expired, deleting"
            );
            metrics::record_lookup("expired");
            self.storage.delete_access_token(&token).await?;
        } else {
            metrics::record_lookup("miss");
        }

        let Some(refresh_token) = self.get_refresh_token(context).await? else {
            debug!(
                client_config_id = %self.client_config_id,
                user_id,
                scope = %scope,
                "no refresh token, re-authorization required"
            );
            return Ok(None);
        };

        let response = match self
            .exchanger
            .exchange_refresh_token(refresh_token.refresh_token())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                // Treated as revocation: transient and permanent failures look the same here
                warn!(
                    client_config_id = %self.client_config_id,
                    user_id,
                    scope = %scope,
                    error = %e,
                    "refresh token exchange failed, deleting refresh token"
                );
                metrics::record_refresh("failure");
                self.storage.delete_refresh_token(&refresh_token).await?;
                return Ok(None);
            }
        };
        metrics::record_refresh("success");

        let access_token = self.store_exchanged(context, scope, response).await?;
        info!(
            client_config_id = %self.client_config_id,
            user_id,
            scope = %access_token.scope(),
            expires_in = access_token.expires_in(),
            "access token refreshed"
        );
        Ok(Some(access_token))
    }

    /// Persist the tokens from a successful exchange.
    ///
    /// The effective scope is the one the server reports, falling back to the
    /// requested scope. A refresh token is only written when the server
    /// rotated it.
    async fn store_exchanged(
        &self,
        context: &Context,
        requested: Scope,
        response: TokenResponse,
    ) -> Result<AccessToken> {
        let scope = match response.scope.as_deref() {
            Some(raw) if !raw.is_empty() => Scope::parse(raw)?,
            _ => requested,
        };
        let now = self.clock.now();
        let identity = TokenIdentity::new(&self.client_config_id, context.user_id(), scope)?;

        let access_token = AccessToken::new(
            identity.clone(),
            response.access_token,
            response.token_type,
            now,
            response.expires_in,
        )?;
        self.storage.store_access_token(access_token.clone()).await?;

        if let Some(rotated) = response.refresh_token {
            let refresh_token = RefreshToken::new(identity, rotated, now)?;
            self.storage.store_refresh_token(refresh_token).await?;
            debug!(
                client_config_id = %self.client_config_id,
                user_id = context.user_id(),
                "stored rotated refresh token"
            );
        }

        Ok(access_token)
    }

    /// Delete the access token `get_access_token` would return.
    ///
    /// This resolves the token first, so an expired token with a valid
    /// refresh token is refreshed and the fresh token deleted. Use
    /// [`discard_access_token`](Self::discard_access_token) to delete without
    /// touching the token endpoint.
    pub async fn delete_access_token(&self, context: &Context) -> Result<()> {
        if let Some(token) = self.get_access_token(context).await? {
            self.storage.delete_access_token(&token).await?;
        }
        Ok(())
    }

    /// Delete the stored access token for the context, if any, without
    /// refreshing.
    pub async fn discard_access_token(&self, context: &Context) -> Result<()> {
        let scope = context.lookup_scope();
        if let Some(token) = self
            .storage
            .get_access_token(&self.client_config_id, context.user_id(), &scope)
            .await?
        {
            self.storage.delete_access_token(&token).await?;
        }
        Ok(())
    }

    pub async fn delete_refresh_token(&self, context: &Context) -> Result<()> {
        if let Some(token) = self.get_refresh_token(context).await? {
            self.storage.delete_refresh_token(&token).await?;
        }
        Ok(())
    }

    /// Issue a fresh CSRF state and build the authorization redirect URI.
    ///
    /// `state_value` overrides the generated value; it must be non-empty. Any
    /// previous state for the user is deleted first, so only the most recent
    /// redirect can complete.
    pub async fn get_authorize_uri(
        &self,
        context: &Context,
        state_value: Option<&str>,
    ) -> Result<String> {
        let state_value = match state_value {
            None => self.state_generator.generate(),
            Some("") => return Err(oauth_token::Error::InvalidState.into()),
            Some(value) => value.to_owned(),
        };

        self.storage
            .delete_state_for_user(&self.client_config_id, context.user_id())
            .await?;

        let identity = TokenIdentity::new(
            &self.client_config_id,
            context.user_id(),
            context.lookup_scope(),
        )?;
        let state = AuthState::new(identity, self.clock.now(), state_value)?;
        let uri = build_authorize_uri(self.client_config.as_ref(), state.state(), context.scope());
        self.storage
            .store_state(state)
            .await
            .map_err(Error::StateNotStored)?;

        info!(
            client_config_id = %self.client_config_id,
            user_id = context.user_id(),
            "issued authorization state"
        );
        Ok(uri)
    }
}

/// Append the authorization request parameters to the authorize endpoint.
fn build_authorize_uri(config: &dyn ClientConfig, state: &str, scope: Option<&Scope>) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query
        .append_pair("client_id", config.client_id())
        .append_pair("response_type", "code")
        .append_pair("state", state);
    if let Some(scope) = scope {
        query.append_pair("scope", scope.as_str());
    }
    if let Some(redirect_uri) = config.redirect_uri() {
        query.append_pair("redirect_uri", redirect_uri);
    }

    let endpoint = config.authorize_endpoint();
    let separator = if endpoint.contains('?') { '&' } else { '?' };
    format!("{endpoint}{separator}{}", query.finish())
}
