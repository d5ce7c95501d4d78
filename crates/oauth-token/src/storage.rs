//! Storage contract for tokens and CSRF states
//!
//! The credential manager depends only on this trait. Every record is keyed
//! by `(client_config_id, user_id, scope)`, except states which are keyed by
//! `(client_config_id, user_id)` alone. The in-memory and file backends share
//! the `Tables` representation defined here.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::scope::Scope;
use crate::state::AuthState;
use crate::token::{AccessToken, RefreshToken, TokenIdentity};

pub type StorageFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Persistence backend for access tokens, refresh tokens and auth states.
///
/// Implementations must give read-your-writes consistency per key. Storing a
/// record replaces any record under the same key. Deleting a token removes
/// the stored record only if it still holds the same token value, so a
/// caller holding a stale copy cannot delete a newer token.
pub trait Storage: Send + Sync {
    fn get_access_token<'a>(
        &'a self,
        client_config_id: &'a str,
        user_id: &'a str,
        scope: &'a Scope,
    ) -> StorageFuture<'a, Option<AccessToken>>;

    fn store_access_token(&self, token: AccessToken) -> StorageFuture<'_, ()>;

    fn delete_access_token<'a>(&'a self, token: &'a AccessToken) -> StorageFuture<'a, ()>;

    fn get_refresh_token<'a>(
        &'a self,
        client_config_id: &'a str,
        user_id: &'a str,
        scope: &'a Scope,
    ) -> StorageFuture<'a, Option<RefreshToken>>;

    fn store_refresh_token(&self, token: RefreshToken) -> StorageFuture<'_, ()>;

    fn delete_refresh_token<'a>(&'a self, token: &'a RefreshToken) -> StorageFuture<'a, ()>;

    fn store_state(&self, state: AuthState) -> StorageFuture<'_, ()>;

    fn delete_state_for_user<'a>(
        &'a self,
        client_config_id: &'a str,
        user_id: &'a str,
    ) -> StorageFuture<'a, ()>;

    /// Used by the authorization callback handler to validate a returned
    /// `state` parameter.
    fn get_state_for_user<'a>(
        &'a self,
        client_config_id: &'a str,
        user_id: &'a str,
    ) -> StorageFuture<'a, Option<AuthState>>;
}

type StateKey = (String, String);

fn token_key(client_config_id: &str, user_id: &str, scope: &Scope) -> TokenIdentity {
    TokenIdentity::key(client_config_id, user_id, scope.clone())
}

fn state_key(client_config_id: &str, user_id: &str) -> StateKey {
    (client_config_id.to_owned(), user_id.to_owned())
}

/// The three keyed record tables backing a store.
#[derive(Debug, Default, Clone)]
pub(crate) struct Tables {
    access_tokens: HashMap<TokenIdentity, AccessToken>,
    refresh_tokens: HashMap<TokenIdentity, RefreshToken>,
    states: HashMap<StateKey, AuthState>,
}

/// On-disk layout: one list per record kind, sorted for stable output.
#[derive(Serialize)]
struct TablesRef<'a> {
    access_tokens: Vec<&'a AccessToken>,
    refresh_tokens: Vec<&'a RefreshToken>,
    states: Vec<&'a AuthState>,
}

#[derive(Deserialize)]
struct TablesOwned {
    #[serde(default)]
    access_tokens: Vec<AccessToken>,
    #[serde(default)]
    refresh_tokens: Vec<RefreshToken>,
    #[serde(default)]
    states: Vec<AuthState>,
}

impl Tables {
    pub(crate) fn from_json(contents: &str) -> Result<Self> {
        let owned: TablesOwned = serde_json::from_str(contents)
            .map_err(|e| Error::Serialization(format!("parsing token file: {e}")))?;
        let mut tables = Tables::default();
        for token in owned.access_tokens {
            tables.store_access_token(token);
        }
        for token in owned.refresh_tokens {
            tables.store_refresh_token(token);
        }
        for state in owned.states {
            tables.store_state(state);
        }
        Ok(tables)
    }

    pub(crate) fn to_json(&self) -> Result<String> {
        let mut access_tokens: Vec<_> = self.access_tokens.values().collect();
        access_tokens.sort_by(|a, b| sort_key(a.identity()).cmp(&sort_key(b.identity())));
        let mut refresh_tokens: Vec<_> = self.refresh_tokens.values().collect();
        refresh_tokens.sort_by(|a, b| sort_key(a.identity()).cmp(&sort_key(b.identity())));
        let mut states: Vec<_> = self.states.values().collect();
        states.sort_by(|a, b| sort_key(a.identity()).cmp(&sort_key(b.identity())));

        serde_json::to_string_pretty(&TablesRef {
            access_tokens,
            refresh_tokens,
            states,
        })
        .map_err(|e| Error::Serialization(format!("serializing token file: {e}")))
    }

    pub(crate) fn get_access_token(
        &self,
        client_config_id: &str,
        user_id: &str,
        scope: &Scope,
    ) -> Option<AccessToken> {
        self.access_tokens
            .get(&token_key(client_config_id, user_id, scope))
            .cloned()
    }

    pub(crate) fn store_access_token(&mut self, token: AccessToken) {
        self.access_tokens.insert(token.identity().clone(), token);
    }

    /// Returns whether a record was removed.
    pub(crate) fn delete_access_token(&mut self, token: &AccessToken) -> bool {
        let matches = self
            .access_tokens
            .get(token.identity())
            .is_some_and(|stored| stored.access_token() == token.access_token());
        if matches {
            self.access_tokens.remove(token.identity());
        }
        matches
    }

    pub(crate) fn get_refresh_token(
        &self,
        client_config_id: &str,
        user_id: &str,
        scope: &Scope,
    ) -> Option<RefreshToken> {
        self.refresh_tokens
            .get(&token_key(client_config_id, user_id, scope))
            .cloned()
    }

    pub(crate) fn store_refresh_token(&mut self, token: RefreshToken) {
        self.refresh_tokens.insert(token.identity().clone(), token);
    }

    pub(crate) fn delete_refresh_token(&mut self, token: &RefreshToken) -> bool {
        let matches = self
            .refresh_tokens
            .get(token.identity())
            .is_some_and(|stored| stored.refresh_token() == token.refresh_token());
        if matches {
            self.refresh_tokens.remove(token.identity());
        }
        matches
    }

    pub(crate) fn store_state(&mut self, state: AuthState) {
        let key = state_key(state.client_config_id(), state.user_id());
        self.states.insert(key, state);
    }

    pub(crate) fn delete_state_for_user(&mut self, client_config_id: &str, user_id: &str) -> bool {
        self.states
            .remove(&state_key(client_config_id, user_id))
            .is_some()
    }

    pub(crate) fn get_state_for_user(&self, client_config_id: &str, user_id: &str) -> Option<AuthState> {
        self.states
            .get(&state_key(client_config_id, user_id))
            .cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.access_tokens.len() + self.refresh_tokens.len() + self.states.len()
    }
}

fn sort_key(identity: &TokenIdentity) -> (&str, &str, &str) {
    (
        identity.client_config_id(),
        identity.user_id(),
        identity.scope().as_str(),
    )
}
