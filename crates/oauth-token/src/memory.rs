//! In-process storage backend

use tokio::sync::Mutex;
use tracing::debug;

use crate::scope::Scope;
use crate::state::AuthState;
use crate::storage::{Storage, StorageFuture, Tables};
use crate::token::{AccessToken, RefreshToken};

/// `Storage` kept entirely in memory. Contents are lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: Mutex<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored records across all tables.
    pub async fn len(&self) -> usize {
        self.tables.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Storage for MemoryStorage {
    fn get_access_token<'a>(
        &'a self,
        client_config_id: &'a str,
        user_id: &'a str,
        scope: &'a Scope,
    ) -> StorageFuture<'a, Option<AccessToken>> {
        Box::pin(async move {
            Ok(self
                .tables
                .lock()
                .await
                .get_access_token(client_config_id, user_id, scope))
        })
    }

    fn store_access_token(&self, token: AccessToken) -> StorageFuture<'_, ()> {
        Box::pin(async move {
            debug!(user_id = token.user_id(), scope = %token.scope(), "storing access token");
            self.tables.lock().await.store_access_token(token);
            Ok(())
        })
    }

    fn delete_access_token<'a>(&'a self, token: &'a AccessToken) -> StorageFuture<'a, ()> {
        Box::pin(async move {
            self.tables.lock().await.delete_access_token(token);
            Ok(())
        })
    }

    fn get_refresh_token<'a>(
        &'a self,
        client_config_id: &'a str,
        user_id: &'a str,
        scope: &'a Scope,
    ) -> StorageFuture<'a, Option<RefreshToken>> {
        Box::pin(async move {
            Ok(self
                .tables
                .lock()
                .await
                .get_refresh_token(client_config_id, user_id, scope))
        })
    }

    fn store_refresh_token(&self, token: RefreshToken) -> StorageFuture<'_, ()> {
        Box::pin(async move {
            debug!(user_id = token.user_id(), scope = %token.scope(), "storing refresh token");
            self.tables.lock().await.store_refresh_token(token);
            Ok(())
        })
    }

    fn delete_refresh_token<'a>(&'a self, token: &'a RefreshToken) -> StorageFuture<'a, ()> {
        Box::pin(async move {
            self.tables.lock().await.delete_refresh_token(token);
            Ok(())
        })
    }

    fn store_state(&self, state: AuthState) -> StorageFuture<'_, ()> {
        Box::pin(async move {
            self.tables.lock().await.store_state(state);
            Ok(())
        })
    }

    fn delete_state_for_user<'a>(
        &'a self,
        client_config_id: &'a str,
        user_id: &'a str,
    ) -> StorageFuture<'a, ()> {
        Box::pin(async move {
            self.tables
                .lock()
                .await
                .delete_state_for_user(client_config_id, user_id);
            Ok(())
        })
    }

    fn get_state_for_user<'a>(
        &'a self,
        client_config_id: &'a str,
        user_id: &'a str,
    ) -> StorageFuture<'a, Option<AuthState>> {
        Box::pin(async move {
            Ok(self
                .tables
                .lock()
                .await
                .get_state_for_user(client_config_id, user_id))
        })
    }
}
