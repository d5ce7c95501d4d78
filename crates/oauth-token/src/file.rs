//! JSON file storage backend
//!
//! Keeps the tables in memory behind a tokio Mutex and rewrites the whole
//! file after every mutation. All writes use atomic temp-file + rename to
//! prevent corruption on crash. The in-memory tables only change once the
//! file write has succeeded.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::scope::Scope;
use crate::state::AuthState;
use crate::storage::{Storage, StorageFuture, Tables};
use crate::token::{AccessToken, RefreshToken};

/// `Storage` persisted to a single JSON file.
pub struct FileStorage {
    path: PathBuf,
    tables: Mutex<Tables>,
}

impl FileStorage {
    /// Load token storage from the given file path.
    ///
    /// If the file doesn't exist, creates it as an empty store.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let tables = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading token file: {e}")))?;
            let tables = Tables::from_json(&contents)?;
            info!(path = %path.display(), records = tables.len(), "loaded token storage");
            tables
        } else {
            info!(path = %path.display(), "token file not found, starting with empty storage");
            let tables = Tables::default();
            write_atomic(&path, &tables).await?;
            tables
        };

        Ok(Self {
            path,
            tables: Mutex::new(tables),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total number of stored records across all tables.
    pub async fn len(&self) -> usize {
        self.tables.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Apply `change` to a copy of the tables under the lock. If it reports a
    /// modification, persist the copy and only then make it current.
    async fn mutate<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut Tables) -> bool + Send,
    {
        let mut tables = self.tables.lock().await;
        let mut next = tables.clone();
        if change(&mut next) {
            write_atomic(&self.path, &next).await?;
            *tables = next;
        }
        Ok(())
    }
}

impl Storage for FileStorage {
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
        Box::pin(self.mutate(move |t| {
            t.store_access_token(token);
            true
        }))
    }

    fn delete_access_token<'a>(&'a self, token: &'a AccessToken) -> StorageFuture<'a, ()> {
        Box::pin(self.mutate(move |t| t.delete_access_token(token)))
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
        Box::pin(self.mutate(move |t| {
            t.store_refresh_token(token);
            true
        }))
    }

    fn delete_refresh_token<'a>(&'a self, token: &'a RefreshToken) -> StorageFuture<'a, ()> {
        Box::pin(self.mutate(move |t| t.delete_refresh_token(token)))
    }

    fn store_state(&self, state: AuthState) -> StorageFuture<'_, ()> {
        Box::pin(self.mutate(move |t| {
            t.store_state(state);
            true
        }))
    }

    fn delete_state_for_user<'a>(
        &'a self,
        client_config_id: &'a str,
        user_id: &'a str,
    ) -> StorageFuture<'a, ()> {
        Box::pin(self.mutate(move |t| t.delete_state_for_user(client_config_id, user_id)))
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

/// Distinguishes temp files of concurrent writers within one process.
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write the tables to a file atomically.
///
/// Writes to a temporary file in the same directory, named after the target,
/// then renames it over the target. Sets file permissions to 0600 (owner
/// read/write only) since the file contains OAuth tokens. The temp file is
/// removed if any step fails.
async fn write_atomic(path: &Path, tables: &Tables) -> Result<()> {
    let json = tables.to_json()?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("token file path has no parent directory".into()))?;
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::Io("token file path has no file name".into()))?;

    let tmp_path = dir.join(format!(
        ".{}.tmp.{}.{}",
        file_name.to_string_lossy(),
        std::process::id(),
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let result = persist(&tmp_path, path, json.as_bytes()).await;
    if result.is_err() {
        let _ = tokio::fs::remove_file(&tmp_path).await;
    }
    result?;

    debug!(path = %path.display(), "persisted token storage");
    Ok(())
}

async fn persist(tmp_path: &Path, path: &Path, contents: &[u8]) -> Result<()> {
    tokio::fs::write(tmp_path, contents)
        .await
        .map_err(|e| Error::Io(format!("writing temp token file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting token file permissions: {e}")))?;
    }

    tokio::fs::rename(tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp token file: {e}")))
}
