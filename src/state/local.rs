//! Local file-based state storage backend.
//!
//! Stores the deployment state as JSON under a `.stratus` directory next
//! to the configuration file, guarded by an expiring lock file.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{Result, StateError, StratusError};

use super::lock::LockInfo;
use super::store::StateStore;
use super::types::{DeploymentState, STATE_VERSION};

/// Default state directory name.
pub const STATE_DIR: &str = ".stratus";

/// State file name.
const STATE_FILE: &str = "state.json";

/// Lock file name.
const LOCK_FILE: &str = "state.lock";

/// Local file-based state store.
#[derive(Debug)]
pub struct LocalStateStore {
    /// Base directory for state files.
    base_dir: PathBuf,
    /// Path to the state file.
    state_path: PathBuf,
    /// Path to the lock file.
    lock_path: PathBuf,
}

impl LocalStateStore {
    /// Creates a state store rooted at the given base directory.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let state_path = base_dir.join(STATE_FILE);
        let lock_path = base_dir.join(LOCK_FILE);

        Self {
            base_dir,
            state_path,
            lock_path,
        }
    }

    /// Returns the path of the state file.
    #[must_use]
    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    /// Ensures the base directory exists.
    async fn ensure_base_dir(&self) -> Result<()> {
        if !self.base_dir.exists() {
            fs::create_dir_all(&self.base_dir).await?;
        }
        Ok(())
    }

    /// Reads the current lock file, if any.
    async fn read_lock(&self) -> Result<Option<LockInfo>> {
        if !self.lock_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.lock_path).await?;
        let lock: LockInfo = serde_json::from_str(&content)
            .map_err(|e| StateError::serialization(format!("Invalid lock file: {e}")))?;

        Ok(Some(lock))
    }

    /// Writes a lock file.
    async fn write_lock(&self, lock: &LockInfo) -> Result<()> {
        self.ensure_base_dir().await?;

        let content = serde_json::to_string_pretty(lock)
            .map_err(|e| StateError::serialization(e.to_string()))?;
        fs::write(&self.lock_path, content).await?;

        Ok(())
    }
}

#[async_trait]
impl StateStore for LocalStateStore {
    async fn load(&self) -> Result<Option<DeploymentState>> {
        if !self.state_path.exists() {
            debug!("No state file at: {}", self.state_path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(&self.state_path).await?;
        let state: DeploymentState = serde_json::from_str(&content).map_err(|e| {
            StratusError::State(StateError::Corrupted {
                message: format!("Invalid state file: {e}"),
            })
        })?;

        if state.version != STATE_VERSION {
            return Err(StratusError::State(StateError::VersionMismatch {
                expected: STATE_VERSION.to_string(),
                found: state.version,
            }));
        }

        debug!("Loaded state from: {}", self.state_path.display());
        Ok(Some(state))
    }

    async fn save(&self, state: &DeploymentState) -> Result<()> {
        self.ensure_base_dir().await?;

        let content = serde_json::to_string_pretty(state)
            .map_err(|e| StateError::serialization(e.to_string()))?;

        // Write-then-rename keeps a crash from truncating the state file.
        let tmp_path = self.state_path.with_extension("json.tmp");
        fs::write(&tmp_path, content).await?;
        fs::rename(&tmp_path, &self.state_path).await?;

        debug!("Saved state to: {}", self.state_path.display());
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        if self.state_path.exists() {
            fs::remove_file(&self.state_path).await?;
            info!("Deleted state file: {}", self.state_path.display());
        }
        Ok(())
    }

    async fn acquire_lock(&self, holder: &str) -> Result<LockInfo> {
        if let Some(existing) = self.read_lock().await? {
            if existing.is_expired() {
                warn!(
                    "Replacing expired lock held by {} since {}",
                    existing.holder, existing.acquired_at
                );
            } else {
                return Err(StratusError::State(StateError::LockedByOther {
                    holder: existing.holder,
                    since: existing.acquired_at.to_rfc3339(),
                }));
            }
        }

        let lock = LockInfo::new(holder);
        self.write_lock(&lock).await?;
        debug!("Acquired state lock: {}", lock.lock_id);

        Ok(lock)
    }

    async fn release_lock(&self, lock_id: &str) -> Result<()> {
        let Some(existing) = self.read_lock().await? else {
            return Ok(());
        };

        if existing.lock_id != lock_id && !existing.is_expired() {
            return Err(StratusError::State(StateError::LockFailed {
                message: format!("Lock is held by {} with a different id", existing.holder),
            }));
        }

        fs::remove_file(&self.lock_path).await?;
        debug!("Released state lock: {lock_id}");

        Ok(())
    }

    async fn get_lock_info(&self) -> Result<Option<LockInfo>> {
        self.read_lock().await
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::lock::holder_id;

    fn test_store() -> (tempfile::TempDir, LocalStateStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStateStore::new(dir.path().join(STATE_DIR));
        (dir, store)
    }

    #[tokio::test]
    async fn test_load_missing_state_returns_none() {
        let (_dir, store) = test_store();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let (_dir, store) = test_store();

        let mut state = DeploymentState::new("demo", "dev");
        state.set_resource("storage-account", "sa123", "hash-1");
        state.set_outputs("https://example/blob?tok", "demo.azurewebsites.net");

        store.save(&state).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();

        assert_eq!(loaded.project, "demo");
        assert_eq!(
            loaded.get_resource("storage-account").unwrap().azure_name,
            "sa123"
        );
        assert_eq!(loaded.outputs.unwrap().app_url, "demo.azurewebsites.net");
    }

    #[tokio::test]
    async fn test_delete_state() {
        let (_dir, store) = test_store();

        store.save(&DeploymentState::new("demo", "dev")).await.unwrap();
        store.delete().await.unwrap();

        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupted_state_is_reported() {
        let (_dir, store) = test_store();

        tokio::fs::create_dir_all(store.base_dir.clone()).await.unwrap();
        tokio::fs::write(store.state_path(), "{not json").await.unwrap();

        assert!(matches!(
            store.load().await,
            Err(StratusError::State(StateError::Corrupted { .. }))
        ));
    }

    #[tokio::test]
    async fn test_lock_excludes_second_holder() {
        let (_dir, store) = test_store();

        let lock = store.acquire_lock(&holder_id()).await.unwrap();
        let second = store.acquire_lock("other-holder").await;

        assert!(matches!(
            second,
            Err(StratusError::State(StateError::LockedByOther { .. }))
        ));

        store.release_lock(&lock.lock_id).await.unwrap();
        assert!(store.acquire_lock("other-holder").await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_lock_is_replaced() {
        let (_dir, store) = test_store();

        let mut stale = LockInfo::new("crashed-process");
        stale.expires_at = chrono::Utc::now() - chrono::Duration::seconds(1);
        store.write_lock(&stale).await.unwrap();

        assert!(store.acquire_lock("new-holder").await.is_ok());
    }

    #[tokio::test]
    async fn test_release_with_wrong_id_fails() {
        let (_dir, store) = test_store();

        let _lock = store.acquire_lock("holder").await.unwrap();
        let result = store.release_lock("wrong-id").await;

        assert!(matches!(
            result,
            Err(StratusError::State(StateError::LockFailed { .. }))
        ));
    }
}
