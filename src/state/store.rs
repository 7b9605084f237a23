//! State store trait definition.

use async_trait::async_trait;

use super::lock::LockInfo;
use super::types::DeploymentState;
use crate::error::Result;

/// Interface of a state storage backend.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the deployment state.
    ///
    /// Returns `None` if no state exists yet.
    async fn load(&self) -> Result<Option<DeploymentState>>;

    /// Saves the deployment state.
    async fn save(&self, state: &DeploymentState) -> Result<()>;

    /// Deletes the deployment state.
    async fn delete(&self) -> Result<()>;

    /// Acquires a lock on the state.
    async fn acquire_lock(&self, holder: &str) -> Result<LockInfo>;

    /// Releases a lock on the state.
    async fn release_lock(&self, lock_id: &str) -> Result<()>;

    /// Gets current lock information if locked.
    async fn get_lock_info(&self) -> Result<Option<LockInfo>>;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;
}
