//! Deployment state tracking and storage.

mod local;
mod lock;
mod store;
mod types;

pub use local::{LocalStateStore, STATE_DIR};
pub use lock::{holder_id, LockInfo, LOCK_TTL_SECS};
pub use store::StateStore;
pub use types::{
    DeploymentHistoryEntry, DeploymentOperation, DeploymentState, PackageRecord, RecordedOutputs,
    ResourceState, STATE_VERSION,
};
