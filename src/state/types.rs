//! State types for tracking what a deployment has provisioned.
//!
//! The state file records provider identities and per-resource
//! configuration hashes so a re-run of the declarative graph can classify
//! each node without querying Azure. Secrets (the storage access key) are
//! never written to state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Current version of the state format.
pub const STATE_VERSION: &str = "1.0";

/// Upper bound on retained history entries.
const MAX_HISTORY: usize = 50;

/// The complete deployment state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentState {
    /// State format version.
    pub version: String,
    /// Project name.
    pub project: String,
    /// Environment name.
    pub environment: String,
    /// Hash of the last applied configuration.
    pub config_hash: String,
    /// State of individual stack resources, keyed by node name.
    pub resources: HashMap<String, ResourceState>,
    /// Record of the uploaded site package.
    #[serde(default)]
    pub package: Option<PackageRecord>,
    /// Non-secret outputs of the last successful deployment.
    #[serde(default)]
    pub outputs: Option<RecordedOutputs>,
    /// When the state was last updated.
    pub last_updated: DateTime<Utc>,
    /// Deployment history (recent entries).
    #[serde(default)]
    pub history: Vec<DeploymentHistoryEntry>,
}

/// State of a single stack resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    /// Node name (from the stack definition).
    pub name: String,
    /// Azure name of the provisioned resource.
    pub azure_name: String,
    /// Fully qualified ARM id, when known.
    #[serde(default)]
    pub azure_id: Option<String>,
    /// Hash of the configuration slice when deployed.
    pub config_hash: String,
    /// When the resource was first recorded.
    pub created_at: DateTime<Utc>,
    /// When the resource was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Record of the uploaded site package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Blob name of the package.
    pub blob_name: String,
    /// SHA-256 of the archive bytes, hex encoded.
    pub content_hash: String,
    /// Archive size in bytes.
    pub size_bytes: u64,
    /// When the package was uploaded.
    pub uploaded_at: DateTime<Utc>,
}

/// Non-secret outputs recorded after a successful deployment.
///
/// The primary storage key is deliberately absent; `stratus outputs`
/// fetches it live when asked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedOutputs {
    /// SAS-signed URL of the site package.
    pub blob_url: String,
    /// Public hostname of the Web App.
    pub app_url: String,
}

/// A single entry in the deployment history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentHistoryEntry {
    /// When the operation occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of operation.
    pub operation: DeploymentOperation,
    /// Configuration hash at the time of the operation.
    pub config_hash: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Optional error message.
    #[serde(default)]
    pub error: Option<String>,
}

/// Types of deployment operations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentOperation {
    /// Graph deployment (`up`).
    Deploy,
    /// Stack teardown (`destroy`).
    Destroy,
}

impl DeploymentState {
    /// Creates a new empty deployment state.
    #[must_use]
    pub fn new(project: &str, environment: &str) -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            project: project.to_string(),
            environment: environment.to_string(),
            config_hash: String::new(),
            resources: HashMap::new(),
            package: None,
            outputs: None,
            last_updated: Utc::now(),
            history: Vec::new(),
        }
    }

    /// Gets a resource by node name.
    #[must_use]
    pub fn get_resource(&self, name: &str) -> Option<&ResourceState> {
        self.resources.get(name)
    }

    /// Adds or updates a resource record, preserving its creation time.
    pub fn set_resource(&mut self, name: &str, azure_name: &str, config_hash: &str) {
        let now = Utc::now();
        let created_at = self
            .resources
            .get(name)
            .map_or(now, |existing| existing.created_at);

        self.resources.insert(
            name.to_string(),
            ResourceState {
                name: name.to_string(),
                azure_name: azure_name.to_string(),
                azure_id: None,
                config_hash: config_hash.to_string(),
                created_at,
                updated_at: now,
            },
        );
        self.last_updated = now;
    }

    /// Records the uploaded site package.
    pub fn set_package(&mut self, blob_name: &str, content_hash: &str, size_bytes: u64) {
        self.package = Some(PackageRecord {
            blob_name: blob_name.to_string(),
            content_hash: content_hash.to_string(),
            size_bytes,
            uploaded_at: Utc::now(),
        });
        self.last_updated = Utc::now();
    }

    /// Records the non-secret outputs of a successful deployment.
    pub fn set_outputs(&mut self, blob_url: &str, app_url: &str) {
        self.outputs = Some(RecordedOutputs {
            blob_url: blob_url.to_string(),
            app_url: app_url.to_string(),
        });
        self.last_updated = Utc::now();
    }

    /// Returns true when the recorded package matches the given content
    /// hash and blob name.
    #[must_use]
    pub fn package_matches(&self, blob_name: &str, content_hash: &str) -> bool {
        self.package
            .as_ref()
            .is_some_and(|p| p.blob_name == blob_name && p.content_hash == content_hash)
    }

    /// Adds a history entry, trimming old entries.
    pub fn add_history(&mut self, entry: DeploymentHistoryEntry) {
        if self.history.len() >= MAX_HISTORY {
            self.history.remove(0);
        }
        self.history.push(entry);
        self.last_updated = Utc::now();
    }
}

impl DeploymentHistoryEntry {
    /// Creates a successful history entry.
    #[must_use]
    pub fn new(operation: DeploymentOperation, config_hash: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            config_hash: config_hash.to_string(),
            success: true,
            error: None,
        }
    }

    /// Creates a failed history entry.
    #[must_use]
    pub fn failed(operation: DeploymentOperation, config_hash: &str, error: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            config_hash: config_hash.to_string(),
            success: false,
            error: Some(error.to_string()),
        }
    }
}

impl std::fmt::Display for DeploymentOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deploy => write!(f, "deploy"),
            Self::Destroy => write!(f, "destroy"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_resource_preserves_created_at() {
        let mut state = DeploymentState::new("demo", "dev");

        state.set_resource("storage-account", "sa123", "hash-1");
        let created = state.get_resource("storage-account").unwrap().created_at;

        state.set_resource("storage-account", "sa123", "hash-2");
        let resource = state.get_resource("storage-account").unwrap();

        assert_eq!(resource.created_at, created);
        assert_eq!(resource.config_hash, "hash-2");
    }

    #[test]
    fn test_package_matches() {
        let mut state = DeploymentState::new("demo", "dev");
        assert!(!state.package_matches("website.zip", "abc"));

        state.set_package("website.zip", "abc", 128);
        assert!(state.package_matches("website.zip", "abc"));
        assert!(!state.package_matches("website.zip", "other"));
        assert!(!state.package_matches("renamed.zip", "abc"));
    }

    #[test]
    fn test_history_is_bounded() {
        let mut state = DeploymentState::new("demo", "dev");

        for i in 0..60 {
            state.add_history(DeploymentHistoryEntry::new(
                DeploymentOperation::Deploy,
                &format!("hash-{i}"),
            ));
        }

        assert_eq!(state.history.len(), MAX_HISTORY);
        assert_eq!(state.history.last().unwrap().config_hash, "hash-59");
    }

    #[test]
    fn test_outputs_do_not_carry_secrets() {
        let mut state = DeploymentState::new("demo", "dev");
        state.set_outputs("https://sa123.blob.core.windows.net/c/b?tok", "app.azurewebsites.net");

        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("blob_url"));
        assert!(!json.contains("primary_storage_key"));
    }
}
