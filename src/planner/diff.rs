//! Diff computation between configuration and recorded state.
//!
//! Classifies every stack resource by comparing its desired configuration
//! hash against the hash recorded at the last deployment. The diff is
//! advisory: ARM `PUT` is an upsert, so executing an "unchanged" node is
//! harmless, but the classification drives the preview and the
//! skip-upload decision.

use crate::config::{ConfigHasher, DeployConfig};
use crate::stack::StackResource;
use crate::state::DeploymentState;

/// Classification of one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffAction {
    /// The resource is not recorded in state.
    Create,
    /// The recorded configuration hash differs.
    Update,
    /// The recorded configuration hash matches.
    Unchanged,
}

/// Diff result for one resource.
#[derive(Debug, Clone)]
pub struct ResourceDiff {
    /// The stack resource.
    pub resource: StackResource,
    /// Classification.
    pub action: DiffAction,
    /// Human-readable reason.
    pub reason: String,
    /// Desired configuration hash.
    pub desired_hash: String,
}

/// Diff result for the whole stack.
#[derive(Debug, Clone)]
pub struct StackDiff {
    /// Per-resource diffs, in provisioning order.
    pub entries: Vec<ResourceDiff>,
}

/// Engine computing stack diffs.
#[derive(Debug, Default)]
pub struct DiffEngine {
    hasher: ConfigHasher,
}

impl DiffEngine {
    /// Creates a new diff engine.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            hasher: ConfigHasher::new(),
        }
    }

    /// Computes the per-resource diff against the recorded state.
    #[must_use]
    pub fn compute(
        &self,
        config: &DeployConfig,
        state: Option<&DeploymentState>,
        package_hash: &str,
    ) -> StackDiff {
        let entries = StackResource::ALL
            .iter()
            .map(|&resource| {
                let desired_hash = self.hasher.hash_resource(config, resource, package_hash);

                let (action, reason) = match state.and_then(|s| s.get_resource(resource.name())) {
                    None => (
                        DiffAction::Create,
                        String::from("not recorded in state"),
                    ),
                    Some(recorded) => {
                        if ConfigHasher::hashes_match(&recorded.config_hash, &desired_hash) {
                            (DiffAction::Unchanged, String::from("configuration unchanged"))
                        } else {
                            (DiffAction::Update, String::from("configuration changed"))
                        }
                    }
                };

                ResourceDiff {
                    resource,
                    action,
                    reason,
                    desired_hash,
                }
            })
            .collect();

        StackDiff { entries }
    }
}

impl StackDiff {
    /// Returns the number of resources that would change.
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.action != DiffAction::Unchanged)
            .count()
    }

    /// Returns true when nothing would change.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.change_count() == 0
    }

    /// Returns the diff entry for a resource.
    #[must_use]
    pub fn entry(&self, resource: StackResource) -> Option<&ResourceDiff> {
        self.entries.iter().find(|e| e.resource == resource)
    }
}

impl std::fmt::Display for DiffAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Unchanged => write!(f, "unchanged"),
        }
    }
}
