//! Deployment plan types and construction.
//!
//! A plan is the user-facing rendering of a diff: which resources the next
//! `up` would create or update, or which resources a `destroy` would tear
//! down. Execution itself is the graph walk; the plan exists for preview
//! and confirmation.

use chrono::{DateTime, Utc};

use crate::stack::StackResource;
use crate::state::DeploymentState;

use super::diff::{DiffAction, StackDiff};

/// A deployment plan.
#[derive(Debug)]
pub struct DeploymentPlan {
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
    /// Configuration hash this plan is based on.
    pub config_hash: String,
    /// Planned actions in execution order.
    pub actions: Vec<PlannedAction>,
}

/// A single planned action.
#[derive(Debug, Clone)]
pub struct PlannedAction {
    /// Action type.
    pub action_type: ActionType,
    /// Stable node name of the affected resource.
    pub resource_name: String,
    /// Reason for this action.
    pub reason: String,
}

/// Types of actions in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    /// Create a new resource.
    Create,
    /// Update an existing resource (ARM upsert).
    Update,
    /// Destroy a resource.
    Destroy,
}

impl DeploymentPlan {
    /// Creates a plan from a diff result, keeping only resources that
    /// would change.
    #[must_use]
    pub fn from_diff(diff: &StackDiff, config_hash: &str) -> Self {
        let actions = diff
            .entries
            .iter()
            .filter_map(|entry| {
                let action_type = match entry.action {
                    DiffAction::Create => ActionType::Create,
                    DiffAction::Update => ActionType::Update,
                    DiffAction::Unchanged => return None,
                };

                Some(PlannedAction {
                    action_type,
                    resource_name: entry.resource.name().to_string(),
                    reason: entry.reason.clone(),
                })
            })
            .collect();

        Self {
            created_at: Utc::now(),
            config_hash: config_hash.to_string(),
            actions,
        }
    }

    /// Creates a teardown plan from the recorded state.
    ///
    /// Resources are listed in reverse provisioning order, though the
    /// actual teardown deletes the resource group as a unit.
    #[must_use]
    pub fn for_destroy(state: &DeploymentState) -> Self {
        let actions = StackResource::ALL
            .iter()
            .rev()
            .filter(|resource| state.get_resource(resource.name()).is_some())
            .map(|resource| PlannedAction {
                action_type: ActionType::Destroy,
                resource_name: resource.name().to_string(),
                reason: String::from("stack teardown"),
            })
            .collect();

        Self {
            created_at: Utc::now(),
            config_hash: state.config_hash.clone(),
            actions,
        }
    }

    /// Returns true if the plan is empty (no changes).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Returns the number of actions.
    #[must_use]
    pub const fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Returns the number of actions of the given type.
    #[must_use]
    pub fn count_of(&self, action_type: ActionType) -> usize {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .count()
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Destroy => write!(f, "destroy"),
        }
    }
}

impl std::fmt::Display for PlannedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.action_type, self.resource_name)?;
        if !self.reason.is_empty() {
            write!(f, " ({})", self.reason)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for DeploymentPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.actions.is_empty() {
            return write!(f, "No changes required");
        }

        writeln!(f, "Deployment plan ({} actions):", self.actions.len())?;
        for (i, action) in self.actions.iter().enumerate() {
            writeln!(f, "  {}. {action}", i + 1)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeployConfig;
    use crate::planner::DiffEngine;

    fn test_config() -> DeployConfig {
        serde_yaml::from_str("project:\n  name: demo\nsite:\n  source: ./site\n").unwrap()
    }

    #[test]
    fn test_fresh_plan_creates_all_resources() {
        let diff = DiffEngine::new().compute(&test_config(), None, "pkg");
        let plan = DeploymentPlan::from_diff(&diff, "config-hash");

        assert_eq!(plan.action_count(), StackResource::ALL.len());
        assert_eq!(plan.count_of(ActionType::Create), StackResource::ALL.len());
        assert_eq!(plan.count_of(ActionType::Update), 0);
    }

    #[test]
    fn test_empty_plan_displays_no_changes() {
        let plan = DeploymentPlan {
            created_at: Utc::now(),
            config_hash: String::from("hash"),
            actions: vec![],
        };

        assert!(plan.is_empty());
        assert_eq!(plan.to_string(), "No changes required");
    }

    #[test]
    fn test_destroy_plan_reverses_order() {
        let mut state = DeploymentState::new("demo", "dev");
        state.set_resource(StackResource::ResourceGroup.name(), "demo-dev-rg", "h");
        state.set_resource(StackResource::WebApp.name(), "demo-dev-app", "h");

        let plan = DeploymentPlan::for_destroy(&state);

        assert_eq!(plan.action_count(), 2);
        assert_eq!(plan.actions[0].resource_name, "web-app");
        assert_eq!(plan.actions[1].resource_name, "resource-group");
        assert_eq!(plan.count_of(ActionType::Destroy), 2);
    }
}
