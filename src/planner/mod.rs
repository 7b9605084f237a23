//! Plan computation: diffing configuration against recorded state.

mod diff;
mod plan;

pub use diff::{DiffAction, DiffEngine, ResourceDiff, StackDiff};
pub use plan::{ActionType, DeploymentPlan, PlannedAction};
