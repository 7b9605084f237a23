//! Output formatting for CLI commands.
//!
//! Renders plans, status snapshots, outputs, and state for the terminal,
//! in either human-readable text or JSON for scripting.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::azure::{SiteHealth, StackStatus};
use crate::planner::{ActionType, DeploymentPlan};
use crate::state::DeploymentState;

use super::commands::OutputFormat;

/// Placeholder shown instead of a secret value.
const SECRET_MASK: &str = "<hidden, use --show-secrets>";

/// Output formatter for CLI commands.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Plan action row for table display.
#[derive(Tabled)]
struct PlanActionRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

/// Resource row for status display.
#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
}

/// Resource row for state display.
#[derive(Tabled)]
struct StateRow {
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Azure name")]
    azure_name: String,
    #[tabled(rename = "Config hash")]
    config_hash: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a deployment plan.
    #[must_use]
    pub fn format_plan(&self, plan: &DeploymentPlan) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "config_hash": plan.config_hash,
                "actions": plan
                    .actions
                    .iter()
                    .map(|a| serde_json::json!({
                        "action": a.action_type.to_string(),
                        "resource": a.resource_name,
                        "reason": a.reason,
                    }))
                    .collect::<Vec<_>>(),
            }))
            .unwrap_or_default(),
            OutputFormat::Text => Self::format_plan_text(plan),
        }
    }

    /// Formats a plan as text.
    fn format_plan_text(plan: &DeploymentPlan) -> String {
        if plan.is_empty() {
            return format!(
                "{} No changes required - the stack matches the configuration.\n",
                "✓".green()
            );
        }

        let mut output = String::new();

        let _ = writeln!(output, "\nDeployment plan");
        let _ = writeln!(output, "   Config hash: {}\n", &plan.config_hash[..8.min(plan.config_hash.len())]);

        let rows: Vec<PlanActionRow> = plan
            .actions
            .iter()
            .enumerate()
            .map(|(i, a)| PlanActionRow {
                index: i + 1,
                action: Self::colorize_action(a.action_type),
                resource: a.resource_name.clone(),
                reason: a.reason.clone(),
            })
            .collect();

        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        let _ = writeln!(
            output,
            "\nPlan: {} to create, {} to update, {} to destroy",
            plan.count_of(ActionType::Create).to_string().green(),
            plan.count_of(ActionType::Update).to_string().yellow(),
            plan.count_of(ActionType::Destroy).to_string().red(),
        );

        output
    }

    /// Formats a live stack status snapshot.
    #[must_use]
    pub fn format_status(&self, status: &StackStatus, health: Option<&SiteHealth>) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "status": status,
                "health": health,
            }))
            .unwrap_or_default(),
            OutputFormat::Text => Self::format_status_text(status, health),
        }
    }

    /// Formats status as text.
    fn format_status_text(status: &StackStatus, health: Option<&SiteHealth>) -> String {
        let mut output = String::new();

        let _ = writeln!(
            output,
            "\nStack: {}/{}\n",
            status.project, status.environment
        );

        let rows = vec![
            StatusRow {
                resource: String::from("resource-group"),
                name: status.resource_group.name.clone(),
                state: status.resource_group.state.to_string(),
            },
            StatusRow {
                resource: String::from("storage-account"),
                name: status.storage_account.name.clone(),
                state: status.storage_account.state.to_string(),
            },
            StatusRow {
                resource: String::from("web-app"),
                name: status.web_app.name.clone(),
                state: status.web_app.state.to_string(),
            },
        ];

        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        if let Some(host) = &status.app_host {
            let _ = writeln!(output, "\nSite: https://{host}");
        }

        match health {
            Some(SiteHealth::Reachable { status: code }) => {
                let _ = writeln!(output, "Health: {} (HTTP {code})", "reachable".green());
            }
            Some(SiteHealth::Unreachable { reason }) => {
                let _ = writeln!(output, "Health: {} ({reason})", "unreachable".red());
            }
            None => {}
        }

        output
    }

    /// Formats the exported stack outputs.
    #[must_use]
    pub fn format_outputs(
        &self,
        blob_url: &str,
        app_url: &str,
        primary_storage_key: Option<&str>,
    ) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "primary_storage_key": primary_storage_key,
                "blob_url": blob_url,
                "app_url": app_url,
            }))
            .unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = String::new();
                let _ = writeln!(output, "\nOutputs:");
                let _ = writeln!(
                    output,
                    "  primary_storage_key: {}",
                    primary_storage_key.unwrap_or(SECRET_MASK)
                );
                let _ = writeln!(output, "  blob_url:  {blob_url}");
                let _ = writeln!(output, "  app_url:   https://{app_url}");
                output
            }
        }
    }

    /// Formats the recorded deployment state.
    #[must_use]
    pub fn format_state(&self, state: &DeploymentState) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(state).unwrap_or_default(),
            OutputFormat::Text => Self::format_state_text(state),
        }
    }

    /// Formats state as text.
    fn format_state_text(state: &DeploymentState) -> String {
        let mut output = String::new();

        let _ = writeln!(output, "\nState: {}/{}", state.project, state.environment);
        let _ = writeln!(output, "   Last updated: {}", state.last_updated.to_rfc3339());
        let _ = writeln!(
            output,
            "   Config hash:  {}\n",
            &state.config_hash[..8.min(state.config_hash.len())]
        );

        if state.resources.is_empty() {
            output.push_str("   No resources recorded.\n");
            return output;
        }

        let mut rows: Vec<StateRow> = state
            .resources
            .values()
            .map(|r| StateRow {
                resource: r.name.clone(),
                azure_name: r.azure_name.clone(),
                config_hash: r.config_hash.chars().take(8).collect(),
                updated: r.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            })
            .collect();
        rows.sort_by(|a, b| a.resource.cmp(&b.resource));

        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        if let Some(outputs) = &state.outputs {
            let _ = writeln!(output, "\nRecorded outputs:");
            let _ = writeln!(output, "  blob_url: {}", outputs.blob_url);
            let _ = writeln!(output, "  app_url:  https://{}", outputs.app_url);
        }

        output
    }

    /// Colors an action type for the plan table.
    fn colorize_action(action: ActionType) -> String {
        match action {
            ActionType::Create => action.to_string().green().to_string(),
            ActionType::Update => action.to_string().yellow().to_string(),
            ActionType::Destroy => action.to_string().red().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::DiffEngine;

    fn test_plan() -> DeploymentPlan {
        let config: crate::config::DeployConfig =
            serde_yaml::from_str("project:\n  name: demo\nsite:\n  source: ./site\n").unwrap();
        let diff = DiffEngine::new().compute(&config, None, "pkg");
        DeploymentPlan::from_diff(&diff, "abcdef1234567890")
    }

    #[test]
    fn test_plan_text_lists_every_action() {
        let formatter = OutputFormatter::new(OutputFormat::Text);
        let rendered = formatter.format_plan(&test_plan());

        assert!(rendered.contains("resource-group"));
        assert!(rendered.contains("web-app"));
        assert!(rendered.contains("to create"));
    }

    #[test]
    fn test_plan_json_is_parseable() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let rendered = formatter.format_plan(&test_plan());

        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["config_hash"], "abcdef1234567890");
        assert_eq!(
            value["actions"].as_array().unwrap().len(),
            crate::stack::StackResource::ALL.len()
        );
    }

    #[test]
    fn test_outputs_mask_secret_by_default() {
        let formatter = OutputFormatter::new(OutputFormat::Text);
        let rendered = formatter.format_outputs("https://blob", "app.azurewebsites.net", None);

        assert!(rendered.contains(SECRET_MASK));
        assert!(!rendered.contains("key-material"));
    }

    #[test]
    fn test_outputs_show_secret_when_provided() {
        let formatter = OutputFormatter::new(OutputFormat::Text);
        let rendered =
            formatter.format_outputs("https://blob", "app.azurewebsites.net", Some("key-material"));

        assert!(rendered.contains("key-material"));
    }
}
