//! Live observation of the deployed stack.
//!
//! Queries ARM for the current state of the stack's key resources and can
//! probe the deployed site over HTTP. Used by the `status` command; the
//! deployment itself never reads observed state.

use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::config::DeployConfig;
use crate::error::{AzureError, Result, StratusError};

use super::client::ArmClient;
use super::types::{ResourceGroup, StorageAccount, WebApp};

/// API version for resource group reads.
const RESOURCES_API: &str = "2022-09-01";

/// API version for storage reads.
const STORAGE_API: &str = "2023-01-01";

/// API version for App Service reads.
const WEB_API: &str = "2023-12-01";

/// Timeout for the site health probe.
const PROBE_TIMEOUT_SECS: u64 = 10;

/// Observer for querying live stack state.
#[derive(Debug)]
pub struct StackObserver {
    /// ARM API client.
    client: ArmClient,
}

/// Observed state of one resource.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ObservedState {
    /// The resource does not exist.
    Missing,
    /// The resource exists and reports a ready state.
    Ready,
    /// The resource exists in some other state.
    Other(String),
}

/// One observed resource.
#[derive(Debug, Clone, Serialize)]
pub struct ObservedResource {
    /// Resource name.
    pub name: String,
    /// Observed state.
    pub state: ObservedState,
}

/// Snapshot of the live stack.
#[derive(Debug, Clone, Serialize)]
pub struct StackStatus {
    /// Project name.
    pub project: String,
    /// Environment name.
    pub environment: String,
    /// Resource group state.
    pub resource_group: ObservedResource,
    /// Storage account state.
    pub storage_account: ObservedResource,
    /// Web App state.
    pub web_app: ObservedResource,
    /// Public hostname of the Web App, when deployed.
    pub app_host: Option<String>,
}

/// Result of probing the deployed site.
#[derive(Debug, Clone, Serialize)]
pub enum SiteHealth {
    /// The site answered with the given HTTP status.
    Reachable {
        /// HTTP status code of the response.
        status: u16,
    },
    /// The site could not be reached.
    Unreachable {
        /// Why the probe failed.
        reason: String,
    },
}

impl StackObserver {
    /// Creates a new observer over the given ARM client.
    #[must_use]
    pub const fn new(client: ArmClient) -> Self {
        Self { client }
    }

    /// Observes the live state of the stack's key resources.
    ///
    /// # Errors
    ///
    /// Returns an error only on unexpected API failures; missing resources
    /// are reported in the snapshot, not as errors.
    pub async fn observe(&self, config: &DeployConfig) -> Result<StackStatus> {
        let rg_name = config.resource_group_name();
        let account_name = config.storage_account_name();
        let app_name = config.web_app_name();

        debug!("Observing stack for project: {}", config.project.name);

        let resource_group = self.observe_resource_group(&rg_name).await?;

        // Without the resource group nothing below it can exist; skip the
        // remaining reads.
        if resource_group.state == ObservedState::Missing {
            return Ok(StackStatus {
                project: config.project.name.clone(),
                environment: config.project.environment.clone(),
                resource_group,
                storage_account: ObservedResource {
                    name: account_name,
                    state: ObservedState::Missing,
                },
                web_app: ObservedResource {
                    name: app_name,
                    state: ObservedState::Missing,
                },
                app_host: None,
            });
        }

        let storage_account = self.observe_storage_account(&rg_name, &account_name).await?;
        let (web_app, app_host) = self.observe_web_app(&rg_name, &app_name).await?;

        Ok(StackStatus {
            project: config.project.name.clone(),
            environment: config.project.environment.clone(),
            resource_group,
            storage_account,
            web_app,
            app_host,
        })
    }

    /// Observes the resource group.
    async fn observe_resource_group(&self, name: &str) -> Result<ObservedResource> {
        let path = format!("/resourceGroups/{name}");

        match self
            .client
            .get_resource::<ResourceGroup>(&path, RESOURCES_API)
            .await
        {
            Ok(group) => {
                let state = group
                    .properties
                    .and_then(|p| p.provisioning_state)
                    .map_or(ObservedState::Ready, |s| {
                        if s == "Succeeded" {
                            ObservedState::Ready
                        } else {
                            ObservedState::Other(s)
                        }
                    });
                Ok(ObservedResource {
                    name: name.to_string(),
                    state,
                })
            }
            Err(StratusError::Azure(AzureError::ResourceNotFound { .. })) => {
                Ok(ObservedResource {
                    name: name.to_string(),
                    state: ObservedState::Missing,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Observes the storage account.
    async fn observe_storage_account(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<ObservedResource> {
        let path = format!(
            "/resourceGroups/{resource_group}/providers/Microsoft.Storage/storageAccounts/{name}"
        );

        match self
            .client
            .get_resource::<StorageAccount>(&path, STORAGE_API)
            .await
        {
            Ok(account) => {
                let state = match account.provisioning_state() {
                    Some("Succeeded") => ObservedState::Ready,
                    Some(other) => ObservedState::Other(other.to_string()),
                    None => ObservedState::Ready,
                };
                Ok(ObservedResource {
                    name: name.to_string(),
                    state,
                })
            }
            Err(StratusError::Azure(AzureError::ResourceNotFound { .. })) => {
                Ok(ObservedResource {
                    name: name.to_string(),
                    state: ObservedState::Missing,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Observes the Web App and extracts its hostname.
    async fn observe_web_app(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<(ObservedResource, Option<String>)> {
        let path =
            format!("/resourceGroups/{resource_group}/providers/Microsoft.Web/sites/{name}");

        match self.client.get_resource::<WebApp>(&path, WEB_API).await {
            Ok(app) => {
                let host = app.default_host_name().map(str::to_string);
                let state = app
                    .properties
                    .as_ref()
                    .and_then(|p| p.state.clone())
                    .map_or(ObservedState::Ready, |s| {
                        if s == "Running" {
                            ObservedState::Ready
                        } else {
                            ObservedState::Other(s)
                        }
                    });
                Ok((
                    ObservedResource {
                        name: name.to_string(),
                        state,
                    },
                    host,
                ))
            }
            Err(StratusError::Azure(AzureError::ResourceNotFound { .. })) => Ok((
                ObservedResource {
                    name: name.to_string(),
                    state: ObservedState::Missing,
                },
                None,
            )),
            Err(e) => Err(e),
        }
    }

    /// Probes the deployed site over HTTPS.
    ///
    /// # Errors
    ///
    /// Returns an error if the probe client cannot be created; probe
    /// failures are reported as [`SiteHealth::Unreachable`].
    pub async fn probe_site(&self, host: &str) -> Result<SiteHealth> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .build()
            .map_err(|e| AzureError::network(format!("Failed to create probe client: {e}")))?;

        let url = format!("https://{host}");
        debug!("Probing site: {url}");

        match client.get(&url).send().await {
            Ok(response) => Ok(SiteHealth::Reachable {
                status: response.status().as_u16(),
            }),
            Err(e) => Ok(SiteHealth::Unreachable {
                reason: e.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ObservedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::Ready => write!(f, "ready"),
            Self::Other(state) => write!(f, "{state}"),
        }
    }
}
