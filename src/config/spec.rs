//! Configuration specification types for the deployment tool.
//!
//! This module defines all the structs that map to the `stratus.deploy.yaml`
//! file. These types are declarative and fully describe the desired state of
//! the static-website hosting stack.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The root configuration structure for a stratus deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeployConfig {
    /// Project-level configuration.
    pub project: ProjectConfig,
    /// State storage configuration.
    #[serde(default)]
    pub state: StateConfig,
    /// Storage account and container configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Site content configuration.
    pub site: SiteConfig,
    /// App Service configuration.
    #[serde(default)]
    pub app_service: AppServiceConfig,
    /// Shared-access-signature configuration.
    #[serde(default)]
    pub sas: SasConfig,
}

/// Project-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Unique name for the project.
    pub name: String,
    /// Environment (e.g., "dev", "staging", "prod").
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Azure region for all resources (e.g., "eastus").
    #[serde(default = "default_location")]
    pub location: String,
}

/// State storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateConfig {
    /// Directory holding the local state file (defaults to `.stratus`
    /// next to the configuration file).
    #[serde(default)]
    pub path: Option<String>,
}

/// Storage account and blob container configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// Storage account name override. Derived from the project name and
    /// environment when absent. Must be globally unique on Azure.
    #[serde(default)]
    pub account: Option<String>,
    /// Storage account SKU.
    #[serde(default)]
    pub sku: StorageSku,
    /// Storage account kind.
    #[serde(default)]
    pub kind: StorageKind,
    /// Blob container holding the site package.
    #[serde(default = "default_container")]
    pub container: String,
    /// Name of the uploaded package blob.
    #[serde(default = "default_blob")]
    pub blob: String,
    /// Index document for static-website hosting.
    #[serde(default = "default_index_document")]
    pub index_document: String,
    /// Optional error document (served on 404).
    #[serde(default)]
    pub error_document: Option<String>,
}

/// Storage account SKU options.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum StorageSku {
    /// Locally redundant storage.
    #[default]
    #[serde(rename = "Standard_LRS")]
    StandardLrs,
    /// Geo-redundant storage.
    #[serde(rename = "Standard_GRS")]
    StandardGrs,
    /// Zone-redundant storage.
    #[serde(rename = "Standard_ZRS")]
    StandardZrs,
    /// Premium locally redundant storage.
    #[serde(rename = "Premium_LRS")]
    PremiumLrs,
}

/// Storage account kind options.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum StorageKind {
    /// General-purpose v2 account. Required for static-website hosting.
    #[default]
    StorageV2,
    /// Blob-only account.
    BlobStorage,
}

/// Site content configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteConfig {
    /// Path to the site content: a directory to be zipped, or a
    /// pre-built `.zip` archive uploaded as-is.
    pub source: PathBuf,
}

/// App Service configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppServiceConfig {
    /// Web App name override. Derived from the project name and
    /// environment when absent. Must be globally unique on Azure.
    #[serde(default)]
    pub name: Option<String>,
    /// App Service Plan name override.
    #[serde(default)]
    pub plan: Option<String>,
    /// Pricing tier (e.g., "Basic", "Standard").
    #[serde(default = "default_tier")]
    pub tier: String,
    /// Instance size within the tier (e.g., "B1").
    #[serde(default = "default_size")]
    pub size: String,
    /// Number of workers.
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    /// Default documents served by the Web App.
    #[serde(default)]
    pub default_documents: Vec<String>,
}

/// Shared-access-signature configuration for the package URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SasConfig {
    /// How long the package SAS remains valid, in hours.
    #[serde(default = "default_sas_validity_hours")]
    pub validity_hours: u32,
}

fn default_environment() -> String {
    String::from("dev")
}

fn default_location() -> String {
    String::from("eastus")
}

fn default_container() -> String {
    String::from("webcontainer")
}

fn default_blob() -> String {
    String::from("website.zip")
}

fn default_index_document() -> String {
    String::from("index.html")
}

fn default_tier() -> String {
    String::from("Basic")
}

fn default_size() -> String {
    String::from("B1")
}

const fn default_capacity() -> u32 {
    1
}

const fn default_sas_validity_hours() -> u32 {
    2
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            account: None,
            sku: StorageSku::default(),
            kind: StorageKind::default(),
            container: default_container(),
            blob: default_blob(),
            index_document: default_index_document(),
            error_document: None,
        }
    }
}

impl Default for AppServiceConfig {
    fn default() -> Self {
        Self {
            name: None,
            plan: None,
            tier: default_tier(),
            size: default_size(),
            capacity: default_capacity(),
            default_documents: Vec::new(),
        }
    }
}

impl Default for SasConfig {
    fn default() -> Self {
        Self {
            validity_hours: default_sas_validity_hours(),
        }
    }
}

impl StorageSku {
    /// Returns the ARM representation of the SKU.
    #[must_use]
    pub const fn as_arm(&self) -> &'static str {
        match self {
            Self::StandardLrs => "Standard_LRS",
            Self::StandardGrs => "Standard_GRS",
            Self::StandardZrs => "Standard_ZRS",
            Self::PremiumLrs => "Premium_LRS",
        }
    }
}

impl StorageKind {
    /// Returns the ARM representation of the account kind.
    #[must_use]
    pub const fn as_arm(&self) -> &'static str {
        match self {
            Self::StorageV2 => "StorageV2",
            Self::BlobStorage => "BlobStorage",
        }
    }
}

impl DeployConfig {
    /// Returns the resource group name for this deployment.
    #[must_use]
    pub fn resource_group_name(&self) -> String {
        format!("{}-{}-rg", self.project.name, self.project.environment)
    }

    /// Returns the storage account name, deriving one from the project
    /// name and environment when no override is configured.
    ///
    /// Storage account names allow only lowercase alphanumerics, 3-24
    /// characters, so the derived name strips everything else and
    /// truncates.
    #[must_use]
    pub fn storage_account_name(&self) -> String {
        self.storage.account.clone().unwrap_or_else(|| {
            let raw = format!("{}{}sa", self.project.name, self.project.environment);
            let sanitized: String = raw
                .to_lowercase()
                .chars()
                .filter(char::is_ascii_alphanumeric)
                .collect();
            sanitized.chars().take(24).collect()
        })
    }

    /// Returns the App Service Plan name for this deployment.
    #[must_use]
    pub fn app_service_plan_name(&self) -> String {
        self.app_service.plan.clone().unwrap_or_else(|| {
            format!("{}-{}-plan", self.project.name, self.project.environment)
        })
    }

    /// Returns the Web App name for this deployment.
    #[must_use]
    pub fn web_app_name(&self) -> String {
        self.app_service.name.clone().unwrap_or_else(|| {
            format!("{}-{}-app", self.project.name, self.project.environment)
        })
    }

    /// Returns the SAS validity window as a [`chrono::Duration`].
    #[must_use]
    pub fn sas_validity(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.sas.validity_hours))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> &'static str {
        "project:\n  name: clco-demo\nsite:\n  source: ./site\n"
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config: DeployConfig = serde_yaml::from_str(minimal_yaml()).unwrap();

        assert_eq!(config.project.environment, "dev");
        assert_eq!(config.project.location, "eastus");
        assert_eq!(config.storage.sku, StorageSku::StandardLrs);
        assert_eq!(config.storage.kind, StorageKind::StorageV2);
        assert_eq!(config.storage.container, "webcontainer");
        assert_eq!(config.storage.blob, "website.zip");
        assert_eq!(config.storage.index_document, "index.html");
        assert_eq!(config.app_service.tier, "Basic");
        assert_eq!(config.app_service.size, "B1");
        assert_eq!(config.app_service.capacity, 1);
        assert_eq!(config.sas.validity_hours, 2);
    }

    #[test]
    fn test_derived_names() {
        let config: DeployConfig = serde_yaml::from_str(minimal_yaml()).unwrap();

        assert_eq!(config.resource_group_name(), "clco-demo-dev-rg");
        assert_eq!(config.app_service_plan_name(), "clco-demo-dev-plan");
        assert_eq!(config.web_app_name(), "clco-demo-dev-app");
        // Hyphens are stripped and the name stays within 24 characters.
        assert_eq!(config.storage_account_name(), "clcodemodevsa");
    }

    #[test]
    fn test_storage_account_name_truncated() {
        let yaml = "project:\n  name: averyveryverylongprojectname\nsite:\n  source: ./site\n";
        let config: DeployConfig = serde_yaml::from_str(yaml).unwrap();

        let name = config.storage_account_name();
        assert!(name.len() <= 24);
        assert!(name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_explicit_overrides() {
        let yaml = r"
project:
  name: demo
  environment: prod
  location: westeurope
storage:
  account: mysa123
  sku: Standard_GRS
  container: site-packages
site:
  source: ./dist
app_service:
  name: demo-frontend
  tier: Standard
  size: S1
  capacity: 2
sas:
  validity_hours: 4
";
        let config: DeployConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.storage_account_name(), "mysa123");
        assert_eq!(config.storage.sku, StorageSku::StandardGrs);
        assert_eq!(config.web_app_name(), "demo-frontend");
        assert_eq!(config.sas_validity(), chrono::Duration::hours(4));
    }
}
