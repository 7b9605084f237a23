//! Wire types for the Azure Resource Manager REST API.
//!
//! Only the slice of the ARM surface used by the static-website stack is
//! modeled. Field names follow the ARM JSON contract via serde renames.

use serde::{Deserialize, Serialize};

/// A resource group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceGroup {
    /// Fully qualified ARM id.
    #[serde(default)]
    pub id: Option<String>,
    /// Resource group name.
    pub name: String,
    /// Azure region.
    pub location: String,
    /// Resource group properties.
    #[serde(default)]
    pub properties: Option<ResourceGroupProperties>,
}

/// Resource group properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceGroupProperties {
    /// Provisioning state reported by ARM.
    #[serde(rename = "provisioningState", default)]
    pub provisioning_state: Option<String>,
}

/// A storage account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageAccount {
    /// Fully qualified ARM id.
    #[serde(default)]
    pub id: Option<String>,
    /// Storage account name.
    pub name: String,
    /// Azure region.
    #[serde(default)]
    pub location: Option<String>,
    /// Account SKU.
    #[serde(default)]
    pub sku: Option<Sku>,
    /// Account kind.
    #[serde(default)]
    pub kind: Option<String>,
    /// Storage account properties.
    #[serde(default)]
    pub properties: Option<StorageAccountProperties>,
}

/// Storage account properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageAccountProperties {
    /// Provisioning state: `Creating`, `ResolvingDNS`, or `Succeeded`.
    #[serde(rename = "provisioningState", default)]
    pub provisioning_state: Option<String>,
    /// Data-plane endpoints of the account.
    #[serde(rename = "primaryEndpoints", default)]
    pub primary_endpoints: Option<StorageEndpoints>,
}

/// Data-plane endpoints of a storage account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageEndpoints {
    /// Blob service endpoint.
    #[serde(default)]
    pub blob: Option<String>,
    /// Static-website endpoint.
    #[serde(default)]
    pub web: Option<String>,
}

/// A SKU reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sku {
    /// SKU name (e.g., `Standard_LRS`, `B1`).
    pub name: String,
    /// Pricing tier, where applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
}

/// A blob container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobContainer {
    /// Fully qualified ARM id.
    #[serde(default)]
    pub id: Option<String>,
    /// Container name.
    pub name: String,
    /// Container properties.
    #[serde(default)]
    pub properties: Option<BlobContainerProperties>,
}

/// Blob container properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobContainerProperties {
    /// Public access level: `None`, `Blob`, or `Container`.
    #[serde(rename = "publicAccess", default)]
    pub public_access: Option<String>,
}

/// Response of the `listKeys` operation.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageAccountKeyList {
    /// Access keys in ARM order; the first is the primary key.
    pub keys: Vec<StorageAccountKey>,
}

/// One storage account access key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageAccountKey {
    /// Key name (`key1` or `key2`).
    #[serde(rename = "keyName")]
    pub key_name: String,
    /// Key material.
    pub value: String,
    /// Permissions granted by the key.
    #[serde(default)]
    pub permissions: Option<String>,
}

/// Request body of the `listServiceSas` operation.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceSasRequest {
    /// Canonicalized resource path, e.g. `/blob/{account}/{container}`.
    #[serde(rename = "canonicalizedResource")]
    pub canonicalized_resource: String,
    /// Signed resource scope: `c` for container, `b` for blob.
    #[serde(rename = "signedResource")]
    pub signed_resource: String,
    /// Signed permissions, e.g. `r`.
    #[serde(rename = "signedPermission")]
    pub signed_permission: String,
    /// Allowed protocols; restricted to `https`.
    #[serde(rename = "signedProtocol")]
    pub signed_protocol: String,
    /// Window start, `YYYY-MM-DDTHH:MM:SSZ`.
    #[serde(rename = "signedStart")]
    pub signed_start: String,
    /// Window expiry, `YYYY-MM-DDTHH:MM:SSZ`.
    #[serde(rename = "signedExpiry")]
    pub signed_expiry: String,
}

/// Response of the `listServiceSas` operation.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSasResponse {
    /// The service SAS token, without a leading `?`.
    #[serde(rename = "serviceSasToken")]
    pub service_sas_token: String,
}

/// Request body of the `listAccountSas` operation.
#[derive(Debug, Clone, Serialize)]
pub struct AccountSasRequest {
    /// Signed services: `b` for blob.
    #[serde(rename = "signedServices")]
    pub signed_services: String,
    /// Signed resource types: `s` service, `c` container, `o` object.
    #[serde(rename = "signedResourceTypes")]
    pub signed_resource_types: String,
    /// Signed permissions, e.g. `rwc`.
    #[serde(rename = "signedPermission")]
    pub signed_permission: String,
    /// Allowed protocols; restricted to `https`.
    #[serde(rename = "signedProtocol")]
    pub signed_protocol: String,
    /// Window start, `YYYY-MM-DDTHH:MM:SSZ`.
    #[serde(rename = "signedStart")]
    pub signed_start: String,
    /// Window expiry, `YYYY-MM-DDTHH:MM:SSZ`.
    #[serde(rename = "signedExpiry")]
    pub signed_expiry: String,
}

/// Response of the `listAccountSas` operation.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountSasResponse {
    /// The account SAS token, without a leading `?`.
    #[serde(rename = "accountSasToken")]
    pub account_sas_token: String,
}

/// An App Service Plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppServicePlan {
    /// Fully qualified ARM id, referenced by the Web App's `serverFarmId`.
    pub id: String,
    /// Plan name.
    pub name: String,
    /// Plan SKU.
    #[serde(default)]
    pub sku: Option<AppServiceSku>,
}

/// SKU description of an App Service Plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppServiceSku {
    /// Size name (e.g., `B1`).
    pub name: String,
    /// Pricing tier (e.g., `Basic`).
    pub tier: String,
    /// Size within the tier.
    pub size: String,
    /// Number of workers.
    pub capacity: u32,
}

/// A Web App (ARM `Microsoft.Web/sites`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebApp {
    /// Fully qualified ARM id.
    #[serde(default)]
    pub id: Option<String>,
    /// Web App name.
    pub name: String,
    /// Web App properties.
    #[serde(default)]
    pub properties: Option<WebAppProperties>,
}

/// Properties of a Web App.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebAppProperties {
    /// Public hostname assigned by the platform.
    #[serde(rename = "defaultHostName", default)]
    pub default_host_name: Option<String>,
    /// Running state of the site.
    #[serde(default)]
    pub state: Option<String>,
    /// Site configuration.
    #[serde(rename = "siteConfig", default)]
    pub site_config: Option<SiteConfiguration>,
}

/// Site configuration of a Web App.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfiguration {
    /// Application settings.
    #[serde(rename = "appSettings", default)]
    pub app_settings: Vec<NameValuePair>,
    /// Default documents.
    #[serde(rename = "defaultDocuments", default, skip_serializing_if = "Vec::is_empty")]
    pub default_documents: Vec<String>,
}

/// A name/value application setting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NameValuePair {
    /// Setting name.
    pub name: String,
    /// Setting value.
    pub value: String,
}

impl WebApp {
    /// Returns the Web App's default hostname, if ARM reported one.
    #[must_use]
    pub fn default_host_name(&self) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|p| p.default_host_name.as_deref())
    }
}

impl StorageAccount {
    /// Returns the account's provisioning state, if reported.
    #[must_use]
    pub fn provisioning_state(&self) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|p| p.provisioning_state.as_deref())
    }
}
