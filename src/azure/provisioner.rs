//! Stack provisioning operations against Azure.
//!
//! [`StackProvisioner`] is the seam between the deployment graph and the
//! cloud: one method per operation the stack performs. [`AzureProvisioner`]
//! implements it over the ARM client; tests drive the graph with an
//! in-memory fake instead.

use async_trait::async_trait;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::config::{StorageKind, StorageSku};
use crate::error::{AzureError, Result, StratusError};

use super::client::ArmClient;
use super::sas::{self, SasWindow, SAS_PERMISSION_READ};
use super::types::{
    AccountSasRequest, AccountSasResponse, AppServicePlan, BlobContainer, ResourceGroup,
    ServiceSasRequest, ServiceSasResponse, StorageAccount, StorageAccountKey,
    StorageAccountKeyList, WebApp,
};

/// API version for resource group operations.
const RESOURCES_API: &str = "2022-09-01";

/// API version for storage operations.
const STORAGE_API: &str = "2023-01-01";

/// API version for App Service operations.
const WEB_API: &str = "2023-12-01";

/// App setting directing the platform to run the site from a package URL.
pub const RUN_FROM_PACKAGE_SETTING: &str = "WEBSITE_RUN_FROM_PACKAGE";

/// Content type of the uploaded site archive.
const PACKAGE_CONTENT_TYPE: &str = "application/zip";

/// Validity of the short-lived account SAS used for data-plane writes.
const UPLOAD_SAS_MINUTES: i64 = 15;

/// Interval between provisioning-state polls.
const POLL_INTERVAL_SECS: u64 = 3;

/// Maximum number of provisioning-state polls before timing out.
const MAX_POLL_ATTEMPTS: u32 = 60;

/// SKU settings for an App Service Plan.
#[derive(Debug, Clone)]
pub struct PlanSettings {
    /// Pricing tier (e.g., `Basic`).
    pub tier: String,
    /// Instance size (e.g., `B1`).
    pub size: String,
    /// Number of workers.
    pub capacity: u32,
}

/// Provisioning operations needed by the static-website stack.
#[async_trait]
pub trait StackProvisioner: Send + Sync {
    /// Creates or updates the resource group.
    async fn ensure_resource_group(&self, name: &str, location: &str) -> Result<ResourceGroup>;

    /// Creates or updates the storage account and waits until it is ready.
    async fn ensure_storage_account(
        &self,
        resource_group: &str,
        name: &str,
        sku: StorageSku,
        kind: StorageKind,
        location: &str,
    ) -> Result<StorageAccount>;

    /// Enables static-website hosting on the storage account.
    async fn enable_static_website(
        &self,
        resource_group: &str,
        account: &str,
        index_document: &str,
        error_document: Option<&str>,
    ) -> Result<()>;

    /// Creates or updates the private blob container.
    async fn ensure_container(
        &self,
        resource_group: &str,
        account: &str,
        container: &str,
    ) -> Result<BlobContainer>;

    /// Uploads the site archive and returns the blob name.
    async fn upload_site_blob(
        &self,
        resource_group: &str,
        account: &str,
        container: &str,
        blob: &str,
        content: Vec<u8>,
    ) -> Result<String>;

    /// Requests a read-only, HTTPS-only, container-scoped service SAS for
    /// the given window.
    async fn service_sas_token(
        &self,
        resource_group: &str,
        account: &str,
        container: &str,
        window: &SasWindow,
    ) -> Result<String>;

    /// Lists the storage account access keys in ARM order.
    async fn list_account_keys(
        &self,
        resource_group: &str,
        account: &str,
    ) -> Result<Vec<StorageAccountKey>>;

    /// Creates or updates the App Service Plan.
    async fn ensure_app_service_plan(
        &self,
        resource_group: &str,
        name: &str,
        settings: &PlanSettings,
        location: &str,
    ) -> Result<AppServicePlan>;

    /// Creates or updates the Web App, configured to run from the package
    /// URL.
    async fn ensure_web_app(
        &self,
        resource_group: &str,
        name: &str,
        plan_id: &str,
        package_url: &str,
        default_documents: &[String],
        location: &str,
    ) -> Result<WebApp>;

    /// Deletes the resource group and everything in it.
    async fn delete_resource_group(&self, name: &str) -> Result<()>;
}

/// ARM-backed implementation of [`StackProvisioner`].
#[derive(Debug, Clone)]
pub struct AzureProvisioner {
    /// ARM API client.
    client: ArmClient,
}

impl AzureProvisioner {
    /// Creates a new provisioner over the given ARM client.
    #[must_use]
    pub const fn new(client: ArmClient) -> Self {
        Self { client }
    }

    /// Returns the ARM path of a storage account.
    fn storage_path(resource_group: &str, account: &str) -> String {
        format!(
            "/resourceGroups/{resource_group}/providers/Microsoft.Storage/storageAccounts/{account}"
        )
    }

    /// Mints a short-lived account SAS for data-plane writes.
    async fn write_account_sas(
        &self,
        resource_group: &str,
        account: &str,
        resource_types: &str,
        permissions: &str,
    ) -> Result<String> {
        let window = SasWindow::starting_now(chrono::Duration::minutes(UPLOAD_SAS_MINUTES));
        let request = AccountSasRequest {
            signed_services: String::from("b"),
            signed_resource_types: resource_types.to_string(),
            signed_permission: permissions.to_string(),
            signed_protocol: String::from("https"),
            signed_start: window.signed_start(),
            signed_expiry: window.signed_expiry(),
        };

        let response: AccountSasResponse = self
            .client
            .post_action(
                &Self::storage_path(resource_group, account),
                "ListAccountSas",
                STORAGE_API,
                &request,
            )
            .await?;

        Ok(response.account_sas_token)
    }

    /// Polls the storage account until ARM reports `Succeeded`.
    async fn wait_storage_account_ready(&self, path: &str) -> Result<StorageAccount> {
        for attempt in 0..MAX_POLL_ATTEMPTS {
            match self
                .client
                .get_resource::<StorageAccount>(path, STORAGE_API)
                .await
            {
                Ok(account) => match account.provisioning_state() {
                    Some("Succeeded") => return Ok(account),
                    state => {
                        debug!(
                            "Storage account provisioning state: {} (attempt {attempt})",
                            state.unwrap_or("unknown")
                        );
                    }
                },
                // The account may not be visible immediately after the
                // accepted PUT.
                Err(StratusError::Azure(AzureError::ResourceNotFound { .. })) => {
                    debug!("Storage account not yet visible (attempt {attempt})");
                }
                Err(e) => return Err(e),
            }

            sleep(Duration::from_secs(POLL_INTERVAL_SECS)).await;
        }

        Err(StratusError::Azure(AzureError::ProvisioningTimeout {
            resource: path.to_string(),
            expected_state: String::from("Succeeded"),
        }))
    }

    /// Builds the service-properties XML enabling static-website hosting.
    fn static_website_properties(index_document: &str, error_document: Option<&str>) -> String {
        let error_fragment = error_document.map_or_else(String::new, |doc| {
            format!("<ErrorDocument404Path>{doc}</ErrorDocument404Path>")
        });

        format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
             <StorageServiceProperties><StaticWebsite><Enabled>true</Enabled>\
             <IndexDocument>{index_document}</IndexDocument>{error_fragment}\
             </StaticWebsite></StorageServiceProperties>"
        )
    }
}

#[async_trait]
impl StackProvisioner for AzureProvisioner {
    async fn ensure_resource_group(&self, name: &str, location: &str) -> Result<ResourceGroup> {
        info!("Ensuring resource group: {name}");

        let body = serde_json::json!({ "location": location });
        self.client
            .put_resource(&format!("/resourceGroups/{name}"), RESOURCES_API, &body)
            .await
    }

    async fn ensure_storage_account(
        &self,
        resource_group: &str,
        name: &str,
        sku: StorageSku,
        kind: StorageKind,
        location: &str,
    ) -> Result<StorageAccount> {
        info!("Ensuring storage account: {name}");

        let path = Self::storage_path(resource_group, name);
        let body = serde_json::json!({
            "location": location,
            "sku": { "name": sku.as_arm() },
            "kind": kind.as_arm(),
            "properties": {}
        });

        // The create is asynchronous on ARM's side; the PUT is accepted
        // with an empty body and the account is polled until ready.
        self.client
            .put_resource_accepted(&path, STORAGE_API, &body)
            .await?;

        let account = self.wait_storage_account_ready(&path).await?;
        info!("Storage account ready: {name}");
        Ok(account)
    }

    async fn enable_static_website(
        &self,
        resource_group: &str,
        account: &str,
        index_document: &str,
        error_document: Option<&str>,
    ) -> Result<()> {
        info!("Enabling static website on account: {account}");

        let token = self
            .write_account_sas(resource_group, account, "s", "w")
            .await?;
        let url = format!(
            "{}/?restype=service&comp=properties&{token}",
            sas::blob_service_endpoint(account)
        );
        let body = Self::static_website_properties(index_document, error_document);

        self.client.put_service_properties(&url, body).await
    }

    async fn ensure_container(
        &self,
        resource_group: &str,
        account: &str,
        container: &str,
    ) -> Result<BlobContainer> {
        info!("Ensuring blob container: {container}");

        let path = format!(
            "{}/blobServices/default/containers/{container}",
            Self::storage_path(resource_group, account)
        );
        // Private: the Web App reads the package through the SAS URL.
        let body = serde_json::json!({ "properties": { "publicAccess": "None" } });

        self.client.put_resource(&path, STORAGE_API, &body).await
    }

    async fn upload_site_blob(
        &self,
        resource_group: &str,
        account: &str,
        container: &str,
        blob: &str,
        content: Vec<u8>,
    ) -> Result<String> {
        info!("Uploading site archive: {container}/{blob} ({} bytes)", content.len());

        let token = self
            .write_account_sas(resource_group, account, "o", "cw")
            .await?;
        let url = format!(
            "{}/{container}/{blob}?{token}",
            sas::blob_service_endpoint(account)
        );

        self.client
            .put_blob(&url, content, PACKAGE_CONTENT_TYPE)
            .await?;

        Ok(blob.to_string())
    }

    async fn service_sas_token(
        &self,
        resource_group: &str,
        account: &str,
        container: &str,
        window: &SasWindow,
    ) -> Result<String> {
        debug!("Requesting service SAS for container: {container}");

        let request = ServiceSasRequest {
            canonicalized_resource: sas::canonicalized_container(account, container),
            signed_resource: String::from("c"),
            signed_permission: String::from(SAS_PERMISSION_READ),
            signed_protocol: String::from("https"),
            signed_start: window.signed_start(),
            signed_expiry: window.signed_expiry(),
        };

        let response: ServiceSasResponse = self
            .client
            .post_action(
                &Self::storage_path(resource_group, account),
                "ListServiceSas",
                STORAGE_API,
                &request,
            )
            .await?;

        Ok(response.service_sas_token)
    }

    async fn list_account_keys(
        &self,
        resource_group: &str,
        account: &str,
    ) -> Result<Vec<StorageAccountKey>> {
        debug!("Listing access keys for account: {account}");

        let response: StorageAccountKeyList = self
            .client
            .post_action(
                &Self::storage_path(resource_group, account),
                "listKeys",
                STORAGE_API,
                &serde_json::json!({}),
            )
            .await?;

        Ok(response.keys)
    }

    async fn ensure_app_service_plan(
        &self,
        resource_group: &str,
        name: &str,
        settings: &PlanSettings,
        location: &str,
    ) -> Result<AppServicePlan> {
        info!("Ensuring App Service Plan: {name}");

        let path = format!(
            "/resourceGroups/{resource_group}/providers/Microsoft.Web/serverfarms/{name}"
        );
        let body = serde_json::json!({
            "location": location,
            "sku": {
                "name": settings.size,
                "tier": settings.tier,
                "size": settings.size,
                "capacity": settings.capacity
            }
        });

        self.client.put_resource(&path, WEB_API, &body).await
    }

    async fn ensure_web_app(
        &self,
        resource_group: &str,
        name: &str,
        plan_id: &str,
        package_url: &str,
        default_documents: &[String],
        location: &str,
    ) -> Result<WebApp> {
        info!("Ensuring Web App: {name}");

        let path =
            format!("/resourceGroups/{resource_group}/providers/Microsoft.Web/sites/{name}");

        let mut site_config = serde_json::json!({
            "appSettings": [
                { "name": RUN_FROM_PACKAGE_SETTING, "value": package_url }
            ]
        });
        if !default_documents.is_empty() {
            site_config["defaultDocuments"] = serde_json::json!(default_documents);
        }

        let body = serde_json::json!({
            "location": location,
            "properties": {
                "serverFarmId": plan_id,
                "httpsOnly": true,
                "siteConfig": site_config
            }
        });

        self.client.put_resource(&path, WEB_API, &body).await
    }

    async fn delete_resource_group(&self, name: &str) -> Result<()> {
        warn!("Deleting resource group: {name}");

        self.client
            .delete_resource(&format!("/resourceGroups/{name}"), RESOURCES_API)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_website_properties_with_error_document() {
        let xml = AzureProvisioner::static_website_properties("index.html", Some("404.html"));

        assert!(xml.contains("<Enabled>true</Enabled>"));
        assert!(xml.contains("<IndexDocument>index.html</IndexDocument>"));
        assert!(xml.contains("<ErrorDocument404Path>404.html</ErrorDocument404Path>"));
    }

    #[test]
    fn test_static_website_properties_without_error_document() {
        let xml = AzureProvisioner::static_website_properties("index.html", None);

        assert!(xml.contains("<IndexDocument>index.html</IndexDocument>"));
        assert!(!xml.contains("ErrorDocument404Path"));
    }

    #[test]
    fn test_storage_path() {
        assert_eq!(
            AzureProvisioner::storage_path("demo-rg", "sa123"),
            "/resourceGroups/demo-rg/providers/Microsoft.Storage/storageAccounts/sa123"
        );
    }
}
