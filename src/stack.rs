//! The static-website deployment graph.
//!
//! [`StaticSiteStack::build`] declares every resource of the stack as a
//! node on a [`DeploymentContext`] and wires the data edges between them
//! with deferred values. Nothing orders the nodes explicitly: the Web App
//! waits on the package URL, the package URL waits on the SAS token, the
//! token waits on the uploaded archive, and so on down to the resource
//! group. Independent branches (the storage chain and the App Service
//! Plan) provision concurrently.

use std::sync::Arc;

use crate::azure::{sas, PlanSettings, SasWindow, StackProvisioner};
use crate::config::DeployConfig;
use crate::error::{AzureError, StratusError};
use crate::graph::{DeploymentContext, Output};
use crate::package::SitePackage;

/// The resources (and resource-shaped operations) making up the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackResource {
    /// The resource group containing everything else.
    ResourceGroup,
    /// The storage account.
    StorageAccount,
    /// Static-website hosting configuration on the account.
    StaticWebsite,
    /// The private blob container.
    BlobContainer,
    /// The uploaded site archive blob.
    SiteArchive,
    /// The App Service Plan.
    AppServicePlan,
    /// The Web App.
    WebApp,
}

impl StackResource {
    /// All stack resources in provisioning order.
    pub const ALL: &'static [Self] = &[
        Self::ResourceGroup,
        Self::StorageAccount,
        Self::StaticWebsite,
        Self::BlobContainer,
        Self::SiteArchive,
        Self::AppServicePlan,
        Self::WebApp,
    ];

    /// Returns the stable node name of this resource.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ResourceGroup => "resource-group",
            Self::StorageAccount => "storage-account",
            Self::StaticWebsite => "static-website",
            Self::BlobContainer => "blob-container",
            Self::SiteArchive => "site-archive",
            Self::AppServicePlan => "app-service-plan",
            Self::WebApp => "web-app",
        }
    }
}

impl std::fmt::Display for StackResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Deferred outputs of a stack graph evaluation.
///
/// The last three are the stack's exported outputs; the rest feed state
/// recording after a successful run.
#[derive(Debug)]
pub struct StackOutputs {
    /// Resource group name.
    pub resource_group: Output<String>,
    /// Storage account name.
    pub storage_account: Output<String>,
    /// Package container name.
    pub container: Output<String>,
    /// Package blob name.
    pub blob: Output<String>,
    /// ARM id of the App Service Plan.
    pub app_service_plan_id: Output<String>,
    /// Primary storage access key (secret).
    pub primary_storage_key: Output<String>,
    /// SAS-signed URL of the site package.
    pub blob_url: Output<String>,
    /// Public hostname of the Web App.
    pub app_url: Output<String>,
}

/// Builder for the static-website deployment graph.
#[derive(Debug)]
pub struct StaticSiteStack;

impl StaticSiteStack {
    /// Declares the stack's nodes on the context and returns their
    /// deferred outputs. The graph starts provisioning immediately; await
    /// [`DeploymentContext::run`] to drive it to completion.
    ///
    /// When `skip_upload` is set the archive node resolves without
    /// re-uploading (the recorded package content is unchanged).
    #[must_use]
    pub fn build(
        ctx: &mut DeploymentContext,
        config: &DeployConfig,
        provisioner: Arc<dyn StackProvisioner>,
        package: SitePackage,
        skip_upload: bool,
    ) -> StackOutputs {
        let location = config.project.location.clone();
        let rg_name = config.resource_group_name();
        let account_name = config.storage_account_name();
        let sku = config.storage.sku;
        let kind = config.storage.kind;
        let sas_validity = config.sas_validity();

        let resource_group = {
            let p = Arc::clone(&provisioner);
            let name = rg_name;
            let location = location.clone();
            ctx.node(StackResource::ResourceGroup.name(), async move {
                let group = p.ensure_resource_group(&name, &location).await?;
                Ok(group.name)
            })
        };

        let storage_account = {
            let p = Arc::clone(&provisioner);
            let rg = resource_group.clone();
            let name = account_name;
            let location = location.clone();
            ctx.node(StackResource::StorageAccount.name(), async move {
                let rg = rg.resolve().await?;
                let account = p
                    .ensure_storage_account(&rg, &name, sku, kind, &location)
                    .await?;
                Ok(account.name)
            })
        };

        let _static_website = {
            let p = Arc::clone(&provisioner);
            let rg = resource_group.clone();
            let account = storage_account.clone();
            let index_document = config.storage.index_document.clone();
            let error_document = config.storage.error_document.clone();
            ctx.node(StackResource::StaticWebsite.name(), async move {
                let rg = rg.resolve().await?;
                let account = account.resolve().await?;
                p.enable_static_website(&rg, &account, &index_document, error_document.as_deref())
                    .await?;
                Ok(())
            })
        };

        let container = {
            let p = Arc::clone(&provisioner);
            let rg = resource_group.clone();
            let account = storage_account.clone();
            let name = config.storage.container.clone();
            ctx.node(StackResource::BlobContainer.name(), async move {
                let rg = rg.resolve().await?;
                let account = account.resolve().await?;
                let container = p.ensure_container(&rg, &account, &name).await?;
                Ok(container.name)
            })
        };

        let blob = {
            let p = Arc::clone(&provisioner);
            let rg = resource_group.clone();
            let account = storage_account.clone();
            let container = container.clone();
            let blob_name = config.storage.blob.clone();
            let content = package.into_content();
            ctx.node(StackResource::SiteArchive.name(), async move {
                let rg = rg.resolve().await?;
                let account = account.resolve().await?;
                let container = container.resolve().await?;

                if skip_upload {
                    tracing::info!("Site package unchanged, skipping upload");
                    return Ok(blob_name);
                }

                p.upload_site_blob(&rg, &account, &container, &blob_name, content)
                    .await
            })
        };

        // Derived value, not a resource: the window is computed when this
        // node evaluates, i.e. at deploy time once the archive exists.
        let sas_token = {
            let p = Arc::clone(&provisioner);
            let rg = resource_group.clone();
            let account = storage_account.clone();
            let container = container.clone();
            let blob = blob.clone();
            ctx.node("package-sas", async move {
                let rg = rg.resolve().await?;
                let account = account.resolve().await?;
                let container = container.resolve().await?;
                let _ = blob.resolve().await?;

                let window = SasWindow::starting_now(sas_validity);
                p.service_sas_token(&rg, &account, &container, &window).await
            })
        };

        let blob_url = storage_account
            .zip3(&container, &blob, "package-coordinates")
            .zip(&sas_token, "signed-package-coordinates")
            .map("blob-url", |((account, container, blob), token)| {
                sas::blob_url(&account, &container, &blob, Some(&token))
            });

        let app_service_plan_id = {
            let p = Arc::clone(&provisioner);
            let rg = resource_group.clone();
            let name = config.app_service_plan_name();
            let settings = PlanSettings {
                tier: config.app_service.tier.clone(),
                size: config.app_service.size.clone(),
                capacity: config.app_service.capacity,
            };
            let location = location.clone();
            ctx.node(StackResource::AppServicePlan.name(), async move {
                let rg = rg.resolve().await?;
                let plan = p
                    .ensure_app_service_plan(&rg, &name, &settings, &location)
                    .await?;
                Ok(plan.id)
            })
        };

        let app_url = {
            let p = Arc::clone(&provisioner);
            let rg = resource_group.clone();
            let plan_id = app_service_plan_id.clone();
            let package_url = blob_url.clone();
            let name = config.web_app_name();
            let default_documents = config.app_service.default_documents.clone();
            ctx.node(StackResource::WebApp.name(), async move {
                let rg = rg.resolve().await?;
                let plan_id = plan_id.resolve().await?;
                let package_url = package_url.resolve().await?;

                let app = p
                    .ensure_web_app(
                        &rg,
                        &name,
                        &plan_id,
                        &package_url,
                        &default_documents,
                        &location,
                    )
                    .await?;

                app.default_host_name()
                    .map(str::to_string)
                    .ok_or_else(|| {
                        StratusError::Azure(AzureError::invalid_response(
                            "Web App has no default hostname",
                        ))
                    })
            })
        };

        let primary_storage_key = {
            let p = Arc::clone(&provisioner);
            let rg = resource_group.clone();
            let account = storage_account.clone();
            ctx.node("primary-storage-key", async move {
                let rg = rg.resolve().await?;
                let account = account.resolve().await?;

                let keys = p.list_account_keys(&rg, &account).await?;
                keys.into_iter()
                    .next()
                    .map(|key| key.value)
                    .ok_or_else(|| {
                        StratusError::Azure(AzureError::invalid_response(
                            "Storage account returned no access keys",
                        ))
                    })
            })
        };

        StackOutputs {
            resource_group,
            storage_account,
            container,
            blob,
            app_service_plan_id,
            primary_storage_key,
            blob_url,
            app_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::azure::{
        AppServicePlan, BlobContainer, ResourceGroup, StorageAccount, StorageAccountKey, WebApp,
        WebAppProperties,
    };
    use crate::config::{StorageKind, StorageSku};
    use crate::error::Result;

    /// In-memory fake recording every provisioning call.
    #[derive(Debug, Default)]
    struct FakeProvisioner {
        calls: Mutex<Vec<String>>,
        web_app_package_url: Mutex<Option<String>>,
        fail_on: Option<&'static str>,
    }

    impl FakeProvisioner {
        fn failing_on(op: &'static str) -> Self {
            Self {
                fail_on: Some(op),
                ..Self::default()
            }
        }

        fn record(&self, op: &str) -> Result<()> {
            self.calls.lock().unwrap().push(op.to_string());
            if self.fail_on == Some(op) {
                return Err(StratusError::Azure(AzureError::api_error(500, "injected")));
            }
            Ok(())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StackProvisioner for FakeProvisioner {
        async fn ensure_resource_group(
            &self,
            name: &str,
            location: &str,
        ) -> Result<ResourceGroup> {
            self.record("resource_group")?;
            Ok(ResourceGroup {
                id: None,
                name: name.to_string(),
                location: location.to_string(),
                properties: None,
            })
        }

        async fn ensure_storage_account(
            &self,
            _resource_group: &str,
            name: &str,
            _sku: StorageSku,
            _kind: StorageKind,
            _location: &str,
        ) -> Result<StorageAccount> {
            self.record("storage_account")?;
            Ok(StorageAccount {
                id: None,
                name: name.to_string(),
                location: None,
                sku: None,
                kind: None,
                properties: None,
            })
        }

        async fn enable_static_website(
            &self,
            _resource_group: &str,
            _account: &str,
            _index_document: &str,
            _error_document: Option<&str>,
        ) -> Result<()> {
            self.record("static_website")
        }

        async fn ensure_container(
            &self,
            _resource_group: &str,
            _account: &str,
            container: &str,
        ) -> Result<BlobContainer> {
            self.record("container")?;
            Ok(BlobContainer {
                id: None,
                name: container.to_string(),
                properties: None,
            })
        }

        async fn upload_site_blob(
            &self,
            _resource_group: &str,
            _account: &str,
            _container: &str,
            blob: &str,
            _content: Vec<u8>,
        ) -> Result<String> {
            self.record("upload_blob")?;
            Ok(blob.to_string())
        }

        async fn service_sas_token(
            &self,
            _resource_group: &str,
            _account: &str,
            _container: &str,
            _window: &SasWindow,
        ) -> Result<String> {
            self.record("service_sas")?;
            Ok(String::from("abc"))
        }

        async fn list_account_keys(
            &self,
            _resource_group: &str,
            _account: &str,
        ) -> Result<Vec<StorageAccountKey>> {
            self.record("list_keys")?;
            Ok(vec![
                StorageAccountKey {
                    key_name: String::from("key1"),
                    value: String::from("primary-key-material"),
                    permissions: None,
                },
                StorageAccountKey {
                    key_name: String::from("key2"),
                    value: String::from("secondary-key-material"),
                    permissions: None,
                },
            ])
        }

        async fn ensure_app_service_plan(
            &self,
            _resource_group: &str,
            name: &str,
            _settings: &PlanSettings,
            _location: &str,
        ) -> Result<AppServicePlan> {
            self.record("app_service_plan")?;
            Ok(AppServicePlan {
                id: format!("/plans/{name}"),
                name: name.to_string(),
                sku: None,
            })
        }

        async fn ensure_web_app(
            &self,
            _resource_group: &str,
            name: &str,
            _plan_id: &str,
            package_url: &str,
            _default_documents: &[String],
            _location: &str,
        ) -> Result<WebApp> {
            self.record("web_app")?;
            *self.web_app_package_url.lock().unwrap() = Some(package_url.to_string());
            Ok(WebApp {
                id: None,
                name: name.to_string(),
                properties: Some(WebAppProperties {
                    default_host_name: Some(format!("{name}.azurewebsites.net")),
                    state: Some(String::from("Running")),
                    site_config: None,
                }),
            })
        }

        async fn delete_resource_group(&self, _name: &str) -> Result<()> {
            self.record("delete_resource_group")
        }
    }

    fn test_config() -> DeployConfig {
        serde_yaml::from_str(
            "project:\n  name: demo\nstorage:\n  account: sa123\nsite:\n  source: ./site\n",
        )
        .unwrap()
    }

    fn test_package() -> SitePackage {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        SitePackage::load(dir.path()).unwrap()
    }

    #[tokio::test]
    async fn test_full_stack_resolves_expected_outputs() {
        let provisioner = Arc::new(FakeProvisioner::default());
        let mut ctx = DeploymentContext::new();
        let outputs = StaticSiteStack::build(
            &mut ctx,
            &test_config(),
            Arc::clone(&provisioner) as Arc<dyn StackProvisioner>,
            test_package(),
            false,
        );

        ctx.run().await.unwrap();

        assert_eq!(
            outputs.blob_url.resolve().await.unwrap(),
            "https://sa123.blob.core.windows.net/webcontainer/website.zip?abc"
        );
        assert_eq!(
            outputs.primary_storage_key.resolve().await.unwrap(),
            "primary-key-material"
        );
        assert_eq!(
            outputs.app_url.resolve().await.unwrap(),
            "demo-dev-app.azurewebsites.net"
        );
        assert_eq!(outputs.resource_group.resolve().await.unwrap(), "demo-dev-rg");
    }

    #[tokio::test]
    async fn test_web_app_setting_equals_resolved_blob_url() {
        let provisioner = Arc::new(FakeProvisioner::default());
        let mut ctx = DeploymentContext::new();
        let outputs = StaticSiteStack::build(
            &mut ctx,
            &test_config(),
            Arc::clone(&provisioner) as Arc<dyn StackProvisioner>,
            test_package(),
            false,
        );

        ctx.run().await.unwrap();

        let blob_url = outputs.blob_url.resolve().await.unwrap();
        let setting = provisioner.web_app_package_url.lock().unwrap().clone();
        assert_eq!(setting.as_deref(), Some(blob_url.as_str()));
    }

    #[tokio::test]
    async fn test_dependency_order_is_enforced_by_data_edges() {
        let provisioner = Arc::new(FakeProvisioner::default());
        let mut ctx = DeploymentContext::new();
        let _outputs = StaticSiteStack::build(
            &mut ctx,
            &test_config(),
            Arc::clone(&provisioner) as Arc<dyn StackProvisioner>,
            test_package(),
            false,
        );

        ctx.run().await.unwrap();

        let calls = provisioner.calls();
        let position = |op: &str| calls.iter().position(|c| c == op).unwrap();

        assert!(position("resource_group") < position("storage_account"));
        assert!(position("storage_account") < position("container"));
        assert!(position("container") < position("upload_blob"));
        assert!(position("upload_blob") < position("service_sas"));
        assert!(position("service_sas") < position("web_app"));
        assert!(position("app_service_plan") < position("web_app"));
    }

    #[tokio::test]
    async fn test_storage_failure_aborts_before_web_app() {
        let provisioner = Arc::new(FakeProvisioner::failing_on("storage_account"));
        let mut ctx = DeploymentContext::new();
        let outputs = StaticSiteStack::build(
            &mut ctx,
            &test_config(),
            Arc::clone(&provisioner) as Arc<dyn StackProvisioner>,
            test_package(),
            false,
        );

        let err = ctx.run().await.unwrap_err();
        assert!(matches!(
            err,
            StratusError::Azure(AzureError::ApiRequestFailed { status: 500, .. })
        ));

        assert!(!provisioner.calls().contains(&String::from("web_app")));
        assert!(outputs.blob_url.resolve().await.is_err());
    }

    #[tokio::test]
    async fn test_skip_upload_still_resolves_blob() {
        let provisioner = Arc::new(FakeProvisioner::default());
        let mut ctx = DeploymentContext::new();
        let outputs = StaticSiteStack::build(
            &mut ctx,
            &test_config(),
            Arc::clone(&provisioner) as Arc<dyn StackProvisioner>,
            test_package(),
            true,
        );

        ctx.run().await.unwrap();

        assert_eq!(outputs.blob.resolve().await.unwrap(), "website.zip");
        assert!(!provisioner.calls().contains(&String::from("upload_blob")));
        // The SAS URL is still derived for the unchanged package.
        assert_eq!(
            outputs.blob_url.resolve().await.unwrap(),
            "https://sa123.blob.core.windows.net/webcontainer/website.zip?abc"
        );
    }
}
