//! Azure integration: ARM client, stack provisioning, SAS derivation, and
//! live observation.

mod client;
mod observer;
mod provisioner;
pub mod sas;
mod types;

pub use client::ArmClient;
pub use observer::{ObservedResource, ObservedState, SiteHealth, StackObserver, StackStatus};
pub use provisioner::{
    AzureProvisioner, PlanSettings, StackProvisioner, RUN_FROM_PACKAGE_SETTING,
};
pub use sas::{SasWindow, SAS_PERMISSION_READ};
pub use types::{
    AccountSasRequest, AccountSasResponse, AppServicePlan, AppServiceSku, BlobContainer,
    BlobContainerProperties, NameValuePair, ResourceGroup, ResourceGroupProperties,
    ServiceSasRequest, ServiceSasResponse, SiteConfiguration, Sku, StorageAccount,
    StorageAccountKey, StorageAccountKeyList, StorageAccountProperties, StorageEndpoints, WebApp,
    WebAppProperties,
};
