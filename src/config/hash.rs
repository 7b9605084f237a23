//! Configuration hashing for change detection.
//!
//! Deterministic per-resource hashes of the configuration let a re-run of
//! the declarative graph classify each node as unchanged, changed, or new
//! without querying Azure.

use sha2::{Digest, Sha256};

use crate::stack::StackResource;

use super::spec::DeployConfig;

/// Hasher for computing configuration hashes.
#[derive(Debug, Default)]
pub struct ConfigHasher;

impl ConfigHasher {
    /// Creates a new configuration hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes a hash over the entire deployment configuration plus the
    /// site package content hash.
    ///
    /// This hash changes when any input to the stack changes.
    #[must_use]
    pub fn hash_config(&self, config: &DeployConfig, package_hash: &str) -> String {
        let mut hasher = Sha256::new();

        for resource in StackResource::ALL {
            hasher.update(self.hash_resource(config, *resource, package_hash).as_bytes());
        }

        hex::encode(hasher.finalize())
    }

    /// Computes the hash of the configuration slice feeding one stack
    /// resource.
    ///
    /// `package_hash` is the content hash of the packaged site; it only
    /// contributes to the site-archive resource (and, through the SAS URL,
    /// to the Web App).
    #[must_use]
    pub fn hash_resource(
        &self,
        config: &DeployConfig,
        resource: StackResource,
        package_hash: &str,
    ) -> String {
        let mut hasher = Sha256::new();

        // Every resource lives in the project's resource group and region.
        hasher.update(config.project.name.as_bytes());
        hasher.update(config.project.environment.as_bytes());
        hasher.update(config.project.location.as_bytes());

        match resource {
            StackResource::ResourceGroup => {
                hasher.update(config.resource_group_name().as_bytes());
            }
            StackResource::StorageAccount => {
                hasher.update(config.storage_account_name().as_bytes());
                hasher.update(config.storage.sku.as_arm().as_bytes());
                hasher.update(config.storage.kind.as_arm().as_bytes());
            }
            StackResource::StaticWebsite => {
                hasher.update(config.storage.index_document.as_bytes());
                if let Some(error_doc) = &config.storage.error_document {
                    hasher.update(error_doc.as_bytes());
                }
            }
            StackResource::BlobContainer => {
                hasher.update(config.storage.container.as_bytes());
            }
            StackResource::SiteArchive => {
                hasher.update(config.storage.container.as_bytes());
                hasher.update(config.storage.blob.as_bytes());
                hasher.update(package_hash.as_bytes());
            }
            StackResource::AppServicePlan => {
                hasher.update(config.app_service_plan_name().as_bytes());
                hasher.update(config.app_service.tier.as_bytes());
                hasher.update(config.app_service.size.as_bytes());
                hasher.update(config.app_service.capacity.to_be_bytes());
            }
            StackResource::WebApp => {
                hasher.update(config.web_app_name().as_bytes());
                hasher.update(config.sas.validity_hours.to_be_bytes());
                for doc in &config.app_service.default_documents {
                    hasher.update(doc.as_bytes());
                }
                // The run-from-package setting embeds the blob URL, so the
                // Web App must redeploy when the package changes.
                hasher.update(config.storage.blob.as_bytes());
                hasher.update(package_hash.as_bytes());
            }
        }

        hex::encode(hasher.finalize())
    }

    /// Computes a short hash (first 8 characters) for display purposes.
    #[must_use]
    pub fn short_hash(&self, hash: &str) -> String {
        hash.chars().take(8).collect()
    }

    /// Compares two hashes in constant time.
    #[must_use]
    pub fn hashes_match(hash1: &str, hash2: &str) -> bool {
        if hash1.len() != hash2.len() {
            return false;
        }

        hash1
            .bytes()
            .zip(hash2.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> DeployConfig {
        serde_yaml::from_str("project:\n  name: demo\nsite:\n  source: ./site\n").unwrap()
    }

    #[test]
    fn test_resource_hash_deterministic() {
        let hasher = ConfigHasher::new();
        let config = test_config();

        let hash1 = hasher.hash_resource(&config, StackResource::StorageAccount, "pkg");
        let hash2 = hasher.hash_resource(&config, StackResource::StorageAccount, "pkg");

        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_resources_hash_differently() {
        let hasher = ConfigHasher::new();
        let config = test_config();

        let account = hasher.hash_resource(&config, StackResource::StorageAccount, "pkg");
        let container = hasher.hash_resource(&config, StackResource::BlobContainer, "pkg");

        assert_ne!(account, container);
    }

    #[test]
    fn test_package_change_touches_archive_and_web_app_only() {
        let hasher = ConfigHasher::new();
        let config = test_config();

        for resource in StackResource::ALL {
            let before = hasher.hash_resource(&config, *resource, "pkg-a");
            let after = hasher.hash_resource(&config, *resource, "pkg-b");

            let expect_change = matches!(
                resource,
                StackResource::SiteArchive | StackResource::WebApp
            );
            assert_eq!(before != after, expect_change, "resource {resource}");
        }
    }

    #[test]
    fn test_sku_change_touches_storage_account() {
        let hasher = ConfigHasher::new();
        let config = test_config();
        let mut changed = test_config();
        changed.storage.sku = crate::config::StorageSku::StandardGrs;

        assert_ne!(
            hasher.hash_resource(&config, StackResource::StorageAccount, "pkg"),
            hasher.hash_resource(&changed, StackResource::StorageAccount, "pkg"),
        );
        assert_eq!(
            hasher.hash_resource(&config, StackResource::BlobContainer, "pkg"),
            hasher.hash_resource(&changed, StackResource::BlobContainer, "pkg"),
        );
    }

    #[test]
    fn test_short_hash() {
        let hasher = ConfigHasher::new();
        let short = hasher.short_hash("abcdef1234567890");

        assert_eq!(short, "abcdef12");
    }

    #[test]
    fn test_hashes_match() {
        assert!(ConfigHasher::hashes_match("abc123", "abc123"));
        assert!(!ConfigHasher::hashes_match("abc123", "abc124"));
        assert!(!ConfigHasher::hashes_match("abc123", "abc12"));
    }
}
