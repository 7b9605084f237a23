//! Configuration validation.
//!
//! Validates the parsed configuration against Azure naming rules and the
//! constraints of the static-website stack before any API call is made.

use std::path::Path;

use crate::error::{ConfigError, Result, StratusError};

use super::spec::DeployConfig;

/// Maximum SAS validity accepted without a warning, in hours.
const SAS_WARN_HOURS: u32 = 24;

/// Maximum SAS validity accepted at all, in hours (one week).
const SAS_MAX_HOURS: u32 = 168;

/// App Service tiers known to this tool, with their size prefixes.
const KNOWN_TIERS: &[(&str, &str)] = &[
    ("Free", "F"),
    ("Shared", "D"),
    ("Basic", "B"),
    ("Standard", "S"),
    ("PremiumV2", "P"),
    ("PremiumV3", "P"),
];

/// Result of validating a configuration.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Non-fatal findings worth surfacing to the user.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true when validation produced no errors.
    ///
    /// Errors abort validation with an `Err`, so any returned result is
    /// valid by construction; this mirrors the calling convention of
    /// `validate`.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        true
    }
}

/// Validator for deployment configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Creates a new configuration validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError::ValidationError` describing the first rule
    /// violations encountered. Warnings never fail validation.
    pub fn validate(&self, config: &DeployConfig) -> Result<ValidationResult> {
        let mut errors = Vec::new();
        let mut result = ValidationResult::default();

        Self::validate_project(config, &mut errors);
        Self::validate_storage(config, &mut errors, &mut result.warnings);
        Self::validate_site(config, &mut errors);
        Self::validate_app_service(config, &mut errors, &mut result.warnings);
        Self::validate_sas(config, &mut errors, &mut result.warnings);

        if errors.is_empty() {
            Ok(result)
        } else {
            Err(StratusError::Config(ConfigError::validation_general(
                errors.join("; "),
            )))
        }
    }

    /// Validates project-level settings.
    fn validate_project(config: &DeployConfig, errors: &mut Vec<String>) {
        let name = &config.project.name;

        if name.is_empty() {
            errors.push(String::from("project.name must not be empty"));
        } else if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            errors.push(format!(
                "project.name '{name}' may only contain lowercase letters, digits, and hyphens"
            ));
        }

        if config.project.environment.is_empty() {
            errors.push(String::from("project.environment must not be empty"));
        }

        if config.project.location.is_empty() {
            errors.push(String::from("project.location must not be empty"));
        }
    }

    /// Validates storage account and container naming rules.
    fn validate_storage(
        config: &DeployConfig,
        errors: &mut Vec<String>,
        warnings: &mut Vec<String>,
    ) {
        let account = config.storage_account_name();
        if let Err(reason) = validate_storage_account_name(&account) {
            errors.push(format!("storage account name '{account}': {reason}"));
        }
        if config.storage.account.is_none() {
            warnings.push(format!(
                "storage account name derived as '{account}'; set storage.account to pin it"
            ));
        }

        let container = &config.storage.container;
        if let Err(reason) = validate_container_name(container) {
            errors.push(format!("storage.container '{container}': {reason}"));
        }

        if config.storage.blob.is_empty() {
            errors.push(String::from("storage.blob must not be empty"));
        } else if config.storage.blob.contains(['?', '#']) {
            errors.push(format!(
                "storage.blob '{}' must not contain '?' or '#'",
                config.storage.blob
            ));
        }

        if config.storage.index_document.is_empty() {
            errors.push(String::from("storage.index_document must not be empty"));
        } else if config.storage.index_document.contains('/') {
            errors.push(format!(
                "storage.index_document '{}' must be a file name, not a path",
                config.storage.index_document
            ));
        }
    }

    /// Validates the site source path.
    fn validate_site(config: &DeployConfig, errors: &mut Vec<String>) {
        let source: &Path = &config.site.source;

        if !source.exists() {
            errors.push(format!("site.source '{}' does not exist", source.display()));
            return;
        }

        let is_zip = source
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));

        if !source.is_dir() && !is_zip {
            errors.push(format!(
                "site.source '{}' must be a directory or a .zip archive",
                source.display()
            ));
        }
    }

    /// Validates the App Service plan settings.
    fn validate_app_service(
        config: &DeployConfig,
        errors: &mut Vec<String>,
        warnings: &mut Vec<String>,
    ) {
        let app = &config.app_service;

        if app.capacity == 0 {
            errors.push(String::from("app_service.capacity must be at least 1"));
        }

        match KNOWN_TIERS.iter().find(|(tier, _)| *tier == app.tier) {
            Some((_, size_prefix)) => {
                if !app.size.starts_with(size_prefix) {
                    warnings.push(format!(
                        "app_service.size '{}' is unusual for tier '{}'",
                        app.size, app.tier
                    ));
                }
            }
            None => {
                warnings.push(format!("app_service.tier '{}' is not recognized", app.tier));
            }
        }

        let web_app = config.web_app_name();
        if web_app.len() > 60 {
            errors.push(format!(
                "web app name '{web_app}' exceeds 60 characters; set app_service.name"
            ));
        }
    }

    /// Validates the SAS validity window.
    fn validate_sas(config: &DeployConfig, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
        let hours = config.sas.validity_hours;

        if hours == 0 {
            errors.push(String::from("sas.validity_hours must be at least 1"));
        } else if hours > SAS_MAX_HOURS {
            errors.push(format!(
                "sas.validity_hours {hours} exceeds the maximum of {SAS_MAX_HOURS}"
            ));
        } else if hours > SAS_WARN_HOURS {
            warnings.push(format!(
                "sas.validity_hours {hours} leaves the package URL readable for over a day"
            ));
        }
    }
}

/// Checks a storage account name against Azure rules: 3-24 characters,
/// lowercase letters and digits only.
fn validate_storage_account_name(name: &str) -> std::result::Result<(), String> {
    if name.len() < 3 || name.len() > 24 {
        return Err(String::from("must be 3-24 characters"));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Err(String::from(
            "may only contain lowercase letters and digits",
        ));
    }

    Ok(())
}

/// Checks a blob container name against Azure rules: 3-63 characters,
/// lowercase letters, digits and single hyphens, starting and ending with
/// a letter or digit.
fn validate_container_name(name: &str) -> std::result::Result<(), String> {
    if name.len() < 3 || name.len() > 63 {
        return Err(String::from("must be 3-63 characters"));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(String::from(
            "may only contain lowercase letters, digits, and hyphens",
        ));
    }

    if name.starts_with('-') || name.ends_with('-') {
        return Err(String::from("must start and end with a letter or digit"));
    }

    if name.contains("--") {
        return Err(String::from("must not contain consecutive hyphens"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config(dir: &Path) -> DeployConfig {
        let yaml = format!(
            "project:\n  name: demo\nsite:\n  source: {}\n",
            dir.display()
        );
        serde_yaml::from_str(&yaml).unwrap()
    }

    #[test]
    fn test_valid_config_passes() {
        let dir = tempfile::tempdir().unwrap();
        let config = valid_config(dir.path());

        let result = ConfigValidator::new().validate(&config).unwrap();
        assert!(result.is_valid());
    }

    #[test]
    fn test_missing_site_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = valid_config(dir.path());
        config.site.source = dir.path().join("missing");

        assert!(ConfigValidator::new().validate(&config).is_err());
    }

    #[test]
    fn test_bad_storage_account_name_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = valid_config(dir.path());
        config.storage.account = Some(String::from("Invalid_Name"));

        assert!(ConfigValidator::new().validate(&config).is_err());
    }

    #[test]
    fn test_bad_container_name_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = valid_config(dir.path());
        config.storage.container = String::from("-leading-hyphen");

        assert!(ConfigValidator::new().validate(&config).is_err());
    }

    #[test]
    fn test_zero_sas_validity_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = valid_config(dir.path());
        config.sas.validity_hours = 0;

        assert!(ConfigValidator::new().validate(&config).is_err());
    }

    #[test]
    fn test_long_sas_validity_warns() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = valid_config(dir.path());
        config.sas.validity_hours = 48;

        let result = ConfigValidator::new().validate(&config).unwrap();
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn test_unusual_size_for_tier_warns() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = valid_config(dir.path());
        config.app_service.size = String::from("S1");

        let result = ConfigValidator::new().validate(&config).unwrap();
        assert!(
            result
                .warnings
                .iter()
                .any(|w| w.contains("unusual for tier"))
        );
    }

    #[test]
    fn test_storage_account_name_rules() {
        assert!(validate_storage_account_name("abc").is_ok());
        assert!(validate_storage_account_name("sa123").is_ok());
        assert!(validate_storage_account_name("ab").is_err());
        assert!(validate_storage_account_name("UPPER").is_err());
        assert!(validate_storage_account_name("with-hyphen").is_err());
        assert!(validate_storage_account_name(&"a".repeat(25)).is_err());
    }

    #[test]
    fn test_container_name_rules() {
        assert!(validate_container_name("webcontainer").is_ok());
        assert!(validate_container_name("site-packages").is_ok());
        assert!(validate_container_name("ab").is_err());
        assert!(validate_container_name("double--hyphen").is_err());
        assert!(validate_container_name("trailing-").is_err());
    }
}
