//! Configuration parser for loading the deployment configuration.
//!
//! This module handles loading configuration from YAML files and environment
//! variables, with proper precedence and error handling. Azure credentials
//! (ARM bearer token and subscription id) are read from the environment
//! only and never from the configuration file.

use crate::error::{ConfigError, Result, StratusError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::DeployConfig;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "stratus.deploy.yaml";

/// Environment variable holding the ARM bearer token.
pub const ENV_ARM_TOKEN: &str = "AZURE_ARM_TOKEN";

/// Environment variable holding the target subscription id.
pub const ENV_SUBSCRIPTION_ID: &str = "AZURE_SUBSCRIPTION_ID";

/// Configuration parser for loading deployment configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads `.env` from the base path, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if a `.env` file exists but cannot be read.
    pub fn load_dotenv(&self) -> Result<()> {
        let dir = self.base_path.clone().unwrap_or_else(|| PathBuf::from("."));
        let dotenv_path = dir.join(".env");

        if dotenv_path.exists() {
            dotenvy::from_path(&dotenv_path).map_err(|e| {
                StratusError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env: {e}"),
                    location: Some(dotenv_path.display().to_string()),
                })
            })?;
            debug!("Loaded environment from: {}", dotenv_path.display());
        }

        Ok(())
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<DeployConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(StratusError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            StratusError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        let mut config = self.parse_yaml(&content, Some(path))?;
        self.resolve_site_source(&mut config);
        Ok(config)
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<DeployConfig> {
        debug!("Parsing YAML configuration");

        let config: DeployConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            StratusError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!(
            "Successfully parsed configuration for project: {}",
            config.project.name
        );
        Ok(config)
    }

    /// Loads configuration with environment variable overrides applied.
    ///
    /// Overrides use the `STRATUS_<SECTION>_<KEY>` convention
    /// (e.g., `STRATUS_PROJECT_ENVIRONMENT`).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<DeployConfig> {
        let mut config = self.load_file(path)?;
        Self::apply_env_overrides(&mut config);
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(config: &mut DeployConfig) {
        if let Ok(name) = std::env::var("STRATUS_PROJECT_NAME") {
            debug!("Overriding project.name from environment");
            config.project.name = name;
        }

        if let Ok(env) = std::env::var("STRATUS_PROJECT_ENVIRONMENT") {
            debug!("Overriding project.environment from environment");
            config.project.environment = env;
        }

        if let Ok(location) = std::env::var("STRATUS_PROJECT_LOCATION") {
            debug!("Overriding project.location from environment");
            config.project.location = location;
        }

        if let Ok(account) = std::env::var("STRATUS_STORAGE_ACCOUNT") {
            debug!("Overriding storage.account from environment");
            config.storage.account = Some(account);
        }

        if let Ok(app) = std::env::var("STRATUS_APP_SERVICE_NAME") {
            debug!("Overriding app_service.name from environment");
            config.app_service.name = Some(app);
        }

        if let Ok(path) = std::env::var("STRATUS_STATE_PATH") {
            debug!("Overriding state.path from environment");
            config.state.path = Some(path);
        }
    }

    /// Makes a relative site source path absolute against the base path.
    fn resolve_site_source(&self, config: &mut DeployConfig) {
        if config.site.source.is_relative()
            && let Some(base) = &self.base_path
        {
            config.site.source = base.join(&config.site.source);
        }
    }

    /// Reads the ARM bearer token from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is unset or empty.
    pub fn get_arm_token() -> Result<String> {
        read_env_var(ENV_ARM_TOKEN)
    }

    /// Reads the target subscription id from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is unset or empty.
    pub fn get_subscription_id() -> Result<String> {
        read_env_var(ENV_SUBSCRIPTION_ID)
    }
}

/// Reads a required environment variable, treating empty values as missing.
fn read_env_var(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(StratusError::Config(ConfigError::MissingEnvVar {
            name: name.to_string(),
        })),
    }
}

/// Finds the configuration file starting from the given directory.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(dir: impl AsRef<Path>) -> Result<PathBuf> {
    let candidate = dir.as_ref().join(CONFIG_FILE_NAME);

    if candidate.exists() {
        return Ok(candidate);
    }

    Err(StratusError::Config(ConfigError::FileNotFound {
        path: candidate,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "project:\n  name: demo\nsite:\n  source: ./public\n";

    #[test]
    fn test_parse_yaml_valid() {
        let parser = ConfigParser::new();
        let config = parser.parse_yaml(SAMPLE, None).unwrap();

        assert_eq!(config.project.name, "demo");
        assert_eq!(config.site.source, PathBuf::from("./public"));
    }

    #[test]
    fn test_parse_yaml_invalid() {
        let parser = ConfigParser::new();
        let result = parser.parse_yaml("project: [not, a, map]\n", None);

        assert!(matches!(
            result,
            Err(StratusError::Config(ConfigError::ParseError { .. }))
        ));
    }

    #[test]
    fn test_load_file_missing() {
        let parser = ConfigParser::new();
        let result = parser.load_file("/nonexistent/stratus.deploy.yaml");

        assert!(matches!(
            result,
            Err(StratusError::Config(ConfigError::FileNotFound { .. }))
        ));
    }

    #[test]
    fn test_load_file_resolves_relative_source() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, SAMPLE).unwrap();

        let parser = ConfigParser::new().with_base_path(dir.path());
        let config = parser.load_file(&config_path).unwrap();

        assert_eq!(config.site.source, dir.path().join("./public"));
    }

    #[test]
    fn test_find_config_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_config_file(dir.path()).is_err());

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), SAMPLE).unwrap();
        assert!(find_config_file(dir.path()).is_ok());
    }
}
