//! Configuration parsing, validation, and hashing.

mod hash;
mod parser;
mod spec;
mod validator;

pub use hash::ConfigHasher;
pub use parser::{
    find_config_file, ConfigParser, CONFIG_FILE_NAME, ENV_ARM_TOKEN, ENV_SUBSCRIPTION_ID,
};
pub use spec::{
    AppServiceConfig, DeployConfig, ProjectConfig, SasConfig, SiteConfig, StateConfig,
    StorageConfig, StorageKind, StorageSku,
};
pub use validator::{ConfigValidator, ValidationResult};
