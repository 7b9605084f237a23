//! Error types for the stratus deployment tool.
//!
//! This module provides the error hierarchy for every stage of the
//! deployment lifecycle: configuration, site packaging, state management,
//! Azure Resource Manager calls, and graph evaluation.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for stratus.
#[derive(Debug, Error)]
pub enum StratusError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Site packaging errors.
    #[error("Package error: {0}")]
    Package(#[from] PackageError),

    /// State management errors.
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Azure Resource Manager errors.
    #[error("Azure error: {0}")]
    Azure(#[from] AzureError),

    /// Deployment graph errors.
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },

    /// An Azure resource name derived from the configuration is invalid.
    #[error("Invalid {resource_type} name '{name}': {reason}")]
    InvalidResourceName {
        /// Type of resource (storage account, container, etc.).
        resource_type: String,
        /// The invalid name.
        name: String,
        /// Why the name is invalid.
        reason: String,
    },
}

/// Site packaging errors.
#[derive(Debug, Error)]
pub enum PackageError {
    /// The site source path does not exist.
    #[error("Site source not found: {path}")]
    SourceNotFound {
        /// Path to the missing source.
        path: PathBuf,
    },

    /// The site source is neither a directory nor a zip archive.
    #[error("Unsupported site source: {path} (expected a directory or a .zip file)")]
    UnsupportedSource {
        /// Path to the unsupported source.
        path: PathBuf,
    },

    /// The zip archive could not be built or read.
    #[error("Archive error: {message}")]
    Archive {
        /// Description of the archive failure.
        message: String,
    },

    /// The packaged site is empty.
    #[error("Site package is empty: {path}")]
    EmptyPackage {
        /// Path to the offending source.
        path: PathBuf,
    },
}

/// State management errors.
#[derive(Debug, Error)]
pub enum StateError {
    /// State file not found.
    #[error("State file not found: {path}")]
    NotFound {
        /// Path to the missing state file.
        path: PathBuf,
    },

    /// State is corrupted.
    #[error("State is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// State lock acquisition failed.
    #[error("Failed to acquire state lock: {message}")]
    LockFailed {
        /// Description of the lock failure.
        message: String,
    },

    /// State lock is held by another process.
    #[error("State is locked by another process (lock holder: {holder}, since: {since})")]
    LockedByOther {
        /// Identifier of the lock holder.
        holder: String,
        /// When the lock was acquired.
        since: String,
    },

    /// Serialization error.
    #[error("State serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },

    /// State version mismatch.
    #[error("State version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected state version.
        expected: String,
        /// Found state version.
        found: String,
    },
}

/// Azure Resource Manager errors.
#[derive(Debug, Error)]
pub enum AzureError {
    /// Authentication failed.
    #[error("Azure authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// API request failed.
    #[error("Azure API request failed: {status} - {message}")]
    ApiRequestFailed {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// A resource name is already taken (ARM 409).
    #[error("Resource name conflict for '{name}': {message}")]
    NameConflict {
        /// The conflicting name.
        name: String,
        /// Error message from the API.
        message: String,
    },

    /// Rate limited.
    #[error("Azure API rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Resource not found.
    #[error("Resource not found: {resource}")]
    ResourceNotFound {
        /// Identifier of the missing resource.
        resource: String,
    },

    /// Network error.
    #[error("Network error communicating with Azure: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from the API.
    #[error("Invalid response from Azure API: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },

    /// Timeout waiting for a resource to finish provisioning.
    #[error("Timeout waiting for {resource} to reach state {expected_state}")]
    ProvisioningTimeout {
        /// Identifier of the resource.
        resource: String,
        /// Expected provisioning state that was not reached.
        expected_state: String,
    },
}

/// Deployment graph errors.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A node's producing task failed, so its output will never resolve.
    #[error("Node '{node}' failed before producing its output")]
    ProducerFailed {
        /// Name of the failed node.
        node: String,
    },

    /// An output channel resolved without a value.
    #[error("Output of node '{node}' was never resolved")]
    Unresolved {
        /// Name of the node.
        node: String,
    },

    /// A node task panicked or was cancelled.
    #[error("Node task aborted: {message}")]
    TaskAborted {
        /// Description of the abort.
        message: String,
    },
}

/// Result type alias for stratus operations.
pub type Result<T> = std::result::Result<T, StratusError>;

impl StratusError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is retryable at the HTTP layer.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Azure(AzureError::RateLimited { .. } | AzureError::NetworkError { .. })
        )
    }

    /// Returns the suggested retry delay in seconds, if applicable.
    #[must_use]
    pub const fn retry_delay_secs(&self) -> Option<u64> {
        match self {
            Self::Azure(AzureError::RateLimited { retry_after_secs }) => Some(*retry_after_secs),
            Self::Azure(AzureError::NetworkError { .. }) => Some(5),
            _ => None,
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }
}

impl PackageError {
    /// Creates an archive error with the given message.
    #[must_use]
    pub fn archive(message: impl Into<String>) -> Self {
        Self::Archive {
            message: message.into(),
        }
    }
}

impl StateError {
    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }
}

impl AzureError {
    /// Creates an API request error.
    #[must_use]
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Creates an invalid-response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}
