//! # Model Hub Errors
//!
//! Error taxonomy shared by the configuration pipeline, the secret store and
//! the service registry.
//!
//! - Uses `thiserror` for structured error definitions
//! - Named fields everywhere so messages stay readable in logs
//! - Caller mistakes (unknown ids, missing adapters) are distinct variants so
//!   they can be surfaced without string matching

use thiserror::Error;

/// Configuration pipeline errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The merged tree failed schema validation. The previous snapshot is kept.
    #[error("Settings validation failed: {reason}")]
    Validation { reason: String },

    /// A configuration source could not be read. The manager downgrades this
    /// to an empty partial tree.
    #[error("Configuration source {source_name} failed: {reason}")]
    SourceRead { source_name: String, reason: String },

    #[error("Unsupported configuration format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Export to {path} failed: {reason}")]
    Export { path: String, reason: String },
}

/// Secret store errors
#[derive(Debug, Error)]
pub enum SecretError {
    /// Token is malformed or was sealed with a different key.
    #[error("Failed to decrypt sensitive value: {reason}")]
    Decryption { reason: String },

    #[error("Failed to encrypt sensitive value: {reason}")]
    Encryption { reason: String },

    #[error("Env file {path}: {reason}")]
    EnvFile { path: String, reason: String },

    #[error("Missing required environment variables: {}", keys.join(","))]
    MissingRequired { keys: Vec<String> },
}

/// Durable file store errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error at {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Malformed document at {path}: {reason}")]
    Malformed { path: String, reason: String },
}

impl StorageError {
    pub fn path(&self) -> &str {
        match self {
            Self::Io { path, .. } | Self::Malformed { path, .. } => path,
        }
    }
}

/// Provider adapter errors, returned across the backend boundary
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Backend build for {provider} failed: {reason}")]
    BuildFailed { provider: String, reason: String },
}

/// Service registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Unknown registration id, or a purpose with no default.
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    #[error("No provider adapter registered for {provider}")]
    ProviderNotRegistered { provider: String },

    #[error("Registry persistence at {path} failed: {reason}")]
    Persistence { path: String, reason: String },

    #[error("Invalid overlay value for {field}: {reason}")]
    InvalidOverlay { field: String, reason: String },

    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Either a model id or a purpose must be provided")]
    MissingTarget,

    #[error("Score for {purpose} must be a finite number, got {score}")]
    InvalidScore { purpose: String, score: f64 },

    #[error("Purpose tag must not be empty")]
    EmptyPurpose,

    /// Only active models can be made the default for a purpose.
    #[error("Model {id} is {status} and cannot be a default")]
    InactiveDefault { id: String, status: String },
}

impl From<StorageError> for RegistryError {
    fn from(err: StorageError) -> Self {
        Self::Persistence {
            path: err.path().to_string(),
            reason: err.to_string(),
        }
    }
}

impl RegistryError {
    pub fn model_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: "model".to_string(),
            id: id.into(),
        }
    }

    pub fn purpose_not_found(purpose: impl Into<String>) -> Self {
        Self::NotFound {
            resource: "default model for purpose".to_string(),
            id: purpose.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_required_lists_every_key() {
        let err = SecretError::MissingRequired {
            keys: vec!["A".to_string(), "B".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Missing required environment variables: A,B"
        );
    }

    #[test]
    fn test_not_found_helpers() {
        let err = RegistryError::model_not_found("openai-gpt-4");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "model not found: openai-gpt-4");

        let err = RegistryError::purpose_not_found("qa");
        assert!(err.is_not_found());
        assert!(err.to_string().contains("qa"));
    }

    #[test]
    fn test_storage_error_becomes_persistence() {
        let err: RegistryError = StorageError::Io {
            path: "/tmp/registry/a.json".to_string(),
            reason: "read-only file system".to_string(),
        }
        .into();
        match err {
            RegistryError::Persistence { path, reason } => {
                assert_eq!(path, "/tmp/registry/a.json");
                assert!(reason.contains("read-only"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_adapter_error_converts() {
        let err: RegistryError = AdapterError::BuildFailed {
            provider: "local".to_string(),
            reason: "no base url".to_string(),
        }
        .into();
        assert!(matches!(err, RegistryError::Adapter(_)));
    }
}
