//! # Configuration System
//!
//! Centralized configuration management for the model hub.
//!
//! This crate provides:
//! - The settings schema with per-field defaults
//! - Environment variable loading through a fixed name-to-path table
//! - Configuration file loading (YAML/JSON/TOML)
//! - Ordered source merging with schema-guided type coercion
//! - Validation with rollback to the previous snapshot
//! - Sanitized export
//!
//! # Best Practices
//!
//! - Uses `validator` crate for input validation
//! - Follows 12-factor app configuration principles
//! - Provides clear error messages for invalid configuration
//! - Thread-safe configuration access

pub mod export;
pub mod file_loader;
pub mod loader;
pub mod manager;
pub mod precedence;
pub mod settings;
pub mod source;
pub mod validation;

pub use errors::ConfigError;
pub use export::{ExportFormat, SECRET_PLACEHOLDER, export_settings, sanitize};
pub use file_loader::{FileFormat, FileSource, load_file_tree};
pub use loader::{ENV_MAPPING, EnvSource, tree_from_lookup};
pub use manager::ConfigManager;
pub use precedence::{coerce_scalar, coerce_tree, deep_merge};
pub use settings::{
    ApiSettings, ContentFormattingSettings, DataSettings, EmbeddingModelSettings,
    EmbeddingSettings, LlmSettings, LoggingSettings, MonitoringSettings, ProviderSettings,
    QdrantSettings, Settings, TransformationSettings,
};
pub use source::{ConfigSource, OverrideSource, get_path, set_path};
pub use validation::validate_tree;
