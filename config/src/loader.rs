//! # Environment Variable Loader
//!
//! Folds process environment variables into the settings tree through a
//! fixed name-to-path table. No prefix is required; unmapped variables are
//! ignored.

use crate::source::{ConfigSource, set_path};
use errors::ConfigError;
use serde_json::{Map, Value};
use std::env;

/// Environment variable name to dotted settings path.
///
/// When two variables map to the same path, the later entry wins.
pub const ENV_MAPPING: &[(&str, &str)] = &[
    // API
    ("API_HOST", "api.host"),
    ("API_PORT", "api.port"),
    ("API_WORKERS", "api.workers"),
    ("API_CORS_ORIGINS", "api.cors_origins"),
    ("API_RATE_LIMIT", "api.rate_limit"),
    ("API_DEBUG", "api.debug"),
    // LLM providers
    ("LLM_DEFAULT_PROVIDER", "llm.default_provider"),
    ("OPENAI_API_KEY", "llm.openai.api_key"),
    ("OPENAI_ENABLED", "llm.openai.enabled"),
    ("OPENAI_DEFAULT_MODEL", "llm.openai.default_model"),
    ("ANTHROPIC_API_KEY", "llm.anthropic.api_key"),
    ("ANTHROPIC_ENABLED", "llm.anthropic.enabled"),
    ("ANTHROPIC_DEFAULT_MODEL", "llm.anthropic.default_model"),
    ("GEMINI_API_KEY", "llm.gemini.api_key"),
    ("GEMINI_ENABLED", "llm.gemini.enabled"),
    ("GEMINI_DEFAULT_MODEL", "llm.gemini.default_model"),
    ("GOOGLE_API_KEY", "llm.gemini.api_key"),
    ("GEMMA_PREFERRED_MODEL", "llm.gemini.default_model"),
    ("GEMMA_ENABLED", "llm.gemini.enabled"),
    ("AZURE_OPENAI_API_KEY", "llm.azure_openai.api_key"),
    ("AZURE_OPENAI_ENABLED", "llm.azure_openai.enabled"),
    ("AZURE_OPENAI_DEFAULT_MODEL", "llm.azure_openai.default_model"),
    (
        "AZURE_OPENAI_ENDPOINT",
        "llm.azure_openai.additional_settings.endpoint",
    ),
    ("LOCAL_LLM_ENABLED", "llm.local.enabled"),
    ("LOCAL_LLM_DEFAULT_MODEL", "llm.local.default_model"),
    ("LOCAL_LLM_BASE_URL", "llm.local.additional_settings.base_url"),
    // Transformation
    ("TRANSFORMATION_MAX_ITERATIONS", "transformation.max_iterations"),
    ("TRANSFORMATION_TIMEOUT_SECONDS", "transformation.timeout_seconds"),
    (
        "TRANSFORMATION_DEFAULT_TEMPERATURE",
        "transformation.default_temperature",
    ),
    (
        "TRANSFORMATION_CONCURRENT",
        "transformation.concurrent_transformations",
    ),
    ("TRANSFORMATION_STORE", "transformation.store_transformations"),
    // Logging
    ("LOG_LEVEL", "logging.level"),
    ("LOG_FORMAT", "logging.format"),
    ("LOG_TO_FILE", "logging.log_to_file"),
    ("LOG_DIR", "logging.log_dir"),
    ("LOG_API_REQUESTS", "logging.log_api_requests"),
    ("LOG_LLM_INTERACTIONS", "logging.log_llm_interactions"),
    ("ELASTIC_ENABLED", "logging.elastic_enabled"),
    ("ELASTIC_URL", "logging.elastic_url"),
    ("ELASTIC_USERNAME", "logging.elastic_username"),
    ("ELASTIC_PASSWORD", "logging.elastic_password"),
    // Monitoring
    ("MONITORING_ENABLED", "monitoring.enabled"),
    ("PROMETHEUS_PORT", "monitoring.prometheus_port"),
    ("METRICS_PATH", "monitoring.metrics_path"),
    ("COLLECT_API_METRICS", "monitoring.collect_api_metrics"),
    ("COLLECT_LLM_METRICS", "monitoring.collect_llm_metrics"),
    ("METRICS_BUFFER_SIZE", "monitoring.metrics_buffer_size"),
    ("METRICS_FLUSH_INTERVAL", "monitoring.metrics_flush_interval"),
    ("METRICS_RETENTION_DAYS", "monitoring.metrics_retention_days"),
    // Data
    ("DATA_DIR", "data.data_dir"),
    ("STORE_TRANSFORMATIONS", "data.store_transformations"),
    ("CLEANUP_OLDER_THAN_DAYS", "data.cleanup_older_than_days"),
    // Application
    ("APP_NAME", "app_name"),
    ("ENVIRONMENT", "environment"),
    // Embedding
    ("EMBEDDING_ENABLED", "embedding.enabled"),
    ("EMBEDDING_DEFAULT_MODEL", "embedding.default_model"),
    ("QWEN3_ENABLED", "embedding.models.qwen3-8b.enabled"),
    ("QWEN3_DIMENSIONS", "embedding.models.qwen3-8b.dimensions"),
    ("QWEN3_MAX_TOKENS", "embedding.models.qwen3-8b.max_tokens"),
    ("QWEN3_BATCH_SIZE", "embedding.models.qwen3-8b.batch_size"),
    ("QWEN3_DEVICE", "embedding.models.qwen3-8b.device"),
    (
        "QWEN3_NORMALIZE",
        "embedding.models.qwen3-8b.normalize_embeddings",
    ),
    ("QDRANT_ENABLED", "embedding.qdrant.enabled"),
    ("QDRANT_URL", "embedding.qdrant.url"),
    ("QDRANT_API_KEY", "embedding.qdrant.api_key"),
    ("QDRANT_COLLECTION", "embedding.qdrant.collection_name"),
    ("QDRANT_VECTOR_SIZE", "embedding.qdrant.vector_size"),
    ("QDRANT_DISTANCE_METRIC", "embedding.qdrant.distance_metric"),
    ("QDRANT_TIMEOUT", "embedding.qdrant.timeout"),
    ("QDRANT_PREFER_GRPC", "embedding.qdrant.prefer_grpc"),
    (
        "EMBEDDING_MAX_CONTENT_LENGTH",
        "embedding.content_formatting.max_content_length",
    ),
    (
        "EMBEDDING_INCLUDE_METADATA",
        "embedding.content_formatting.include_metadata",
    ),
];

/// Builds a partial tree from whatever `lookup` returns for each mapped name.
///
/// Values are inserted as raw strings; typing happens after the merge.
pub fn tree_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Map<String, Value> {
    let mut tree = Map::new();
    for (name, path) in ENV_MAPPING {
        if let Some(value) = lookup(*name) {
            tracing::debug!("Environment variable {} mapped to {}", name, path);
            set_path(&mut tree, path, Value::String(value));
        }
    }
    tree
}

/// Reads the process environment.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// First source in the default chain. Follows 12-factor app principles:
/// environment variables override defaults but are overridden by files and
/// programmatic overrides registered after it.
///
/// ## Usage
/// ```rust,no_run
/// use config::{ConfigSource, EnvSource};
///
/// let tree = EnvSource::new().load().unwrap_or_default();
/// println!("{} mapped sections", tree.len());
/// ```
///
/// ## Environment Variables
/// See [`ENV_MAPPING`], e.g. `API_PORT` (`api.port`), `ANTHROPIC_API_KEY`
/// (`llm.anthropic.api_key`), `DATA_DIR` (`data.data_dir`).
#[derive(Debug, Clone, Default)]
pub struct EnvSource;

impl EnvSource {
    pub const NAME: &'static str = "environment";

    pub fn new() -> Self {
        Self
    }
}

impl ConfigSource for EnvSource {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn load(&self) -> Result<Map<String, Value>, ConfigError> {
        Ok(tree_from_lookup(|name| env::var(name).ok()))
    }
}
