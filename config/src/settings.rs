//! # Settings Schema
//!
//! Typed, nested definition of every configuration field with its default.
//!
//! All settings structures:
//! - Use `serde` for serialization/deserialization, with a default per field
//! - Use `validator` for input validation
//! - Expose exactly one dotted path per leaf (`api.port`, `llm.openai.api_key`)

use mr_core::ProviderKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use validator::Validate;

/// Root of the settings tree.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Aggregates the API server, LLM provider, transformation, logging,
/// monitoring, data and embedding sections into one immutable snapshot
/// published by the `ConfigManager`.
///
/// ## Usage
/// ```rust,no_run
/// use config::Settings;
///
/// let settings = Settings::default();
/// assert_eq!(settings.api.port, 8000);
/// ```
///
/// ## Validation
/// All nested sections must pass their own validation rules.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct Settings {
    /// Application name
    #[serde(default = "default_app_name")]
    #[validate(length(min = 1, max = 255))]
    pub app_name: String,

    /// Deployment environment
    #[serde(default = "default_environment")]
    #[validate(custom(function = "validate_environment"))]
    pub environment: String,

    #[serde(default)]
    #[validate(nested)]
    pub api: ApiSettings,

    #[serde(default)]
    #[validate(nested)]
    pub llm: LlmSettings,

    #[serde(default)]
    #[validate(nested)]
    pub transformation: TransformationSettings,

    #[serde(default)]
    #[validate(nested)]
    pub logging: LoggingSettings,

    #[serde(default)]
    #[validate(nested)]
    pub monitoring: MonitoringSettings,

    #[serde(default)]
    #[validate(nested)]
    pub data: DataSettings,

    #[serde(default)]
    #[validate(nested)]
    pub embedding: EmbeddingSettings,
}

fn default_app_name() -> String {
    "Model Hub".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn validate_environment(value: &str) -> Result<(), validator::ValidationError> {
    match value {
        "development" | "staging" | "production" | "test" => Ok(()),
        _ => Err(validator::ValidationError::new("Invalid environment")),
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            environment: default_environment(),
            api: ApiSettings::default(),
            llm: LlmSettings::default(),
            transformation: TransformationSettings::default(),
            logging: LoggingSettings::default(),
            monitoring: MonitoringSettings::default(),
            data: DataSettings::default(),
            embedding: EmbeddingSettings::default(),
        }
    }
}

impl Settings {
    /// The defaults rendered as a JSON tree, the base every merge starts from.
    pub fn default_tree() -> Value {
        serde_json::to_value(Self::default()).unwrap_or(Value::Object(Map::new()))
    }
}

/// HTTP API server settings.
///
/// ## Fields
/// - `host`: bind address (default: "0.0.0.0")
/// - `port`: TCP port (default: 8000, range: 1-65535)
/// - `workers`: worker processes (default: 4, range: 1-256)
/// - `cors_origins`: allowed origins (default: ["*"])
/// - `rate_limit`: requests per minute per client (default: 100)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ApiSettings {
    #[serde(default = "default_api_host")]
    #[validate(length(min = 1, max = 255))]
    pub host: String,

    #[serde(default = "default_api_port")]
    #[validate(range(min = 1, max = 65535))]
    pub port: u16,

    #[serde(default)]
    pub debug: bool,

    #[serde(default = "default_api_workers")]
    #[validate(range(min = 1, max = 256))]
    pub workers: u32,

    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_rate_limit")]
    #[validate(range(min = 1, max = 100000))]
    pub rate_limit: u32,
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8000
}

fn default_api_workers() -> u32 {
    4
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_rate_limit() -> u32 {
    100
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            debug: false,
            workers: default_api_workers(),
            cors_origins: default_cors_origins(),
            rate_limit: default_rate_limit(),
        }
    }
}

/// Settings for one LLM provider family.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Default)]
pub struct ProviderSettings {
    /// Whether the provider is seeded into the registry
    #[serde(default)]
    pub enabled: bool,

    /// Credential; never exported in clear
    #[serde(default)]
    pub api_key: String,

    /// Model registered for this provider at startup
    #[serde(default)]
    #[validate(length(min = 1, max = 255))]
    pub default_model: String,

    /// Provider-specific settings, used as the record's default overlay
    #[serde(default)]
    pub additional_settings: Map<String, Value>,
}

impl ProviderSettings {
    fn seeded(enabled: bool, default_model: &str) -> Self {
        Self {
            enabled,
            api_key: String::new(),
            default_model: default_model.to_string(),
            additional_settings: Map::new(),
        }
    }
}

/// LLM provider settings.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// One block per provider family. Every enabled block becomes a registration
/// record when the service registry starts.
///
/// ## Fields
/// - `default_provider`: provider preferred by callers (default: "anthropic")
/// - `anthropic`, `openai`, `gemini`: enabled by default
/// - `azure_openai`, `local`: disabled by default
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct LlmSettings {
    #[serde(default = "default_llm_provider")]
    #[validate(custom(function = "validate_provider_tag"))]
    pub default_provider: String,

    #[serde(default = "default_anthropic")]
    #[validate(nested)]
    pub anthropic: ProviderSettings,

    #[serde(default = "default_openai")]
    #[validate(nested)]
    pub openai: ProviderSettings,

    #[serde(default = "default_azure_openai")]
    #[validate(nested)]
    pub azure_openai: ProviderSettings,

    #[serde(default = "default_local")]
    #[validate(nested)]
    pub local: ProviderSettings,

    #[serde(default = "default_gemini")]
    #[validate(nested)]
    pub gemini: ProviderSettings,
}

fn default_llm_provider() -> String {
    "anthropic".to_string()
}

fn default_anthropic() -> ProviderSettings {
    ProviderSettings::seeded(true, "claude-3-5-sonnet-20241022")
}

fn default_openai() -> ProviderSettings {
    ProviderSettings::seeded(true, "gpt-4")
}

fn default_azure_openai() -> ProviderSettings {
    ProviderSettings::seeded(false, "gpt-4")
}

fn default_local() -> ProviderSettings {
    ProviderSettings::seeded(false, "deepseek-chat")
}

fn default_gemini() -> ProviderSettings {
    ProviderSettings::seeded(true, "models/gemini-2.5-flash")
}

fn validate_provider_tag(value: &str) -> Result<(), validator::ValidationError> {
    value
        .parse::<ProviderKind>()
        .map(|_| ())
        .map_err(|_| validator::ValidationError::new("Unknown provider"))
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            default_provider: default_llm_provider(),
            anthropic: default_anthropic(),
            openai: default_openai(),
            azure_openai: default_azure_openai(),
            local: default_local(),
            gemini: default_gemini(),
        }
    }
}

impl LlmSettings {
    pub fn provider(&self, kind: ProviderKind) -> &ProviderSettings {
        match kind {
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::AzureOpenAi => &self.azure_openai,
            ProviderKind::Local => &self.local,
            ProviderKind::Gemini => &self.gemini,
        }
    }

    /// Enabled providers in declaration order.
    pub fn enabled_providers(&self) -> impl Iterator<Item = (ProviderKind, &ProviderSettings)> {
        ProviderKind::ALL
            .into_iter()
            .map(|kind| (kind, self.provider(kind)))
            .filter(|(_, settings)| settings.enabled)
    }
}

/// Transformation request settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct TransformationSettings {
    #[serde(default = "default_max_iterations")]
    #[validate(range(min = 1, max = 50))]
    pub max_iterations: u32,

    #[serde(default = "default_transformation_timeout")]
    #[validate(range(min = 1, max = 3600))]
    pub timeout_seconds: u64,

    #[serde(default = "default_temperature")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub default_temperature: f64,

    #[serde(default = "default_concurrent_transformations")]
    #[validate(range(min = 1, max = 1000))]
    pub concurrent_transformations: u32,

    #[serde(default = "default_true")]
    pub store_transformations: bool,
}

fn default_max_iterations() -> u32 {
    5
}

fn default_transformation_timeout() -> u64 {
    400
}

fn default_temperature() -> f64 {
    0.1
}

fn default_concurrent_transformations() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

impl Default for TransformationSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            timeout_seconds: default_transformation_timeout(),
            default_temperature: default_temperature(),
            concurrent_transformations: default_concurrent_transformations(),
            store_transformations: true,
        }
    }
}

/// Logging settings.
///
/// ## Fields
/// - `level`: trace/debug/info/warn/error, any case (default: "info")
/// - `format`: "text" or "json" (default: "text")
/// - `elastic_*`: optional log shipping target; the password is a credential
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct LoggingSettings {
    #[serde(default = "default_logging_level")]
    #[validate(custom(function = "validate_logging_level"))]
    pub level: String,

    #[serde(default = "default_logging_format")]
    #[validate(custom(function = "validate_logging_format"))]
    pub format: String,

    #[serde(default)]
    pub log_to_file: bool,

    #[serde(default = "default_log_dir")]
    #[validate(length(min = 1))]
    pub log_dir: String,

    #[serde(default = "default_true")]
    pub log_api_requests: bool,

    #[serde(default = "default_true")]
    pub log_llm_interactions: bool,

    #[serde(default)]
    pub elastic_enabled: bool,

    #[serde(default)]
    pub elastic_url: String,

    #[serde(default)]
    pub elastic_username: String,

    #[serde(default)]
    pub elastic_password: String,
}

fn default_logging_level() -> String {
    "info".to_string()
}

fn default_logging_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn validate_logging_level(value: &str) -> Result<(), validator::ValidationError> {
    match value.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(validator::ValidationError::new("Invalid logging level")),
    }
}

fn validate_logging_format(value: &str) -> Result<(), validator::ValidationError> {
    match value {
        "text" | "json" => Ok(()),
        _ => Err(validator::ValidationError::new("Invalid logging format")),
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_logging_level(),
            format: default_logging_format(),
            log_to_file: false,
            log_dir: default_log_dir(),
            log_api_requests: true,
            log_llm_interactions: true,
            elastic_enabled: false,
            elastic_url: String::new(),
            elastic_username: String::new(),
            elastic_password: String::new(),
        }
    }
}

/// Monitoring settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct MonitoringSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_prometheus_port")]
    #[validate(range(min = 1, max = 65535))]
    pub prometheus_port: u16,

    #[serde(default = "default_metrics_path")]
    #[validate(length(min = 1))]
    pub metrics_path: String,

    #[serde(default = "default_true")]
    pub collect_api_metrics: bool,

    #[serde(default = "default_true")]
    pub collect_llm_metrics: bool,

    #[serde(default = "default_metrics_buffer_size")]
    #[validate(range(min = 1, max = 100000))]
    pub metrics_buffer_size: u32,

    #[serde(default = "default_metrics_flush_interval")]
    #[validate(range(min = 1, max = 3600))]
    pub metrics_flush_interval: u64,

    #[serde(default = "default_metrics_retention_days")]
    #[validate(range(min = 1, max = 3650))]
    pub metrics_retention_days: u32,
}

fn default_prometheus_port() -> u16 {
    9090
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_metrics_buffer_size() -> u32 {
    100
}

fn default_metrics_flush_interval() -> u64 {
    10
}

fn default_metrics_retention_days() -> u32 {
    90
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            prometheus_port: default_prometheus_port(),
            metrics_path: default_metrics_path(),
            collect_api_metrics: true,
            collect_llm_metrics: true,
            metrics_buffer_size: default_metrics_buffer_size(),
            metrics_flush_interval: default_metrics_flush_interval(),
            metrics_retention_days: default_metrics_retention_days(),
        }
    }
}

/// Durable data settings.
///
/// ## Fields
/// - `data_dir`: root for durable state (default: "data")
/// - `registry_subdir`: registry directory under `data_dir`
///   (default: "model_registry")
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct DataSettings {
    #[serde(default = "default_data_dir")]
    #[validate(length(min = 1))]
    pub data_dir: String,

    #[serde(default = "default_registry_subdir")]
    #[validate(length(min = 1))]
    pub registry_subdir: String,

    #[serde(default = "default_true")]
    pub store_transformations: bool,

    #[serde(default = "default_cleanup_days")]
    #[validate(range(min = 1, max = 3650))]
    pub cleanup_older_than_days: u32,

    #[serde(default = "default_storage_format")]
    #[validate(custom(function = "validate_storage_format"))]
    pub storage_format: String,

    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    #[serde(default = "default_cache_ttl")]
    #[validate(range(min = 1, max = 86400))]
    pub cache_ttl_seconds: u64,

    #[serde(default = "default_cache_max_size")]
    #[validate(range(min = 1, max = 1000000))]
    pub cache_max_size: u32,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_registry_subdir() -> String {
    "model_registry".to_string()
}

fn default_cleanup_days() -> u32 {
    30
}

fn default_storage_format() -> String {
    "json".to_string()
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_cache_max_size() -> u32 {
    1000
}

fn validate_storage_format(value: &str) -> Result<(), validator::ValidationError> {
    match value {
        "json" | "yaml" => Ok(()),
        _ => Err(validator::ValidationError::new("Invalid storage format")),
    }
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            registry_subdir: default_registry_subdir(),
            store_transformations: true,
            cleanup_older_than_days: default_cleanup_days(),
            storage_format: default_storage_format(),
            cache_enabled: true,
            cache_ttl_seconds: default_cache_ttl(),
            cache_max_size: default_cache_max_size(),
        }
    }
}

impl DataSettings {
    pub fn registry_dir(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.data_dir).join(&self.registry_subdir)
    }
}

/// One embedding model.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct EmbeddingModelSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    #[validate(length(min = 1))]
    pub model_name: String,

    #[serde(default)]
    pub model_path: String,

    #[serde(default = "default_dimensions")]
    #[validate(range(min = 1, max = 65536))]
    pub dimensions: u32,

    #[serde(default = "default_embedding_max_tokens")]
    #[validate(range(min = 1))]
    pub max_tokens: u32,

    #[serde(default = "default_batch_size")]
    #[validate(range(min = 1, max = 4096))]
    pub batch_size: u32,

    #[serde(default = "default_device")]
    pub device: String,

    #[serde(default = "default_true")]
    pub normalize_embeddings: bool,
}

fn default_dimensions() -> u32 {
    4096
}

fn default_embedding_max_tokens() -> u32 {
    32768
}

fn default_batch_size() -> u32 {
    16
}

fn default_device() -> String {
    "auto".to_string()
}

impl EmbeddingModelSettings {
    fn named(model_name: &str) -> Self {
        Self {
            enabled: true,
            model_name: model_name.to_string(),
            model_path: String::new(),
            dimensions: default_dimensions(),
            max_tokens: default_embedding_max_tokens(),
            batch_size: default_batch_size(),
            device: default_device(),
            normalize_embeddings: true,
        }
    }
}

/// Qdrant connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct QdrantSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_qdrant_url")]
    #[validate(length(min = 1))]
    pub url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_collection_name")]
    #[validate(length(min = 1, max = 255))]
    pub collection_name: String,

    #[serde(default = "default_dimensions")]
    #[validate(range(min = 1, max = 65536))]
    pub vector_size: u32,

    #[serde(default = "default_distance_metric")]
    #[validate(custom(function = "validate_distance_metric"))]
    pub distance_metric: String,

    #[serde(default = "default_qdrant_timeout")]
    #[validate(range(min = 1, max = 300))]
    pub timeout: u64,

    #[serde(default)]
    pub prefer_grpc: bool,
}

fn default_qdrant_url() -> String {
    "http://localhost:6333".to_string()
}

fn default_collection_name() -> String {
    "model_hub_embeddings".to_string()
}

fn default_distance_metric() -> String {
    "cosine".to_string()
}

fn default_qdrant_timeout() -> u64 {
    30
}

fn validate_distance_metric(value: &str) -> Result<(), validator::ValidationError> {
    match value {
        "cosine" | "euclid" | "dot" | "manhattan" => Ok(()),
        _ => Err(validator::ValidationError::new("Invalid distance metric")),
    }
}

impl Default for QdrantSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_qdrant_url(),
            api_key: String::new(),
            collection_name: default_collection_name(),
            vector_size: default_dimensions(),
            distance_metric: default_distance_metric(),
            timeout: default_qdrant_timeout(),
            prefer_grpc: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ContentFormattingSettings {
    #[serde(default = "default_max_content_length")]
    #[validate(range(min = 1))]
    pub max_content_length: u32,

    #[serde(default = "default_true")]
    pub include_metadata: bool,

    #[serde(default = "default_metadata_fields")]
    pub metadata_fields: Vec<String>,
}

fn default_max_content_length() -> u32 {
    30000
}

fn default_metadata_fields() -> Vec<String> {
    vec![
        "connector_name".to_string(),
        "categories".to_string(),
        "use_cases".to_string(),
    ]
}

impl Default for ContentFormattingSettings {
    fn default() -> Self {
        Self {
            max_content_length: default_max_content_length(),
            include_metadata: true,
            metadata_fields: default_metadata_fields(),
        }
    }
}

/// Embedding model and vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct EmbeddingSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_embedding_model")]
    #[validate(length(min = 1))]
    pub default_model: String,

    #[serde(default = "default_embedding_models")]
    #[validate(custom(function = "validate_embedding_models"))]
    pub models: BTreeMap<String, EmbeddingModelSettings>,

    #[serde(default)]
    #[validate(nested)]
    pub qdrant: QdrantSettings,

    #[serde(default)]
    #[validate(nested)]
    pub content_formatting: ContentFormattingSettings,
}

fn default_embedding_model() -> String {
    "qwen3-8b".to_string()
}

fn default_embedding_models() -> BTreeMap<String, EmbeddingModelSettings> {
    BTreeMap::from([(
        "qwen3-8b".to_string(),
        EmbeddingModelSettings::named("qwen3-8b"),
    )])
}

fn validate_embedding_models(
    models: &BTreeMap<String, EmbeddingModelSettings>,
) -> Result<(), validator::ValidationError> {
    if models.values().all(|model| model.validate().is_ok()) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("Invalid embedding model"))
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            default_model: default_embedding_model(),
            models: default_embedding_models(),
            qdrant: QdrantSettings::default(),
            content_formatting: ContentFormattingSettings::default(),
        }
    }
}
