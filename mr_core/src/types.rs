use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use strum::{AsRefStr, Display, EnumString};

/// Role a backend service fulfils.
///
/// Purposes form an open set and the associated constants cover the
/// well-known ones. Construction never fails; a tag that normalises to the
/// empty string is representable here and rejected by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Purpose(String);

impl Purpose {
    pub const GENERAL: &'static str = "general";
    pub const TRANSFORMER: &'static str = "transformer";
    pub const VALIDATOR: &'static str = "validator";
    pub const SUMMARIZER: &'static str = "summarizer";
    pub const CLASSIFIER: &'static str = "classifier";
    pub const QA: &'static str = "qa";
    pub const SEARCHER: &'static str = "searcher";

    /// Builds a purpose tag, normalising surrounding whitespace and case.
    pub fn new(tag: impl AsRef<str>) -> Self {
        Self(tag.as_ref().trim().to_lowercase())
    }

    pub fn general() -> Self {
        Self::new(Self::GENERAL)
    }

    pub fn transformer() -> Self {
        Self::new(Self::TRANSFORMER)
    }

    pub fn validator() -> Self {
        Self::new(Self::VALIDATOR)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_well_known(&self) -> bool {
        matches!(
            self.0.as_str(),
            Self::GENERAL
                | Self::TRANSFORMER
                | Self::VALIDATOR
                | Self::SUMMARIZER
                | Self::CLASSIFIER
                | Self::QA
                | Self::SEARCHER
        )
    }
}

impl std::fmt::Display for Purpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Purpose {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Purpose {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Backend provider families known to the settings tree.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ProviderKind {
    Anthropic,
    #[serde(rename = "openai")]
    #[strum(serialize = "openai")]
    OpenAi,
    #[serde(rename = "azure_openai")]
    #[strum(serialize = "azure_openai")]
    AzureOpenAi,
    Local,
    Gemini,
}

impl ProviderKind {
    /// Every provider, in the order the settings tree declares them.
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::Anthropic,
        ProviderKind::OpenAi,
        ProviderKind::AzureOpenAi,
        ProviderKind::Local,
        ProviderKind::Gemini,
    ];
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ModelStatus {
    #[default]
    Active,
    Deprecated,
    Experimental,
    Unavailable,
}

/// What a backend model can do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default)]
    pub supports_tools: bool,
    #[serde(default)]
    pub supports_vision: bool,
    #[serde(default)]
    pub supports_streaming: bool,
    #[serde(default)]
    pub supports_json_mode: bool,
    #[serde(default = "default_token_count")]
    pub max_tokens: u32,
    #[serde(default = "default_token_count")]
    pub token_limit: u32,
    #[serde(default = "default_token_encoding")]
    pub token_encoding: String,
}

fn default_token_count() -> u32 {
    8192
}

fn default_token_encoding() -> String {
    "cl100k_base".to_string()
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            supports_tools: false,
            supports_vision: false,
            supports_streaming: false,
            supports_json_mode: false,
            max_tokens: default_token_count(),
            token_limit: default_token_count(),
            token_encoding: default_token_encoding(),
        }
    }
}

/// Version tag that is left out of derived ids.
pub const LATEST_VERSION: &str = "latest";

/// The registry's stored description of one candidate backend service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub model_id: String,
    pub provider: ProviderKind,
    pub model_name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub status: ModelStatus,
    #[serde(default)]
    pub purposes: Vec<Purpose>,
    #[serde(default)]
    pub capabilities: Capabilities,
    /// Per-service overlay merged under the caller's overlay at resolve time.
    #[serde(default)]
    pub default_config: Map<String, Value>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Fitness per purpose, higher preferred. Missing entries count as 0.
    #[serde(default)]
    pub scores: BTreeMap<Purpose, f64>,
    /// Monotonic registration order; the later registration wins score ties.
    #[serde(default)]
    pub registration_seq: u64,
}

fn default_version() -> String {
    LATEST_VERSION.to_string()
}

impl RegistrationRecord {
    /// Deterministic id: `{provider}-{name}`, plus `-{version}` unless the
    /// version is empty or `latest`.
    pub fn derive_id(provider: ProviderKind, model_name: &str, version: &str) -> String {
        if version.is_empty() || version == LATEST_VERSION {
            format!("{}-{}", provider, model_name)
        } else {
            format!("{}-{}-{}", provider, model_name, version)
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ModelStatus::Active
    }

    pub fn serves(&self, purpose: &Purpose) -> bool {
        self.purposes.contains(purpose)
    }

    /// Active and declared for `purpose`: a candidate for its default.
    pub fn is_eligible_for(&self, purpose: &Purpose) -> bool {
        self.is_active() && self.serves(purpose)
    }

    pub fn score_for(&self, purpose: &Purpose) -> f64 {
        self.scores.get(purpose).copied().unwrap_or(0.0)
    }

    /// Higher score wins; equal scores go to the later registration.
    pub fn outranks(&self, other: &RegistrationRecord, purpose: &Purpose) -> bool {
        let mine = self.score_for(purpose);
        let theirs = other.score_for(purpose);
        if mine == theirs {
            self.registration_seq > other.registration_seq
        } else {
            mine > theirs
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, score: f64, seq: u64) -> RegistrationRecord {
        let now = Utc::now();
        RegistrationRecord {
            model_id: id.to_string(),
            provider: ProviderKind::Local,
            model_name: id.to_string(),
            version: LATEST_VERSION.to_string(),
            status: ModelStatus::Active,
            purposes: vec![Purpose::new("task")],
            capabilities: Capabilities::default(),
            default_config: Map::new(),
            metadata: Map::new(),
            registered_at: now,
            updated_at: now,
            scores: BTreeMap::from([(Purpose::new("task"), score)]),
            registration_seq: seq,
        }
    }

    #[test]
    fn test_purpose_normalises() {
        assert_eq!(Purpose::new("  General "), Purpose::general());
        assert!(Purpose::new("qa").is_well_known());
        assert!(!Purpose::new("billing-triage").is_well_known());
        assert!(Purpose::new("   ").is_empty());
        assert!(!Purpose::general().is_empty());
    }

    #[test]
    fn test_provider_kind_tags() {
        assert_eq!(ProviderKind::OpenAi.to_string(), "openai");
        assert_eq!(ProviderKind::AzureOpenAi.to_string(), "azure_openai");
        assert_eq!("Gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert_eq!(
            serde_json::to_value(ProviderKind::AzureOpenAi).unwrap(),
            serde_json::json!("azure_openai")
        );
        assert!("mystery".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_derive_id() {
        assert_eq!(
            RegistrationRecord::derive_id(ProviderKind::OpenAi, "gpt-4", "latest"),
            "openai-gpt-4"
        );
        assert_eq!(
            RegistrationRecord::derive_id(ProviderKind::Local, "llama3", "2"),
            "local-llama3-2"
        );
        assert_eq!(
            RegistrationRecord::derive_id(ProviderKind::Local, "llama3", ""),
            "local-llama3"
        );
    }

    #[test]
    fn test_outranks_by_score_then_recency() {
        let task = Purpose::new("task");
        let low = record("a", 0.7, 1);
        let high = record("b", 0.9, 0);
        assert!(high.outranks(&low, &task));
        assert!(!low.outranks(&high, &task));

        let older = record("c", 0.8, 3);
        let newer = record("d", 0.8, 4);
        assert!(newer.outranks(&older, &task));
        assert!(!older.outranks(&newer, &task));
    }

    #[test]
    fn test_missing_score_counts_as_zero() {
        let rec = record("a", 0.5, 0);
        assert_eq!(rec.score_for(&Purpose::new("other")), 0.0);
    }

    #[test]
    fn test_record_deserializes_with_defaults() {
        let json = serde_json::json!({
            "model_id": "local-llama3",
            "provider": "local",
            "model_name": "llama3",
            "registered_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        });
        let rec: RegistrationRecord = serde_json::from_value(json).unwrap();
        assert_eq!(rec.version, "latest");
        assert_eq!(rec.status, ModelStatus::Active);
        assert!(rec.purposes.is_empty());
        assert_eq!(rec.capabilities.max_tokens, 8192);
        assert_eq!(rec.registration_seq, 0);
    }
}
