//! Registration and update requests.

use crate::capabilities::capabilities_for;
use chrono::Utc;
use errors::RegistryError;
use mr_core::types::LATEST_VERSION;
use mr_core::{Capabilities, ModelStatus, ProviderKind, Purpose, RegistrationRecord};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Overlay keys that would contradict the record's own identity.
const IDENTITY_KEYS: [&str; 2] = ["model_name", "provider"];

const NEUTRAL_SCORE: f64 = 1.0;

/// Non-finite scores cannot be persisted as JSON numbers and never compare.
fn check_scores(scores: &BTreeMap<Purpose, f64>) -> Result<(), RegistryError> {
    for (purpose, score) in scores {
        if purpose.is_empty() {
            return Err(RegistryError::EmptyPurpose);
        }
        if !score.is_finite() {
            return Err(RegistryError::InvalidScore {
                purpose: purpose.to_string(),
                score: *score,
            });
        }
    }
    Ok(())
}

fn check_purposes<'a>(purposes: impl IntoIterator<Item = &'a Purpose>) -> Result<(), RegistryError> {
    if purposes.into_iter().any(Purpose::is_empty) {
        return Err(RegistryError::EmptyPurpose);
    }
    Ok(())
}

/// Builder for a new registration.
///
/// Anything left unset is filled in by [`RegistrationRequest::into_record`]:
/// the `general` purpose, the built-in capability table, and a neutral score
/// of 1.0 for every declared purpose.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationRequest {
    pub provider: ProviderKind,
    pub model_name: String,
    pub version: String,
    pub status: ModelStatus,
    pub purposes: Vec<Purpose>,
    pub capabilities: Option<Capabilities>,
    pub default_config: Map<String, Value>,
    pub metadata: Map<String, Value>,
    pub scores: BTreeMap<Purpose, f64>,
}

impl RegistrationRequest {
    pub fn new(provider: ProviderKind, model_name: impl Into<String>) -> Self {
        Self {
            provider,
            model_name: model_name.into(),
            version: LATEST_VERSION.to_string(),
            status: ModelStatus::Active,
            purposes: Vec::new(),
            capabilities: None,
            default_config: Map::new(),
            metadata: Map::new(),
            scores: BTreeMap::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_status(mut self, status: ModelStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_purpose(mut self, purpose: impl Into<Purpose>) -> Self {
        let purpose = purpose.into();
        if !self.purposes.contains(&purpose) {
            self.purposes.push(purpose);
        }
        self
    }

    pub fn with_purposes<I, P>(self, purposes: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Purpose>,
    {
        purposes
            .into_iter()
            .fold(self, |req, purpose| req.with_purpose(purpose))
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    pub fn with_default_config(mut self, overlay: Map<String, Value>) -> Self {
        self.default_config = overlay;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_score(mut self, purpose: impl Into<Purpose>, score: f64) -> Self {
        self.scores.insert(purpose.into(), score);
        self
    }

    pub fn with_scores<I, P>(self, scores: I) -> Self
    where
        I: IntoIterator<Item = (P, f64)>,
        P: Into<Purpose>,
    {
        scores
            .into_iter()
            .fold(self, |req, (purpose, score)| req.with_score(purpose, score))
    }

    pub fn model_id(&self) -> String {
        RegistrationRecord::derive_id(self.provider, &self.model_name, &self.version)
    }

    /// Rejects empty purpose tags and non-finite scores.
    pub fn validate(&self) -> Result<(), RegistryError> {
        check_purposes(&self.purposes)?;
        check_scores(&self.scores)
    }

    /// Materialises the record with defaults applied. `registration_seq` is
    /// assigned by the registry.
    pub fn into_record(self, registration_seq: u64) -> RegistrationRecord {
        let model_id = self.model_id();
        let purposes = if self.purposes.is_empty() {
            vec![Purpose::general()]
        } else {
            self.purposes
        };
        let capabilities = self
            .capabilities
            .unwrap_or_else(|| capabilities_for(self.provider, &self.model_name));
        let scores = if self.scores.is_empty() {
            purposes.iter().map(|p| (p.clone(), NEUTRAL_SCORE)).collect()
        } else {
            self.scores
        };
        let mut default_config = self.default_config;
        for key in IDENTITY_KEYS {
            default_config.remove(key);
        }

        let now = Utc::now();
        RegistrationRecord {
            model_id,
            provider: self.provider,
            model_name: self.model_name,
            version: self.version,
            status: self.status,
            purposes,
            capabilities,
            default_config,
            metadata: self.metadata,
            registered_at: now,
            updated_at: now,
            scores,
            registration_seq,
        }
    }
}

/// Partial update of an existing record.
///
/// `status`, `purposes`, `capabilities` and `default_config` replace the
/// stored value; `scores` and `metadata` are merged key by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordUpdate {
    pub status: Option<ModelStatus>,
    pub purposes: Option<Vec<Purpose>>,
    pub capabilities: Option<Capabilities>,
    pub default_config: Option<Map<String, Value>>,
    pub scores: BTreeMap<Purpose, f64>,
    pub metadata: Map<String, Value>,
}

impl RecordUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: ModelStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn purposes<I, P>(mut self, purposes: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Purpose>,
    {
        let mut list: Vec<Purpose> = Vec::new();
        for purpose in purposes.into_iter().map(Into::into) {
            if !list.contains(&purpose) {
                list.push(purpose);
            }
        }
        self.purposes = Some(list);
        self
    }

    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    pub fn default_config(mut self, overlay: Map<String, Value>) -> Self {
        self.default_config = Some(overlay);
        self
    }

    pub fn score(mut self, purpose: impl Into<Purpose>, score: f64) -> Self {
        self.scores.insert(purpose.into(), score);
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<(), RegistryError> {
        check_purposes(self.purposes.iter().flatten())?;
        check_scores(&self.scores)
    }

    /// Applies the update in place and refreshes `updated_at`.
    pub fn apply_to(self, record: &mut RegistrationRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(purposes) = self.purposes {
            record.purposes = purposes;
        }
        if let Some(capabilities) = self.capabilities {
            record.capabilities = capabilities;
        }
        if let Some(mut overlay) = self.default_config {
            for key in IDENTITY_KEYS {
                overlay.remove(key);
            }
            record.default_config = overlay;
        }
        record.scores.extend(self.scores);
        record.metadata.extend(self.metadata);
        record.updated_at = Utc::now();
    }
}
