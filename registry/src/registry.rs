//! # Service Registry
//!
//! Registration records, the default-selection index, durable persistence and
//! resolution through provider adapters.

use crate::overlay::{merge_overlay, validate_overlay};
use crate::request::{RecordUpdate, RegistrationRequest};
use crate::seeding::{custom_model_request, seed_requests};
use crate::state::RegistryState;
use chrono::Utc;
use config::LlmSettings;
use errors::RegistryError;
use mr_core::{
    BackendHandle, BackendSpec, Capabilities, ProviderAdapter, ProviderKind, Purpose,
    RegistrationRecord,
};
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storage::JsonDirStore;
use tracing::{debug, info, warn};

/// What a resolution is aimed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Id(String),
    Purpose(Purpose),
}

impl Target {
    /// An explicit id takes precedence over a purpose.
    pub fn from_parts(id: Option<&str>, purpose: Option<Purpose>) -> Result<Self, RegistryError> {
        match (id, purpose) {
            (Some(id), _) if !id.is_empty() => Ok(Self::Id(id.to_string())),
            (_, Some(purpose)) => Ok(Self::Purpose(purpose)),
            _ => Err(RegistryError::MissingTarget),
        }
    }
}

/// Files touched by one mutation.
#[derive(Debug, Default)]
struct Changes {
    saved: Vec<String>,
    deleted: Vec<String>,
}

impl Changes {
    fn none() -> Self {
        Self::default()
    }

    fn saved(id: impl Into<String>) -> Self {
        Self {
            saved: vec![id.into()],
            deleted: Vec::new(),
        }
    }

    fn deleted(id: impl Into<String>) -> Self {
        Self {
            saved: Vec::new(),
            deleted: vec![id.into()],
        }
    }
}

/// Capability-scored service registry.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Stores one [`RegistrationRecord`] per candidate backend, keeps the
/// default record per purpose (highest score among active records, later
/// registration on ties), persists every change as one JSON file per record
/// plus a default index, and turns records into live backends through the
/// [`ProviderAdapter`] registered for their provider.
///
/// ## Usage
/// ```rust,no_run
/// use registry::{RegistrationRequest, ServiceRegistry};
/// use mr_core::ProviderKind;
///
/// let registry = ServiceRegistry::open("data/model_registry").unwrap();
/// registry
///     .register(
///         RegistrationRequest::new(ProviderKind::Local, "llama3")
///             .with_purpose("summarizer")
///             .with_score("summarizer", 0.8),
///     )
///     .unwrap();
/// let default = registry.get_default("summarizer");
/// ```
///
/// ## Concurrency
/// Mutations serialize on a writer lock, build the next state on a copy,
/// persist it and only then publish it. Readers take an `Arc` of the
/// published state and never observe a half-applied mutation. A failed write
/// leaves the published state unchanged, although files written earlier in
/// the same mutation may already be on disk.
pub struct ServiceRegistry {
    store: JsonDirStore,
    state: RwLock<Arc<RegistryState>>,
    writer: Mutex<()>,
    adapters: RwLock<HashMap<ProviderKind, Arc<dyn ProviderAdapter>>>,
}

impl ServiceRegistry {
    /// Opens the registry directory and rebuilds state from its files.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let store = JsonDirStore::open(dir)?;
        let records = store.load_all::<RegistrationRecord>()?;
        let index: BTreeMap<String, String> = store.load_index();

        let state = RegistryState::reconcile(
            records.into_iter().map(|(_, record)| record),
            index.clone(),
        );
        if state.default_index() != index {
            debug!("Default index changed during reconciliation, rewriting");
            store.save_index(&state.default_index())?;
        }

        info!(
            "Loaded {} models and {} defaults from {}",
            state.records.len(),
            state.defaults.len(),
            store.dir().display()
        );

        Ok(Self {
            store,
            state: RwLock::new(Arc::new(state)),
            writer: Mutex::new(()),
            adapters: RwLock::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        self.store.dir()
    }

    fn snapshot(&self) -> Arc<RegistryState> {
        Arc::clone(&self.state.read())
    }

    fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut RegistryState) -> Result<(T, Changes), RegistryError>,
    ) -> Result<T, RegistryError> {
        let _writer = self.writer.lock();
        let current = self.snapshot();
        let mut next = RegistryState::clone(&current);

        let (output, changes) = apply(&mut next)?;

        for id in &changes.saved {
            if let Some(record) = next.records.get(id) {
                self.store.save(id, record)?;
            }
        }
        for id in &changes.deleted {
            self.store.delete(id)?;
        }
        if next.defaults != current.defaults {
            self.store.save_index(&next.default_index())?;
        }

        *self.state.write() = Arc::new(next);
        Ok(output)
    }

    /// Registers a record, replacing any record with the same derived id.
    ///
    /// Returns the id.
    pub fn register(&self, request: RegistrationRequest) -> Result<String, RegistryError> {
        request.validate()?;
        let id = self.mutate(|state| {
            let record = request.into_record(state.take_seq());
            let id = record.model_id.clone();
            let previous = state.records.get(&id).cloned();
            if previous.is_some() {
                debug!(model_id = %id, "Replacing existing registration");
            }
            state.upsert(record, previous.as_ref());
            Ok((id.clone(), Changes::saved(id)))
        })?;
        info!(model_id = %id, "Registered model");
        Ok(id)
    }

    /// Registers only when no record has the derived id yet.
    fn register_if_absent(
        &self,
        request: RegistrationRequest,
    ) -> Result<Option<String>, RegistryError> {
        request.validate()?;
        self.mutate(|state| {
            let id = request.model_id();
            if state.records.contains_key(&id) {
                return Ok((None, Changes::none()));
            }
            let record = request.into_record(state.take_seq());
            state.upsert(record, None);
            Ok((Some(id.clone()), Changes::saved(id)))
        })
    }

    /// Registers a model with scores derived from its capabilities.
    pub fn register_custom_model(
        &self,
        provider: ProviderKind,
        model_name: &str,
        purposes: &[Purpose],
        capabilities: Option<Capabilities>,
    ) -> Result<String, RegistryError> {
        self.register(custom_model_request(
            provider,
            model_name,
            purposes,
            capabilities,
        ))
    }

    /// Registers the default model of every enabled provider that has no
    /// record yet. Existing records, including manual overrides loaded from
    /// disk, are left alone.
    pub fn seed_from_settings(&self, llm: &LlmSettings) -> Result<Vec<String>, RegistryError> {
        let mut seeded = Vec::new();
        for request in seed_requests(llm) {
            let id = request.model_id();
            match self.register_if_absent(request)? {
                Some(id) => {
                    info!(model_id = %id, "Seeded model from settings");
                    seeded.push(id);
                }
                None => debug!(model_id = %id, "Already registered, not seeding"),
            }
        }
        Ok(seeded)
    }

    /// Applies `update` to an existing record and re-evaluates defaults for
    /// every purpose it served before or serves now.
    pub fn update(&self, id: &str, update: RecordUpdate) -> Result<RegistrationRecord, RegistryError> {
        update.validate()?;
        let record = self.mutate(|state| {
            let previous = state
                .records
                .get(id)
                .cloned()
                .ok_or_else(|| RegistryError::model_not_found(id))?;
            let mut record = previous.clone();
            update.apply_to(&mut record);
            state.upsert(record.clone(), Some(&previous));
            Ok((record, Changes::saved(id)))
        })?;
        info!(model_id = %id, "Updated model");
        Ok(record)
    }

    /// Makes `id` the default for `purpose` regardless of score, adding the
    /// purpose to the record when it does not declare it. The record must be
    /// active.
    pub fn set_default(&self, id: &str, purpose: impl Into<Purpose>) -> Result<(), RegistryError> {
        let purpose = purpose.into();
        if purpose.is_empty() {
            return Err(RegistryError::EmptyPurpose);
        }
        self.mutate(|state| {
            let record = state
                .records
                .get_mut(id)
                .ok_or_else(|| RegistryError::model_not_found(id))?;
            if !record.is_active() {
                warn!(
                    model_id = %id,
                    purpose = %purpose,
                    status = %record.status,
                    "Refusing to make an inactive model the default"
                );
                return Err(RegistryError::InactiveDefault {
                    id: id.to_string(),
                    status: record.status.to_string(),
                });
            }

            let changes = if record.serves(&purpose) {
                Changes::none()
            } else {
                record.purposes.push(purpose.clone());
                record.updated_at = Utc::now();
                Changes::saved(id)
            };
            state.purposes.insert(purpose.clone());
            state.defaults.insert(purpose.clone(), id.to_string());
            Ok(((), changes))
        })?;
        info!(model_id = %id, purpose = %purpose, "Set default model");
        Ok(())
    }

    /// Deletes a record and its file; purposes it was default for fall back
    /// to their best remaining record.
    pub fn remove(&self, id: &str) -> Result<RegistrationRecord, RegistryError> {
        let removed = self.mutate(|state| {
            let removed = state
                .remove(id)
                .ok_or_else(|| RegistryError::model_not_found(id))?;
            Ok((removed, Changes::deleted(id)))
        })?;
        info!(model_id = %id, "Removed model");
        Ok(removed)
    }

    /// Adds a purpose tag that no record serves yet. Returns `false` when the
    /// tag was already known. Custom purposes live in memory only.
    pub fn register_custom_purpose(&self, purpose: impl Into<Purpose>) -> Result<bool, RegistryError> {
        let purpose = purpose.into();
        if purpose.is_empty() {
            return Err(RegistryError::EmptyPurpose);
        }
        self.mutate(|state| Ok((state.purposes.insert(purpose), Changes::none())))
    }

    pub fn get(&self, id: &str) -> Option<RegistrationRecord> {
        self.snapshot().records.get(id).cloned()
    }

    pub fn get_default(&self, purpose: impl Into<Purpose>) -> Option<RegistrationRecord> {
        let state = self.snapshot();
        let id = state.defaults.get(&purpose.into())?;
        state.records.get(id).cloned()
    }

    /// Purpose to default id.
    pub fn defaults(&self) -> BTreeMap<Purpose, String> {
        self.snapshot().defaults.clone()
    }

    pub fn list(&self) -> Vec<RegistrationRecord> {
        self.snapshot().records.values().cloned().collect()
    }

    /// Active records serving `purpose`, best first.
    pub fn models_for_purpose(&self, purpose: impl Into<Purpose>) -> Vec<RegistrationRecord> {
        let purpose = purpose.into();
        let mut models: Vec<RegistrationRecord> = self
            .snapshot()
            .records
            .values()
            .filter(|r| r.is_eligible_for(&purpose))
            .cloned()
            .collect();
        models.sort_by(|a, b| {
            if a.outranks(b, &purpose) {
                std::cmp::Ordering::Less
            } else if b.outranks(a, &purpose) {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        });
        models
    }

    pub fn models_for_provider(&self, provider: ProviderKind) -> Vec<RegistrationRecord> {
        self.snapshot()
            .records
            .values()
            .filter(|r| r.provider == provider)
            .cloned()
            .collect()
    }

    pub fn available_purposes(&self) -> Vec<Purpose> {
        self.snapshot().purposes.iter().cloned().collect()
    }

    /// Installs the adapter for its provider, returning the one it replaces.
    pub fn register_adapter(
        &self,
        adapter: Arc<dyn ProviderAdapter>,
    ) -> Option<Arc<dyn ProviderAdapter>> {
        let provider = adapter.provider_type();
        info!("Registered adapter for provider {}", provider);
        self.adapters.write().insert(provider, adapter)
    }

    pub fn adapter(&self, provider: ProviderKind) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.read().get(&provider).cloned()
    }

    /// Health of every registered adapter.
    pub fn check_health(&self) -> BTreeMap<ProviderKind, bool> {
        let adapters: Vec<Arc<dyn ProviderAdapter>> =
            self.adapters.read().values().cloned().collect();
        adapters
            .into_iter()
            .map(|adapter| {
                let healthy = adapter.health_check();
                if !healthy {
                    warn!("Adapter for {} reports unhealthy", adapter.provider_type());
                }
                (adapter.provider_type(), healthy)
            })
            .collect()
    }

    /// Builds a backend for the record named by `target`.
    ///
    /// The record's default overlay is merged under `overlay`, the result is
    /// validated, and the provider's adapter materialises the handle.
    pub fn resolve(
        &self,
        target: Target,
        overlay: &Map<String, Value>,
    ) -> Result<BackendHandle, RegistryError> {
        let record = match target {
            Target::Id(id) => self
                .get(&id)
                .ok_or_else(|| RegistryError::model_not_found(id))?,
            Target::Purpose(purpose) => self
                .get_default(purpose.clone())
                .ok_or_else(|| RegistryError::purpose_not_found(purpose.as_str()))?,
        };
        self.build(&record, overlay)
    }

    /// Best active record of `provider` for `purpose`, falling back to the
    /// purpose default when that provider has none.
    pub fn resolve_preferring(
        &self,
        purpose: impl Into<Purpose>,
        provider: ProviderKind,
        overlay: &Map<String, Value>,
    ) -> Result<BackendHandle, RegistryError> {
        let purpose = purpose.into();
        let preferred = self
            .models_for_purpose(purpose.clone())
            .into_iter()
            .find(|r| r.provider == provider);
        match preferred {
            Some(record) => self.build(&record, overlay),
            None => {
                debug!(
                    "No {} model for {}, using the purpose default",
                    provider, purpose
                );
                self.resolve(Target::Purpose(purpose), overlay)
            }
        }
    }

    fn build(
        &self,
        record: &RegistrationRecord,
        overlay: &Map<String, Value>,
    ) -> Result<BackendHandle, RegistryError> {
        let adapter =
            self.adapter(record.provider)
                .ok_or_else(|| RegistryError::ProviderNotRegistered {
                    provider: record.provider.to_string(),
                })?;

        let settings = merge_overlay(&record.default_config, overlay);
        validate_overlay(&settings)?;

        let spec = BackendSpec {
            model_id: record.model_id.clone(),
            provider: record.provider,
            model_name: record.model_name.clone(),
            capabilities: record.capabilities.clone(),
            settings,
        };
        debug!(model_id = %record.model_id, "Building backend");
        Ok(adapter.build(spec)?)
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.snapshot();
        f.debug_struct("ServiceRegistry")
            .field("dir", &self.store.dir())
            .field("models", &state.records.len())
            .field("defaults", &state.defaults)
            .finish_non_exhaustive()
    }
}
