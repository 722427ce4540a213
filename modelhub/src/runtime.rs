//! # Runtime
//!
//! Builds the secret store, the configuration manager and the service
//! registry in dependency order and keeps them together.

use crate::error::RuntimeError;
use crate::resolver::Resolver;
use crate::telemetry::init_tracing;
use config::{ConfigManager, ConfigSource, FileSource, OverrideSource, Settings};
use mr_core::ProviderAdapter;
use registry::ServiceRegistry;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use storage::SecretStore;
use tracing::info;

/// Inputs to [`Runtime::bootstrap`].
pub struct RuntimeOptions {
    pub env_file: Option<PathBuf>,
    /// Entries of `env_file` shadow process variables.
    pub env_file_overrides: bool,
    /// Structured config files, merged after the environment in this order.
    pub config_files: Vec<PathBuf>,
    pub overrides: OverrideSource,
    /// Defaults to `<data.data_dir>/<data.registry_subdir>`.
    pub registry_dir: Option<PathBuf>,
    pub seed_registry: bool,
    pub init_tracing: bool,
    pub adapters: Vec<Arc<dyn ProviderAdapter>>,
}

impl RuntimeOptions {
    pub fn new() -> Self {
        Self {
            env_file: None,
            env_file_overrides: false,
            config_files: Vec::new(),
            overrides: OverrideSource::new("overrides"),
            registry_dir: None,
            seed_registry: true,
            init_tracing: false,
            adapters: Vec::new(),
        }
    }

    pub fn with_env_file(mut self, path: impl Into<PathBuf>, overrides_env: bool) -> Self {
        self.env_file = Some(path.into());
        self.env_file_overrides = overrides_env;
        self
    }

    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_files.push(path.into());
        self
    }

    pub fn with_override(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.overrides = self.overrides.with(path, value);
        self
    }

    pub fn with_registry_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.registry_dir = Some(dir.into());
        self
    }

    pub fn with_seeding(mut self, seed: bool) -> Self {
        self.seed_registry = seed;
        self
    }

    pub fn with_tracing(mut self, init: bool) -> Self {
        self.init_tracing = init;
        self
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// The process's composition root.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Owns the one secret store, configuration manager and service registry of
/// the process and hands out shared references to them. Nothing here is a
/// global: callers keep the `Runtime` and pass its parts down.
///
/// ## Usage
/// ```rust,no_run
/// use modelhub::{Runtime, RuntimeOptions};
///
/// let runtime = Runtime::bootstrap(
///     RuntimeOptions::new()
///         .with_env_file(".env", false)
///         .with_config_file("config.yaml")
///         .with_tracing(true),
/// )
/// .unwrap();
/// let backend = runtime
///     .resolver()
///     .resolve_for_purpose("general", &serde_json::Map::new());
/// ```
pub struct Runtime {
    secrets: Arc<SecretStore>,
    config: Arc<ConfigManager>,
    registry: Arc<ServiceRegistry>,
}

impl Runtime {
    pub fn bootstrap(options: RuntimeOptions) -> Result<Self, RuntimeError> {
        let mut secrets = SecretStore::from_env();
        if let Some(path) = &options.env_file {
            secrets = secrets.with_env_file(path.clone());
            secrets.load_env_file(path, options.env_file_overrides)?;
        }
        let secrets = Arc::new(secrets);

        let mut sources: Vec<Arc<dyn ConfigSource>> =
            vec![Arc::clone(&secrets) as Arc<dyn ConfigSource>];
        sources.extend(
            options
                .config_files
                .iter()
                .map(|path| Arc::new(FileSource::new(path.clone())) as Arc<dyn ConfigSource>),
        );
        if !options.overrides.is_empty() {
            sources.push(Arc::new(options.overrides));
        }
        let config = Arc::new(ConfigManager::with_sources(sources));
        let settings = config.get_settings();

        if options.init_tracing {
            init_tracing(&settings.logging);
        }

        let registry_dir = options
            .registry_dir
            .unwrap_or_else(|| settings.data.registry_dir());
        let registry = Arc::new(ServiceRegistry::open(registry_dir)?);
        if options.seed_registry {
            registry.seed_from_settings(&settings.llm)?;
        }
        for adapter in options.adapters {
            registry.register_adapter(adapter);
        }

        info!(
            "Runtime ready: {} ({}), {} models registered",
            settings.app_name,
            settings.environment,
            registry.list().len()
        );

        Ok(Self {
            secrets,
            config,
            registry,
        })
    }

    /// Current settings snapshot.
    pub fn settings(&self) -> Arc<Settings> {
        self.config.get_settings()
    }

    pub fn config(&self) -> &Arc<ConfigManager> {
        &self.config
    }

    pub fn secrets(&self) -> &Arc<SecretStore> {
        &self.secrets
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    pub fn resolver(&self) -> Resolver {
        Resolver::new(Arc::clone(&self.registry))
    }

    /// Stores a secret and re-runs the configuration pipeline so the
    /// settings tree reflects it.
    pub fn set_secret(
        &self,
        name: &str,
        value: &str,
        sensitive: bool,
        persist: bool,
    ) -> Result<Arc<Settings>, RuntimeError> {
        self.secrets.set(name, value, sensitive, persist)?;
        Ok(self.config.reload()?)
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
