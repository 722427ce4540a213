//! # Configuration Manager
//!
//! Orchestrates sources, merges and coerces their partial trees, validates
//! the result and publishes immutable snapshots.

use crate::export::{ExportFormat, export_settings};
use crate::loader::EnvSource;
use crate::precedence::{coerce_tree, deep_merge};
use crate::settings::Settings;
use crate::source::{ConfigSource, get_path};
use crate::validation::validate_tree;
use errors::ConfigError;
use parking_lot::{Mutex, Once, RwLock};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// One logical configuration instance per process, held by the composition
/// root and shared by reference.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Runs the pipeline: schema defaults, then every source in order
/// (deep merge), then schema-guided coercion, then validation. A successful
/// run replaces the published snapshot; a failed validation is logged with
/// the rejected tree and the previous snapshot stays in place.
///
/// ## Usage
/// ```rust,no_run
/// use config::{ConfigManager, FileSource};
/// use std::sync::Arc;
///
/// let manager = ConfigManager::new();
/// manager.add_source(Arc::new(FileSource::new("config.yaml"))).ok();
/// println!("port = {}", manager.get_settings().api.port);
/// ```
///
/// ## Concurrency
/// Reloads serialize on the source list lock. Readers clone an `Arc` of the
/// current snapshot and never block on a reload in progress.
pub struct ConfigManager {
    sources: Mutex<Vec<Arc<dyn ConfigSource>>>,
    current: RwLock<Arc<Settings>>,
    init: Once,
}

impl ConfigManager {
    /// Environment source only.
    pub fn new() -> Self {
        Self::with_sources(vec![Arc::new(EnvSource::new())])
    }

    pub fn with_sources(sources: Vec<Arc<dyn ConfigSource>>) -> Self {
        let manager = Self {
            sources: Mutex::new(sources),
            current: RwLock::new(Arc::new(Settings::default())),
            init: Once::new(),
        };
        manager.initialize();
        manager
    }

    /// Performs the first merge. Later calls are no-ops.
    pub fn initialize(&self) {
        self.init.call_once(|| {
            if let Err(e) = self.reload() {
                warn!("Initial configuration rejected, using defaults: {}", e);
            }
        });
    }

    /// Current snapshot.
    pub fn get_settings(&self) -> Arc<Settings> {
        Arc::clone(&self.current.read())
    }

    /// Value at a dotted path of the current snapshot.
    pub fn get_value(&self, path: &str) -> Option<Value> {
        let tree = serde_json::to_value(self.get_settings().as_ref()).ok()?;
        get_path(&tree, path).cloned()
    }

    /// Appends a source and re-runs the pipeline.
    pub fn add_source(&self, source: Arc<dyn ConfigSource>) -> Result<Arc<Settings>, ConfigError> {
        let mut sources = self.sources.lock();
        info!("Adding configuration source {}", source.name());
        sources.push(source);
        self.reload_locked(&sources)
    }

    /// Swaps the source with the same name in place, appending when none
    /// matches, then re-runs the pipeline.
    pub fn replace_source(
        &self,
        source: Arc<dyn ConfigSource>,
    ) -> Result<Arc<Settings>, ConfigError> {
        let mut sources = self.sources.lock();
        match sources.iter().position(|s| s.name() == source.name()) {
            Some(idx) => {
                info!("Replacing configuration source {}", source.name());
                sources[idx] = source;
            }
            None => {
                info!("Adding configuration source {}", source.name());
                sources.push(source);
            }
        }
        self.reload_locked(&sources)
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources
            .lock()
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }

    /// Re-runs the pipeline from scratch.
    pub fn reload(&self) -> Result<Arc<Settings>, ConfigError> {
        let sources = self.sources.lock();
        self.reload_locked(&sources)
    }

    /// Writes the sanitized current snapshot.
    pub fn export(&self, path: &Path, format: ExportFormat) -> Result<(), ConfigError> {
        export_settings(&self.get_settings(), path, format)
    }

    fn reload_locked(&self, sources: &[Arc<dyn ConfigSource>]) -> Result<Arc<Settings>, ConfigError> {
        let schema = Settings::default_tree();
        let mut tree = schema.clone();

        for source in sources {
            match source.load() {
                Ok(partial) => {
                    debug!(
                        "Merging {} top-level keys from {}",
                        partial.len(),
                        source.name()
                    );
                    deep_merge(&mut tree, Value::Object(partial));
                }
                Err(e) => warn!(
                    "Configuration source {} failed, treating as empty: {}",
                    source.name(),
                    e
                ),
            }
        }

        coerce_tree(&mut tree, Some(&schema));

        match validate_tree(&tree) {
            Ok(settings) => {
                let settings = Arc::new(settings);
                *self.current.write() = Arc::clone(&settings);
                info!("Configuration reloaded from {} sources", sources.len());
                Ok(settings)
            }
            Err(e) => {
                let mut rejected = tree;
                crate::export::sanitize(&mut rejected);
                error!(
                    "Configuration validation failed, keeping previous settings: {} rejected={}",
                    e, rejected
                );
                Err(e)
            }
        }
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigManager")
            .field("sources", &self.source_names())
            .finish_non_exhaustive()
    }
}
