//! Layered secret store with an encrypted in-memory cache.
//!
//! Lookup order: explicit cache, process environment, loaded env file, caller
//! default. With `override_env` set on load, the env file shadows the process
//! environment instead.

use crate::crypto::{SecretCipher, is_sealed};
use crate::env_file::{read_env_file, write_env_file};
use config::{ConfigSource, EnvSource, tree_from_lookup};
use errors::{ConfigError, SecretError};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Mask shown by [`SecretStore::list`] for sealed values.
pub const MASKED_VALUE: &str = "[ENCRYPTED]";

#[derive(Debug, Default)]
struct FileLayer {
    entries: BTreeMap<String, String>,
    overrides_env: bool,
}

/// Secret store.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Holds configuration values that may be sensitive. Sensitive values live
/// sealed (`encrypted:<token>`) in the cache and in the persisted env file;
/// plaintext exists only in values returned to callers that ask for it.
///
/// ## Usage
/// ```rust,no_run
/// use storage::{SecretCipher, SecretStore};
///
/// let store = SecretStore::new(SecretCipher::from_env()).with_env_file(".env");
/// store.set("ANTHROPIC_API_KEY", "sk-ant-...", true, true).unwrap();
/// let key = store.get("ANTHROPIC_API_KEY", None, true).unwrap();
/// assert_eq!(key.as_deref(), Some("sk-ant-..."));
/// ```
///
/// ## Configuration Source
/// The store also implements [`ConfigSource`] under the environment source's
/// name, resolving the environment mapping table through its layered lookup
/// so the settings tree sees secrets set at runtime.
pub struct SecretStore {
    cipher: SecretCipher,
    env_file: Option<PathBuf>,
    cache: RwLock<HashMap<String, String>>,
    file_layer: RwLock<FileLayer>,
}

impl SecretStore {
    pub fn new(cipher: SecretCipher) -> Self {
        Self {
            cipher,
            env_file: None,
            cache: RwLock::new(HashMap::new()),
            file_layer: RwLock::new(FileLayer::default()),
        }
    }

    /// Key from `ENCRYPTION_SECRET` (or the fallback), no env file.
    pub fn from_env() -> Self {
        Self::new(SecretCipher::from_env())
    }

    /// Sets the file written by persisting `set`/`remove` calls.
    pub fn with_env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_file = Some(path.into());
        self
    }

    pub fn env_file(&self) -> Option<&Path> {
        self.env_file.as_deref()
    }

    pub fn cipher(&self) -> &SecretCipher {
        &self.cipher
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, SecretError> {
        self.cipher.encrypt(plaintext)
    }

    pub fn decrypt(&self, token: &str) -> Result<String, SecretError> {
        self.cipher.decrypt(token)
    }

    /// Loads an env file into the file layer, replacing any previous one.
    ///
    /// Returns the number of entries read. A missing file loads nothing.
    pub fn load_env_file(&self, path: &Path, override_env: bool) -> Result<usize, SecretError> {
        let entries = read_env_file(path)?;
        let count = entries.len();
        *self.file_layer.write() = FileLayer {
            entries,
            overrides_env: override_env,
        };
        info!("Loaded {} entries from env file {}", count, path.display());
        Ok(count)
    }

    fn lookup_uncached(&self, name: &str) -> Option<String> {
        let layer = self.file_layer.read();
        let from_env = std::env::var(name).ok();
        let from_file = layer.entries.get(name).cloned();
        if layer.overrides_env {
            from_file.or(from_env)
        } else {
            from_env.or(from_file)
        }
    }

    fn lookup(&self, name: &str) -> Option<String> {
        self.cache
            .read()
            .get(name)
            .cloned()
            .or_else(|| self.lookup_uncached(name))
    }

    /// Layered lookup.
    ///
    /// Sensitive reads return plaintext and leave the value sealed in the
    /// cache. Non-sensitive reads return the stored form as-is. Defaults are
    /// never cached.
    pub fn get(
        &self,
        name: &str,
        default: Option<&str>,
        sensitive: bool,
    ) -> Result<Option<String>, SecretError> {
        if let Some(cached) = self.cache.read().get(name).cloned() {
            return if sensitive {
                self.cipher.unseal(&cached).map(Some)
            } else {
                Ok(Some(cached))
            };
        }

        let Some(found) = self.lookup_uncached(name) else {
            return Ok(default.map(str::to_string));
        };

        if sensitive {
            let sealed = self.cipher.seal(&found)?;
            let plaintext = self.cipher.unseal(&sealed)?;
            self.cache.write().insert(name.to_string(), sealed);
            Ok(Some(plaintext))
        } else {
            self.cache.write().insert(name.to_string(), found.clone());
            Ok(Some(found))
        }
    }

    /// Stores a value, sealing it when `sensitive`.
    ///
    /// With `persist`, the env file is rewritten first; a write failure leaves
    /// the cache untouched. The process environment is never modified.
    pub fn set(
        &self,
        name: &str,
        value: &str,
        sensitive: bool,
        persist: bool,
    ) -> Result<(), SecretError> {
        let stored = if sensitive {
            self.cipher.seal(value)?
        } else {
            value.to_string()
        };

        if persist {
            self.update_env_file(|entries| {
                entries.insert(name.to_string(), stored.clone());
            })?;
        }

        self.cache.write().insert(name.to_string(), stored);
        if sensitive {
            info!("Set encrypted variable {}", name);
        } else {
            info!("Set variable {}", name);
        }
        Ok(())
    }

    /// Drops a value from the cache and file layer, and from the env file when
    /// `persist`. Returns whether anything was removed.
    pub fn remove(&self, name: &str, persist: bool) -> Result<bool, SecretError> {
        let mut removed_from_file = false;
        if persist {
            self.update_env_file(|entries| {
                removed_from_file = entries.remove(name).is_some();
            })?;
        }

        let from_cache = self.cache.write().remove(name).is_some();
        let from_layer = self.file_layer.write().entries.remove(name).is_some();
        let removed = from_cache || from_layer || removed_from_file;
        if removed {
            info!("Removed variable {}", name);
        }
        Ok(removed)
    }

    fn update_env_file(
        &self,
        change: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), SecretError> {
        let path = self.env_file.as_deref().ok_or_else(|| SecretError::EnvFile {
            path: "<unset>".to_string(),
            reason: "no env file configured".to_string(),
        })?;

        let mut entries = read_env_file(path)?;
        change(&mut entries);
        write_env_file(path, &entries)?;

        let mut layer = self.file_layer.write();
        layer.entries = entries;
        Ok(())
    }

    /// Known entries: process environment, then file layer, then cache.
    ///
    /// Sealed values are masked unless `include_sensitive`, in which case the
    /// sealed form is shown. `pattern` is a case-insensitive substring filter
    /// on the name.
    pub fn list(&self, include_sensitive: bool, pattern: Option<&str>) -> BTreeMap<String, String> {
        let mut merged: BTreeMap<String, String> = std::env::vars().collect();
        merged.extend(
            self.file_layer
                .read()
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        merged.extend(
            self.cache
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );

        let pattern = pattern.map(str::to_uppercase);
        merged
            .into_iter()
            .filter(|(key, _)| {
                pattern
                    .as_deref()
                    .is_none_or(|p| key.to_uppercase().contains(p))
            })
            .map(|(key, value)| {
                if !include_sensitive && is_sealed(&value) {
                    (key, MASKED_VALUE.to_string())
                } else {
                    (key, value)
                }
            })
            .collect()
    }

    /// Copies the env file to `backup` (default: `<file>.backup`).
    pub fn backup_env_file(&self, backup: Option<&Path>) -> Result<PathBuf, SecretError> {
        let source = self.env_file.as_deref().ok_or_else(|| SecretError::EnvFile {
            path: "<unset>".to_string(),
            reason: "no env file configured".to_string(),
        })?;

        let target = match backup {
            Some(path) => path.to_path_buf(),
            None => {
                let mut name = source.as_os_str().to_os_string();
                name.push(".backup");
                PathBuf::from(name)
            }
        };

        if source.exists() {
            std::fs::copy(source, &target).map_err(|e| SecretError::EnvFile {
                path: target.display().to_string(),
                reason: e.to_string(),
            })?;
            info!("Created env file backup at {}", target.display());
        } else {
            warn!("No env file at {} to back up", source.display());
        }
        Ok(target)
    }

    /// Fails listing every key with no value in any layer.
    pub fn validate_required(&self, keys: &[&str]) -> Result<(), SecretError> {
        let missing: Vec<String> = keys
            .iter()
            .filter(|key| self.lookup(key).is_none())
            .map(|key| (*key).to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SecretError::MissingRequired { keys: missing })
        }
    }

    pub fn clear_cache(&self) {
        self.cache.write().clear();
        debug!("Secret store cache cleared");
    }
}

impl ConfigSource for SecretStore {
    fn name(&self) -> &str {
        EnvSource::NAME
    }

    fn load(&self) -> Result<Map<String, Value>, ConfigError> {
        Ok(tree_from_lookup(|name| {
            let stored = self.lookup(name)?;
            match self.cipher.unseal(&stored) {
                Ok(plain) => Some(plain),
                Err(e) => {
                    warn!("Skipping {} for configuration: {}", name, e);
                    None
                }
            }
        }))
    }
}

impl std::fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretStore")
            .field("env_file", &self.env_file)
            .field("cached", &self.cache.read().len())
            .finish_non_exhaustive()
    }
}
