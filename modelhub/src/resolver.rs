//! The narrow entry point consumers use to obtain a backend.

use mr_core::{BackendHandle, ProviderKind, Purpose};
use registry::{RegistryError, ServiceRegistry, Target};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Resolution facade over a shared [`ServiceRegistry`].
///
/// Cheap to clone; every clone resolves against the same registry.
#[derive(Debug, Clone)]
pub struct Resolver {
    registry: Arc<ServiceRegistry>,
}

impl Resolver {
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self { registry }
    }

    /// Backend for the current default of `purpose`.
    pub fn resolve_for_purpose(
        &self,
        purpose: impl Into<Purpose>,
        overlay: &Map<String, Value>,
    ) -> Result<BackendHandle, RegistryError> {
        self.registry
            .resolve(Target::Purpose(purpose.into()), overlay)
    }

    pub fn resolve_by_id(
        &self,
        id: &str,
        overlay: &Map<String, Value>,
    ) -> Result<BackendHandle, RegistryError> {
        self.registry.resolve(Target::Id(id.to_string()), overlay)
    }

    /// Id when given, otherwise the purpose default.
    pub fn resolve(
        &self,
        id: Option<&str>,
        purpose: Option<Purpose>,
        overlay: &Map<String, Value>,
    ) -> Result<BackendHandle, RegistryError> {
        self.registry.resolve(Target::from_parts(id, purpose)?, overlay)
    }

    pub fn resolve_preferring(
        &self,
        purpose: impl Into<Purpose>,
        provider: ProviderKind,
        overlay: &Map<String, Value>,
    ) -> Result<BackendHandle, RegistryError> {
        self.registry.resolve_preferring(purpose, provider, overlay)
    }
}
