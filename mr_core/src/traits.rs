//! Boundary traits between the registry and backend adapter code

use crate::types::{Capabilities, ProviderKind};
use errors::AdapterError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::any::Any;
use std::sync::Arc;

/// Everything an adapter needs to materialise one backend: the record's
/// identity plus the merged settings overlay (record defaults under caller
/// overrides).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSpec {
    pub model_id: String,
    pub provider: ProviderKind,
    pub model_name: String,
    pub capabilities: Capabilities,
    pub settings: Map<String, Value>,
}

impl BackendSpec {
    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }
}

/// A ready-to-use backend produced by an adapter.
///
/// The registry never looks inside; consumers downcast through `as_any`.
pub trait Backend: Send + Sync {
    fn spec(&self) -> &BackendSpec;

    fn as_any(&self) -> &dyn Any;
}

pub type BackendHandle = Arc<dyn Backend>;

/// Turns registration records into live backends for one provider family.
///
/// The registry calls only these three operations.
pub trait ProviderAdapter: Send + Sync {
    fn provider_type(&self) -> ProviderKind;

    fn build(&self, spec: BackendSpec) -> Result<BackendHandle, AdapterError>;

    fn health_check(&self) -> bool;
}

