//! # Model Hub Core
//!
//! Shared types and traits for the model hub.
//!
//! This crate provides:
//! - Purpose tags, provider kinds and model statuses
//! - Registration records with per-purpose scores
//! - The provider adapter boundary consumed by the registry
//!
//! # Best Practices
//!
//! - Uses Rust Edition 2024
//! - Purposes are an open string set with well-known constants
//! - Records are plain values; callers receive copies, never shared state

pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use traits::{Backend, BackendHandle, BackendSpec, ProviderAdapter};
pub use types::{Capabilities, ModelStatus, ProviderKind, Purpose, RegistrationRecord};
pub use errors::AdapterError;
