//! # Model Hub
//!
//! Composition root for the configuration pipeline, the secret store and the
//! service registry.
//!
//! - [`Runtime`]: bootstraps every component in dependency order
//! - [`Resolver`]: the single call consumers make to obtain a backend
//! - [`telemetry`]: tracing setup from the logging settings

pub mod error;
pub mod resolver;
pub mod runtime;
pub mod telemetry;

pub use error::RuntimeError;
pub use resolver::Resolver;
pub use runtime::{Runtime, RuntimeOptions};
pub use telemetry::init_tracing;
