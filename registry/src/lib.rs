//! # Service Registry
//!
//! Candidate backend services, scored per purpose, with a durable default
//! per purpose.
//!
//! - `registry`: the [`ServiceRegistry`] and resolution [`Target`]s
//! - `request`: registration and update builders
//! - `seeding`: records derived from the settings tree
//! - `capabilities`: built-in provider/model capability table
//! - `overlay`: merging and checking backend settings overlays

pub mod capabilities;
pub mod overlay;
pub mod registry;
pub mod request;
pub mod seeding;
mod state;

pub use capabilities::capabilities_for;
pub use errors::RegistryError;
pub use registry::{ServiceRegistry, Target};
pub use request::{RecordUpdate, RegistrationRequest};
pub use seeding::{SETTINGS_SOURCE, seed_requests, seed_scores};
