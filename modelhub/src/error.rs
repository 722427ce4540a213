use errors::{ConfigError, RegistryError, SecretError};
use thiserror::Error;

/// Failures while assembling or driving the runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Secret store error: {0}")]
    Secret(#[from] SecretError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}
