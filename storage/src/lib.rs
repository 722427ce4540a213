//! # Storage Layer
//!
//! Durable state for the model hub:
//! - `crypto`: AES-256-GCM sealing of sensitive values with a PBKDF2 key
//! - `env_file`: the flat `KEY=VALUE` secret file
//! - `secret_store`: layered secret lookup with an encrypted cache
//! - `json_dir_store`: one JSON document per id plus an index file

pub mod crypto;
pub mod env_file;
pub mod json_dir_store;
pub mod secret_store;

pub use crypto::{ENCRYPTED_PREFIX, SecretCipher, is_sealed};
pub use json_dir_store::{INDEX_FILE, JsonDirStore};
pub use secret_store::{MASKED_VALUE, SecretStore};
