//! Value sealing for the secret store using AES-256-GCM
//!
//! The key is derived once from an operator passphrase with PBKDF2-HMAC-SHA256.
//! Sealed values carry the `encrypted:` marker so they are never sealed twice.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::{Engine as _, engine::general_purpose};
use errors::SecretError;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Marker prepended to every sealed value.
pub const ENCRYPTED_PREFIX: &str = "encrypted:";

/// Environment variable holding the passphrase.
pub const SECRET_ENV_VAR: &str = "ENCRYPTION_SECRET";

/// Used when `ENCRYPTION_SECRET` is unset. Only suitable for development.
pub const FALLBACK_PASSPHRASE: &str = "modelhub-development-secret";

const KDF_SALT: &[u8] = b"modelhub-secret-store";
const KDF_ITERATIONS: u32 = 100_000;
const NONCE_LEN: usize = 12;

pub fn is_sealed(value: &str) -> bool {
    value.starts_with(ENCRYPTED_PREFIX)
}

/// Symmetric cipher bound to one derived key.
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl SecretCipher {
    pub fn from_passphrase(passphrase: &str) -> Self {
        let mut key_bytes = Zeroizing::new([0u8; 32]);
        pbkdf2::pbkdf2_hmac::<Sha256>(
            passphrase.as_bytes(),
            KDF_SALT,
            KDF_ITERATIONS,
            &mut *key_bytes,
        );
        let key = Key::<Aes256Gcm>::from_slice(&*key_bytes);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Derives the key from `ENCRYPTION_SECRET`, or the fallback passphrase.
    pub fn from_env() -> Self {
        match std::env::var(SECRET_ENV_VAR) {
            Ok(secret) if !secret.is_empty() => Self::from_passphrase(&secret),
            _ => {
                tracing::warn!(
                    "{} not set, deriving the secret key from the development fallback",
                    SECRET_ENV_VAR
                );
                Self::from_passphrase(FALLBACK_PASSPHRASE)
            }
        }
    }

    /// Encrypts into a token: URL-safe base64 of `nonce || ciphertext`.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, SecretError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| SecretError::Encryption {
                reason: e.to_string(),
            })?;

        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(nonce.as_slice());
        payload.extend_from_slice(&ciphertext);
        Ok(general_purpose::URL_SAFE.encode(payload))
    }

    /// Fails with `SecretError::Decryption` on a malformed token or a key
    /// mismatch.
    pub fn decrypt(&self, token: &str) -> Result<String, SecretError> {
        let payload = general_purpose::URL_SAFE
            .decode(token.trim())
            .map_err(|e| SecretError::Decryption {
                reason: e.to_string(),
            })?;

        if payload.len() <= NONCE_LEN {
            return Err(SecretError::Decryption {
                reason: "token too short".to_string(),
            });
        }

        let (nonce_bytes, ciphertext) = payload.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| SecretError::Decryption {
                reason: "authentication failed, wrong key or corrupted token".to_string(),
            })?;

        String::from_utf8(plaintext).map_err(|e| SecretError::Decryption {
            reason: e.to_string(),
        })
    }

    /// Returns `encrypted:<token>`. Already sealed input is returned unchanged.
    pub fn seal(&self, value: &str) -> Result<String, SecretError> {
        if is_sealed(value) {
            return Ok(value.to_string());
        }
        Ok(format!("{}{}", ENCRYPTED_PREFIX, self.encrypt(value)?))
    }

    /// Decrypts sealed input; plain input is returned unchanged.
    pub fn unseal(&self, value: &str) -> Result<String, SecretError> {
        match value.strip_prefix(ENCRYPTED_PREFIX) {
            Some(token) => self.decrypt(token),
            None => Ok(value.to_string()),
        }
    }
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher")
            .field("algorithm", &"AES-256-GCM")
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encryption_roundtrip() {
        let cipher = SecretCipher::from_passphrase("test-secret");
        for plaintext in ["sk-ant-123", "", "with spaces and ünïcode", "a=b\"c'"] {
            let token = cipher.encrypt(plaintext).unwrap();
            assert_eq!(cipher.decrypt(&token).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_tokens_are_url_safe_and_randomized() {
        let cipher = SecretCipher::from_passphrase("test-secret");
        let a = cipher.encrypt("same").unwrap();
        let b = cipher.encrypt("same").unwrap();
        assert_ne!(a, b);
        assert!(!a.contains('+') && !a.contains('/'));
    }

    #[test]
    fn test_wrong_key_fails() {
        let token = SecretCipher::from_passphrase("key-one").encrypt("v").unwrap();
        let err = SecretCipher::from_passphrase("key-two")
            .decrypt(&token)
            .unwrap_err();
        assert!(matches!(err, SecretError::Decryption { .. }));
    }

    #[test]
    fn test_malformed_token_fails() {
        let cipher = SecretCipher::from_passphrase("test-secret");
        assert!(matches!(
            cipher.decrypt("***not base64***"),
            Err(SecretError::Decryption { .. })
        ));
        assert!(matches!(
            cipher.decrypt("c2hvcnQ="),
            Err(SecretError::Decryption { .. })
        ));
    }

    #[test]
    fn test_seal_is_idempotent() {
        let cipher = SecretCipher::from_passphrase("test-secret");
        let sealed = cipher.seal("sk-real-key").unwrap();
        assert!(is_sealed(&sealed));
        assert_eq!(cipher.seal(&sealed).unwrap(), sealed);
        assert_eq!(cipher.unseal(&sealed).unwrap(), "sk-real-key");
        assert_eq!(cipher.unseal("plain").unwrap(), "plain");
    }

    #[test]
    fn test_debug_hides_key() {
        let cipher = SecretCipher::from_passphrase("test-secret");
        assert!(!format!("{cipher:?}").contains("test-secret"));
    }
}
