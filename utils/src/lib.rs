//! # Model Hub Utilities
//!
//! Hashing and filesystem-safe naming helpers.
//!
//! - Uses SHA-2 for content hashing
//! - File stems derived from registry ids stay stable across runs

use sha2::{Digest, Sha256};

/// Compute SHA-256 hash of content string
///
/// # Examples
///
/// ```
/// use utils::compute_content_hash;
///
/// let hash = compute_content_hash("hello world");
/// assert_eq!(hash.len(), 64);
/// ```
#[must_use]
pub fn compute_content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Characters allowed verbatim in a file stem.
#[must_use]
pub fn is_file_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

/// Derive a filesystem-safe file stem from an identifier.
///
/// Identifiers that are already safe are returned unchanged. Otherwise every
/// unsafe character becomes `_` and the first 8 hex digits of the id's
/// SHA-256 are appended, so `a/b` and `a_b` never share a file.
///
/// ```
/// use utils::file_stem_for_id;
///
/// assert_eq!(file_stem_for_id("openai-gpt-4"), "openai-gpt-4");
/// assert!(file_stem_for_id("gemini-models/gemini-2.5-flash").starts_with("gemini-models_gemini-2.5-flash-"));
/// ```
#[must_use]
pub fn file_stem_for_id(id: &str) -> String {
    let safe = !id.is_empty()
        && !id.starts_with('.')
        && id.chars().all(is_file_safe_char);
    if safe {
        return id.to_string();
    }

    let cleaned: String = id
        .chars()
        .map(|c| if is_file_safe_char(c) { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    let hash = compute_content_hash(id);
    format!("{}-{}", cleaned, &hash[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_content_hash_consistency() {
        let content = "test content";
        let hash1 = compute_content_hash(content);
        let hash2 = compute_content_hash(content);
        assert_eq!(hash1, hash2);
        assert_ne!(hash1, compute_content_hash("other content"));
    }

    #[test]
    fn test_file_stem_passthrough() {
        assert_eq!(file_stem_for_id("anthropic-claude-3-5-sonnet"), "anthropic-claude-3-5-sonnet");
        assert_eq!(file_stem_for_id("local-llama3.1-v2"), "local-llama3.1-v2");
    }

    #[test]
    fn test_file_stem_distinguishes_replaced_characters() {
        let slash = file_stem_for_id("a/b");
        let colon = file_stem_for_id("a:b");
        assert!(slash.starts_with("a_b-"));
        assert!(colon.starts_with("a_b-"));
        assert_ne!(slash, colon);
        assert_ne!(slash, file_stem_for_id("a_b"));
    }

    #[test]
    fn test_file_stem_never_hidden() {
        let stem = file_stem_for_id("..secret");
        assert!(!stem.starts_with('.'));
        assert!(file_stem_for_id("").len() > 1);
    }
}
