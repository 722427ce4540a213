//! Flat `KEY=VALUE` env file persistence.
//!
//! Reading skips blanks and `#` comments, strips matching surrounding quotes
//! and logs malformed lines. Writing rewrites the whole file atomically with
//! keys sorted. Inside double quotes `\\`, `\"`, `\n` and `\r` are escapes,
//! so every entry stays on one line.

use errors::SecretError;
use regex::Regex;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;

static ENV_LINE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*=\s*(.*)$").ok());

const HEADER: &str = "# Environment variables\n\
                      # Managed by the model hub secret store\n\
                      # Sensitive values are encrypted\n";

/// Parses env file contents. `origin` only labels log lines.
pub fn parse_env(contents: &str, origin: &str) -> BTreeMap<String, String> {
    let mut entries = BTreeMap::new();

    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match ENV_LINE.as_ref().and_then(|re| re.captures(line)) {
            Some(caps) => {
                let key = caps[1].to_string();
                let value = unquote(caps[2].trim());
                entries.insert(key, value);
            }
            None => {
                tracing::warn!("Skipping invalid line {} in {}", idx + 1, origin);
            }
        }
    }

    entries
}

fn unquote(raw: &str) -> String {
    let bytes = raw.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && first == b'"' {
            return unescape(&raw[1..raw.len() - 1]);
        }
        if first == last && first == b'\'' {
            return raw[1..raw.len() - 1].to_string();
        }
    }
    raw.to_string()
}

fn unescape(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(escaped @ ('"' | '\\')) => out.push(escaped),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn needs_quotes(value: &str) -> bool {
    value
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '$' | '`' | '"' | '\'' | '\\' | '#'))
}

fn render_value(value: &str) -> String {
    if needs_quotes(value) {
        let mut escaped = String::with_capacity(value.len() + 2);
        for c in value.chars() {
            match c {
                '\\' => escaped.push_str("\\\\"),
                '"' => escaped.push_str("\\\""),
                '\n' => escaped.push_str("\\n"),
                '\r' => escaped.push_str("\\r"),
                _ => escaped.push(c),
            }
        }
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}

/// Renders a complete env file: header, then sorted entries.
pub fn render_env(entries: &BTreeMap<String, String>) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for (key, value) in entries {
        out.push_str(key);
        out.push('=');
        out.push_str(&render_value(value));
        out.push('\n');
    }
    out
}

/// Reads an env file. A missing file is empty.
pub fn read_env_file(path: &Path) -> Result<BTreeMap<String, String>, SecretError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| SecretError::EnvFile {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(parse_env(&contents, &path.display().to_string()))
}

/// Replaces the env file with `entries`, via a temporary sibling and rename.
pub fn write_env_file(path: &Path, entries: &BTreeMap<String, String>) -> Result<(), SecretError> {
    let env_error = |reason: String| SecretError::EnvFile {
        path: path.display().to_string(),
        reason,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| env_error(e.to_string()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| env_error(e.to_string()))?;
    tmp.write_all(render_env(entries).as_bytes())
        .map_err(|e| env_error(e.to_string()))?;
    tmp.persist(path).map_err(|e| env_error(e.error.to_string()))?;

    tracing::info!("Updated env file at {}", path.display());
    Ok(())
}
