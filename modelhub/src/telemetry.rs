//! Tracing subscriber setup driven by the logging settings.

use config::LoggingSettings;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::fmt::format::{DefaultFields, Format};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub const LOG_FILE_NAME: &str = "modelhub.log";

/// Filter from `RUST_LOG` when set, otherwise from `logging.level`.
pub fn env_filter(logging: &LoggingSettings) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(logging.level.to_lowercase()))
}

fn open_log_file(dir: &Path) -> std::io::Result<File> {
    std::fs::create_dir_all(dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE_NAME))
}

fn file_layer<S>(file: File) -> fmt::Layer<S, DefaultFields, Format, Mutex<File>> {
    fmt::layer().with_ansi(false).with_writer(Mutex::new(file))
}

/// Installs the global subscriber: stdout in `text` or `json` format, plus an
/// ANSI-free copy under `logging.log_dir` when `log_to_file` is set.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing(logging: &LoggingSettings) -> bool {
    let mut file_error = None;
    let file = if logging.log_to_file {
        open_log_file(Path::new(&logging.log_dir))
            .map_err(|e| file_error = Some(e))
            .ok()
    } else {
        None
    };
    let installed = if logging.format.eq_ignore_ascii_case("json") {
        tracing_subscriber::registry()
            .with(env_filter(logging))
            .with(fmt::layer().json())
            .with(file.map(file_layer))
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::registry()
            .with(env_filter(logging))
            .with(fmt::layer())
            .with(file.map(file_layer))
            .try_init()
            .is_ok()
    };

    if let Some(e) = file_error {
        tracing::warn!("Logging to stdout only, cannot open {}: {}", logging.log_dir, e);
    }
    if installed {
        tracing::debug!("Tracing initialised at level {}", logging.level);
    }
    installed
}
