//! Tracing setup.
//!
//! Console output honors `RUST_LOG` and the quiet flag; a plain-text copy of
//! every event goes to the log file regardless.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::error::{Result, WattcastError};

/// Install the global subscriber: console layer (suppressed when `quiet`)
/// plus an append-mode file layer at `log_file`.
pub fn init(quiet: bool, log_file: &Path) -> Result<()> {
    if let Some(parent) = log_file.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = if quiet {
        None
    } else {
        Some(tracing_subscriber::fmt::layer())
    };
    // The file stays at INFO regardless of RUST_LOG, so dependency debug
    // output never floods training.log.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(Arc::new(file))
        .with_filter(LevelFilter::INFO);

    tracing_subscriber::registry()
        .with(console_layer.with_filter(env_filter))
        .with(file_layer)
        .try_init()
        .map_err(|e| WattcastError::Logging(format!("failed to install subscriber: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_creates_log_file_and_filters_below_info() {
        let dir = tempfile::tempdir().unwrap();
        let log_file = dir.path().join("runs").join("training.log");
        // A single test owns subscriber installation in this binary; any
        // second call would fail against the global registry.
        let installed = init(true, &log_file).is_ok();
        assert!(log_file.exists());

        if installed {
            tracing::info!("epoch summary line");
            tracing::debug!("verbose batch dump");
            let contents = std::fs::read_to_string(&log_file).unwrap();
            assert!(contents.contains("epoch summary line"));
            assert!(!contents.contains("verbose batch dump"));
        }
    }
}
