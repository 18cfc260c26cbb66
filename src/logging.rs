//! Process-wide log setup for the `media-dl` binary
//!
//! Logs go to the console and, when it can be opened, to an append-only
//! `app.log` inside the configured log directory.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Name of the log file inside the log directory
pub const LOG_FILE_NAME: &str = "app.log";

/// Default level from the verbosity flags
///
/// `-q` wins over `-v`; `-v` is debug and `-vv` or more is trace.
pub fn default_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Open `{log_dir}/app.log` for appending, creating the directory if needed
pub fn open_log_file(log_dir: &Path) -> std::io::Result<(File, PathBuf)> {
    std::fs::create_dir_all(log_dir)?;
    let path = log_dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((file, path))
}

/// Install the global subscriber
///
/// `RUST_LOG` takes priority over `default_level`. Returns the log file path,
/// or `None` when only console logging could be set up.
pub fn init(default_level: &str, log_dir: &Path) -> Option<PathBuf> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let console = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match open_log_file(log_dir) {
        Ok((file, path)) => {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            let installed = tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(file_layer)
                .try_init()
                .is_ok();
            installed.then_some(path)
        }
        Err(e) => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .try_init();
            tracing::warn!(
                log_dir = %log_dir.display(),
                error = %e,
                "cannot open log file, logging to console only"
            );
            None
        }
    }
}
