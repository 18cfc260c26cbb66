//! Progress sinks
//!
//! The orchestrator reports a transfer as `start(total)`, a series of
//! non-decreasing cumulative `update(current)` calls, then `finish()`.
//! Rendering is entirely up to the sink.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::sync::PoisonError;

/// Observer of a single transfer's byte counts
pub trait ProgressSink: Send + Sync {
    /// The transfer is about to start; `total` is the size announced by the source
    fn start(&self, total: u64);

    /// `current` bytes have been written so far (cumulative)
    fn update(&self, current: u64);

    /// The copy completed successfully
    fn finish(&self);
}

/// Sink that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn start(&self, _total: u64) {}
    fn update(&self, _current: u64) {}
    fn finish(&self) {}
}

/// Terminal progress bar (indicatif)
pub struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    /// Create a bar drawn to stderr; it stays empty until `start`
    pub fn new() -> Self {
        Self {
            bar: ProgressBar::new(0),
        }
    }

    /// Create a bar that never draws (for tests and non-interactive runs)
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Current position of the underlying bar
    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for TerminalProgress {
    fn start(&self, total: u64) {
        self.bar.set_style(
            ProgressStyle::with_template(
                "{msg} {bar:40} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        self.bar.set_message("Downloading");
        self.bar.set_length(total);
        self.bar.set_position(0);
    }

    fn update(&self, current: u64) {
        self.bar.set_position(current);
    }

    fn finish(&self) {
        self.bar.finish();
    }
}

/// Sink that logs progress through `tracing` every 10%
///
/// Used where no terminal is attached (the HTTP server).
#[derive(Debug)]
pub struct LogProgress {
    label: String,
    state: Mutex<LogState>,
}

#[derive(Debug, Default)]
struct LogState {
    total: u64,
    last_decile: u64,
}

impl LogProgress {
    /// Create a sink whose log lines are tagged with `label` (usually the URL)
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            state: Mutex::new(LogState::default()),
        }
    }
}

impl ProgressSink for LogProgress {
    fn start(&self, total: u64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.total = total;
        state.last_decile = 0;
        tracing::info!(label = %self.label, total_bytes = total, "transfer started");
    }

    fn update(&self, current: u64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.total == 0 {
            return;
        }
        let decile = (current.saturating_mul(10) / state.total).min(10);
        if decile > state.last_decile {
            state.last_decile = decile;
            tracing::debug!(
                label = %self.label,
                current_bytes = current,
                total_bytes = state.total,
                percent = decile * 10,
                "transfer progress"
            );
        }
    }

    fn finish(&self) {
        tracing::info!(label = %self.label, "transfer finished");
    }
}
