//! Per-run diagnostics transcript.
//!
//! Each analysis run owns one [`Diagnostics`]; entries are timestamped relative
//! to the start of the run, appended in order and mirrored to the `log` facade.

use std::{
    fmt, fs,
    path::Path,
    time::{Duration, Instant},
};

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct DiagnosticEntry {
    pub elapsed: Duration,
    pub level: log::Level,
    pub message: String,
}

impl fmt::Display for DiagnosticEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[+{:.3}s] {:<5} {}",
            self.elapsed.as_secs_f64(),
            self.level,
            self.message
        )
    }
}

#[derive(Debug)]
pub struct Diagnostics {
    started: Instant,
    entries: Vec<DiagnosticEntry>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            entries: Vec::new(),
        }
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        self.record(log::Level::Debug, message.into());
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.record(log::Level::Info, message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.record(log::Level::Warn, message.into());
    }

    fn record(&mut self, level: log::Level, message: String) {
        log::log!(level, "{message}");
        self.entries.push(DiagnosticEntry {
            elapsed: self.started.elapsed(),
            level,
            message,
        });
    }

    pub fn entries(&self) -> &[DiagnosticEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&DiagnosticEntry> {
        self.entries.last()
    }

    /// The whole log as newline separated text, for copy/export.
    pub fn transcript(&self) -> String {
        self.entries
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn export(&self, path: &Path) -> anyhow::Result<()> {
        fs::write(path, self.transcript())
            .with_context(|| format!("failed to write diagnostics to {}", path.display()))
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}
