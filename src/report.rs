//! Reporting of non-fatal conditions
//!
//! Algorithms never log through a global; they take a `&dyn Reporter` so the
//! caller decides where informational messages and warnings go.

use std::sync::Mutex;

/// Sink for informational messages and warnings raised while an operation
/// keeps going.
pub trait Reporter {
    /// Report progress or a notable event
    fn info(&self, message: &str);

    /// Report a condition that was skipped or resolved without aborting
    fn warn(&self, message: &str);
}

/// Forwards every report to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }
}

/// Severity of a recorded report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLevel {
    Info,
    Warn,
}

/// Keeps every report in memory, in order
#[derive(Debug, Default)]
pub struct MemoryReporter {
    entries: Mutex<Vec<(ReportLevel, String)>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded entries
    pub fn entries(&self) -> Vec<(ReportLevel, String)> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Only the warnings
    pub fn warnings(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(level, _)| *level == ReportLevel::Warn)
            .map(|(_, message)| message)
            .collect()
    }

    fn push(&self, level: ReportLevel, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((level, message.to_string()));
        }
    }
}

impl Reporter for MemoryReporter {
    fn info(&self, message: &str) {
        self.push(ReportLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.push(ReportLevel::Warn, message);
    }
}
