//! Trace sink that keeps every message for later assertions.

use std::sync::Mutex;

use super::lock;
use crate::trace::TraceSink;

/// Severity a message was traced at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// `trace_error`.
    Error,
    /// `trace_info`.
    Info,
    /// `trace_verbose`.
    Verbose,
}

/// Records traced messages in order.
#[derive(Debug, Default)]
pub struct RecordingTraceSink {
    entries: Mutex<Vec<(Severity, String)>>,
}

impl RecordingTraceSink {
    /// Messages traced at `severity`, oldest first.
    #[must_use]
    pub fn messages(&self, severity: Severity) -> Vec<String> {
        lock(&self.entries)
            .iter()
            .filter(|(recorded, _)| *recorded == severity)
            .map(|(_, message)| message.clone())
            .collect()
    }

    /// Returns `true` when a message at `severity` contains `needle`.
    #[must_use]
    pub fn contains(&self, severity: Severity, needle: &str) -> bool {
        self.messages(severity)
            .iter()
            .any(|message| message.contains(needle))
    }

    /// Every message regardless of severity, oldest first.
    #[must_use]
    pub fn all(&self) -> Vec<String> {
        lock(&self.entries)
            .iter()
            .map(|(_, message)| message.clone())
            .collect()
    }

    fn record(&self, severity: Severity, message: &str) {
        lock(&self.entries).push((severity, message.to_owned()));
    }
}

impl TraceSink for RecordingTraceSink {
    fn trace_error(&self, message: &str) {
        self.record(Severity::Error, message);
    }

    fn trace_info(&self, message: &str) {
        self.record(Severity::Info, message);
    }

    fn trace_verbose(&self, message: &str) {
        self.record(Severity::Verbose, message);
    }
}
