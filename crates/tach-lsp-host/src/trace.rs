//! Trace sink seam and protocol trace-level negotiation.

use std::sync::Arc;

use lsp_types::TraceValue;
use tach_lsp_config::LogLevel;
use tracing::{debug, error, info};

/// Log target used by [`TracingTraceSink`].
pub const TRACE_TARGET: &str = "tach_lsp_host::trace";

/// Receives human-readable supervisor diagnostics at three severities.
pub trait TraceSink: Send + Sync {
    /// Records a failure.
    fn trace_error(&self, message: &str);

    /// Records a notable event.
    fn trace_info(&self, message: &str);

    /// Records detail that is only useful when debugging.
    fn trace_verbose(&self, message: &str);
}

impl<T> TraceSink for Arc<T>
where
    T: TraceSink + ?Sized,
{
    fn trace_error(&self, message: &str) {
        (**self).trace_error(message);
    }

    fn trace_info(&self, message: &str) {
        (**self).trace_info(message);
    }

    fn trace_verbose(&self, message: &str) {
        (**self).trace_verbose(message);
    }
}

/// Forwards traces to `tracing`, tagged with the output channel name.
#[derive(Debug, Clone)]
pub struct TracingTraceSink {
    channel: String,
}

impl TracingTraceSink {
    /// Creates a sink for the named output channel.
    #[must_use]
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
        }
    }
}

impl TraceSink for TracingTraceSink {
    fn trace_error(&self, message: &str) {
        error!(target: TRACE_TARGET, channel = %self.channel, "{message}");
    }

    fn trace_info(&self, message: &str) {
        info!(target: TRACE_TARGET, channel = %self.channel, "{message}");
    }

    fn trace_verbose(&self, message: &str) {
        debug!(target: TRACE_TARGET, channel = %self.channel, "{message}");
    }
}

/// Chooses the protocol trace level from the output channel and environment
/// log levels.
///
/// The channel's own `Off` and `Trace` settings win outright. Otherwise the
/// more verbose of the two levels decides: `Off` gives `off`, `Debug` and
/// `Trace` give `verbose`, and the rest give `messages`.
#[must_use]
pub fn negotiate_trace_level(channel: LogLevel, global: LogLevel) -> TraceValue {
    match channel {
        LogLevel::Off => TraceValue::Off,
        LogLevel::Trace => TraceValue::Verbose,
        _ => match channel.min(global) {
            LogLevel::Off => TraceValue::Off,
            LogLevel::Trace | LogLevel::Debug => TraceValue::Verbose,
            LogLevel::Info | LogLevel::Warning | LogLevel::Error => TraceValue::Messages,
        },
    }
}
