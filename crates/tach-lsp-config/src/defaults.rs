use crate::logging::{LogFormat, LogLevel};
use crate::settings::ImportStrategy;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Interpreter used when none is configured.
pub const DEFAULT_INTERPRETER: &str = "python3";

/// Seconds to wait for a language server to answer a lifecycle request.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default interpreter invocation.
pub fn default_interpreter() -> Vec<String> {
    vec![DEFAULT_INTERPRETER.to_owned()]
}

/// Default import strategy.
pub fn default_import_strategy() -> ImportStrategy {
    ImportStrategy::UseBundled
}

/// Default level for both the output channel and the environment.
pub fn default_log_level() -> LogLevel {
    LogLevel::Info
}

/// Default request timeout in seconds.
pub fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}
