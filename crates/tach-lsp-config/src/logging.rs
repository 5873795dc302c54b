use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Supported logging output formats.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Structured JSON suitable for ingestion by logging stacks.
    #[default]
    Json,
    /// Human-readable single line output.
    Compact,
}

/// Errors encountered while parsing a [`LogFormat`] or [`LogLevel`] from text.
pub type LogFormatParseError = strum::ParseError;

/// Verbosity of an output channel, ordered from most to least chatty.
///
/// `Off` sorts first so that taking the minimum of two levels always yields
/// the more verbose (or fully silenced) of the pair.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Deserialize,
    Serialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumString,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogLevel {
    /// Logging disabled.
    Off,
    /// Everything, including protocol traffic.
    Trace,
    /// Debug detail.
    Debug,
    /// Informational messages.
    #[default]
    Info,
    /// Warnings only.
    Warning,
    /// Errors only.
    Error,
}
