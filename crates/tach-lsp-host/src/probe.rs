//! Discovers the `tach` version installed behind an interpreter.

use std::io;
use std::process::{Command, Stdio};
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::version::{VersionInfo, VersionParseError};

const PROBE_TARGET: &str = "tach_lsp_host::probe";

/// Arguments appended to the interpreter to ask `tach` for its version.
pub const VERSION_ARGS: [&str; 3] = ["-m", "tach", "--version"];

const GENERIC_FAILURE: &str = "tach version probe failed";

/// Errors raised while probing the tool version.
#[derive(Debug, Clone, Error)]
pub enum VersionProbeError {
    /// The interpreter could not be started.
    #[error("failed to run '{command}': {source}")]
    Spawn {
        /// Interpreter that failed to start.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The probe exited unsuccessfully.
    #[error("{message}")]
    NonZeroExit {
        /// Exit code when the process was not killed by a signal.
        code: Option<i32>,
        /// Trimmed standard error, or a generic message when it was empty.
        message: String,
    },
    /// Standard output did not contain a second whitespace token.
    #[error("no version token in output '{output}'")]
    MissingVersionToken {
        /// Trimmed standard output.
        output: String,
    },
    /// The second token was not a version.
    #[error("invalid version in output '{output}': {source}")]
    InvalidVersion {
        /// Trimmed standard output.
        output: String,
        /// Parse failure.
        #[source]
        source: VersionParseError,
    },
}

/// Reports the `tach` version reachable through an interpreter.
pub trait VersionProbe {
    /// Runs the probe against `command`, blocking until it completes.
    ///
    /// # Errors
    ///
    /// Returns [`VersionProbeError`] when the process cannot be run, exits
    /// unsuccessfully, or prints something other than `tach X.Y.Z`.
    fn probe(&self, command: &str) -> Result<VersionInfo, VersionProbeError>;
}

impl<T> VersionProbe for Box<T>
where
    T: VersionProbe + ?Sized,
{
    fn probe(&self, command: &str) -> Result<VersionInfo, VersionProbeError> {
        (**self).probe(command)
    }
}

/// Probe that spawns `<command> -m tach --version`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessVersionProbe;

impl VersionProbe for ProcessVersionProbe {
    fn probe(&self, command: &str) -> Result<VersionInfo, VersionProbeError> {
        debug!(target: PROBE_TARGET, command, "probing tach version");

        let output = Command::new(command)
            .args(VERSION_ARGS)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| VersionProbeError::Spawn {
                command: command.to_owned(),
                source: Arc::new(source),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VersionProbeError::NonZeroExit {
                code: output.status.code(),
                message: failure_message(&stderr),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let version = parse_version_output(&stdout)?;
        debug!(target: PROBE_TARGET, command, %version, "tach version probed");
        Ok(version)
    }
}

/// Extracts the version from `tach --version` output (`tach 0.25.2`).
///
/// # Errors
///
/// Returns [`VersionProbeError::MissingVersionToken`] when there is no
/// second token and [`VersionProbeError::InvalidVersion`] when it does not
/// parse.
pub fn parse_version_output(stdout: &str) -> Result<VersionInfo, VersionProbeError> {
    let output = stdout.trim();
    let token = output
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| VersionProbeError::MissingVersionToken {
            output: output.to_owned(),
        })?;
    token
        .parse()
        .map_err(|source| VersionProbeError::InvalidVersion {
            output: output.to_owned(),
            source,
        })
}

fn failure_message(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::from(GENERIC_FAILURE)
    } else {
        trimmed.to_owned()
    }
}
