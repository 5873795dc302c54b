//! Non-fatal diagnostics produced while preparing a launch.

use std::fmt;

use crate::version::VersionInfo;

/// A soft failure that changed the launch without aborting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    /// The tool version could not be determined, so `-c` was omitted.
    VersionProbeFailed {
        /// Rendered probe error.
        message: String,
    },
    /// The tool is too old to accept `-c`, so it was omitted.
    CustomConfigUnsupported {
        /// Version reported by the tool.
        version: VersionInfo,
        /// Minimum version that accepts the flag.
        required: VersionInfo,
    },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VersionProbeFailed { message } => {
                write!(f, "could not determine tach version: {message}")
            }
            Self::CustomConfigUnsupported { version, required } => write!(
                f,
                "tach {version} does not accept a custom configuration path (requires {required})"
            ),
        }
    }
}

/// A value accompanied by the advisories raised while producing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advised<T> {
    value: T,
    advisories: Vec<Advisory>,
}

impl<T> Advised<T> {
    /// Wraps a value with the supplied advisories.
    #[must_use]
    pub const fn with_advisories(value: T, advisories: Vec<Advisory>) -> Self {
        Self { value, advisories }
    }

    /// Borrows the value.
    #[must_use]
    pub const fn value(&self) -> &T {
        &self.value
    }

    /// Advisories in the order they were raised.
    #[must_use]
    pub fn advisories(&self) -> &[Advisory] {
        &self.advisories
    }

    /// Discards the advisories.
    #[must_use]
    pub fn into_value(self) -> T {
        self.value
    }

    /// Splits into value and advisories.
    #[must_use]
    pub fn into_parts(self) -> (T, Vec<Advisory>) {
        (self.value, self.advisories)
    }

    /// Transforms the value, keeping the advisories.
    #[must_use]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Advised<U> {
        Advised {
            value: f(self.value),
            advisories: self.advisories,
        }
    }
}
