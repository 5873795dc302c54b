//! Semantic version triple reported by the `tach` tool.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A `major.minor.patch` version.
///
/// Ordering is lexicographic over the three components, so derived `Ord`
/// gives the comparison the version gate relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionInfo {
    major: u64,
    minor: u64,
    patch: u64,
}

impl VersionInfo {
    /// Builds a version from its components.
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Major component.
    #[must_use]
    pub const fn major(self) -> u64 {
        self.major
    }

    /// Minor component.
    #[must_use]
    pub const fn minor(self) -> u64 {
        self.minor
    }

    /// Patch component.
    #[must_use]
    pub const fn patch(self) -> u64 {
        self.patch
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Names the component of a version token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSegment {
    /// First component.
    Major,
    /// Second component.
    Minor,
    /// Third component.
    Patch,
}

impl fmt::Display for VersionSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
        })
    }
}

/// Errors raised while parsing a version token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionParseError {
    /// The token ended before the segment.
    #[error("version '{input}' has no {segment} segment")]
    MissingSegment {
        /// Token being parsed.
        input: String,
        /// Segment that was absent.
        segment: VersionSegment,
    },
    /// The segment was present but not a non-negative integer.
    #[error("{segment} segment '{value}' of version '{input}' is not a number")]
    InvalidSegment {
        /// Token being parsed.
        input: String,
        /// Segment that failed.
        segment: VersionSegment,
        /// Offending text.
        value: String,
    },
}

impl FromStr for VersionInfo {
    type Err = VersionParseError;

    /// Parses the first three dot-separated segments; anything after the
    /// patch segment (`0.25.2.dev1`) is ignored.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut segments = input.split('.');
        let mut next = |segment: VersionSegment| -> Result<u64, VersionParseError> {
            let value = segments
                .next()
                .filter(|text| !text.is_empty())
                .ok_or_else(|| VersionParseError::MissingSegment {
                    input: input.to_owned(),
                    segment,
                })?;
            value
                .parse()
                .map_err(|_| VersionParseError::InvalidSegment {
                    input: input.to_owned(),
                    segment,
                    value: value.to_owned(),
                })
        };

        let major = next(VersionSegment::Major)?;
        let minor = next(VersionSegment::Minor)?;
        let patch = next(VersionSegment::Patch)?;
        Ok(Self::new(major, minor, patch))
    }
}
