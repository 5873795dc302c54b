//! Version gates for optional server features.

use crate::version::VersionInfo;

/// First `tach` release that accepts `-c <path>` on `tach server`.
pub const MIN_VERSION_WITH_CONFIG: VersionInfo = VersionInfo::new(0, 25, 2);

/// Returns `true` when `candidate` is the same as or newer than `minimum`.
#[must_use]
pub fn compare_at_least(candidate: VersionInfo, minimum: VersionInfo) -> bool {
    candidate >= minimum
}

/// Returns `true` when the tool accepts a custom configuration path.
#[must_use]
pub fn supports_custom_config(version: VersionInfo) -> bool {
    compare_at_least(version, MIN_VERSION_WITH_CONFIG)
}
