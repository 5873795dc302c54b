//! Derives installation paths shared by the launcher and the binary.
//!
//! The bundled copy of `tach` lives under `<install root>/bundled/libs`. When
//! no install root is configured, it is derived from the running executable:
//! binaries placed in a `bin` directory use that directory's parent, anything
//! else uses the executable's own directory.

use std::env;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// Directory holding bundled scripts, relative to the install root.
pub const BUNDLED_DIR_NAME: &str = "bundled";

/// Directory holding bundled Python libraries, relative to [`BUNDLED_DIR_NAME`].
pub const BUNDLED_LIBS_DIR_NAME: &str = "libs";

/// Errors raised while deriving installation paths.
#[derive(Debug, Error)]
pub enum InstallRootError {
    /// The running executable could not be located.
    #[error("failed to locate the running executable: {source}")]
    CurrentExe {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The executable path is not valid UTF-8.
    #[error("executable path '{path}' is not valid UTF-8")]
    NonUtf8 {
        /// Lossy rendering of the offending path.
        path: String,
    },
    /// The executable path has no parent directory.
    #[error("executable path '{path}' has no parent directory")]
    MissingParent {
        /// The executable path.
        path: Utf8PathBuf,
    },
}

/// Returns `<install root>/bundled/libs`.
#[must_use]
pub fn bundled_libs_dir(install_root: &Utf8Path) -> Utf8PathBuf {
    install_root
        .join(BUNDLED_DIR_NAME)
        .join(BUNDLED_LIBS_DIR_NAME)
}

/// Derives the install root from the running executable.
///
/// # Errors
///
/// Returns [`InstallRootError`] when the executable path cannot be read, is
/// not UTF-8, or has no parent directory.
pub fn default_install_root() -> Result<Utf8PathBuf, InstallRootError> {
    let exe = env::current_exe().map_err(|source| InstallRootError::CurrentExe { source })?;
    let exe = Utf8PathBuf::from_path_buf(exe).map_err(|path| InstallRootError::NonUtf8 {
        path: path.to_string_lossy().into_owned(),
    })?;
    install_root_for_executable(&exe)
}

fn install_root_for_executable(exe: &Utf8Path) -> Result<Utf8PathBuf, InstallRootError> {
    let dir = exe
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .ok_or_else(|| InstallRootError::MissingParent {
            path: exe.to_path_buf(),
        })?;
    match (dir.file_name(), dir.parent()) {
        (Some("bin"), Some(root)) if !root.as_str().is_empty() => Ok(root.to_path_buf()),
        _ => Ok(dir.to_path_buf()),
    }
}
