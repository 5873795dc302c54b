//! Watches workspace configuration files and reports modifications.
//!
//! Production watching is backed by `notify`. Events are filtered to
//! modifications of paths matching a [`WatchPatterns`] set, evaluated against
//! the path relative to the watched root. The [`WatchProvider`] trait lets the
//! supervisor be driven by synthetic events in tests.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use camino::{Utf8Path, Utf8PathBuf};
use glob::{Pattern, PatternError};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tracing::{debug, warn};

use crate::disposable::Disposable;

const WATCHER_TARGET: &str = "tach_lsp_host::watcher";

/// Files whose modification invalidates a running `tach` server.
pub const CONFIG_FILE_PATTERNS: [&str; 4] = [
    "**/tach.toml",
    "**/tach.domain.toml",
    "**/pyproject.toml",
    "**/requirements.txt",
];

/// Callback invoked with the path of a modified configuration file.
pub type ChangeCallback = Box<dyn Fn(&Utf8Path) + Send + Sync>;

/// Errors raised while registering a watch.
#[derive(Debug, Error)]
pub enum WatchError {
    /// A pattern did not compile.
    #[error("invalid watch pattern '{pattern}': {source}")]
    Pattern {
        /// Offending pattern.
        pattern: String,
        /// Compilation error.
        #[source]
        source: PatternError,
    },
    /// The platform watcher could not be created.
    #[error("failed to create file watcher: {source}")]
    Create {
        /// Backend error.
        #[source]
        source: Arc<notify::Error>,
    },
    /// The root could not be watched.
    #[error("failed to watch {root}: {source}")]
    Register {
        /// Root directory.
        root: Utf8PathBuf,
        /// Backend error.
        #[source]
        source: Arc<notify::Error>,
    },
}

/// Compiled glob patterns evaluated relative to a watch root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchPatterns {
    patterns: Vec<Pattern>,
}

impl WatchPatterns {
    /// Compiles the supplied patterns.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Pattern`] for the first pattern that does not
    /// compile.
    pub fn new<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Result<Self, WatchError> {
        let compiled = patterns
            .into_iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|source| WatchError::Pattern {
                    pattern: pattern.to_owned(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns: compiled })
    }

    /// The `tach` configuration files listed in [`CONFIG_FILE_PATTERNS`].
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Pattern`] if a built-in pattern fails to compile.
    pub fn config_files() -> Result<Self, WatchError> {
        Self::new(CONFIG_FILE_PATTERNS)
    }

    /// Returns `true` when `path`, taken relative to `root`, matches a pattern.
    #[must_use]
    pub fn matches(&self, root: &Utf8Path, path: &Utf8Path) -> bool {
        let relative = path.strip_prefix(root).unwrap_or(path);
        self.patterns
            .iter()
            .any(|pattern| pattern.matches_path(relative.as_std_path()))
    }
}

/// Returns `true` for events that should restart the server.
///
/// Only modifications count; creation and removal do not.
#[must_use]
pub const fn is_change_trigger(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Modify(_))
}

/// Picks the path an event should be reported with, if any.
///
/// At most one path is reported per event so a single save never fans out
/// into several callbacks.
#[must_use]
pub fn triggering_path(
    root: &Utf8Path,
    patterns: &WatchPatterns,
    event: &Event,
) -> Option<Utf8PathBuf> {
    if !is_change_trigger(&event.kind) {
        return None;
    }
    event
        .paths
        .iter()
        .filter_map(|path| Utf8Path::from_path(path))
        .find(|path| patterns.matches(root, path))
        .map(Utf8Path::to_path_buf)
}

/// Registers configuration watches on behalf of the supervisor.
pub trait WatchProvider: Send {
    /// Watches `root` recursively, invoking `on_change` for each matching
    /// modification until the returned handle is disposed.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError`] when the watch cannot be registered.
    fn watch(
        &self,
        root: &Utf8Path,
        patterns: WatchPatterns,
        on_change: ChangeCallback,
    ) -> Result<Box<dyn Disposable>, WatchError>;
}

/// [`WatchProvider`] backed by the platform's recommended `notify` watcher.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotifyWatchProvider;

impl WatchProvider for NotifyWatchProvider {
    fn watch(
        &self,
        root: &Utf8Path,
        patterns: WatchPatterns,
        on_change: ChangeCallback,
    ) -> Result<Box<dyn Disposable>, WatchError> {
        let watcher = ConfigWatcher::start(root, patterns, on_change)?;
        Ok(Box::new(watcher))
    }
}

/// A live recursive watch over one workspace root.
pub struct ConfigWatcher {
    root: Utf8PathBuf,
    active: Arc<AtomicBool>,
    watcher: Option<RecommendedWatcher>,
}

impl ConfigWatcher {
    /// Starts watching `root`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError`] if the backend cannot be created or the root
    /// cannot be registered.
    pub fn start(
        root: &Utf8Path,
        patterns: WatchPatterns,
        on_change: ChangeCallback,
    ) -> Result<Self, WatchError> {
        let active = Arc::new(AtomicBool::new(true));
        let handler_active = Arc::clone(&active);
        let handler_root = root.to_path_buf();

        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            if !handler_active.load(Ordering::SeqCst) {
                return;
            }
            match result {
                Ok(event) => {
                    if let Some(path) = triggering_path(&handler_root, &patterns, &event) {
                        debug!(target: WATCHER_TARGET, %path, "configuration file modified");
                        on_change(&path);
                    }
                }
                Err(error) => {
                    warn!(target: WATCHER_TARGET, root = %handler_root, %error, "watch error");
                }
            }
        })
        .map_err(|source| WatchError::Create {
            source: Arc::new(source),
        })?;

        watcher
            .watch(root.as_std_path(), RecursiveMode::Recursive)
            .map_err(|source| WatchError::Register {
                root: root.to_path_buf(),
                source: Arc::new(source),
            })?;

        debug!(target: WATCHER_TARGET, %root, "watching configuration files");
        Ok(Self {
            root: root.to_path_buf(),
            active,
            watcher: Some(watcher),
        })
    }

    /// Root being watched.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns `true` until the watcher is disposed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Disposable for ConfigWatcher {
    fn dispose(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(mut watcher) = self.watcher.take() {
            if let Err(error) = watcher.unwatch(self.root.as_std_path()) {
                debug!(target: WATCHER_TARGET, root = %self.root, %error, "unwatch failed");
            }
            debug!(target: WATCHER_TARGET, root = %self.root, "configuration watcher disposed");
        }
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for ConfigWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigWatcher")
            .field("root", &self.root)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}
