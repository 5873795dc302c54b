//! Watch provider whose events are fired by the test.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};

use super::lock;
use crate::disposable::Disposable;
use crate::watcher::{ChangeCallback, WatchError, WatchPatterns, WatchProvider};

struct Registration {
    root: Utf8PathBuf,
    patterns: WatchPatterns,
    on_change: ChangeCallback,
    active: Arc<AtomicBool>,
}

#[derive(Default)]
struct ProviderState {
    registrations: Vec<Registration>,
    fail: bool,
}

/// Records registrations and replays synthetic modifications.
#[derive(Clone, Default)]
pub struct FakeWatchProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl FakeWatchProvider {
    /// Creates a provider that accepts every registration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent registrations fail.
    pub fn fail(&self, fail: bool) {
        lock(&self.state).fail = fail;
    }

    /// Number of registrations ever made.
    #[must_use]
    pub fn registered(&self) -> usize {
        lock(&self.state).registrations.len()
    }

    /// Number of registrations not yet disposed.
    #[must_use]
    pub fn active_count(&self) -> usize {
        lock(&self.state)
            .registrations
            .iter()
            .filter(|registration| registration.active.load(Ordering::SeqCst))
            .count()
    }

    /// Root of registration `index`.
    #[must_use]
    pub fn root(&self, index: usize) -> Option<Utf8PathBuf> {
        lock(&self.state)
            .registrations
            .get(index)
            .map(|registration| registration.root.clone())
    }

    /// Reports a modification of `path` to registration `index`.
    ///
    /// Returns `true` when the callback ran; disposed registrations and
    /// non-matching paths are dropped, as the real watcher does.
    pub fn fire(&self, index: usize, path: &str) -> bool {
        let state = lock(&self.state);
        let Some(registration) = state.registrations.get(index) else {
            return false;
        };
        let changed = Utf8Path::new(path);
        if !registration.active.load(Ordering::SeqCst)
            || !registration.patterns.matches(&registration.root, changed)
        {
            return false;
        }
        (registration.on_change)(changed);
        true
    }

    /// Reports a modification to the most recent registration.
    pub fn fire_latest(&self, path: &str) -> bool {
        let latest = self.registered().checked_sub(1);
        latest.is_some_and(|index| self.fire(index, path))
    }
}

impl WatchProvider for FakeWatchProvider {
    fn watch(
        &self,
        root: &Utf8Path,
        patterns: WatchPatterns,
        on_change: ChangeCallback,
    ) -> Result<Box<dyn Disposable>, WatchError> {
        let mut state = lock(&self.state);
        if state.fail {
            return Err(WatchError::Create {
                source: Arc::new(notify::Error::generic("scripted watch failure")),
            });
        }
        let active = Arc::new(AtomicBool::new(true));
        state.registrations.push(Registration {
            root: root.to_path_buf(),
            patterns,
            on_change,
            active: Arc::clone(&active),
        });
        Ok(Box::new(FakeWatch { active }))
    }
}

struct FakeWatch {
    active: Arc<AtomicBool>,
}

impl Disposable for FakeWatch {
    fn dispose(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}
