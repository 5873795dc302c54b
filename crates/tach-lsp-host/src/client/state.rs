//! Session lifecycle state and its observers.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::disposable::Disposable;

/// Lifecycle of one language-server session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// No process is running.
    #[default]
    Stopped,
    /// The process is spawned and the handshake is in flight.
    Starting,
    /// The handshake completed.
    Running,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stopped => "Stopped",
            Self::Starting => "Starting",
            Self::Running => "Running",
        })
    }
}

/// A transition between two distinct states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    /// State before the transition.
    pub old_state: SessionState,
    /// State after the transition.
    pub new_state: SessionState,
}

/// Callback notified of state transitions.
pub type StateObserver = Box<dyn Fn(StateChange) + Send + Sync>;

#[derive(Default)]
struct TrackerInner {
    state: SessionState,
    next_id: u64,
    observers: Vec<(u64, StateObserver)>,
}

/// Shared state cell that notifies observers on every transition.
///
/// Observers run synchronously, in transition order, while the tracker is
/// locked; they must not call back into the tracker.
#[derive(Clone, Default)]
pub struct StateTracker {
    inner: Arc<Mutex<TrackerInner>>,
}

impl StateTracker {
    /// Creates a tracker in [`SessionState::Stopped`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Moves to `new_state`, notifying observers when it differs from the
    /// current state. Returns `true` when a transition happened.
    pub fn transition(&self, new_state: SessionState) -> bool {
        let inner = self.lock();
        let current = inner.state;
        Self::apply(inner, current, new_state)
    }

    /// Moves to `new_state` only while the tracker is in `expected`.
    pub fn transition_from(&self, expected: SessionState, new_state: SessionState) -> bool {
        let inner = self.lock();
        if inner.state != expected {
            return false;
        }
        Self::apply(inner, expected, new_state)
    }

    fn apply(
        mut inner: MutexGuard<'_, TrackerInner>,
        old_state: SessionState,
        new_state: SessionState,
    ) -> bool {
        if old_state == new_state {
            return false;
        }
        inner.state = new_state;
        let change = StateChange {
            old_state,
            new_state,
        };
        for (_, observer) in &inner.observers {
            observer(change);
        }
        true
    }

    /// Registers an observer until the returned subscription is disposed.
    #[must_use = "dropping the subscription unregisters the observer"]
    pub fn subscribe(&self, observer: StateObserver) -> Subscription {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.observers.push((id, observer));
        Subscription {
            id,
            tracker: Some(Arc::downgrade(&self.inner)),
        }
    }

    /// Number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.lock().observers.len()
    }

    fn lock(&self) -> MutexGuard<'_, TrackerInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

impl fmt::Debug for StateTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("StateTracker")
            .field("state", &inner.state)
            .field("observers", &inner.observers.len())
            .finish()
    }
}

/// Registration of a [`StateObserver`]; disposing it removes the observer.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    tracker: Option<Weak<Mutex<TrackerInner>>>,
}

impl Disposable for Subscription {
    fn dispose(&mut self) {
        let Some(inner) = self.tracker.take().and_then(|weak| weak.upgrade()) else {
            return;
        };
        let mut guard = inner.lock().unwrap_or_else(|poison| poison.into_inner());
        guard.observers.retain(|(id, _)| *id != self.id);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}
