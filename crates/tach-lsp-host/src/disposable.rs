//! Explicitly released resources tied to a session's lifetime.

use std::fmt;

/// A handle that must be released when its session ends.
///
/// `dispose` is idempotent; implementations also release on drop.
pub trait Disposable: Send {
    /// Releases the resource.
    fn dispose(&mut self);
}

/// Ordered collection of disposables owned by the supervisor.
#[derive(Default)]
pub struct DisposableSet {
    items: Vec<Box<dyn Disposable>>,
}

impl DisposableSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks a disposable until the next [`Self::dispose_all`].
    pub fn push(&mut self, item: Box<dyn Disposable>) {
        self.items.push(item);
    }

    /// Number of tracked disposables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` when nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Disposes every tracked item in insertion order and clears the set.
    pub fn dispose_all(&mut self) {
        for mut item in self.items.drain(..) {
            item.dispose();
        }
    }
}

impl Drop for DisposableSet {
    fn drop(&mut self) {
        self.dispose_all();
    }
}

impl fmt::Debug for DisposableSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposableSet")
            .field("len", &self.items.len())
            .finish()
    }
}
