//! Restart requests raised by configuration watchers.

use std::sync::mpsc::Sender;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use super::SUPERVISOR_TARGET;
use crate::watcher::ChangeCallback;

/// A configuration change reported by the watcher of one generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartTrigger {
    /// Generation of the watcher that saw the change.
    pub generation: u64,
    /// Modified file.
    pub path: Utf8PathBuf,
}

/// Builds a watcher callback that enqueues triggers tagged with `generation`.
pub(super) fn enqueue_on_change(tx: Sender<RestartTrigger>, generation: u64) -> ChangeCallback {
    Box::new(move |path: &Utf8Path| {
        let trigger = RestartTrigger {
            generation,
            path: path.to_path_buf(),
        };
        if tx.send(trigger).is_err() {
            debug!(
                target: SUPERVISOR_TARGET,
                generation,
                %path,
                "supervisor gone; dropping restart trigger"
            );
        }
    })
}
