//! Termination of language-server child processes.

use std::process::Child;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use super::CLIENT_TARGET;

/// Time a server gets to exit on its own after `exit` before it is killed.
pub(super) const EXIT_GRACE_PERIOD: Duration = Duration::from_millis(200);

/// Waits briefly for `child` to exit, then kills it.
pub(super) fn terminate_child(child: &mut Child, server: &str) {
    match child.try_wait() {
        Ok(Some(status)) => {
            debug!(target: CLIENT_TARGET, server, ?status, "language server exited");
            return;
        }
        Ok(None) => {
            debug!(
                target: CLIENT_TARGET,
                server,
                "language server still running, waiting before killing"
            );
        }
        Err(error) => {
            warn!(
                target: CLIENT_TARGET,
                server,
                %error,
                "failed to check process status, waiting before killing"
            );
        }
    }

    thread::sleep(EXIT_GRACE_PERIOD);
    match child.try_wait() {
        Ok(Some(status)) => {
            debug!(
                target: CLIENT_TARGET,
                server,
                ?status,
                "language server exited during grace period"
            );
        }
        Ok(None) | Err(_) => kill_child(child, server),
    }
}

/// Kills `child` and reaps it.
pub(super) fn kill_child(child: &mut Child, server: &str) {
    if let Err(error) = child.kill() {
        warn!(target: CLIENT_TARGET, server, %error, "failed to kill language server");
        return;
    }
    match child.wait() {
        Ok(status) => debug!(target: CLIENT_TARGET, server, ?status, "language server killed"),
        Err(error) => warn!(target: CLIENT_TARGET, server, %error, "failed to reap language server"),
    }
}
