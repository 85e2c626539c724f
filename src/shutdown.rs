//! Cooperative shutdown signaling.
//!
//! Termination signals never touch the bridge directly; they only trip a
//! shared flag that the streaming loop checks at its cycle boundaries.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared shutdown flag.
///
/// Clones observe the same underlying flag. The signal path only ever writes
/// `true`; the bridge only ever reads.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    inner: Arc<AtomicBool>,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Idempotent and callable from any task.
    pub fn signal(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }

    /// Non-blocking read of the flag.
    pub fn is_set(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }
}

/// Spawn a task that trips the flag on SIGINT or SIGTERM.
pub fn listen_for_signals(flag: ShutdownFlag) {
    tokio::spawn(async move {
        let signame = wait_for_signal().await;
        tracing::warn!("Received {}", signame);
        flag.signal();
    });
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => "SIGINT",
                _ = sigterm.recv() => "SIGTERM",
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to register SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            "SIGINT"
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "ctrl-c"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_starts_clear() {
        let flag = ShutdownFlag::new();
        assert!(!flag.is_set());
    }

    #[test]
    fn test_signal_is_idempotent() {
        let flag = ShutdownFlag::new();

        flag.signal();
        assert!(flag.is_set());

        flag.signal();
        flag.signal();
        assert!(flag.is_set());
    }

    #[test]
    fn test_clones_share_the_flag() {
        let flag = ShutdownFlag::new();
        let observer = flag.clone();

        flag.signal();
        assert!(observer.is_set());
    }
}
