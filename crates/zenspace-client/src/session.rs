//! Session lifecycle and the bootstrap-complete signal.
//!
//! ```text
//! Unauthenticated ──bootstrap(id)──▶ Bootstrapping ──ok──▶ Authenticated
//!        ▲                                 │
//!        └────────── identity failed ──────┘
//! ```

use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Bootstrapping,
    Authenticated,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated)
    }
}

/// Raised exactly once, when the current user is known to be either
/// resolved or absent.
#[derive(Debug)]
pub struct BootstrapSignal {
    tx: watch::Sender<bool>,
}

impl Default for BootstrapSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl BootstrapSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Returns true only for the call that actually raised it.
    pub fn raise(&self) -> bool {
        let raised = self.tx.send_if_modified(|done| {
            if *done {
                false
            } else {
                *done = true;
                true
            }
        });
        if raised {
            debug!("Bootstrap complete");
        }
        raised
    }

    pub fn is_raised(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Wait until `rx` reports bootstrap complete. Returns immediately if it
/// already has.
pub async fn wait_for_bootstrap(rx: &mut watch::Receiver<bool>) {
    // Err only if the store was dropped, in which case there is nothing to wait for.
    let _ = rx.wait_for(|done| *done).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_raised_once() {
        let signal = BootstrapSignal::new();
        let mut rx = signal.subscribe();
        assert!(!signal.is_raised());
        assert!(signal.raise());
        assert!(!signal.raise());
        wait_for_bootstrap(&mut rx).await;
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_raised() {
        let signal = BootstrapSignal::new();
        signal.raise();
        let mut rx = signal.subscribe();
        wait_for_bootstrap(&mut rx).await;
        assert!(signal.is_raised());
    }
}
