//! Maintenance broadcast trigger
//!
//! A one-shot flag set by the privileged `/sm` command and consumed by the
//! dispatcher. Setting it several times before it is consumed still yields a
//! single broadcast.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tracing::info;

#[derive(Debug, Default)]
pub struct MaintenanceTrigger {
    pending: AtomicBool,
    wake: Notify,
}

impl MaintenanceTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the trigger. Returns false if it was already armed.
    pub fn trigger(&self) -> bool {
        let was_pending = self.pending.swap(true, Ordering::SeqCst);
        if !was_pending {
            info!("Maintenance broadcast armed");
            self.wake.notify_one();
        }
        !was_pending
    }

    /// Read-and-reset. Exactly one caller observes `true` per activation.
    pub fn consume(&self) -> bool {
        self.pending.swap(false, Ordering::SeqCst)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    /// Resolves after the next [`trigger`](Self::trigger). A trigger that
    /// happened while nobody was waiting is remembered.
    pub async fn armed(&self) {
        self.wake.notified().await;
    }
}
