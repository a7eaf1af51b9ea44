//! Notification dedup cache
//!
//! Maps a game identifier to the time it was last announced. The
//! check-and-record in [`NotificationDedup::should_notify`] runs under a single
//! lock, so concurrent poll passes that discover the same game produce exactly
//! one notification. Entries older than the horizon are treated as absent and
//! a periodic sweep removes them to keep memory bounded.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// Longer than any realistic single game (correspondence aside).
pub const DEFAULT_HORIZON_SECS: i64 = 6 * 60 * 60;

pub struct NotificationDedup {
    /// game_id -> last notified
    entries: Mutex<FxHashMap<String, DateTime<Utc>>>,
    horizon: Duration,
}

impl NotificationDedup {
    pub fn new(horizon: Duration) -> Self {
        Self {
            entries: Mutex::new(FxHashMap::default()),
            horizon,
        }
    }

    pub fn horizon(&self) -> Duration {
        self.horizon
    }

    /// Returns true and records `now` for `game_id` if it has no live entry.
    ///
    /// An entry is live while its age is within the horizon. A live entry is
    /// left untouched and the call returns false.
    pub fn should_notify(&self, game_id: &str, now: DateTime<Utc>) -> bool {
        let mut entries = self.entries.lock();

        if let Some(notified_at) = entries.get(game_id) {
            if now - *notified_at <= self.horizon {
                debug!(
                    game_id,
                    age_secs = (now - *notified_at).num_seconds(),
                    "already notified"
                );
                return false;
            }
            // Expired, re-arm below
        }

        entries.insert(game_id.to_string(), now);
        true
    }

    /// Whether `game_id` has a live entry at `now`, without recording.
    pub fn contains(&self, game_id: &str, now: DateTime<Utc>) -> bool {
        self.entries
            .lock()
            .get(game_id)
            .is_some_and(|t| now - *t <= self.horizon)
    }

    /// Drop the entry for `game_id` so the next sighting notifies again.
    /// Used when an announcement could not be dispatched after all.
    pub fn forget(&self, game_id: &str) -> bool {
        self.entries.lock().remove(game_id).is_some()
    }

    /// Remove every entry older than the horizon. Returns how many were dropped.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.horizon;
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, notified_at| *notified_at >= cutoff);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, remaining = entries.len(), "dedup sweep");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for NotificationDedup {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_HORIZON_SECS))
    }
}

/// Periodically sweep expired entries until `shutdown` flips to true.
pub fn start_sweep_task(
    dedup: Arc<NotificationDedup>,
    every: std::time::Duration,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!("Dedup sweep started (interval: {}s)", every.as_secs());
        let mut interval = tokio::time::interval(every);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    dedup.sweep(Utc::now());
                }
                _ = shutdown.changed() => break,
            }
        }
        info!("Dedup sweep stopped");
    })
}
