//! Roster synchronizer
//!
//! Re-fetches the team roster on a fixed interval and merges it into the
//! membership store. Failures keep the previous roster and are retried on the
//! next tick.

use super::membership::MembershipStore;
use super::RosterSource;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub struct RosterSynchronizer {
    source: Arc<dyn RosterSource>,
    store: Arc<MembershipStore>,
    interval: Duration,
}

impl RosterSynchronizer {
    pub fn new(source: Arc<dyn RosterSource>, store: Arc<MembershipStore>, interval: Duration) -> Self {
        Self {
            source,
            store,
            interval,
        }
    }

    /// One fetch-and-merge cycle. Returns how many members were added.
    pub async fn sync_once(&self) -> usize {
        let ids = match self.source.fetch_team_members().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Roster fetch failed, keeping {} tracked members: {}", self.store.len(), e);
                return 0;
            }
        };

        if ids.is_empty() {
            warn!("Roster fetch returned no members, skipping this cycle");
            return 0;
        }

        let added = self.store.add_members(&ids, Utc::now());
        if added > 0 {
            info!(
                "Roster sync: {} fetched, {} new, {} tracked",
                ids.len(),
                added,
                self.store.len()
            );
        }
        added
    }

    /// Sync immediately, then every `interval` until `shutdown` flips.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("Roster sync loop started (interval: {}s)", self.interval.as_secs());
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sync_once().await;
                }
                _ = shutdown.changed() => break,
            }
        }
        info!("Roster sync loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RelayError, RelayResult};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    struct ScriptedRoster {
        replies: Mutex<VecDeque<RelayResult<Vec<String>>>>,
    }

    impl ScriptedRoster {
        fn new(replies: Vec<RelayResult<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
            })
        }
    }

    #[async_trait]
    impl RosterSource for ScriptedRoster {
        async fn fetch_team_members(&self) -> RelayResult<Vec<String>> {
            self.replies.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_roster() {
        let source = ScriptedRoster::new(vec![
            Ok(names(&["alice", "bob"])),
            Err(RelayError::UpstreamStatus { service: "lichess", status: 503 }),
            Ok(Vec::new()),
            Ok(names(&["bob", "carol"])),
        ]);
        let store = Arc::new(MembershipStore::new());
        let sync = RosterSynchronizer::new(source, store.clone(), Duration::from_secs(60));

        assert_eq!(sync.sync_once().await, 2);
        assert_eq!(sync.sync_once().await, 0);
        assert_eq!(store.len(), 2);
        assert_eq!(sync.sync_once().await, 0);
        assert_eq!(store.len(), 2);
        assert_eq!(sync.sync_once().await, 1);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_run_syncs_immediately_and_stops() {
        let source = ScriptedRoster::new(vec![Ok(names(&["alice"]))]);
        let store = Arc::new(MembershipStore::new());
        let mut rx = store.subscribe();
        let (stop_tx, stop_rx) = watch::channel(false);

        let task = tokio::spawn(
            RosterSynchronizer::new(source, store.clone(), Duration::from_secs(3600)).run(stop_rx),
        );

        tokio::time::timeout(Duration::from_secs(1), rx.changed())
            .await
            .expect("first sync should run at start-up")
            .unwrap();
        assert_eq!(store.len(), 1);

        stop_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("loop should stop")
            .unwrap();
    }
}
