//! Status poller
//!
//! Each pass queries every tracked member concurrently (bounded). As each
//! answer arrives, any live game runs through the dedup cache and a
//! [`LiveGameEvent`] is queued for the dispatcher when it has not been
//! announced within the horizon.

use super::dedup::NotificationDedup;
use super::membership::RosterSnapshot;
use super::ActivitySource;
use crate::models::{LiveGameEvent, Member, MemberActivity};
use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_POLL_CONCURRENCY: usize = 8;

pub struct StatusPoller {
    source: Arc<dyn ActivitySource>,
    dedup: Arc<NotificationDedup>,
    roster: watch::Receiver<RosterSnapshot>,
    events: mpsc::Sender<LiveGameEvent>,
    interval: Duration,
    concurrency: usize,
}

impl StatusPoller {
    pub fn new(
        source: Arc<dyn ActivitySource>,
        dedup: Arc<NotificationDedup>,
        roster: watch::Receiver<RosterSnapshot>,
        events: mpsc::Sender<LiveGameEvent>,
        interval: Duration,
        concurrency: usize,
    ) -> Self {
        Self {
            source,
            dedup,
            roster,
            events,
            interval,
            concurrency: concurrency.max(1),
        }
    }

    /// One pass over the current roster. Returns how many events were queued.
    pub async fn poll_once(&mut self) -> usize {
        let members = self.roster.borrow_and_update().clone();
        if members.is_empty() {
            debug!("Roster empty, nothing to poll");
            return 0;
        }

        // Results are handled in completion order, so a slow member never
        // holds back an event for one that already answered.
        let mut results = stream::iter(members.iter().cloned())
            .map(|member| self.query(member))
            .buffer_unordered(self.concurrency);

        let mut queued = 0;
        while let Some(activity) = results.next().await {
            let Some(MemberActivity {
                member_id,
                game_id: Some(game_id),
            }) = activity
            else {
                continue;
            };

            let now = Utc::now();
            if !self.dedup.should_notify(&game_id, now) {
                continue;
            }

            let event = LiveGameEvent {
                game_id,
                member_id,
                discovered_at: now,
            };
            info!("Live game: {} playing {}", event.member_id, event.game_id);

            if let Err(e) = self.events.send(event).await {
                warn!("Dispatcher queue closed, dropping event for game {}", e.0.game_id);
                break;
            }
            queued += 1;
        }
        queued
    }

    /// Query one member; failures count as "not live this pass".
    async fn query(&self, member: Member) -> Option<MemberActivity> {
        match self.source.query_activity(&member.id).await {
            Ok(activity) if activity.is_live() => Some(activity),
            Ok(_) => None,
            Err(e) => {
                warn!("Status query for {} failed: {}", member.id, e);
                None
            }
        }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Status poll loop started (interval: {}s, concurrency: {})",
            self.interval.as_secs(),
            self.concurrency
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let queued = self.poll_once().await;
                    if queued > 0 {
                        debug!("Poll pass queued {} events", queued);
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
        info!("Status poll loop stopped");
    }
}
