//! Dispatcher
//!
//! Fans each [`LiveGameEvent`] out to every active subscriber. The subscriber
//! list is fetched fresh for each batch and one failed send never stops the
//! rest of the batch. If the list cannot be fetched the game's dedup entry is
//! released, so the next poll pass announces it again.
//!
//! Maintenance takes priority: when the trigger is consumed the maintenance
//! message goes out in place of the next batch and every event already queued
//! at that moment is dropped (not requeued).

use super::dedup::NotificationDedup;
use super::maintenance::MaintenanceTrigger;
use super::{ActivitySource, ChatTransport, SubscriberDirectory};
use crate::models::{BroadcastKind, DeliveryStats, LiveGameEvent};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

pub const DEFAULT_MAINTENANCE_MESSAGE: &str =
    "We are having Bot maintenance. Service will resume shortly";

/// What the dispatcher decided to do with one unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchItem {
    Delivered {
        kind: BroadcastKind,
        stats: DeliveryStats,
    },
    /// Subscriber list could not be fetched; batch skipped
    Skipped { kind: BroadcastKind },
    /// Dropped because a maintenance broadcast preempted it
    Dropped { game_id: String },
}

pub struct Dispatcher {
    directory: Arc<dyn SubscriberDirectory>,
    transport: Arc<dyn ChatTransport>,
    links: Arc<dyn ActivitySource>,
    dedup: Arc<NotificationDedup>,
    maintenance: Arc<MaintenanceTrigger>,
    maintenance_message: String,
}

impl Dispatcher {
    pub fn new(
        directory: Arc<dyn SubscriberDirectory>,
        transport: Arc<dyn ChatTransport>,
        links: Arc<dyn ActivitySource>,
        dedup: Arc<NotificationDedup>,
        maintenance: Arc<MaintenanceTrigger>,
        maintenance_message: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            transport,
            links,
            dedup,
            maintenance,
            maintenance_message: maintenance_message.into(),
        }
    }

    pub fn format_event(&self, event: &LiveGameEvent) -> String {
        format!(
            "{} is playing: {}",
            event.member_id,
            self.links.game_link(&event.game_id)
        )
    }

    /// Send `text` to every active subscriber.
    pub async fn broadcast(&self, kind: BroadcastKind, text: &str) -> DispatchItem {
        let subscribers = match self.directory.list_active().await {
            Ok(s) => s,
            Err(e) => {
                warn!("Skipping {} broadcast, subscriber fetch failed: {}", kind.as_str(), e);
                return DispatchItem::Skipped { kind };
            }
        };

        let mut stats = DeliveryStats {
            attempted: subscribers.len(),
            ..Default::default()
        };

        for subscriber in subscribers {
            match self.transport.send(subscriber, text).await {
                Ok(()) => stats.delivered += 1,
                Err(e) => {
                    stats.failed += 1;
                    warn!("Send to subscriber {} failed: {}", subscriber, e);
                }
            }
        }

        info!("{} broadcast: {}", kind.as_str(), stats);
        DispatchItem::Delivered { kind, stats }
    }

    /// Deliver one event, or the maintenance message if the trigger is armed.
    pub async fn handle_event(
        &self,
        event: LiveGameEvent,
        queue: &mut mpsc::Receiver<LiveGameEvent>,
    ) -> Vec<DispatchItem> {
        // The wake-up permit left by the trigger stays stored; the next
        // `armed()` wake finds the flag already consumed and does nothing.
        if self.maintenance.consume() {
            let mut items = vec![self.maintenance_broadcast().await];
            items.push(drop_event(event));
            items.extend(drain_queued(queue));
            return items;
        }

        let text = self.format_event(&event);
        let item = self.broadcast(BroadcastKind::LiveGame, &text).await;
        if let DispatchItem::Skipped { .. } = item {
            self.dedup.forget(&event.game_id);
            info!(
                "Released game {} for re-announcement on the next poll pass",
                event.game_id
            );
        }
        vec![item]
    }

    /// Handle a trigger wake-up. Does nothing if the flag was already consumed.
    pub async fn handle_maintenance(
        &self,
        queue: &mut mpsc::Receiver<LiveGameEvent>,
    ) -> Vec<DispatchItem> {
        if !self.maintenance.consume() {
            return Vec::new();
        }
        let mut items = vec![self.maintenance_broadcast().await];
        items.extend(drain_queued(queue));
        items
    }

    async fn maintenance_broadcast(&self) -> DispatchItem {
        info!("Sending maintenance broadcast");
        self.broadcast(BroadcastKind::Maintenance, &self.maintenance_message)
            .await
    }

    /// Consume events until the queue closes or `shutdown` flips; on shutdown
    /// the events already queued are still delivered.
    pub async fn run(
        self,
        mut queue: mpsc::Receiver<LiveGameEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("Dispatcher started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = self.maintenance.armed() => {
                    self.handle_maintenance(&mut queue).await;
                }
                next = queue.recv() => match next {
                    Some(event) => {
                        self.handle_event(event, &mut queue).await;
                    }
                    None => {
                        error!("Dispatcher queue closed unexpectedly");
                        return;
                    }
                },
            }
        }

        queue.close();
        let mut drained = 0;
        while let Some(event) = queue.recv().await {
            self.handle_event(event, &mut queue).await;
            drained += 1;
        }
        info!("Dispatcher stopped ({} queued events drained)", drained);
    }
}

fn drop_event(event: LiveGameEvent) -> DispatchItem {
    warn!(
        "Dropping live game {} ({}) preempted by maintenance",
        event.game_id, event.member_id
    );
    DispatchItem::Dropped {
        game_id: event.game_id,
    }
}

fn drain_queued(queue: &mut mpsc::Receiver<LiveGameEvent>) -> Vec<DispatchItem> {
    let mut dropped = Vec::new();
    while let Ok(event) = queue.try_recv() {
        dropped.push(drop_event(event));
    }
    dropped
}
