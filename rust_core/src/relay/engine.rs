//! Relay engine wiring: builds the shared state, spawns the roster, poll,
//! dispatch and dedup-sweep tasks and hands back a [`RelayHandle`].

use super::dedup::{self, NotificationDedup};
use super::dispatcher::{Dispatcher, DEFAULT_MAINTENANCE_MESSAGE};
use super::maintenance::MaintenanceTrigger;
use super::membership::MembershipStore;
use super::poller::{StatusPoller, DEFAULT_POLL_CONCURRENCY, DEFAULT_POLL_INTERVAL};
use super::roster::{RosterSynchronizer, DEFAULT_SYNC_INTERVAL};
use super::{ActivitySource, ChatTransport, RosterSource, SubscriberDirectory};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info};

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub roster_sync_interval: Duration,
    pub status_poll_interval: Duration,
    pub poll_concurrency: usize,
    pub dedup_horizon: Duration,
    pub dedup_sweep_interval: Duration,
    pub event_queue_capacity: usize,
    pub maintenance_message: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            roster_sync_interval: DEFAULT_SYNC_INTERVAL,
            status_poll_interval: DEFAULT_POLL_INTERVAL,
            poll_concurrency: DEFAULT_POLL_CONCURRENCY,
            dedup_horizon: Duration::from_secs(dedup::DEFAULT_HORIZON_SECS as u64),
            dedup_sweep_interval: Duration::from_secs(600),
            event_queue_capacity: 256,
            maintenance_message: DEFAULT_MAINTENANCE_MESSAGE.to_string(),
        }
    }
}

/// External collaborators the engine talks to.
pub struct RelayEngine {
    pub roster: Arc<dyn RosterSource>,
    pub activity: Arc<dyn ActivitySource>,
    pub directory: Arc<dyn SubscriberDirectory>,
    pub transport: Arc<dyn ChatTransport>,
}

impl RelayEngine {
    pub fn start(self, config: RelayConfig) -> RelayHandle {
        let horizon = chrono::Duration::from_std(config.dedup_horizon)
            .unwrap_or_else(|_| chrono::Duration::seconds(dedup::DEFAULT_HORIZON_SECS));
        let dedup = Arc::new(NotificationDedup::new(horizon));
        let members = Arc::new(MembershipStore::new());
        let maintenance = Arc::new(MaintenanceTrigger::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (event_tx, event_rx) = mpsc::channel(config.event_queue_capacity.max(1));

        info!(
            "Starting relay engine: roster every {}s, poll every {}s, dedup horizon {}s",
            config.roster_sync_interval.as_secs(),
            config.status_poll_interval.as_secs(),
            config.dedup_horizon.as_secs()
        );

        let mut tasks = Vec::new();

        let sync = RosterSynchronizer::new(self.roster, members.clone(), config.roster_sync_interval);
        tasks.push(("roster_sync", tokio::spawn(sync.run(shutdown_rx.clone()))));

        let poller = StatusPoller::new(
            self.activity.clone(),
            dedup.clone(),
            members.subscribe(),
            event_tx,
            config.status_poll_interval,
            config.poll_concurrency,
        );
        tasks.push(("status_poll", tokio::spawn(poller.run(shutdown_rx.clone()))));

        let dispatcher = Dispatcher::new(
            self.directory,
            self.transport,
            self.activity,
            dedup.clone(),
            maintenance.clone(),
            config.maintenance_message,
        );
        tasks.push(("dispatcher", tokio::spawn(dispatcher.run(event_rx, shutdown_rx.clone()))));

        tasks.push((
            "dedup_sweep",
            dedup::start_sweep_task(dedup.clone(), config.dedup_sweep_interval, shutdown_rx),
        ));

        RelayHandle {
            dedup,
            members,
            maintenance,
            shutdown: shutdown_tx,
            tasks,
        }
    }
}

pub struct RelayHandle {
    dedup: Arc<NotificationDedup>,
    members: Arc<MembershipStore>,
    maintenance: Arc<MaintenanceTrigger>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl RelayHandle {
    pub fn maintenance(&self) -> Arc<MaintenanceTrigger> {
        self.maintenance.clone()
    }

    pub fn dedup(&self) -> Arc<NotificationDedup> {
        self.dedup.clone()
    }

    pub fn members(&self) -> Arc<MembershipStore> {
        self.members.clone()
    }

    pub fn dedup_len(&self) -> usize {
        self.dedup.len()
    }

    pub fn roster_len(&self) -> usize {
        self.members.len()
    }

    /// Stop every task. The dispatcher delivers what is already queued first.
    pub async fn shutdown(self) {
        info!("Shutting down relay engine");
        self.shutdown.send_replace(true);
        for (name, task) in self.tasks {
            if let Err(e) = task.await {
                error!("Relay task {} ended abnormally: {}", name, e);
            }
        }
        info!("Relay engine stopped");
    }
}
