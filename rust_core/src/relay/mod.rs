//! Live-game relay engine.
//!
//! Two periodic tasks (roster sync, status polling) feed a dispatcher task
//! through a bounded queue:
//!
//! ```text
//! RosterSynchronizer -> MembershipStore -> StatusPoller -> NotificationDedup -> Dispatcher -> ChatTransport
//! ```
//!
//! The upstream platform, the subscriber store and the chat transport are
//! reached through the traits below so the engine can run against fakes.

pub mod dedup;
pub mod dispatcher;
pub mod engine;
pub mod maintenance;
pub mod membership;
pub mod poller;
pub mod roster;

use crate::error::RelayResult;
use crate::models::{MemberActivity, SubscriberId};
use async_trait::async_trait;

pub use dedup::NotificationDedup;
pub use dispatcher::{DispatchItem, Dispatcher};
pub use engine::{RelayConfig, RelayEngine, RelayHandle};
pub use maintenance::MaintenanceTrigger;
pub use membership::MembershipStore;
pub use poller::StatusPoller;
pub use roster::RosterSynchronizer;

/// Source of the team roster.
#[async_trait]
pub trait RosterSource: Send + Sync {
    /// Current member identifiers. An empty list means "no update this cycle".
    async fn fetch_team_members(&self) -> RelayResult<Vec<String>>;
}

/// Per-member live-status lookup.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    async fn query_activity(&self, member_id: &str) -> RelayResult<MemberActivity>;

    /// Link sent to subscribers for a game id.
    fn game_link(&self, game_id: &str) -> String;
}

/// Request/response view of the subscriber store.
#[async_trait]
pub trait SubscriberDirectory: Send + Sync {
    async fn list_active(&self) -> RelayResult<Vec<SubscriberId>>;
    async fn activate(&self, id: SubscriberId) -> RelayResult<()>;
    async fn deactivate(&self, id: SubscriberId) -> RelayResult<()>;
    async fn count_active(&self) -> RelayResult<i64>;
}

/// Outbound chat messages.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, to: SubscriberId, text: &str) -> RelayResult<()>;
}
