// Shared models for the relay engine and services
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chat-platform identity of a subscriber (Telegram user id).
pub type SubscriberId = i64;

// ============================================================================
// Roster
// ============================================================================

/// A team member tracked for live-game polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Platform-assigned identifier (lowercase lichess username)
    pub id: String,
    /// When the roster synchronizer first saw this member
    pub tracked_since: DateTime<Utc>,
}

impl Member {
    pub fn new(id: impl Into<String>, tracked_since: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            tracked_since,
        }
    }
}

// ============================================================================
// Activity & Events
// ============================================================================

/// Result of a live-status query for a single member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberActivity {
    pub member_id: String,
    /// Identifier of the game the member is currently playing, if any
    pub game_id: Option<String>,
}

impl MemberActivity {
    pub fn idle(member_id: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
            game_id: None,
        }
    }

    pub fn playing(member_id: impl Into<String>, game_id: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
            game_id: Some(game_id.into()),
        }
    }

    pub fn is_live(&self) -> bool {
        self.game_id.as_deref().is_some_and(|g| !g.is_empty())
    }
}

/// A newly discovered live game, passed from the status poller to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveGameEvent {
    pub game_id: String,
    pub member_id: String,
    pub discovered_at: DateTime<Utc>,
}

// ============================================================================
// Delivery
// ============================================================================

/// What a single dispatch cycle delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastKind {
    LiveGame,
    Maintenance,
}

impl BroadcastKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BroadcastKind::LiveGame => "live_game",
            BroadcastKind::Maintenance => "maintenance",
        }
    }
}

/// Per-batch fan-out counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryStats {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

impl fmt::Display for DeliveryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attempted={} delivered={} failed={}",
            self.attempted, self.delivered, self.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_is_live() {
        assert!(MemberActivity::playing("alice", "g1").is_live());
        assert!(!MemberActivity::idle("alice").is_live());
        assert!(!MemberActivity::playing("alice", "").is_live());
    }

    #[test]
    fn test_broadcast_kind_serde() {
        let json = serde_json::to_string(&BroadcastKind::LiveGame).unwrap();
        assert_eq!(json, "\"live_game\"");
        assert_eq!(BroadcastKind::Maintenance.as_str(), "maintenance");
    }
}
