//! Membership store
//!
//! Append-only roster of tracked members. The current roster lives in a
//! `watch` channel as an immutable `Arc<Vec<Member>>`: merges build a new
//! vector and swap it in, so a snapshot held by the poller is never mutated
//! underneath it. Receivers obtained from [`MembershipStore::subscribe`] act
//! as the handoff queue to the status poller.

use crate::models::Member;
use chrono::{DateTime, Utc};
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tokio::sync::watch;

pub type RosterSnapshot = Arc<Vec<Member>>;

#[derive(Debug)]
pub struct MembershipStore {
    roster: watch::Sender<RosterSnapshot>,
}

impl MembershipStore {
    pub fn new() -> Self {
        let (roster, _) = watch::channel(Arc::new(Vec::new()));
        Self { roster }
    }

    /// Merge `ids` into the roster, ignoring ones already tracked and blanks.
    /// Returns how many members were added.
    pub fn add_members(&self, ids: &[String], now: DateTime<Utc>) -> usize {
        let mut added = 0;
        self.roster.send_if_modified(|current| {
            let mut known: FxHashSet<&str> = current.iter().map(|m| m.id.as_str()).collect();
            let fresh: Vec<Member> = ids
                .iter()
                .map(|id| id.trim())
                .filter(|id| !id.is_empty() && known.insert(*id))
                .map(|id| Member::new(id, now))
                .collect();

            if fresh.is_empty() {
                return false;
            }
            added = fresh.len();

            let mut next = Vec::with_capacity(current.len() + fresh.len());
            next.extend(current.iter().cloned());
            next.extend(fresh);
            *current = Arc::new(next);
            true
        });
        added
    }

    /// The roster as of now. Later merges do not affect the returned value.
    pub fn snapshot(&self) -> RosterSnapshot {
        self.roster.borrow().clone()
    }

    /// Receiver that is notified whenever the roster grows.
    pub fn subscribe(&self) -> watch::Receiver<RosterSnapshot> {
        self.roster.subscribe()
    }

    pub fn len(&self) -> usize {
        self.roster.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.roster.borrow().is_empty()
    }
}

impl Default for MembershipStore {
    fn default() -> Self {
        Self::new()
    }
}
