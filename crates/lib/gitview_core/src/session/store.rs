//! In-memory session store.
//!
//! The only shared mutable state in the service. Backed by a `DashMap`, so
//! every operation is atomic per entry and safe across worker threads.
//! Nothing is persisted; a restart drops every session.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::SessionId;
use crate::auth::AuthDetails;

/// Mapping from session id to the grant held for it.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, AuthDetails>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Insert or overwrite the entry for `id`.
    pub fn add(&self, id: SessionId, details: AuthDetails) {
        self.sessions.insert(id, details);
    }

    /// A copy of the grant for `id`, or `None` when absent.
    pub fn get(&self, id: &SessionId) -> Option<AuthDetails> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    pub fn has(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Remove the entry for `id`, returning it if it was present.
    pub fn delete(&self, id: &SessionId) -> Option<AuthDetails> {
        self.sessions.remove(id).map(|(_, details)| details)
    }

    /// Swap the grant for an existing entry in place.
    ///
    /// Returns `false` without inserting when `id` is absent. Readers never
    /// observe the entry as missing while it is replaced.
    pub fn replace(&self, id: &SessionId, details: AuthDetails) -> bool {
        match self.sessions.get_mut(id) {
            Some(mut entry) => {
                *entry = details;
                true
            }
            None => false,
        }
    }

    /// Evict every entry expired at `now`; returns how many were removed.
    pub fn remove_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        self.sessions.retain(|_, details| {
            let expired = details.is_expired_at(now);
            removed += usize::from(expired);
            !expired
        });
        removed
    }

    /// The live mapping, not a copy.
    ///
    /// Entries may change while a caller iterates. Holding a reference
    /// into the map across an `.await` can deadlock its shard.
    pub fn all(&self) -> &DashMap<SessionId, AuthDetails> {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
