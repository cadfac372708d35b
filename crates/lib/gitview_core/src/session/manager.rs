//! Session lifecycle: create, read, replace, delete and sweep.
//!
//! Every entry point takes the raw id string handed over by the cookie
//! layer and validates it before touching the store.
//!
//! ```text
//! ABSENT --add--> ACTIVE --update--> ACTIVE --delete / sweep--> ABSENT
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, info};

use super::{SessionError, SessionId, SessionStore};
use crate::auth::AuthDetails;

/// Policy layer over a shared [`SessionStore`].
#[derive(Debug, Clone)]
pub struct SessionLifecycleManager {
    store: Arc<SessionStore>,
}

impl SessionLifecycleManager {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Create (or overwrite) the session for `id`.
    pub fn add_session(&self, id: &str, details: AuthDetails) -> Result<SessionId, SessionError> {
        let id = SessionId::parse(id)?;
        self.store.add(id, details);
        info!(session_id = %id, "session added");
        Ok(id)
    }

    pub fn get_session(&self, id: &str) -> Result<AuthDetails, SessionError> {
        let id = SessionId::parse(id)?;
        self.store.get(&id).ok_or(SessionError::SessionNotFound(id))
    }

    pub fn has_session(&self, id: &str) -> Result<bool, SessionError> {
        let id = SessionId::parse(id)?;
        Ok(self.store.has(&id))
    }

    /// Remove the session for `id`. A second delete of the same id fails.
    pub fn delete_session(&self, id: &str) -> Result<(), SessionError> {
        let id = SessionId::parse(id)?;
        match self.store.delete(&id) {
            Some(_) => {
                info!(session_id = %id, "session deleted");
                Ok(())
            }
            None => Err(SessionError::SessionNotFound(id)),
        }
    }

    /// Replace the grant of an existing session in one step.
    ///
    /// Never creates a session: refreshing a session that has vanished
    /// (logout, sweep) fails with `SessionNotFound`.
    pub fn update_session(&self, id: &str, details: AuthDetails) -> Result<(), SessionError> {
        let id = SessionId::parse(id)?;
        if self.store.replace(&id, details) {
            debug!(session_id = %id, "session updated");
            Ok(())
        } else {
            Err(SessionError::SessionNotFound(id))
        }
    }

    /// The live session mapping.
    pub fn get_all_sessions(&self) -> &DashMap<SessionId, AuthDetails> {
        self.store.all()
    }

    /// Evict every session whose grant has expired.
    pub fn clear_expired_sessions(&self) {
        self.clear_expired_sessions_at(Utc::now());
    }

    pub fn clear_expired_sessions_at(&self, now: DateTime<Utc>) {
        let evicted = self.store.remove_expired_at(now);
        if evicted > 0 {
            info!(evicted, remaining = self.store.len(), "expired sessions cleared");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    const BAD_IDS: [&str; 4] = [
        "",
        "abc",
        "0f8fad5bd9cb469fa16570867728950e",
        "zzzzzzzz-zzzz-zzzz-zzzz-zzzzzzzzzzzz",
    ];

    fn manager() -> SessionLifecycleManager {
        SessionLifecycleManager::new(Arc::new(SessionStore::new()))
    }

    fn grant(token: &str, expires_in: i64) -> AuthDetails {
        AuthDetails::new(Some("code".into()), token.into(), Some("refresh".into()), expires_in)
    }

    fn grant_at(token: &str, expires_in: i64, issued_at: DateTime<Utc>) -> AuthDetails {
        AuthDetails::issued_at(None, token.into(), None, expires_in, issued_at)
    }

    #[test]
    fn added_session_reads_back_equal() {
        let m = manager();
        let id = SessionId::generate().to_string();
        let details = grant("A", 3600);
        m.add_session(&id, details.clone()).unwrap();
        assert_eq!(m.get_session(&id).unwrap(), details);
        assert!(m.has_session(&id).unwrap());
    }

    #[test]
    fn malformed_ids_are_rejected_everywhere() {
        let m = manager();
        for raw in BAD_IDS {
            let invalid = SessionError::InvalidSessionId(raw.to_string());
            assert_eq!(m.add_session(raw, grant("A", 60)).unwrap_err(), invalid);
            assert_eq!(m.get_session(raw).unwrap_err(), invalid);
            assert_eq!(m.has_session(raw).unwrap_err(), invalid);
            assert_eq!(m.delete_session(raw).unwrap_err(), invalid);
            assert_eq!(m.update_session(raw, grant("A", 60)).unwrap_err(), invalid);
        }
        assert!(m.store().is_empty());
    }

    #[test]
    fn unknown_session_is_not_found() {
        let m = manager();
        let id = SessionId::generate();
        let raw = id.to_string();
        assert!(!m.has_session(&raw).unwrap());
        assert_eq!(m.get_session(&raw).unwrap_err(), SessionError::SessionNotFound(id));
    }

    #[test]
    fn update_fully_replaces_details() {
        let m = manager();
        let id = SessionId::generate().to_string();
        m.add_session(&id, grant("A", 60)).unwrap();

        let replacement = AuthDetails::new(None, "B".into(), None, 7200);
        m.update_session(&id, replacement.clone()).unwrap();

        let stored = m.get_session(&id).unwrap();
        assert_eq!(stored, replacement);
        assert_eq!(stored.refresh_token(), None);
    }

    #[test]
    fn update_never_creates_a_session() {
        let m = manager();
        let id = SessionId::generate();
        let err = m.update_session(&id.to_string(), grant("A", 60)).unwrap_err();
        assert_eq!(err, SessionError::SessionNotFound(id));
        assert!(m.store().is_empty());
    }

    #[test]
    fn second_delete_fails() {
        let m = manager();
        let id = SessionId::generate();
        let raw = id.to_string();
        m.add_session(&raw, grant("A", 60)).unwrap();
        assert_eq!(m.delete_session(&raw), Ok(()));
        assert_eq!(m.delete_session(&raw), Err(SessionError::SessionNotFound(id)));
    }

    #[test]
    fn clear_expired_removes_exactly_the_expired() {
        let m = manager();
        let now = Utc::now();
        let ids: Vec<String> = (0..6).map(|_| SessionId::generate().to_string()).collect();

        // Interleave expired and live entries so insertion order can't matter.
        m.add_session(&ids[0], grant_at("e0", 60, now - Duration::minutes(5))).unwrap();
        m.add_session(&ids[1], grant_at("l1", 3600, now)).unwrap();
        m.add_session(&ids[2], grant_at("e2", 0, now)).unwrap();
        m.add_session(&ids[3], grant_at("l3", 1, now)).unwrap();
        m.add_session(&ids[4], grant_at("e4", 30, now - Duration::seconds(30))).unwrap();
        m.add_session(&ids[5], grant_at("l5", 600, now - Duration::seconds(10))).unwrap();

        m.clear_expired_sessions_at(now);

        for expired in [&ids[0], &ids[2], &ids[4]] {
            assert!(!m.has_session(expired).unwrap());
        }
        for live in [&ids[1], &ids[3], &ids[5]] {
            assert!(m.has_session(live).unwrap());
        }
        assert_eq!(m.get_all_sessions().len(), 3);

        // Idempotent.
        m.clear_expired_sessions_at(now);
        assert_eq!(m.get_all_sessions().len(), 3);
    }

    #[test]
    fn sweep_uses_wall_clock() {
        let m = manager();
        let stale = SessionId::generate().to_string();
        let live = SessionId::generate().to_string();
        m.add_session(&stale, grant_at("s", 1, Utc::now() - Duration::hours(1))).unwrap();
        m.add_session(&live, grant("l", 3600)).unwrap();

        m.clear_expired_sessions();

        assert!(!m.has_session(&stale).unwrap());
        assert!(m.has_session(&live).unwrap());
    }

    #[test]
    fn concurrent_updates_never_expose_absence() {
        let m = manager();
        let id = SessionId::generate().to_string();
        m.add_session(&id, grant("A", 3600)).unwrap();

        std::thread::scope(|scope| {
            for n in 0..4 {
                let m = &m;
                let id = &id;
                scope.spawn(move || {
                    for i in 0..500 {
                        let token = format!("T{n}-{i}");
                        m.update_session(id, grant(&token, 3600)).unwrap();
                    }
                });
            }
            for _ in 0..4 {
                let m = &m;
                let id = &id;
                scope.spawn(move || {
                    for _ in 0..500 {
                        assert!(m.get_session(id).is_ok());
                    }
                });
            }
        });
    }
}
