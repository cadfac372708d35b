//! Proactive token refresh.
//!
//! Evaluated per request, with no background timer: when a session's
//! access token expires within the threshold, it is renewed against the
//! provider before the request continues. A session that sees no traffic
//! near expiry is simply swept later.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::{AuthDetails, OAuthError, TokenProvider};
use crate::session::{SessionError, SessionId, SessionLifecycleManager};

/// Default refresh threshold: 5 minutes before expiry.
pub const DEFAULT_REFRESH_THRESHOLD: Duration = Duration::minutes(5);

/// Refresh errors.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    OAuth(#[from] OAuthError),

    #[error("Session {0} has no refresh token")]
    MissingRefreshToken(SessionId),
}

/// What [`SessionRefresher::refresh_if_needed`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// No session under this id.
    Absent,
    /// Token still has more than the threshold left.
    Fresh,
    /// Token was renewed and the session updated.
    Refreshed,
}

/// `true` when less than `threshold` is left before `details` expires.
pub fn needs_refresh_at(details: &AuthDetails, threshold: Duration, now: DateTime<Utc>) -> bool {
    details.remaining_at(now) < threshold
}

/// Applies the refresh policy to sessions held by a lifecycle manager.
pub struct SessionRefresher {
    sessions: SessionLifecycleManager,
    provider: Arc<dyn TokenProvider>,
    threshold: Duration,
    locks: DashMap<SessionId, Arc<Mutex<()>>>,
}

impl SessionRefresher {
    pub fn new(
        sessions: SessionLifecycleManager,
        provider: Arc<dyn TokenProvider>,
        threshold: Duration,
    ) -> Self {
        Self {
            sessions,
            provider,
            threshold,
            locks: DashMap::new(),
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Refresh the session for `id` if it is close to expiry.
    ///
    /// Concurrent calls for the same session are serialised; whoever gets
    /// the lock second re-reads the session and finds it fresh, so the
    /// provider sees a single refresh.
    pub async fn refresh_if_needed(&self, id: &str) -> Result<RefreshOutcome, RefreshError> {
        let session_id = SessionId::parse(id)?;

        match self.sessions.store().get(&session_id) {
            None => return Ok(RefreshOutcome::Absent),
            Some(details) if !needs_refresh_at(&details, self.threshold, Utc::now()) => {
                return Ok(RefreshOutcome::Fresh);
            }
            Some(_) => {}
        }

        let lock = self.locks.entry(session_id).or_default().value().clone();
        let _guard = lock.lock().await;

        let Some(details) = self.sessions.store().get(&session_id) else {
            return Ok(RefreshOutcome::Absent);
        };
        if !needs_refresh_at(&details, self.threshold, Utc::now()) {
            debug!(session_id = %session_id, "session refreshed by a concurrent request");
            return Ok(RefreshOutcome::Fresh);
        }

        let refresh_token = details
            .refresh_token()
            .ok_or(RefreshError::MissingRefreshToken(session_id))?;

        let renewed = self
            .provider
            .refresh(details.code(), refresh_token)
            .await
            .inspect_err(|e| warn!(session_id = %session_id, error = %e, "token refresh failed"))?;

        self.sessions.update_session(id, renewed)?;
        info!(session_id = %session_id, "session token refreshed");
        Ok(RefreshOutcome::Refreshed)
    }

    /// Drop per-session locks nobody is waiting on for sessions that are gone.
    pub fn prune_locks(&self) {
        let store = self.sessions.store();
        self.locks
            .retain(|id, lock| store.has(id) || Arc::strong_count(lock) > 1);
    }

    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::session::SessionStore;

    /// Provider that counts refreshes and hands out long-lived grants.
    #[derive(Default)]
    struct CountingProvider {
        refreshes: AtomicU32,
        fail: bool,
    }

    #[async_trait]
    impl TokenProvider for CountingProvider {
        async fn authenticate(
            &self,
            code: &str,
            _redirect_url: &str,
        ) -> Result<AuthDetails, OAuthError> {
            Ok(AuthDetails::new(Some(code.into()), "A".into(), Some("R".into()), 3600))
        }

        async fn refresh(
            &self,
            code: Option<&str>,
            refresh_token: &str,
        ) -> Result<AuthDetails, OAuthError> {
            let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
            // Yield so concurrent callers pile up on the session lock.
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            if self.fail {
                return Err(OAuthError::TokenExchangeFailed("provider down".into()));
            }
            Ok(AuthDetails::new(
                code.map(str::to_string),
                format!("A{n}"),
                Some(format!("{refresh_token}-{n}")),
                7200,
            ))
        }
    }

    fn setup(provider: Arc<CountingProvider>) -> (SessionLifecycleManager, SessionRefresher) {
        let manager = SessionLifecycleManager::new(Arc::new(SessionStore::new()));
        let refresher =
            SessionRefresher::new(manager.clone(), provider, DEFAULT_REFRESH_THRESHOLD);
        (manager, refresher)
    }

    fn grant(expires_in: i64) -> AuthDetails {
        AuthDetails::new(Some("code123".into()), "A".into(), Some("R".into()), expires_in)
    }

    #[test]
    fn threshold_comparison() {
        let now = Utc::now();
        let details = AuthDetails::issued_at(None, "A".into(), None, 600, now);
        assert!(!needs_refresh_at(&details, DEFAULT_REFRESH_THRESHOLD, now));
        assert!(!needs_refresh_at(&details, DEFAULT_REFRESH_THRESHOLD, now + Duration::minutes(5)));
        assert!(needs_refresh_at(
            &details,
            DEFAULT_REFRESH_THRESHOLD,
            now + Duration::minutes(5) + Duration::seconds(1)
        ));
    }

    #[tokio::test]
    async fn near_expiry_session_is_refreshed_once() {
        let provider = Arc::new(CountingProvider::default());
        let (manager, refresher) = setup(provider.clone());
        let id = SessionId::generate().to_string();
        manager.add_session(&id, grant(180)).unwrap();

        let outcome = refresher.refresh_if_needed(&id).await.unwrap();

        assert_eq!(outcome, RefreshOutcome::Refreshed);
        assert_eq!(provider.refreshes.load(Ordering::SeqCst), 1);
        let stored = manager.get_session(&id).unwrap();
        assert_eq!(stored.access_token(), "A1");
        assert_eq!(stored.refresh_token(), Some("R-1"));
        assert_eq!(stored.code(), Some("code123"));

        // Now well outside the threshold.
        let outcome = refresher.refresh_if_needed(&id).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Fresh);
        assert_eq!(provider.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fresh_session_is_left_alone() {
        let provider = Arc::new(CountingProvider::default());
        let (manager, refresher) = setup(provider.clone());
        let id = SessionId::generate().to_string();
        manager.add_session(&id, grant(3600)).unwrap();

        assert_eq!(refresher.refresh_if_needed(&id).await.unwrap(), RefreshOutcome::Fresh);
        assert_eq!(provider.refreshes.load(Ordering::SeqCst), 0);
        assert_eq!(refresher.lock_count(), 0);
    }

    #[tokio::test]
    async fn absent_session_is_reported() {
        let provider = Arc::new(CountingProvider::default());
        let (_, refresher) = setup(provider.clone());
        let id = SessionId::generate().to_string();
        assert_eq!(refresher.refresh_if_needed(&id).await.unwrap(), RefreshOutcome::Absent);

        let err = refresher.refresh_if_needed("nope").await.unwrap_err();
        assert!(matches!(err, RefreshError::Session(SessionError::InvalidSessionId(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_share_one_refresh() {
        let provider = Arc::new(CountingProvider::default());
        let (manager, refresher) = setup(provider.clone());
        let refresher = Arc::new(refresher);
        let id = SessionId::generate().to_string();
        manager.add_session(&id, grant(120)).unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let refresher = refresher.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move { refresher.refresh_if_needed(&id).await }));
        }
        let mut refreshed = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() == RefreshOutcome::Refreshed {
                refreshed += 1;
            }
        }

        assert_eq!(refreshed, 1);
        assert_eq!(provider.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn provider_failure_propagates_and_keeps_session() {
        let provider = Arc::new(CountingProvider {
            fail: true,
            ..Default::default()
        });
        let (manager, refresher) = setup(provider.clone());
        let id = SessionId::generate().to_string();
        let original = grant(60);
        manager.add_session(&id, original.clone()).unwrap();

        let err = refresher.refresh_if_needed(&id).await.unwrap_err();

        assert!(matches!(err, RefreshError::OAuth(OAuthError::TokenExchangeFailed(_))));
        assert_eq!(manager.get_session(&id).unwrap(), original);
    }

    #[tokio::test]
    async fn missing_refresh_token_is_an_error() {
        let provider = Arc::new(CountingProvider::default());
        let (manager, refresher) = setup(provider.clone());
        let id = SessionId::generate();
        manager
            .add_session(&id.to_string(), AuthDetails::new(None, "A".into(), None, 30))
            .unwrap();

        let err = refresher.refresh_if_needed(&id.to_string()).await.unwrap_err();
        assert!(matches!(err, RefreshError::MissingRefreshToken(missing) if missing == id));
        assert_eq!(provider.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn prune_drops_locks_of_deleted_sessions() {
        let provider = Arc::new(CountingProvider::default());
        let (manager, refresher) = setup(provider);
        let id = SessionId::generate().to_string();
        manager.add_session(&id, grant(60)).unwrap();
        refresher.refresh_if_needed(&id).await.unwrap();
        assert_eq!(refresher.lock_count(), 1);

        refresher.prune_locks();
        assert_eq!(refresher.lock_count(), 1, "live session keeps its lock");

        manager.delete_session(&id).unwrap();
        refresher.prune_locks();
        assert_eq!(refresher.lock_count(), 0);
    }
}
