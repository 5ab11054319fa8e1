use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::store::{Store, UserId};

#[derive(Debug, Clone, Copy)]
struct SessionEntry {
    user_id: UserId,
    expires_at: Instant,
}

impl SessionEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Server-side sessions keyed by an opaque token. Nothing is persisted; a
/// restart signs everybody out.
///
/// Expired entries are dropped when their token is looked up and swept from
/// the whole map whenever a new session is created, so the map stays bounded
/// by the number of sessions alive within one TTL.
#[derive(Debug, Clone)]
pub struct SessionStore {
    entries: Arc<DashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Issues a fresh token bound to `user_id`.
    pub fn create(&self, user_id: UserId) -> String {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.is_live(now));

        let token = Uuid::new_v4().to_string();
        self.entries.insert(
            token.clone(),
            SessionEntry {
                user_id,
                expires_at: now + self.ttl,
            },
        );
        token
    }

    pub fn get(&self, token: &str) -> Option<UserId> {
        let now = Instant::now();
        let entry = self.entries.get(token).map(|entry| *entry)?;
        if entry.is_live(now) {
            return Some(entry.user_id);
        }
        self.entries.remove_if(token, |_, entry| !entry.is_live(now));
        None
    }

    pub fn remove(&self, token: &str) {
        self.entries.remove(token);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Store,
    pub sessions: SessionStore,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Store, config: Arc<AppConfig>) -> Self {
        Self {
            store,
            sessions: SessionStore::new(config.session_ttl),
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::SessionStore;

    #[test]
    fn created_session_resolves_to_user() {
        let sessions = SessionStore::new(Duration::from_secs(60));
        let token = sessions.create(7);
        assert_eq!(sessions.get(&token), Some(7));
        assert_eq!(sessions.get("not-a-token"), None);
    }

    #[test]
    fn tokens_are_unique_per_sign_in() {
        let sessions = SessionStore::new(Duration::from_secs(60));
        let first = sessions.create(1);
        let second = sessions.create(1);
        assert_ne!(first, second);
    }

    #[test]
    fn removed_session_is_gone_and_removal_is_idempotent() {
        let sessions = SessionStore::new(Duration::from_secs(60));
        let token = sessions.create(1);
        sessions.remove(&token);
        sessions.remove(&token);
        assert_eq!(sessions.get(&token), None);
    }

    #[test]
    fn expired_session_is_rejected_and_evicted() {
        let sessions = SessionStore::new(Duration::ZERO);
        let token = sessions.create(1);
        assert_eq!(sessions.get(&token), None);
        assert_eq!(sessions.len(), 0);
    }

    #[test]
    fn creating_a_session_sweeps_expired_ones() {
        let sessions = SessionStore::new(Duration::from_millis(1));
        for user_id in 0..100 {
            sessions.create(user_id);
        }
        std::thread::sleep(Duration::from_millis(20));

        sessions.create(1000);
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn live_sessions_survive_the_sweep() {
        let sessions = SessionStore::new(Duration::from_secs(60));
        let first = sessions.create(1);
        let second = sessions.create(2);
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions.get(&first), Some(1));
        assert_eq!(sessions.get(&second), Some(2));
    }
}
