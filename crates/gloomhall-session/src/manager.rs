//! Session bookkeeping.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::{debug, info};

use gloomhall_protocol::PlayerId;

use crate::SessionError;

const TOKEN_LEN: usize = 24;

/// Whether the session's connection is currently live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Disconnected,
}

/// One authenticated player identity.
#[derive(Debug, Clone)]
pub struct Session {
    pub player_id: PlayerId,
    /// Presented on reconnect to reclaim the same identity.
    pub token: String,
    pub state: SessionState,
    pub created_at: Instant,
    /// Last heartbeat or disconnect time.
    pub last_seen: Instant,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// How long a disconnected session may be resumed.
    pub reconnect_window: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_window: Duration::from_secs(60),
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Creates, resumes, and expires sessions. Shared behind an `Arc`.
pub struct SessionManager {
    config: SessionConfig,
    next_id: AtomicU64,
    sessions: Mutex<HashMap<PlayerId, Session>>,
    tokens: Mutex<HashMap<String, PlayerId>>,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            next_id: AtomicU64::new(1),
            sessions: Mutex::new(HashMap::new()),
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a fresh session and returns its id and reconnect token.
    pub fn create(&self) -> (PlayerId, String) {
        let id = PlayerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let token: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();
        let now = Instant::now();
        lock(&self.sessions).insert(
            id,
            Session {
                player_id: id,
                token: token.clone(),
                state: SessionState::Connected,
                created_at: now,
                last_seen: now,
            },
        );
        lock(&self.tokens).insert(token.clone(), id);
        info!(player = %id, "session created");
        (id, token)
    }

    /// Records a heartbeat.
    pub fn touch(&self, id: PlayerId) {
        if let Some(s) = lock(&self.sessions).get_mut(&id) {
            s.last_seen = Instant::now();
        }
    }

    /// Marks the session as disconnected; the reconnect window starts now.
    pub fn disconnect(&self, id: PlayerId) {
        if let Some(s) = lock(&self.sessions).get_mut(&id) {
            s.state = SessionState::Disconnected;
            s.last_seen = Instant::now();
            debug!(player = %id, "session disconnected");
        }
    }

    /// Resumes a session by token.
    ///
    /// # Errors
    /// [`SessionError::UnknownToken`] when the token is unknown or the
    /// reconnect window has passed.
    pub fn reconnect(&self, token: &str) -> Result<PlayerId, SessionError> {
        let id = lock(&self.tokens)
            .get(token)
            .copied()
            .ok_or(SessionError::UnknownToken)?;
        let mut sessions = lock(&self.sessions);
        let Some(s) = sessions.get_mut(&id) else {
            return Err(SessionError::UnknownToken);
        };
        if s.state == SessionState::Disconnected
            && s.last_seen.elapsed() > self.config.reconnect_window
        {
            return Err(SessionError::UnknownToken);
        }
        s.state = SessionState::Connected;
        s.last_seen = Instant::now();
        info!(player = %id, "session resumed");
        Ok(id)
    }

    /// Drops a session outright.
    pub fn remove(&self, id: PlayerId) {
        if let Some(s) = lock(&self.sessions).remove(&id) {
            lock(&self.tokens).remove(&s.token);
            debug!(player = %id, "session removed");
        }
    }

    /// Removes disconnected sessions past their reconnect window and
    /// returns their ids so the caller can free their seats.
    pub fn expire_stale(&self) -> Vec<PlayerId> {
        let window = self.config.reconnect_window;
        let mut expired = Vec::new();
        {
            let mut sessions = lock(&self.sessions);
            sessions.retain(|id, s| {
                let stale = s.state == SessionState::Disconnected
                    && s.last_seen.elapsed() > window;
                if stale {
                    expired.push(*id);
                }
                !stale
            });
        }
        if !expired.is_empty() {
            let mut tokens = lock(&self.tokens);
            tokens.retain(|_, id| !expired.contains(id));
            info!(count = expired.len(), "stale sessions expired");
        }
        expired
    }

    pub fn get(&self, id: PlayerId) -> Option<Session> {
        lock(&self.sessions).get(&id).cloned()
    }

    pub fn count(&self) -> usize {
        lock(&self.sessions).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(window: Duration) -> SessionManager {
        SessionManager::new(SessionConfig {
            reconnect_window: window,
        })
    }

    #[test]
    fn test_create_assigns_distinct_ids_and_tokens() {
        let mgr = manager(Duration::from_secs(60));
        let (a, token_a) = mgr.create();
        let (b, token_b) = mgr.create();
        assert_ne!(a, b);
        assert_ne!(token_a, token_b);
        assert_eq!(mgr.count(), 2);
    }

    #[test]
    fn test_reconnect_within_window() {
        let mgr = manager(Duration::from_secs(60));
        let (id, token) = mgr.create();
        mgr.disconnect(id);
        assert_eq!(mgr.reconnect(&token).unwrap(), id);
        assert_eq!(mgr.get(id).unwrap().state, SessionState::Connected);
    }

    #[test]
    fn test_reconnect_unknown_token_fails() {
        let mgr = manager(Duration::from_secs(60));
        assert!(matches!(
            mgr.reconnect("no-such-token"),
            Err(SessionError::UnknownToken)
        ));
    }

    #[test]
    fn test_reconnect_after_window_fails() {
        let mgr = manager(Duration::ZERO);
        let (id, token) = mgr.create();
        mgr.disconnect(id);
        std::thread::sleep(Duration::from_millis(5));
        assert!(mgr.reconnect(&token).is_err());
    }

    #[test]
    fn test_expire_stale_frees_disconnected_sessions() {
        let mgr = manager(Duration::ZERO);
        let (gone, token) = mgr.create();
        let (kept, _) = mgr.create();
        mgr.disconnect(gone);
        std::thread::sleep(Duration::from_millis(5));

        let expired = mgr.expire_stale();
        assert_eq!(expired, vec![gone]);
        assert!(mgr.get(gone).is_none());
        assert!(mgr.get(kept).is_some());
        assert!(mgr.reconnect(&token).is_err());
    }

    #[test]
    fn test_remove_invalidates_token() {
        let mgr = manager(Duration::from_secs(60));
        let (id, token) = mgr.create();
        mgr.remove(id);
        assert!(mgr.reconnect(&token).is_err());
        assert_eq!(mgr.count(), 0);
    }
}
