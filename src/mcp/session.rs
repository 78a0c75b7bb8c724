use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use uuid::Uuid;

/// Protocol sessions minted by `initialize`.
///
/// Sessions expire a fixed time after creation. Expired entries read as unknown and are purged
/// whenever a new session is created; lookups never mutate the registry.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Instant>>,
    ttl: Option<Duration>,
}

impl SessionRegistry {
    /// Create a registry whose sessions live for `ttl`; `None` disables expiry.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Create a registry from a lifetime in seconds; `0` disables expiry.
    pub fn with_ttl_secs(secs: u64) -> Self {
        Self::new((secs > 0).then(|| Duration::from_secs(secs)))
    }

    /// Mint and register a new session identifier.
    pub fn create(&self) -> String {
        let session_id = Uuid::new_v4().to_string();
        let now = Instant::now();
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(ttl) = self.ttl {
            let before = sessions.len();
            sessions.retain(|_, created| now.duration_since(*created) < ttl);
            let purged = before - sessions.len();
            if purged > 0 {
                tracing::debug!(purged, "Expired sessions purged");
            }
        }
        sessions.insert(session_id.clone(), now);
        tracing::info!(session_id = %session_id, "Session created");
        session_id
    }

    /// Whether `session_id` names a live session.
    pub fn contains(&self, session_id: &str) -> bool {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        match sessions.get(session_id) {
            Some(created) => self.is_live(*created),
            None => false,
        }
    }

    /// Number of stored sessions, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no sessions are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_live(&self, created: Instant) -> bool {
        self.ttl.is_none_or(|ttl| created.elapsed() < ttl)
    }
}
