//! Cookie-based session store.
//!
//! The OAuth login flow lives outside this service; whatever fronts it
//! creates sessions through [`Sessions::insert`]. Handlers resolve the
//! `session_id` cookie to a [`UserInfo`] and reject requests without a
//! live session.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "session_id";

const SESSION_TTL_DAYS: i64 = 7;
const CLEANUP_INTERVAL_SECS: u64 = 3600;

/// Authenticated user identity attached to a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub picture: String,
}

/// A live session.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub user: UserInfo,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Process-wide session registry.
pub struct Sessions {
    inner: RwLock<HashMap<String, Session>>,
}

impl Sessions {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Create and store a session for `user`, returning its id.
    pub fn insert(&self, user: UserInfo) -> String {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user,
            created_at: now,
            expires_at: now + chrono::Duration::days(SESSION_TTL_DAYS),
        };
        let id = session.id.clone();
        self.inner
            .write()
            .expect("session lock poisoned")
            .insert(id.clone(), session);
        id
    }

    /// Look up a session by id, treating expired sessions as absent.
    pub fn get(&self, session_id: &str) -> Option<UserInfo> {
        let map = self.inner.read().expect("session lock poisoned");
        let session = map.get(session_id)?;
        if Utc::now() > session.expires_at {
            return None;
        }
        Some(session.user.clone())
    }

    /// Remove a session (logout).
    pub fn remove(&self, session_id: &str) {
        self.inner
            .write()
            .expect("session lock poisoned")
            .remove(session_id);
    }

    /// Resolve the authenticated user from request headers.
    pub fn user_from_headers(&self, headers: &HeaderMap) -> Option<UserInfo> {
        let session_id = session_cookie(headers)?;
        self.get(&session_id)
    }

    /// Drop all expired sessions.
    pub fn purge_expired(&self) {
        let now = Utc::now();
        let mut map = self.inner.write().expect("session lock poisoned");
        let before = map.len();
        map.retain(|_, session| session.expires_at > now);
        let removed = before - map.len();
        if removed > 0 {
            debug!(removed, "purged expired sessions");
        }
    }
}

impl Default for Sessions {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the `session_id` cookie value from request headers.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    for pair in raw.split(';') {
        let pair = pair.trim();
        if let Some(value) = pair
            .strip_prefix(SESSION_COOKIE)
            .and_then(|rest| rest.strip_prefix('='))
        {
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Periodically purge expired sessions.
pub fn spawn_session_cleanup(sessions: Arc<Sessions>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            sessions.purge_expired();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn user(id: &str) -> UserInfo {
        UserInfo {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            name: id.to_string(),
            picture: String::new(),
        }
    }

    #[test]
    fn insert_then_get() {
        let sessions = Sessions::new();
        let id = sessions.insert(user("u1"));
        let found = sessions.get(&id).unwrap();
        assert_eq!(found.id, "u1");
    }

    #[test]
    fn remove_forgets_session() {
        let sessions = Sessions::new();
        let id = sessions.insert(user("u1"));
        sessions.remove(&id);
        assert!(sessions.get(&id).is_none());
    }

    #[test]
    fn cookie_extraction_handles_multiple_pairs() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; session_id=abc-123; lang=ko"),
        );
        assert_eq!(session_cookie(&headers).as_deref(), Some("abc-123"));
    }

    #[test]
    fn missing_cookie_is_none() {
        let headers = HeaderMap::new();
        assert!(session_cookie(&headers).is_none());
    }
}
