use advisor_core::domain::profile::UserProfile;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const SESSION_HEADER: &str = "x-session-id";
const MAX_SESSION_ID_LEN: usize = 128;

/// Process-wide profile per session. Lost on restart.
#[derive(Debug, Default)]
pub struct SessionStore {
    profiles: RwLock<HashMap<String, UserProfile>>,
}

impl SessionStore {
    /// Returns the session's profile, storing the default on first sight.
    pub async fn get_or_init(&self, session_id: &str) -> UserProfile {
        if let Some(p) = self.profiles.read().await.get(session_id) {
            return *p;
        }
        *self
            .profiles
            .write()
            .await
            .entry(session_id.to_string())
            .or_default()
    }

    pub async fn set(&self, session_id: &str, profile: UserProfile) {
        self.profiles
            .write()
            .await
            .insert(session_id.to_string(), profile);
    }

    pub async fn len(&self) -> usize {
        self.profiles.read().await.len()
    }
}

/// The caller's session id, or a fresh UUID v4 when the header is absent or unusable.
pub fn session_id(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.len() <= MAX_SESSION_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Echoes the session id back to the client.
pub fn session_headers(session_id: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(v) = HeaderValue::from_str(session_id) {
        headers.insert(HeaderName::from_static(SESSION_HEADER), v);
    }
    headers
}
