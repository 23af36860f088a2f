//! Session capability
//!
//! The pipeline never reads ambient session state; a `Session` handle is
//! passed explicitly into the components that need one (the tenant resolver's
//! hint, the settings form). Values are plain JSON.

use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Opaque key/value store scoped to one browser session.
pub trait Session: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn insert(&self, key: &str, value: Value);
    fn remove(&self, key: &str);
}

/// In-memory session backing.
#[derive(Debug, Default)]
pub struct MemorySession {
    values: Mutex<HashMap<String, Value>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Session for MemorySession {
    fn get(&self, key: &str) -> Option<Value> {
        self.values
            .lock()
            .ok()
            .and_then(|values| values.get(key).cloned())
    }

    fn insert(&self, key: &str, value: Value) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut values) = self.values.lock() {
            values.remove(key);
        }
    }
}

/// Hands out session handles keyed by the session cookie.
///
/// Concurrent requests for the same sid share one `MemorySession`; requests
/// for different sids never share mutable state.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: DashMap<String, Arc<MemorySession>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the session for `sid`, creating a fresh session (with a new
    /// id) when the cookie is absent or unknown.
    pub fn attach(&self, sid: Option<&str>) -> (String, Arc<MemorySession>) {
        if let Some(sid) = sid
            && let Some(session) = self.sessions.get(sid)
        {
            return (sid.to_string(), session.value().clone());
        }

        let sid = uuid::Uuid::new_v4().simple().to_string();
        let session = Arc::new(MemorySession::new());
        self.sessions.insert(sid.clone(), session.clone());
        (sid, session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_session_roundtrip() {
        let session = MemorySession::new();
        assert_eq!(session.get("k"), None);

        session.insert("k", json!({"a": 1}));
        assert_eq!(session.get("k"), Some(json!({"a": 1})));

        session.remove("k");
        assert_eq!(session.get("k"), None);
    }

    #[test]
    fn test_attach_creates_session() {
        let manager = SessionManager::new();
        let (sid, session) = manager.attach(None);
        assert!(!sid.is_empty());
        assert_eq!(manager.len(), 1);

        session.insert("k", json!("v"));
        let (sid2, session2) = manager.attach(Some(&sid));
        assert_eq!(sid, sid2);
        assert_eq!(session2.get("k"), Some(json!("v")));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_attach_unknown_sid_gets_fresh_session() {
        let manager = SessionManager::new();
        let (sid, _) = manager.attach(Some("stale"));
        assert_ne!(sid, "stale");
        assert_eq!(manager.len(), 1);
    }
}
