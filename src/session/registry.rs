//! Tracks every live session and bounds how many may exist at once.
//!
//! Registration happens before a session is created, deregistration after
//! its teardown; both are no-ops when repeated, so the registry stays
//! consistent no matter which side of the bridge initiated the close.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;

#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SocketAddr>>,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_sessions,
        }
    }

    /// Claims a slot for `session_id`. Returns false when the bridge is at
    /// capacity, in which case no state changes.
    pub fn try_register(&self, session_id: &str, peer: SocketAddr) -> bool {
        let mut sessions = self.sessions.lock().unwrap();
        if sessions.len() >= self.max_sessions {
            return false;
        }
        sessions.insert(session_id.to_string(), peer);
        true
    }

    /// Releases a slot. Unknown ids are ignored, which makes double
    /// teardown a no-op.
    pub fn deregister(&self, session_id: &str) {
        self.sessions.lock().unwrap().remove(session_id);
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().unwrap().is_empty()
    }
}
