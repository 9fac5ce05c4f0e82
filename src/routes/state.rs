use std::sync::Arc;

use crate::{
    db::{MemoryStore, Store},
    services::SessionKeys,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub sessions: Arc<SessionKeys>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, sessions: SessionKeys) -> Self {
        Self {
            store,
            sessions: Arc::new(sessions),
        }
    }

    /// State over an empty in-memory store
    pub fn in_memory(session_secret: &str, session_ttl_secs: u64) -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            SessionKeys::new(session_secret, session_ttl_secs),
        )
    }
}
