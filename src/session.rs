//! In-memory conversation state store
//!
//! State lives for the life of the process; a restart puts every user back
//! at the main menu.

use crate::runtime::SessionStore;
use crate::state_machine::{ConversationState, UserId};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Sessions keyed by user, created on first access
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<UserId, ConversationState>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with an entry in the store
    #[allow(dead_code)] // Diagnostics and tests
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, user: UserId) -> ConversationState {
        if let Some(state) = self.sessions.read().await.get(&user) {
            return state.clone();
        }
        self.sessions
            .write()
            .await
            .entry(user)
            .or_default()
            .clone()
    }

    async fn set(&self, user: UserId, state: ConversationState) {
        self.sessions.write().await.insert(user, state);
    }

    async fn clear(&self, user: UserId) {
        // An absent entry reads back as idle, so dropping it is a reset
        self.sessions.write().await.remove(&user);
    }
}
