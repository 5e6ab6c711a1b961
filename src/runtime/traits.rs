//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::keyboard::Keyboard;
use crate::ledger::{Cell, Sheet, WriteError};
use crate::state_machine::{ConversationState, UserId};
use crate::transport::{TransportError, Update};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

/// Per-user conversation state
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Current state, `Idle` with an empty draft if the user is new
    async fn get(&self, user: UserId) -> ConversationState;

    async fn set(&self, user: UserId, state: ConversationState);

    /// Reset the user to `Idle` with an empty draft
    async fn clear(&self, user: UserId);
}

/// Append-only ledger
#[async_trait]
pub trait LedgerWriter: Send + Sync {
    /// Append one row atomically: either the whole row is stored or nothing is
    async fn append(&self, sheet: Sheet, row: &[Cell]) -> Result<(), WriteError>;
}

/// Outbound messages to users
#[async_trait]
pub trait Outbox: Send + Sync {
    async fn send(
        &self,
        user: UserId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<(), TransportError>;
}

/// Source of inbound updates
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Wait for updates with `update_id >= offset`
    async fn poll(&self, offset: Option<i64>) -> Result<Vec<Update>, TransportError>;
}

/// Provides the date stamped onto ledger rows
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn get(&self, user: UserId) -> ConversationState {
        (**self).get(user).await
    }

    async fn set(&self, user: UserId, state: ConversationState) {
        (**self).set(user, state).await;
    }

    async fn clear(&self, user: UserId) {
        (**self).clear(user).await;
    }
}

#[async_trait]
impl<T: LedgerWriter + ?Sized> LedgerWriter for Arc<T> {
    async fn append(&self, sheet: Sheet, row: &[Cell]) -> Result<(), WriteError> {
        (**self).append(sheet, row).await
    }
}

#[async_trait]
impl<T: Outbox + ?Sized> Outbox for Arc<T> {
    async fn send(
        &self,
        user: UserId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<(), TransportError> {
        (**self).send(user, text, keyboard).await
    }
}

#[async_trait]
impl<T: UpdateSource + ?Sized> UpdateSource for Arc<T> {
    async fn poll(&self, offset: Option<i64>) -> Result<Vec<Update>, TransportError> {
        (**self).poll(offset).await
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn today(&self) -> NaiveDate {
        (**self).today()
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

use crate::ledger::SqliteLedger;
use crate::transport::TelegramClient;

#[async_trait]
impl LedgerWriter for SqliteLedger {
    async fn append(&self, sheet: Sheet, row: &[Cell]) -> Result<(), WriteError> {
        // SQLite blocks; keep it off the async workers
        let ledger = self.clone();
        let row = row.to_vec();
        tokio::task::spawn_blocking(move || ledger.append_row(sheet, &row))
            .await
            .map_err(|e| WriteError::Unavailable(format!("ledger task failed: {e}")))?
    }
}

/// Adapter to use a shared `TelegramClient` as both `Outbox` and `UpdateSource`
#[derive(Clone)]
pub struct TelegramAdapter {
    client: Arc<TelegramClient>,
}

impl TelegramAdapter {
    pub fn new(client: Arc<TelegramClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Outbox for TelegramAdapter {
    async fn send(
        &self,
        user: UserId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<(), TransportError> {
        self.client.send_message(user, text, keyboard).await
    }
}

#[async_trait]
impl UpdateSource for TelegramAdapter {
    async fn poll(&self, offset: Option<i64>) -> Result<Vec<Update>, TransportError> {
        self.client.get_updates(offset).await
    }
}

/// Local calendar date of the host
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}
