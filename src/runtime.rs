//! Runtime for executing conversations
//!
//! Each user gets a worker task that owns their conversation and applies
//! events strictly in arrival order. Different users run concurrently and
//! only meet at the ledger, which serializes appends.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{ConversationRuntime, DEFAULT_IDLE_TIMEOUT};
pub use traits::*;

use crate::ledger::SqliteLedger;
use crate::session::InMemorySessionStore;
use crate::state_machine::{Event, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Events buffered per user; further events are dropped until the worker
/// catches up
const EVENT_BUFFER: usize = 32;

/// Type alias for the production manager with concrete implementations
pub type ProductionManager =
    RuntimeManager<Arc<InMemorySessionStore>, SqliteLedger, TelegramAdapter, SystemClock>;

/// Handle to interact with a running conversation
pub struct ConversationHandle {
    pub event_tx: mpsc::Sender<Event>,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

/// Manager for all conversation runtimes
pub struct RuntimeManager<S, L, O, C> {
    store: S,
    ledger: L,
    outbox: O,
    clock: C,
    currency: String,
    idle_timeout: Duration,
    runtimes: RwLock<HashMap<UserId, ConversationHandle>>,
}

impl<S, L, O, C> RuntimeManager<S, L, O, C>
where
    S: SessionStore + Clone + 'static,
    L: LedgerWriter + Clone + 'static,
    O: Outbox + Clone + 'static,
    C: Clock + Clone + 'static,
{
    pub fn new(store: S, ledger: L, outbox: O, clock: C, currency: impl Into<String>) -> Self {
        Self {
            store,
            ledger,
            outbox,
            clock,
            currency: currency.into(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            runtimes: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    #[allow(dead_code)] // Used in tests
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Get the event sender for a user, starting their worker if needed
    pub async fn get_or_create(&self, user: UserId) -> mpsc::Sender<Event> {
        // Check if already running
        {
            let runtimes = self.runtimes.read().await;
            if let Some(handle) = runtimes.get(&user) {
                if !handle.event_tx.is_closed() {
                    return handle.event_tx.clone();
                }
            }
        }

        let mut runtimes = self.runtimes.write().await;
        // Another caller may have started it while we waited for the lock
        if let Some(handle) = runtimes.get(&user) {
            if !handle.event_tx.is_closed() {
                return handle.event_tx.clone();
            }
        }

        // A closed worker may still be draining; its successor waits for it
        let previous = runtimes.remove(&user).map(|h| h.join);
        // Forget workers that have exited on their own
        runtimes.retain(|_, h| !h.join.is_finished());

        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let cancel = CancellationToken::new();
        let runtime = ConversationRuntime::new(
            user,
            self.currency.clone(),
            self.store.clone(),
            self.ledger.clone(),
            self.outbox.clone(),
            self.clock.clone(),
            event_rx,
        )
        .with_cancel_token(cancel.clone())
        .with_idle_timeout(self.idle_timeout);

        // Start runtime in background
        let join = tokio::spawn(async move {
            if let Some(previous) = previous {
                if let Err(e) = previous.await {
                    tracing::error!(user_id = %user, error = %e, "Previous runtime panicked");
                }
            }
            runtime.run().await;
            tracing::debug!(user_id = %user, "Conversation runtime finished");
        });

        tracing::debug!(user_id = %user, "Started conversation runtime");
        runtimes.insert(
            user,
            ConversationHandle {
                event_tx: event_tx.clone(),
                cancel,
                join,
            },
        );

        event_tx
    }

    /// Queue an event for a user's conversation without waiting on the worker
    pub async fn send_event(&self, user: UserId, event: Event) -> Result<(), String> {
        let event_tx = self.get_or_create(user).await;
        match event_tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                tracing::warn!(user_id = %user, "Conversation queue full, dropping event");
                Err("Conversation queue full".to_string())
            }
            Err(TrySendError::Closed(event)) => {
                // Worker stopped between lookup and send; restart it once
                tracing::debug!(user_id = %user, "Conversation runtime gone, restarting");
                self.get_or_create(user)
                    .await
                    .try_send(event)
                    .map_err(|e| format!("Failed to send event: {e}"))
            }
        }
    }

    /// Number of live conversation workers
    #[allow(dead_code)] // Used in tests
    pub async fn active_count(&self) -> usize {
        self.runtimes.read().await.len()
    }

    /// Stop accepting events and wait for every worker to drain its queue.
    /// Senders held elsewhere do not keep a worker alive.
    pub async fn shutdown(&self) {
        let handles: Vec<(UserId, ConversationHandle)> =
            self.runtimes.write().await.drain().collect();
        tracing::info!(count = handles.len(), "Stopping conversation runtimes");

        for (_, handle) in &handles {
            handle.cancel.cancel();
        }
        for (user, handle) in handles {
            let ConversationHandle { event_tx, join, .. } = handle;
            drop(event_tx);
            if let Err(e) = join.await {
                tracing::error!(user_id = %user, error = %e, "Conversation runtime panicked");
            }
        }
    }
}
