//! Inbound update loop
//!
//! Long-polls the update source, acknowledges updates by advancing the
//! offset, and hands each text message to the user's conversation worker.

use crate::runtime::{Clock, LedgerWriter, Outbox, RuntimeManager, SessionStore, UpdateSource};
use crate::state_machine::Event;
use crate::transport::{TransportError, TransportErrorKind, Update};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Pause after a failed poll when the server gives no `retry_after`
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(5);

pub struct Listener<U, S, L, O, C> {
    source: U,
    manager: Arc<RuntimeManager<S, L, O, C>>,
    cancel: CancellationToken,
    offset: Option<i64>,
    error_backoff: Duration,
}

impl<U, S, L, O, C> Listener<U, S, L, O, C>
where
    U: UpdateSource,
    S: SessionStore + Clone + 'static,
    L: LedgerWriter + Clone + 'static,
    O: Outbox + Clone + 'static,
    C: Clock + Clone + 'static,
{
    pub fn new(
        source: U,
        manager: Arc<RuntimeManager<S, L, O, C>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            manager,
            cancel,
            offset: None,
            error_backoff: DEFAULT_ERROR_BACKOFF,
        }
    }

    #[must_use]
    #[allow(dead_code)] // Used in tests
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    /// Poll until cancelled. Returns an error only when polling can never
    /// succeed (the token was rejected).
    pub async fn run(mut self) -> Result<(), TransportError> {
        tracing::info!("Listening for updates");

        loop {
            let polled = tokio::select! {
                () = self.cancel.cancelled() => break,
                result = self.source.poll(self.offset) => result,
            };

            match polled {
                Ok(updates) => self.dispatch(updates).await,
                Err(e) if e.kind == TransportErrorKind::Auth => {
                    tracing::error!(error = %e, "Bot token rejected, stopping listener");
                    return Err(e);
                }
                Err(e) => {
                    let delay = e.retry_after.unwrap_or(self.error_backoff);
                    tracing::warn!(
                        error = %e,
                        retryable = e.kind.is_retryable(),
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Polling failed, backing off"
                    );
                    tokio::select! {
                        () = self.cancel.cancelled() => break,
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        tracing::info!("Listener stopped");
        Ok(())
    }

    async fn dispatch(&mut self, updates: Vec<Update>) {
        for update in updates {
            // Acknowledge everything we have seen, text or not
            self.offset = Some(update.update_id + 1);

            let Some((user, text)) = update.inbound_text() else {
                tracing::debug!(update_id = update.update_id, "Skipping non-text update");
                continue;
            };

            let event = Event::from_message_text(text);
            if let Err(e) = self.manager.send_event(user, event).await {
                tracing::error!(user_id = %user, error = %e, "Failed to dispatch update");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::Keyboard;
    use crate::ledger::Sheet;
    use crate::runtime::testing::{
        empty_update, text_update, FixedClock, MockLedger, MockUpdateSource, RecordingOutbox,
    };
    use crate::session::InMemorySessionStore;
    use crate::state_machine::{prompts, UserId};

    type TestManager =
        RuntimeManager<Arc<InMemorySessionStore>, Arc<MockLedger>, Arc<RecordingOutbox>, FixedClock>;

    fn manager() -> (Arc<TestManager>, Arc<MockLedger>, Arc<RecordingOutbox>) {
        let ledger = Arc::new(MockLedger::new());
        let outbox = Arc::new(RecordingOutbox::new());
        let manager = Arc::new(RuntimeManager::new(
            Arc::new(InMemorySessionStore::new()),
            ledger.clone(),
            outbox.clone(),
            FixedClock::ymd(2025, 6, 1),
            "₽",
        ));
        (manager, ledger, outbox)
    }

    /// Run the listener until the source has been polled `polls` times
    async fn run_for(
        source: Arc<MockUpdateSource>,
        manager: Arc<TestManager>,
        polls: usize,
    ) -> Result<(), TransportError> {
        let cancel = CancellationToken::new();
        let listener = Listener::new(source.clone(), manager.clone(), cancel.clone())
            .with_error_backoff(Duration::from_millis(1));
        let task = tokio::spawn(listener.run());

        tokio::time::timeout(Duration::from_secs(5), async {
            while source.poll_count() < polls && !task.is_finished() {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .unwrap();

        cancel.cancel();
        let result = task.await.unwrap();
        manager.shutdown().await;
        result
    }

    #[tokio::test]
    async fn test_dispatches_text_and_advances_offset() {
        let (manager, ledger, outbox) = manager();
        let source = Arc::new(MockUpdateSource::new());
        let user = UserId(5);
        source.queue_batch(vec![
            text_update(10, user, "/start"),
            text_update(11, user, "Income"),
            empty_update(12),
        ]);
        source.queue_batch(vec![
            text_update(13, user, "500"),
            text_update(14, user, "bonus"),
        ]);

        run_for(source.clone(), manager, 4).await.unwrap();

        let offsets = source.recorded_offsets();
        assert_eq!(offsets[..3], [None, Some(13), Some(15)]);

        let sent = outbox.sent();
        assert_eq!(sent[0].text, prompts::GREETING);
        assert_eq!(sent[0].keyboard, Some(Keyboard::MainMenu));
        assert_eq!(ledger.rows().len(), 1);
        assert_eq!(ledger.rows()[0].0, Sheet::Income);
    }

    #[tokio::test]
    async fn test_keeps_polling_after_network_error() {
        let (manager, _ledger, outbox) = manager();
        let source = Arc::new(MockUpdateSource::new());
        source.queue_error(TransportError::network("connection reset"));
        source.queue_batch(vec![text_update(1, UserId(3), "Expense")]);

        run_for(source.clone(), manager, 3).await.unwrap();

        assert_eq!(source.recorded_offsets()[..2], [None, None]);
        assert_eq!(outbox.last().unwrap().text, prompts::ASK_CATEGORY);
    }

    #[tokio::test]
    async fn test_stops_on_rejected_token() {
        let (manager, _ledger, outbox) = manager();
        let source = Arc::new(MockUpdateSource::new());
        source.queue_error(TransportError::auth("Unauthorized"));

        let result = run_for(source.clone(), manager, 100).await;
        assert!(result.is_err());
        assert_eq!(source.poll_count(), 1);
        assert!(outbox.sent().is_empty());
    }
}
