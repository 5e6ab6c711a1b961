//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use crate::keyboard::Keyboard;
use crate::ledger::{Cell, Sheet, WriteError};
use crate::state_machine::UserId;
use crate::transport::types::{Chat, Message, User};
use crate::transport::{TransportError, Update};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

// ============================================================================
// Mock Ledger
// ============================================================================

/// Ledger that records appended rows and fails on demand
#[derive(Default)]
pub struct MockLedger {
    rows: Mutex<Vec<(Sheet, Vec<Cell>)>>,
    failures: Mutex<VecDeque<WriteError>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next append fail with `error`
    pub fn fail_next(&self, error: WriteError) {
        self.failures.lock().unwrap().push_back(error);
    }

    pub fn rows(&self) -> Vec<(Sheet, Vec<Cell>)> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerWriter for MockLedger {
    async fn append(&self, sheet: Sheet, row: &[Cell]) -> Result<(), WriteError> {
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        self.rows.lock().unwrap().push((sheet, row.to_vec()));
        Ok(())
    }
}

// ============================================================================
// Recording Outbox
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub user: UserId,
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

/// Outbox that keeps every message it was asked to send
#[derive(Default)]
pub struct RecordingOutbox {
    sent: Mutex<Vec<SentMessage>>,
    fail: AtomicBool,
}

impl RecordingOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send fail (still recorded)
    pub fn fail_all(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, user: UserId) -> Vec<SentMessage> {
        self.sent().into_iter().filter(|m| m.user == user).collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.text).collect()
    }

    pub fn last(&self) -> Option<SentMessage> {
        self.sent.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Outbox for RecordingOutbox {
    async fn send(
        &self,
        user: UserId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(SentMessage {
            user,
            text: text.to_string(),
            keyboard,
        });
        if self.fail.load(Ordering::SeqCst) {
            return Err(TransportError::network("mock send failure"));
        }
        Ok(())
    }
}

// ============================================================================
// Fixed Clock
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDate);

impl FixedClock {
    pub fn ymd(year: i32, month: u32, day: u32) -> Self {
        Self(NaiveDate::from_ymd_opt(year, month, day).unwrap())
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

// ============================================================================
// Mock Update Source
// ============================================================================

/// Update source that hands out queued batches, then errors or empties
#[derive(Default)]
pub struct MockUpdateSource {
    batches: Mutex<VecDeque<Result<Vec<Update>, TransportError>>>,
    /// Offsets passed to each poll
    pub offsets: Mutex<Vec<Option<i64>>>,
    polls: AtomicUsize,
}

impl MockUpdateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_batch(&self, updates: Vec<Update>) {
        self.batches.lock().unwrap().push_back(Ok(updates));
    }

    pub fn queue_error(&self, error: TransportError) {
        self.batches.lock().unwrap().push_back(Err(error));
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn recorded_offsets(&self) -> Vec<Option<i64>> {
        self.offsets.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpdateSource for MockUpdateSource {
    async fn poll(&self, offset: Option<i64>) -> Result<Vec<Update>, TransportError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.offsets.lock().unwrap().push(offset);
        let next = self.batches.lock().unwrap().pop_front();
        match next {
            Some(batch) => batch,
            None => {
                // Nothing queued: behave like an idle long poll
                tokio::task::yield_now().await;
                Ok(Vec::new())
            }
        }
    }
}

/// A text message update from a person
pub fn text_update(update_id: i64, user: UserId, text: &str) -> Update {
    Update {
        update_id,
        message: Some(Message {
            chat: Chat { id: user.0 },
            from: Some(User {
                id: user.0,
                is_bot: false,
                first_name: "Test".to_string(),
                username: None,
            }),
            text: Some(text.to_string()),
        }),
    }
}

/// An update that carries no text (a sticker, an edit, ...)
pub fn empty_update(update_id: i64) -> Update {
    Update {
        update_id,
        message: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_ledger_fails_once_then_records() {
        let ledger = MockLedger::new();
        ledger.fail_next(WriteError::Locked);

        let row = vec![Cell::from(1u64)];
        assert_eq!(
            ledger.append(Sheet::Income, &row).await,
            Err(WriteError::Locked)
        );
        assert!(ledger.rows().is_empty());

        ledger.append(Sheet::Income, &row).await.unwrap();
        assert_eq!(ledger.rows(), vec![(Sheet::Income, row)]);
    }

    #[tokio::test]
    async fn test_recording_outbox_filters_by_user() {
        let outbox = RecordingOutbox::new();
        outbox.send(UserId(1), "a", None).await.unwrap();
        outbox
            .send(UserId(2), "b", Some(Keyboard::MainMenu))
            .await
            .unwrap();

        assert_eq!(outbox.sent_to(UserId(2)).len(), 1);
        assert_eq!(outbox.last().unwrap().keyboard, Some(Keyboard::MainMenu));
        assert_eq!(outbox.texts(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_mock_update_source_drains_queue() {
        let source = MockUpdateSource::new();
        source.queue_batch(vec![text_update(1, UserId(7), "hi")]);
        source.queue_error(TransportError::network("down"));

        assert_eq!(source.poll(None).await.unwrap().len(), 1);
        assert!(source.poll(Some(2)).await.is_err());
        assert!(source.poll(Some(2)).await.unwrap().is_empty());
        assert_eq!(source.poll_count(), 3);
        assert_eq!(source.recorded_offsets(), vec![None, Some(2), Some(2)]);
    }
}
