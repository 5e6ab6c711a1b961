//! Conversation runtime executor

use super::traits::{Clock, LedgerWriter, Outbox, SessionStore};
use crate::keyboard::Keyboard;
use crate::state_machine::{
    prompts, transition, ConversationState, Effect, Event, TurnContext, UserId,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// How long a worker waits for the next message before exiting
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(600);

/// How a single event was resolved, for logging and tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// New state committed, replies sent
    Committed,
    /// A ledger write failed; the previous state was kept
    WriteFailed,
    /// The stored state was inconsistent and has been reset
    Reset,
}

/// Worker that owns one user's conversation and processes its events in order
pub struct ConversationRuntime<S, L, O, C>
where
    S: SessionStore + 'static,
    L: LedgerWriter + 'static,
    O: Outbox + 'static,
    C: Clock + 'static,
{
    user_id: UserId,
    currency: String,
    store: S,
    ledger: L,
    outbox: O,
    clock: C,
    event_rx: mpsc::Receiver<Event>,
    cancel: CancellationToken,
    idle_timeout: Duration,
}

impl<S, L, O, C> ConversationRuntime<S, L, O, C>
where
    S: SessionStore + 'static,
    L: LedgerWriter + 'static,
    O: Outbox + 'static,
    C: Clock + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: UserId,
        currency: impl Into<String>,
        store: S,
        ledger: L,
        outbox: O,
        clock: C,
        event_rx: mpsc::Receiver<Event>,
    ) -> Self {
        Self {
            user_id,
            currency: currency.into(),
            store,
            ledger,
            outbox,
            clock,
            event_rx,
            cancel: CancellationToken::new(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub async fn run(mut self) {
        tracing::debug!(user_id = %self.user_id, "Starting conversation runtime");

        // One event at a time: transitions for a user never interleave
        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    tracing::debug!(user_id = %self.user_id, "Conversation runtime cancelled");
                    break;
                }
                event = self.event_rx.recv() => match event {
                    Some(event) => {
                        self.process_event(event).await;
                    }
                    None => break,
                },
                () = tokio::time::sleep(self.idle_timeout) => {
                    tracing::debug!(user_id = %self.user_id, "Conversation runtime idle");
                    break;
                }
            }
        }

        self.drain().await;
        tracing::debug!(user_id = %self.user_id, "Conversation runtime stopped");
    }

    /// Refuse new events, then finish the ones already queued
    async fn drain(&mut self) {
        self.event_rx.close();
        while let Some(event) = self.event_rx.recv().await {
            self.process_event(event).await;
        }
    }

    pub(crate) async fn process_event(&mut self, event: Event) -> StepOutcome {
        let state = self.store.get(self.user_id).await;
        let context = TurnContext::new(self.clock.today(), self.currency.clone());

        // Pure state transition
        let result = match transition(&state, &context, event) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(
                    user_id = %self.user_id,
                    phase = ?state.phase,
                    error = %e,
                    "Inconsistent conversation state, resetting"
                );
                self.store.clear(self.user_id).await;
                self.reply(prompts::RESET, Some(Keyboard::MainMenu)).await;
                return StepOutcome::Reset;
            }
        };

        tracing::debug!(
            user_id = %self.user_id,
            from = ?state.phase,
            to = ?result.new_state.phase,
            "Transition"
        );

        let (writes, replies): (Vec<Effect>, Vec<Effect>) =
            result.effects.into_iter().partition(Effect::is_write);

        // Writes first; the new state only counts if every write landed
        for effect in writes {
            if let Effect::AppendRow { entry } = effect {
                let sheet = entry.sheet();
                match self.ledger.append(sheet, &entry.row()).await {
                    Ok(()) => {
                        tracing::info!(
                            user_id = %self.user_id,
                            sheet = %sheet,
                            amount = entry.amount(),
                            "Ledger row appended"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(
                            user_id = %self.user_id,
                            sheet = %sheet,
                            phase = ?state.phase,
                            error = %e,
                            "Ledger write failed, keeping draft for retry"
                        );
                        self.reply(prompts::WRITE_FAILED, None).await;
                        return StepOutcome::WriteFailed;
                    }
                }
            }
        }

        self.commit(result.new_state).await;

        for effect in replies {
            if let Effect::Reply { text, keyboard } = effect {
                self.reply(&text, keyboard).await;
            }
        }

        StepOutcome::Committed
    }

    async fn commit(&self, state: ConversationState) {
        if state.is_idle() {
            self.store.clear(self.user_id).await;
        } else {
            self.store.set(self.user_id, state).await;
        }
    }

    /// Send failures are logged; the conversation has already moved on
    async fn reply(&self, text: &str, keyboard: Option<Keyboard>) {
        if let Err(e) = self.outbox.send(self.user_id, text, keyboard).await {
            tracing::error!(
                user_id = %self.user_id,
                error = %e,
                retryable = e.kind.is_retryable(),
                "Failed to send reply"
            );
        }
    }
}
