//! Effects produced by state transitions

use crate::keyboard::Keyboard;
use crate::ledger::LedgerEntry;

/// Effects to be executed after a state transition.
///
/// The runtime executes every `AppendRow` before committing the new state;
/// if one fails, the new state and the remaining effects are discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Append a completed record to the ledger
    AppendRow { entry: LedgerEntry },

    /// Send a message to the user. `None` leaves the current keyboard in place.
    Reply {
        text: String,
        keyboard: Option<Keyboard>,
    },
}

impl Effect {
    pub fn reply(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Effect::Reply {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }

    /// Reply without changing the keyboard
    pub fn notice(text: impl Into<String>) -> Self {
        Effect::Reply {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn append(entry: LedgerEntry) -> Self {
        Effect::AppendRow { entry }
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Effect::AppendRow { .. })
    }
}
