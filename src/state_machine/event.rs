//! Events that can occur in a conversation

use crate::keyboard::labels;

/// Largest amount accepted; the ledger stores amounts as signed 64-bit integers
pub const MAX_AMOUNT: u64 = i64::MAX.unsigned_abs();

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The `/start` command
    Start,
    /// Any other text message or button press
    UserMessage { text: String },
}

impl Event {
    pub fn text(text: impl Into<String>) -> Self {
        Event::UserMessage { text: text.into() }
    }

    /// Classify raw message text, recognising `/start` (with optional
    /// `@botname` suffix or deep-link payload).
    pub fn from_message_text(text: &str) -> Self {
        let command = text.split_whitespace().next().unwrap_or("");
        let command = command.split('@').next().unwrap_or("");
        if command == "/start" {
            Event::Start
        } else {
            Event::text(text)
        }
    }
}

/// Inbound token classified against the fixed button labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Back,
    Income,
    Expense,
    Yes,
    No,
    Text(String),
}

impl Input {
    pub fn classify(text: String) -> Self {
        match text.as_str() {
            labels::BACK => Input::Back,
            labels::INCOME => Input::Income,
            labels::EXPENSE => Input::Expense,
            labels::YES => Input::Yes,
            labels::NO => Input::No,
            _ => Input::Text(text),
        }
    }

    /// The text the user actually sent. Phases that accept free text treat
    /// button labels other than Back as ordinary text.
    pub fn into_text(self) -> String {
        match self {
            Input::Back => labels::BACK.to_string(),
            Input::Income => labels::INCOME.to_string(),
            Input::Expense => labels::EXPENSE.to_string(),
            Input::Yes => labels::YES.to_string(),
            Input::No => labels::NO.to_string(),
            Input::Text(text) => text,
        }
    }
}

/// Why an amount was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("amount must contain only decimal digits")]
    NotDigits,
    #[error("amount is too large")]
    TooLarge,
}

/// Parse a digit-only string into an amount.
///
/// Signs, decimal points, separators and surrounding whitespace are all
/// rejected the same way as letters.
pub fn parse_amount(text: &str) -> Result<u64, AmountError> {
    if text.is_empty() {
        return Err(AmountError::Empty);
    }
    if !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AmountError::NotDigits);
    }
    let amount = text.parse::<u64>().map_err(|_| AmountError::TooLarge)?;
    if amount > MAX_AMOUNT {
        return Err(AmountError::TooLarge);
    }
    Ok(amount)
}
