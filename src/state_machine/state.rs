//! Conversation state types

use crate::keyboard::labels;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of the chat a conversation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Phase
// ============================================================================

/// The step of data collection a conversation is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Main menu, nothing being collected
    #[default]
    Idle,
    AwaitingIncomeAmount,
    AwaitingIncomeComment,
    AwaitingExpenseCategory,
    /// Only reached through the mandatory spending category
    AwaitingExpenseSubcategory,
    AwaitingExpenseAmount,
    AwaitingExpenseComment,
}

impl Phase {
    #[allow(dead_code)] // Used by property tests
    pub const ALL: [Phase; 7] = [
        Phase::Idle,
        Phase::AwaitingIncomeAmount,
        Phase::AwaitingIncomeComment,
        Phase::AwaitingExpenseCategory,
        Phase::AwaitingExpenseSubcategory,
        Phase::AwaitingExpenseAmount,
        Phase::AwaitingExpenseComment,
    ];
}

// ============================================================================
// Draft
// ============================================================================

/// Partially filled record accumulated across a flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Draft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Free-text comment, or the chosen subcategory for mandatory spending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Only ever set from validated digit-only input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
}

impl Draft {
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.comment.is_none() && self.amount.is_none()
    }

    /// Whether the chosen category substitutes a subcategory for the comment
    pub fn is_mandatory_spending(&self) -> bool {
        self.category.as_deref() == Some(labels::MANDATORY_SPENDING)
    }
}

// ============================================================================
// Conversation State
// ============================================================================

/// Per-user conversation state: where we are and what has been collected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConversationState {
    pub phase: Phase,
    #[serde(default)]
    pub draft: Draft,
}

impl ConversationState {
    pub fn new(phase: Phase, draft: Draft) -> Self {
        Self { phase, draft }
    }

    /// `Idle` with an empty draft
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle && self.draft.is_empty()
    }
}

/// Per-turn context handed to the transition function
#[derive(Debug, Clone)]
pub struct TurnContext {
    /// Date stamped onto ledger rows written during this turn
    pub today: chrono::NaiveDate,
    /// Symbol appended to amounts in confirmations
    pub currency: String,
}

impl TurnContext {
    pub fn new(today: chrono::NaiveDate, currency: impl Into<String>) -> Self {
        Self {
            today,
            currency: currency.into(),
        }
    }
}
