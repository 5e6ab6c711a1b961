//! Pure state transition function
//!
//! One match over `(Phase, Input)`. The function performs no I/O: ledger
//! writes and replies are returned as effects for the runtime to execute.

use super::event::{parse_amount, Input};
use super::state::{Draft, Phase};
use super::{ConversationState, Effect, Event, TurnContext};
use crate::keyboard::{labels, Keyboard};
use crate::ledger::{ExpenseRecord, IncomeRecord, LedgerEntry};
use thiserror::Error;

/// User-facing prompts
pub mod prompts {
    pub const GREETING: &str = "Meow! I'm your budget bot. Where do we start?";
    pub const CHOOSE: &str = "Okay, pick one:";
    pub const IDLE_HINT: &str = "Pick Income or Expense to record something:";
    pub const FAREWELL: &str = "If anything comes up, I'm always here!";
    pub const ASK_INCOME_AMOUNT: &str = "Enter the income amount:";
    pub const ASK_INCOME_COMMENT: &str = "Add a comment to the income:";
    pub const ASK_CATEGORY: &str = "Choose an expense category:";
    pub const UNKNOWN_CATEGORY: &str = "I don't know that category. Choose one from the menu:";
    pub const ASK_SUBCATEGORY: &str = "Choose a subcategory:";
    pub const ASK_EXPENSE_AMOUNT: &str = "Enter the expense amount:";
    pub const ASK_EXPENSE_COMMENT: &str = "Add a comment to the expense:";
    pub const INVALID_AMOUNT: &str =
        "Listen, pal, I can't read kopecks or letters. Enter the amount as whole digits.";
    pub const WRITE_FAILED: &str = "Couldn't write to the ledger. It's probably open somewhere \
         else: close it and send me the last value again.";
    pub const RESET: &str = "Something went wrong with this entry, let's start over. Pick one:";
}

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConversationState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConversationState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// The entry this transition wants written, if any
    #[allow(dead_code)] // Used in tests
    pub fn write(&self) -> Option<&LedgerEntry> {
        self.effects.iter().find_map(|e| match e {
            Effect::AppendRow { entry } => Some(entry),
            Effect::Reply { .. } => None,
        })
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    /// The stored draft lacks a field its phase guarantees
    #[error("Draft in phase {phase:?} is missing {field}")]
    IncompleteDraft { phase: Phase, field: &'static str },
}

/// Pure transition function
///
/// Given the same state, context and event it always produces the same
/// result.
pub fn transition(
    state: &ConversationState,
    context: &TurnContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    let input = match event {
        Event::Start => return Ok(greet(state)),
        Event::UserMessage { text } => Input::classify(text),
    };
    let draft = &state.draft;

    match (state.phase, input) {
        // ============================================================
        // Main menu
        // ============================================================
        (Phase::Idle, Input::Income) => Ok(to(Phase::AwaitingIncomeAmount, Draft::default())),

        (Phase::Idle, Input::Expense) => Ok(to(Phase::AwaitingExpenseCategory, Draft::default())),

        (Phase::Idle, Input::Yes) => Ok(TransitionResult::new(ConversationState::idle())
            .with_effect(Effect::reply(prompts::CHOOSE, Keyboard::MainMenu))),

        (Phase::Idle, Input::No) => Ok(TransitionResult::new(ConversationState::idle())
            .with_effect(Effect::reply(prompts::FAREWELL, Keyboard::MainMenu))),

        (Phase::Idle, Input::Back | Input::Text(_)) => {
            Ok(TransitionResult::new(ConversationState::idle())
                .with_effect(Effect::reply(prompts::IDLE_HINT, Keyboard::MainMenu)))
        }

        // ============================================================
        // Income flow
        // ============================================================
        (Phase::AwaitingIncomeAmount, Input::Back) => Ok(cancel()),

        (Phase::AwaitingIncomeAmount, input) => match parse_amount(&input.into_text()) {
            Ok(amount) => Ok(to(
                Phase::AwaitingIncomeComment,
                Draft {
                    amount: Some(amount),
                    ..draft.clone()
                },
            )),
            Err(_) => Ok(reject_amount(state)),
        },

        (Phase::AwaitingIncomeComment, Input::Back) => {
            Ok(to(Phase::AwaitingIncomeAmount, draft.clone()))
        }

        (Phase::AwaitingIncomeComment, input) => {
            let amount = require(state, draft.amount, "amount")?;
            Ok(commit(
                LedgerEntry::Income(IncomeRecord {
                    date: context.today,
                    amount,
                    comment: input.into_text(),
                }),
                context,
            ))
        }

        // ============================================================
        // Expense flow
        // ============================================================
        (Phase::AwaitingExpenseCategory, Input::Back) => Ok(cancel()),

        (Phase::AwaitingExpenseCategory, Input::Text(category))
            if labels::is_expense_category(&category) =>
        {
            let next = if category == labels::MANDATORY_SPENDING {
                Phase::AwaitingExpenseSubcategory
            } else {
                Phase::AwaitingExpenseAmount
            };
            Ok(to(
                next,
                Draft {
                    category: Some(category),
                    ..Draft::default()
                },
            ))
        }

        (Phase::AwaitingExpenseCategory, _) => Ok(TransitionResult::new(state.clone())
            .with_effect(Effect::reply(prompts::UNKNOWN_CATEGORY, Keyboard::ExpenseCategories))),

        (Phase::AwaitingExpenseSubcategory, Input::Back) => {
            Ok(to(Phase::AwaitingExpenseCategory, draft.clone()))
        }

        (Phase::AwaitingExpenseSubcategory, input) => Ok(to(
            Phase::AwaitingExpenseAmount,
            Draft {
                comment: Some(input.into_text()),
                ..draft.clone()
            },
        )),

        (Phase::AwaitingExpenseAmount, Input::Back) => {
            let previous = if draft.is_mandatory_spending() {
                Phase::AwaitingExpenseSubcategory
            } else {
                Phase::AwaitingExpenseCategory
            };
            Ok(to(previous, draft.clone()))
        }

        (Phase::AwaitingExpenseAmount, input) => {
            let Ok(amount) = parse_amount(&input.into_text()) else {
                return Ok(reject_amount(state));
            };

            if draft.is_mandatory_spending() {
                // The subcategory stands in for the comment
                let category = require(state, draft.category.clone(), "category")?;
                let comment = require(state, draft.comment.clone(), "subcategory")?;
                Ok(commit(
                    LedgerEntry::Expense(ExpenseRecord {
                        date: context.today,
                        category,
                        amount,
                        comment,
                    }),
                    context,
                ))
            } else {
                Ok(to(
                    Phase::AwaitingExpenseComment,
                    Draft {
                        amount: Some(amount),
                        ..draft.clone()
                    },
                ))
            }
        }

        (Phase::AwaitingExpenseComment, Input::Back) => {
            Ok(to(Phase::AwaitingExpenseAmount, draft.clone()))
        }

        (Phase::AwaitingExpenseComment, input) => {
            let category = require(state, draft.category.clone(), "category")?;
            let amount = require(state, draft.amount, "amount")?;
            Ok(commit(
                LedgerEntry::Expense(ExpenseRecord {
                    date: context.today,
                    category,
                    amount,
                    comment: input.into_text(),
                }),
                context,
            ))
        }
    }
}

/// The prompt that asks for whatever `phase` is waiting on
pub fn step_prompt(phase: Phase) -> Effect {
    match phase {
        Phase::Idle => Effect::reply(prompts::CHOOSE, Keyboard::MainMenu),
        Phase::AwaitingIncomeAmount => Effect::reply(prompts::ASK_INCOME_AMOUNT, Keyboard::BackOnly),
        Phase::AwaitingIncomeComment => {
            Effect::reply(prompts::ASK_INCOME_COMMENT, Keyboard::BackOnly)
        }
        Phase::AwaitingExpenseCategory => {
            Effect::reply(prompts::ASK_CATEGORY, Keyboard::ExpenseCategories)
        }
        Phase::AwaitingExpenseSubcategory => {
            Effect::reply(prompts::ASK_SUBCATEGORY, Keyboard::MandatorySubcategories)
        }
        Phase::AwaitingExpenseAmount => {
            Effect::reply(prompts::ASK_EXPENSE_AMOUNT, Keyboard::BackOnly)
        }
        Phase::AwaitingExpenseComment => {
            Effect::reply(prompts::ASK_EXPENSE_COMMENT, Keyboard::BackOnly)
        }
    }
}

/// Confirmation sent after a successful write
pub fn confirmation(entry: &LedgerEntry, currency: &str) -> String {
    let kind = match entry {
        LedgerEntry::Income(_) => "Income",
        LedgerEntry::Expense(_) => "Expense",
    };
    format!(
        "{kind} {}{currency} recorded! Anything else to record?",
        entry.amount()
    )
}

// Helper functions

fn to(phase: Phase, draft: Draft) -> TransitionResult {
    TransitionResult::new(ConversationState::new(phase, draft)).with_effect(step_prompt(phase))
}

/// Back from an entry point: drop the draft, show the main menu
fn cancel() -> TransitionResult {
    TransitionResult::new(ConversationState::idle())
        .with_effect(Effect::reply(prompts::CHOOSE, Keyboard::MainMenu))
}

fn reject_amount(state: &ConversationState) -> TransitionResult {
    TransitionResult::new(state.clone()).with_effect(Effect::notice(prompts::INVALID_AMOUNT))
}

fn commit(entry: LedgerEntry, context: &TurnContext) -> TransitionResult {
    let text = confirmation(&entry, &context.currency);
    TransitionResult::new(ConversationState::idle())
        .with_effect(Effect::append(entry))
        .with_effect(Effect::reply(text, Keyboard::YesNo))
}

fn greet(state: &ConversationState) -> TransitionResult {
    if state.phase == Phase::Idle {
        TransitionResult::new(ConversationState::idle())
            .with_effect(Effect::reply(prompts::GREETING, Keyboard::MainMenu))
    } else {
        // Mid-flow: say hello, then ask again for what we were waiting on
        TransitionResult::new(state.clone())
            .with_effect(Effect::notice(prompts::GREETING))
            .with_effect(step_prompt(state.phase))
    }
}

fn require<T>(
    state: &ConversationState,
    value: Option<T>,
    field: &'static str,
) -> Result<T, TransitionError> {
    value.ok_or(TransitionError::IncompleteDraft {
        phase: state.phase,
        field,
    })
}
