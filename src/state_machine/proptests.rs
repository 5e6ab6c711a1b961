//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::event::{parse_amount, AmountError};
use super::state::*;
use super::transition::*;
use super::*;
use crate::keyboard::labels;
use crate::ledger::{LedgerEntry, Sheet};
use chrono::NaiveDate;
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> TurnContext {
    TurnContext::new(NaiveDate::from_ymd_opt(2025, 2, 14).unwrap(), "₽")
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_phase() -> impl Strategy<Value = Phase> {
    proptest::sample::select(Phase::ALL.to_vec())
}

fn arb_category() -> impl Strategy<Value = String> {
    proptest::sample::select(labels::EXPENSE_CATEGORIES.to_vec()).prop_map(String::from)
}

fn arb_draft() -> impl Strategy<Value = Draft> {
    (
        proptest::option::of(arb_category()),
        proptest::option::of("[a-zA-Z ]{1,12}"),
        proptest::option::of(0u64..1_000_000),
    )
        .prop_map(|(category, comment, amount)| Draft {
            category,
            comment,
            amount,
        })
}

fn arb_state() -> impl Strategy<Value = ConversationState> {
    (arb_phase(), arb_draft()).prop_map(|(phase, draft)| ConversationState::new(phase, draft))
}

/// A state the engine itself could have produced for `phase`
fn arb_reachable_state() -> impl Strategy<Value = ConversationState> {
    (arb_phase(), arb_category(), "[a-zA-Z]{1,10}", 0u64..1_000_000).prop_map(
        |(phase, category, comment, amount)| {
            let draft = match phase {
                Phase::Idle | Phase::AwaitingIncomeAmount | Phase::AwaitingExpenseCategory => {
                    Draft::default()
                }
                Phase::AwaitingIncomeComment => Draft {
                    amount: Some(amount),
                    ..Draft::default()
                },
                Phase::AwaitingExpenseSubcategory => Draft {
                    category: Some(labels::MANDATORY_SPENDING.into()),
                    ..Draft::default()
                },
                Phase::AwaitingExpenseAmount => {
                    if category == labels::MANDATORY_SPENDING {
                        Draft {
                            category: Some(category),
                            comment: Some(comment),
                            amount: None,
                        }
                    } else {
                        Draft {
                            category: Some(category),
                            ..Draft::default()
                        }
                    }
                }
                Phase::AwaitingExpenseComment => Draft {
                    category: Some(category),
                    comment: None,
                    amount: Some(amount),
                },
            };
            ConversationState::new(phase, draft)
        },
    )
}

/// Text containing at least one character that is not an ASCII digit
fn arb_non_numeric() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[0-9]{0,4}[^0-9][0-9]{0,4}",
        "-[0-9]{1,5}",
        "[0-9]{1,4}\\.[0-9]{1,2}",
        "[a-zA-Z ]{1,10}",
    ]
    .prop_filter("must contain a non-digit or be empty", |s| {
        s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit())
    })
}

fn arb_input_text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(labels::BACK.to_string()),
        Just(labels::INCOME.to_string()),
        Just(labels::EXPENSE.to_string()),
        Just(labels::YES.to_string()),
        Just(labels::NO.to_string()),
        arb_category(),
        "[0-9]{1,6}",
        "[a-zA-Z .,-]{0,12}",
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_digit_strings_parse_to_their_value(value in 0u64..=u64::from(u32::MAX), zeros in 0usize..3) {
        let text = format!("{}{value}", "0".repeat(zeros));
        prop_assert_eq!(parse_amount(&text), Ok(value));
    }

    #[test]
    fn prop_non_numeric_is_rejected(text in arb_non_numeric()) {
        let result = parse_amount(&text);
        prop_assert!(matches!(result, Err(AmountError::Empty | AmountError::NotDigits)));
    }

    #[test]
    fn prop_invalid_amount_leaves_state_unchanged(
        draft in arb_draft(),
        expense in any::<bool>(),
        attempts in proptest::collection::vec(arb_non_numeric(), 1..10),
    ) {
        let phase = if expense { Phase::AwaitingExpenseAmount } else { Phase::AwaitingIncomeAmount };
        let start = ConversationState::new(phase, draft);
        let mut current = start.clone();

        for text in attempts {
            // "Back" is the only non-numeric input with a meaning here
            prop_assume!(text != labels::BACK);
            let result = transition(&current, &test_context(), Event::text(text)).unwrap();
            prop_assert!(result.write().is_none());
            current = result.new_state;
        }

        prop_assert_eq!(current, start);
    }

    #[test]
    fn prop_back_from_income_amount_always_resets(draft in arb_draft()) {
        let state = ConversationState::new(Phase::AwaitingIncomeAmount, draft);
        let result = transition(&state, &test_context(), Event::text(labels::BACK)).unwrap();
        prop_assert!(result.new_state.is_idle());
        prop_assert!(result.write().is_none());
    }

    #[test]
    fn prop_reachable_states_never_error(
        state in arb_reachable_state(),
        inputs in proptest::collection::vec(arb_input_text(), 1..12),
    ) {
        let mut current = state;
        for text in inputs {
            let result = transition(&current, &test_context(), Event::text(text));
            prop_assert!(result.is_ok(), "error from {:?}", current);
            current = result.unwrap().new_state;
        }
    }

    #[test]
    fn prop_every_step_replies(
        state in arb_reachable_state(),
        text in arb_input_text(),
    ) {
        let result = transition(&state, &test_context(), Event::text(text)).unwrap();
        prop_assert!(
            result.effects.iter().any(|e| matches!(e, Effect::Reply { .. })),
            "no reply from {:?}", state
        );
    }

    #[test]
    fn prop_writes_end_at_clean_idle(
        state in arb_reachable_state(),
        text in arb_input_text(),
    ) {
        let result = transition(&state, &test_context(), Event::text(text)).unwrap();
        if let Some(entry) = result.write() {
            prop_assert!(result.new_state.is_idle());
            prop_assert_eq!(result.effects.iter().filter(|e| e.is_write()).count(), 1);
            // The write always comes before the confirmation
            prop_assert!(result.effects[0].is_write());
            match entry {
                LedgerEntry::Income(r) => {
                    prop_assert_eq!(entry.sheet(), Sheet::Income);
                    prop_assert_eq!(r.date, test_context().today);
                }
                LedgerEntry::Expense(r) => {
                    prop_assert_eq!(entry.sheet(), Sheet::Expense);
                    prop_assert!(labels::is_expense_category(&r.category));
                }
            }
        }
    }

    #[test]
    fn prop_amount_only_set_from_digits(
        state in arb_reachable_state(),
        text in arb_input_text(),
    ) {
        let result = transition(&state, &test_context(), Event::text(text.clone())).unwrap();
        let before = state.draft.amount;
        let after = result.new_state.draft.amount;
        if after.is_some() && after != before {
            prop_assert_eq!(parse_amount(&text).ok(), after);
        }
    }

    #[test]
    fn prop_start_never_changes_phase(state in arb_state()) {
        let result = transition(&state, &test_context(), Event::Start).unwrap();
        prop_assert_eq!(result.new_state.phase, state.phase);
        prop_assert!(result.write().is_none());
    }
}
