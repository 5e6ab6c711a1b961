//! Ledger schema and record types

use chrono::NaiveDate;
use std::fmt;

/// SQL schema for initialization. Each sheet is one table; `row_id` keeps
/// append order.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS "Income" (
    row_id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,
    amount INTEGER NOT NULL,
    comment TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS "Expense" (
    row_id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,
    category TEXT NOT NULL,
    amount INTEGER NOT NULL,
    comment TEXT NOT NULL
);
"#;

/// Format used for the date column
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// Sheets and cells
// ============================================================================

/// Kind of value a column holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Date,
    Integer,
    Text,
}

/// Column definition of a sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: CellKind,
}

const INCOME_COLUMNS: &[Column] = &[
    Column { name: "date", kind: CellKind::Date },
    Column { name: "amount", kind: CellKind::Integer },
    Column { name: "comment", kind: CellKind::Text },
];

const EXPENSE_COLUMNS: &[Column] = &[
    Column { name: "date", kind: CellKind::Date },
    Column { name: "category", kind: CellKind::Text },
    Column { name: "amount", kind: CellKind::Integer },
    Column { name: "comment", kind: CellKind::Text },
];

/// Named sheet of the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sheet {
    Income,
    Expense,
}

impl Sheet {
    pub fn name(self) -> &'static str {
        match self {
            Sheet::Income => "Income",
            Sheet::Expense => "Expense",
        }
    }

    pub fn columns(self) -> &'static [Column] {
        match self {
            Sheet::Income => INCOME_COLUMNS,
            Sheet::Expense => EXPENSE_COLUMNS,
        }
    }
}

impl fmt::Display for Sheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One field of a ledger row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Date(NaiveDate),
    Integer(u64),
    Text(String),
}

impl Cell {
    pub fn kind(&self) -> CellKind {
        match self {
            Cell::Date(_) => CellKind::Date,
            Cell::Integer(_) => CellKind::Integer,
            Cell::Text(_) => CellKind::Text,
        }
    }
}

impl From<NaiveDate> for Cell {
    fn from(date: NaiveDate) -> Self {
        Cell::Date(date)
    }
}

impl From<u64> for Cell {
    fn from(value: u64) -> Self {
        Cell::Integer(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

// ============================================================================
// Records
// ============================================================================

/// A completed income entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomeRecord {
    pub date: NaiveDate,
    pub amount: u64,
    pub comment: String,
}

/// A completed expense entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseRecord {
    pub date: NaiveDate,
    pub category: String,
    pub amount: u64,
    pub comment: String,
}

/// Any record that can be appended to the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEntry {
    Income(IncomeRecord),
    Expense(ExpenseRecord),
}

impl LedgerEntry {
    pub fn sheet(&self) -> Sheet {
        match self {
            LedgerEntry::Income(_) => Sheet::Income,
            LedgerEntry::Expense(_) => Sheet::Expense,
        }
    }

    pub fn amount(&self) -> u64 {
        match self {
            LedgerEntry::Income(r) => r.amount,
            LedgerEntry::Expense(r) => r.amount,
        }
    }

    /// Cells in sheet column order
    pub fn row(&self) -> Vec<Cell> {
        match self {
            LedgerEntry::Income(r) => vec![
                r.date.into(),
                r.amount.into(),
                r.comment.clone().into(),
            ],
            LedgerEntry::Expense(r) => vec![
                r.date.into(),
                r.category.clone().into(),
                r.amount.into(),
                r.comment.clone().into(),
            ],
        }
    }
}
