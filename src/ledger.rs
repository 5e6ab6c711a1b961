//! Ledger storage
//!
//! Two append-only sheets, `Income` and `Expense`, kept as tables in a
//! single SQLite file. Appends from every conversation go through one
//! connection guarded by a mutex, so each insert is a critical section.

mod schema;

pub use schema::*;

use chrono::NaiveDate;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, ErrorCode};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

/// How long an append waits for a lock held by another process
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Ledger database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Corrupt row in sheet {sheet}: {reason}")]
    Corrupt { sheet: Sheet, reason: String },
    #[error("Ledger connection poisoned by a panicked writer")]
    Poisoned,
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Why an append did not happen. No partial rows are ever written.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    #[error("Ledger is locked by another process")]
    Locked,
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
    #[error("Row does not fit sheet {sheet}: {reason}")]
    RowShape { sheet: Sheet, reason: String },
}

impl From<rusqlite::Error> for WriteError {
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => WriteError::Locked,
            _ => WriteError::Unavailable(e.to_string()),
        }
    }
}

/// Thread-safe ledger handle
#[derive(Clone)]
pub struct SqliteLedger {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLedger {
    /// Open or create the ledger at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> LedgerResult<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    pub fn open_with_timeout<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> LedgerResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        Self::init(conn)
    }

    /// Open an in-memory ledger (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> LedgerResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> LedgerResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, LedgerError> {
        self.conn.lock().map_err(|_| LedgerError::Poisoned)
    }

    /// Append one row to a sheet inside a single transaction
    pub fn append_row(&self, sheet: Sheet, row: &[Cell]) -> Result<(), WriteError> {
        let values = row_to_sql(sheet, row)?;
        let sql = insert_sql(sheet);

        let mut conn = self
            .conn
            .lock()
            .map_err(|_| WriteError::Unavailable("ledger connection poisoned".to_string()))?;
        let tx = conn.transaction()?;
        tx.execute(&sql, params_from_iter(values))?;
        tx.commit()?;
        Ok(())
    }

    /// Append a completed record to its sheet
    #[allow(dead_code)] // Convenience for callers holding a typed record
    pub fn append_entry(&self, entry: &LedgerEntry) -> Result<(), WriteError> {
        self.append_row(entry.sheet(), &entry.row())
    }

    /// All rows of a sheet in append order
    #[allow(dead_code)] // Read back by tests and diagnostics
    pub fn rows(&self, sheet: Sheet) -> LedgerResult<Vec<Vec<Cell>>> {
        let conn = self.lock()?;
        let columns = sheet.columns();
        let names: Vec<&str> = columns.iter().map(|c| c.name).collect();
        let sql = format!(
            "SELECT {} FROM \"{}\" ORDER BY row_id",
            names.join(", "),
            sheet.name()
        );

        let mut stmt = conn.prepare(&sql)?;
        let raw_rows = stmt.query_map([], |row| {
            (0..columns.len())
                .map(|i| row.get::<_, SqlValue>(i))
                .collect::<Result<Vec<_>, _>>()
        })?;

        let mut rows = Vec::new();
        for raw in raw_rows {
            let cells = raw?
                .into_iter()
                .zip(columns)
                .map(|(value, column)| sql_to_cell(sheet, column, value))
                .collect::<LedgerResult<Vec<_>>>()?;
            rows.push(cells);
        }
        Ok(rows)
    }

    /// Number of rows in a sheet
    #[allow(dead_code)]
    pub fn row_count(&self, sheet: Sheet) -> LedgerResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM \"{}\"", sheet.name()),
            [],
            |row| row.get(0),
        )?;
        Ok(count.unsigned_abs())
    }
}

fn insert_sql(sheet: Sheet) -> String {
    let columns = sheet.columns();
    let names: Vec<&str> = columns.iter().map(|c| c.name).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO \"{}\" ({}) VALUES ({})",
        sheet.name(),
        names.join(", "),
        placeholders.join(", ")
    )
}

/// Check the row against the sheet's columns and convert it for binding
fn row_to_sql(sheet: Sheet, row: &[Cell]) -> Result<Vec<SqlValue>, WriteError> {
    let columns = sheet.columns();
    if row.len() != columns.len() {
        return Err(WriteError::RowShape {
            sheet,
            reason: format!("expected {} cells, got {}", columns.len(), row.len()),
        });
    }

    row.iter()
        .zip(columns)
        .map(|(cell, column)| {
            if cell.kind() != column.kind {
                return Err(WriteError::RowShape {
                    sheet,
                    reason: format!(
                        "column {} expects {:?}, got {:?}",
                        column.name,
                        column.kind,
                        cell.kind()
                    ),
                });
            }
            match cell {
                Cell::Date(date) => Ok(SqlValue::Text(date.format(DATE_FORMAT).to_string())),
                Cell::Integer(value) => i64::try_from(*value).map(SqlValue::Integer).map_err(|_| {
                    WriteError::RowShape {
                        sheet,
                        reason: format!("column {} value {value} out of range", column.name),
                    }
                }),
                Cell::Text(text) => Ok(SqlValue::Text(text.clone())),
            }
        })
        .collect()
}

fn sql_to_cell(sheet: Sheet, column: &Column, value: SqlValue) -> LedgerResult<Cell> {
    let corrupt = |reason: String| LedgerError::Corrupt { sheet, reason };
    match (column.kind, value) {
        (CellKind::Date, SqlValue::Text(text)) => NaiveDate::parse_from_str(&text, DATE_FORMAT)
            .map(Cell::Date)
            .map_err(|e| corrupt(format!("bad date {text:?}: {e}"))),
        (CellKind::Integer, SqlValue::Integer(value)) => u64::try_from(value)
            .map(Cell::Integer)
            .map_err(|_| corrupt(format!("negative amount {value}"))),
        (CellKind::Text, SqlValue::Text(text)) => Ok(Cell::Text(text)),
        (kind, other) => Err(corrupt(format!(
            "column {} expects {kind:?}, found {other:?}",
            column.name
        ))),
    }
}
