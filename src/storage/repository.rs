//! Repository Pattern for the destination table store
//!
//! The fetcher needs two things from its destination: "does this table
//! already hold rows for this date" and "append this batch". Both live
//! behind [`TableRepository`] so the write path can run against SQLite in
//! production and an in-memory mock in tests.
//!
//! ```text
//!            DedupWriter
//!                 │
//!                 ▼
//!         TableRepository
//!          ┌──────┴──────┐
//!          ▼             ▼
//!       SQLite          Mock
//! ```
//!
//! Every table carries a `TDATE` column (ISO `YYYY-MM-DD`) ahead of the API
//! fields; all API values are stored as text.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::models::{RecordSet, Row};
use crate::utils::error::StoreError;
use crate::utils::store_date;

/// Date key column present in every destination table
pub const DATE_COLUMN: &str = "TDATE";

/// Surrogate key column created with every SQLite table
const ROW_ID_COLUMN: &str = "row_id";

// ============================================================================
// Core Types
// ============================================================================

/// Per-table overview used by the status command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSummary {
    pub table: String,
    pub rows: u64,
    /// Latest `TDATE` present, if any
    pub latest_date: Option<String>,
}

/// Render a JSON value for a text column; null stays NULL
pub fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// API columns of a batch, minus any field shadowing the date column
///
/// SQLite identifiers are case-insensitive: names differing only in case, or
/// clashing with the row id column, cannot share a table.
fn batch_columns(records: &RecordSet) -> Result<Vec<String>, StoreError> {
    let columns: Vec<String> = records
        .columns()
        .into_iter()
        .filter(|c| !c.eq_ignore_ascii_case(DATE_COLUMN))
        .collect();

    for (i, column) in columns.iter().enumerate() {
        if column.eq_ignore_ascii_case(ROW_ID_COLUMN) {
            return Err(StoreError::Schema(format!(
                "column {column} clashes with {ROW_ID_COLUMN}"
            )));
        }
        if let Some(other) = columns[..i].iter().find(|o| o.eq_ignore_ascii_case(column)) {
            return Err(StoreError::Schema(format!(
                "columns {other} and {column} differ only in case"
            )));
        }
    }

    Ok(columns)
}

// ============================================================================
// Repository Trait
// ============================================================================

/// Destination store for fetched record sets
pub trait TableRepository: Send + Sync {
    /// Whether `table` already holds any row dated `date`
    ///
    /// A missing table holds no rows.
    fn has_date(&self, table: &str, date: NaiveDate) -> Result<bool, StoreError>;

    /// Append every row of `records` to `table` as one batch
    ///
    /// Either all rows land or none do. Returns the number of rows written.
    fn append(&self, table: &str, records: &RecordSet) -> Result<usize, StoreError>;

    /// Row count and latest date of `table`; `None` if the table does not exist
    fn summary(&self, table: &str) -> Result<Option<TableSummary>, StoreError>;
}

// ============================================================================
// SQLite Implementation
// ============================================================================

/// SQLite implementation of TableRepository
///
/// Uses `Mutex` to ensure thread-safety for the SQLite connection.
pub struct SqliteTableRepository {
    conn: Mutex<Connection>,
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl SqliteTableRepository {
    /// Open (or create) the database at `path`
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Unavailable(format!("cannot create {}: {e}", parent.display()))
                })?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        tracing::info!(path = %path.display(), "SQLite table store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create in-memory repository (for testing)
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn table_columns(conn: &Connection, table: &str) -> Result<Option<Vec<String>>, StoreError> {
        let exists: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |row| row.get(0),
            )
            .optional()?;

        if exists.is_none() {
            return Ok(None);
        }

        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(columns))
    }

    fn create_table(conn: &Connection, table: &str, columns: &[String]) -> Result<(), StoreError> {
        let mut defs = vec![
            format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", quote_ident(ROW_ID_COLUMN)),
            format!("{} TEXT NOT NULL", quote_ident(DATE_COLUMN)),
        ];
        defs.extend(columns.iter().map(|c| format!("{} TEXT", quote_ident(c))));

        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table_q} ({defs});
             CREATE INDEX IF NOT EXISTS {index_q} ON {table_q}({date_q});",
            table_q = quote_ident(table),
            defs = defs.join(", "),
            index_q = quote_ident(&format!("idx_{table}_tdate")),
            date_q = quote_ident(DATE_COLUMN),
        ))?;

        tracing::info!(table = %table, columns = columns.len(), "Created destination table");
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl TableRepository for SqliteTableRepository {
    fn has_date(&self, table: &str, date: NaiveDate) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        if Self::table_columns(&conn, table)?.is_none() {
            return Ok(false);
        }

        let exists: bool = conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1)",
                quote_ident(table),
                quote_ident(DATE_COLUMN)
            ),
            params![store_date(date)],
            |row| row.get(0),
        )?;

        Ok(exists)
    }

    fn append(&self, table: &str, records: &RecordSet) -> Result<usize, StoreError> {
        let columns = batch_columns(records)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        match Self::table_columns(&tx, table)? {
            None => Self::create_table(&tx, table, &columns)?,
            Some(existing) => {
                let known: HashSet<String> =
                    existing.iter().map(|c| c.to_ascii_lowercase()).collect();
                let missing: Vec<&str> = columns
                    .iter()
                    .map(String::as_str)
                    .filter(|c| !known.contains(&c.to_ascii_lowercase()))
                    .collect();
                if !missing.is_empty() {
                    return Err(StoreError::Schema(format!(
                        "{table} has no column(s): {}",
                        missing.join(", ")
                    )));
                }
            }
        }

        let mut names = vec![quote_ident(DATE_COLUMN)];
        names.extend(columns.iter().map(|c| quote_ident(c)));
        let placeholders = (1..=names.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            quote_ident(table),
            names.join(", ")
        );

        let date = store_date(records.date);
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in &records.rows {
                let mut values: Vec<Option<String>> = Vec::with_capacity(names.len());
                values.push(Some(date.clone()));
                values.extend(columns.iter().map(|c| row.get(c).and_then(cell_text)));
                stmt.execute(rusqlite::params_from_iter(values.iter()))?;
            }
        }

        tx.commit()?;
        Ok(records.len())
    }

    fn summary(&self, table: &str) -> Result<Option<TableSummary>, StoreError> {
        let conn = self.lock()?;
        if Self::table_columns(&conn, table)?.is_none() {
            return Ok(None);
        }

        let (rows, latest_date): (i64, Option<String>) = conn.query_row(
            &format!(
                "SELECT COUNT(*), MAX({}) FROM {}",
                quote_ident(DATE_COLUMN),
                quote_ident(table)
            ),
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(Some(TableSummary {
            table: table.to_string(),
            rows: rows as u64,
            latest_date,
        }))
    }
}

// ============================================================================
// Mock Implementation
// ============================================================================

/// In-memory repository for tests, with transient-failure injection
#[derive(Default)]
pub struct MockTableRepository {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    pending_failures: AtomicU32,
    append_calls: AtomicU32,
}

impl MockTableRepository {
    /// Create a new mock repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` appends fail with a transient error
    pub fn fail_next_appends(&self, n: u32) {
        self.pending_failures.store(n, Ordering::SeqCst);
    }

    /// Number of append attempts seen, failed ones included
    pub fn append_calls(&self) -> u32 {
        self.append_calls.load(Ordering::SeqCst)
    }

    /// Stored rows of a table, `TDATE` included
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .read()
            .map(|t| t.get(table).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Insert a pre-existing row dated `date`
    pub fn seed(&self, table: &str, date: NaiveDate, mut row: Row) {
        row.insert(DATE_COLUMN.to_string(), Value::String(store_date(date)));
        if let Ok(mut tables) = self.tables.write() {
            tables.entry(table.to_string()).or_default().push(row);
        }
    }
}

impl TableRepository for MockTableRepository {
    fn has_date(&self, table: &str, date: NaiveDate) -> Result<bool, StoreError> {
        let key = store_date(date);
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        Ok(tables.get(table).is_some_and(|rows| {
            rows.iter()
                .any(|r| r.get(DATE_COLUMN).and_then(Value::as_str) == Some(key.as_str()))
        }))
    }

    fn append(&self, table: &str, records: &RecordSet) -> Result<usize, StoreError> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);

        let injected = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Unavailable("injected server error".to_string()));
        }
        batch_columns(records)?;

        let date = Value::String(store_date(records.date));
        let mut tables = self.tables.write().map_err(|_| StoreError::Poisoned)?;
        let rows = tables.entry(table.to_string()).or_default();
        for row in &records.rows {
            let mut stored = Row::new();
            stored.insert(DATE_COLUMN.to_string(), date.clone());
            for (k, v) in row {
                if !k.eq_ignore_ascii_case(DATE_COLUMN) {
                    stored.insert(k.clone(), v.clone());
                }
            }
            rows.push(stored);
        }

        Ok(records.len())
    }

    fn summary(&self, table: &str) -> Result<Option<TableSummary>, StoreError> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        Ok(tables.get(table).map(|rows| TableSummary {
            table: table.to_string(),
            rows: rows.len() as u64,
            latest_date: rows
                .iter()
                .filter_map(|r| r.get(DATE_COLUMN).and_then(Value::as_str))
                .max()
                .map(String::from),
        }))
    }
}

/// Create a shared mock repository
pub fn create_mock_repository() -> Arc<MockTableRepository> {
    Arc::new(MockTableRepository::new())
}
