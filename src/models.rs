// Core data structures for the FOIS fetcher

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::endpoints::Endpoint;

/// One decoded API row: field name to value, in response order
pub type Row = Map<String, Value>;

/// Unit of work: one endpoint for one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchTask {
    pub endpoint: Endpoint,
    pub date: NaiveDate,
}

impl FetchTask {
    pub fn new(endpoint: Endpoint, date: NaiveDate) -> Self {
        Self { endpoint, date }
    }
}

impl std::fmt::Display for FetchTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.endpoint, self.date)
    }
}

/// Rows returned for one task, already narrowed by the endpoint's zone filter
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet {
    pub endpoint: Endpoint,
    pub date: NaiveDate,
    pub rows: Vec<Row>,
}

impl RecordSet {
    pub fn new(endpoint: Endpoint, date: NaiveDate, rows: Vec<Row>) -> Self {
        Self {
            endpoint,
            date,
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names in first-seen order across all rows
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for row in &self.rows {
            for key in row.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        columns
    }
}

/// What happened to a single task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Rows were appended to the destination table
    Written { rows: usize },
    /// Destination already held rows for this date
    Skipped,
    /// Zone filter left nothing to write
    Empty,
    /// Fetch failed; task abandoned
    FetchFailed(String),
    /// Write failed after retries
    WriteFailed(String),
}

impl TaskOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Written { .. } => "written",
            Self::Skipped => "skipped",
            Self::Empty => "empty",
            Self::FetchFailed(_) => "fetch_failed",
            Self::WriteFailed(_) => "write_failed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::FetchFailed(_) | Self::WriteFailed(_))
    }
}

impl std::fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Written { rows } => write!(f, "written ({rows} rows)"),
            Self::Skipped => write!(f, "skipped (already present)"),
            Self::Empty => write!(f, "no rows for zone"),
            Self::FetchFailed(e) => write!(f, "fetch failed: {e}"),
            Self::WriteFailed(e) => write!(f, "write failed: {e}"),
        }
    }
}

/// A failed task kept for the final report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub endpoint: String,
    pub date: NaiveDate,
    pub error: String,
}

/// Run totals reported at exit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub tasks: u32,
    pub api_calls: u32,
    pub written: u32,
    pub rows_written: u64,
    pub skipped: u32,
    pub empty: u32,
    pub fetch_failures: u32,
    pub write_failures: u32,
    pub failures: Vec<TaskFailure>,
}

impl RunSummary {
    /// Fold one task outcome into the totals
    pub fn record(&mut self, task: &FetchTask, outcome: &TaskOutcome) {
        self.tasks += 1;
        match outcome {
            TaskOutcome::Written { rows } => {
                self.written += 1;
                self.rows_written += *rows as u64;
            }
            TaskOutcome::Skipped => self.skipped += 1,
            TaskOutcome::Empty => self.empty += 1,
            TaskOutcome::FetchFailed(e) => {
                self.fetch_failures += 1;
                self.push_failure(task, e);
            }
            TaskOutcome::WriteFailed(e) => {
                self.write_failures += 1;
                self.push_failure(task, e);
            }
        }
    }

    fn push_failure(&mut self, task: &FetchTask, error: &str) {
        self.failures.push(TaskFailure {
            endpoint: task.endpoint.path().to_string(),
            date: task.date,
            error: error.to_string(),
        });
    }

    /// Tasks that reached a non-failure outcome
    pub fn succeeded(&self) -> u32 {
        self.written + self.skipped + self.empty
    }

    pub fn failed(&self) -> u32 {
        self.fetch_failures + self.write_failures
    }
}
