//! Destination storage with date-keyed deduplication
//!
//! [`DedupWriter`] is the only write path: it checks whether the destination
//! table already holds rows for the batch date and, if not, appends the whole
//! batch under a bounded retry policy.

pub mod repository;

use std::sync::Arc;
use tracing::{debug, info};

use crate::models::RecordSet;
use crate::utils::error::{StoreError, WriteError};
use crate::utils::retry::{with_retry_if, RetryFailure, RetryPolicy};

pub use repository::{
    create_mock_repository, MockTableRepository, SqliteTableRepository, TableRepository,
    TableSummary, DATE_COLUMN,
};

/// Result of a dedup-checked write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Batch appended; number of rows
    Written(usize),
    /// Table already held rows for this date; nothing written
    Skipped,
    /// Batch had no rows; nothing written
    Empty,
}

/// Writes record sets at most once per (table, date)
pub struct DedupWriter {
    repo: Arc<dyn TableRepository>,
    policy: RetryPolicy,
}

impl DedupWriter {
    pub fn new(repo: Arc<dyn TableRepository>, policy: RetryPolicy) -> Self {
        Self { repo, policy }
    }

    /// Append `records` to `table` unless rows for its date are already there
    ///
    /// Both the existence check and the append run under the retry policy;
    /// only transient store errors are retried. Every append attempt carries
    /// the full batch and a failed attempt leaves nothing behind, so a retry
    /// is equivalent to the original write.
    ///
    /// # Errors
    ///
    /// `WriteError::Exhausted` once every attempt failed transiently,
    /// `WriteError::Rejected` on the first permanent failure.
    pub async fn write_if_absent(
        &self,
        table: &str,
        records: &RecordSet,
    ) -> Result<WriteOutcome, WriteError> {
        if records.is_empty() {
            debug!(table = %table, date = %records.date, "Nothing to write");
            return Ok(WriteOutcome::Empty);
        }

        let repo = self.repo.as_ref();
        let date = records.date;

        let present = with_retry_if(
            &self.policy,
            move || async move { repo.has_date(table, date) },
            StoreError::is_transient,
        )
        .await
        .map_err(|failure| Self::write_error(table, failure))?;

        if present {
            info!(table = %table, date = %date, "Rows for date already present, skipping");
            return Ok(WriteOutcome::Skipped);
        }

        let written = with_retry_if(
            &self.policy,
            move || async move { repo.append(table, records) },
            StoreError::is_transient,
        )
        .await
        .map_err(|failure| Self::write_error(table, failure))?;

        info!(table = %table, date = %date, rows = written, "Batch written");
        Ok(WriteOutcome::Written(written))
    }

    fn write_error(table: &str, failure: RetryFailure<StoreError>) -> WriteError {
        match failure {
            RetryFailure::Exhausted { attempts, last } => WriteError::Exhausted {
                table: table.to_string(),
                attempts,
                source: last,
            },
            RetryFailure::Fatal(source) => WriteError::Rejected {
                table: table.to_string(),
                source,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::endpoints::Endpoint;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::time::Duration;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn batch(date: NaiveDate, n: usize) -> RecordSet {
        let rows = (0..n)
            .map(|i| json!({"zone": "WR", "seq": i}).as_object().cloned().unwrap())
            .collect();
        RecordSet::new(Endpoint::PendingIndents, date, rows)
    }

    fn writer(mock: &Arc<MockTableRepository>) -> DedupWriter {
        DedupWriter::new(
            mock.clone(),
            RetryPolicy::fixed(3, Duration::from_secs(5)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_when_absent() {
        let mock = create_mock_repository();
        let outcome = writer(&mock).write_if_absent("t", &batch(day(1), 3)).await.unwrap();

        assert_eq!(outcome, WriteOutcome::Written(3));
        assert_eq!(mock.rows("t").len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skips_when_date_present() {
        let mock = create_mock_repository();
        mock.seed("t", day(1), json!({"zone": "WR"}).as_object().cloned().unwrap());

        let outcome = writer(&mock).write_if_absent("t", &batch(day(1), 3)).await.unwrap();

        assert_eq!(outcome, WriteOutcome::Skipped);
        assert_eq!(mock.rows("t").len(), 1);
        assert_eq!(mock.append_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_write_is_idempotent() {
        let mock = create_mock_repository();
        let w = writer(&mock);
        let records = batch(day(2), 2);

        assert_eq!(w.write_if_absent("t", &records).await.unwrap(), WriteOutcome::Written(2));
        assert_eq!(w.write_if_absent("t", &records).await.unwrap(), WriteOutcome::Skipped);
        assert_eq!(mock.rows("t").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_batch_not_written() {
        let mock = create_mock_repository();
        let outcome = writer(&mock).write_if_absent("t", &batch(day(1), 0)).await.unwrap();

        assert_eq!(outcome, WriteOutcome::Empty);
        assert!(mock.summary("t").unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_retried() {
        let mock = create_mock_repository();
        mock.fail_next_appends(2);

        let outcome = writer(&mock).write_if_absent("t", &batch(day(1), 2)).await.unwrap();

        assert_eq!(outcome, WriteOutcome::Written(2));
        assert_eq!(mock.append_calls(), 3);
        assert_eq!(mock.rows("t").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_after_three_attempts() {
        let mock = create_mock_repository();
        mock.fail_next_appends(5);

        let err = writer(&mock)
            .write_if_absent("t", &batch(day(1), 2))
            .await
            .unwrap_err();

        assert!(matches!(err, WriteError::Exhausted { attempts: 3, .. }));
        assert_eq!(mock.append_calls(), 3);
        assert!(mock.rows("t").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_not_retried() {
        let repo = Arc::new(SqliteTableRepository::in_memory().unwrap());
        let w = DedupWriter::new(repo, RetryPolicy::fixed(3, Duration::from_secs(5)));

        w.write_if_absent("t", &batch(day(1), 1)).await.unwrap();

        let mut widened = batch(day(2), 1);
        widened.rows[0].insert("extra".into(), json!("x"));
        let err = w.write_if_absent("t", &widened).await.unwrap_err();

        assert!(matches!(err, WriteError::Rejected { .. }));
    }
}
