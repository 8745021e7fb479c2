//! Day × endpoint fetch orchestration
//!
//! A run moves through three phases:
//!
//! 1. **Init** - the [`FetchPlan`] is validated (days, endpoint selector)
//!    before anything touches the network, then one credential is acquired.
//! 2. **Running** - tasks are processed strictly in sequence, endpoint-major
//!    and oldest day first. Each task is paced, fetched, filtered and written
//!    through the dedup writer. Fetch and write failures are recorded and the
//!    run moves on.
//! 3. **Terminal** - the credential is revoked whatever happened during
//!    Running (completion, panic, interrupt), then the summary is returned.
//!
//! All mutable run state (credential, call counter, totals) lives in a
//! [`RunContext`] owned by the run.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::NaiveDate;
use futures::FutureExt;
use tracing::{info, warn};

use crate::api::{AuthManager, Credential, Endpoint, RateLimiter, RatePolicy, RemoteFetcher};
use crate::config::Config;
use crate::error::{Error, FoisErrorTrait, Result};
use crate::models::{FetchTask, RunSummary, TaskOutcome};
use crate::storage::{DedupWriter, TableRepository, WriteOutcome};
use crate::utils::{day_range, parse_days};

/// Validated selection of endpoints and days
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    endpoints: Vec<Endpoint>,
    dates: Vec<NaiveDate>,
}

impl FetchPlan {
    /// Plan `days` days ending yesterday (relative to `today`) for the selected endpoints
    pub fn new(days: u32, endpoints: Vec<Endpoint>, today: NaiveDate) -> Result<Self> {
        if days == 0 {
            return Err(Error::validation("--days must be a positive integer, got 0"));
        }
        if endpoints.is_empty() {
            return Err(Error::validation("no endpoint selected"));
        }

        Ok(Self {
            endpoints,
            dates: day_range(today, days)?,
        })
    }

    /// Build a plan from raw CLI values
    ///
    /// # Errors
    ///
    /// `Error::Validation` for a non-positive or non-numeric day count or an
    /// unknown endpoint selector.
    pub fn from_args(days: &str, endpoint: Option<&str>, today: NaiveDate) -> Result<Self> {
        let days = parse_days(days)?;
        let endpoints = Endpoint::select(endpoint)?;
        Self::new(days, endpoints, today)
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Days covered, oldest first
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Every task of the run: all days of the first endpoint, then the next
    pub fn tasks(&self) -> Vec<FetchTask> {
        self.endpoints
            .iter()
            .flat_map(|&endpoint| self.dates.iter().map(move |&date| FetchTask::new(endpoint, date)))
            .collect()
    }

    /// Number of tasks in the plan
    pub fn task_count(&self) -> usize {
        self.endpoints.len() * self.dates.len()
    }
}

/// Mutable state of one run
#[derive(Debug)]
pub struct RunContext {
    pub credential: Credential,
    pub rate: RateLimiter,
    pub summary: RunSummary,
}

impl RunContext {
    pub fn new(credential: Credential, rate: RateLimiter) -> Self {
        Self {
            credential,
            rate,
            summary: RunSummary::default(),
        }
    }
}

/// Composes auth, pacing, fetching and dedup writes into a run
pub struct FetchOrchestrator {
    auth: AuthManager,
    fetcher: RemoteFetcher,
    writer: DedupWriter,
    rate_policy: RatePolicy,
}

impl FetchOrchestrator {
    pub fn new(
        auth: AuthManager,
        fetcher: RemoteFetcher,
        writer: DedupWriter,
        rate_policy: RatePolicy,
    ) -> Self {
        Self {
            auth,
            fetcher,
            writer,
            rate_policy,
        }
    }

    /// Wire every component from configuration
    pub fn from_config(config: &Config, repo: Arc<dyn TableRepository>) -> Result<Self> {
        config.validate()?;

        let auth = AuthManager::new(&config.api, config.request_timeout())?;
        let fetcher =
            RemoteFetcher::new(&config.api.base_url, &config.api.zone, config.request_timeout())?;
        let writer = DedupWriter::new(repo, config.write_policy());

        Ok(Self::new(auth, fetcher, writer, config.rate_policy()))
    }

    /// Run the plan, treating Ctrl-C as an interrupt
    pub async fn run(&self, plan: &FetchPlan) -> Result<RunSummary> {
        self.run_until(plan, shutdown_signal()).await
    }

    /// Run the plan until it completes or `shutdown` resolves
    ///
    /// `shutdown` is watched from the start of the token exchange. A credential
    /// that gets issued is revoked before this returns on every path,
    /// including an interrupt during the exchange and a panic inside a task.
    pub async fn run_until<S>(&self, plan: &FetchPlan, shutdown: S) -> Result<RunSummary>
    where
        S: Future<Output = ()>,
    {
        info!(
            endpoints = plan.endpoints().len(),
            days = plan.dates().len(),
            tasks = plan.task_count(),
            "Starting fetch run"
        );

        // Shutdown is watched from the token exchange onward
        tokio::pin!(shutdown);

        let acquire = self.auth.acquire();
        tokio::pin!(acquire);
        let (acquired, interrupted) = tokio::select! {
            result = &mut acquire => (result, false),
            _ = &mut shutdown => {
                warn!("Interrupt during token exchange, waiting for it to settle");
                ((&mut acquire).await, true)
            }
        };

        let credential = acquired?;
        let mut ctx = RunContext::new(credential, RateLimiter::new(self.rate_policy));

        let outcome = if interrupted {
            Err(Error::Interrupted)
        } else {
            let work = AssertUnwindSafe(self.process(plan, &mut ctx)).catch_unwind();
            tokio::select! {
                result = work => result.map_err(|payload| Error::Panicked(panic_message(payload.as_ref()))),
                _ = &mut shutdown => Err(Error::Interrupted),
            }
        };

        self.auth.revoke(&mut ctx.credential).await;

        match outcome {
            Ok(()) => {
                info!(
                    tasks = ctx.summary.tasks,
                    api_calls = ctx.summary.api_calls,
                    written = ctx.summary.written,
                    skipped = ctx.summary.skipped,
                    failed = ctx.summary.failed(),
                    "Fetch run finished"
                );
                Ok(ctx.summary)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    category = e.category().as_str(),
                    recoverable = e.is_recoverable(),
                    tasks_done = ctx.summary.tasks,
                    api_calls = ctx.summary.api_calls,
                    "Fetch run aborted"
                );
                Err(e)
            }
        }
    }

    async fn process(&self, plan: &FetchPlan, ctx: &mut RunContext) {
        let tasks = plan.tasks();
        let total = tasks.len();

        for (i, task) in tasks.iter().enumerate() {
            let outcome = self.run_task(task, ctx).await;

            if outcome.is_failure() {
                warn!(
                    progress = %format!("{}/{total}", i + 1),
                    endpoint = %task.endpoint,
                    date = %task.date,
                    outcome = outcome.label(),
                    detail = %outcome,
                    "Task failed"
                );
            } else {
                info!(
                    progress = %format!("{}/{total}", i + 1),
                    endpoint = %task.endpoint,
                    date = %task.date,
                    outcome = outcome.label(),
                    detail = %outcome,
                    "Task done"
                );
            }

            ctx.summary.record(task, &outcome);
        }
    }

    async fn run_task(&self, task: &FetchTask, ctx: &mut RunContext) -> TaskOutcome {
        ctx.rate.acquire().await;
        ctx.summary.api_calls = ctx.rate.total();

        let records = match self.fetcher.fetch(task, &ctx.credential).await {
            Ok(records) => records,
            Err(e) => return TaskOutcome::FetchFailed(e.to_string()),
        };

        match self
            .writer
            .write_if_absent(task.endpoint.table(), &records)
            .await
        {
            Ok(WriteOutcome::Written(rows)) => TaskOutcome::Written { rows },
            Ok(WriteOutcome::Skipped) => TaskOutcome::Skipped,
            Ok(WriteOutcome::Empty) => TaskOutcome::Empty,
            Err(e) => TaskOutcome::WriteFailed(e.to_string()),
        }
    }
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    warn!("Interrupt received");
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
