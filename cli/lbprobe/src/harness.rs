//! Run orchestration.
//!
//! A run is: login, stop, clear, submit a batch, poll, aggregate, compute
//! statistics. Login and control-command failures are fatal. Per-task
//! failures are collected into the report and never stop the run.

use std::time::Duration;

use chrono::{DateTime, Utc};
use lbprobe_balance::{aggregate, BalanceStatistic, DistributionTable, TaskId};
use serde::Serialize;
use tracing::{error, info};

use crate::client::SchedulerApi;
use crate::error::{ControlCommand, ProbeError};
use crate::model::{LoginCredentials, ServiceSnapshot, Token};
use crate::poller::{LookupFailure, Poller, PollerConfig, Termination};
use crate::submit::{submit_batch, BatchPlan, SubmissionFailure};

/// Everything a run needs besides the service itself.
#[derive(Debug, Clone)]
pub struct HarnessSettings {
    pub credentials: LoginCredentials,
    pub batch: BatchPlan,
    pub poller: PollerConfig,
    pub post_stop_delay: Duration,
    pub title: String,
}

/// Result of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub title: String,
    pub started_at: DateTime<Utc>,

    /// Number of tasks the plan asked for.
    pub requested: usize,

    /// Accepted task ids in submission order.
    pub submitted: Vec<TaskId>,
    pub submission_failures: Vec<SubmissionFailure>,
    pub lookup_failures: Vec<LookupFailure>,
    pub termination: Termination,
    pub distribution: DistributionTable,
    pub statistic: BalanceStatistic,

    /// Tasks that answered the assignment pass without a resource.
    pub unplaced: usize,
}

impl RunReport {
    /// Tasks that were placed before polling ended.
    pub fn placed(&self) -> u64 {
        self.distribution.total()
    }

    pub fn last_snapshot(&self) -> Option<&ServiceSnapshot> {
        self.termination.last_snapshot()
    }
}

/// Log in. Failure is fatal.
pub async fn authenticate<A>(api: &A, credentials: &LoginCredentials) -> Result<Token, ProbeError>
where
    A: SchedulerApi + ?Sized,
{
    let token = api.login(credentials).await.map_err(|e| {
        error!(username = %credentials.username, error = %e, "Login failed");
        ProbeError::Login(e)
    })?;
    info!(username = %credentials.username, "Logged in");
    Ok(token)
}

/// Stop the scheduler, wait, then clear its history. Failure is fatal.
pub async fn reset_service<A>(
    api: &A,
    token: &Token,
    post_stop_delay: Duration,
) -> Result<(), ProbeError>
where
    A: SchedulerApi + ?Sized,
{
    let ack = api
        .stop(token)
        .await
        .map_err(|source| control_error(ControlCommand::Stop, source))?;
    info!(message = %ack.message, "Algorithm stopped");

    tokio::time::sleep(post_stop_delay).await;

    let ack = api
        .clear(token)
        .await
        .map_err(|source| control_error(ControlCommand::Clear, source))?;
    info!(message = %ack.message, "History cleared");

    Ok(())
}

fn control_error(command: ControlCommand, source: crate::error::ApiError) -> ProbeError {
    error!(%command, error = %source, "Control command failed");
    ProbeError::Control { command, source }
}

/// Runs the load-balance probe against one service.
pub struct Harness<A> {
    api: A,
    settings: HarnessSettings,
}

impl<A: SchedulerApi> Harness<A> {
    pub fn new(api: A, settings: HarnessSettings) -> Self {
        Self { api, settings }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn settings(&self) -> &HarnessSettings {
        &self.settings
    }

    /// Execute a full run.
    pub async fn run(&self) -> Result<RunReport, ProbeError> {
        let started_at = Utc::now();
        let plan = &self.settings.batch;
        info!(
            title = %self.settings.title,
            tasks = plan.count(),
            requesters = ?plan.requester_pool(),
            "Starting load-balance run"
        );

        let token = authenticate(&self.api, &self.settings.credentials).await?;
        reset_service(&self.api, &token, self.settings.post_stop_delay).await?;

        let batch = submit_batch(&self.api, &token, plan).await;
        if batch.task_ids.is_empty() {
            error!(requested = plan.count(), "No tasks were accepted");
            return Err(ProbeError::NoTasksAccepted {
                requested: plan.count(),
            });
        }

        let poll = Poller::new(&self.api, &token, self.settings.poller)
            .run(&batch.task_ids)
            .await;

        let distribution = aggregate(&poll.placements);
        let statistic = BalanceStatistic::compute(&distribution);
        let unplaced = poll
            .placements
            .iter()
            .filter(|p| p.resource.is_none())
            .count();

        info!(
            placed = distribution.total(),
            unplaced,
            resources = distribution.resource_count(),
            std_dev = ?statistic.std_dev,
            timed_out = poll.termination.is_timed_out(),
            "Run finished"
        );

        Ok(RunReport {
            title: self.settings.title.clone(),
            started_at,
            requested: plan.count(),
            submitted: batch.task_ids,
            submission_failures: batch.failures,
            lookup_failures: poll.lookup_failures,
            termination: poll.termination,
            distribution,
            statistic,
            unplaced,
        })
    }
}
