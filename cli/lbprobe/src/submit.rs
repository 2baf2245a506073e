//! Task batch submission.
//!
//! Tasks are submitted one at a time, in order. The i-th task goes to
//! requester `pool[i % pool.len()]`, which keeps runs reproducible.

use lbprobe_balance::TaskId;
use serde::Serialize;
use tracing::{info, warn};

use crate::client::SchedulerApi;
use crate::error::ProbeError;
use crate::model::{TaskSubmission, Token};

/// What to submit in one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPlan {
    count: usize,
    requester_pool: Vec<u32>,
    workload_size: f64,
    task_kind: String,
    priority: Option<i32>,
}

impl BatchPlan {
    /// Create a plan. Rejects an empty batch, an empty requester pool, a
    /// non-positive workload and an empty task kind.
    pub fn new(
        count: usize,
        requester_pool: Vec<u32>,
        workload_size: f64,
        task_kind: impl Into<String>,
    ) -> Result<Self, ProbeError> {
        let task_kind = task_kind.into();

        if count == 0 {
            return Err(ProbeError::config("task count must be at least 1"));
        }
        if requester_pool.is_empty() {
            return Err(ProbeError::config("requester pool cannot be empty"));
        }
        if !workload_size.is_finite() || workload_size <= 0.0 {
            return Err(ProbeError::config(format!(
                "workload size must be positive, got {workload_size}"
            )));
        }
        if task_kind.trim().is_empty() {
            return Err(ProbeError::config("task kind cannot be empty"));
        }

        Ok(Self {
            count,
            requester_pool,
            workload_size,
            task_kind,
            priority: None,
        })
    }

    /// Attach a priority to every task in the batch.
    pub fn with_priority(mut self, priority: Option<i32>) -> Self {
        self.priority = priority;
        self
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn requester_pool(&self) -> &[u32] {
        &self.requester_pool
    }

    /// Requester for the task at `index`.
    pub fn requester_for(&self, index: usize) -> u32 {
        self.requester_pool[index % self.requester_pool.len()]
    }

    /// Request body for the task at `index`.
    pub fn request(&self, index: usize) -> TaskSubmission {
        TaskSubmission {
            user_id: self.requester_for(index),
            data_size: self.workload_size,
            kind: self.task_kind.clone(),
            priority: self.priority,
        }
    }

    /// All requests in submission order.
    pub fn requests(&self) -> impl Iterator<Item = (usize, TaskSubmission)> + '_ {
        (0..self.count).map(|index| (index, self.request(index)))
    }
}

/// A submission the service did not accept.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionFailure {
    /// Zero-based position in the batch.
    pub index: usize,
    pub request: TaskSubmission,
    pub error: String,
}

/// Result of submitting a batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    /// Accepted task ids in submission order.
    pub task_ids: Vec<TaskId>,
    pub failures: Vec<SubmissionFailure>,
}

impl BatchOutcome {
    pub fn accepted(&self) -> usize {
        self.task_ids.len()
    }
}

/// Submit every task in the plan. A failed submission is recorded and the
/// loop moves on; the batch never aborts early.
pub async fn submit_batch<A>(api: &A, token: &Token, plan: &BatchPlan) -> BatchOutcome
where
    A: SchedulerApi + ?Sized,
{
    let mut outcome = BatchOutcome::default();

    for (index, request) in plan.requests() {
        match api.submit_task(token, &request).await {
            Ok(task_id) => {
                info!(
                    index,
                    task_id = %task_id,
                    user_id = request.user_id,
                    "Task submitted"
                );
                outcome.task_ids.push(task_id);
            }
            Err(e) => {
                warn!(
                    index,
                    user_id = request.user_id,
                    data_size = request.data_size,
                    kind = %request.kind,
                    error = %e,
                    "Task submission failed"
                );
                outcome.failures.push(SubmissionFailure {
                    index,
                    request,
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        requested = plan.count(),
        accepted = outcome.accepted(),
        failed = outcome.failures.len(),
        "Batch submitted"
    );

    outcome
}
