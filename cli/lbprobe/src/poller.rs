//! Assignment and completion polling.
//!
//! The poller is an explicit state machine:
//!
//! ```text
//! WarmingUp --settle delay--> CollectingAssignments --one pass--> AwaitingCompletion
//!                                                                   |        |
//!                                                         active == 0      timeout
//!                                                                   v        v
//!                                                                 Done    TimedOut
//! ```
//!
//! Sleeps go through `tokio::time`, so tests run it on a paused clock.

use std::collections::HashSet;
use std::time::Duration;

use lbprobe_balance::{Placement, TaskId};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::client::SchedulerApi;
use crate::model::{ServiceSnapshot, Token};

/// Poller timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    /// Wait before the assignment pass, so the scheduler can place tasks.
    pub settle_delay: Duration,

    /// Pause between completion checks.
    pub poll_interval: Duration,

    /// Bound on the completion phase, measured from its first check.
    pub completion_timeout: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(3),
            poll_interval: Duration::from_secs(2),
            completion_timeout: Duration::from_secs(120),
        }
    }
}

/// Poller states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollPhase {
    WarmingUp,
    CollectingAssignments,
    AwaitingCompletion,
    Done,
    TimedOut,
}

impl PollPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::TimedOut)
    }
}

/// Why the completion phase ended. Neither variant is an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Termination {
    /// The scheduler reported no active tasks.
    Done {
        elapsed_ms: u64,
        ticks: u32,
        snapshot: ServiceSnapshot,
    },

    /// The timeout elapsed first.
    TimedOut {
        elapsed_ms: u64,
        ticks: u32,
        failed_ticks: u32,
        last_snapshot: Option<ServiceSnapshot>,
    },
}

impl Termination {
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    pub fn last_snapshot(&self) -> Option<&ServiceSnapshot> {
        match self {
            Self::Done { snapshot, .. } => Some(snapshot),
            Self::TimedOut { last_snapshot, .. } => last_snapshot.as_ref(),
        }
    }
}

/// A task whose status could not be read during the assignment pass.
#[derive(Debug, Clone, Serialize)]
pub struct LookupFailure {
    pub task_id: TaskId,
    pub error: String,
}

/// Everything the poller observed.
#[derive(Debug, Clone, Serialize)]
pub struct PollOutcome {
    /// One entry per task that answered the assignment pass.
    pub placements: Vec<Placement>,
    pub lookup_failures: Vec<LookupFailure>,
    pub termination: Termination,
}

/// Drives one poll cycle against the service.
pub struct Poller<'a, A: ?Sized> {
    api: &'a A,
    token: &'a Token,
    config: PollerConfig,
    phase: PollPhase,
    placements: Vec<Placement>,
    lookup_failures: Vec<LookupFailure>,
    completion_started: Option<Instant>,
    ticks: u32,
    failed_ticks: u32,
    last_snapshot: Option<ServiceSnapshot>,
}

impl<'a, A> Poller<'a, A>
where
    A: SchedulerApi + ?Sized,
{
    pub fn new(api: &'a A, token: &'a Token, config: PollerConfig) -> Self {
        Self {
            api,
            token,
            config,
            phase: PollPhase::WarmingUp,
            placements: Vec::new(),
            lookup_failures: Vec::new(),
            completion_started: None,
            ticks: 0,
            failed_ticks: 0,
            last_snapshot: None,
        }
    }

    /// Current state.
    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    /// Run the state machine to a terminal state.
    pub async fn run(mut self, task_ids: &[TaskId]) -> PollOutcome {
        while !self.phase.is_terminal() {
            let next = self.step(task_ids).await;
            if next != self.phase {
                info!(from = ?self.phase, to = ?next, "Poller transition");
            }
            self.phase = next;
        }

        let termination = self.termination();
        PollOutcome {
            placements: self.placements,
            lookup_failures: self.lookup_failures,
            termination,
        }
    }

    /// Execute the current state and return the next one.
    async fn step(&mut self, task_ids: &[TaskId]) -> PollPhase {
        match self.phase {
            PollPhase::WarmingUp => {
                info!(
                    settle_delay_ms = millis(self.config.settle_delay),
                    "Waiting for scheduler to place tasks"
                );
                tokio::time::sleep(self.config.settle_delay).await;
                PollPhase::CollectingAssignments
            }
            PollPhase::CollectingAssignments => {
                self.collect_assignments(task_ids).await;
                self.completion_started = Some(Instant::now());
                PollPhase::AwaitingCompletion
            }
            PollPhase::AwaitingCompletion => self.check_completion().await,
            terminal => terminal,
        }
    }

    /// One status query per distinct task. Failures are recorded, not retried.
    async fn collect_assignments(&mut self, task_ids: &[TaskId]) {
        let mut seen = HashSet::with_capacity(task_ids.len());

        for task_id in task_ids {
            if !seen.insert(task_id) {
                debug!(task_id = %task_id, "Skipping duplicate task id");
                continue;
            }

            match self.api.get_task(self.token, task_id).await {
                Ok(record) => {
                    debug!(
                        task_id = %task_id,
                        resource = ?record.resource.map(|r| r.get()),
                        status = %record.status,
                        "Task observed"
                    );
                    self.placements
                        .push(Placement::new(record.id, record.resource));
                }
                Err(e) => {
                    warn!(task_id = %task_id, error = %e, "Task lookup failed");
                    self.lookup_failures.push(LookupFailure {
                        task_id: task_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let placed = self
            .placements
            .iter()
            .filter(|p| p.resource.is_some())
            .count();
        info!(
            observed = self.placements.len(),
            placed,
            failed = self.lookup_failures.len(),
            "Assignments collected"
        );
    }

    /// One completion tick.
    async fn check_completion(&mut self) -> PollPhase {
        let started = *self.completion_started.get_or_insert_with(Instant::now);

        if started.elapsed() >= self.config.completion_timeout {
            warn!(
                timeout_secs = self.config.completion_timeout.as_secs(),
                "Timed out waiting for tasks to complete"
            );
            return PollPhase::TimedOut;
        }

        self.ticks += 1;
        match self.api.snapshot(self.token).await {
            Ok(snapshot) => {
                info!(
                    time_slot = snapshot.time_slot,
                    active = snapshot.active_tasks,
                    completed = snapshot.completed_tasks,
                    "Scheduler status"
                );
                let drained = snapshot.is_drained();
                self.last_snapshot = Some(snapshot);
                if drained {
                    info!("All tasks completed");
                    return PollPhase::Done;
                }
            }
            Err(e) => {
                self.failed_ticks += 1;
                warn!(error = %e, failed_ticks = self.failed_ticks, "Status query failed");
            }
        }

        tokio::time::sleep(self.config.poll_interval).await;
        PollPhase::AwaitingCompletion
    }

    fn termination(&self) -> Termination {
        let elapsed_ms = self
            .completion_started
            .map(|started| millis(started.elapsed()))
            .unwrap_or(0);

        match (self.phase, &self.last_snapshot) {
            (PollPhase::Done, Some(snapshot)) => Termination::Done {
                elapsed_ms,
                ticks: self.ticks,
                snapshot: snapshot.clone(),
            },
            _ => Termination::TimedOut {
                elapsed_ms,
                ticks: self.ticks,
                failed_ticks: self.failed_ticks,
                last_snapshot: self.last_snapshot.clone(),
            },
        }
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
