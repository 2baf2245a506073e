//! In-memory scheduler used by unit tests.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use lbprobe_balance::{ResourceId, TaskId};

use crate::client::SchedulerApi;
use crate::error::ApiError;
use crate::model::{
    Ack, LoginCredentials, ServiceSnapshot, TaskRecord, TaskStatus, TaskSubmission, Token,
};

#[derive(Default)]
struct FakeState {
    calls: Vec<&'static str>,
    submissions: Vec<TaskSubmission>,
    lookups: Vec<TaskId>,
    snapshots_served: u64,
}

/// Scripted stand-in for the scheduling service.
#[derive(Default)]
pub(crate) struct FakeScheduler {
    fail_login: bool,
    fail_stop: bool,
    fail_clear: bool,
    rejected_submissions: HashSet<usize>,
    /// Resource per lookup, cycled in lookup order. `0` means unplaced.
    placements: Vec<u32>,
    missing_tasks: HashSet<String>,
    active_sequence: Mutex<VecDeque<u64>>,
    failing_snapshots: Mutex<u32>,
    state: Mutex<FakeState>,
}

impl FakeScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_login(mut self) -> Self {
        self.fail_login = true;
        self
    }

    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    pub fn failing_clear(mut self) -> Self {
        self.fail_clear = true;
        self
    }

    /// Reject the submissions at these zero-based call positions.
    pub fn rejecting(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.rejected_submissions = indices.into_iter().collect();
        self
    }

    pub fn with_placements(mut self, placements: Vec<u32>) -> Self {
        self.placements = placements;
        self
    }

    pub fn with_missing_tasks<'a>(mut self, ids: impl IntoIterator<Item = &'a str>) -> Self {
        self.missing_tasks = ids.into_iter().map(str::to_string).collect();
        self
    }

    /// Active task counts for successive snapshots. The last value repeats.
    pub fn with_active_sequence(self, active: Vec<u64>) -> Self {
        *self.active_sequence.lock().unwrap() = active.into();
        self
    }

    /// Fail this many snapshot calls before answering.
    pub fn with_failing_snapshots(self, count: u32) -> Self {
        *self.failing_snapshots.lock().unwrap() = count;
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn submissions(&self) -> Vec<TaskSubmission> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn lookups(&self) -> Vec<TaskId> {
        self.state.lock().unwrap().lookups.clone()
    }

    fn record(&self, call: &'static str) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn next_active(&self) -> u64 {
        let mut sequence = self.active_sequence.lock().unwrap();
        if sequence.len() > 1 {
            sequence.pop_front().unwrap_or(0)
        } else {
            sequence.front().copied().unwrap_or(0)
        }
    }
}

fn rejected(message: &str) -> ApiError {
    ApiError::rejected(200, -1, message)
}

#[async_trait]
impl SchedulerApi for FakeScheduler {
    async fn login(&self, _credentials: &LoginCredentials) -> Result<Token, ApiError> {
        self.record("login");
        if self.fail_login {
            return Err(ApiError::Unauthorized {
                message: "invalid username or password".to_string(),
            });
        }
        Ok(Token::new("fake-token"))
    }

    async fn stop(&self, _token: &Token) -> Result<Ack, ApiError> {
        self.record("stop");
        if self.fail_stop {
            return Err(rejected("stop failed"));
        }
        Ok(Ack {
            message: "algorithm stopped".to_string(),
        })
    }

    async fn clear(&self, _token: &Token) -> Result<Ack, ApiError> {
        self.record("clear");
        if self.fail_clear {
            return Err(rejected("clear failed"));
        }
        Ok(Ack {
            message: "history cleared".to_string(),
        })
    }

    async fn submit_task(
        &self,
        _token: &Token,
        task: &TaskSubmission,
    ) -> Result<TaskId, ApiError> {
        self.record("submit");
        let mut state = self.state.lock().unwrap();
        let index = state.submissions.len();
        state.submissions.push(task.clone());

        if self.rejected_submissions.contains(&index) {
            return Err(rejected("task submission failed"));
        }
        Ok(TaskId::new(format!("task-{index}")).unwrap())
    }

    async fn get_task(&self, _token: &Token, id: &TaskId) -> Result<TaskRecord, ApiError> {
        self.record("get_task");
        let mut state = self.state.lock().unwrap();
        let position = state.lookups.len();
        state.lookups.push(id.clone());

        if self.missing_tasks.contains(id.as_str()) {
            return Err(ApiError::NotFound {
                message: "task does not exist".to_string(),
            });
        }

        let resource = if self.placements.is_empty() {
            None
        } else {
            ResourceId::new(self.placements[position % self.placements.len()])
        };
        Ok(TaskRecord {
            id: id.clone(),
            resource,
            status: if resource.is_some() {
                TaskStatus::Active
            } else {
                TaskStatus::Pending
            },
        })
    }

    async fn snapshot(&self, _token: &Token) -> Result<ServiceSnapshot, ApiError> {
        self.record("snapshot");
        {
            let mut failing = self.failing_snapshots.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(rejected("info unavailable"));
            }
        }

        let active = self.next_active();
        let mut state = self.state.lock().unwrap();
        state.snapshots_served += 1;
        let submitted = state.submissions.len() as u64;
        Ok(ServiceSnapshot {
            time_slot: state.snapshots_served,
            active_tasks: active,
            completed_tasks: submitted.saturating_sub(active),
            task_count: Some(submitted),
            comm_count: Some(4),
            user_count: None,
            is_running: Some(active > 0),
        })
    }
}
