//! Wire types for the scheduling service API.
//!
//! Every endpoint wraps its payload in an [`Envelope`]. Business code `0`
//! means success; the service may also report a failure with HTTP 200 and
//! a non-zero code, so callers must check both.

use std::fmt;

use lbprobe_balance::{ResourceId, TaskId};
use serde::{Deserialize, Serialize};

/// Business code for a successful call.
pub const CODE_SUCCESS: i64 = 0;

/// Business code for an authentication failure.
pub const CODE_UNAUTHORIZED: i64 = 40100;

/// Business code for a missing resource.
pub const CODE_NOT_FOUND: i64 = 40400;

/// Response envelope shared by all endpoints.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub code: i64,

    pub data: Option<T>,

    #[serde(default)]
    pub message: String,
}

/// Username and password for `POST /auth/login`.
#[derive(Clone, Serialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

impl LoginCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Bearer token obtained from login. Read-only for the rest of the run.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginData {
    pub token: String,
}

/// Acknowledgement of a control command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ack {
    pub message: String,
}

/// Body of `POST /algorithm/tasks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSubmission {
    /// Logical requester (user device) id.
    pub user_id: u32,

    /// Workload size in megabytes.
    pub data_size: f64,

    /// Task kind tag, e.g. `compute`.
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmittedTask {
    pub id: TaskId,
}

/// Task lifecycle as exposed by the service.
///
/// The service reports an integer (0 pending, 1 queued, 2 computing,
/// 3 completed, 4 failed). Queued and computing both map to `Active`.
/// Values that are present but unrecognised map to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "RawStatus")]
pub enum TaskStatus {
    Pending,
    Active,
    Completed,
    Failed,
    Unknown,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStatus {
    Code(i64),
    Name(String),
}

impl From<RawStatus> for TaskStatus {
    fn from(raw: RawStatus) -> Self {
        match raw {
            RawStatus::Code(0) => Self::Pending,
            RawStatus::Code(1 | 2) => Self::Active,
            RawStatus::Code(3) => Self::Completed,
            RawStatus::Code(4) => Self::Failed,
            RawStatus::Code(_) => Self::Unknown,
            RawStatus::Name(name) => match name.to_ascii_lowercase().as_str() {
                "pending" => Self::Pending,
                "active" | "queued" | "computing" => Self::Active,
                "completed" => Self::Completed,
                "failed" => Self::Failed,
                _ => Self::Unknown,
            },
        }
    }
}

/// Task payload returned by either per-task endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct TaskPayload {
    #[serde(default)]
    pub assigned_comm_id: Option<u32>,

    #[serde(default)]
    pub status: Option<TaskStatus>,
}

/// Observed state of one submitted task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRecord {
    pub id: TaskId,

    /// Resource the scheduler placed the task on, absent until placed.
    pub resource: Option<ResourceId>,

    pub status: TaskStatus,
}

impl TaskRecord {
    pub(crate) fn from_payload(id: TaskId, payload: TaskPayload) -> Self {
        Self {
            id,
            resource: payload.assigned_comm_id.and_then(ResourceId::new),
            // the service omits a zero status, so absence means pending
            status: payload.status.unwrap_or(TaskStatus::Pending),
        }
    }
}

/// Point-in-time summary of the whole scheduler (`GET /algorithm/info`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSnapshot {
    pub time_slot: u64,
    pub active_tasks: u64,
    pub completed_tasks: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_count: Option<u64>,

    /// Number of communication devices known to the scheduler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comm_count: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_count: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_running: Option<bool>,
}

impl ServiceSnapshot {
    /// True once the scheduler has no active tasks left.
    pub fn is_drained(&self) -> bool {
        self.active_tasks == 0
    }
}
