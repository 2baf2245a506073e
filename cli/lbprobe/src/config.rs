//! Harness configuration.
//!
//! Values are layered, lowest precedence first:
//! - Built-in defaults
//! - JSON config file (`--config`, or `config.json` in the platform config dir)
//! - Environment variables and command-line flags (applied by the CLI)

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::ProbeError;
use crate::harness::HarnessSettings;
use crate::model::LoginCredentials;
use crate::poller::PollerConfig;
use crate::submit::BatchPlan;

/// Configuration file name.
const CONFIG_FILE: &str = "config.json";

/// Get the config directory path.
fn config_dir() -> Result<PathBuf> {
    ProjectDirs::from("io", "lbprobe", "lbprobe")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
}

/// Which per-task endpoint answers task lookups.
///
/// Both paths return the same task data; the service exposes two.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TaskEndpoint {
    /// `GET /algorithm/tasks/{id}`
    #[default]
    Primary,
    /// `GET /algorithm/task/{id}`
    Alternate,
}

impl TaskEndpoint {
    /// Path segments preceding the task id, relative to the API base.
    pub fn segments(self) -> [&'static str; 2] {
        match self {
            Self::Primary => ["algorithm", "tasks"],
            Self::Alternate => ["algorithm", "task"],
        }
    }
}

/// Harness configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API base URL, including the `/api/v1` prefix.
    pub api_url: String,

    pub username: String,
    pub password: String,

    /// Number of tasks to submit.
    pub task_count: usize,

    /// Requester ids, used cyclically in submission order.
    pub requester_pool: Vec<u32>,

    /// Workload size per task in megabytes.
    pub workload_size: f64,

    pub task_kind: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,

    /// Delay before collecting assignments.
    pub settle_delay_secs: u64,

    pub poll_interval_secs: u64,

    /// Upper bound on waiting for the scheduler to drain.
    pub completion_timeout_secs: u64,

    /// Pause after stopping the scheduler, before clearing history.
    pub post_stop_delay_secs: u64,

    /// Timeout for each individual HTTP call.
    pub request_timeout_secs: u64,

    pub task_endpoint: TaskEndpoint,

    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Heading for the distribution report.
    pub title: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080/api/v1".to_string(),
            username: "admin".to_string(),
            password: "admin123".to_string(),
            task_count: 12,
            requester_pool: vec![5, 6, 7, 8],
            workload_size: 1000.0,
            task_kind: "compute".to_string(),
            priority: None,
            settle_delay_secs: 3,
            poll_interval_secs: 2,
            completion_timeout_secs: 120,
            post_stop_delay_secs: 1,
            request_timeout_secs: 30,
            task_endpoint: TaskEndpoint::Primary,
            log_level: "info".to_string(),
            title: "Lyapunov scheduler - task distribution".to_string(),
        }
    }
}

impl Config {
    /// Load config from an explicit path, or from the platform config
    /// directory if a file exists there, or return defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {:?}", path);
                }
                path.to_path_buf()
            }
            None => match config_dir() {
                Ok(dir) => dir.join(CONFIG_FILE),
                Err(_) => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", path))
    }

    /// Get the API URL without a trailing slash.
    pub fn api_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn credentials(&self) -> LoginCredentials {
        LoginCredentials::new(&self.username, &self.password)
    }

    /// Build the batch plan, validating task parameters.
    pub fn batch_plan(&self) -> Result<BatchPlan, ProbeError> {
        let plan = BatchPlan::new(
            self.task_count,
            self.requester_pool.clone(),
            self.workload_size,
            &self.task_kind,
        )?;
        Ok(plan.with_priority(self.priority))
    }

    pub fn poller_config(&self) -> Result<PollerConfig, ProbeError> {
        if self.poll_interval_secs == 0 {
            return Err(ProbeError::config("poll interval must be at least one second"));
        }
        Ok(PollerConfig {
            settle_delay: Duration::from_secs(self.settle_delay_secs),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            completion_timeout: Duration::from_secs(self.completion_timeout_secs),
        })
    }

    /// Assemble everything a run needs.
    pub fn harness_settings(&self) -> Result<HarnessSettings, ProbeError> {
        if self.api_url().is_empty() {
            return Err(ProbeError::config("API URL cannot be empty"));
        }
        Ok(HarnessSettings {
            credentials: self.credentials(),
            batch: self.batch_plan()?,
            poller: self.poller_config()?,
            post_stop_delay: Duration::from_secs(self.post_stop_delay_secs),
            title: self.title.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.api_url(), "http://localhost:8080/api/v1");
        assert_eq!(config.requester_pool, vec![5, 6, 7, 8]);

        let poller = config.poller_config().unwrap();
        assert_eq!(poller.settle_delay, Duration::from_secs(3));
        assert_eq!(poller.poll_interval, Duration::from_secs(2));
        assert_eq!(poller.completion_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "api_url": "http://sched:9000/api/v1/", "task_count": 20, "task_endpoint": "alternate" }}"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.api_url(), "http://sched:9000/api/v1");
        assert_eq!(config.task_count, 20);
        assert_eq!(config.task_endpoint, TaskEndpoint::Alternate);
        assert_eq!(config.task_kind, "compute");
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let err = Config::load(Some(Path::new("/nonexistent/lbprobe.json"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let config = Config {
            requester_pool: vec![],
            ..Config::default()
        };
        assert!(matches!(config.harness_settings(), Err(ProbeError::Config(_))));

        let config = Config {
            poll_interval_secs: 0,
            ..Config::default()
        };
        assert!(matches!(config.harness_settings(), Err(ProbeError::Config(_))));
    }

    #[test]
    fn test_task_endpoint_paths() {
        assert_eq!(TaskEndpoint::Primary.segments(), ["algorithm", "tasks"]);
        assert_eq!(TaskEndpoint::Alternate.segments(), ["algorithm", "task"]);
    }
}
