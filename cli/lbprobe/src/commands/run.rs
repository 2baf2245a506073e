//! The load-balance run.

use anyhow::Result;
use clap::Args;
use lbprobe::config::{Config, TaskEndpoint};
use lbprobe::harness::Harness;
use lbprobe::output::{print_info, print_report, OutputFormat};

use super::CommandContext;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Number of tasks to submit.
    #[arg(long = "tasks", short = 'n')]
    task_count: Option<usize>,

    /// Requester ids, used cyclically (comma separated).
    #[arg(long = "requesters", value_delimiter = ',')]
    requester_pool: Option<Vec<u32>>,

    /// Workload size per task in megabytes.
    #[arg(long)]
    workload_size: Option<f64>,

    /// Task type tag.
    #[arg(long)]
    task_kind: Option<String>,

    /// Task priority (omitted from requests when unset).
    #[arg(long)]
    priority: Option<i32>,

    /// Seconds to wait before collecting assignments.
    #[arg(long)]
    settle_delay: Option<u64>,

    /// Seconds between completion checks.
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Seconds to wait for all tasks to complete.
    #[arg(long = "timeout")]
    completion_timeout: Option<u64>,

    /// Which per-task endpoint to query.
    #[arg(long, value_enum)]
    task_endpoint: Option<TaskEndpoint>,

    /// Heading for the distribution report.
    #[arg(long)]
    title: Option<String>,
}

impl RunArgs {
    fn apply(self, config: &mut Config) {
        if let Some(count) = self.task_count {
            config.task_count = count;
        }
        if let Some(pool) = self.requester_pool {
            config.requester_pool = pool;
        }
        if let Some(size) = self.workload_size {
            config.workload_size = size;
        }
        if let Some(kind) = self.task_kind {
            config.task_kind = kind;
        }
        if self.priority.is_some() {
            config.priority = self.priority;
        }
        if let Some(secs) = self.settle_delay {
            config.settle_delay_secs = secs;
        }
        if let Some(secs) = self.poll_interval {
            config.poll_interval_secs = secs;
        }
        if let Some(secs) = self.completion_timeout {
            config.completion_timeout_secs = secs;
        }
        if let Some(endpoint) = self.task_endpoint {
            config.task_endpoint = endpoint;
        }
        if let Some(title) = self.title {
            config.title = title;
        }
    }

    pub async fn run(self, mut ctx: CommandContext) -> Result<()> {
        self.apply(&mut ctx.config);

        let settings = ctx.config.harness_settings()?;
        let harness = Harness::new(ctx.client()?, settings);

        if ctx.format == OutputFormat::Table {
            print_info(&format!(
                "Submitting {} tasks to {}",
                ctx.config.task_count,
                ctx.config.api_url()
            ));
        }

        let report = harness.run().await?;
        print_report(&report, ctx.format);
        Ok(())
    }
}
