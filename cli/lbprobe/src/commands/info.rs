//! Aggregate scheduler status.

use anyhow::{Context, Result};
use lbprobe::client::SchedulerApi;
use lbprobe::model::ServiceSnapshot;
use lbprobe::output::{print_json, print_table, OutputFormat};
use tabled::Tabled;

use super::CommandContext;

#[derive(Tabled)]
struct SnapshotRow {
    #[tabled(rename = "Time slot")]
    time_slot: u64,
    #[tabled(rename = "Active")]
    active: u64,
    #[tabled(rename = "Completed")]
    completed: u64,
    #[tabled(rename = "Comms")]
    comms: String,
    #[tabled(rename = "Running")]
    running: String,
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

impl From<&ServiceSnapshot> for SnapshotRow {
    fn from(snapshot: &ServiceSnapshot) -> Self {
        Self {
            time_slot: snapshot.time_slot,
            active: snapshot.active_tasks,
            completed: snapshot.completed_tasks,
            comms: optional(snapshot.comm_count),
            running: optional(snapshot.is_running),
        }
    }
}

pub async fn run(ctx: CommandContext) -> Result<()> {
    let (client, token) = ctx.login().await?;

    let snapshot = client
        .snapshot(&token)
        .await
        .context("Failed to fetch scheduler info")?;

    match ctx.format {
        OutputFormat::Json => print_json(&snapshot),
        OutputFormat::Table => print_table(&[SnapshotRow::from(&snapshot)]),
    }
    Ok(())
}
