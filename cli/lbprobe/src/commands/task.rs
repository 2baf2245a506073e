//! Individual task lookups.

use anyhow::Result;
use clap::Args;
use lbprobe::client::SchedulerApi;
use lbprobe::model::TaskRecord;
use lbprobe::output::{print_json, print_table, print_warning, OutputFormat};
use lbprobe_balance::TaskId;
use tabled::Tabled;

use super::CommandContext;

#[derive(Debug, Args)]
pub struct TaskArgs {
    /// Task ids to look up.
    #[arg(required = true)]
    ids: Vec<String>,
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "Task")]
    id: String,
    #[tabled(rename = "Comm")]
    comm: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&TaskRecord> for TaskRow {
    fn from(record: &TaskRecord) -> Self {
        Self {
            id: record.id.to_string(),
            comm: record
                .resource
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string()),
            status: record.status.to_string(),
        }
    }
}

impl TaskArgs {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let (client, token) = ctx.login().await?;
        let mut records = Vec::with_capacity(self.ids.len());

        for raw in &self.ids {
            let id = match TaskId::new(raw.as_str()) {
                Ok(id) => id,
                Err(e) => {
                    print_warning(&format!("Skipping '{raw}': {e}"));
                    continue;
                }
            };
            match client.get_task(&token, &id).await {
                Ok(record) => records.push(record),
                Err(e) => print_warning(&format!("Task {id}: {e}")),
            }
        }

        match ctx.format {
            OutputFormat::Json => print_json(&records),
            OutputFormat::Table => {
                let rows: Vec<TaskRow> = records.iter().map(TaskRow::from).collect();
                print_table(&rows);
            }
        }
        Ok(())
    }
}
