//! Output formatting for CLI commands.

use colored::Colorize;
use lbprobe_balance::{BalanceStatistic, DistributionTable};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::harness::RunReport;
use crate::poller::Termination;

/// Width of the separator lines around a distribution report.
const RULE_WIDTH: usize = 50;

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON format.
    Json,
}

/// Print a single item as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(data: &T) {
    let json = serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string());
    println!("{}", json);
}

/// Print rows as a table.
pub fn print_table<T: Tabled>(rows: &[T]) {
    if rows.is_empty() {
        println!("{}", "No items found.".dimmed());
    } else {
        println!("{}", Table::new(rows));
    }
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", "Success:".green().bold(), message);
}

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", "Info:".blue().bold(), message);
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", "Warning:".yellow().bold(), message);
}

#[derive(Tabled)]
struct DistributionRow {
    #[tabled(rename = "Comm")]
    resource: u32,
    #[tabled(rename = "Tasks")]
    tasks: u64,
    #[tabled(rename = "Share")]
    share: String,
    #[tabled(rename = "Load")]
    bar: String,
}

/// Bar of one block per two percent of share.
fn share_bar(share: f64) -> String {
    "█".repeat((share / 2.0).floor() as usize)
}

/// Render a distribution table with its statistics.
///
/// Rows are in ascending resource order; shares have one decimal place and
/// the standard deviation two. The deviation line is omitted when fewer
/// than two resources were observed.
pub fn render_distribution(
    title: &str,
    table: &DistributionTable,
    statistic: &BalanceStatistic,
) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = format!("{title}\n{rule}\n");

    if table.is_empty() {
        out.push_str("No placements observed.\n");
    } else {
        let rows: Vec<DistributionRow> = table
            .iter()
            .map(|(resource, count)| {
                let share = statistic.share(resource);
                DistributionRow {
                    resource: resource.get(),
                    tasks: count,
                    share: format!("{share:5.1}%"),
                    bar: share_bar(share),
                }
            })
            .collect();
        let mut rendered = Table::new(rows);
        rendered.with(Style::sharp());
        out.push_str(&rendered.to_string());
        out.push('\n');
    }

    if let Some(std_dev) = statistic.std_dev {
        out.push_str(&format!(
            "\nLoad balance (std dev): {std_dev:.2} (lower is more even)\n"
        ));
    }

    out.push_str(&rule);
    out
}

/// One-line narration of how polling ended.
pub fn describe_termination(termination: &Termination) -> String {
    match termination {
        Termination::Done {
            elapsed_ms, ticks, ..
        } => format!(
            "All tasks completed after {:.1}s ({} status checks)",
            *elapsed_ms as f64 / 1000.0,
            ticks
        ),
        Termination::TimedOut {
            elapsed_ms,
            ticks,
            failed_ticks,
            last_snapshot,
        } => {
            let active = last_snapshot
                .as_ref()
                .map(|s| s.active_tasks.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            format!(
                "Timed out after {:.1}s with {} task(s) still active ({} status checks, {} failed)",
                *elapsed_ms as f64 / 1000.0,
                active,
                ticks,
                failed_ticks
            )
        }
    }
}

/// Print a run report in the requested format.
pub fn print_report(report: &RunReport, format: OutputFormat) {
    if format == OutputFormat::Json {
        print_json(report);
        return;
    }

    for failure in &report.submission_failures {
        print_warning(&format!(
            "Task {} (user_id={}, data_size={}, type={}) not submitted: {}",
            failure.index + 1,
            failure.request.user_id,
            failure.request.data_size,
            failure.request.kind,
            failure.error
        ));
    }
    for failure in &report.lookup_failures {
        print_warning(&format!(
            "Task {} status unavailable: {}",
            failure.task_id, failure.error
        ));
    }

    print_info(&format!(
        "Submitted {}/{} tasks; {} placed, {} not yet placed",
        report.submitted.len(),
        report.requested,
        report.placed(),
        report.unplaced
    ));

    let narration = describe_termination(&report.termination);
    if report.termination.is_timed_out() {
        print_warning(&narration);
    } else {
        print_success(&narration);
    }

    println!();
    println!(
        "{}",
        render_distribution(&report.title, &report.distribution, &report.statistic)
    );
}
