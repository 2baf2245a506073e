//! Scheduler reset.

use std::time::Duration;

use anyhow::Result;
use lbprobe::harness::reset_service;
use lbprobe::output::print_success;

use super::CommandContext;

pub async fn run(ctx: CommandContext) -> Result<()> {
    let (client, token) = ctx.login().await?;
    let delay = Duration::from_secs(ctx.config.post_stop_delay_secs);

    reset_service(&client, &token, delay).await?;

    print_success("Scheduler stopped and history cleared.");
    Ok(())
}
