//! CLI commands.

mod info;
mod reset;
mod run;
mod task;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lbprobe::client::SchedulerClient;
use lbprobe::config::Config;
use lbprobe::harness::authenticate;
use lbprobe::model::Token;
use lbprobe::output::OutputFormat;

use crate::logging::{self, LogFormat};

/// lbprobe - measure how evenly the scheduler spreads tasks across devices.
#[derive(Debug, Parser)]
#[command(name = "lbprobe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a JSON config file.
    #[arg(long, global = true, env = "LBPROBE_CONFIG")]
    config: Option<PathBuf>,

    /// Scheduler API base URL, including the /api/v1 prefix.
    #[arg(long, global = true, env = "LBPROBE_API_URL")]
    api_url: Option<String>,

    #[arg(long, global = true, env = "LBPROBE_USERNAME")]
    username: Option<String>,

    #[arg(long, global = true, env = "LBPROBE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Timeout for each HTTP call, in seconds.
    #[arg(long, global = true)]
    request_timeout: Option<u64>,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Log line format (logs go to stderr).
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, env = "LBPROBE_LOG")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Reset the scheduler, submit a batch and report the distribution.
    Run(run::RunArgs),

    /// Stop the scheduler and clear its history.
    Reset,

    /// Show the scheduler's aggregate status.
    Info,

    /// Show individual tasks.
    Task(task::TaskArgs),

    /// Show CLI version.
    Version,
}

impl Cli {
    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        let mut config = Config::load(self.config.as_deref())?;

        if let Some(api_url) = self.api_url {
            config.api_url = api_url;
        }
        if let Some(username) = self.username {
            config.username = username;
        }
        if let Some(password) = self.password {
            config.password = password;
        }
        if let Some(secs) = self.request_timeout {
            config.request_timeout_secs = secs;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }

        logging::init(&config.log_level, self.log_format);

        let ctx = CommandContext {
            config,
            format: self.format,
        };

        match self.command {
            Commands::Run(args) => args.run(ctx).await,
            Commands::Reset => reset::run(ctx).await,
            Commands::Info => info::run(ctx).await,
            Commands::Task(args) => args.run(ctx).await,
            Commands::Version => {
                println!("lbprobe {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub config: Config,
    pub format: OutputFormat,
}

impl CommandContext {
    /// Get an API client for the configured service.
    pub fn client(&self) -> Result<SchedulerClient> {
        SchedulerClient::new(&self.config)
    }

    /// Build a client and log in.
    pub async fn login(&self) -> Result<(SchedulerClient, Token)> {
        let client = self.client()?;
        let token = authenticate(&client, &self.config.credentials()).await?;
        Ok((client, token))
    }
}
