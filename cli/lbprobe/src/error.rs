//! Error types and user-facing error display.

use std::fmt;

use colored::Colorize;
use thiserror::Error;

/// Errors from a single call to the scheduling service.
///
/// A transport failure (`Network`) is kept apart from a well-formed
/// response in which the service refused the operation.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Not authorized: {message}")]
    Unauthorized { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Rejected by service (HTTP {status}, code {code}): {message}")]
    Rejected {
        status: u16,
        code: i64,
        message: String,
    },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Response contained no data")]
    MissingData,

    #[error("Cannot build request URL from {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Create a rejection from response details.
    pub fn rejected(status: u16, code: i64, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            code,
            message: message.into(),
        }
    }

    /// Returns true if the call never produced a response.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// The service's own `message`, if the failure came from the service.
    pub fn service_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { message }
            | Self::NotFound { message }
            | Self::Rejected { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Control commands issued before a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Stop,
    Clear,
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stop => f.write_str("stop"),
            Self::Clear => f.write_str("clear"),
        }
    }
}

/// Fatal harness errors. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Login failed: {0}")]
    Login(#[source] ApiError),

    #[error("Control command '{command}' failed: {source}")]
    Control {
        command: ControlCommand,
        #[source]
        source: ApiError,
    },

    #[error("None of the {requested} submitted tasks were accepted")]
    NoTasksAccepted { requested: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ProbeError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    let Some(probe_err) = err.downcast_ref::<ProbeError>() else {
        return;
    };

    match probe_err {
        ProbeError::Login(ApiError::Unauthorized { .. }) => {
            eprintln!(
                "\n{}",
                "Hint: Check LBPROBE_USERNAME / LBPROBE_PASSWORD.".yellow()
            );
        }
        ProbeError::Login(source) | ProbeError::Control { source, .. }
            if source.is_transport() =>
        {
            eprintln!(
                "\n{}",
                "Hint: Check that the scheduler is running and --api-url is correct.".yellow()
            );
        }
        ProbeError::NoTasksAccepted { .. } => {
            eprintln!(
                "\n{}",
                "Hint: The requester ids may not exist on the service. Try --requesters.".yellow()
            );
        }
        _ => {}
    }
}
