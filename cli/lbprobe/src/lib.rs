//! # lbprobe
//!
//! Black-box harness that measures how evenly a task scheduling service
//! spreads work across its communication devices.
//!
//! ## Architecture
//!
//! - **Client**: one HTTP exchange per operation, no retries
//! - **Submitter**: sequential batch submission with cyclic requesters
//! - **Poller**: settle, collect assignments, wait for completion or timeout
//! - **Harness**: orchestrates a run and folds results into a report
//!
//! Aggregation and statistics live in `lbprobe-balance`.

pub mod client;
pub mod config;
pub mod error;
pub mod harness;
pub mod model;
pub mod output;
pub mod poller;
pub mod submit;

#[cfg(test)]
mod fake;

pub use client::{SchedulerApi, SchedulerClient};
pub use config::{Config, TaskEndpoint};
pub use error::{ApiError, ProbeError};
pub use harness::{Harness, HarnessSettings, RunReport};
pub use poller::{PollPhase, Poller, PollerConfig, Termination};
pub use submit::{submit_batch, BatchOutcome, BatchPlan};
