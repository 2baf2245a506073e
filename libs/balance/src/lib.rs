//! # lbprobe-balance
//!
//! Placement aggregation and load-balance statistics for the lbprobe harness.
//!
//! Everything in this crate is a pure function of its inputs. The harness
//! collects [`Placement`]s from the scheduler under test, folds them into a
//! [`DistributionTable`] and derives a [`BalanceStatistic`] from the table.
//!
//! ## Invariants
//!
//! - Tasks without a resource never appear in a table and never count
//!   toward its total
//! - Aggregation is order-independent: the same placements in any order
//!   produce the same table
//! - Tables iterate in ascending resource id order
//! - Statistics are recomputed from a table, never updated in place

mod error;
mod resource;
mod stats;
mod table;

pub use error::BalanceError;
pub use resource::{ResourceId, TaskId};
pub use stats::BalanceStatistic;
pub use table::{aggregate, DistributionTable, Placement};
