//! Error types for identifier parsing.

use thiserror::Error;

/// Errors that can occur when parsing task or resource identifiers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BalanceError {
    /// The identifier string is empty.
    #[error("identifier cannot be empty")]
    Empty,

    /// The resource identifier is not a positive integer.
    #[error("invalid resource id '{value}': expected a positive integer")]
    InvalidResourceId { value: String },
}
