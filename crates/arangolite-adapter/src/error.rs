//! Adapter error types.
//!
//! Compilation errors from the query layer pass through transparently;
//! everything the adapter itself can fail on gets its own variant so
//! callers can tell a provisioning failure from a runtime query failure.

use arangolite_query::{CompileError, JoinError, SchemaError};
use thiserror::Error;

/// Errors surfaced by [`Driver`](crate::driver::Driver) implementations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriverError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("not found: {0}")]
    NotFound(String),
}

/// A driver failure that happened while running a rendered query.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("query execution failed: {0}")]
pub struct QueryError(#[from] pub DriverError);

/// A failure during schema reconciliation, tagged with the step it
/// happened in.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProvisionError {
    #[error("provisioning step '{step}' failed: {source}")]
    Step {
        step: &'static str,
        source: DriverError,
    },

    #[error("provisioning step '{step}' failed: {source}")]
    Schema {
        step: &'static str,
        source: SchemaError,
    },
}

/// Umbrella error for all adapter operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Join(#[from] JoinError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl From<DriverError> for AdapterError {
    fn from(err: DriverError) -> Self {
        AdapterError::Query(QueryError(err))
    }
}
