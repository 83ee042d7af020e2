//! Error taxonomy for the migration pipeline
//!
//! Stage-local failures are converted into a [`MigrationError`] before they
//! reach the job driver. Each variant maps to a serialisable [`ErrorKind`]
//! that ends up in the job's `MigrationResult`, so callers always see an
//! error kind and a message rather than a raw backtrace.

use crate::model::{JobId, JobState, StageKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure raised while driving a job through its stages
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationError {
    /// Network hiccup or temporarily unavailable resource
    #[error("transient failure: {0}")]
    Transient(String),

    /// Invalid or contradictory migration configuration
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Checkout failed for a non-recoverable reason (auth, missing repository)
    #[error("checkout failed: {0}")]
    Checkout(String),

    /// The generator could not produce artifacts for the detected stack
    #[error("artifact generation failed: {0}")]
    Generation(String),

    /// Generated artifacts did not pass validation
    #[error("artifact validation failed: {0}")]
    Validation(String),

    /// Writing or committing artifacts failed
    #[error("commit failed: {0}")]
    Commit(String),

    /// A stage exceeded its configured timeout
    #[error("stage '{stage}' timed out after {seconds}s")]
    Timeout { stage: StageKind, seconds: u64 },

    /// The job was cancelled before it could finish
    #[error("job cancelled")]
    Cancelled,

    /// Invariant violation inside the pipeline itself
    #[error("internal error: {0}")]
    Internal(String),
}

impl MigrationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MigrationError::Transient(_) => ErrorKind::Transient,
            MigrationError::Configuration(_) => ErrorKind::Configuration,
            MigrationError::Checkout(_) => ErrorKind::Checkout,
            MigrationError::Generation(_) => ErrorKind::Generation,
            MigrationError::Validation(_) => ErrorKind::Validation,
            MigrationError::Commit(_) => ErrorKind::Commit,
            MigrationError::Timeout { .. } => ErrorKind::Timeout,
            MigrationError::Cancelled => ErrorKind::Cancelled,
            MigrationError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Serialisable classification of a [`MigrationError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transient,
    Configuration,
    Checkout,
    Generation,
    Validation,
    Commit,
    Timeout,
    Cancelled,
    Internal,
}

impl ErrorKind {
    /// Only transient conditions are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Transient | ErrorKind::Timeout)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Transient => "transient",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Checkout => "checkout",
            ErrorKind::Generation => "generation",
            ErrorKind::Validation => "validation",
            ErrorKind::Commit => "commit",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by queue control operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("no job with id {0}")]
    UnknownJob(JobId),

    #[error("job {job_id} is already {state}")]
    InvalidState { job_id: JobId, state: JobState },
}

/// Illegal job state change
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal job transition {from} -> {to}")]
pub struct TransitionError {
    pub from: JobState,
    pub to: JobState,
}
