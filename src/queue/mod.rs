//! Multi-repository job queue

mod orchestrator;
mod status;

pub use orchestrator::{MigrationQueue, ProcessHandle, QueueOptions, Removal, DEFAULT_WORKERS};
pub use status::{BatchReport, JobSnapshot, QueueStatus};
