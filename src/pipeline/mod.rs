//! Per-job state machine and the stages that drive it

mod config;
mod driver;
mod job;
mod stage;
mod stages;

pub use config::{DriverConfig, RetryPolicy};
pub use driver::{CancelHandle, JobControl, JobDriver, JobObserver, NoOpObserver};
pub use job::{MigrationJob, StateTransition};
pub use stage::{Stage, StageContext, StageOutcome, StageOutput};
pub use stages::{Collaborators, Pipeline};
