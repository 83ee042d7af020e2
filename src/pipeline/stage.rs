use crate::collab::CommitOutcome;
use crate::error::MigrationError;
use crate::model::{
    GeneratedArtifact, JobId, MigrationConfiguration, RepositoryDescriptor, StageKind,
};
use crate::stack::DetectionResult;
use std::path::{Path, PathBuf};

/// Snapshot of a job handed to a stage
///
/// Owned so the stage can run on a blocking thread without borrowing the
/// job; results flow back only through [`StageOutcome`].
#[derive(Debug, Clone)]
pub struct StageContext {
    pub job_id: JobId,
    pub descriptor: RepositoryDescriptor,
    pub configuration: MigrationConfiguration,
    pub checkout: Option<PathBuf>,
    pub detection: Option<DetectionResult>,
    pub artifacts: Vec<GeneratedArtifact>,
    /// 1-based attempt number for the current stage
    pub attempt: u32,
}

impl StageContext {
    pub fn require_checkout(&self) -> Result<&Path, MigrationError> {
        self.checkout
            .as_deref()
            .ok_or_else(|| MigrationError::Internal("no checkout available".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutput {
    CheckedOut(PathBuf),
    Detected(DetectionResult),
    Generated(Vec<GeneratedArtifact>),
    Validated { checked: usize, skipped: usize },
    Committed {
        written: Vec<PathBuf>,
        outcome: CommitOutcome,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Advance(StageOutput),
    RetryableFailure(MigrationError),
    FatalFailure(MigrationError),
}

impl StageOutcome {
    /// Routes an error by its kind: transient errors retry, the rest are fatal
    pub fn failed(err: MigrationError) -> Self {
        if err.is_retryable() {
            StageOutcome::RetryableFailure(err)
        } else {
            StageOutcome::FatalFailure(err)
        }
    }

    pub fn from_result(result: Result<StageOutput, MigrationError>) -> Self {
        match result {
            Ok(output) => StageOutcome::Advance(output),
            Err(err) => Self::failed(err),
        }
    }
}

/// One step of the migration pipeline
///
/// `run` is a plain blocking call; the driver executes it on a blocking
/// thread under the stage timeout. Implementations must turn every failure
/// into a [`StageOutcome`] instead of panicking.
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;
    fn run(&self, context: &StageContext) -> StageOutcome;
}
