//! Job identifiers, job states and pipeline stage kinds

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier handed out by the queue on enqueue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, enough to tell jobs apart in logs
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a migration job
///
/// Working states follow the pipeline order; `Succeeded`, `Failed` and
/// `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Cloning,
    Analyzing,
    Generating,
    Validating,
    Committing,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobState {
    pub const ALL: [JobState; 9] = [
        JobState::Pending,
        JobState::Cloning,
        JobState::Analyzing,
        JobState::Generating,
        JobState::Validating,
        JobState::Committing,
        JobState::Succeeded,
        JobState::Failed,
        JobState::Cancelled,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::Cancelled
        )
    }

    /// True while a stage of the job is executing (or about to)
    pub fn is_working(&self) -> bool {
        self.stage().is_some()
    }

    pub fn stage(&self) -> Option<StageKind> {
        match self {
            JobState::Cloning => Some(StageKind::Clone),
            JobState::Analyzing => Some(StageKind::Detect),
            JobState::Generating => Some(StageKind::Generate),
            JobState::Validating => Some(StageKind::Validate),
            JobState::Committing => Some(StageKind::Commit),
            _ => None,
        }
    }

    /// Position along the forward pipeline; terminal failure states have none
    pub(crate) fn pipeline_position(&self) -> Option<u8> {
        match self {
            JobState::Pending => Some(0),
            JobState::Cloning => Some(1),
            JobState::Analyzing => Some(2),
            JobState::Generating => Some(3),
            JobState::Validating => Some(4),
            JobState::Committing => Some(5),
            JobState::Succeeded => Some(6),
            JobState::Failed | JobState::Cancelled => None,
        }
    }

    /// Rough completion percentage reported to progress sinks
    pub fn progress_estimate(&self) -> u8 {
        match self {
            JobState::Pending => 0,
            JobState::Cloning => 10,
            JobState::Analyzing => 30,
            JobState::Generating => 50,
            JobState::Validating => 70,
            JobState::Committing => 85,
            JobState::Succeeded | JobState::Failed | JobState::Cancelled => 100,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "PENDING",
            JobState::Cloning => "CLONING",
            JobState::Analyzing => "ANALYZING",
            JobState::Generating => "GENERATING",
            JobState::Validating => "VALIDATING",
            JobState::Committing => "COMMITTING",
            JobState::Succeeded => "SUCCEEDED",
            JobState::Failed => "FAILED",
            JobState::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Clone,
    Detect,
    Generate,
    Validate,
    Commit,
}

impl StageKind {
    pub const PIPELINE: [StageKind; 5] = [
        StageKind::Clone,
        StageKind::Detect,
        StageKind::Generate,
        StageKind::Validate,
        StageKind::Commit,
    ];

    /// Job state held while this stage runs
    pub fn state(&self) -> JobState {
        match self {
            StageKind::Clone => JobState::Cloning,
            StageKind::Detect => JobState::Analyzing,
            StageKind::Generate => JobState::Generating,
            StageKind::Validate => JobState::Validating,
            StageKind::Commit => JobState::Committing,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Clone => "clone",
            StageKind::Detect => "detect",
            StageKind::Generate => "generate",
            StageKind::Validate => "validate",
            StageKind::Commit => "commit",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
