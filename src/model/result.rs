use super::{JobId, JobState, StageKind};
use crate::error::{ErrorKind, MigrationError};
use crate::stack::DetectionResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Error kind and message attached to an unsuccessful job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&MigrationError> for ErrorRecord {
    fn from(err: &MigrationError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Final outcome of one job, successful or not
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationResult {
    pub job_id: JobId,
    pub repository: String,
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection: Option<DetectionResult>,
    pub artifacts: Vec<PathBuf>,
    pub attempts: BTreeMap<StageKind, u32>,
    pub duration_ms: u64,
}

impl MigrationResult {
    pub fn is_success(&self) -> bool {
        self.state == JobState::Succeeded
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    pub fn attempts_for(&self, stage: StageKind) -> u32 {
        self.attempts.get(&stage).copied().unwrap_or(0)
    }
}
