use super::stage::{StageContext, StageOutput};
use crate::collab::CommitOutcome;
use crate::error::{MigrationError, TransitionError};
use crate::model::{
    ErrorRecord, GeneratedArtifact, JobId, JobState, MigrationConfiguration, MigrationResult,
    RepositoryDescriptor, StageKind,
};
use crate::stack::DetectionResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One entry of a job's history log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: JobState,
    pub to: JobState,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Per-repository state machine
///
/// States only move forward along the pipeline, except that a working
/// state may be re-entered for a retry and any non-terminal state may jump
/// to `Failed` or `Cancelled`. Terminal states are final.
#[derive(Debug, Clone)]
pub struct MigrationJob {
    id: JobId,
    descriptor: RepositoryDescriptor,
    configuration: MigrationConfiguration,
    priority: i32,
    state: JobState,
    attempts: BTreeMap<StageKind, u32>,
    history: Vec<StateTransition>,
    checkout: Option<PathBuf>,
    detection: Option<DetectionResult>,
    artifacts: Vec<GeneratedArtifact>,
    written: Vec<PathBuf>,
    commit: Option<CommitOutcome>,
    warnings: Vec<String>,
    error: Option<MigrationError>,
    created_at: DateTime<Utc>,
}

impl MigrationJob {
    pub fn new(descriptor: RepositoryDescriptor, configuration: MigrationConfiguration) -> Self {
        Self {
            id: JobId::new(),
            descriptor,
            configuration,
            priority: 0,
            state: JobState::Pending,
            attempts: BTreeMap::new(),
            history: Vec::new(),
            checkout: None,
            detection: None,
            artifacts: Vec::new(),
            written: Vec::new(),
            commit: None,
            warnings: Vec::new(),
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn descriptor(&self) -> &RepositoryDescriptor {
        &self.descriptor
    }

    pub fn configuration(&self) -> &MigrationConfiguration {
        &self.configuration
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    pub fn attempts(&self, stage: StageKind) -> u32 {
        self.attempts.get(&stage).copied().unwrap_or(0)
    }

    pub fn detection(&self) -> Option<&DetectionResult> {
        self.detection.as_ref()
    }

    pub fn artifacts(&self) -> &[GeneratedArtifact] {
        &self.artifacts
    }

    pub fn commit_outcome(&self) -> Option<&CommitOutcome> {
        self.commit.as_ref()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn error(&self) -> Option<&MigrationError> {
        self.error.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn can_transition(&self, to: JobState) -> bool {
        let from = self.state;
        if from.is_terminal() {
            return false;
        }
        match to {
            JobState::Failed | JobState::Cancelled => true,
            _ if to == from => from.is_working(),
            _ => match (from.pipeline_position(), to.pipeline_position()) {
                (Some(a), Some(b)) => b == a + 1,
                _ => false,
            },
        }
    }

    pub fn transition_to(
        &mut self,
        to: JobState,
        note: Option<String>,
    ) -> Result<&StateTransition, TransitionError> {
        if !self.can_transition(to) {
            return Err(TransitionError {
                from: self.state,
                to,
            });
        }

        self.history.push(StateTransition {
            from: self.state,
            to,
            at: Utc::now(),
            note,
        });
        self.state = to;
        // The entry was pushed just above
        Ok(&self.history[self.history.len() - 1])
    }

    /// Counts a new attempt of `stage` and returns its 1-based number
    pub fn record_attempt(&mut self, stage: StageKind) -> u32 {
        let counter = self.attempts.entry(stage).or_insert(0);
        *counter += 1;
        *counter
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn apply_output(&mut self, output: StageOutput) {
        match output {
            StageOutput::CheckedOut(path) => self.checkout = Some(path),
            StageOutput::Detected(detection) => self.detection = Some(detection),
            StageOutput::Generated(artifacts) => self.artifacts = artifacts,
            StageOutput::Validated { .. } => {}
            StageOutput::Committed { written, outcome } => {
                self.written = written;
                self.commit = Some(outcome);
            }
        }
    }

    /// Moves the job to its terminal failure state; `Cancelled` errors end
    /// in `Cancelled`, everything else in `Failed`
    pub fn fail(&mut self, err: MigrationError) -> Result<(), TransitionError> {
        let to = if err == MigrationError::Cancelled {
            JobState::Cancelled
        } else {
            JobState::Failed
        };
        let note = err.to_string();
        self.transition_to(to, Some(note))?;
        self.error = Some(err);
        Ok(())
    }

    pub fn stage_context(&self, attempt: u32) -> StageContext {
        StageContext {
            job_id: self.id,
            descriptor: self.descriptor.clone(),
            configuration: self.configuration.clone(),
            checkout: self.checkout.clone(),
            detection: self.detection.clone(),
            artifacts: self.artifacts.clone(),
            attempt,
        }
    }

    /// Wall time from leaving `Pending` to the latest transition
    pub fn duration_ms(&self) -> u64 {
        match (self.history.first(), self.history.last()) {
            (Some(first), Some(last)) => (last.at - first.at).num_milliseconds().max(0) as u64,
            _ => 0,
        }
    }

    pub fn result(&self) -> MigrationResult {
        let artifacts = if self.written.is_empty() {
            self.artifacts.iter().map(GeneratedArtifact::path).collect()
        } else {
            self.written.clone()
        };

        MigrationResult {
            job_id: self.id,
            repository: self.descriptor.id.clone(),
            state: self.state,
            error: self.error.as_ref().map(ErrorRecord::from),
            warnings: self.warnings.clone(),
            detection: self.detection.clone(),
            artifacts,
            attempts: self.attempts.clone(),
            duration_ms: self.duration_ms(),
        }
    }
}
