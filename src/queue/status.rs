//! Point-in-time views of the queue, handed out by value

use crate::model::{JobId, JobState, MigrationResult};
use serde::Serialize;
use std::collections::BTreeMap;

/// One job as seen from outside the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub repository: String,
    pub state: JobState,
    pub priority: i32,
    /// Dispatch order among jobs of equal priority
    pub sequence: u64,
    pub cancel_requested: bool,
}

/// Counts per state plus the job list, computed on every call
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    pub counts: BTreeMap<JobState, usize>,
    pub in_flight: usize,
    pub workers: usize,
    pub processing: bool,
    pub paused: bool,
    pub jobs: Vec<JobSnapshot>,
}

impl QueueStatus {
    pub(crate) fn from_jobs(
        jobs: Vec<JobSnapshot>,
        in_flight: usize,
        workers: usize,
        processing: bool,
        paused: bool,
    ) -> Self {
        let mut counts: BTreeMap<JobState, usize> =
            JobState::ALL.iter().map(|state| (*state, 0)).collect();
        for job in &jobs {
            *counts.entry(job.state).or_insert(0) += 1;
        }

        Self {
            counts,
            in_flight,
            workers,
            processing,
            paused,
            jobs,
        }
    }

    pub fn count(&self, state: JobState) -> usize {
        self.counts.get(&state).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.jobs.len()
    }

    pub fn pending(&self) -> usize {
        self.count(JobState::Pending)
    }

    /// Jobs currently inside a stage
    pub fn working(&self) -> usize {
        self.jobs.iter().filter(|j| j.state.is_working()).count()
    }

    pub fn finished(&self) -> usize {
        self.jobs.iter().filter(|j| j.state.is_terminal()).count()
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight == 0 && self.pending() == 0
    }
}

/// Results of every job covered by one `process()` call, in enqueue order
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub results: Vec<MigrationResult>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn count(&self, state: JobState) -> usize {
        self.results.iter().filter(|r| r.state == state).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(JobState::Succeeded)
    }

    pub fn failed(&self) -> usize {
        self.count(JobState::Failed)
    }

    pub fn cancelled(&self) -> usize {
        self.count(JobState::Cancelled)
    }

    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(MigrationResult::is_success)
    }

    pub fn get(&self, id: JobId) -> Option<&MigrationResult> {
        self.results.iter().find(|r| r.job_id == id)
    }
}
