//! Ordered job queue with a bounded worker pool
//!
//! All bookkeeping lives in one [`QueueState`] behind a mutex. Workers take
//! the job out of its slot while they drive it, so the lock is never held
//! across a stage; they hand it back together with its result when done.

use super::status::{BatchReport, JobSnapshot, QueueStatus};
use crate::error::{MigrationError, QueueError};
use crate::model::{
    ErrorRecord, JobId, JobState, MigrationConfiguration, MigrationResult, RepositoryDescriptor,
};
use crate::pipeline::{
    CancelHandle, JobControl, JobDriver, JobObserver, MigrationJob, StateTransition,
};
use crate::progress::{ProgressEmitter, ProgressUpdate};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{watch, Notify};
use tracing::{debug, info, warn};

pub const DEFAULT_WORKERS: usize = 3;

#[derive(Debug, Clone)]
pub struct QueueOptions {
    pub workers: usize,
    pub progress: ProgressEmitter,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            progress: ProgressEmitter::disabled(),
        }
    }
}

impl QueueOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_progress(mut self, progress: ProgressEmitter) -> Self {
        self.progress = progress;
        self
    }
}

/// What [`MigrationQueue::remove`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    /// The job left the queue; a job removed while pending comes back cancelled
    Removed(MigrationResult),
    /// The job is running and will stop at its next stage boundary
    CancellationRequested,
}

struct Slot {
    sequence: u64,
    priority: i32,
    repository: String,
    state: JobState,
    /// `None` while a worker owns the job
    job: Option<MigrationJob>,
    running: bool,
    control: JobControl,
    cancel: CancelHandle,
    result: Option<MigrationResult>,
}

impl Slot {
    fn is_dispatchable(&self) -> bool {
        self.state == JobState::Pending && !self.running && self.job.is_some()
    }

    fn snapshot(&self, id: JobId) -> JobSnapshot {
        JobSnapshot {
            id,
            repository: self.repository.clone(),
            state: self.state,
            priority: self.priority,
            sequence: self.sequence,
            cancel_requested: self.cancel.is_cancelled(),
        }
    }

    fn final_result(&self) -> Option<MigrationResult> {
        self.result
            .clone()
            .or_else(|| self.job.as_ref().map(MigrationJob::result))
    }

    /// Cancels a job that never left `Pending`
    fn cancel_pending(&mut self, id: JobId) -> Result<MigrationResult, QueueError> {
        let job = self.job.as_mut().ok_or(QueueError::InvalidState {
            job_id: id,
            state: self.state,
        })?;
        job.fail(MigrationError::Cancelled)
            .map_err(|e| QueueError::InvalidState {
                job_id: id,
                state: e.from,
            })?;

        let result = job.result();
        self.state = job.state();
        self.result = Some(result.clone());
        Ok(result)
    }
}

struct Batch {
    id: u64,
    expected: Vec<JobId>,
    results: BTreeMap<JobId, MigrationResult>,
}

impl Batch {
    fn is_complete(&self) -> bool {
        self.results.len() >= self.expected.len()
    }

    fn into_report(mut self) -> BatchReport {
        let results = self
            .expected
            .iter()
            .filter_map(|id| self.results.remove(id))
            .collect();
        BatchReport { results }
    }
}

#[derive(Default)]
struct QueueState {
    slots: BTreeMap<JobId, Slot>,
    next_sequence: u64,
    next_batch: u64,
    in_flight: usize,
    processing: bool,
    batches: Vec<Batch>,
}

impl QueueState {
    fn has_dispatchable(&self) -> bool {
        self.slots.values().any(Slot::is_dispatchable)
    }

    /// Highest priority first, then lowest sequence
    fn claim_next(&mut self) -> Option<(MigrationJob, JobControl)> {
        let id = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.is_dispatchable())
            .min_by_key(|(_, slot)| (Reverse(slot.priority), slot.sequence))
            .map(|(id, _)| *id)?;

        let slot = self.slots.get_mut(&id)?;
        let job = slot.job.take()?;
        slot.running = true;
        self.in_flight += 1;
        Some((job, slot.control.clone()))
    }

    fn record_finished(&mut self, id: JobId, result: &MigrationResult) {
        for batch in self.batches.iter_mut() {
            if batch.expected.contains(&id) {
                batch.results.insert(id, result.clone());
            }
        }
    }
}

struct Inner {
    state: Mutex<QueueState>,
    driver: JobDriver,
    workers: usize,
    progress: ProgressEmitter,
    pause: watch::Sender<bool>,
    /// Wakes the dispatcher after enqueue, completion or resume
    wakeup: Notify,
    /// Bumped every time a job reaches a terminal state
    finished: watch::Sender<u64>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, id: JobId, repository: &str, state: JobState, message: &str) {
        self.progress
            .emit(ProgressUpdate::new(id, repository, state, message));
    }

    fn notify_finished(&self) {
        self.finished.send_modify(|n| *n = n.wrapping_add(1));
        self.wakeup.notify_one();
    }

    fn complete(&self, id: JobId, job: Option<MigrationJob>, result: MigrationResult) {
        {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            if let Some(slot) = state.slots.get_mut(&id) {
                slot.running = false;
                slot.state = result.state;
                if job.is_some() {
                    slot.job = job;
                }
                slot.result = Some(result.clone());
            }
            state.record_finished(id, &result);
        }

        info!(
            job_id = %id.short(),
            repo = %result.repository,
            state = %result.state,
            duration_ms = result.duration_ms,
            "Job finished"
        );
        self.notify_finished();
    }
}

fn state_message(state: JobState) -> &'static str {
    match state {
        JobState::Pending => "Queued",
        JobState::Cloning => "Checking out repository",
        JobState::Analyzing => "Detecting technology stack",
        JobState::Generating => "Generating deployment artifacts",
        JobState::Validating => "Validating artifacts",
        JobState::Committing => "Committing artifacts",
        JobState::Succeeded => "Migration complete",
        JobState::Failed => "Migration failed",
        JobState::Cancelled => "Migration cancelled",
    }
}

/// Mirrors job transitions into the queue's slots and the progress channel
struct QueueObserver {
    inner: Arc<Inner>,
}

impl JobObserver for QueueObserver {
    fn on_transition(&self, job: &MigrationJob, transition: &StateTransition) {
        if let Some(slot) = self.inner.lock().slots.get_mut(&job.id()) {
            slot.state = transition.to;
        }
        let message = transition
            .note
            .as_deref()
            .unwrap_or_else(|| state_message(transition.to));
        self.inner
            .emit(job.id(), &job.descriptor().id, transition.to, message);
    }
}

/// Resolves once every job that was unfinished at `process()` time is terminal
pub struct ProcessHandle {
    inner: Arc<Inner>,
    batch_id: u64,
}

impl ProcessHandle {
    pub fn job_ids(&self) -> Vec<JobId> {
        self.inner
            .lock()
            .batches
            .iter()
            .find(|b| b.id == self.batch_id)
            .map(|b| b.expected.clone())
            .unwrap_or_default()
    }

    pub async fn wait(self) -> BatchReport {
        let mut finished = self.inner.finished.subscribe();
        loop {
            let report = {
                let mut state = self.inner.lock();
                match state.batches.iter().position(|b| b.id == self.batch_id) {
                    Some(pos) if state.batches[pos].is_complete() => {
                        Some(state.batches.remove(pos).into_report())
                    }
                    Some(_) => None,
                    None => Some(BatchReport::default()),
                }
            };
            if let Some(report) = report {
                return report;
            }
            if finished.changed().await.is_err() {
                return BatchReport::default();
            }
        }
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        let batch_id = self.batch_id;
        self.inner.lock().batches.retain(|b| b.id != batch_id);
    }
}

/// Queue of migration jobs processed by at most `workers` concurrent jobs
#[derive(Clone)]
pub struct MigrationQueue {
    inner: Arc<Inner>,
}

impl MigrationQueue {
    pub fn new(driver: JobDriver, options: QueueOptions) -> Self {
        let (pause, _) = watch::channel(false);
        let (finished, _) = watch::channel(0u64);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState::default()),
                driver,
                workers: options.workers.max(1),
                progress: options.progress,
                pause,
                wakeup: Notify::new(),
                finished,
            }),
        }
    }

    pub fn workers(&self) -> usize {
        self.inner.workers
    }

    pub fn enqueue(
        &self,
        descriptor: RepositoryDescriptor,
        configuration: MigrationConfiguration,
    ) -> JobId {
        self.enqueue_with_priority(descriptor, configuration, 0)
    }

    /// Higher priority jobs start first; equal priorities start in enqueue order
    pub fn enqueue_with_priority(
        &self,
        descriptor: RepositoryDescriptor,
        configuration: MigrationConfiguration,
        priority: i32,
    ) -> JobId {
        let job = MigrationJob::new(descriptor, configuration).with_priority(priority);
        let id = job.id();
        let repository = job.descriptor().id.clone();
        let (control, cancel) = JobControl::new();
        let control = control.with_pause(self.inner.pause.subscribe());

        {
            let mut state = self.inner.lock();
            let sequence = state.next_sequence;
            state.next_sequence += 1;
            state.slots.insert(
                id,
                Slot {
                    sequence,
                    priority,
                    repository: repository.clone(),
                    state: job.state(),
                    job: Some(job),
                    running: false,
                    control,
                    cancel,
                    result: None,
                },
            );
        }

        debug!(job_id = %id.short(), repo = %repository, priority, "Job enqueued");
        self.inner
            .emit(id, &repository, JobState::Pending, state_message(JobState::Pending));
        self.inner.wakeup.notify_one();
        id
    }

    /// Removes a pending or finished job; a running job is asked to cancel
    pub fn remove(&self, id: JobId) -> Result<Removal, QueueError> {
        let mut state = self.inner.lock();
        let slot = state.slots.get(&id).ok_or(QueueError::UnknownJob(id))?;

        if slot.running {
            slot.cancel.cancel();
            info!(job_id = %id.short(), "Cancellation requested for running job");
            return Ok(Removal::CancellationRequested);
        }

        let was_pending = !slot.state.is_terminal();
        let mut slot = match state.slots.remove(&id) {
            Some(slot) => slot,
            None => return Err(QueueError::UnknownJob(id)),
        };

        if !was_pending {
            let result = slot.final_result().ok_or(QueueError::UnknownJob(id))?;
            return Ok(Removal::Removed(result));
        }

        let result = slot.cancel_pending(id)?;
        state.record_finished(id, &result);
        drop(state);

        info!(job_id = %id.short(), repo = %slot.repository, "Pending job removed");
        self.inner.emit(
            id,
            &slot.repository,
            JobState::Cancelled,
            state_message(JobState::Cancelled),
        );
        self.inner.notify_finished();
        Ok(Removal::Removed(result))
    }

    /// Cancels a job; pending jobs end immediately, running jobs at their
    /// next stage boundary
    pub fn cancel(&self, id: JobId) -> Result<(), QueueError> {
        let mut state = self.inner.lock();
        let slot = state.slots.get_mut(&id).ok_or(QueueError::UnknownJob(id))?;

        if slot.running {
            slot.cancel.cancel();
            info!(job_id = %id.short(), "Cancellation requested for running job");
            return Ok(());
        }
        if slot.state.is_terminal() {
            return Err(QueueError::InvalidState {
                job_id: id,
                state: slot.state,
            });
        }

        let result = slot.cancel_pending(id)?;
        let repository = slot.repository.clone();
        state.record_finished(id, &result);
        drop(state);

        info!(job_id = %id.short(), repo = %repository, "Pending job cancelled");
        self.inner.emit(
            id,
            &repository,
            JobState::Cancelled,
            state_message(JobState::Cancelled),
        );
        self.inner.notify_finished();
        Ok(())
    }

    /// Gives the listed pending jobs the dispatch order in which they are
    /// listed. Unknown, running and finished jobs are ignored. Returns how
    /// many jobs were reordered.
    pub fn reorder(&self, ids: &[JobId]) -> usize {
        let mut state = self.inner.lock();
        let mut seen = BTreeSet::new();
        let listed: Vec<JobId> = ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .filter(|id| state.slots.get(id).map_or(false, Slot::is_dispatchable))
            .collect();

        let mut sequences: Vec<u64> = listed
            .iter()
            .filter_map(|id| state.slots.get(id).map(|slot| slot.sequence))
            .collect();
        sequences.sort_unstable();

        for (id, sequence) in listed.iter().zip(sequences) {
            if let Some(slot) = state.slots.get_mut(id) {
                slot.sequence = sequence;
            }
        }
        debug!(count = listed.len(), "Reordered pending jobs");
        listed.len()
    }

    /// Starts the worker pool unless it is already running
    ///
    /// Must be called from within a tokio runtime. The returned handle
    /// covers every job not yet finished at the time of the call.
    pub fn process(&self) -> ProcessHandle {
        let (batch_id, start) = {
            let mut state = self.inner.lock();
            let mut unfinished: Vec<(u64, JobId)> = state
                .slots
                .iter()
                .filter(|(_, slot)| !slot.state.is_terminal())
                .map(|(id, slot)| (slot.sequence, *id))
                .collect();
            unfinished.sort_unstable();

            let batch_id = state.next_batch;
            state.next_batch += 1;
            state.batches.push(Batch {
                id: batch_id,
                expected: unfinished.into_iter().map(|(_, id)| id).collect(),
                results: BTreeMap::new(),
            });

            let start = !state.processing;
            state.processing = true;
            (batch_id, start)
        };

        if start {
            info!(workers = self.inner.workers, "Queue processing started");
            tokio::spawn(dispatch(Arc::clone(&self.inner)));
        } else {
            self.inner.wakeup.notify_one();
        }

        ProcessHandle {
            inner: Arc::clone(&self.inner),
            batch_id,
        }
    }

    /// Stops handing out pending jobs; running jobs idle at their next
    /// stage boundary
    pub fn pause(&self) {
        self.inner.pause.send_replace(true);
        info!("Queue paused");
    }

    pub fn resume(&self) {
        self.inner.pause.send_replace(false);
        self.inner.wakeup.notify_one();
        info!("Queue resumed");
    }

    pub fn is_paused(&self) -> bool {
        *self.inner.pause.borrow()
    }

    pub fn status(&self) -> QueueStatus {
        let paused = self.is_paused();
        let state = self.inner.lock();
        let mut jobs: Vec<JobSnapshot> = state
            .slots
            .iter()
            .map(|(id, slot)| slot.snapshot(*id))
            .collect();
        jobs.sort_by_key(|job| job.sequence);

        QueueStatus::from_jobs(
            jobs,
            state.in_flight,
            self.inner.workers,
            state.processing,
            paused,
        )
    }

    /// Removes finished jobs and returns their results in enqueue order
    pub fn drain_finished(&self) -> Vec<MigrationResult> {
        let mut state = self.inner.lock();
        let finished: Vec<JobId> = state
            .slots
            .iter()
            .filter(|(_, slot)| slot.state.is_terminal() && !slot.running)
            .map(|(id, _)| *id)
            .collect();

        let mut drained: Vec<(u64, MigrationResult)> = finished
            .into_iter()
            .filter_map(|id| state.slots.remove(&id))
            .filter_map(|slot| slot.final_result().map(|r| (slot.sequence, r)))
            .collect();
        drained.sort_by_key(|(sequence, _)| *sequence);
        drained.into_iter().map(|(_, result)| result).collect()
    }

    /// Result of a finished job, left in place
    pub fn result(&self, id: JobId) -> Option<MigrationResult> {
        self.inner
            .lock()
            .slots
            .get(&id)
            .and_then(|slot| slot.result.clone())
    }

    pub fn snapshot(&self, id: JobId) -> Option<JobSnapshot> {
        self.inner
            .lock()
            .slots
            .get(&id)
            .map(|slot| slot.snapshot(id))
    }

    pub fn len(&self) -> usize {
        self.inner.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

async fn dispatch(inner: Arc<Inner>) {
    loop {
        let claimed = {
            let paused = *inner.pause.borrow();
            let mut state = inner.lock();
            let next = if paused || state.in_flight >= inner.workers {
                None
            } else {
                state.claim_next()
            };

            if next.is_none() && state.in_flight == 0 && !state.has_dispatchable() {
                state.processing = false;
                debug!("Queue drained, dispatcher stopping");
                return;
            }
            next
        };

        match claimed {
            Some((job, control)) => spawn_worker(Arc::clone(&inner), job, control),
            None => inner.wakeup.notified().await,
        }
    }
}

fn spawn_worker(inner: Arc<Inner>, mut job: MigrationJob, control: JobControl) {
    let id = job.id();
    let repository = job.descriptor().id.clone();
    debug!(job_id = %id.short(), repo = %repository, "Dispatching job");

    let run_inner = Arc::clone(&inner);
    let run = tokio::spawn(async move {
        let observer = QueueObserver {
            inner: Arc::clone(&run_inner),
        };
        let result = run_inner.driver.run(&mut job, &control, &observer).await;
        (job, result)
    });

    tokio::spawn(async move {
        match run.await {
            Ok((job, result)) => inner.complete(id, Some(job), result),
            Err(e) => {
                warn!(job_id = %id.short(), error = %e, "Worker aborted");
                let err = MigrationError::Internal(format!("worker aborted: {}", e));
                let result = MigrationResult {
                    job_id: id,
                    repository,
                    state: JobState::Failed,
                    error: Some(ErrorRecord::from(&err)),
                    warnings: Vec::new(),
                    detection: None,
                    artifacts: Vec::new(),
                    attempts: BTreeMap::new(),
                    duration_ms: 0,
                };
                inner.complete(id, None, result);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{DriverConfig, Pipeline};

    fn queue() -> MigrationQueue {
        MigrationQueue::new(
            JobDriver::new(Pipeline::from_stages(Vec::new()), DriverConfig::default()),
            QueueOptions::new().with_workers(2),
        )
    }

    fn enqueue(queue: &MigrationQueue, name: &str) -> JobId {
        queue.enqueue(
            RepositoryDescriptor::from_source(&format!("/srv/repos/{}", name)),
            MigrationConfiguration::default(),
        )
    }

    fn dispatch_order(queue: &MigrationQueue) -> Vec<String> {
        let mut state = queue.inner.lock();
        let mut order = Vec::new();
        while let Some((job, _)) = state.claim_next() {
            order.push(job.descriptor().id.clone());
        }
        order
    }

    #[test]
    fn test_enqueue_creates_pending_jobs() {
        let queue = queue();
        let a = enqueue(&queue, "a");
        enqueue(&queue, "b");

        let status = queue.status();
        assert_eq!(status.pending(), 2);
        assert_eq!(status.total(), 2);
        assert!(!status.processing);
        assert_eq!(queue.snapshot(a).unwrap().state, JobState::Pending);
        assert!(queue.result(a).is_none());
    }

    #[test]
    fn test_fifo_within_priority() {
        let queue = queue();
        enqueue(&queue, "a");
        enqueue(&queue, "b");
        queue.enqueue_with_priority(
            RepositoryDescriptor::from_source("/srv/repos/urgent"),
            MigrationConfiguration::default(),
            10,
        );
        enqueue(&queue, "c");

        assert_eq!(dispatch_order(&queue), vec!["urgent", "a", "b", "c"]);
    }

    #[test]
    fn test_reorder_only_touches_listed_pending_jobs() {
        let queue = queue();
        let a = enqueue(&queue, "a");
        let b = enqueue(&queue, "b");
        let c = enqueue(&queue, "c");
        queue.cancel(b).unwrap();

        assert_eq!(queue.reorder(&[c, b, a, JobId::new()]), 2);
        assert_eq!(dispatch_order(&queue), vec!["c", "a"]);
    }

    #[test]
    fn test_remove_pending_job_returns_cancelled_result() {
        let queue = queue();
        let a = enqueue(&queue, "a");

        match queue.remove(a).unwrap() {
            Removal::Removed(result) => assert_eq!(result.state, JobState::Cancelled),
            other => panic!("unexpected removal: {:?}", other),
        }
        assert!(queue.is_empty());
        assert_eq!(queue.remove(a), Err(QueueError::UnknownJob(a)));
    }

    #[test]
    fn test_cancel_finished_job_is_rejected() {
        let queue = queue();
        let a = enqueue(&queue, "a");
        queue.cancel(a).unwrap();

        assert_eq!(
            queue.cancel(a),
            Err(QueueError::InvalidState {
                job_id: a,
                state: JobState::Cancelled
            })
        );
        assert_eq!(queue.result(a).unwrap().state, JobState::Cancelled);
    }

    #[test]
    fn test_drain_finished_removes_terminal_jobs() {
        let queue = queue();
        let a = enqueue(&queue, "a");
        enqueue(&queue, "b");
        queue.cancel(a).unwrap();

        let drained = queue.drain_finished();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].job_id, a);
        assert_eq!(queue.len(), 1);
        assert!(queue.drain_finished().is_empty());
    }

    #[test]
    fn test_pause_flag() {
        let queue = queue();
        assert!(!queue.is_paused());
        queue.pause();
        assert!(queue.is_paused());
        assert!(queue.status().paused);
        queue.resume();
        assert!(!queue.is_paused());
    }

    #[tokio::test]
    async fn test_process_on_empty_queue_resolves() {
        let queue = queue();
        let report = queue.process().wait().await;
        assert!(report.is_empty());
    }

    #[tokio::test]
    async fn test_batch_includes_jobs_cancelled_while_pending() {
        let queue = queue();
        queue.pause();
        let a = enqueue(&queue, "a");
        let handle = queue.process();
        assert_eq!(handle.job_ids(), vec![a]);

        queue.cancel(a).unwrap();
        let report = handle.wait().await;
        assert_eq!(report.cancelled(), 1);
    }
}
