//! Drives one job through the stage pipeline
//!
//! Stages run on tokio's blocking pool under a per-stage timeout. A stage
//! call that overruns is reported as a timeout only after it has returned,
//! so calls for one job never overlap. Retryable failures re-enter the same
//! state after an exponential backoff; fatal failures end the job. Pause and cancellation are honoured at stage
//! boundaries and while waiting out a backoff.

use super::config::DriverConfig;
use super::job::{MigrationJob, StateTransition};
use super::stage::{Stage, StageContext, StageOutcome, StageOutput};
use super::stages::Pipeline;
use crate::error::MigrationError;
use crate::model::{JobState, MigrationResult, StageKind};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info, warn, Instrument};

/// Receives every state change of a job, in order
pub trait JobObserver: Send + Sync {
    fn on_transition(&self, job: &MigrationJob, transition: &StateTransition);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl JobObserver for NoOpObserver {
    fn on_transition(&self, _job: &MigrationJob, _transition: &StateTransition) {}
}

/// Requests cancellation of the job its [`JobControl`] belongs to
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Cancellation flag plus an optional shared pause switch
#[derive(Debug, Clone)]
pub struct JobControl {
    cancel: watch::Receiver<bool>,
    pause: Option<watch::Receiver<bool>>,
}

impl JobControl {
    pub fn new() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (
            Self {
                cancel: rx,
                pause: None,
            },
            CancelHandle { tx: Arc::new(tx) },
        )
    }

    pub fn with_pause(mut self, pause: watch::Receiver<bool>) -> Self {
        self.pause = Some(pause);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    pub fn is_paused(&self) -> bool {
        self.pause.as_ref().map(|p| *p.borrow()).unwrap_or(false)
    }

    /// Returns once the pause switch is off or the job is cancelled
    pub async fn wait_while_paused(&self) {
        let Some(pause) = &self.pause else {
            return;
        };
        let mut pause = pause.clone();
        let mut cancel = self.cancel.clone();
        let mut cancel_open = true;

        loop {
            if !*pause.borrow_and_update() || *cancel.borrow_and_update() {
                return;
            }
            if cancel_open {
                tokio::select! {
                    changed = pause.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                    changed = cancel.changed() => {
                        if changed.is_err() {
                            cancel_open = false;
                        }
                    }
                }
            } else if pause.changed().await.is_err() {
                return;
            }
        }
    }

    /// Sleeps for `delay`; returns false if cancelled in the meantime
    async fn sleep_unless_cancelled(&self, delay: std::time::Duration) -> bool {
        let mut cancel = self.cancel.clone();
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            if *cancel.borrow_and_update() {
                return false;
            }
            tokio::select! {
                _ = &mut sleep => return !*cancel.borrow(),
                changed = cancel.changed() => {
                    if changed.is_err() {
                        (&mut sleep).await;
                        return true;
                    }
                }
            }
        }
    }
}

pub struct JobDriver {
    pipeline: Pipeline,
    config: DriverConfig,
}

impl JobDriver {
    pub fn new(pipeline: Pipeline, config: DriverConfig) -> Self {
        Self { pipeline, config }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Runs `job` to a terminal state and returns its result
    pub async fn run(
        &self,
        job: &mut MigrationJob,
        control: &JobControl,
        observer: &dyn JobObserver,
    ) -> MigrationResult {
        let span = tracing::info_span!(
            "job",
            id = %job.id().short(),
            repository = %job.descriptor().id
        );
        self.drive(job, control, observer).instrument(span).await;
        job.result()
    }

    async fn drive(&self, job: &mut MigrationJob, control: &JobControl, observer: &dyn JobObserver) {
        if job.state().is_terminal() {
            debug!(state = %job.state(), "Job already finished");
            return;
        }

        if let Err(err) = job.configuration().validate() {
            finish_with_error(job, err, observer);
            return;
        }

        info!(platform = %job.configuration().target_platform, "Starting migration");
        let started = Instant::now();

        for stage in self.pipeline.stages() {
            control.wait_while_paused().await;
            if control.is_cancelled() {
                finish_with_error(job, MigrationError::Cancelled, observer);
                return;
            }

            if let Err(err) = record_transition(job, stage.kind().state(), None, observer) {
                finish_with_error(job, err, observer);
                return;
            }

            if let Err(err) = self.run_with_retries(job, stage, control, observer).await {
                finish_with_error(job, err, observer);
                return;
            }
        }

        match record_transition(job, JobState::Succeeded, None, observer) {
            Ok(()) => info!(
                duration_ms = started.elapsed().as_millis() as u64,
                warnings = job.warnings().len(),
                "Migration succeeded"
            ),
            Err(err) => finish_with_error(job, err, observer),
        }
    }

    async fn run_with_retries(
        &self,
        job: &mut MigrationJob,
        stage: &Arc<dyn Stage>,
        control: &JobControl,
        observer: &dyn JobObserver,
    ) -> Result<(), MigrationError> {
        let kind = stage.kind();
        let max_attempts = self.config.retry.max_attempts;

        loop {
            let attempt = job.record_attempt(kind);
            let started = Instant::now();
            let outcome = self
                .execute_stage(Arc::clone(stage), job.stage_context(attempt))
                .await;
            debug!(
                stage = %kind,
                attempt,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Stage finished"
            );

            let err = match outcome {
                StageOutcome::Advance(output) => {
                    if let StageOutput::Detected(detection) = &output {
                        if detection.is_unknown() {
                            job.add_warning("no known technology stack detected");
                        }
                    }
                    job.apply_output(output);
                    return Ok(());
                }
                StageOutcome::RetryableFailure(err) if attempt < max_attempts => {
                    let delay = self.config.retry.delay_after(attempt);
                    warn!(
                        stage = %kind,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Stage failed, retrying"
                    );
                    if !control.sleep_unless_cancelled(delay).await {
                        return Err(MigrationError::Cancelled);
                    }
                    record_transition(
                        job,
                        kind.state(),
                        Some(format!("retry {} after: {}", attempt + 1, err)),
                        observer,
                    )?;
                    continue;
                }
                StageOutcome::RetryableFailure(err) | StageOutcome::FatalFailure(err) => err,
            };

            if kind == StageKind::Validate && !job.configuration().validation_required {
                warn!(error = %err, "Validation failed but is not required, continuing");
                job.add_warning(err.to_string());
                return Ok(());
            }
            return Err(err);
        }
    }

    async fn execute_stage(&self, stage: Arc<dyn Stage>, context: StageContext) -> StageOutcome {
        let kind = stage.kind();
        let mut handle = tokio::task::spawn_blocking(move || stage.run(&context));

        match tokio::time::timeout(self.config.stage_timeout, &mut handle).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_err)) => StageOutcome::FatalFailure(MigrationError::Internal(format!(
                "stage '{}' aborted: {}",
                kind, join_err
            ))),
            Err(_) => {
                // A blocking call cannot be interrupted. The job keeps its
                // worker until the call returns, and the late result is dropped.
                warn!(
                    stage = %kind,
                    timeout_ms = self.config.stage_timeout.as_millis() as u64,
                    "Stage timed out, waiting for the call to return"
                );
                if let Err(join_err) = handle.await {
                    debug!(stage = %kind, error = %join_err, "Timed-out stage aborted");
                }
                let err = MigrationError::Timeout {
                    stage: kind,
                    seconds: self.config.stage_timeout.as_secs(),
                };
                if self.config.timeout_is_structural {
                    StageOutcome::FatalFailure(err)
                } else {
                    StageOutcome::RetryableFailure(err)
                }
            }
        }
    }
}

fn record_transition(
    job: &mut MigrationJob,
    to: JobState,
    note: Option<String>,
    observer: &dyn JobObserver,
) -> Result<(), MigrationError> {
    let transition = job
        .transition_to(to, note)
        .map_err(|e| MigrationError::Internal(e.to_string()))?
        .clone();
    debug!(from = %transition.from, to = %transition.to, "Job transition");
    observer.on_transition(job, &transition);
    Ok(())
}

fn finish_with_error(job: &mut MigrationJob, err: MigrationError, observer: &dyn JobObserver) {
    if err == MigrationError::Cancelled {
        info!(state = %job.state(), "Migration cancelled");
    } else {
        warn!(state = %job.state(), kind = %err.kind(), error = %err, "Migration failed");
    }

    match job.fail(err) {
        Ok(()) => {
            if let Some(transition) = job.history().last().cloned() {
                observer.on_transition(job, &transition);
            }
        }
        Err(e) => warn!(error = %e, "Could not record job failure"),
    }
}
