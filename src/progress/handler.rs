//! Progress updates and the sink trait that receives them

use crate::model::{JobId, JobState};

/// One progress event for one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub job_id: JobId,
    pub repository: String,
    pub state: JobState,
    /// Estimated completion, 0..=100
    pub percent: u8,
    pub message: String,
}

impl ProgressUpdate {
    pub fn new(
        job_id: JobId,
        repository: impl Into<String>,
        state: JobState,
        message: impl Into<String>,
    ) -> Self {
        Self {
            job_id,
            repository: repository.into(),
            state,
            percent: state.progress_estimate(),
            message: message.into(),
        }
    }
}

/// Receives progress updates off the pipeline's execution path
///
/// Delivery is best-effort. Updates for one job arrive in the order they
/// were emitted; updates of different jobs may interleave.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, update: &ProgressUpdate);
}

/// Sink that ignores all updates
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpSink;

impl ProgressSink for NoOpSink {
    fn on_progress(&self, _update: &ProgressUpdate) {
        // Intentionally empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSink {
        count: Arc<AtomicUsize>,
    }

    impl ProgressSink for CountingSink {
        fn on_progress(&self, _update: &ProgressUpdate) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_noop_sink() {
        NoOpSink.on_progress(&ProgressUpdate::new(
            JobId::new(),
            "shop",
            JobState::Cloning,
            "cloning",
        ));
    }

    #[test]
    fn test_percent_follows_state() {
        let update = ProgressUpdate::new(JobId::new(), "shop", JobState::Validating, "");
        assert_eq!(update.percent, 70);
    }

    #[test]
    fn test_counting_sink() {
        let count = Arc::new(AtomicUsize::new(0));
        let sink = CountingSink {
            count: count.clone(),
        };
        for state in [JobState::Cloning, JobState::Analyzing, JobState::Succeeded] {
            sink.on_progress(&ProgressUpdate::new(JobId::new(), "shop", state, ""));
        }
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
