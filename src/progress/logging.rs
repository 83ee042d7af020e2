//! Logging-based progress sink

use super::{ProgressSink, ProgressUpdate};
use crate::model::JobState;
use tracing::{debug, info, warn};

/// Sink that logs progress updates using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSink;

impl ProgressSink for LoggingSink {
    fn on_progress(&self, update: &ProgressUpdate) {
        let job = update.job_id.short();
        match update.state {
            JobState::Pending => {
                debug!(job_id = %job, repo = %update.repository, "{}", update.message);
            }
            JobState::Succeeded => {
                info!(job_id = %job, repo = %update.repository, "{}", update.message);
            }
            JobState::Failed | JobState::Cancelled => {
                warn!(
                    job_id = %job,
                    repo = %update.repository,
                    state = %update.state,
                    "{}",
                    update.message
                );
            }
            state => {
                info!(
                    job_id = %job,
                    repo = %update.repository,
                    state = %state,
                    percent = update.percent,
                    "{}",
                    update.message
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JobId;

    #[test]
    fn test_logging_all_states() {
        let sink = LoggingSink;
        let id = JobId::new();
        for state in JobState::ALL {
            sink.on_progress(&ProgressUpdate::new(id, "shop", state, "update"));
        }
    }
}
