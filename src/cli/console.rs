//! Terminal progress display for `shipwright migrate`

use crate::model::{JobId, JobState};
use crate::progress::{ProgressSink, ProgressUpdate};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

const BAR_TEMPLATE: &str = "{spinner:.cyan} {prefix:<24} [{bar:20.cyan/blue}] {pos:>3}% {msg}";

/// Progress sink rendering one bar per job on stderr
///
/// Falls back to plain lines when stderr is not a terminal, so redirected
/// runs still get a readable trace.
pub struct ConsoleSink {
    interactive: bool,
    multi: MultiProgress,
    bars: Mutex<HashMap<JobId, ProgressBar>>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::with_interactive(atty::is(atty::Stream::Stderr))
    }

    pub fn with_interactive(interactive: bool) -> Self {
        Self {
            interactive,
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn create_bar(&self, repository: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new(100));
        pb.set_style(
            ProgressStyle::with_template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"])
                .progress_chars("=> "),
        );
        pb.set_prefix(repository.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    fn render_line(update: &ProgressUpdate) -> String {
        if update.message.is_empty() {
            format!("[{:>3}%] {} {}", update.percent, update.repository, update.state)
        } else {
            format!(
                "[{:>3}%] {} {}: {}",
                update.percent, update.repository, update.state, update.message
            )
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ConsoleSink {
    fn on_progress(&self, update: &ProgressUpdate) {
        if !self.interactive {
            eprintln!("{}", Self::render_line(update));
            return;
        }

        let mut bars = self.bars.lock().unwrap_or_else(|e| e.into_inner());
        let pb = bars
            .entry(update.job_id)
            .or_insert_with(|| self.create_bar(&update.repository));

        pb.set_position(update.percent as u64);
        let message = if update.message.is_empty() {
            update.state.to_string()
        } else {
            format!("{} {}", update.state, update.message)
        };

        if update.state.is_terminal() {
            match update.state {
                JobState::Succeeded => pb.finish_with_message(message),
                _ => pb.abandon_with_message(message),
            }
            bars.remove(&update.job_id);
        } else {
            pb.set_message(message);
        }
    }
}
