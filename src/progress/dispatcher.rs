//! Asynchronous delivery of progress updates
//!
//! Workers hand updates to a [`ProgressEmitter`], which only pushes onto an
//! unbounded channel. A dedicated thread drains the channel and calls the
//! sink, so a slow or misbehaving sink never stalls a stage.

use super::{ProgressSink, ProgressUpdate};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, warn};

/// Cheap, cloneable handle for emitting progress updates
#[derive(Debug, Clone, Default)]
pub struct ProgressEmitter {
    tx: Option<UnboundedSender<ProgressUpdate>>,
}

impl ProgressEmitter {
    /// Emitter that drops every update
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Fire-and-forget; a closed channel silently discards the update
    pub fn emit(&self, update: ProgressUpdate) {
        if let Some(tx) = &self.tx {
            if tx.send(update).is_err() {
                debug!("Progress channel closed, dropping update");
            }
        }
    }
}

/// Owns the delivery thread for one sink
pub struct ProgressDispatcher {
    emitter: ProgressEmitter,
    worker: Option<JoinHandle<()>>,
}

impl ProgressDispatcher {
    pub fn spawn(sink: Arc<dyn ProgressSink>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<ProgressUpdate>();

        let worker = std::thread::Builder::new()
            .name("shipwright-progress".to_string())
            .spawn(move || {
                while let Some(update) = rx.blocking_recv() {
                    sink.on_progress(&update);
                }
            });

        match worker {
            Ok(handle) => Self {
                emitter: ProgressEmitter { tx: Some(tx) },
                worker: Some(handle),
            },
            Err(e) => {
                warn!(error = %e, "Failed to start progress thread, progress disabled");
                Self {
                    emitter: ProgressEmitter::disabled(),
                    worker: None,
                }
            }
        }
    }

    pub fn emitter(&self) -> ProgressEmitter {
        self.emitter.clone()
    }

    /// Closes this dispatcher's sender and waits for queued updates to be
    /// delivered. Returns once every other emitter clone is dropped too.
    pub fn shutdown(mut self) {
        self.emitter = ProgressEmitter::disabled();
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("Progress sink panicked");
            }
        }
    }
}
