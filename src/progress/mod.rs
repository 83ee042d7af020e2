//! Progress reporting for migration jobs

mod dispatcher;
mod handler;
mod logging;

pub use dispatcher::{ProgressDispatcher, ProgressEmitter};
pub use handler::{NoOpSink, ProgressSink, ProgressUpdate};
pub use logging::LoggingSink;
