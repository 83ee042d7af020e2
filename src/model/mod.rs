//! Data contracts shared by the scanner, the job driver and the queue

mod artifact;
mod configuration;
mod descriptor;
mod result;
mod state;

pub use artifact::{GeneratedArtifact, ValidationReport};
pub use configuration::{MigrationConfiguration, KNOWN_COMPONENTS, KNOWN_PLATFORMS};
pub use descriptor::{RepositoryDescriptor, SourceLocation};
pub use result::{ErrorRecord, MigrationResult};
pub use state::{JobId, JobState, StageKind};
