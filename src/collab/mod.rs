//! Collaborator contracts consumed by the pipeline
//!
//! The job driver only sees these traits; concrete implementations are
//! injected through [`crate::pipeline::Collaborators`]. The reference
//! implementations here back the command-line tool.

mod checkout;
mod generator;
mod store;
mod validator;

pub use checkout::{
    classify_git_failure, CheckoutError, CommitOutcome, Credentials, GitCheckout, SourceCheckout,
};
pub use generator::{ArtifactGenerator, GenerationRequest, PlanGenerator, PLAN_FILE_STEM};
pub use store::{ConfigurationStore, FileConfigStore, MemoryConfigStore, StoreError};
pub use validator::{
    ArtifactRule, ArtifactValidator, NonEmptyContentRule, RelativePathRule, StructuredValidator,
    SyntaxRule,
};
