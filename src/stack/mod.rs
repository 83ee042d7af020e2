//! Stack classification
//!
//! The classifier maps scanner [`Evidence`](crate::scan::Evidence) to a
//! [`DetectionResult`] using closed [`StackKind`] tags, ordered per-ecosystem
//! rule tables ([`rules`]) and a profile table ([`profile`]) that holds
//! complexity weights and deployment defaults as data.

#[macro_use]
pub mod id_enum_macro;

mod classifier;
mod kind;
pub mod profile;
pub mod rules;

pub use classifier::{ComponentResult, DetectionResult, StackClassifier};
pub use kind::{Ecosystem, FrameworkClass, StackKind};
pub use profile::{ScoringWeights, StackProfile};
