//! Repository scanning
//!
//! [`EvidenceScanner`] walks a checkout and records manifests, declared
//! dependencies, framework configuration files and entry-point annotations
//! as [`Evidence`] keyed by project folder. The classifier in
//! [`crate::stack`] consumes the result.

mod evidence;
pub mod probes;
mod scanner;

pub use evidence::{Evidence, EvidenceBuilder, Marker, MarkerKind};
pub(crate) use evidence::normalize_folder;
pub use scanner::{EvidenceScanner, ScanConfig};
