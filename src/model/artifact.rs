use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A file produced by the artifact generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub file_name: String,
    /// Directory relative to the repository root (empty for the root)
    pub relative_path: PathBuf,
    pub content: String,
    /// Component tag that produced the file (e.g. "helm"); `None` for
    /// artifacts that belong to every configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
}

impl GeneratedArtifact {
    pub fn new(
        file_name: impl Into<String>,
        relative_path: impl AsRef<Path>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            relative_path: relative_path.as_ref().to_path_buf(),
            content: content.into(),
            component: None,
        }
    }

    pub fn for_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Path of the file relative to the repository root
    pub fn path(&self) -> PathBuf {
        self.relative_path.join(&self.file_name)
    }

    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
    }
}

/// Outcome of validating one artifact
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub issues: Vec<String>,
}

impl ValidationReport {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            issues: Vec::new(),
        }
    }

    pub fn invalid(issues: Vec<String>) -> Self {
        Self {
            is_valid: false,
            issues,
        }
    }
}
