use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Where a repository's sources come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "location", rename_all = "snake_case")]
pub enum SourceLocation {
    Remote(String),
    Local(PathBuf),
}

impl SourceLocation {
    /// Interprets a command-line style source string
    ///
    /// URLs (`https://...`, `ssh://...`, `file://...`) and scp-like git
    /// addresses (`git@host:org/repo.git`) are remote; everything else is a
    /// local path.
    pub fn parse(source: &str) -> Self {
        let trimmed = source.trim();
        if trimmed.contains("://") || (trimmed.starts_with("git@") && trimmed.contains(':')) {
            SourceLocation::Remote(trimmed.to_string())
        } else {
            SourceLocation::Local(PathBuf::from(trimmed))
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, SourceLocation::Remote(_))
    }

    /// Last path segment without a trailing `.git`
    pub fn repository_name(&self) -> String {
        let raw = match self {
            SourceLocation::Remote(url) => url
                .trim_end_matches('/')
                .rsplit(['/', ':'])
                .next()
                .unwrap_or(url)
                .to_string(),
            SourceLocation::Local(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string()),
        };
        raw.trim_end_matches(".git").to_string()
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocation::Remote(url) => f.write_str(url),
            SourceLocation::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Identity and origin of a repository submitted for migration
///
/// Immutable once wrapped into a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    pub id: String,
    pub source: SourceLocation,
    pub local_checkout: Option<PathBuf>,
}

impl RepositoryDescriptor {
    pub fn new(id: impl Into<String>, source: SourceLocation) -> Self {
        Self {
            id: id.into(),
            source,
            local_checkout: None,
        }
    }

    /// Builds a descriptor whose id is derived from the source's last segment
    pub fn from_source(source: &str) -> Self {
        let location = SourceLocation::parse(source);
        let id = location.repository_name();
        Self::new(id, location)
    }

    pub fn with_local_checkout(mut self, path: impl AsRef<Path>) -> Self {
        self.local_checkout = Some(path.as_ref().to_path_buf());
        self
    }
}
