use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// What a marker was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    /// Build or package manifest (`pom.xml`, `package.json`, ...)
    Manifest,
    /// Dependency declared in a manifest; name is the normalised coordinate
    Dependency,
    /// Framework-specific configuration file
    Config,
    /// Entry-point or annotation text found in a source file
    Source,
}

/// One piece of evidence: a marker name plus the raw detail it came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Marker {
    pub kind: MarkerKind,
    pub name: String,
    pub detail: String,
}

impl Marker {
    pub fn new(kind: MarkerKind, name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            detail: detail.into(),
        }
    }

    pub fn manifest(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(MarkerKind::Manifest, name.clone(), name)
    }

    pub fn dependency(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(MarkerKind::Dependency, name, version)
    }

    pub fn config(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(MarkerKind::Config, name, path)
    }

    pub fn source(needle: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(MarkerKind::Source, needle, path)
    }
}

/// Markers grouped by the repository subfolder they belong to
///
/// Built once per scan through [`EvidenceBuilder`] and read-only afterwards.
/// Folders are kept in path order and markers within a folder are sorted and
/// de-duplicated, so two scans of the same tree compare equal regardless of
/// directory walk order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    folders: BTreeMap<PathBuf, Vec<Marker>>,
}

impl Evidence {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> EvidenceBuilder {
        EvidenceBuilder::default()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    pub fn folder_count(&self) -> usize {
        self.folders.len()
    }

    pub fn marker_count(&self) -> usize {
        self.folders.values().map(Vec::len).sum()
    }

    pub fn folders(&self) -> impl Iterator<Item = (&Path, &[Marker])> {
        self.folders
            .iter()
            .map(|(path, markers)| (path.as_path(), markers.as_slice()))
    }

    pub fn markers(&self, folder: &Path) -> &[Marker] {
        self.folders
            .get(folder)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[derive(Debug, Default)]
pub struct EvidenceBuilder {
    folders: BTreeMap<PathBuf, Vec<Marker>>,
}

impl EvidenceBuilder {
    pub fn add(&mut self, folder: impl AsRef<Path>, marker: Marker) -> &mut Self {
        self.folders
            .entry(normalize_folder(folder.as_ref()))
            .or_default()
            .push(marker);
        self
    }

    /// Chaining variant of [`EvidenceBuilder::add`]
    pub fn marker(mut self, folder: impl AsRef<Path>, marker: Marker) -> Self {
        self.add(folder, marker);
        self
    }

    pub fn build(self) -> Evidence {
        let folders = self
            .folders
            .into_iter()
            .map(|(folder, mut markers)| {
                markers.sort();
                markers.dedup();
                (folder, markers)
            })
            .collect();
        Evidence { folders }
    }
}

/// Repository root is always keyed as `.`
pub(crate) fn normalize_folder(folder: &Path) -> PathBuf {
    if folder.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        folder.to_path_buf()
    }
}
