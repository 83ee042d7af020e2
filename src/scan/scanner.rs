use super::evidence::{normalize_folder, Evidence, Marker};
use super::probes::{self, EXCLUDED_DIRS};
use crate::stack::Ecosystem;
use ignore::{overrides::OverrideBuilder, WalkBuilder};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub max_depth: usize,
    pub max_files: usize,
    /// Files larger than this are recorded by name only
    pub max_file_size: u64,
    pub read_content: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_depth: 6,
            max_files: 5000,
            max_file_size: 512 * 1024,
            read_content: true,
        }
    }
}

/// Walks a repository checkout and collects classification evidence
///
/// The walk is read-only, bounded by depth and file count, honours
/// `.gitignore`, skips [`EXCLUDED_DIRS`] and never follows symbolic links.
/// Entries that cannot be read are left out of the evidence; scanning
/// itself never fails.
#[derive(Debug, Clone, Default)]
pub struct EvidenceScanner {
    config: ScanConfig,
}

/// A marker together with the folder of the file it was found in
struct RawMarker {
    folder: PathBuf,
    marker: Marker,
}

impl EvidenceScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn scan(&self, root: &Path) -> Evidence {
        let start = Instant::now();

        let root = match root.canonicalize() {
            Ok(path) if path.is_dir() => path,
            Ok(path) => {
                warn!(path = %path.display(), "Scan root is not a directory");
                return Evidence::empty();
            }
            Err(err) => {
                warn!(path = %root.display(), error = %err, "Scan root is not readable");
                return Evidence::empty();
            }
        };

        info!(
            root = %root.display(),
            max_depth = self.config.max_depth,
            max_files = self.config.max_files,
            "Starting evidence scan"
        );

        let mut override_builder = OverrideBuilder::new(&root);
        for excluded in EXCLUDED_DIRS {
            if let Err(err) = override_builder.add(&format!("!{}/", excluded)) {
                warn!(pattern = excluded, error = %err, "Ignoring invalid exclusion pattern");
            }
        }
        let walker = {
            let mut builder = WalkBuilder::new(&root);
            builder
                .max_depth(Some(self.config.max_depth))
                .hidden(false)
                .git_ignore(true)
                .require_git(false)
                .follow_links(false);
            match override_builder.build() {
                Ok(overrides) => {
                    builder.overrides(overrides);
                }
                Err(err) => warn!(error = %err, "Directory exclusions unavailable"),
            }
            builder.build()
        };

        let mut raw = Vec::new();
        let mut files_scanned = 0usize;

        for result in walker {
            let entry = match result {
                Ok(e) => e,
                Err(err) => {
                    debug!(error = %err, "Skipping unreadable entry");
                    continue;
                }
            };

            // Symlinks report their own type here since links are not followed
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }

            if files_scanned >= self.config.max_files {
                warn!(
                    files_scanned,
                    max_files = self.config.max_files,
                    "Reached file limit, stopping scan"
                );
                break;
            }
            files_scanned += 1;

            let path = entry.path();
            let Ok(relative) = path.strip_prefix(&root) else {
                continue;
            };
            self.inspect_file(path, relative, &mut raw);
        }

        let evidence = rekey_to_projects(raw);

        info!(
            folders = evidence.folder_count(),
            markers = evidence.marker_count(),
            files_scanned,
            scan_time_ms = start.elapsed().as_millis() as u64,
            "Evidence scan completed"
        );

        evidence
    }

    fn inspect_file(&self, path: &Path, relative: &Path, raw: &mut Vec<RawMarker>) {
        let Some(file_name) = relative.file_name().and_then(|n| n.to_str()) else {
            return;
        };
        let folder = normalize_folder(relative.parent().unwrap_or_else(|| Path::new("")));
        let relative_display = relative.to_string_lossy().to_string();

        if Ecosystem::for_manifest(file_name).is_some() {
            raw.push(RawMarker {
                folder: folder.clone(),
                marker: Marker::manifest(file_name),
            });

            if let Some(content) = self.read_bounded(path) {
                for (name, version) in probes::extract_dependencies(file_name, &content) {
                    raw.push(RawMarker {
                        folder: folder.clone(),
                        marker: Marker::dependency(name, version),
                    });
                }
            }
            return;
        }

        if probes::is_config_file(file_name) {
            raw.push(RawMarker {
                folder,
                marker: Marker::config(file_name, relative_display),
            });
            return;
        }

        let extension = relative
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        if probes::is_probed_source(extension) {
            if let Some(content) = self.read_bounded(path) {
                for needle in probes::probe_source(extension, &content) {
                    raw.push(RawMarker {
                        folder: folder.clone(),
                        marker: Marker::source(needle, relative_display.clone()),
                    });
                }
            }
        }
    }

    fn read_bounded(&self, path: &Path) -> Option<String> {
        if !self.config.read_content {
            return None;
        }
        let metadata = fs::metadata(path).ok()?;
        if metadata.len() > self.config.max_file_size {
            debug!(path = %path.display(), size = metadata.len(), "Skipping oversized file");
            return None;
        }
        fs::read_to_string(path).ok()
    }
}

/// Attaches every marker to the nearest enclosing folder that holds a
/// manifest, so `src/main/webapp/WEB-INF/web.xml` counts toward the project
/// whose `pom.xml` sits above it. Markers with no manifest above them stay
/// where they were found.
fn rekey_to_projects(raw: Vec<RawMarker>) -> Evidence {
    let project_folders: BTreeSet<PathBuf> = raw
        .iter()
        .filter(|r| r.marker.kind == super::MarkerKind::Manifest)
        .map(|r| r.folder.clone())
        .collect();

    let mut builder = Evidence::builder();
    for RawMarker { folder, marker } in raw {
        let owner = folder
            .ancestors()
            .map(normalize_folder)
            .find(|candidate| project_folders.contains(candidate))
            .unwrap_or(folder);
        builder.add(owner, marker);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::MarkerKind;
    use std::fs;
    use tempfile::TempDir;

    fn write(base: &Path, rel: &str, content: &str) {
        let path = base.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn create_spring_repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        let base = dir.path();
        write(
            base,
            "pom.xml",
            "<project><dependencies><dependency><groupId>org.springframework.boot</groupId><artifactId>spring-boot-starter-web</artifactId></dependency></dependencies></project>",
        );
        write(
            base,
            "src/main/java/com/acme/App.java",
            "@SpringBootApplication\npublic class App {}",
        );
        write(
            base,
            "src/main/resources/application.yml",
            "server:\n  port: 8080\n",
        );
        write(base, "node_modules/left-pad/package.json", "{}");
        dir
    }

    #[test]
    fn test_scan_collects_markers_for_project_root() {
        let dir = create_spring_repo();
        let evidence = EvidenceScanner::default().scan(dir.path());

        assert_eq!(evidence.folder_count(), 1);
        let markers = evidence.markers(Path::new("."));
        let kinds: BTreeSet<MarkerKind> = markers.iter().map(|m| m.kind).collect();
        assert!(kinds.contains(&MarkerKind::Manifest));
        assert!(kinds.contains(&MarkerKind::Dependency));
        assert!(kinds.contains(&MarkerKind::Config));
        assert!(kinds.contains(&MarkerKind::Source));
        assert!(markers
            .iter()
            .any(|m| m.name == "org.springframework.boot:spring-boot-starter-web"));
    }

    #[test]
    fn test_scan_skips_excluded_dirs() {
        let dir = create_spring_repo();
        let evidence = EvidenceScanner::default().scan(dir.path());

        assert!(evidence
            .folders()
            .all(|(folder, _)| !folder.to_string_lossy().contains("node_modules")));
    }

    #[test]
    fn test_scan_nested_projects_stay_separate() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "api/requirements.txt", "flask==3.0\n");
        write(dir.path(), "api/app.py", "app = Flask(__name__)\n");
        write(dir.path(), "web/package.json", r#"{"dependencies":{"react":"18"}}"#);

        let evidence = EvidenceScanner::default().scan(dir.path());
        let folders: Vec<_> = evidence.folders().map(|(f, _)| f.to_path_buf()).collect();
        assert_eq!(folders, vec![PathBuf::from("api"), PathBuf::from("web")]);
        assert!(evidence
            .markers(Path::new("api"))
            .iter()
            .any(|m| m.kind == MarkerKind::Source && m.name == "Flask("));
    }

    #[test]
    fn test_scan_respects_max_depth() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a/b/c/package.json", "{}");

        let shallow = EvidenceScanner::new(ScanConfig {
            max_depth: 2,
            ..ScanConfig::default()
        });
        assert!(shallow.scan(dir.path()).is_empty());
        assert_eq!(EvidenceScanner::default().scan(dir.path()).folder_count(), 1);
    }

    #[test]
    fn test_scan_without_content_records_names_only() {
        let dir = create_spring_repo();
        let scanner = EvidenceScanner::new(ScanConfig {
            read_content: false,
            ..ScanConfig::default()
        });
        let evidence = scanner.scan(dir.path());
        assert!(evidence
            .folders()
            .flat_map(|(_, m)| m.iter())
            .all(|m| m.kind == MarkerKind::Manifest || m.kind == MarkerKind::Config));
    }

    #[test]
    fn test_scan_missing_root_is_empty() {
        let evidence = EvidenceScanner::default().scan(Path::new("/nonexistent/shipwright/repo"));
        assert!(evidence.is_empty());
    }

    #[test]
    fn test_scan_empty_root_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(EvidenceScanner::default().scan(dir.path()).is_empty());
    }

    #[test]
    fn test_gitignored_manifest_is_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".gitignore", "generated/\n");
        write(dir.path(), "package.json", "{}");
        write(dir.path(), "generated/package.json", "{}");

        let evidence = EvidenceScanner::default().scan(dir.path());
        assert_eq!(evidence.folder_count(), 1);
        assert!(!evidence.markers(Path::new(".")).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_not_followed() {
        let outside = TempDir::new().unwrap();
        write(outside.path(), "pom.xml", "<project/>");

        let dir = TempDir::new().unwrap();
        write(dir.path(), "package.json", "{}");
        std::os::unix::fs::symlink(outside.path(), dir.path().join("linked")).unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();

        let evidence = EvidenceScanner::default().scan(dir.path());
        assert_eq!(evidence.folder_count(), 1);
        assert!(evidence
            .folders()
            .flat_map(|(_, m)| m.iter())
            .all(|m| m.name != "pom.xml"));
    }
}
