//! Lookup tables and manifest parsers used by the evidence scanner

use regex::Regex;
use roxmltree::Document;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Directories never descended into
pub const EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    "target",
    "build",
    "dist",
    "out",
    ".git",
    ".gradle",
    ".idea",
    ".venv",
    "venv",
    "__pycache__",
    ".mvn",
    ".next",
];

/// Framework configuration files recorded by exact name
pub const CONFIG_FILES: &[&str] = &[
    "web.xml",
    "applicationContext.xml",
    "application.properties",
    "application.yml",
    "application.yaml",
    "angular.json",
    "nest-cli.json",
    "next.config.js",
    "next.config.mjs",
    "next.config.ts",
    "nuxt.config.js",
    "nuxt.config.ts",
    "vue.config.js",
    "manage.py",
];

/// Framework configuration files recorded by suffix (Spring dispatcher servlets)
pub const CONFIG_SUFFIXES: &[&str] = &["-servlet.xml"];

/// Text searched for in source files of the given extensions
#[derive(Debug, Clone, Copy)]
pub struct SourceProbe {
    pub extensions: &'static [&'static str],
    pub needle: &'static str,
}

const JVM_SOURCES: &[&str] = &["java", "kt"];
const PYTHON_SOURCES: &[&str] = &["py"];
const SCRIPT_SOURCES: &[&str] = &["ts", "js", "mjs"];

pub const SOURCE_PROBES: &[SourceProbe] = &[
    SourceProbe {
        extensions: JVM_SOURCES,
        needle: "@SpringBootApplication",
    },
    SourceProbe {
        extensions: JVM_SOURCES,
        needle: "SpringApplication.run",
    },
    SourceProbe {
        extensions: JVM_SOURCES,
        needle: "@QuarkusMain",
    },
    SourceProbe {
        extensions: JVM_SOURCES,
        needle: "Micronaut.run",
    },
    SourceProbe {
        extensions: JVM_SOURCES,
        needle: "@EnableWebMvc",
    },
    SourceProbe {
        extensions: PYTHON_SOURCES,
        needle: "FastAPI(",
    },
    SourceProbe {
        extensions: PYTHON_SOURCES,
        needle: "Flask(",
    },
    SourceProbe {
        extensions: PYTHON_SOURCES,
        needle: "django.setup",
    },
    SourceProbe {
        extensions: SCRIPT_SOURCES,
        needle: "NestFactory.create",
    },
    SourceProbe {
        extensions: SCRIPT_SOURCES,
        needle: "express()",
    },
];

pub fn is_config_file(file_name: &str) -> bool {
    CONFIG_FILES.contains(&file_name) || CONFIG_SUFFIXES.iter().any(|s| file_name.ends_with(s))
}

pub fn is_probed_source(extension: &str) -> bool {
    SOURCE_PROBES
        .iter()
        .any(|p| p.extensions.contains(&extension))
}

/// Needles present in `content` for a source file with `extension`
pub fn probe_source(extension: &str, content: &str) -> Vec<&'static str> {
    SOURCE_PROBES
        .iter()
        .filter(|p| p.extensions.contains(&extension) && content.contains(p.needle))
        .map(|p| p.needle)
        .collect()
}

/// Declared dependencies of a manifest as `(name, version)` pairs
///
/// Unparseable manifests yield nothing; the manifest itself is still
/// recorded by the scanner.
pub fn extract_dependencies(manifest: &str, content: &str) -> Vec<(String, String)> {
    let deps = match manifest {
        "pom.xml" => maven_dependencies(content),
        "build.gradle" | "build.gradle.kts" => gradle_dependencies(content),
        "package.json" => npm_dependencies(content),
        "pyproject.toml" => pyproject_dependencies(content),
        "Pipfile" => pipfile_dependencies(content),
        "requirements.txt" => requirements_dependencies(content),
        "setup.py" => setup_py_dependencies(content),
        _ => Vec::new(),
    };

    let mut seen = HashSet::new();
    deps.into_iter()
        .filter(|(name, _)| seen.insert(name.clone()))
        .collect()
}

fn maven_dependencies(content: &str) -> Vec<(String, String)> {
    let doc = match Document::parse(content) {
        Ok(doc) => doc,
        Err(_) => return maven_dependencies_fallback(content),
    };

    let mut deps = Vec::new();
    for node in doc.descendants() {
        if !(node.has_tag_name("dependency") || node.has_tag_name("parent")) {
            continue;
        }

        let child_text = |tag: &str| {
            node.children()
                .find(|c| c.has_tag_name(tag))
                .and_then(|c| c.text())
                .map(|t| t.trim().to_string())
        };

        if let (Some(group), Some(artifact)) = (child_text("groupId"), child_text("artifactId")) {
            let version = child_text("version").unwrap_or_default();
            deps.push((format!("{}:{}", group, artifact), version));
        }
    }
    deps
}

fn maven_dependencies_fallback(content: &str) -> Vec<(String, String)> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"<dependency>\s*<groupId>([^<]+)</groupId>\s*<artifactId>([^<]+)</artifactId>(?:\s*<version>([^<]+)</version>)?").ok()
    });

    let Some(re) = re else {
        return Vec::new();
    };

    re.captures_iter(content)
        .filter_map(|caps| {
            let group = caps.get(1)?.as_str().trim();
            let artifact = caps.get(2)?.as_str().trim();
            let version = caps.get(3).map(|v| v.as_str().trim()).unwrap_or_default();
            Some((format!("{}:{}", group, artifact), version.to_string()))
        })
        .collect()
}

fn gradle_dependencies(content: &str) -> Vec<(String, String)> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"(?:implementation|api|compileOnly|runtimeOnly|testImplementation|annotationProcessor|compile)\s*\(?\s*["']([^:"']+):([^:"']+):?([^"')]*)["']"#).ok()
    });

    let Some(re) = re else {
        return Vec::new();
    };

    re.captures_iter(content)
        .filter_map(|caps| {
            let group = caps.get(1)?.as_str().trim();
            let artifact = caps.get(2)?.as_str().trim();
            let version = caps.get(3).map(|v| v.as_str().trim()).unwrap_or_default();
            Some((format!("{}:{}", group, artifact), version.to_string()))
        })
        .collect()
}

fn npm_dependencies(content: &str) -> Vec<(String, String)> {
    let parsed: serde_json::Value = match serde_json::from_str(content) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };

    let mut deps = Vec::new();
    for section in ["dependencies", "devDependencies", "peerDependencies"] {
        if let Some(table) = parsed.get(section).and_then(|v| v.as_object()) {
            for (name, version) in table {
                let version = version.as_str().unwrap_or_default().to_string();
                deps.push((name.clone(), version));
            }
        }
    }
    deps
}

fn pyproject_dependencies(content: &str) -> Vec<(String, String)> {
    let parsed: toml::Value = match toml::from_str(content) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };

    let mut deps = Vec::new();

    // PEP 621
    if let Some(list) = parsed
        .get("project")
        .and_then(|p| p.get("dependencies"))
        .and_then(|d| d.as_array())
    {
        for entry in list.iter().filter_map(|v| v.as_str()) {
            if let Some(dep) = split_requirement(entry) {
                deps.push(dep);
            }
        }
    }

    // Poetry
    if let Some(poetry) = parsed.get("tool").and_then(|t| t.get("poetry")) {
        for section in ["dependencies", "dev-dependencies"] {
            if let Some(table) = poetry.get(section).and_then(|d| d.as_table()) {
                deps.extend(python_table_dependencies(table));
            }
        }
    }

    deps
}

fn pipfile_dependencies(content: &str) -> Vec<(String, String)> {
    let parsed: toml::Value = match toml::from_str(content) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };

    let mut deps = Vec::new();
    for section in ["packages", "dev-packages"] {
        if let Some(table) = parsed.get(section).and_then(|d| d.as_table()) {
            deps.extend(python_table_dependencies(table));
        }
    }
    deps
}

fn python_table_dependencies(table: &toml::value::Table) -> Vec<(String, String)> {
    table
        .iter()
        .filter(|(name, _)| name.as_str() != "python")
        .map(|(name, value)| {
            let version = if let Some(v) = value.as_str() {
                v.to_string()
            } else {
                value
                    .get("version")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string()
            };
            (normalize_python_name(name), version)
        })
        .collect()
}

fn requirements_dependencies(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('-'))
        .filter_map(split_requirement)
        .collect()
}

fn setup_py_dependencies(content: &str) -> Vec<(String, String)> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"["']([A-Za-z0-9_.\-]+)\s*(?:\[[^\]]*\])?\s*((?:[<>=!~]=?)[^"']*)?["']"#).ok()
    });

    let Some(re) = re else {
        return Vec::new();
    };
    let Some(start) = content.find("install_requires") else {
        return Vec::new();
    };
    let block = &content[start..];
    let block = match block.find(']') {
        Some(end) => &block[..end],
        None => block,
    };

    re.captures_iter(block)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str();
            let version = caps.get(2).map(|v| v.as_str().trim()).unwrap_or_default();
            Some((normalize_python_name(name), version.to_string()))
        })
        .collect()
}

/// Splits a PEP 508 requirement string into name and version specifier
fn split_requirement(entry: &str) -> Option<(String, String)> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z0-9][A-Za-z0-9_.\-]*)\s*(?:\[[^\]]*\])?\s*([^;#]*)").ok()
    });

    let caps = re.as_ref()?.captures(entry.trim())?;
    let name = caps.get(1)?.as_str();
    let version = caps.get(2).map(|v| v.as_str().trim()).unwrap_or_default();
    Some((normalize_python_name(name), version.to_string()))
}

fn normalize_python_name(name: &str) -> String {
    name.trim().to_lowercase().replace('_', "-")
}
