//! Artifact validation contract and a syntax-level validator

use crate::model::{GeneratedArtifact, ValidationReport};
use anyhow::Result;
use serde::Deserialize as _;
use std::path::Component;

pub trait ArtifactValidator: Send + Sync {
    /// Whether this validator knows how to check the artifact at all
    fn supports(&self, _artifact: &GeneratedArtifact) -> bool {
        true
    }

    fn validate(&self, artifact: &GeneratedArtifact) -> Result<ValidationReport>;
}

pub trait ArtifactRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, artifact: &GeneratedArtifact) -> Result<()>;
}

pub struct NonEmptyContentRule;

impl ArtifactRule for NonEmptyContentRule {
    fn name(&self) -> &'static str {
        "NonEmptyContent"
    }

    fn check(&self, artifact: &GeneratedArtifact) -> Result<()> {
        if artifact.content.trim().is_empty() {
            anyhow::bail!("{} is empty", artifact.file_name);
        }
        Ok(())
    }
}

pub struct RelativePathRule;

impl ArtifactRule for RelativePathRule {
    fn name(&self) -> &'static str {
        "RelativePath"
    }

    fn check(&self, artifact: &GeneratedArtifact) -> Result<()> {
        if artifact.file_name.is_empty() || artifact.file_name.contains(['/', '\\']) {
            anyhow::bail!("invalid file name '{}'", artifact.file_name);
        }
        let escapes = artifact
            .relative_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            anyhow::bail!(
                "path '{}' must stay inside the repository",
                artifact.relative_path.display()
            );
        }
        Ok(())
    }
}

pub struct SyntaxRule;

impl ArtifactRule for SyntaxRule {
    fn name(&self) -> &'static str {
        "Syntax"
    }

    fn check(&self, artifact: &GeneratedArtifact) -> Result<()> {
        match artifact.extension() {
            Some("yaml") | Some("yml") => {
                // Multi-document files are common for Kubernetes manifests
                for document in serde_yaml::Deserializer::from_str(&artifact.content) {
                    serde::de::IgnoredAny::deserialize(document)?;
                }
            }
            Some("json") => {
                serde_json::from_str::<serde_json::Value>(&artifact.content)?;
            }
            Some("toml") => {
                toml::from_str::<toml::Value>(&artifact.content)?;
            }
            _ => {}
        }
        Ok(())
    }
}

/// Runs a rule list over each artifact and reports every broken rule
pub struct StructuredValidator {
    rules: Vec<Box<dyn ArtifactRule>>,
}

impl StructuredValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: Vec<Box<dyn ArtifactRule>>) -> Self {
        Self { rules }
    }
}

impl Default for StructuredValidator {
    fn default() -> Self {
        Self {
            rules: vec![
                Box::new(NonEmptyContentRule),
                Box::new(RelativePathRule),
                Box::new(SyntaxRule),
            ],
        }
    }
}

impl ArtifactValidator for StructuredValidator {
    fn supports(&self, artifact: &GeneratedArtifact) -> bool {
        matches!(
            artifact.extension(),
            Some("yaml" | "yml" | "json" | "toml")
        ) || artifact.file_name == "Dockerfile"
    }

    fn validate(&self, artifact: &GeneratedArtifact) -> Result<ValidationReport> {
        let issues: Vec<String> = self
            .rules
            .iter()
            .filter_map(|rule| {
                rule.check(artifact)
                    .err()
                    .map(|e| format!("[{}] {}", rule.name(), e))
            })
            .collect();

        if issues.is_empty() {
            Ok(ValidationReport::valid())
        } else {
            Ok(ValidationReport::invalid(issues))
        }
    }
}
