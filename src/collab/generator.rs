//! Artifact generation contract and the plan-file generator

use crate::model::{GeneratedArtifact, MigrationConfiguration, RepositoryDescriptor};
use crate::stack::{profile, DetectionResult, StackKind};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const PLAN_FILE_STEM: &str = "shipwright-plan";

/// Everything a generator may look at for one repository
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub repository: &'a RepositoryDescriptor,
    pub checkout: &'a Path,
    pub detection: &'a DetectionResult,
    pub configuration: &'a MigrationConfiguration,
}

/// Produces deployment artifacts; any error fails the job
pub trait ArtifactGenerator: Send + Sync {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<Vec<GeneratedArtifact>>;
}

#[derive(Debug, Serialize)]
struct MigrationPlan<'a> {
    repository: &'a str,
    source: String,
    primary_stack: StackKind,
    complexity_score: u8,
    monorepo: bool,
    multi_stack: bool,
    target_platform: &'a str,
    requested_components: Vec<&'a str>,
    services: Vec<PlannedService>,
    settings: &'a BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct PlannedService {
    stack: StackKind,
    location: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
}

/// Writes a machine-readable migration plan as `shipwright-plan.yaml` and
/// `shipwright-plan.json` at the repository root
///
/// The plan lists the detected services and the requested components; it
/// is the hand-off point for template-based generators.
#[derive(Debug, Clone, Default)]
pub struct PlanGenerator;

impl PlanGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl ArtifactGenerator for PlanGenerator {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<Vec<GeneratedArtifact>> {
        let detection = request.detection;
        let configuration = request.configuration;

        let services = detection
            .components
            .iter()
            .map(|c| PlannedService {
                stack: c.stack,
                location: c.location.clone(),
                port: configuration
                    .setting("port")
                    .and_then(|p| p.parse().ok())
                    .or(profile::profile(c.stack).default_port),
            })
            .collect();

        let plan = MigrationPlan {
            repository: &request.repository.id,
            source: request.repository.source.to_string(),
            primary_stack: detection.primary_stack,
            complexity_score: detection.complexity_score,
            monorepo: detection.monorepo,
            multi_stack: detection.multi_stack,
            target_platform: &configuration.target_platform,
            requested_components: configuration.components.iter().map(String::as_str).collect(),
            services,
            settings: &configuration.custom_settings,
        };

        let yaml = serde_yaml::to_string(&plan).context("Failed to render plan as YAML")?;
        let json = serde_json::to_string_pretty(&plan).context("Failed to render plan as JSON")?;

        Ok(vec![
            GeneratedArtifact::new(format!("{}.yaml", PLAN_FILE_STEM), "", yaml),
            GeneratedArtifact::new(format!("{}.json", PLAN_FILE_STEM), "", json),
        ])
    }
}
