//! The five standard stages and the collaborator bundle they delegate to

use super::stage::{Stage, StageContext, StageOutcome, StageOutput};
use crate::collab::{
    ArtifactGenerator, ArtifactValidator, CheckoutError, Credentials, GenerationRequest,
    SourceCheckout,
};
use crate::error::MigrationError;
use crate::model::StageKind;
use crate::scan::EvidenceScanner;
use crate::stack::{DetectionResult, StackClassifier};
use std::fs;
use std::path::{Component, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// External services the stages call, injected at construction
#[derive(Clone)]
pub struct Collaborators {
    pub checkout: Arc<dyn SourceCheckout>,
    pub generator: Arc<dyn ArtifactGenerator>,
    pub validator: Arc<dyn ArtifactValidator>,
    pub credentials: Option<Credentials>,
    pub scanner: EvidenceScanner,
    pub classifier: StackClassifier,
}

impl Collaborators {
    pub fn new(
        checkout: Arc<dyn SourceCheckout>,
        generator: Arc<dyn ArtifactGenerator>,
        validator: Arc<dyn ArtifactValidator>,
    ) -> Self {
        Self {
            checkout,
            generator,
            validator,
            credentials: None,
            scanner: EvidenceScanner::default(),
            classifier: StackClassifier::default(),
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_scanner(mut self, scanner: EvidenceScanner) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn with_classifier(mut self, classifier: StackClassifier) -> Self {
        self.classifier = classifier;
        self
    }
}

/// Ordered stage list, one per [`StageKind`]
#[derive(Clone)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
}

impl Pipeline {
    pub fn standard(collaborators: Collaborators) -> Self {
        let stages: Vec<Arc<dyn Stage>> = vec![
            Arc::new(CloneStage {
                checkout: collaborators.checkout.clone(),
                credentials: collaborators.credentials.clone(),
            }),
            Arc::new(DetectStage {
                scanner: collaborators.scanner.clone(),
                classifier: collaborators.classifier.clone(),
            }),
            Arc::new(GenerateStage {
                generator: collaborators.generator.clone(),
            }),
            Arc::new(ValidateStage {
                validator: collaborators.validator.clone(),
            }),
            Arc::new(CommitStage {
                checkout: collaborators.checkout,
            }),
        ];
        Self { stages }
    }

    /// Custom stage list, run in the given order
    pub fn from_stages(stages: Vec<Arc<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Replaces the stage of the same kind
    pub fn with_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        if let Some(slot) = self.stages.iter_mut().find(|s| s.kind() == stage.kind()) {
            *slot = stage;
        }
        self
    }

    pub fn stages(&self) -> &[Arc<dyn Stage>] {
        &self.stages
    }
}

fn checkout_failure(err: CheckoutError, fatal: fn(String) -> MigrationError) -> MigrationError {
    if err.is_transient() {
        MigrationError::Transient(err.to_string())
    } else {
        fatal(err.to_string())
    }
}

pub struct CloneStage {
    checkout: Arc<dyn SourceCheckout>,
    credentials: Option<Credentials>,
}

impl CloneStage {
    fn execute(&self, ctx: &StageContext) -> Result<StageOutput, MigrationError> {
        if let Some(existing) = &ctx.descriptor.local_checkout {
            if existing.is_dir() {
                debug!(path = %existing.display(), "Using pre-existing checkout");
                return Ok(StageOutput::CheckedOut(existing.clone()));
            }
            return Err(MigrationError::Checkout(format!(
                "local checkout {} does not exist",
                existing.display()
            )));
        }

        self.checkout
            .clone_source(&ctx.descriptor.source, self.credentials.as_ref())
            .map(StageOutput::CheckedOut)
            .map_err(|e| checkout_failure(e, MigrationError::Checkout))
    }
}

impl Stage for CloneStage {
    fn kind(&self) -> StageKind {
        StageKind::Clone
    }

    fn run(&self, context: &StageContext) -> StageOutcome {
        StageOutcome::from_result(self.execute(context))
    }
}

pub struct DetectStage {
    scanner: EvidenceScanner,
    classifier: StackClassifier,
}

impl Stage for DetectStage {
    fn kind(&self) -> StageKind {
        StageKind::Detect
    }

    fn run(&self, context: &StageContext) -> StageOutcome {
        StageOutcome::from_result(context.require_checkout().map(|root| {
            let evidence = self.scanner.scan(root);
            StageOutput::Detected(self.classifier.classify(&evidence))
        }))
    }
}

pub struct GenerateStage {
    generator: Arc<dyn ArtifactGenerator>,
}

impl GenerateStage {
    fn execute(&self, ctx: &StageContext) -> Result<StageOutput, MigrationError> {
        let checkout = ctx.require_checkout()?;
        let unknown = DetectionResult::unknown();
        let request = GenerationRequest {
            repository: &ctx.descriptor,
            checkout,
            detection: ctx.detection.as_ref().unwrap_or(&unknown),
            configuration: &ctx.configuration,
        };

        let artifacts = self
            .generator
            .generate(&request)
            .map_err(|e| MigrationError::Generation(format!("{:#}", e)))?;
        if artifacts.is_empty() {
            return Err(MigrationError::Generation(
                "generator produced no artifacts".to_string(),
            ));
        }
        info!(count = artifacts.len(), "Generated artifacts");
        Ok(StageOutput::Generated(artifacts))
    }
}

impl Stage for GenerateStage {
    fn kind(&self) -> StageKind {
        StageKind::Generate
    }

    fn run(&self, context: &StageContext) -> StageOutcome {
        // Generation failures are never transient
        match self.execute(context) {
            Ok(output) => StageOutcome::Advance(output),
            Err(err) => StageOutcome::FatalFailure(err),
        }
    }
}

/// Validates artifacts whose component is enabled in the configuration
///
/// Artifacts without a component tag always count as enabled. Any invalid
/// artifact fails the stage with a `Validation` error; the driver decides
/// whether that is fatal or a warning.
pub struct ValidateStage {
    validator: Arc<dyn ArtifactValidator>,
}

impl ValidateStage {
    fn execute(&self, ctx: &StageContext) -> Result<StageOutput, MigrationError> {
        let mut issues = Vec::new();
        let mut checked = 0;
        let mut skipped = 0;

        for artifact in &ctx.artifacts {
            let enabled = artifact
                .component
                .as_deref()
                .map_or(true, |c| ctx.configuration.has_component(c));
            if !enabled || !self.validator.supports(artifact) {
                skipped += 1;
                continue;
            }

            checked += 1;
            let path = artifact.path();
            match self.validator.validate(artifact) {
                Ok(report) if report.is_valid => {}
                Ok(report) => issues.extend(
                    report
                        .issues
                        .iter()
                        .map(|issue| format!("{}: {}", path.display(), issue)),
                ),
                Err(e) => issues.push(format!("{}: validator error: {:#}", path.display(), e)),
            }
        }

        if issues.is_empty() {
            debug!(checked, skipped, "Artifacts validated");
            Ok(StageOutput::Validated { checked, skipped })
        } else {
            Err(MigrationError::Validation(issues.join("; ")))
        }
    }
}

impl Stage for ValidateStage {
    fn kind(&self) -> StageKind {
        StageKind::Validate
    }

    fn run(&self, context: &StageContext) -> StageOutcome {
        StageOutcome::from_result(self.execute(context))
    }
}

/// Writes artifacts into the checkout, then asks the checkout to commit
pub struct CommitStage {
    checkout: Arc<dyn SourceCheckout>,
}

impl CommitStage {
    fn execute(&self, ctx: &StageContext) -> Result<StageOutput, MigrationError> {
        let root = ctx.require_checkout()?;

        // Nothing is written unless every artifact stays inside the checkout
        let relatives = ctx
            .artifacts
            .iter()
            .map(|artifact| contained_path(artifact.path()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut written: Vec<PathBuf> = Vec::with_capacity(relatives.len());
        for (artifact, relative) in ctx.artifacts.iter().zip(relatives) {
            let target = root.join(&relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    MigrationError::Commit(format!("cannot create {}: {}", parent.display(), e))
                })?;
            }
            fs::write(&target, &artifact.content).map_err(|e| {
                MigrationError::Commit(format!("cannot write {}: {}", target.display(), e))
            })?;
            written.push(relative);
        }

        let stack = ctx
            .detection
            .as_ref()
            .map(|d| d.primary_stack.name())
            .unwrap_or("unknown stack");
        let message = format!(
            "Add {} deployment artifacts for {} ({})",
            ctx.configuration.target_platform, ctx.descriptor.id, stack
        );

        let outcome = self
            .checkout
            .commit(root, &message)
            .map_err(|e| checkout_failure(e, MigrationError::Commit))?;

        info!(
            files = written.len(),
            committed = outcome.committed,
            revision = outcome.revision.as_deref().unwrap_or("-"),
            "Artifacts written"
        );
        Ok(StageOutput::Committed { written, outcome })
    }
}

/// Accepts only relative paths made of plain components
fn contained_path(path: PathBuf) -> Result<PathBuf, MigrationError> {
    let mut normal = 0;
    for component in path.components() {
        match component {
            Component::Normal(_) => normal += 1,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(MigrationError::Generation(format!(
                    "artifact path '{}' escapes the checkout",
                    path.display()
                )));
            }
        }
    }
    if normal == 0 {
        return Err(MigrationError::Generation(format!(
            "artifact path '{}' has no file name",
            path.display()
        )));
    }
    Ok(path)
}

impl Stage for CommitStage {
    fn kind(&self) -> StageKind {
        StageKind::Commit
    }

    fn run(&self, context: &StageContext) -> StageOutcome {
        StageOutcome::from_result(self.execute(context))
    }
}
