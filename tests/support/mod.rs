//! Scripted collaborators shared by the integration tests
//!
//! The fakes create tiny repositories in a temp workspace, count their
//! calls and fail on demand, so the tests can drive the real job driver
//! and queue without git or a template engine.

#![allow(dead_code)]

use anyhow::{bail, Result};
use shipwright::collab::{
    ArtifactGenerator, ArtifactValidator, CheckoutError, CommitOutcome, Credentials,
    GenerationRequest, SourceCheckout,
};
use shipwright::model::{GeneratedArtifact, SourceLocation, ValidationReport};
use shipwright::pipeline::{Collaborators, DriverConfig, JobDriver, Pipeline, RetryPolicy};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Tracks how many calls are inside a section at once
#[derive(Debug, Default)]
pub struct Concurrency {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Concurrency {
    pub fn enter(&self) -> ConcurrencyGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        ConcurrencyGuard { owner: self }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

pub struct ConcurrencyGuard<'a> {
    owner: &'a Concurrency,
}

impl Drop for ConcurrencyGuard<'_> {
    fn drop(&mut self) {
        self.owner.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Checkout that materialises a Flask service per repository name
pub struct FakeCheckout {
    workspace: PathBuf,
    files: Vec<(String, String)>,
    clone_failures: Mutex<HashMap<String, VecDeque<CheckoutError>>>,
    pub clone_calls: AtomicUsize,
    pub commit_calls: AtomicUsize,
    pub committed: Mutex<Vec<PathBuf>>,
    pub clone_order: Mutex<Vec<String>>,
    pub credentials_seen: AtomicUsize,
}

impl FakeCheckout {
    pub fn new(workspace: &Path) -> Self {
        Self {
            workspace: workspace.to_path_buf(),
            files: vec![
                ("requirements.txt".to_string(), "flask==3.0.0\n".to_string()),
                (
                    "app.py".to_string(),
                    "from flask import Flask\napp = Flask(__name__)\n".to_string(),
                ),
            ],
            clone_failures: Mutex::new(HashMap::new()),
            clone_calls: AtomicUsize::new(0),
            commit_calls: AtomicUsize::new(0),
            committed: Mutex::new(Vec::new()),
            clone_order: Mutex::new(Vec::new()),
            credentials_seen: AtomicUsize::new(0),
        }
    }

    /// Replaces the files written into every checkout
    pub fn with_files(mut self, files: &[(&str, &str)]) -> Self {
        self.files = files
            .iter()
            .map(|(name, content)| (name.to_string(), content.to_string()))
            .collect();
        self
    }

    /// Queues failures returned by the next clones of `repository`
    pub fn fail_clone(&self, repository: &str, errors: Vec<CheckoutError>) {
        self.clone_failures
            .lock()
            .unwrap()
            .entry(repository.to_string())
            .or_default()
            .extend(errors);
    }

    pub fn clones(&self) -> usize {
        self.clone_calls.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.commit_calls.load(Ordering::SeqCst)
    }

    pub fn cloned(&self) -> Vec<String> {
        self.clone_order.lock().unwrap().clone()
    }
}

impl SourceCheckout for FakeCheckout {
    fn clone_source(
        &self,
        source: &SourceLocation,
        credentials: Option<&Credentials>,
    ) -> Result<PathBuf, CheckoutError> {
        self.clone_calls.fetch_add(1, Ordering::SeqCst);
        if credentials.is_some() {
            self.credentials_seen.fetch_add(1, Ordering::SeqCst);
        }

        let name = source.repository_name();
        self.clone_order.lock().unwrap().push(name.clone());
        if let Some(err) = self
            .clone_failures
            .lock()
            .unwrap()
            .get_mut(&name)
            .and_then(|queue| queue.pop_front())
        {
            return Err(err);
        }

        let target = self.workspace.join(&name);
        fs::create_dir_all(&target).map_err(|e| CheckoutError::Io(e.to_string()))?;
        for (file, content) in &self.files {
            fs::write(target.join(file), content).map_err(|e| CheckoutError::Io(e.to_string()))?;
        }
        Ok(target)
    }

    fn commit(&self, checkout: &Path, _message: &str) -> Result<CommitOutcome, CheckoutError> {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        self.committed.lock().unwrap().push(checkout.to_path_buf());
        Ok(CommitOutcome {
            committed: true,
            revision: Some("0000000".to_string()),
        })
    }
}

/// Generator that emits a Dockerfile and a values file
#[derive(Default)]
pub struct FakeGenerator {
    delay: Duration,
    failing: Mutex<HashSet<String>>,
    empty: bool,
    pub calls: AtomicUsize,
    pub concurrency: Concurrency,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Produces no artifacts at all
    pub fn producing_nothing(mut self) -> Self {
        self.empty = true;
        self
    }

    pub fn fail_for(&self, repository: &str) {
        self.failing.lock().unwrap().insert(repository.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ArtifactGenerator for FakeGenerator {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<Vec<GeneratedArtifact>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _inside = self.concurrency.enter();
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        if self.failing.lock().unwrap().contains(&request.repository.id) {
            bail!("no template for {}", request.detection.primary_stack);
        }
        if self.empty {
            return Ok(Vec::new());
        }

        Ok(vec![
            GeneratedArtifact::new(
                "Dockerfile",
                "",
                format!("FROM python:3.12-slim\n# {}\n", request.detection.primary_stack),
            ),
            GeneratedArtifact::new("values.yaml", "deploy/helm", "replicaCount: 1\n")
                .for_component("helm"),
        ])
    }
}

/// Validator whose verdict is fixed at construction
pub struct FakeValidator {
    valid: bool,
    pub calls: AtomicUsize,
}

impl FakeValidator {
    pub fn accepting() -> Self {
        Self {
            valid: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            valid: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ArtifactValidator for FakeValidator {
    fn validate(&self, artifact: &GeneratedArtifact) -> Result<ValidationReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.valid {
            Ok(ValidationReport::valid())
        } else {
            Ok(ValidationReport::invalid(vec![format!(
                "{} is not deployable",
                artifact.file_name
            )]))
        }
    }
}

/// Fast retry settings so backoff never dominates a test
pub fn fast_driver_config() -> DriverConfig {
    DriverConfig::new()
        .with_retry(
            RetryPolicy::new()
                .with_max_attempts(3)
                .with_backoff(Duration::from_millis(5), Duration::from_millis(20)),
        )
        .with_stage_timeout(Duration::from_secs(10))
}

/// Fakes plus the temp workspace they write into
pub struct Fixture {
    pub checkout: Arc<FakeCheckout>,
    pub generator: Arc<FakeGenerator>,
    pub validator: Arc<FakeValidator>,
    pub workspace: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self::build(|c| c, FakeGenerator::new(), FakeValidator::accepting())
    }

    pub fn build(
        checkout: impl FnOnce(FakeCheckout) -> FakeCheckout,
        generator: FakeGenerator,
        validator: FakeValidator,
    ) -> Self {
        let workspace = TempDir::new().unwrap();
        Self {
            checkout: Arc::new(checkout(FakeCheckout::new(workspace.path()))),
            generator: Arc::new(generator),
            validator: Arc::new(validator),
            workspace,
        }
    }

    pub fn with_generator(generator: FakeGenerator) -> Self {
        Self::build(|c| c, generator, FakeValidator::accepting())
    }

    pub fn with_validator(validator: FakeValidator) -> Self {
        Self::build(|c| c, FakeGenerator::new(), validator)
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators::new(
            self.checkout.clone(),
            self.generator.clone(),
            self.validator.clone(),
        )
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::standard(self.collaborators())
    }

    pub fn driver(&self) -> JobDriver {
        self.driver_with(fast_driver_config())
    }

    pub fn driver_with(&self, config: DriverConfig) -> JobDriver {
        JobDriver::new(self.pipeline(), config)
    }
}
