//! Command handlers; each returns the process exit code

use super::commands::{DetectArgs, MigrateArgs, PresetCommands};
use super::console::ConsoleSink;
use super::output::{OutputFormat, OutputFormatter};
use crate::collab::{
    ConfigurationStore, Credentials, FileConfigStore, GitCheckout, PlanGenerator,
    StructuredValidator,
};
use crate::config::ShipwrightConfig;
use crate::model::{MigrationConfiguration, RepositoryDescriptor};
use crate::pipeline::{Collaborators, JobDriver, Pipeline};
use crate::progress::{LoggingSink, ProgressDispatcher, ProgressSink};
use crate::queue::{MigrationQueue, QueueOptions};
use crate::scan::EvidenceScanner;
use crate::stack::StackClassifier;

use anyhow::{bail, Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

const DEFAULT_PLATFORM: &str = "kubernetes";
const TOKEN_ENV: &str = "SHIPWRIGHT_GIT_TOKEN";
const USERNAME_ENV: &str = "SHIPWRIGHT_GIT_USERNAME";

pub fn handle_detect(args: &DetectArgs, quiet: bool) -> i32 {
    match run_detect(args, quiet) {
        Ok(()) => 0,
        Err(e) => {
            error!("Detection failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

fn run_detect(args: &DetectArgs, quiet: bool) -> Result<()> {
    let repo_path = args
        .repository_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    if !repo_path.is_dir() {
        bail!("Repository path does not exist: {}", repo_path.display());
    }
    let repo_path = repo_path
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", repo_path.display()))?;

    let mut config = ShipwrightConfig::default();
    if let Some(depth) = args.max_depth {
        config = config.with_scan_max_depth(depth);
    }
    config.validate().context("Invalid configuration")?;

    info!("Analyzing repository: {}", repo_path.display());
    let evidence = EvidenceScanner::new(config.scan_config()).scan(&repo_path);
    let detection = StackClassifier::default().classify(&evidence);
    info!(
        stack = %detection.primary_stack,
        score = detection.complexity_score,
        "Detection complete"
    );

    let output = OutputFormatter::new(args.format.into()).format_detection(&repo_path, &detection)?;
    emit(&output, args.output.as_deref(), quiet)
}

fn emit(output: &str, file: Option<&Path>, quiet: bool) -> Result<()> {
    match file {
        Some(path) => {
            std::fs::write(path, output)
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            info!("Output written to: {}", path.display());
            if !quiet {
                println!("Output written to: {}", path.display());
            }
        }
        None => println!("{}", output),
    }
    Ok(())
}

pub async fn handle_migrate(args: &MigrateArgs, quiet: bool) -> i32 {
    match run_migrate(args, quiet).await {
        Ok(all_succeeded) => {
            if all_succeeded {
                0
            } else {
                1
            }
        }
        Err(e) => {
            error!("Migration failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

/// Starts from the named preset or the default, then applies command-line
/// overrides on top
fn build_configuration(
    args: &MigrateArgs,
    store: Option<&dyn ConfigurationStore>,
) -> Result<MigrationConfiguration> {
    let mut configuration = match (&args.preset, store) {
        (Some(name), Some(store)) => store
            .load(name)
            .with_context(|| format!("Failed to load preset '{}'", name))?,
        (Some(name), None) => bail!("Preset '{}' requested but no preset directory is available", name),
        (None, _) => MigrationConfiguration::new(DEFAULT_PLATFORM).with_component("dockerfile"),
    };

    if let Some(platform) = &args.platform {
        configuration.target_platform = platform.clone();
    }
    for component in &args.components {
        configuration.components.insert(component.clone());
    }
    for (key, value) in &args.settings {
        configuration
            .custom_settings
            .insert(key.clone(), value.clone());
    }
    if args.no_validate {
        configuration.validation_required = false;
    }

    configuration
        .validate()
        .context("Invalid migration configuration")?;
    Ok(configuration)
}

fn credentials_from_env() -> Option<Credentials> {
    let token = env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty())?;
    let credentials = Credentials::token(token);
    Some(match env::var(USERNAME_ENV) {
        Ok(username) if !username.is_empty() => credentials.with_username(username),
        _ => credentials,
    })
}

async fn run_migrate(args: &MigrateArgs, quiet: bool) -> Result<bool> {
    let mut config = ShipwrightConfig::default();
    if let Some(workers) = args.workers {
        config = config.with_workers(workers);
    }
    if let Some(attempts) = args.max_attempts {
        config = config.with_max_attempts(attempts);
    }
    config.validate().context("Invalid configuration")?;
    debug!("{}", config);

    let store = config.preset_dir.clone().map(FileConfigStore::new);
    let configuration = build_configuration(
        args,
        store.as_ref().map(|s| s as &dyn ConfigurationStore),
    )?;

    if let Some(name) = &args.save_preset {
        let store = store
            .as_ref()
            .context("No preset directory available to save presets")?;
        store
            .save(name, &configuration)
            .with_context(|| format!("Failed to save preset '{}'", name))?;
        info!(preset = %name, "Preset saved");
    }

    let workspace = args
        .workspace
        .clone()
        .unwrap_or_else(|| env::temp_dir().join("shipwright-workspace"));
    let mut collaborators = Collaborators::new(
        Arc::new(GitCheckout::new(workspace).with_commit(args.commit)),
        Arc::new(PlanGenerator::new()),
        Arc::new(StructuredValidator::new()),
    )
    .with_scanner(EvidenceScanner::new(config.scan_config()));
    if let Some(credentials) = credentials_from_env() {
        debug!("Using git credentials from {}", TOKEN_ENV);
        collaborators = collaborators.with_credentials(credentials);
    }

    let driver = JobDriver::new(Pipeline::standard(collaborators), config.driver_config());

    let sink: Arc<dyn ProgressSink> = if quiet {
        Arc::new(LoggingSink)
    } else {
        Arc::new(ConsoleSink::new())
    };
    let dispatcher = ProgressDispatcher::spawn(sink);

    let queue = MigrationQueue::new(
        driver,
        QueueOptions::new()
            .with_workers(config.workers)
            .with_progress(dispatcher.emitter()),
    );

    for source in &args.sources {
        let id = queue.enqueue(RepositoryDescriptor::from_source(source), configuration.clone());
        debug!(job_id = %id.short(), source = %source, "Queued");
    }

    info!(jobs = args.sources.len(), workers = config.workers, "Processing migration queue");
    let report = queue.process().wait().await;
    drop(queue);
    if tokio::task::spawn_blocking(move || dispatcher.shutdown())
        .await
        .is_err()
    {
        debug!("Progress display did not shut down cleanly");
    }

    let output = OutputFormatter::new(args.format.into()).format_report(&report)?;
    println!("{}", output);

    Ok(report.all_succeeded())
}

pub fn handle_presets(command: &PresetCommands) -> i32 {
    match run_presets(command) {
        Ok(()) => 0,
        Err(e) => {
            error!("Preset command failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

fn run_presets(command: &PresetCommands) -> Result<()> {
    let config = ShipwrightConfig::default();
    let store = FileConfigStore::new(config.require_preset_dir()?);

    let output = match command {
        PresetCommands::List => {
            let names = store.list().context("Failed to list presets")?;
            OutputFormatter::new(OutputFormat::Human).format_preset_list(&names)?
        }
        PresetCommands::Show { name, format } => {
            let configuration = store
                .load(name)
                .with_context(|| format!("Failed to load preset '{}'", name))?;
            OutputFormatter::new((*format).into()).format_preset(name, &configuration)?
        }
    };
    print!("{}", output);
    Ok(())
}
