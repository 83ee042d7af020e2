//! shipwright - repository classification and migration job orchestration
//!
//! This library scans source repositories for technology-stack evidence,
//! classifies them, and drives a bounded pool of migration jobs that turn
//! each repository into container deployment artifacts.
//!
//! # Core Concepts
//!
//! - **Evidence**: manifests, declared dependencies, framework config files
//!   and entry-point annotations found by the [`scan`] walker
//! - **Classification**: [`stack::StackClassifier`] maps evidence to a
//!   [`stack::StackKind`] and a complexity score from 1 to 5
//! - **Jobs**: a [`pipeline::MigrationJob`] runs clone, detect, generate,
//!   validate and commit stages with retry, timeout and cancellation
//! - **Queue**: [`queue::MigrationQueue`] runs many jobs concurrently with a
//!   fixed worker limit, priority ordering and pause/resume
//!
//! # Example Usage
//!
//! ```no_run
//! use shipwright::collab::{GitCheckout, PlanGenerator, StructuredValidator};
//! use shipwright::model::{MigrationConfiguration, RepositoryDescriptor};
//! use shipwright::pipeline::{Collaborators, DriverConfig, JobDriver, Pipeline};
//! use shipwright::queue::{MigrationQueue, QueueOptions};
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let collaborators = Collaborators::new(
//!     Arc::new(GitCheckout::new("/tmp/shipwright")),
//!     Arc::new(PlanGenerator::new()),
//!     Arc::new(StructuredValidator::new()),
//! );
//! let driver = JobDriver::new(Pipeline::standard(collaborators), DriverConfig::new());
//! let queue = MigrationQueue::new(driver, QueueOptions::new().with_workers(2));
//!
//! queue.enqueue(
//!     RepositoryDescriptor::from_source("https://github.com/acme/shop.git"),
//!     MigrationConfiguration::default(),
//! );
//! let report = queue.process().wait().await;
//! println!("{} of {} succeeded", report.succeeded(), report.len());
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`scan`]: repository walker and manifest probes
//! - [`stack`]: stack tags, rule tables, profiles and the classifier
//! - [`pipeline`]: job state machine, stages and the job driver
//! - [`queue`]: multi-job orchestrator
//! - [`collab`]: checkout, generator, validator and preset store contracts
//! - [`progress`]: progress sinks and asynchronous delivery

pub mod cli;
pub mod collab;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod queue;
pub mod scan;
pub mod stack;
pub mod util;

pub use config::{ConfigError, ShipwrightConfig};
pub use error::{ErrorKind, MigrationError, QueueError, TransitionError};
pub use model::{
    JobId, JobState, MigrationConfiguration, MigrationResult, RepositoryDescriptor, StageKind,
};
pub use pipeline::{Collaborators, DriverConfig, JobDriver, MigrationJob, Pipeline, RetryPolicy};
pub use queue::{BatchReport, MigrationQueue, ProcessHandle, QueueOptions, QueueStatus};
pub use stack::{DetectionResult, StackClassifier, StackKind};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
