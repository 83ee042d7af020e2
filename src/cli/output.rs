//! Output formatting for multiple formats
//!
//! JSON and YAML serialise the library types as they are; the human format
//! renders a compact report with box-drawing connectors.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::model::{JobState, MigrationConfiguration, MigrationResult};
use crate::queue::BatchReport;
use crate::stack::{profile, DetectionResult};

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format (human-friendly, version-control friendly)
    Yaml,
    /// Human-readable formatted text
    Human,
}

#[derive(Serialize)]
struct DetectionOutput<'a> {
    repository: &'a Path,
    #[serde(flatten)]
    detection: &'a DetectionResult,
}

#[derive(Serialize)]
struct PresetOutput<'a> {
    name: &'a str,
    #[serde(flatten)]
    configuration: &'a MigrationConfiguration,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    fn serialize<T: Serialize>(&self, value: &T, what: &str) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(value)
                .with_context(|| format!("Failed to serialize {} to JSON", what)),
            OutputFormat::Yaml | OutputFormat::Human => serde_yaml::to_string(value)
                .with_context(|| format!("Failed to serialize {} to YAML", what)),
        }
    }

    pub fn format_detection(&self, repository: &Path, result: &DetectionResult) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(format_detection_human(repository, result)),
            _ => self.serialize(
                &DetectionOutput {
                    repository,
                    detection: result,
                },
                "detection result",
            ),
        }
    }

    pub fn format_report(&self, report: &BatchReport) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(format_report_human(report)),
            _ => self.serialize(report, "migration report"),
        }
    }

    pub fn format_preset(&self, name: &str, configuration: &MigrationConfiguration) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(format_preset_human(name, configuration)),
            _ => self.serialize(
                &PresetOutput {
                    name,
                    configuration,
                },
                "preset",
            ),
        }
    }

    pub fn format_preset_list(&self, names: &[String]) -> Result<String> {
        match self.format {
            OutputFormat::Human if names.is_empty() => Ok("No presets saved\n".to_string()),
            OutputFormat::Human => Ok(names.iter().map(|n| format!("{}\n", n)).collect()),
            _ => self.serialize(&names, "preset list"),
        }
    }
}

fn format_detection_human(repository: &Path, result: &DetectionResult) -> String {
    let mut output = String::new();

    if result.is_unknown() {
        output.push_str("\u{26A0} Stack Detection Result (Unknown)\n");
    } else {
        output.push_str("\u{2713} Stack Detection Result\n");
    }
    output.push_str(RULE);
    output.push_str("\n\n");

    output.push_str(&format!("Repository:  {}\n", repository.display()));
    output.push_str(&format!("Stack:       {}\n", result.primary_stack));
    let score = result.complexity_score as usize;
    output.push_str(&format!(
        "Complexity:  {}{} {}/5\n",
        "\u{2588}".repeat(score),
        "\u{2591}".repeat(5usize.saturating_sub(score)),
        score
    ));
    if result.monorepo {
        output.push_str("Layout:      monorepo\n");
    } else if result.multi_stack {
        output.push_str("Layout:      multi-stack\n");
    }
    output.push('\n');

    if !result.components.is_empty() {
        output.push_str("Components:\n");
        for (i, component) in result.components.iter().enumerate() {
            let connector = if i + 1 == result.components.len() {
                "\u{2514}"
            } else {
                "\u{251C}"
            };
            let location = if component.location.as_os_str().is_empty() {
                ".".to_string()
            } else {
                component.location.display().to_string()
            };
            let port = profile::profile(component.stack)
                .default_port
                .map(|p| format!(" (port {})", p))
                .unwrap_or_default();
            output.push_str(&format!(
                "{}\u{2500} {}: {}{}\n",
                connector, location, component.stack, port
            ));
        }
    }

    output
}

fn state_symbol(state: JobState) -> &'static str {
    match state {
        JobState::Succeeded => "\u{2713}",
        JobState::Cancelled => "\u{2298}",
        _ => "\u{2717}",
    }
}

fn format_result_human(output: &mut String, result: &MigrationResult) {
    output.push_str(&format!(
        "{} {} [{}] {}ms\n",
        state_symbol(result.state),
        result.repository,
        result.state,
        result.duration_ms
    ));

    if let Some(detection) = &result.detection {
        output.push_str(&format!(
            "  Stack: {} (complexity {})\n",
            detection.primary_stack, detection.complexity_score
        ));
    }
    if let Some(error) = &result.error {
        output.push_str(&format!("  Error ({}): {}\n", error.kind, error.message));
    }
    for artifact in &result.artifacts {
        output.push_str(&format!("  \u{2500} {}\n", artifact.display()));
    }
    for warning in &result.warnings {
        output.push_str(&format!("  \u{26A0} {}\n", warning));
    }
}

fn format_report_human(report: &BatchReport) -> String {
    let mut output = String::new();
    output.push_str("Migration Report\n");
    output.push_str(RULE);
    output.push_str("\n\n");

    for result in &report.results {
        format_result_human(&mut output, result);
        output.push('\n');
    }

    output.push_str(&format!(
        "{} jobs: {} succeeded, {} failed, {} cancelled\n",
        report.len(),
        report.succeeded(),
        report.failed(),
        report.cancelled()
    ));
    output
}

fn format_preset_human(name: &str, configuration: &MigrationConfiguration) -> String {
    let mut output = String::new();
    output.push_str(&format!("Preset: {}\n", name));
    output.push_str(RULE);
    output.push_str("\n\n");

    output.push_str(&format!("Platform:    {}\n", configuration.target_platform));
    let components: Vec<&str> = configuration.components.iter().map(String::as_str).collect();
    output.push_str(&format!("Components:  {}\n", components.join(", ")));
    output.push_str(&format!(
        "Validation:  {}\n",
        if configuration.validation_required {
            "required"
        } else {
            "optional"
        }
    ));
    if !configuration.custom_settings.is_empty() {
        output.push_str("Settings:\n");
        for (key, value) in &configuration.custom_settings {
            output.push_str(&format!("  {} = {}\n", key, value));
        }
    }
    output
}
