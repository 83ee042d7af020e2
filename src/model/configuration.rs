use crate::error::MigrationError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Deployment platforms the pipeline knows how to target
pub const KNOWN_PLATFORMS: &[&str] = &["kubernetes", "openshift", "docker-compose", "docker"];

/// Optional component tags a configuration may request
pub const KNOWN_COMPONENTS: &[&str] = &[
    "dockerfile",
    "helm",
    "kustomize",
    "compose",
    "cicd",
    "monitoring",
];

const DEFAULT_PLATFORM: &str = "kubernetes";

/// Per-job migration settings
///
/// Copied into each job at enqueue time; mutating the caller's copy
/// afterwards never reaches in-flight jobs. Field order matters for TOML
/// serialisation (plain values before tables).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationConfiguration {
    pub target_platform: String,
    #[serde(default)]
    pub components: BTreeSet<String>,
    #[serde(default = "default_validation_required")]
    pub validation_required: bool,
    #[serde(default)]
    pub custom_settings: BTreeMap<String, String>,
}

fn default_validation_required() -> bool {
    true
}

impl Default for MigrationConfiguration {
    fn default() -> Self {
        Self::new(DEFAULT_PLATFORM).with_component("dockerfile")
    }
}

impl MigrationConfiguration {
    pub fn new(target_platform: impl Into<String>) -> Self {
        Self {
            target_platform: target_platform.into(),
            components: BTreeSet::new(),
            validation_required: true,
            custom_settings: BTreeMap::new(),
        }
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.components.insert(component.into());
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_settings.insert(key.into(), value.into());
        self
    }

    pub fn with_validation_required(mut self, required: bool) -> Self {
        self.validation_required = required;
        self
    }

    pub fn has_component(&self, component: &str) -> bool {
        self.components.contains(component)
    }

    pub fn setting(&self, key: &str) -> Option<&str> {
        self.custom_settings.get(key).map(String::as_str)
    }

    pub fn is_kubernetes_family(&self) -> bool {
        matches!(self.target_platform.as_str(), "kubernetes" | "openshift")
    }

    /// Rejects empty, unknown or contradictory settings
    pub fn validate(&self) -> Result<(), MigrationError> {
        let platform = self.target_platform.trim();
        if platform.is_empty() {
            return Err(MigrationError::Configuration(
                "target platform must not be empty".to_string(),
            ));
        }
        if !KNOWN_PLATFORMS.contains(&platform) {
            return Err(MigrationError::Configuration(format!(
                "unknown target platform '{}'. Valid options: {}",
                platform,
                KNOWN_PLATFORMS.join(", ")
            )));
        }

        if let Some(unknown) = self
            .components
            .iter()
            .find(|c| !KNOWN_COMPONENTS.contains(&c.as_str()))
        {
            return Err(MigrationError::Configuration(format!(
                "unknown component '{}'. Valid options: {}",
                unknown,
                KNOWN_COMPONENTS.join(", ")
            )));
        }

        for manifest_tool in ["helm", "kustomize"] {
            if self.has_component(manifest_tool) && !self.is_kubernetes_family() {
                return Err(MigrationError::Configuration(format!(
                    "component '{}' requires a kubernetes platform, got '{}'",
                    manifest_tool, platform
                )));
            }
        }

        if self.has_component("compose") && self.is_kubernetes_family() {
            return Err(MigrationError::Configuration(format!(
                "component 'compose' cannot target platform '{}'",
                platform
            )));
        }

        if self.custom_settings.keys().any(|k| k.trim().is_empty()) {
            return Err(MigrationError::Configuration(
                "custom setting keys must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configuration_is_valid() {
        let config = MigrationConfiguration::default();
        assert_eq!(config.target_platform, "kubernetes");
        assert!(config.has_component("dockerfile"));
        assert!(config.validation_required);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_clone_is_independent_snapshot() {
        let template = MigrationConfiguration::new("kubernetes").with_component("helm");
        let snapshot = template.clone();
        let template = template.with_component("monitoring");

        assert!(!snapshot.has_component("monitoring"));
        assert!(template.has_component("monitoring"));
    }

    #[test]
    fn test_rejects_empty_platform() {
        let err = MigrationConfiguration::new("  ").validate().unwrap_err();
        assert!(matches!(err, MigrationError::Configuration(_)));
    }

    #[test]
    fn test_rejects_unknown_platform_and_component() {
        assert!(MigrationConfiguration::new("nomad").validate().is_err());
        assert!(MigrationConfiguration::new("kubernetes")
            .with_component("terraform")
            .validate()
            .is_err());
    }

    #[test]
    fn test_rejects_contradictions() {
        let helm_on_compose = MigrationConfiguration::new("docker-compose").with_component("helm");
        assert!(helm_on_compose.validate().is_err());

        let compose_on_k8s = MigrationConfiguration::new("kubernetes").with_component("compose");
        assert!(compose_on_k8s.validate().is_err());

        let fine = MigrationConfiguration::new("openshift")
            .with_component("helm")
            .with_component("monitoring")
            .with_setting("namespace", "shop");
        assert!(fine.validate().is_ok());
        assert_eq!(fine.setting("namespace"), Some("shop"));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = MigrationConfiguration::new("docker-compose")
            .with_component("compose")
            .with_setting("registry", "ghcr.io/acme")
            .with_validation_required(false);

        let text = toml::to_string(&config).unwrap();
        let parsed: MigrationConfiguration = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_missing_optional_fields_use_defaults() {
        let parsed: MigrationConfiguration = toml::from_str("target_platform = \"docker\"").unwrap();
        assert!(parsed.components.is_empty());
        assert!(parsed.validation_required);
        assert!(parsed.custom_settings.is_empty());
    }
}
