use super::kind::{Ecosystem, FrameworkClass, StackKind};
use super::profile::{profile, ScoringWeights};
use super::rules;
use crate::model::MigrationConfiguration;
use crate::scan::{Evidence, Marker, MarkerKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const MIN_SCORE: u8 = 1;
const MAX_SCORE: u8 = 5;
const MONOREPO_BONUS_CAP: usize = 2;

/// Stack found in one project folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentResult {
    pub stack: StackKind,
    pub location: PathBuf,
    pub evidence: Vec<Marker>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub primary_stack: StackKind,
    pub components: Vec<ComponentResult>,
    pub monorepo: bool,
    pub multi_stack: bool,
    /// Always within 1..=5
    pub complexity_score: u8,
}

impl DetectionResult {
    pub fn unknown() -> Self {
        Self {
            primary_stack: StackKind::Unknown,
            components: Vec::new(),
            monorepo: false,
            multi_stack: false,
            complexity_score: MIN_SCORE,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.primary_stack == StackKind::Unknown
    }

    pub fn component_stacks(&self) -> BTreeSet<StackKind> {
        self.components.iter().map(|c| c.stack).collect()
    }

    /// Configuration seeded from the profiles of the detected stacks
    ///
    /// Components that contradict `platform` are left out, so the result
    /// always passes [`MigrationConfiguration::validate`] for a known
    /// platform. An unknown repository gets a Dockerfile only.
    pub fn recommended_configuration(&self, platform: &str) -> MigrationConfiguration {
        let mut config = MigrationConfiguration::new(platform).with_component("dockerfile");

        for stack in self.component_stacks() {
            for component in profile(stack).components {
                config = config.with_component(*component);
            }
        }

        if config.is_kubernetes_family() {
            config.components.remove("compose");
        } else {
            config.components.remove("helm");
            config.components.remove("kustomize");
            if platform == "docker-compose" {
                config = config.with_component("compose");
            }
        }

        if let [single] = self.components.as_slice() {
            if let Some(port) = profile(single.stack).default_port {
                config = config.with_setting("port", port.to_string());
            }
        }

        config
    }
}

/// Turns scanner evidence into a [`DetectionResult`]
///
/// Pure function of the evidence and the weight table: the same evidence
/// always yields the same result, component order follows folder order.
#[derive(Debug, Clone, Default)]
pub struct StackClassifier {
    weights: ScoringWeights,
}

impl StackClassifier {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn classify(&self, evidence: &Evidence) -> DetectionResult {
        let components: Vec<ComponentResult> = evidence
            .folders()
            .filter_map(|(folder, markers)| classify_folder(folder, markers))
            .collect();

        if components.is_empty() {
            debug!(folders = evidence.folder_count(), "No recognised project manifests");
            return DetectionResult::unknown();
        }

        // Plain build-tool folders next to framework projects are usually
        // aggregators (Maven parent poms, npm workspace roots) and do not
        // count as a stack of their own
        let mut counted: Vec<&ComponentResult> = components
            .iter()
            .filter(|c| c.stack.class() != FrameworkClass::Generic)
            .collect();
        if counted.is_empty() {
            counted = components.iter().collect();
        }

        let kinds: BTreeSet<StackKind> = counted.iter().map(|c| c.stack).collect();
        let multi_stack = kinds.len() > 1;
        let monorepo = counted.len() > 1 && !multi_stack;

        let primary_stack = if multi_stack {
            StackKind::MultiStack
        } else if monorepo {
            StackKind::Monorepo
        } else {
            counted[0].stack
        };

        // Multi-stack repositories are scored by their heaviest component
        let base = kinds
            .iter()
            .map(|kind| self.weights.weight(*kind))
            .max()
            .unwrap_or(0);
        let bonus = if monorepo {
            (counted.len() - 1).min(MONOREPO_BONUS_CAP) as u8
        } else {
            0
        };
        let complexity_score = MIN_SCORE
            .saturating_add(base)
            .saturating_add(bonus)
            .clamp(MIN_SCORE, MAX_SCORE);

        info!(
            primary = %primary_stack,
            components = components.len(),
            monorepo,
            multi_stack,
            complexity_score,
            "Classified repository"
        );

        DetectionResult {
            primary_stack,
            components,
            monorepo,
            multi_stack,
            complexity_score,
        }
    }
}

/// Picks the stack for one folder
///
/// Ecosystems are tried in fixed order. A framework match in any present
/// ecosystem beats a generic build-tool match in an earlier one, so a Maven
/// project that also carries a `package.json` for its frontend tooling is
/// still reported by its framework.
fn classify_folder(folder: &Path, markers: &[Marker]) -> Option<ComponentResult> {
    let present: BTreeSet<Ecosystem> = markers
        .iter()
        .filter(|m| m.kind == MarkerKind::Manifest)
        .filter_map(|m| Ecosystem::for_manifest(&m.name))
        .collect();

    if present.is_empty() {
        return None;
    }

    let candidates: Vec<StackKind> = Ecosystem::ALL
        .iter()
        .copied()
        .filter(|eco| present.contains(eco))
        .map(|eco| rules::first_match(eco, markers))
        .filter(|stack| *stack != StackKind::Unknown)
        .collect();

    let stack = candidates
        .iter()
        .copied()
        .find(|stack| stack.class() != FrameworkClass::Generic)
        .or_else(|| candidates.first().copied())?;

    debug!(folder = %folder.display(), stack = %stack, "Classified folder");

    Some(ComponentResult {
        stack,
        location: folder.to_path_buf(),
        evidence: markers.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spring_boot_evidence() -> Evidence {
        Evidence::builder()
            .marker(".", Marker::manifest("pom.xml"))
            .marker(
                ".",
                Marker::dependency("org.springframework.boot:spring-boot-starter-web", "3.2.0"),
            )
            .marker(
                ".",
                Marker::source("@SpringBootApplication", "src/main/java/App.java"),
            )
            .build()
    }

    #[test]
    fn test_modern_java_scores_three() {
        let result = StackClassifier::default().classify(&spring_boot_evidence());
        assert_eq!(result.primary_stack, StackKind::SpringBoot);
        assert_eq!(result.complexity_score, 3);
        assert_eq!(result.components.len(), 1);
        assert_eq!(result.components[0].location, PathBuf::from("."));
        assert!(!result.monorepo);
        assert!(!result.multi_stack);
    }

    #[test]
    fn test_legacy_descriptor_scores_four() {
        let evidence = Evidence::builder()
            .marker(".", Marker::manifest("build.xml"))
            .marker(
                ".",
                Marker::config("applicationContext.xml", "WEB-INF/applicationContext.xml"),
            )
            .build();
        let result = StackClassifier::default().classify(&evidence);
        assert_eq!(result.primary_stack, StackKind::SpringMvc);
        assert_eq!(result.complexity_score, 4);
    }

    #[test]
    fn test_no_manifest_is_unknown() {
        let evidence = Evidence::builder()
            .marker("docs", Marker::config("web.xml", "docs/web.xml"))
            .build();
        let result = StackClassifier::default().classify(&evidence);
        assert!(result.is_unknown());
        assert!(result.components.is_empty());
        assert_eq!(result.complexity_score, 1);
    }

    #[test]
    fn test_empty_evidence_is_unknown() {
        assert_eq!(
            StackClassifier::default().classify(&Evidence::empty()),
            DetectionResult::unknown()
        );
    }

    #[test]
    fn test_different_kinds_are_multi_stack() {
        let evidence = Evidence::builder()
            .marker("api", Marker::manifest("requirements.txt"))
            .marker("api", Marker::dependency("flask", "3.0"))
            .marker("web", Marker::manifest("package.json"))
            .marker("web", Marker::dependency("react", "18"))
            .build();
        let result = StackClassifier::default().classify(&evidence);
        assert_eq!(result.primary_stack, StackKind::MultiStack);
        assert!(result.multi_stack);
        assert!(!result.monorepo);
        assert_eq!(result.complexity_score, 2);
    }

    #[test]
    fn test_generic_components_do_not_split_stacks() {
        let evidence = Evidence::builder()
            .marker(".", Marker::manifest("pom.xml"))
            .marker("api", Marker::manifest("requirements.txt"))
            .marker("api", Marker::dependency("flask", "3.0"))
            .marker("tools", Marker::manifest("package.json"))
            .build();
        let result = StackClassifier::default().classify(&evidence);
        assert_eq!(result.primary_stack, StackKind::Flask);
        assert!(!result.multi_stack);
        assert!(!result.monorepo);
        assert_eq!(result.components.len(), 3);
        assert_eq!(result.complexity_score, 2);
    }

    #[test]
    fn test_only_generic_components_still_aggregate() {
        let evidence = Evidence::builder()
            .marker("lib", Marker::manifest("pom.xml"))
            .marker("scripts", Marker::manifest("package.json"))
            .build();
        let result = StackClassifier::default().classify(&evidence);
        assert_eq!(result.primary_stack, StackKind::MultiStack);
        assert!(result.multi_stack);
    }

    #[test]
    fn test_same_kind_is_monorepo_with_capped_bonus() {
        let mut builder = Evidence::builder();
        for service in ["svc-a", "svc-b", "svc-c", "svc-d"] {
            builder.add(service, Marker::manifest("package.json"));
            builder.add(service, Marker::dependency("express", "4"));
        }
        let result = StackClassifier::default().classify(&builder.build());
        assert_eq!(result.primary_stack, StackKind::Monorepo);
        assert!(result.monorepo);
        assert!(!result.multi_stack);
        // 1 + lightweight 1 + min(3, 2)
        assert_eq!(result.complexity_score, 4);
    }

    #[test]
    fn test_score_is_clamped() {
        let weights = ScoringWeights::default().with_override(StackKind::SpringMvc, 9);
        let evidence = Evidence::builder()
            .marker("a", Marker::manifest("pom.xml"))
            .marker("a", Marker::config("web-servlet.xml", "a/web-servlet.xml"))
            .marker("b", Marker::manifest("pom.xml"))
            .marker("b", Marker::config("app-servlet.xml", "b/app-servlet.xml"))
            .build();
        let result = StackClassifier::new(weights).classify(&evidence);
        assert_eq!(result.complexity_score, 5);
    }

    #[test]
    fn test_framework_beats_earlier_generic_ecosystem() {
        let evidence = Evidence::builder()
            .marker(".", Marker::manifest("pom.xml"))
            .marker(".", Marker::manifest("package.json"))
            .marker(".", Marker::dependency("@angular/core", "17"))
            .marker(".", Marker::config("angular.json", "angular.json"))
            .build();
        let result = StackClassifier::default().classify(&evidence);
        assert_eq!(result.primary_stack, StackKind::Angular);
    }

    #[test]
    fn test_classify_is_idempotent() {
        let classifier = StackClassifier::default();
        let evidence = spring_boot_evidence();
        assert_eq!(classifier.classify(&evidence), classifier.classify(&evidence));
    }

    #[test]
    fn test_recommended_configuration_for_service() {
        let result = StackClassifier::default().classify(&spring_boot_evidence());
        let config = result.recommended_configuration("kubernetes");
        assert!(config.has_component("dockerfile"));
        assert!(config.has_component("helm"));
        assert_eq!(config.setting("port"), Some("8080"));
        assert!(config.validate().is_ok());

        let compose = result.recommended_configuration("docker-compose");
        assert!(!compose.has_component("helm"));
        assert!(compose.has_component("compose"));
        assert!(compose.validate().is_ok());
    }

    #[test]
    fn test_recommended_configuration_for_unknown() {
        let config = DetectionResult::unknown().recommended_configuration("kubernetes");
        assert_eq!(config.components.len(), 1);
        assert!(config.has_component("dockerfile"));
        assert!(config.custom_settings.is_empty());
    }
}
