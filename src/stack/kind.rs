use serde::{Deserialize, Serialize};

crate::define_id_enum! {
    /// Technology stack reported by the classifier
    StackKind {
        SpringBoot => "spring-boot" : "Spring Boot" | "springboot",
        Quarkus => "quarkus" : "Quarkus",
        Micronaut => "micronaut" : "Micronaut",
        SpringMvc => "spring-mvc" : "Spring MVC" | "spring",
        JavaEe => "java-ee" : "Java EE" | "jakarta-ee",
        JavaBuild => "java-build" : "Java build project" | "java",
        NestJs => "nestjs" : "NestJS",
        NextJs => "nextjs" : "Next.js" | "next",
        Angular => "angular" : "Angular",
        AngularJs => "angularjs" : "AngularJS",
        Vue => "vue" : "Vue" | "vuejs",
        React => "react" : "React",
        Express => "express" : "Express",
        NodeProject => "node-project" : "Node.js project" | "node",
        Django => "django" : "Django",
        FastApi => "fastapi" : "FastAPI",
        Flask => "flask" : "Flask",
        PythonProject => "python-project" : "Python project" | "python",
        MultiStack => "multi-stack" : "Multi-stack",
        Monorepo => "monorepo" : "Monorepo",
        Unknown => "unknown" : "Unknown",
    }
}

impl StackKind {
    /// Tags that describe a whole repository rather than one project
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            StackKind::MultiStack | StackKind::Monorepo | StackKind::Unknown
        )
    }

    pub fn ecosystem(&self) -> Option<Ecosystem> {
        super::profile::profile(*self).ecosystem
    }

    pub fn class(&self) -> FrameworkClass {
        super::profile::profile(*self).class
    }
}

crate::define_id_enum! {
    /// Language family selected by manifest presence
    Ecosystem {
        Java => "java" : "Java",
        JavaScript => "javascript" : "JavaScript" | "js" | "typescript" | "ts",
        Python => "python" : "Python",
    }
}

impl Ecosystem {
    /// Manifests that put a folder into this ecosystem; `build.xml` covers
    /// Ant projects that predate Maven and Gradle
    pub fn manifests(&self) -> &'static [&'static str] {
        match self {
            Ecosystem::Java => &["pom.xml", "build.gradle", "build.gradle.kts", "build.xml"],
            Ecosystem::JavaScript => &["package.json"],
            Ecosystem::Python => &["pyproject.toml", "requirements.txt", "setup.py", "Pipfile"],
        }
    }

    pub fn for_manifest(file_name: &str) -> Option<Ecosystem> {
        Ecosystem::ALL
            .iter()
            .copied()
            .find(|eco| eco.manifests().contains(&file_name))
    }
}

/// Broad framework family, which drives the complexity weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameworkClass {
    /// Current-generation full framework (Spring Boot, NestJS, Django)
    Modern,
    /// Legacy framework usually needing extra packaging work
    Classic,
    /// Micro-framework or UI library
    Lightweight,
    /// Recognised build tool but no framework
    Generic,
    /// Aggregate tags with no framework of their own
    Unclassified,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&StackKind::SpringBoot).unwrap(),
            "\"spring-boot\""
        );
        let parsed: StackKind = serde_json::from_str("\"multi-stack\"").unwrap();
        assert_eq!(parsed, StackKind::MultiStack);
        assert!(serde_json::from_str::<StackKind>("\"cobol\"").is_err());
    }

    #[test]
    fn test_from_name_accepts_aliases() {
        assert_eq!(StackKind::from_name("Next.js"), Some(StackKind::NextJs));
        assert_eq!(StackKind::from_name("next"), Some(StackKind::NextJs));
        assert_eq!(StackKind::from_name("SPRING-BOOT"), Some(StackKind::SpringBoot));
        assert_eq!(StackKind::from_name("rails"), None);
    }

    #[test]
    fn test_display_uses_human_name() {
        assert_eq!(StackKind::FastApi.to_string(), "FastAPI");
        assert_eq!(Ecosystem::JavaScript.to_string(), "JavaScript");
    }

    #[test]
    fn test_manifest_lookup() {
        assert_eq!(Ecosystem::for_manifest("pom.xml"), Some(Ecosystem::Java));
        assert_eq!(Ecosystem::for_manifest("build.xml"), Some(Ecosystem::Java));
        assert_eq!(
            Ecosystem::for_manifest("package.json"),
            Some(Ecosystem::JavaScript)
        );
        assert_eq!(Ecosystem::for_manifest("Pipfile"), Some(Ecosystem::Python));
        assert_eq!(Ecosystem::for_manifest("Cargo.toml"), None);
    }

    #[test]
    fn test_aggregate_kinds() {
        assert!(StackKind::Monorepo.is_aggregate());
        assert!(!StackKind::Flask.is_aggregate());
        assert_eq!(StackKind::Unknown.ecosystem(), None);
        assert_eq!(StackKind::Flask.ecosystem(), Some(Ecosystem::Python));
    }
}
