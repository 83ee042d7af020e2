//! Scanner + classifier tests against small on-disk repositories

use shipwright::scan::{EvidenceScanner, ScanConfig};
use shipwright::stack::{DetectionResult, ScoringWeights, StackClassifier, StackKind};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use yare::parameterized;

const SPRING_BOOT_POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <groupId>com.acme</groupId>
  <artifactId>shop</artifactId>
  <dependencies>
    <dependency>
      <groupId>org.springframework.boot</groupId>
      <artifactId>spring-boot-starter-web</artifactId>
      <version>3.2.0</version>
    </dependency>
  </dependencies>
</project>
"#;

const SPRING_BOOT_MAIN: &str = r#"package com.acme.shop;

import org.springframework.boot.SpringApplication;
import org.springframework.boot.autoconfigure.SpringBootApplication;

@SpringBootApplication
public class ShopApplication {
    public static void main(String[] args) {
        SpringApplication.run(ShopApplication.class, args);
    }
}
"#;

const SERVLET_POM: &str = r#"<project>
  <groupId>com.acme</groupId>
  <artifactId>legacy</artifactId>
  <packaging>war</packaging>
  <dependencies>
    <dependency>
      <groupId>javax.servlet</groupId>
      <artifactId>javax.servlet-api</artifactId>
      <version>3.1.0</version>
    </dependency>
  </dependencies>
</project>
"#;

const PLAIN_POM: &str = r#"<project>
  <groupId>com.acme</groupId>
  <artifactId>util</artifactId>
</project>
"#;

fn create_repo(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    for (path, content) in files {
        let target = dir.path().join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).expect("Failed to create directory");
        }
        fs::write(&target, content).expect("Failed to write file");
    }
    dir
}

fn detect(root: &Path) -> DetectionResult {
    let evidence = EvidenceScanner::default().scan(root);
    StackClassifier::default().classify(&evidence)
}

#[parameterized(
    spring_boot = {
        &[("pom.xml", SPRING_BOOT_POM), ("src/main/java/com/acme/shop/ShopApplication.java", SPRING_BOOT_MAIN)],
        StackKind::SpringBoot, 3
    },
    java_ee_servlet = {
        &[("pom.xml", SERVLET_POM), ("src/main/webapp/WEB-INF/web.xml", "<web-app/>")],
        StackKind::JavaEe, 4
    },
    spring_mvc_dispatcher = {
        &[("pom.xml", PLAIN_POM), ("src/main/webapp/WEB-INF/dispatcher-servlet.xml", "<beans/>")],
        StackKind::SpringMvc, 4
    },
    plain_maven = {
        &[("pom.xml", PLAIN_POM)],
        StackKind::JavaBuild, 1
    },
    ant_build = {
        &[("build.xml", "<project name=\"legacy\"/>")],
        StackKind::JavaBuild, 1
    },
    nextjs = {
        &[("package.json", r#"{"dependencies": {"next": "14.0.0", "react": "18.2.0"}}"#)],
        StackKind::NextJs, 3
    },
    angular = {
        &[
            ("package.json", r#"{"dependencies": {"@angular/core": "17.0.0"}}"#),
            ("angular.json", "{}"),
        ],
        StackKind::Angular, 3
    },
    react = {
        &[("package.json", r#"{"dependencies": {"react": "18.2.0"}}"#)],
        StackKind::React, 2
    },
    plain_node = {
        &[("package.json", r#"{"name": "tool", "dependencies": {"lodash": "4.17.21"}}"#)],
        StackKind::NodeProject, 1
    },
    django = {
        &[("requirements.txt", "Django==5.0\n"), ("manage.py", "import django\n")],
        StackKind::Django, 3
    },
    fastapi = {
        &[("requirements.txt", "fastapi>=0.110\nuvicorn\n")],
        StackKind::FastApi, 2
    },
    flask_pyproject = {
        &[("pyproject.toml", "[project]\nname = \"api\"\ndependencies = [\"flask>=3.0\"]\n")],
        StackKind::Flask, 2
    },
)]
fn test_single_project_classification(files: &[(&str, &str)], expected: StackKind, score: u8) {
    let repo = create_repo(files);
    let result = detect(repo.path());

    assert_eq!(result.primary_stack, expected);
    assert_eq!(result.complexity_score, score);
    assert_eq!(result.components.len(), 1);
    assert!(!result.monorepo);
    assert!(!result.multi_stack);
}

#[test]
fn test_empty_repository_is_unknown() {
    let repo = create_repo(&[("README.md", "# nothing here\n")]);
    let result = detect(repo.path());

    assert!(result.is_unknown());
    assert_eq!(result.complexity_score, 1);
    assert!(result.components.is_empty());
}

#[test]
fn test_monorepo_of_same_stack() {
    let repo = create_repo(&[
        ("services/orders/requirements.txt", "flask==3.0\n"),
        ("services/billing/requirements.txt", "flask==3.0\n"),
        ("services/users/requirements.txt", "flask==3.0\n"),
        ("services/search/requirements.txt", "flask==3.0\n"),
    ]);
    let result = detect(repo.path());

    assert_eq!(result.primary_stack, StackKind::Monorepo);
    assert!(result.monorepo);
    assert!(!result.multi_stack);
    assert_eq!(result.components.len(), 4);
    // Flask weight 1, monorepo bonus capped at 2
    assert_eq!(result.complexity_score, 4);
}

#[test]
fn test_multi_stack_scored_by_heaviest_component() {
    let repo = create_repo(&[
        ("backend/pom.xml", SPRING_BOOT_POM),
        ("backend/src/main/java/App.java", SPRING_BOOT_MAIN),
        ("frontend/package.json", r#"{"dependencies": {"react": "18.2.0"}}"#),
    ]);
    let result = detect(repo.path());

    assert_eq!(result.primary_stack, StackKind::MultiStack);
    assert!(result.multi_stack);
    assert!(!result.monorepo);
    assert_eq!(result.complexity_score, 3);

    let locations: Vec<PathBuf> = result.components.iter().map(|c| c.location.clone()).collect();
    assert!(locations.contains(&PathBuf::from("backend")));
    assert!(locations.contains(&PathBuf::from("frontend")));
}

const PARENT_POM: &str = r#"<project>
  <groupId>com.acme</groupId>
  <artifactId>platform</artifactId>
  <packaging>pom</packaging>
  <modules>
    <module>orders</module>
    <module>billing</module>
  </modules>
</project>
"#;

#[test]
fn test_maven_multi_module_is_monorepo() {
    let repo = create_repo(&[
        ("pom.xml", PARENT_POM),
        ("orders/pom.xml", SPRING_BOOT_POM),
        ("orders/src/main/java/App.java", SPRING_BOOT_MAIN),
        ("billing/pom.xml", SPRING_BOOT_POM),
        ("billing/src/main/java/App.java", SPRING_BOOT_MAIN),
    ]);
    let result = detect(repo.path());

    assert_eq!(result.primary_stack, StackKind::Monorepo);
    assert!(result.monorepo);
    assert!(!result.multi_stack);
    // 1 + modern 2 + one extra service
    assert_eq!(result.complexity_score, 4);
    // The parent stays visible as a component
    assert_eq!(result.components.len(), 3);
    assert!(result
        .components
        .iter()
        .any(|c| c.location == PathBuf::from(".") && c.stack == StackKind::JavaBuild));
}

#[test]
fn test_npm_workspace_root_is_not_a_stack() {
    let repo = create_repo(&[
        (
            "package.json",
            r#"{"private": true, "workspaces": ["apps/*"], "devDependencies": {"turbo": "1.13.0"}}"#,
        ),
        ("apps/shop/package.json", r#"{"dependencies": {"react": "18.2.0"}}"#),
        ("apps/admin/package.json", r#"{"dependencies": {"react": "18.2.0"}}"#),
    ]);
    let result = detect(repo.path());

    assert_eq!(result.primary_stack, StackKind::Monorepo);
    assert!(!result.multi_stack);
    // 1 + lightweight 1 + one extra app
    assert_eq!(result.complexity_score, 3);
}

#[test]
fn test_single_service_under_aggregator_keeps_its_stack() {
    let repo = create_repo(&[
        ("pom.xml", PARENT_POM),
        ("orders/pom.xml", SPRING_BOOT_POM),
        ("orders/src/main/java/App.java", SPRING_BOOT_MAIN),
    ]);
    let result = detect(repo.path());

    assert_eq!(result.primary_stack, StackKind::SpringBoot);
    assert!(!result.monorepo);
    assert!(!result.multi_stack);
    assert_eq!(result.complexity_score, 3);
}

#[test]
fn test_excluded_directories_are_ignored() {
    let repo = create_repo(&[
        ("requirements.txt", "flask==3.0\n"),
        ("node_modules/left-pad/package.json", r#"{"dependencies": {"react": "18.2.0"}}"#),
        ("target/classes/pom.xml", SPRING_BOOT_POM),
    ]);
    let result = detect(repo.path());

    assert_eq!(result.primary_stack, StackKind::Flask);
    assert_eq!(result.components.len(), 1);
}

#[test]
fn test_framework_beats_generic_build_of_other_ecosystem() {
    let repo = create_repo(&[
        ("pom.xml", PLAIN_POM),
        ("package.json", r#"{"dependencies": {"@nestjs/core": "10.0.0"}}"#),
        ("nest-cli.json", "{}"),
    ]);
    let result = detect(repo.path());

    assert_eq!(result.primary_stack, StackKind::NestJs);
    assert_eq!(result.components.len(), 1);
}

#[test]
fn test_scan_depth_limits_discovery() {
    let repo = create_repo(&[("a/b/c/d/requirements.txt", "flask==3.0\n")]);

    let shallow = EvidenceScanner::new(ScanConfig {
        max_depth: 2,
        ..ScanConfig::default()
    })
    .scan(repo.path());
    assert!(StackClassifier::default().classify(&shallow).is_unknown());

    assert_eq!(detect(repo.path()).primary_stack, StackKind::Flask);
}

#[test]
fn test_custom_weights() {
    let repo = create_repo(&[
        ("pom.xml", SPRING_BOOT_POM),
        ("src/main/java/App.java", SPRING_BOOT_MAIN),
    ]);
    let evidence = EvidenceScanner::default().scan(repo.path());
    let classifier =
        StackClassifier::new(ScoringWeights::default().with_override(StackKind::SpringBoot, 4));

    assert_eq!(classifier.classify(&evidence).complexity_score, 5);
}

#[test]
fn test_classification_is_deterministic() {
    let repo = create_repo(&[
        ("api/requirements.txt", "fastapi\n"),
        ("web/package.json", r#"{"dependencies": {"vue": "3.4.0"}}"#),
        ("worker/pyproject.toml", "[tool.poetry.dependencies]\npython = \"^3.11\"\ncelery = \"^5\"\n"),
    ]);

    let first = detect(repo.path());
    let second = detect(repo.path());
    assert_eq!(first, second);
}
