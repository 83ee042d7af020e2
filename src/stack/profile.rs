//! Static per-stack data: ecosystem, framework class, deployment defaults
//! and complexity weights

use super::kind::{Ecosystem, FrameworkClass, StackKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackProfile {
    pub kind: StackKind,
    pub ecosystem: Option<Ecosystem>,
    pub class: FrameworkClass,
    pub default_port: Option<u16>,
    /// Component tags recommended on top of `dockerfile`
    pub components: &'static [&'static str],
}

const fn entry(
    kind: StackKind,
    ecosystem: Option<Ecosystem>,
    class: FrameworkClass,
    default_port: Option<u16>,
    components: &'static [&'static str],
) -> StackProfile {
    StackProfile {
        kind,
        ecosystem,
        class,
        default_port,
        components,
    }
}

use Ecosystem::{Java, JavaScript, Python};
use FrameworkClass::{Classic, Generic, Lightweight, Modern, Unclassified};

const SERVICE: &[&str] = &["helm", "cicd", "monitoring"];
const LEGACY_SERVICE: &[&str] = &["helm", "cicd"];
const STATIC_SITE: &[&str] = &["cicd"];
const NONE: &[&str] = &[];

static PROFILES: &[StackProfile] = &[
    entry(StackKind::SpringBoot, Some(Java), Modern, Some(8080), SERVICE),
    entry(StackKind::Quarkus, Some(Java), Modern, Some(8080), SERVICE),
    entry(StackKind::Micronaut, Some(Java), Modern, Some(8080), SERVICE),
    entry(StackKind::SpringMvc, Some(Java), Classic, Some(8080), LEGACY_SERVICE),
    entry(StackKind::JavaEe, Some(Java), Classic, Some(8080), LEGACY_SERVICE),
    entry(StackKind::JavaBuild, Some(Java), Generic, None, STATIC_SITE),
    entry(StackKind::NestJs, Some(JavaScript), Modern, Some(3000), SERVICE),
    entry(StackKind::NextJs, Some(JavaScript), Modern, Some(3000), SERVICE),
    entry(StackKind::Angular, Some(JavaScript), Modern, Some(80), STATIC_SITE),
    entry(StackKind::AngularJs, Some(JavaScript), Classic, Some(80), STATIC_SITE),
    entry(StackKind::Vue, Some(JavaScript), Lightweight, Some(80), STATIC_SITE),
    entry(StackKind::React, Some(JavaScript), Lightweight, Some(80), STATIC_SITE),
    entry(StackKind::Express, Some(JavaScript), Lightweight, Some(3000), SERVICE),
    entry(StackKind::NodeProject, Some(JavaScript), Generic, None, STATIC_SITE),
    entry(StackKind::Django, Some(Python), Modern, Some(8000), SERVICE),
    entry(StackKind::FastApi, Some(Python), Lightweight, Some(8000), SERVICE),
    entry(StackKind::Flask, Some(Python), Lightweight, Some(5000), SERVICE),
    entry(StackKind::PythonProject, Some(Python), Generic, None, STATIC_SITE),
    entry(StackKind::MultiStack, None, Unclassified, None, NONE),
    entry(StackKind::Monorepo, None, Unclassified, None, NONE),
    entry(StackKind::Unknown, None, Unclassified, None, NONE),
];

static UNKNOWN_PROFILE: StackProfile = entry(StackKind::Unknown, None, Unclassified, None, NONE);

pub fn profile(kind: StackKind) -> &'static StackProfile {
    PROFILES
        .iter()
        .find(|p| p.kind == kind)
        .unwrap_or(&UNKNOWN_PROFILE)
}

/// Complexity weights per framework class, with optional per-stack overrides
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub modern: u8,
    pub classic: u8,
    pub lightweight: u8,
    pub generic: u8,
    pub overrides: BTreeMap<StackKind, u8>,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            modern: 2,
            classic: 3,
            lightweight: 1,
            generic: 0,
            overrides: BTreeMap::new(),
        }
    }
}

impl ScoringWeights {
    pub fn with_override(mut self, kind: StackKind, weight: u8) -> Self {
        self.overrides.insert(kind, weight);
        self
    }

    pub fn weight(&self, kind: StackKind) -> u8 {
        if let Some(weight) = self.overrides.get(&kind) {
            return *weight;
        }
        match kind.class() {
            FrameworkClass::Modern => self.modern,
            FrameworkClass::Classic => self.classic,
            FrameworkClass::Lightweight => self.lightweight,
            FrameworkClass::Generic => self.generic,
            FrameworkClass::Unclassified => 0,
        }
    }
}
