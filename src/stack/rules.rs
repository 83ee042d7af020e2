//! Ordered classification rules per ecosystem
//!
//! Rules are data: each names the stack it yields and a list of needle
//! groups. A rule matches a folder when every group has at least one needle
//! matching one of the folder's markers. Rules are tried in table order and
//! the first match wins; each table ends with an unconditional generic rule.

use super::kind::{Ecosystem, StackKind};
use crate::scan::{Marker, MarkerKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Exact,
    Prefix,
    Contains,
    Suffix,
}

/// Pattern tested against markers of one kind
#[derive(Debug, Clone, Copy)]
pub struct Needle {
    pub kind: MarkerKind,
    pub pattern: &'static str,
    pub mode: MatchMode,
}

impl Needle {
    pub fn matches(&self, marker: &Marker) -> bool {
        if marker.kind != self.kind {
            return false;
        }
        let name = marker.name.as_str();
        match self.mode {
            MatchMode::Exact => name == self.pattern,
            MatchMode::Prefix => name.starts_with(self.pattern),
            MatchMode::Contains => name.contains(self.pattern),
            MatchMode::Suffix => name.ends_with(self.pattern),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub stack: StackKind,
    pub all_of: &'static [&'static [Needle]],
}

impl Rule {
    pub fn matches(&self, markers: &[Marker]) -> bool {
        self.all_of
            .iter()
            .all(|group| group.iter().any(|n| markers.iter().any(|m| n.matches(m))))
    }
}

const fn dep(pattern: &'static str, mode: MatchMode) -> Needle {
    Needle {
        kind: MarkerKind::Dependency,
        pattern,
        mode,
    }
}

const fn config(pattern: &'static str, mode: MatchMode) -> Needle {
    Needle {
        kind: MarkerKind::Config,
        pattern,
        mode,
    }
}

const fn source(pattern: &'static str) -> Needle {
    Needle {
        kind: MarkerKind::Source,
        pattern,
        mode: MatchMode::Exact,
    }
}

use MatchMode::{Contains, Exact, Prefix, Suffix};

const APPLICATION_CONFIG: &[Needle] = &[
    config("application.properties", Exact),
    config("application.yml", Exact),
    config("application.yaml", Exact),
];

static JAVA_RULES: &[Rule] = &[
    Rule {
        stack: StackKind::SpringBoot,
        all_of: &[
            &[dep("org.springframework.boot:", Prefix)],
            &[source("@SpringBootApplication"), source("SpringApplication.run")],
        ],
    },
    Rule {
        stack: StackKind::Quarkus,
        all_of: &[&[dep("io.quarkus", Prefix)], &[source("@QuarkusMain")]],
    },
    Rule {
        stack: StackKind::Quarkus,
        all_of: &[&[dep("io.quarkus", Prefix)], APPLICATION_CONFIG],
    },
    Rule {
        stack: StackKind::Micronaut,
        all_of: &[&[dep("io.micronaut", Prefix)], &[source("Micronaut.run")]],
    },
    Rule {
        stack: StackKind::SpringMvc,
        all_of: &[&[
            config("applicationContext.xml", Exact),
            config("-servlet.xml", Suffix),
            dep("org.springframework:spring-webmvc", Exact),
            source("@EnableWebMvc"),
        ]],
    },
    Rule {
        stack: StackKind::JavaEe,
        all_of: &[&[
            config("web.xml", Exact),
            dep("javax.servlet:", Prefix),
            dep("jakarta.servlet:", Prefix),
            dep("javaee-api", Contains),
            dep("jakarta.platform:", Prefix),
        ]],
    },
    Rule {
        stack: StackKind::JavaBuild,
        all_of: &[],
    },
];

static JAVASCRIPT_RULES: &[Rule] = &[
    Rule {
        stack: StackKind::NestJs,
        all_of: &[
            &[dep("@nestjs/", Prefix)],
            &[
                source("NestFactory.create"),
                config("nest-cli.json", Exact),
            ],
        ],
    },
    Rule {
        stack: StackKind::NextJs,
        all_of: &[
            &[dep("next", Exact)],
            &[config("next.config.", Prefix), dep("react", Exact)],
        ],
    },
    Rule {
        stack: StackKind::Angular,
        all_of: &[
            &[dep("@angular/core", Exact)],
            &[config("angular.json", Exact), dep("@angular/cli", Exact)],
        ],
    },
    Rule {
        stack: StackKind::AngularJs,
        all_of: &[&[dep("angular", Exact)]],
    },
    Rule {
        stack: StackKind::Vue,
        all_of: &[&[
            dep("vue", Exact),
            dep("nuxt", Exact),
            config("vue.config.js", Exact),
            config("nuxt.config.", Prefix),
        ]],
    },
    Rule {
        stack: StackKind::React,
        all_of: &[&[dep("react", Exact)]],
    },
    Rule {
        stack: StackKind::Express,
        all_of: &[&[dep("express", Exact), source("express()")]],
    },
    Rule {
        stack: StackKind::NodeProject,
        all_of: &[],
    },
];

static PYTHON_RULES: &[Rule] = &[
    Rule {
        stack: StackKind::Django,
        all_of: &[
            &[dep("django", Exact)],
            &[config("manage.py", Exact), source("django.setup")],
        ],
    },
    Rule {
        stack: StackKind::FastApi,
        all_of: &[&[dep("fastapi", Exact), source("FastAPI(")]],
    },
    Rule {
        stack: StackKind::Flask,
        all_of: &[&[
            dep("flask", Exact),
            dep("flask-", Prefix),
            source("Flask("),
        ]],
    },
    Rule {
        stack: StackKind::PythonProject,
        all_of: &[],
    },
];

pub fn rules_for(ecosystem: Ecosystem) -> &'static [Rule] {
    match ecosystem {
        Ecosystem::Java => JAVA_RULES,
        Ecosystem::JavaScript => JAVASCRIPT_RULES,
        Ecosystem::Python => PYTHON_RULES,
    }
}

/// First matching rule for the folder's markers within one ecosystem
pub fn first_match(ecosystem: Ecosystem, markers: &[Marker]) -> StackKind {
    rules_for(ecosystem)
        .iter()
        .find(|rule| rule.matches(markers))
        .map(|rule| rule.stack)
        .unwrap_or(StackKind::Unknown)
}
