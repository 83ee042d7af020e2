use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Classify repositories and migrate them to container deployment artifacts
#[derive(Parser, Debug)]
#[command(
    name = "shipwright",
    about = "Classify repositories and migrate them to container deployment artifacts",
    version,
    author,
    long_about = "shipwright scans repositories for technology-stack evidence, classifies \
                  them (Spring Boot, Quarkus, Next.js, Django, ...) and drives a queue of \
                  migration jobs that generate, validate and commit deployment artifacts."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress progress and non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Classify the technology stack of a repository",
        long_about = "Scans a local repository and reports its technology stack, the \
                      components it is made of and a complexity score from 1 to 5.\n\n\
                      Examples:\n  \
                      shipwright detect\n  \
                      shipwright detect /path/to/repo\n  \
                      shipwright detect --format json --max-depth 3"
    )]
    Detect(DetectArgs),

    #[command(
        about = "Migrate one or more repositories",
        long_about = "Queues one migration job per source and processes them with a bounded \
                      worker pool. Each job checks out the source, detects its stack, \
                      generates deployment artifacts, validates and commits them.\n\n\
                      Examples:\n  \
                      shipwright migrate ./shop\n  \
                      shipwright migrate https://github.com/acme/shop.git --platform openshift -c helm\n  \
                      shipwright migrate ./a ./b ./c --workers 2 --no-validate --format json"
    )]
    Migrate(MigrateArgs),

    #[command(subcommand, about = "Manage named migration configuration presets")]
    Presets(PresetCommands),
}

#[derive(Parser, Debug, Clone)]
pub struct DetectArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to repository (defaults to current directory)"
    )]
    pub repository_path: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(long, value_name = "N", help = "Maximum directory depth to scan")]
    pub max_depth: Option<usize>,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write output to file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct MigrateArgs {
    #[arg(
        value_name = "SOURCE",
        required = true,
        num_args = 1..,
        help = "Repository URLs or local paths"
    )]
    pub sources: Vec<String>,

    #[arg(short = 'p', long, value_name = "PLATFORM", help = "Target platform")]
    pub platform: Option<String>,

    #[arg(
        short = 'c',
        long = "component",
        value_name = "COMPONENT",
        help = "Component to generate (repeatable)"
    )]
    pub components: Vec<String>,

    #[arg(
        long = "set",
        value_name = "KEY=VALUE",
        value_parser = parse_key_value,
        help = "Custom setting passed to the generator (repeatable)"
    )]
    pub settings: Vec<(String, String)>,

    #[arg(short = 'w', long, value_name = "N", help = "Parallel jobs")]
    pub workers: Option<usize>,

    #[arg(long, value_name = "N", help = "Attempts per stage for transient failures")]
    pub max_attempts: Option<u32>,

    #[arg(long, help = "Record validation failures as warnings instead of failing")]
    pub no_validate: bool,

    #[arg(long, help = "Commit generated artifacts to the checkout")]
    pub commit: bool,

    #[arg(long, value_name = "NAME", help = "Start from a saved configuration preset")]
    pub preset: Option<String>,

    #[arg(long, value_name = "NAME", help = "Save the resulting configuration as a preset")]
    pub save_preset: Option<String>,

    #[arg(
        long,
        value_name = "DIR",
        help = "Directory for remote checkouts (defaults to a temp directory)"
    )]
    pub workspace: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PresetCommands {
    #[command(about = "List saved presets")]
    List,

    #[command(about = "Show one preset")]
    Show {
        #[arg(value_name = "NAME")]
        name: String,

        #[arg(
            short = 'f',
            long,
            value_enum,
            default_value = "human",
            help = "Output format"
        )]
        format: OutputFormatArg,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("Invalid setting '{}': expected KEY=VALUE", s)),
    }
}
