//! Logging setup for the `shipwright` binary and embedders
//!
//! All events go to stderr, stdout is reserved for command output. Three
//! renderings are available: multi-line text for terminals, compact single
//! lines for CI logs and flattened JSON for log shippers.
//!
//! `RUST_LOG`, when set, replaces the configured level entirely.
//!
//! ```no_run
//! use shipwright::util::logging;
//! use tracing::info;
//!
//! logging::init_from_env();
//! info!(repository = "shop", "Scanning repository");
//! ```

use std::env;
use std::io;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LEVEL_ENV: &str = "SHIPWRIGHT_LOG_LEVEL";
pub const FORMAT_ENV: &str = "SHIPWRIGHT_LOG_FORMAT";
/// Older switch, same as `SHIPWRIGHT_LOG_FORMAT=json`
pub const JSON_ENV: &str = "SHIPWRIGHT_LOG_JSON";

static INSTALL: Once = Once::new();

/// Walker crates that log every skipped path at debug level
const QUIET_TARGETS: &[&str] = &["ignore", "globset"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Compact,
    Json,
}

impl LogFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "text" | "pretty" | "full" => Some(LogFormat::Text),
            "compact" => Some(LogFormat::Compact),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: Level,
    pub format: LogFormat,
    /// Adds source file, line and thread to every event
    pub source_metadata: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Text,
            source_metadata: false,
        }
    }
}

impl LoggingConfig {
    /// ```
    /// use shipwright::util::LoggingConfig;
    /// use tracing::Level;
    ///
    /// let config = LoggingConfig::with_level(Level::DEBUG);
    /// assert_eq!(config.level, Level::DEBUG);
    /// ```
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_source_metadata(mut self, enabled: bool) -> Self {
        self.source_metadata = enabled;
        self
    }

    /// JSON lines with source metadata, for unattended batch runs
    pub fn for_batch() -> Self {
        Self::default()
            .with_format(LogFormat::Json)
            .with_source_metadata(true)
    }
}

/// Case-insensitive level name; anything unrecognised means `INFO`
///
/// ```
/// use shipwright::util::logging::parse_level;
/// use tracing::Level;
///
/// assert_eq!(parse_level("WARN"), Level::WARN);
/// assert_eq!(parse_level("chatty"), Level::INFO);
/// ```
pub fn parse_level(name: &str) -> Level {
    name.trim().parse::<Level>().unwrap_or(Level::INFO)
}

fn build_filter(level: Level) -> EnvFilter {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();
    if env::var_os("RUST_LOG").is_some() {
        return filter;
    }

    QUIET_TARGETS
        .iter()
        .filter_map(|target| format!("{}=warn", target).parse::<Directive>().ok())
        .fold(filter, |filter, directive| filter.add_directive(directive))
}

/// Installs the global subscriber
///
/// Returns true only for the call that actually installed it; later calls,
/// or a subscriber installed by someone else, leave logging unchanged.
pub fn init_logging(config: LoggingConfig) -> bool {
    let mut installed = false;
    INSTALL.call_once(|| installed = install(&config));
    installed
}

fn install(config: &LoggingConfig) -> bool {
    let meta = config.source_metadata;

    let text = (config.format == LogFormat::Text).then(|| {
        fmt::layer()
            .with_writer(io::stderr)
            .with_file(meta)
            .with_line_number(meta)
            .with_thread_names(meta)
    });
    let compact = (config.format == LogFormat::Compact).then(|| {
        fmt::layer()
            .compact()
            .with_writer(io::stderr)
            .with_file(meta)
            .with_line_number(meta)
            .with_thread_names(meta)
    });
    let json = (config.format == LogFormat::Json).then(|| {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(io::stderr)
            .with_file(meta)
            .with_line_number(meta)
            .with_thread_names(meta)
    });

    tracing_subscriber::registry()
        .with(build_filter(config.level))
        .with(text)
        .with(compact)
        .with(json)
        .try_init()
        .is_ok()
}

pub fn init_default() -> bool {
    init_logging(LoggingConfig::default())
}

/// Reads `SHIPWRIGHT_LOG_LEVEL`, `SHIPWRIGHT_LOG_FORMAT` and
/// `SHIPWRIGHT_LOG_JSON`
pub fn init_from_env() -> bool {
    init_logging(config_from_env())
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

fn config_from_env() -> LoggingConfig {
    let level = env::var(LEVEL_ENV)
        .map(|v| parse_level(&v))
        .unwrap_or(Level::INFO);
    let format = env::var(FORMAT_ENV)
        .ok()
        .and_then(|v| LogFormat::from_name(&v))
        .or_else(|| env_flag(JSON_ENV).then_some(LogFormat::Json))
        .unwrap_or_default();

    LoggingConfig::with_level(level)
        .with_format(format)
        .with_source_metadata(format == LogFormat::Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [LEVEL_ENV, FORMAT_ENV, JSON_ENV] {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level(" Debug "), Level::DEBUG);
        assert_eq!(parse_level("ERROR"), Level::ERROR);
        assert_eq!(parse_level(""), Level::INFO);
        assert_eq!(parse_level("loud"), Level::INFO);
    }

    #[test]
    fn test_format_names() {
        assert_eq!(LogFormat::from_name("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::from_name("compact"), Some(LogFormat::Compact));
        assert_eq!(LogFormat::from_name("pretty"), Some(LogFormat::Text));
        assert_eq!(LogFormat::from_name("xml"), None);
    }

    #[test]
    fn test_batch_config() {
        let config = LoggingConfig::for_batch();
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.source_metadata);
        assert_eq!(config.level, Level::INFO);
    }

    #[test]
    #[serial]
    fn test_config_from_env_defaults() {
        clear_env();
        assert_eq!(config_from_env(), LoggingConfig::default());
    }

    #[test]
    #[serial]
    fn test_format_env_wins_over_json_flag() {
        clear_env();
        env::set_var(LEVEL_ENV, "warn");
        env::set_var(FORMAT_ENV, "compact");
        env::set_var(JSON_ENV, "true");
        let config = config_from_env();
        clear_env();

        assert_eq!(config.level, Level::WARN);
        assert_eq!(config.format, LogFormat::Compact);
        assert!(!config.source_metadata);
    }

    #[test]
    #[serial]
    fn test_json_flag() {
        clear_env();
        env::set_var(JSON_ENV, "1");
        let config = config_from_env();
        clear_env();

        assert_eq!(config.format, LogFormat::Json);
        assert!(config.source_metadata);
    }

    #[test]
    #[serial]
    fn test_second_init_is_ignored() {
        init_logging(LoggingConfig::with_level(Level::WARN));
        assert!(!init_logging(LoggingConfig::for_batch()));
    }
}
