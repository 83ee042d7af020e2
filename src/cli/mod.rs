pub mod commands;
pub mod console;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, DetectArgs, MigrateArgs, PresetCommands};
pub use console::ConsoleSink;
pub use output::{OutputFormat, OutputFormatter};
