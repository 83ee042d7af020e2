use shipwright::cli::commands::{CliArgs, Commands};
use shipwright::cli::handlers::{handle_detect, handle_migrate, handle_presets};
use shipwright::util::logging::{self, LoggingConfig};
use shipwright::VERSION;

use clap::Parser;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("shipwright v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Detect(detect_args) => handle_detect(detect_args, args.quiet),
        Commands::Migrate(migrate_args) => handle_migrate(migrate_args, args.quiet).await,
        Commands::Presets(command) => handle_presets(command),
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let level = if let Some(level_str) = &args.log_level {
        logging::parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        logging::init_from_env();
        return;
    };

    logging::init_logging(LoggingConfig::with_level(level));
}
