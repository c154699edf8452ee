//! Podcast Fetcher CLI application
//!
//! Command-line interface for archiving every episode of an iono.fm podcast
//! series, with resumable downloads and completeness checks.

use std::process;

use tracing::{error, info};

// Import CLI modules through the library (module is public but not re-exported)
use podcast_fetcher::app::{ShutdownSignal, SignalHandler};
use podcast_fetcher::cli::{handle_config, handle_download, logging, Cli, Commands, ExitStatus};
use podcast_fetcher::config::AppConfig;

fn main() {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok(); // Ignore errors if file doesn't exist

    let cli = Cli::parse_args();

    // Episodes are processed one at a time, so a single thread is enough
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {}", e);
            process::exit(ExitStatus::Fatal.code());
        }
    };

    let status = runtime.block_on(run(cli));
    process::exit(status.code());
}

/// Main application logic
async fn run(cli: Cli) -> ExitStatus {
    let mut config = match AppConfig::load(cli.global.config.as_deref()).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitStatus::Fatal;
        }
    };
    if let Some(level) = cli.log_level_override() {
        config.logging.level = level.to_string();
    }

    let _logging = logging::init(&config.logging.level, &config.logging);
    info!("Podcast Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::Download(args) => {
            let shutdown = ShutdownSignal::new();
            let _signals = SignalHandler::new(shutdown.clone()).setup();
            handle_download(args, &config, shutdown, cli.global.quiet).await
        }
        Commands::Config(args) => handle_config(args, &config).await,
    };

    match result {
        Ok(status) => status,
        Err(e) => {
            error!("{} error: {}", e.category(), e);
            ExitStatus::Fatal
        }
    }
}
