//! Command-line interface components
//!
//! This module contains CLI-specific code for the Podcast Fetcher application:
//! argument parsing, command handlers, logging setup and progress display.

pub mod args;
pub mod commands;
pub mod logging;
pub mod progress;

pub use args::{Cli, Commands, ConfigAction, ConfigArgs, DownloadArgs, GlobalArgs, LogLevel};
pub use commands::{handle_config, handle_download, ExitStatus};
pub use logging::LoggingGuard;
pub use progress::{select_reporter, BarReporter};
