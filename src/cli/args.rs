//! Command-line argument parsing for Podcast Fetcher
//!
//! This module defines the CLI structure using clap derive macros: the
//! download command, configuration helpers, and the global logging options.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::app::feed::ChannelUrl;
use crate::app::models::AudioQuality;

/// Podcast Fetcher - Archive iono.fm podcast series
#[derive(Parser, Debug)]
#[command(
    name = "podcast_fetcher",
    version,
    about = "Download every episode of an iono.fm podcast series",
    long_about = "Downloads all episodes of an iono.fm channel. Episodes are found through the series RSS feed,
confirmed against their landing pages, and saved with resumable transfers. Files that are already
complete are skipped, so repeated runs only fetch what is new or unfinished."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Verbose logging (debug level)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Quiet mode - errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Explicit log level (overrides the config file)
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Log levels accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Errors only
    Error,
    /// Warnings and errors
    Warn,
    /// Lifecycle messages
    Info,
    /// Per-strategy decisions
    Debug,
}

impl LogLevel {
    /// Filter directive spelling
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download all episodes of a channel
    Download(DownloadArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Arguments for the download command
#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Channel URL, e.g. https://iono.fm/c/3443
    #[arg(value_name = "CHANNEL_URL", value_parser = parse_channel_url)]
    pub channel: ChannelUrl,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub force: bool,

    /// Name files after the episode title instead of its description
    #[arg(long)]
    pub short_names: bool,

    /// Series directory name (default: the author, else the podcast name)
    #[arg(long, value_name = "NAME")]
    pub dir: Option<String>,

    /// Ignore cached metadata and re-verify every file with the server
    #[arg(long)]
    pub recheck: bool,

    /// Resolve and list episodes without downloading
    #[arg(long)]
    pub dry_run: bool,

    /// Preferred audio quality (overrides the config file)
    #[arg(long, value_enum)]
    pub quality: Option<AudioQuality>,
}

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Config action
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a commented default config file
    Init {
        /// Destination (default: the per-user config directory)
        #[arg(long, value_name = "FILE")]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

fn parse_channel_url(raw: &str) -> Result<ChannelUrl, String> {
    raw.parse::<ChannelUrl>().map_err(|e| e.to_string())
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Log level requested on the command line, if any
    ///
    /// `--log-level` wins over `-v`/`-q`.
    pub fn log_level_override(&self) -> Option<&'static str> {
        if let Some(level) = self.global.log_level {
            Some(level.as_str())
        } else if self.global.verbose {
            Some("debug")
        } else if self.global.quiet {
            Some("error")
        } else {
            None
        }
    }
}
