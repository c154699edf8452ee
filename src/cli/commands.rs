//! Command handlers for Podcast Fetcher CLI
//!
//! This module connects parsed arguments and the loaded configuration to the
//! acquisition pipeline, and maps each run onto a process exit status.

use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::app::{
    fetch_series_feed, Coordinator, PodcastClient, RunOutcome, SeriesPlan, SessionResult,
    ShutdownSignal,
};
use crate::cli::progress::select_reporter;
use crate::cli::{ConfigAction, ConfigArgs, DownloadArgs};
use crate::config::AppConfig;
use crate::errors::{AppError, FeedError, Result};

/// How a run ended, as seen by the shell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Finished; individual episodes may still have failed
    Success,
    /// Unrecoverable error
    Fatal,
    /// No feed produced a series title
    NoSeriesMetadata,
    /// The user declined the confirmation prompt
    Declined,
    /// Stopped by a shutdown signal
    Interrupted,
}

impl ExitStatus {
    /// Process exit code
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Fatal => 1,
            ExitStatus::NoSeriesMetadata => 2,
            ExitStatus::Declined => 3,
            ExitStatus::Interrupted => 4,
        }
    }
}

/// Handle the download command
///
/// Fetches the series feed, plans the run, asks for confirmation unless
/// `--force` is given, then downloads every resolved episode.
///
/// # Errors
///
/// Returns an error for failures that end the run before any episode is
/// processed, such as an HTTP client that cannot be built or a series
/// directory that cannot be created
pub async fn handle_download(
    args: DownloadArgs,
    config: &AppConfig,
    shutdown: ShutdownSignal,
    quiet: bool,
) -> Result<ExitStatus> {
    info!("Channel {} ({})", args.channel.id(), args.channel);

    let mut coordinator_config = config.coordinator_config();
    coordinator_config.series_dir = args.dir.clone();
    coordinator_config.short_names = args.short_names;
    coordinator_config.recheck = args.recheck;
    if let Some(quality) = args.quality {
        coordinator_config.quality = quality;
    }
    debug!("Coordinator config: {:?}", coordinator_config);

    let client = Arc::new(PodcastClient::with_config(&config.client_config())?);

    let feed = match fetch_series_feed(
        &client,
        &coordinator_config.retry,
        &shutdown,
        &args.channel.feed_candidates(),
    )
    .await
    {
        Ok(feed) => feed,
        Err(FeedError::NoSeriesTitle { tried }) => {
            error!("Could not determine the series name (tried {})", tried);
            return Ok(ExitStatus::NoSeriesMetadata);
        }
        Err(e) => {
            let e = AppError::from(e);
            if e.is_cancellation() {
                info!("Download interrupted before any episode was resolved");
                return Ok(ExitStatus::Interrupted);
            }
            return Err(e);
        }
    };

    let coordinator = Coordinator::new(
        coordinator_config,
        client,
        shutdown.clone(),
        select_reporter(quiet),
    );

    let plan = match coordinator.plan(&feed).await {
        Ok(plan) => plan,
        Err(e) if e.is_cancellation() => {
            info!("Download interrupted before any episode was resolved");
            return Ok(ExitStatus::Interrupted);
        }
        Err(e) => return Err(e),
    };

    if plan.outcome == RunOutcome::Interrupted {
        report_interrupted(&plan.series_dir, &[]);
        return Ok(ExitStatus::Interrupted);
    }

    info!(
        "Resolved {} episodes ({} from cache, {} from the feed only, {} without audio)",
        plan.episodes.len(),
        plan.cached,
        plan.feed_fallbacks,
        plan.unresolved
    );

    if args.dry_run {
        print_plan(&plan);
        return Ok(ExitStatus::Success);
    }

    if !args.force && !confirm(&plan, &shutdown).await? {
        info!("Download cancelled");
        return Ok(ExitStatus::Declined);
    }

    let result = coordinator.download(&plan).await;
    print_summary(&result);

    match result.outcome {
        RunOutcome::Interrupted => {
            report_interrupted(&result.series_dir, &result.completed);
            Ok(ExitStatus::Interrupted)
        }
        RunOutcome::Completed => {
            info!("All done! Files are in '{}'", result.series_dir.display());
            Ok(ExitStatus::Success)
        }
    }
}

/// Handle the config command
///
/// # Errors
///
/// Returns an error if the default file cannot be written or the effective
/// configuration cannot be serialized
pub async fn handle_config(args: ConfigArgs, config: &AppConfig) -> Result<ExitStatus> {
    match args.action {
        ConfigAction::Init { path, force } => {
            let written = AppConfig::write_default_file(path.as_deref(), force).await?;
            println!("Wrote default configuration to {}", written.display());
        }
        ConfigAction::Show => {
            match AppConfig::find_config_file() {
                Some(path) => println!("# Loaded from {}", path.display()),
                None => println!("# No config file found; showing defaults"),
            }
            println!("{}", config.to_toml_string()?);
        }
    }
    Ok(ExitStatus::Success)
}

/// Ask before downloading; shutdown while waiting counts as "no"
async fn confirm(plan: &SeriesPlan, shutdown: &ShutdownSignal) -> Result<bool> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(
            format!(
                "Download all episodes to '{}'? [y/N]: ",
                plan.series_dir.display()
            )
            .as_bytes(),
        )
        .await?;
    stdout.flush().await?;

    let mut answer = String::new();
    let mut stdin = BufReader::new(tokio::io::stdin());

    tokio::select! {
        biased;
        _ = shutdown.triggered() => {
            println!();
            Ok(false)
        }
        read = stdin.read_line(&mut answer) => {
            read?;
            Ok(answer.trim().eq_ignore_ascii_case("y"))
        }
    }
}

fn print_plan(plan: &SeriesPlan) {
    println!("Series: {}", plan.series_title);
    println!("Directory: {}", plan.series_dir.display());
    println!();
    for episode in &plan.episodes {
        let number = episode
            .episode_number
            .map(|n| format!("{:>4}", n))
            .unwrap_or_else(|| "   -".to_string());
        println!("{}  {}", number, episode.display_title);
        println!("      {}", episode.audio_url);
    }
    println!();
    println!(
        "{} episodes to download, {} without audio",
        plan.episodes.len(),
        plan.unresolved
    );
}

fn print_summary(result: &SessionResult) {
    let stats = &result.stats;
    info!("{}", result.headline());
    info!(
        "Downloaded: {}, already complete: {}, skipped: {}, failed: {}, unresolved: {}",
        stats.downloaded, stats.already_complete, stats.skipped, stats.failed, stats.unresolved
    );
    if stats.bytes_downloaded > 0 {
        info!(
            "Transferred {:.1} MB in {:.1}s",
            stats.bytes_downloaded as f64 / (1024.0 * 1024.0),
            result.total_duration.as_secs_f64()
        );
    }
    if stats.failed > 0 {
        warn!("{} episodes failed; run again to retry them", stats.failed);
    }
}

fn report_interrupted(series_dir: &Path, completed: &[String]) {
    for line in interrupted_report(series_dir, completed) {
        warn!("{}", line);
    }
}

fn interrupted_report(series_dir: &Path, completed: &[String]) -> Vec<String> {
    let mut lines = Vec::with_capacity(2);
    if completed.is_empty() {
        lines.push("No episodes were completed before the interrupt".to_string());
    } else {
        lines.push(format!(
            "Completed before the interrupt ({}): {}",
            completed.len(),
            completed.join(", ")
        ));
    }
    lines.push(format!(
        "Download interrupted. Partial downloads may be in '{}'",
        series_dir.display()
    ));
    lines
}
