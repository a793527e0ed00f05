// src/bin/cli.rs

//! Headline monitor CLI
//!
//! One invocation performs one run. Scheduling is left to cron or a CI
//! schedule; runs must not overlap.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use headline_monitor::{
    error::{AppError, Result},
    models::{Config, LoggingConfig},
    pipeline,
    services::{ArticleSource, HeadlineFetcher, Notifier, TelegramBot},
    storage::{DedupStorage, LocalStorage},
    utils::format_file_size,
};

/// Forward new headlines to a Telegram chat
#[derive(Parser, Debug)]
#[command(name = "headline-monitor", version, about = "News headline to Telegram notifier")]
struct Cli {
    /// Config file (default: yonhap_config.json, then config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, Default)]
enum Command {
    /// Check the bot, then fetch, filter, notify and persist once
    #[default]
    Run,

    /// Check bot credentials and reachability only
    Check,

    /// Scrape the headline page and print candidates as JSON
    Fetch,

    /// Validate the merged configuration
    Validate,

    /// Show dedup store statistics
    Info,
}

/// Writes every log line to stderr and to the log file.
struct TeeWriter {
    file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

/// Initialize logging from config, with `--verbose` forcing debug.
fn init_logging(verbose: bool, logging: &LoggingConfig) {
    let level = if verbose {
        "debug".to_string()
    } else {
        logging.filter()
    };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));
    builder.format_timestamp_secs();

    if let Some(path) = &logging.file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(TeeWriter { file })));
            }
            Err(e) => eprintln!("Cannot open log file {}: {}", path.display(), e),
        }
    }

    builder.init();
}

/// Main entry point for the CLI application.
///
/// Exits with 2 when configuration or bot credentials are unusable, so a
/// scheduler can tell them apart from a failed run.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_fatal() => {
            log::error!("Aborted: {}", e);
            ExitCode::from(2)
        }
        Err(e) => {
            log::error!("Failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let dotenv = dotenvy::dotenv();

    let config_path = Config::locate(cli.config.as_deref());
    let loaded = config_path.as_ref().map(Config::load).transpose();
    let logging = match &loaded {
        Ok(Some(config)) => config.logging.clone(),
        _ => LoggingConfig::default(),
    };
    init_logging(cli.verbose, &logging);

    if let Ok(path) = dotenv {
        log::debug!("Loaded environment from {}", path.display());
    }

    let mut config = match (loaded, &config_path) {
        (Ok(Some(config)), Some(path)) => {
            log::info!("Loaded configuration from {}", path.display());
            config
        }
        (Err(e), Some(path)) => {
            return Err(AppError::config(format!(
                "cannot load {}: {}",
                path.display(),
                e
            )));
        }
        _ => {
            log::info!("No config file found, using defaults and environment");
            Config::default()
        }
    };
    config.apply_env_overrides();

    match cli.command.unwrap_or_default() {
        Command::Run => {
            config.validate()?;

            let source = HeadlineFetcher::new(&config.source)?;
            let bot = TelegramBot::new(&config.telegram, &config.notifier)?;
            let storage = LocalStorage::new(&config.storage.processed_articles_file);

            let report = pipeline::run_pipeline(&config, &source, &bot, &storage).await?;

            log::info!(
                "Run complete: {} scraped, {} new, {}/{} messages sent, {} records stored",
                report.scraped,
                report.new_articles,
                report.delivery.sent,
                report.delivery.attempted,
                report.store_size
            );
        }

        Command::Check => {
            config.validate()?;
            let bot = TelegramBot::new(&config.telegram, &config.notifier)?;
            let name = bot.check_connection().await?;
            log::info!("✓ Telegram bot reachable: {}", name);
        }

        Command::Fetch => {
            let source = HeadlineFetcher::new(&config.source)?;
            let articles = source.fetch_headlines().await?;
            println!("{}", serde_json::to_string_pretty(&articles)?);
        }

        Command::Validate => {
            config.validate()?;
            log::info!("All validations passed!");
        }

        Command::Info => {
            let storage = LocalStorage::new(&config.storage.processed_articles_file);
            log::info!("Dedup store: {}", storage.location().display());

            let store = storage.load().await?;
            log::info!("Processed articles: {}", store.len());
            log::info!("File size: {}", format_file_size(storage.file_size().await));
            match store.latest_processed_at() {
                Some(at) => log::info!("Last processed: {}", at.format("%Y-%m-%d %H:%M:%S")),
                None => log::info!("Nothing processed yet."),
            }
        }
    }

    Ok(())
}
