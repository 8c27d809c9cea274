// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error};
use std::io::Write;
use std::path::PathBuf;

use crate::app_config::Config;
use crate::app_controller::{Controller, OutputFormat};

mod app_config;
mod app_controller;
mod boundaries;
mod cue;
mod dedup;
mod errors;
mod events;
mod language_utils;
mod normalizer;
mod provider;
mod scraper;
mod sentence_loop;
mod track;
mod transcript;

/// CLI wrapper for OutputFormat to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliOutputFormat {
    Text,
    Srt,
    Json,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(format: CliOutputFormat) -> Self {
        match format {
            CliOutputFormat::Text => OutputFormat::Text,
            CliOutputFormat::Srt => OutputFormat::Srt,
            CliOutputFormat::Json => OutputFormat::Json,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch and normalize the best caption track of a watch page
    Transcript {
        /// Watch page URL or a saved HTML file
        #[arg(value_name = "PAGE")]
        page: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: CliOutputFormat,

        /// Write output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the caption tracks a watch page exposes
    Tracks {
        /// Watch page URL or a saved HTML file
        #[arg(value_name = "PAGE")]
        page: String,
    },
}

#[derive(Parser, Debug)]
#[command(name = "captrace", version, about = "Caption track acquisition and cue reconciliation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (JSON); defaults apply when absent
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Preferred caption language code
    #[arg(short, long, global = true)]
    language: Option<String>,
}

/// Minimal stderr logger so library diagnostics reach the terminal
struct StderrLogger {
    level: LevelFilter,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let prefix = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARN ",
            Level::Info => "INFO ",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };
        eprintln!("[{}] {}", prefix, record.args());
    }

    fn flush(&self) {}
}

fn init_logger() -> Result<(), SetLoggerError> {
    // The logger filters against max_level, which is tightened once the
    // config is loaded
    log::set_boxed_logger(Box::new(StderrLogger {
        level: LevelFilter::Trace,
    }))?;
    log::set_max_level(LevelFilter::Info);
    Ok(())
}

#[tokio::main]
async fn main() {
    let _ = init_logger();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(language) = cli.language {
        config.preferred_language = language;
    }

    log::set_max_level(config.log_level.to_level_filter());
    let controller = Controller::with_config(config)?;

    match cli.command {
        Commands::Transcript { page, format, output } => {
            let rendered = controller.fetch_transcript(&page, format.into()).await?;
            match output {
                Some(path) => {
                    let mut file = std::fs::File::create(&path)
                        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
                    file.write_all(rendered.as_bytes())?;
                    eprintln!("wrote transcript to {}", path.display());
                }
                None => print!("{}", rendered),
            }
        }
        Commands::Tracks { page } => {
            let tracks = controller.list_tracks(&page).await?;
            if tracks.is_empty() {
                eprintln!("no caption tracks found");
            }
            for track in tracks {
                println!(
                    "{:12} {:8} {:6} {}",
                    track.vss_id.as_deref().unwrap_or("-"),
                    track.language_code.as_deref().unwrap_or("-"),
                    track.kind.as_deref().unwrap_or("-"),
                    track
                        .name
                        .as_ref()
                        .map(|n| n.display())
                        .unwrap_or_else(|| "-".to_string())
                );
            }
        }
    }

    Ok(())
}
