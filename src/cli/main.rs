//! Dataset curation CLI tool
//!
//! Command-line interface that runs the curation pipeline against a dataset root.

use super::config::CliConfigBuilder;
use crate::{
    download::HttpImageFetcher,
    pipeline::{Pipeline, PipelineReport},
    search::DuckDuckGoSearch,
    services::{CurationStage, NoOpProgressReporter, ProgressReporter},
    tracing_config::{spans, TracingConfig, TracingFormat},
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::Instrument;

/// Image dataset curation tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "dataset-curator")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Dataset root holding `raw/` and `processed/`
    #[arg(long, value_name = "PATH", default_value = "inputs")]
    pub root: PathBuf,

    /// Search for and download the negative ("not a pet") classes
    #[arg(long)]
    pub download_others: bool,

    /// Search for and download the cat breeds
    #[arg(long)]
    pub download_cats: bool,

    /// Skip the format/validity/duplicate filters
    #[arg(long)]
    pub skip_sanitize: bool,

    /// Skip the train/test/valid split and resize
    #[arg(long)]
    pub skip_split: bool,

    /// Fraction of each category assigned to train
    #[arg(long, default_value_t = 0.8)]
    pub train: f64,

    /// Fraction of each category assigned to test
    #[arg(long, default_value_t = 0.1)]
    pub test: f64,

    /// Fraction of each category assigned to valid
    #[arg(long, default_value_t = 0.1)]
    pub valid: f64,

    /// Shuffle seed for a reproducible split [default: random]
    #[arg(long)]
    pub seed: Option<u64>,

    /// Resize worker threads (0 = one per CPU core)
    #[arg(short, long, default_value_t = 0)]
    pub workers: usize,

    /// Output width and height in pixels
    #[arg(long, default_value_t = 460)]
    pub size: u32,

    /// Images narrower or shorter than this are dropped
    #[arg(long, default_value_t = 100)]
    pub min_size: u32,

    /// JPEG quality (1-100)
    #[arg(long, default_value_t = 75)]
    pub jpeg_quality: u8,

    /// Maximum images downloaded per category (must stay below 1000)
    #[arg(long, default_value_t = 900)]
    pub target_count: usize,

    /// Categories holding more than this many files are not downloaded again
    #[arg(long, default_value_t = 800)]
    pub required_count: usize,

    /// Attempts per category before giving up
    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,

    /// Seconds to wait between attempts
    #[arg(long, default_value_t = 5)]
    pub retry_delay: u64,

    /// Parallel downloads per category
    #[arg(long, default_value_t = 8)]
    pub download_concurrency: usize,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = CliLogFormat::Console)]
    pub log_format: CliLogFormat,

    /// Explicit tracing filter (overrides -v), e.g. "dataset_curator=debug"
    #[arg(long)]
    pub log_filter: Option<String>,

    /// Hide progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Print the final run report as JSON on stdout
    #[arg(long)]
    pub json_summary: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum CliLogFormat {
    Console,
    Compact,
    #[cfg(feature = "tracing-json")]
    Json,
}

impl From<CliLogFormat> for TracingFormat {
    fn from(format: CliLogFormat) -> Self {
        match format {
            CliLogFormat::Console => TracingFormat::Console,
            CliLogFormat::Compact => TracingFormat::Compact,
            #[cfg(feature = "tracing-json")]
            CliLogFormat::Json => TracingFormat::Json,
        }
    }
}

/// Progress reporter drawing one `indicatif` bar per stage
struct IndicatifProgressReporter {
    current: Mutex<Option<ProgressBar>>,
}

impl IndicatifProgressReporter {
    fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }

    fn bar_for(total: Option<u64>) -> ProgressBar {
        match total {
            Some(total) => {
                let pb = ProgressBar::new(total);
                let style = ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-");
                pb.set_style(style);
                pb
            },
            None => ProgressBar::new_spinner(),
        }
    }
}

impl ProgressReporter for IndicatifProgressReporter {
    fn stage_started(&self, stage: CurationStage, total: Option<u64>) {
        let pb = Self::bar_for(total);
        pb.set_message(stage.description());
        if let Ok(mut current) = self.current.lock() {
            if let Some(previous) = current.replace(pb) {
                previous.finish_and_clear();
            }
        }
    }

    fn item_completed(&self, _stage: CurationStage) {
        if let Ok(current) = self.current.lock() {
            if let Some(pb) = current.as_ref() {
                pb.inc(1);
            }
        }
    }

    fn stage_finished(&self, stage: CurationStage) {
        if let Ok(mut current) = self.current.lock() {
            if let Some(pb) = current.take() {
                pb.finish_with_message(format!("{} done", stage.description()));
            }
        }
    }
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let session_id = init_tracing(&cli).context("Failed to initialize tracing")?;

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;

    info!("Starting dataset curation in {}", config.layout.root.display());
    info!(
        "Plan: download others={}, download cats={}, sanitize={}, split and resize={}",
        config.plan.download_other_images,
        config.plan.download_cat_images,
        config.plan.sanitize,
        config.plan.split_and_resize
    );

    let search = DuckDuckGoSearch::new().context("Failed to create search client")?;
    let fetcher = HttpImageFetcher::new(cli.download_concurrency)
        .context("Failed to create download client")?;
    let progress: Arc<dyn ProgressReporter> = if cli.no_progress || cli.json_summary {
        Arc::new(NoOpProgressReporter)
    } else {
        Arc::new(IndicatifProgressReporter::new())
    };

    let root = config.layout.root.clone();
    let pipeline = Pipeline::new(config, Arc::new(search), Arc::new(fetcher), progress);

    let start_time = Instant::now();
    let report = pipeline
        .run()
        .instrument(spans::session(&session_id, &root))
        .await;

    summarize(&report);
    info!("Finished in {:.2}s", start_time.elapsed().as_secs_f64());

    if cli.json_summary {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{json}");
    }

    Ok(())
}

/// Log a short human-readable digest of the run
fn summarize(report: &PipelineReport) {
    if !report.acquisition.is_empty() {
        info!("Acquisition: {} categories handled", report.acquisition.len());
    }
    if let Some(sanitize) = &report.sanitize {
        info!(
            "Sanitize: removed {} non-JPEG, {} invalid, {} duplicate files",
            sanitize.format.removed.len(),
            sanitize.validity.removed.len(),
            sanitize.duplicates.removed.len()
        );
    }
    if let Some(split) = &report.split {
        info!(
            "Split: {} train / {} test / {} valid across {} categories",
            split.train,
            split.test,
            split.valid,
            split.leaves.len()
        );
    }
    if let Some(materialize) = &report.materialize {
        info!(
            "Resize: {} written, {} too small, {} failed",
            materialize.written, materialize.too_small, materialize.failed
        );
    }
    for error in &report.errors {
        warn!("{}", error);
    }
}

/// Initialize tracing from the verbosity and format flags, returning the session id
fn init_tracing(cli: &Cli) -> Result<String> {
    let session_id = uuid::Uuid::new_v4().to_string();

    let mut tracing_config = TracingConfig::new()
        .with_verbosity(cli.verbose)
        .with_format(cli.log_format.into())
        .with_session_id(session_id.clone());
    if let Some(filter) = &cli.log_filter {
        tracing_config = tracing_config.with_env_filter(filter.clone());
    }

    tracing_config
        .init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::debug!(verbosity = cli.verbose, "Tracing initialized");
    Ok(session_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::try_parse_from(["dataset-curator"]).unwrap();
        assert_eq!(cli.root, PathBuf::from("inputs"));
        assert!(!cli.download_cats);
        assert!(!cli.download_others);
        assert_eq!(cli.size, 460);
        assert_eq!(cli.jpeg_quality, 75);
        assert_eq!(cli.log_format, CliLogFormat::Console);
        assert!(cli.seed.is_none());
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "dataset-curator",
            "--root",
            "/data/pets",
            "--download-cats",
            "--seed",
            "7",
            "-vv",
            "--log-format",
            "compact",
            "--skip-sanitize",
        ])
        .unwrap();
        assert_eq!(cli.root, PathBuf::from("/data/pets"));
        assert!(cli.download_cats);
        assert!(cli.skip_sanitize);
        assert_eq!(cli.seed, Some(7));
        assert_eq!(cli.verbose, 2);
        assert_eq!(TracingFormat::from(cli.log_format), TracingFormat::Compact);
    }

    #[test]
    fn test_indicatif_reporter_lifecycle() {
        let reporter = IndicatifProgressReporter::new();
        reporter.stage_started(CurationStage::Materialize, Some(2));
        reporter.item_completed(CurationStage::Materialize);
        reporter.item_completed(CurationStage::Materialize);
        assert_eq!(
            reporter.current.lock().unwrap().as_ref().map(ProgressBar::position),
            Some(2)
        );
        reporter.stage_finished(CurationStage::Materialize);
        assert!(reporter.current.lock().unwrap().is_none());
    }
}
