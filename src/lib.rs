#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Dataset Curator
//!
//! Builds a labelled image classification dataset on disk: cat breeds as the
//! positive classes and a handful of "not a pet" classes as negatives.
//!
//! A run is a sequence of independently toggleable, re-runnable stages:
//!
//! 1. **Acquire**: search the web per category and download into
//!    `raw/cats/<breed>` or `raw/not-a-pet/<class>`, with skip and retry
//! 2. **Sanitize**: delete non-JPEG names, undecodable images and
//!    byte-identical duplicates from the raw corpus
//! 3. **Split**: wipe `processed/{train,test,valid}` and assign every raw
//!    image of every leaf folder to exactly one bucket
//! 4. **Resize**: drop images below the minimum resolution, stretch the rest
//!    to the target size and write them as JPEG, in parallel
//!
//! The filesystem is the only state; there is no manifest.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dataset_curator::{curate, CurationConfig, RunPlan};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = CurationConfig::builder()
//!     .root("inputs")
//!     .seed(Some(42))
//!     .plan(RunPlan {
//!         download_other_images: false,
//!         download_cat_images: true,
//!         sanitize: true,
//!         split_and_resize: true,
//!     })
//!     .build()?;
//!
//! let report = curate(config).await?;
//! println!("{} images written", report.materialize.map_or(0, |m| m.written));
//! # Ok(())
//! # }
//! ```
//!
//! ## Local stages only
//!
//! Sanitizing, splitting and resizing need no network access:
//!
//! ```rust,no_run
//! use dataset_curator::{curate_local, CurationConfig, NoOpProgressReporter};
//!
//! let config = CurationConfig::builder().root("inputs").build()?;
//! let report = curate_local(&config, &NoOpProgressReporter);
//! assert!(report.errors.is_empty());
//! # Ok::<(), dataset_curator::CurationError>(())
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): command-line interface, progress bars and log output
//! - `webp-support` (default): WebP decoding
//! - `tracing-json`: JSON structured log output for the CLI

pub mod acquire;
pub mod catalog;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod corpus;
pub mod download;
pub mod error;
pub mod pipeline;
pub mod processor;
pub mod sanitize;
pub mod search;
pub mod services;
pub mod split;
pub mod tracing_config;

use std::sync::Arc;

// Public API exports
pub use acquire::{AcquisitionOutcome, Acquirer, CategoryAcquisition};
pub use catalog::{Category, CategoryGroup};
pub use config::{
    AcquisitionSettings, CorpusLayout, CurationConfig, CurationConfigBuilder, ResizeSettings,
    RunPlan, SplitRatios,
};
pub use download::{HttpImageFetcher, ImageFetcher};
pub use error::{CurationError, Result};
pub use pipeline::{curate_local, Pipeline, PipelineReport, SplitSummary};
pub use processor::{MaterializeReport, ProcessOutcome, ResizeProcessor};
pub use sanitize::{PassReport, SanitizeReport};
pub use search::{DuckDuckGoSearch, ImageSearch};
pub use services::{
    ConsoleProgressReporter, CurationStage, ImageIOService, NoOpProgressReporter,
    ProgressReporter,
};
pub use split::{SplitAssignment, SplitBucket, SplitTask};
pub use tracing_config::{events, spans, TracingConfig, TracingFormat};

/// Concurrent downloads per category used by [`curate`]
const DEFAULT_DOWNLOAD_CONCURRENCY: usize = 8;

/// Run every stage enabled in `config` with the stock web collaborators
///
/// Uses [`DuckDuckGoSearch`] and [`HttpImageFetcher`] and discards progress.
///
/// # Errors
/// Only when an HTTP client cannot be created; stage failures are recorded
/// in the returned report.
pub async fn curate(config: CurationConfig) -> Result<PipelineReport> {
    let search = DuckDuckGoSearch::new()?;
    let fetcher = HttpImageFetcher::new(DEFAULT_DOWNLOAD_CONCURRENCY)?;
    let pipeline = Pipeline::new(
        config,
        Arc::new(search),
        Arc::new(fetcher),
        Arc::new(NoOpProgressReporter),
    );
    Ok(pipeline.run().await)
}
