//! End-to-end curation driver
//!
//! Runs the enabled stages of a [`RunPlan`](crate::config::RunPlan) in order:
//! acquisition of the negative classes, acquisition of the cat breeds,
//! sanitization of the raw corpus, then split planning and resizing into the
//! processed corpus. A failing stage is logged and recorded in the report;
//! later stages still run.

use crate::acquire::{Acquirer, CategoryAcquisition};
use crate::config::CurationConfig;
use crate::download::ImageFetcher;
use crate::error::{CurationError, Result};
use crate::processor::{MaterializeReport, ResizeProcessor};
use crate::sanitize::{self, SanitizeReport};
use crate::search::ImageSearch;
use crate::services::{CurationStage, ProgressReporter};
use crate::split::{self, LeafSummary, SplitAssignment, SplitBucket};
use serde::Serialize;
use std::sync::Arc;

/// Bucket totals of the planned split
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SplitSummary {
    pub train: usize,
    pub test: usize,
    pub valid: usize,
    pub leaves: Vec<LeafSummary>,
}

impl From<&SplitAssignment> for SplitSummary {
    fn from(assignment: &SplitAssignment) -> Self {
        Self {
            train: assignment.bucket_len(SplitBucket::Train),
            test: assignment.bucket_len(SplitBucket::Test),
            valid: assignment.bucket_len(SplitBucket::Valid),
            leaves: assignment.leaves.clone(),
        }
    }
}

/// Everything a run did; stages that did not run are `None` / empty
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub acquisition: Vec<CategoryAcquisition>,
    pub sanitize: Option<SanitizeReport>,
    pub split: Option<SplitSummary>,
    pub materialize: Option<MaterializeReport>,
    /// Stage-level failures, in the order they happened
    pub errors: Vec<String>,
}

impl PipelineReport {
    fn record_error(&mut self, stage: CurationStage, error: &CurationError) {
        crate::tracing_config::events::error_with_context(error, stage.description());
        self.errors.push(format!("{}: {}", stage.description(), error));
    }
}

/// Run the local stages (sanitize, split, resize) of `config`
///
/// Blocking; the resize stage uses its own worker pool.
pub fn curate_local(config: &CurationConfig, progress: &dyn ProgressReporter) -> PipelineReport {
    let mut report = PipelineReport::default();
    let layout = &config.layout;

    if config.plan.sanitize {
        report.sanitize = Some(sanitize::sanitize_corpus(&layout.raw_dir(), progress));
    }

    if config.plan.split_and_resize {
        match plan(config, progress) {
            Ok(assignment) => {
                report.split = Some(SplitSummary::from(&assignment));
                let processor = ResizeProcessor::new(config.resize);
                match processor.process_all(&assignment.tasks, progress) {
                    Ok(materialized) => report.materialize = Some(materialized),
                    Err(e) => report.record_error(CurationStage::Materialize, &e),
                }
            },
            Err(e) => report.record_error(CurationStage::SplitPlanning, &e),
        }
    }

    report
}

fn plan(config: &CurationConfig, progress: &dyn ProgressReporter) -> Result<SplitAssignment> {
    progress.stage_started(CurationStage::SplitPlanning, None);
    let planned = split::reset_processed_dirs(&config.layout)
        .and_then(|()| split::plan_splits(&config.layout, &config.ratios, config.seed));
    progress.stage_finished(CurationStage::SplitPlanning);
    planned
}

/// Curation pipeline with its network collaborators
pub struct Pipeline {
    config: Arc<CurationConfig>,
    search: Arc<dyn ImageSearch>,
    fetcher: Arc<dyn ImageFetcher>,
    progress: Arc<dyn ProgressReporter>,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        config: CurationConfig,
        search: Arc<dyn ImageSearch>,
        fetcher: Arc<dyn ImageFetcher>,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            search,
            fetcher,
            progress,
        }
    }

    #[must_use]
    pub fn config(&self) -> &CurationConfig {
        &self.config
    }

    /// Execute every stage enabled in the run plan
    pub async fn run(&self) -> PipelineReport {
        let plan = self.config.plan;
        let raw_dir = self.config.layout.raw_dir();
        let acquirer = Acquirer::new(
            Arc::clone(&self.search),
            Arc::clone(&self.fetcher),
            self.config.acquisition,
        );

        let mut acquisition = Vec::new();
        if plan.download_other_images {
            acquisition.extend(
                acquirer
                    .acquire_all(&self.config.other_types, &raw_dir, self.progress.as_ref())
                    .await,
            );
        }
        if plan.download_cat_images {
            acquisition.extend(
                acquirer
                    .acquire_all(&self.config.cat_breeds, &raw_dir, self.progress.as_ref())
                    .await,
            );
        }

        let config = Arc::clone(&self.config);
        let progress = Arc::clone(&self.progress);
        let local =
            tokio::task::spawn_blocking(move || curate_local(&config, progress.as_ref())).await;

        let mut report = match local {
            Ok(report) => report,
            Err(e) => {
                let mut report = PipelineReport::default();
                report.record_error(
                    CurationStage::Materialize,
                    &CurationError::processing_stage_error(
                        "local stages",
                        &e.to_string(),
                        None,
                    ),
                );
                report
            },
        };
        report.acquisition = acquisition;

        tracing::info!(
            categories = report.acquisition.len(),
            errors = report.errors.len(),
            "Curation run finished"
        );
        report
    }
}
