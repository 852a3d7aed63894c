//! Resize-and-materialize stage
//!
//! Executes a [`SplitAssignment`](crate::split::SplitAssignment) by decoding
//! every source image, dropping the ones below the minimum resolution,
//! stretching the rest to the exact target size and writing them as JPEG into
//! their bucket folder. Tasks run on a dedicated `rayon` pool.

use crate::config::ResizeSettings;
use crate::error::{CurationError, Result};
use crate::services::{CurationStage, ImageIOService, ProgressReporter};
use crate::split::SplitTask;
use crate::tracing_config::{events, spans};
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GenericImageView};
use rayon::prelude::*;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

/// Result of processing one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Resized image written to this path
    Written(PathBuf),
    /// Source was below the minimum resolution; nothing written
    TooSmall { width: u32, height: u32 },
    /// Decode or save failed; nothing (or a partial file) written
    Failed(String),
}

/// Aggregate of a [`ResizeProcessor::process_all`] run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaterializeReport {
    pub written: usize,
    pub too_small: usize,
    pub failed: usize,
    /// Sources that failed to decode or save
    pub failures: Vec<PathBuf>,
}

impl MaterializeReport {
    fn record(&mut self, task: &SplitTask, outcome: &ProcessOutcome) {
        match outcome {
            ProcessOutcome::Written(_) => self.written += 1,
            ProcessOutcome::TooSmall { .. } => self.too_small += 1,
            ProcessOutcome::Failed(_) => {
                self.failed += 1;
                self.failures.push(task.source.clone());
            },
        }
    }

    /// Tasks accounted for
    #[must_use]
    pub fn total(&self) -> usize {
        self.written + self.too_small + self.failed
    }
}

/// Convert to a pixel layout the JPEG encoder accepts
///
/// Alpha is dropped and wide channels are narrowed to 8 bits; 8-bit grey and
/// RGB pass through untouched.
#[must_use]
pub fn normalize_color_mode(image: DynamicImage) -> DynamicImage {
    match image.color() {
        ColorType::L8 | ColorType::Rgb8 => image,
        _ => DynamicImage::ImageRgb8(image.to_rgb8()),
    }
}

/// Resizes split tasks into the processed corpus
#[derive(Debug, Clone)]
pub struct ResizeProcessor {
    settings: ResizeSettings,
}

impl ResizeProcessor {
    #[must_use]
    pub fn new(settings: ResizeSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn settings(&self) -> &ResizeSettings {
        &self.settings
    }

    /// Process a single task; errors are logged and returned as [`ProcessOutcome::Failed`]
    #[must_use]
    pub fn process(&self, task: &SplitTask) -> ProcessOutcome {
        match self.try_process(task) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Error processing {}: {}", task.source.display(), e);
                ProcessOutcome::Failed(e.to_string())
            },
        }
    }

    fn try_process(&self, task: &SplitTask) -> Result<ProcessOutcome> {
        let image = ImageIOService::load_image(&task.source)?;
        let (width, height) = image.dimensions();

        if width < self.settings.min_width || height < self.settings.min_height {
            log::debug!(
                "Dropping {} ({}x{} below {}x{})",
                task.source.display(),
                width,
                height,
                self.settings.min_width,
                self.settings.min_height
            );
            return Ok(ProcessOutcome::TooSmall { width, height });
        }

        let resized = normalize_color_mode(image).resize_exact(
            self.settings.target_width,
            self.settings.target_height,
            FilterType::Lanczos3,
        );

        let destination = task.destination_path();
        ImageIOService::save_jpeg(&resized, &destination, self.settings.jpeg_quality)?;
        Ok(ProcessOutcome::Written(destination))
    }

    /// Process every task on a pool of [`ResizeSettings::effective_workers`] threads
    ///
    /// # Errors
    /// Only when the worker pool cannot be created; per-task failures are
    /// counted in the report.
    pub fn process_all(
        &self,
        tasks: &[SplitTask],
        progress: &dyn ProgressReporter,
    ) -> Result<MaterializeReport> {
        let workers = self.settings.effective_workers();
        let _span = spans::materialize(tasks.len(), workers).entered();
        let start = Instant::now();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("resize-{index}"))
            .build()
            .map_err(|e| {
                CurationError::processing_stage_error(
                    "materialize",
                    &format!("Failed to build worker pool: {}", e),
                    Some(&format!("{} workers", workers)),
                )
            })?;

        progress.stage_started(CurationStage::Materialize, Some(tasks.len() as u64));
        let outcomes: Vec<ProcessOutcome> = pool.install(|| {
            tasks
                .par_iter()
                .map(|task| {
                    let outcome = self.process(task);
                    progress.item_completed(CurationStage::Materialize);
                    outcome
                })
                .collect()
        });
        progress.stage_finished(CurationStage::Materialize);

        let mut report = MaterializeReport::default();
        for (task, outcome) in tasks.iter().zip(&outcomes) {
            report.record(task, outcome);
        }

        events::performance_metric("materialize", start.elapsed().as_millis(), tasks.len());
        tracing::info!(
            written = report.written,
            too_small = report.too_small,
            failed = report.failed,
            "Processing complete"
        );
        Ok(report)
    }
}

impl Default for ResizeProcessor {
    fn default() -> Self {
        Self::new(ResizeSettings::default())
    }
}
