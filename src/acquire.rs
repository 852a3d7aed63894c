//! Image acquisition
//!
//! Fills one raw category folder per call: search for the category, download
//! the results, and retry the pair a fixed number of times on failure. Folders
//! that already hold enough images are left untouched.

use crate::catalog::Category;
use crate::config::AcquisitionSettings;
use crate::corpus;
use crate::download::ImageFetcher;
use crate::error::CurationError;
use crate::search::ImageSearch;
use crate::services::{CurationStage, ProgressReporter};
use crate::tracing_config::{events, spans};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::Instrument;

/// What happened to one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AcquisitionOutcome {
    /// The folder already held more than the required number of entries
    Skipped { existing: usize },
    /// Search and download succeeded on attempt `attempts`
    Downloaded { count: usize, attempts: u32 },
    /// Every attempt failed
    Abandoned { attempts: u32, last_error: String },
}

/// Outcome of one category within [`Acquirer::acquire_all`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryAcquisition {
    pub label: String,
    pub outcome: AcquisitionOutcome,
}

/// Search-and-download driver
pub struct Acquirer {
    search: Arc<dyn ImageSearch>,
    fetcher: Arc<dyn ImageFetcher>,
    settings: AcquisitionSettings,
}

impl Acquirer {
    #[must_use]
    pub fn new(
        search: Arc<dyn ImageSearch>,
        fetcher: Arc<dyn ImageFetcher>,
        settings: AcquisitionSettings,
    ) -> Self {
        Self {
            search,
            fetcher,
            settings,
        }
    }

    /// Populate `destination` with images of `category`
    ///
    /// Never fails: errors are logged and reported through the outcome.
    pub async fn acquire(&self, category: &Category, destination: &Path) -> AcquisitionOutcome {
        let existing = corpus::count_entries(destination);
        if existing > self.settings.required_count {
            log::info!(
                "Skipping {} as it already has more than {} images.",
                category.label,
                self.settings.required_count
            );
            return AcquisitionOutcome::Skipped { existing };
        }

        let query = category.search_query();
        let max_attempts = self.settings.max_retries.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            log::info!(
                "Downloading images for {} (attempt {}/{})",
                category.label,
                attempt,
                max_attempts
            );

            match self.attempt(&query, destination).await {
                Ok(count) => {
                    return AcquisitionOutcome::Downloaded {
                        count,
                        attempts: attempt,
                    };
                },
                Err(e) => {
                    log::error!("Error downloading images for {}: {}", category.label, e);
                    if attempt >= max_attempts {
                        log::error!(
                            "Failed to download images for {} after {} attempts.",
                            category.label,
                            max_attempts
                        );
                        return AcquisitionOutcome::Abandoned {
                            attempts: attempt,
                            last_error: e.to_string(),
                        };
                    }
                    events::retry_scheduled(
                        &category.label,
                        attempt,
                        max_attempts,
                        self.settings.retry_delay.as_millis(),
                    );
                    tokio::time::sleep(self.settings.retry_delay).await;
                },
            }
        }
    }

    async fn attempt(&self, query: &str, destination: &Path) -> Result<usize, CurationError> {
        let urls = self
            .search
            .search(query, self.settings.target_count)
            .await?;
        self.fetcher
            .fetch(&urls, destination, self.settings.target_count)
            .await
    }

    /// Acquire every category in label order, one at a time
    pub async fn acquire_all(
        &self,
        categories: &[Category],
        raw_root: &Path,
        progress: &dyn ProgressReporter,
    ) -> Vec<CategoryAcquisition> {
        let mut ordered: Vec<&Category> = categories.iter().collect();
        ordered.sort_by(|a, b| a.label.cmp(&b.label));

        progress.stage_started(CurationStage::Acquisition, Some(ordered.len() as u64));
        let mut results = Vec::with_capacity(ordered.len());
        for category in ordered {
            let destination = category.raw_dir(raw_root);
            log::info!(
                "Preparing to download {} images to {}",
                category.label,
                destination.display()
            );

            let span = spans::acquisition(&category.label, &destination);
            let outcome = self.acquire(category, &destination).instrument(span).await;
            progress.item_completed(CurationStage::Acquisition);

            results.push(CategoryAcquisition {
                label: category.label.clone(),
                outcome,
            });
        }
        progress.stage_finished(CurationStage::Acquisition);

        results
    }
}
