//! Progress reporting service
//!
//! This module separates progress reporting concerns from the stage logic,
//! allowing different frontends to implement their own progress handling.

use std::sync::atomic::{AtomicU64, Ordering};

/// Stages of a curation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurationStage {
    /// Searching and downloading images per category
    Acquisition,
    /// Deleting files whose names are not JPEG
    FormatFilter,
    /// Deleting images that fail to decode
    ValidityFilter,
    /// Deleting byte-identical copies
    DuplicateFilter,
    /// Resetting the processed tree and assigning images to buckets
    SplitPlanning,
    /// Resizing and writing the processed corpus
    Materialize,
}

impl CurationStage {
    /// Get a human-readable description of the stage
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            CurationStage::Acquisition => "Acquiring images",
            CurationStage::FormatFilter => "Removing non-JPEG files",
            CurationStage::ValidityFilter => "Verifying images",
            CurationStage::DuplicateFilter => "Removing duplicate images",
            CurationStage::SplitPlanning => "Planning train/test/valid split",
            CurationStage::Materialize => "Resizing and saving images",
        }
    }
}

/// Trait for reporting progress during a curation run
///
/// Implementations must be callable from the resize worker pool.
pub trait ProgressReporter: Send + Sync {
    /// A stage begins; `total` is the number of items when known
    fn stage_started(&self, stage: CurationStage, total: Option<u64>);

    /// One item of the current stage finished (successfully or not)
    fn item_completed(&self, stage: CurationStage);

    /// A stage ends
    fn stage_finished(&self, stage: CurationStage);
}

/// No-op progress reporter that discards all progress updates
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn stage_started(&self, _stage: CurationStage, _total: Option<u64>) {}

    fn item_completed(&self, _stage: CurationStage) {}

    fn stage_finished(&self, _stage: CurationStage) {}
}

/// Console progress reporter that logs stage boundaries and periodic item counts
pub struct ConsoleProgressReporter {
    log_every: u64,
    completed: AtomicU64,
}

impl ConsoleProgressReporter {
    /// Create a reporter that logs every `log_every` completed items (0 = never)
    #[must_use]
    pub fn new(log_every: u64) -> Self {
        Self {
            log_every,
            completed: AtomicU64::new(0),
        }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn stage_started(&self, stage: CurationStage, total: Option<u64>) {
        self.completed.store(0, Ordering::Relaxed);
        match total {
            Some(total) => log::info!("▶ {} ({} items)", stage.description(), total),
            None => log::info!("▶ {}", stage.description()),
        }
    }

    fn item_completed(&self, stage: CurationStage) {
        let done = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        if self.log_every > 0 && done % self.log_every == 0 {
            log::info!("  {}: {} done", stage.description(), done);
        }
    }

    fn stage_finished(&self, stage: CurationStage) {
        log::info!(
            "✔ {} finished ({} items)",
            stage.description(),
            self.completed.load(Ordering::Relaxed)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingReporter {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl ProgressReporter for RecordingReporter {
        fn stage_started(&self, stage: CurationStage, total: Option<u64>) {
            self.events
                .lock()
                .unwrap()
                .push(format!("start {:?} {:?}", stage, total));
        }

        fn item_completed(&self, stage: CurationStage) {
            self.events.lock().unwrap().push(format!("item {:?}", stage));
        }

        fn stage_finished(&self, stage: CurationStage) {
            self.events.lock().unwrap().push(format!("end {:?}", stage));
        }
    }

    #[test]
    fn test_stage_descriptions_are_distinct() {
        let stages = [
            CurationStage::Acquisition,
            CurationStage::FormatFilter,
            CurationStage::ValidityFilter,
            CurationStage::DuplicateFilter,
            CurationStage::SplitPlanning,
            CurationStage::Materialize,
        ];
        let mut descriptions: Vec<&str> = stages.iter().map(CurationStage::description).collect();
        descriptions.sort_unstable();
        descriptions.dedup();
        assert_eq!(descriptions.len(), stages.len());
    }

    #[test]
    fn test_reporter_as_trait_object() {
        let reporter = RecordingReporter::default();
        let events = Arc::clone(&reporter.events);
        let dyn_reporter: &dyn ProgressReporter = &reporter;

        dyn_reporter.stage_started(CurationStage::Materialize, Some(2));
        dyn_reporter.item_completed(CurationStage::Materialize);
        dyn_reporter.item_completed(CurationStage::Materialize);
        dyn_reporter.stage_finished(CurationStage::Materialize);

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], "start Materialize Some(2)");
        assert_eq!(events[3], "end Materialize");
    }

    #[test]
    fn test_console_reporter_counts() {
        let reporter = ConsoleProgressReporter::new(2);
        reporter.stage_started(CurationStage::Materialize, Some(3));
        for _ in 0..3 {
            reporter.item_completed(CurationStage::Materialize);
        }
        assert_eq!(reporter.completed.load(Ordering::Relaxed), 3);
        reporter.stage_started(CurationStage::DuplicateFilter, None);
        assert_eq!(reporter.completed.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_noop_reporter() {
        let reporter = NoOpProgressReporter;
        reporter.stage_started(CurationStage::Acquisition, None);
        reporter.item_completed(CurationStage::Acquisition);
        reporter.stage_finished(CurationStage::Acquisition);
    }
}
