//! Corpus sanitizer
//!
//! Three independent passes that clean a corpus in place by deleting files:
//!
//! 1. [`remove_non_jpeg_files`] drops everything whose name is not `.jpg`/`.jpeg`
//! 2. [`remove_invalid_images`] drops images that fail to decode
//! 3. [`remove_duplicate_images`] drops byte-identical copies
//!
//! No pass renames or moves anything and each is a no-op on a clean corpus.
//! A file that cannot be deleted is logged and counted; it never stops the pass.

use crate::corpus;
use crate::error::Result;
use crate::services::{CurationStage, ImageIOService, ProgressReporter};
use crate::tracing_config::spans;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Outcome of a single sanitizer pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Files looked at
    pub examined: usize,
    /// Files deleted
    pub removed: Vec<PathBuf>,
    /// Files that should have been deleted (or hashed) but could not be
    pub failures: usize,
}

impl PassReport {
    fn delete(&mut self, path: PathBuf, reason: &str) {
        match ImageIOService::remove_file(&path) {
            Ok(()) => {
                log::info!("Deleted {} ({})", path.display(), reason);
                self.removed.push(path);
            },
            Err(e) => {
                log::error!("Error deleting {}: {}", path.display(), e);
                self.failures += 1;
            },
        }
    }
}

/// Combined outcome of the three passes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SanitizeReport {
    pub format: PassReport,
    pub validity: PassReport,
    pub duplicates: PassReport,
}

impl SanitizeReport {
    /// Total number of deleted files across passes
    #[must_use]
    pub fn total_removed(&self) -> usize {
        self.format.removed.len() + self.validity.removed.len() + self.duplicates.removed.len()
    }
}

/// Delete every file under `root` whose name does not match the JPEG pattern
///
/// # Errors
/// Only when `root` itself cannot be enumerated.
pub fn remove_non_jpeg_files(root: &Path) -> Result<PassReport> {
    let _span = spans::sanitize_pass("format", root).entered();
    let mut report = PassReport::default();

    for path in corpus::list_files(root)? {
        report.examined += 1;
        if !corpus::is_jpeg_file_name(&path) {
            report.delete(path, "invalid image format");
        }
    }

    tracing::info!(
        examined = report.examined,
        removed = report.removed.len(),
        "Format filter complete"
    );
    Ok(report)
}

/// Decode every JPEG-named file under `root` and delete the ones that fail
///
/// # Errors
/// Only when `root` itself cannot be enumerated.
pub fn remove_invalid_images(root: &Path) -> Result<PassReport> {
    let _span = spans::sanitize_pass("validity", root).entered();
    let images = corpus::list_jpeg_files(root)?;

    let failed: Vec<PathBuf> = images
        .iter()
        .filter(|path| match ImageIOService::verify_image(path) {
            Ok(()) => false,
            Err(e) => {
                log::warn!("Invalid image {}: {}", path.display(), e);
                true
            },
        })
        .cloned()
        .collect();

    tracing::info!(failed = failed.len(), "Image verification complete");

    let mut report = PassReport {
        examined: images.len(),
        ..PassReport::default()
    };
    for path in failed {
        report.delete(path, "failed to decode");
    }
    Ok(report)
}

/// Delete JPEG-named files under `root` whose contents duplicate an earlier file
///
/// Files are visited in sorted traversal order and the first copy is kept.
///
/// # Errors
/// Only when `root` itself cannot be enumerated.
pub fn remove_duplicate_images(root: &Path) -> Result<PassReport> {
    let _span = spans::sanitize_pass("duplicates", root).entered();
    let mut report = PassReport::default();
    let mut seen_hashes = HashSet::new();

    for path in corpus::list_jpeg_files(root)? {
        report.examined += 1;
        let hash = match ImageIOService::content_hash(&path) {
            Ok(hash) => hash,
            Err(e) => {
                log::warn!("Could not hash {}: {}", path.display(), e);
                report.failures += 1;
                continue;
            },
        };

        if !seen_hashes.insert(hash) {
            report.delete(path, "duplicate image");
        }
    }

    tracing::info!(
        examined = report.examined,
        removed = report.removed.len(),
        "Duplicate filter complete"
    );
    Ok(report)
}

/// Run the three passes in order over `root`
///
/// A pass whose root cannot be enumerated is logged and left empty in the
/// report; the remaining passes still run.
pub fn sanitize_corpus(root: &Path, progress: &dyn ProgressReporter) -> SanitizeReport {
    type Pass = fn(&Path) -> Result<PassReport>;
    let passes: [(CurationStage, Pass); 3] = [
        (CurationStage::FormatFilter, remove_non_jpeg_files),
        (CurationStage::ValidityFilter, remove_invalid_images),
        (CurationStage::DuplicateFilter, remove_duplicate_images),
    ];

    let mut results = passes.into_iter().map(|(stage, pass)| {
        progress.stage_started(stage, None);
        let report = pass(root).unwrap_or_else(|e| {
            log::error!("{} failed for {}: {}", stage.description(), root.display(), e);
            PassReport::default()
        });
        progress.stage_finished(stage);
        report
    });

    SanitizeReport {
        format: results.next().unwrap_or_default(),
        validity: results.next().unwrap_or_default(),
        duplicates: results.next().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::NoOpProgressReporter;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::fs;
    use tempfile::TempDir;

    fn write_jpeg(path: &Path, shade: u8) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(24, 24, Rgb([shade, shade, 255 - shade])))
            .save_with_format(path, image::ImageFormat::Jpeg)
            .unwrap();
    }

    #[test]
    fn test_format_filter_keeps_only_jpeg_names() {
        let temp_dir = TempDir::new().unwrap();
        let leaf = temp_dir.path().join("cats/Bengal");
        fs::create_dir_all(&leaf).unwrap();
        fs::write(leaf.join("a.jpg"), b"x").unwrap();
        fs::write(leaf.join("b.JPEG"), b"x").unwrap();
        fs::write(leaf.join("c.png"), b"x").unwrap();
        fs::write(leaf.join("d.gif"), b"x").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), b"x").unwrap();

        let report = remove_non_jpeg_files(temp_dir.path()).unwrap();
        assert_eq!(report.examined, 5);
        assert_eq!(report.removed.len(), 3);
        assert_eq!(report.failures, 0);

        for path in corpus::list_files(temp_dir.path()).unwrap() {
            assert!(corpus::is_jpeg_file_name(&path));
        }

        // Name-only: garbage with a .jpg name survives this pass
        assert!(leaf.join("a.jpg").exists());

        let second = remove_non_jpeg_files(temp_dir.path()).unwrap();
        assert!(second.removed.is_empty());
    }

    #[test]
    fn test_validity_filter_deletes_undecodable() {
        let temp_dir = TempDir::new().unwrap();
        let leaf = temp_dir.path().join("not-a-pet/trees");
        write_jpeg(&leaf.join("ok.jpg"), 10);
        fs::write(leaf.join("renamed_text.jpg"), b"hello, not a jpeg").unwrap();
        fs::write(leaf.join("empty.jpeg"), b"").unwrap();

        let report = remove_invalid_images(temp_dir.path()).unwrap();
        assert_eq!(report.examined, 3);
        assert_eq!(report.removed.len(), 2);

        for path in corpus::list_jpeg_files(temp_dir.path()).unwrap() {
            assert!(ImageIOService::verify_image(&path).is_ok());
        }
        assert!(leaf.join("ok.jpg").exists());
    }

    #[test]
    fn test_duplicate_filter_keeps_first_copy() {
        let temp_dir = TempDir::new().unwrap();
        let persian = temp_dir.path().join("cats/Persian");
        let siamese = temp_dir.path().join("cats/Siamese");
        write_jpeg(&persian.join("a.jpg"), 30);
        fs::copy(persian.join("a.jpg"), persian.join("b.jpg")).unwrap();
        fs::create_dir_all(&siamese).unwrap();
        fs::copy(persian.join("a.jpg"), siamese.join("c.jpg")).unwrap();
        write_jpeg(&persian.join("unique.jpg"), 200);

        let report = remove_duplicate_images(temp_dir.path()).unwrap();
        assert_eq!(report.examined, 4);
        assert_eq!(report.removed.len(), 2);
        assert!(persian.join("a.jpg").exists());
        assert!(persian.join("unique.jpg").exists());

        let hashes: Vec<String> = corpus::list_jpeg_files(temp_dir.path())
            .unwrap()
            .iter()
            .map(|p| ImageIOService::content_hash(p).unwrap())
            .collect();
        let unique: HashSet<&String> = hashes.iter().collect();
        assert_eq!(unique.len(), hashes.len());

        let second = remove_duplicate_images(temp_dir.path()).unwrap();
        assert!(second.removed.is_empty());
        assert_eq!(second.examined, 2);
    }

    #[test]
    fn test_sanitize_corpus_runs_all_passes() {
        let temp_dir = TempDir::new().unwrap();
        let leaf = temp_dir.path().join("cats/Manx");
        write_jpeg(&leaf.join("1.jpg"), 1);
        fs::copy(leaf.join("1.jpg"), leaf.join("2.jpg")).unwrap();
        fs::write(leaf.join("3.jpg"), b"broken").unwrap();
        fs::write(leaf.join("4.webp"), b"x").unwrap();

        let report = sanitize_corpus(temp_dir.path(), &NoOpProgressReporter);
        assert_eq!(report.format.removed.len(), 1);
        assert_eq!(report.validity.removed.len(), 1);
        assert_eq!(report.duplicates.removed.len(), 1);
        assert_eq!(report.total_removed(), 3);

        let again = sanitize_corpus(temp_dir.path(), &NoOpProgressReporter);
        assert_eq!(again.total_removed(), 0);
    }

    #[test]
    fn test_failed_deletion_does_not_stop_the_pass() {
        let temp_dir = TempDir::new().unwrap();
        let vanished = temp_dir.path().join("vanished.png");
        let present = temp_dir.path().join("present.png");
        fs::write(&present, b"x").unwrap();

        let mut report = PassReport::default();
        report.delete(vanished, "invalid image format");
        report.delete(present.clone(), "invalid image format");

        assert_eq!(report.failures, 1);
        assert_eq!(report.removed, vec![present.clone()]);
        assert!(!present.exists());
    }

    #[test]
    fn test_sanitize_missing_root_is_not_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let report = sanitize_corpus(&temp_dir.path().join("absent"), &NoOpProgressReporter);
        assert_eq!(report, SanitizeReport::default());
    }
}
