//! Train/test/valid split planning
//!
//! The processed tree is rebuilt from scratch on every run: the three bucket
//! folders are wiped, then each raw leaf directory is shuffled independently
//! and sliced by the configured ratios. Planning never touches image bytes;
//! [`crate::processor`] executes the resulting tasks.

use crate::catalog::CATS_GROUP_DIR;
use crate::config::{CorpusLayout, SplitRatios, TEST_DIR, TRAIN_DIR, VALID_DIR};
use crate::corpus;
use crate::error::{CurationError, Result};
use crate::services::ImageIOService;
use crate::tracing_config::spans;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One of the three output buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitBucket {
    Train,
    Test,
    Valid,
}

impl SplitBucket {
    pub const ALL: [SplitBucket; 3] = [SplitBucket::Train, SplitBucket::Test, SplitBucket::Valid];

    /// Folder name under the processed root
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            SplitBucket::Train => TRAIN_DIR,
            SplitBucket::Test => TEST_DIR,
            SplitBucket::Valid => VALID_DIR,
        }
    }
}

/// A single image to resize into its bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitTask {
    pub source: PathBuf,
    pub destination_dir: PathBuf,
    pub bucket: SplitBucket,
}

impl SplitTask {
    /// `destination_dir / <source file name>`
    #[must_use]
    pub fn destination_path(&self) -> PathBuf {
        match self.source.file_name() {
            Some(name) => self.destination_dir.join(name),
            None => self.destination_dir.clone(),
        }
    }
}

/// Per-leaf bucket sizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeafSummary {
    pub leaf: PathBuf,
    pub train: usize,
    pub test: usize,
    pub valid: usize,
}

impl LeafSummary {
    #[must_use]
    pub fn total(&self) -> usize {
        self.train + self.test + self.valid
    }
}

/// The full plan for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SplitAssignment {
    pub tasks: Vec<SplitTask>,
    pub leaves: Vec<LeafSummary>,
}

impl SplitAssignment {
    /// Number of tasks routed to `bucket`
    #[must_use]
    pub fn bucket_len(&self, bucket: SplitBucket) -> usize {
        self.tasks.iter().filter(|task| task.bucket == bucket).count()
    }
}

/// Delete `train/`, `test/` and `valid/` under the processed root and recreate them empty
///
/// # Errors
/// When a bucket cannot be removed or recreated.
pub fn reset_processed_dirs(layout: &CorpusLayout) -> Result<()> {
    for bucket in SplitBucket::ALL {
        let dir = layout.bucket_dir(bucket.dir_name());
        if dir.exists() {
            std::fs::remove_dir_all(&dir)
                .map_err(|e| CurationError::file_io_error("remove bucket directory", &dir, &e))?;
            log::info!("Removed existing {} directory", bucket.dir_name());
        }
        ImageIOService::ensure_dir(&dir)?;
    }
    Ok(())
}

/// Every directory strictly below `raw_root` with no subdirectory, sorted
///
/// # Errors
/// When `raw_root` is not a directory.
pub fn discover_leaf_dirs(raw_root: &Path) -> Result<Vec<PathBuf>> {
    if !raw_root.is_dir() {
        return Err(CurationError::file_io_error(
            "discover leaf directories",
            raw_root,
            &std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        ));
    }

    let mut leaves: Vec<PathBuf> = WalkDir::new(raw_root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Skipping unreadable entry under {}: {}", raw_root.display(), e);
                None
            },
        })
        .filter(|entry| entry.file_type().is_dir())
        .map(walkdir::DirEntry::into_path)
        .filter(|dir| !has_subdirectory(dir))
        .collect();

    leaves.sort();
    Ok(leaves)
}

fn has_subdirectory(dir: &Path) -> bool {
    std::fs::read_dir(dir).is_ok_and(|entries| {
        entries
            .filter_map(std::result::Result::ok)
            .any(|entry| entry.file_type().is_ok_and(|kind| kind.is_dir()))
    })
}

/// Where a leaf's images land inside `bucket`
///
/// Leaves whose parent folder is `cats` keep that grouping level.
#[must_use]
pub fn destination_for(layout: &CorpusLayout, leaf: &Path, bucket: SplitBucket) -> PathBuf {
    let bucket_dir = layout.bucket_dir(bucket.dir_name());
    let leaf_name = leaf.file_name().map(PathBuf::from).unwrap_or_default();

    let parent_is_cats = leaf
        .parent()
        .and_then(Path::file_name)
        .is_some_and(|name| name == CATS_GROUP_DIR);

    if parent_is_cats {
        bucket_dir.join(CATS_GROUP_DIR).join(leaf_name)
    } else {
        bucket_dir.join(leaf_name)
    }
}

/// Shuffle each raw leaf and assign its images to buckets
///
/// With `seed` set the plan is reproducible; otherwise every call draws a
/// fresh shuffle. Ratios are used as given. The destination folder of every
/// bucket a leaf contributes to is created here, so it exists even when the
/// resize stage later drops all of its images.
///
/// # Errors
/// When the raw root cannot be enumerated or a destination folder cannot be
/// created. Unreadable leaves are logged and skipped.
pub fn plan_splits(
    layout: &CorpusLayout,
    ratios: &SplitRatios,
    seed: Option<u64>,
) -> Result<SplitAssignment> {
    let leaves = discover_leaf_dirs(&layout.raw_dir())?;
    let _span = spans::split_planning(leaves.len()).entered();

    let mut rng = match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    let mut assignment = SplitAssignment::default();
    for leaf in leaves {
        let mut images = match corpus::list_jpeg_files(&leaf) {
            Ok(images) => images,
            Err(e) => {
                log::warn!("Skipping leaf {}: {}", leaf.display(), e);
                continue;
            },
        };
        images.sort();
        images.shuffle(&mut rng);

        let (train_end, test_end) = ratios.boundaries(images.len());
        let summary = LeafSummary {
            leaf: leaf.clone(),
            train: train_end,
            test: test_end - train_end,
            valid: images.len() - test_end,
        };

        for (bucket, count) in [
            (SplitBucket::Train, summary.train),
            (SplitBucket::Test, summary.test),
            (SplitBucket::Valid, summary.valid),
        ] {
            if count > 0 {
                ImageIOService::ensure_dir(destination_for(layout, &leaf, bucket))?;
            }
        }

        for (index, source) in images.into_iter().enumerate() {
            let bucket = if index < train_end {
                SplitBucket::Train
            } else if index < test_end {
                SplitBucket::Test
            } else {
                SplitBucket::Valid
            };
            assignment.tasks.push(SplitTask {
                source,
                destination_dir: destination_for(layout, &leaf, bucket),
                bucket,
            });
        }

        tracing::debug!(
            leaf = %leaf.display(),
            train = summary.train,
            test = summary.test,
            valid = summary.valid,
            "Leaf split planned"
        );
        assignment.leaves.push(summary);
    }

    tracing::info!(
        leaves = assignment.leaves.len(),
        tasks = assignment.tasks.len(),
        "Split planning complete"
    );
    Ok(assignment)
}
