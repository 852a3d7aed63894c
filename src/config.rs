//! Configuration types for dataset curation runs
//!
//! Every tunable of a run lives in one immutable [`CurationConfig`] that is
//! built once at process start and handed to the pipeline driver. Defaults
//! reproduce the values the dataset was originally prepared with.

use crate::catalog::{self, Category};
use crate::error::{CurationError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// The search collaborator refuses single requests at or above this many results
pub const SEARCH_CEILING: usize = 1000;

/// Names of the split buckets under the processed root
pub const TRAIN_DIR: &str = "train";
pub const TEST_DIR: &str = "test";
pub const VALID_DIR: &str = "valid";

/// On-disk layout of the raw and processed corpora
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusLayout {
    /// Dataset root (`inputs` by default)
    pub root: PathBuf,
}

impl Default for CorpusLayout {
    fn default() -> Self {
        Self {
            root: PathBuf::from("inputs"),
        }
    }
}

impl CorpusLayout {
    #[must_use]
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// `<root>/raw`
    #[must_use]
    pub fn raw_dir(&self) -> PathBuf {
        self.root.join("raw")
    }

    /// `<root>/processed`
    #[must_use]
    pub fn processed_dir(&self) -> PathBuf {
        self.root.join("processed")
    }

    /// `<root>/processed/<bucket>`
    #[must_use]
    pub fn bucket_dir(&self, bucket_name: &str) -> PathBuf {
        self.processed_dir().join(bucket_name)
    }
}

/// Train/test/valid fractions
///
/// Expected to sum to 1.0; the planner does not enforce it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitRatios {
    pub train: f64,
    pub test: f64,
    pub valid: f64,
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.8,
            test: 0.1,
            valid: 0.1,
        }
    }
}

impl SplitRatios {
    #[must_use]
    pub fn new(train: f64, test: f64, valid: f64) -> Self {
        Self { train, test, valid }
    }

    /// Slice boundaries for `n` shuffled items: `[0, train_end)` is train,
    /// `[train_end, test_end)` is test and the remainder is valid.
    #[must_use]
    pub fn boundaries(&self, n: usize) -> (usize, usize) {
        let total = n as f64;
        let train_end = ((self.train * total) as usize).min(n);
        let test_end = (((self.train + self.test) * total) as usize).clamp(train_end, n);
        (train_end, test_end)
    }

    /// Check every fraction is within `[0, 1]`
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("train ratio", self.train),
            ("test ratio", self.test),
            ("valid ratio", self.valid),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CurationError::config_value_error(
                    name,
                    value,
                    "0.0-1.0",
                    None,
                ));
            }
        }

        let sum = self.train + self.test + self.valid;
        if (sum - 1.0).abs() > 1e-6 {
            tracing::warn!(
                train = self.train,
                test = self.test,
                valid = self.valid,
                sum,
                "Split ratios do not sum to 1.0; the valid bucket absorbs the remainder"
            );
        }

        Ok(())
    }
}

/// Resize-and-materialize settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeSettings {
    pub target_width: u32,
    pub target_height: u32,
    /// Images narrower than this are dropped
    pub min_width: u32,
    /// Images shorter than this are dropped
    pub min_height: u32,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// Worker pool size (0 = one per available CPU core)
    pub workers: usize,
}

impl Default for ResizeSettings {
    fn default() -> Self {
        Self {
            target_width: 460,
            target_height: 460,
            min_width: 100,
            min_height: 100,
            jpeg_quality: 75,
            workers: 0,
        }
    }
}

impl ResizeSettings {
    /// Worker count with `0` resolved to the available parallelism
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1)
        }
    }
}

/// Image acquisition settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionSettings {
    /// Maximum number of images pulled per category (below [`SEARCH_CEILING`])
    pub target_count: usize,
    /// A category folder holding more entries than this is left alone
    pub required_count: usize,
    /// Total attempts per category
    pub max_retries: u32,
    /// Fixed pause between attempts
    pub retry_delay: Duration,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            target_count: 900,
            required_count: 800,
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
        }
    }
}

/// Which stages a run executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunPlan {
    pub download_other_images: bool,
    pub download_cat_images: bool,
    pub sanitize: bool,
    pub split_and_resize: bool,
}

impl Default for RunPlan {
    fn default() -> Self {
        Self {
            download_other_images: false,
            download_cat_images: false,
            sanitize: true,
            split_and_resize: true,
        }
    }
}

/// Complete, immutable configuration of a curation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurationConfig {
    pub layout: CorpusLayout,
    pub ratios: SplitRatios,
    pub resize: ResizeSettings,
    pub acquisition: AcquisitionSettings,
    pub plan: RunPlan,
    /// Shuffle seed; `None` draws a fresh split every run
    pub seed: Option<u64>,
    pub cat_breeds: Vec<Category>,
    pub other_types: Vec<Category>,
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            layout: CorpusLayout::default(),
            ratios: SplitRatios::default(),
            resize: ResizeSettings::default(),
            acquisition: AcquisitionSettings::default(),
            plan: RunPlan::default(),
            seed: None,
            cat_breeds: catalog::cat_breeds(),
            other_types: catalog::other_types(),
        }
    }
}

impl CurationConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    /// ```rust
    /// use dataset_curator::CurationConfig;
    ///
    /// let config = CurationConfig::builder()
    ///     .root("inputs")
    ///     .seed(Some(42))
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.resize.target_width, 460);
    /// ```
    #[must_use]
    pub fn builder() -> CurationConfigBuilder {
        CurationConfigBuilder::default()
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - A split ratio outside `[0, 1]`
    /// - `target_count` of zero or at/above [`SEARCH_CEILING`]
    /// - `max_retries` of zero
    /// - A zero target dimension
    /// - JPEG quality outside 1-100
    pub fn validate(&self) -> Result<()> {
        self.ratios.validate()?;

        let acquisition = &self.acquisition;
        if acquisition.target_count == 0 || acquisition.target_count >= SEARCH_CEILING {
            return Err(CurationError::config_value_error(
                "target count",
                acquisition.target_count,
                &format!("1-{}", SEARCH_CEILING - 1),
                Some(900),
            ));
        }

        if acquisition.max_retries == 0 {
            return Err(CurationError::config_value_error(
                "max retries",
                acquisition.max_retries,
                "1 or more",
                Some(3),
            ));
        }

        let resize = &self.resize;
        if resize.target_width == 0 || resize.target_height == 0 {
            return Err(CurationError::invalid_config(format!(
                "Resize target must be non-zero, got {}x{}",
                resize.target_width, resize.target_height
            )));
        }

        if resize.jpeg_quality == 0 || resize.jpeg_quality > 100 {
            return Err(CurationError::config_value_error(
                "JPEG quality",
                resize.jpeg_quality,
                "1-100",
                Some(75),
            ));
        }

        Ok(())
    }
}

/// Builder for [`CurationConfig`]
#[derive(Debug, Default)]
pub struct CurationConfigBuilder {
    config: CurationConfig,
}

impl CurationConfigBuilder {
    /// Set the dataset root
    #[must_use]
    pub fn root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.config.layout = CorpusLayout::new(root);
        self
    }

    #[must_use]
    pub fn ratios(mut self, ratios: SplitRatios) -> Self {
        self.config.ratios = ratios;
        self
    }

    #[must_use]
    pub fn target_size(mut self, width: u32, height: u32) -> Self {
        self.config.resize.target_width = width;
        self.config.resize.target_height = height;
        self
    }

    #[must_use]
    pub fn min_size(mut self, width: u32, height: u32) -> Self {
        self.config.resize.min_width = width;
        self.config.resize.min_height = height;
        self
    }

    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.resize.jpeg_quality = quality;
        self
    }

    /// Set the resize worker count (0 = auto)
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.resize.workers = workers;
        self
    }

    #[must_use]
    pub fn acquisition(mut self, acquisition: AcquisitionSettings) -> Self {
        self.config.acquisition = acquisition;
        self
    }

    #[must_use]
    pub fn plan(mut self, plan: RunPlan) -> Self {
        self.config.plan = plan;
        self
    }

    #[must_use]
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.config.seed = seed;
        self
    }

    #[must_use]
    pub fn cat_breeds(mut self, breeds: Vec<Category>) -> Self {
        self.config.cat_breeds = breeds;
        self
    }

    #[must_use]
    pub fn other_types(mut self, others: Vec<Category>) -> Self {
        self.config.other_types = others;
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    /// Any error from [`CurationConfig::validate`]
    pub fn build(self) -> Result<CurationConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
