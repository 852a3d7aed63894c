//! Error handling and edge case testing
//!
//! Boundary conditions of configuration, empty or odd corpora, and failures
//! of the network collaborators.

use async_trait::async_trait;
use dataset_curator::{
    curate_local, split, AcquisitionOutcome, AcquisitionSettings, Acquirer, Category,
    CategoryGroup, CorpusLayout, CurationConfig, CurationError, ImageFetcher, ImageSearch,
    NoOpProgressReporter, ResizeProcessor, ResizeSettings, Result, SplitBucket, SplitRatios,
    SplitTask,
};
use dataset_curator::config::SEARCH_CEILING;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_config_validation_edge_cases() -> Result<()> {
    // Largest allowed pull count
    let config = CurationConfig::builder()
        .acquisition(AcquisitionSettings {
            target_count: SEARCH_CEILING - 1,
            ..AcquisitionSettings::default()
        })
        .build()?;
    assert_eq!(config.acquisition.target_count, 999);

    // Quality bounds
    assert!(CurationConfig::builder().jpeg_quality(1).build().is_ok());
    assert!(CurationConfig::builder().jpeg_quality(100).build().is_ok());
    let error = CurationConfig::builder().jpeg_quality(101).build().unwrap_err();
    assert!(error.to_string().contains("JPEG quality"));
    assert!(error.to_string().contains("101"));

    // Ratios that do not sum to one are accepted (with a warning)
    assert!(CurationConfig::builder()
        .ratios(SplitRatios::new(0.5, 0.1, 0.1))
        .build()
        .is_ok());

    let error = CurationConfig::builder()
        .ratios(SplitRatios::new(0.8, f64::NAN, 0.1))
        .build()
        .unwrap_err();
    assert!(matches!(error, CurationError::InvalidConfig(_)));

    Ok(())
}

#[test]
fn test_empty_leaf_produces_no_tasks() {
    let temp_dir = TempDir::new().unwrap();
    let layout = CorpusLayout::new(temp_dir.path());
    std::fs::create_dir_all(layout.raw_dir().join("cats/Lykoi")).unwrap();

    let assignment = split::plan_splits(&layout, &SplitRatios::default(), Some(1)).unwrap();
    assert!(assignment.tasks.is_empty());
    assert_eq!(assignment.leaves.len(), 1);
    assert_eq!(assignment.leaves[0].total(), 0);
}

#[test]
fn test_single_image_goes_to_valid() {
    let temp_dir = TempDir::new().unwrap();
    let layout = CorpusLayout::new(temp_dir.path());
    let leaf = layout.raw_dir().join("cats/Toyger");
    std::fs::create_dir_all(&leaf).unwrap();
    std::fs::write(leaf.join("only.jpg"), b"x").unwrap();

    let assignment = split::plan_splits(&layout, &SplitRatios::default(), None).unwrap();
    assert_eq!(assignment.tasks.len(), 1);
    assert_eq!(assignment.tasks[0].bucket, SplitBucket::Valid);
}

#[test]
fn test_files_directly_under_group_dirs_are_not_split() {
    let temp_dir = TempDir::new().unwrap();
    let layout = CorpusLayout::new(temp_dir.path());
    let cats = layout.raw_dir().join("cats");
    std::fs::create_dir_all(cats.join("Persian")).unwrap();
    std::fs::write(cats.join("stray.jpg"), b"x").unwrap();
    std::fs::write(cats.join("Persian/a.jpg"), b"x").unwrap();

    let assignment = split::plan_splits(&layout, &SplitRatios::default(), Some(0)).unwrap();
    let sources: Vec<&PathBuf> = assignment.tasks.iter().map(|t| &t.source).collect();
    assert_eq!(sources, vec![&cats.join("Persian/a.jpg")]);
}

#[test]
fn test_uppercase_extensions_are_collected() {
    let temp_dir = TempDir::new().unwrap();
    let layout = CorpusLayout::new(temp_dir.path());
    let leaf = layout.raw_dir().join("not-a-pet/boats");
    std::fs::create_dir_all(&leaf).unwrap();
    std::fs::write(leaf.join("x.JPG"), b"x").unwrap();
    std::fs::write(leaf.join("y.jpeg"), b"x").unwrap();

    let assignment = split::plan_splits(&layout, &SplitRatios::default(), Some(0)).unwrap();
    assert_eq!(assignment.tasks.len(), 2);
    for task in &assignment.tasks {
        assert!(task.destination_dir.ends_with("boats"));
        assert!(!task.destination_dir.to_string_lossy().contains("not-a-pet"));
    }
}

#[test]
fn test_processor_missing_source_fails_gracefully() {
    let temp_dir = TempDir::new().unwrap();
    let task = SplitTask {
        source: temp_dir.path().join("vanished.jpg"),
        destination_dir: temp_dir.path().join("processed/train/cars"),
        bucket: SplitBucket::Train,
    };

    let report = ResizeProcessor::new(ResizeSettings::default())
        .process_all(&[task], &NoOpProgressReporter)
        .unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.written, 0);
}

#[test]
fn test_local_run_on_missing_root_reports_error() {
    let temp_dir = TempDir::new().unwrap();
    let config = CurationConfig::builder()
        .root(temp_dir.path().join("never-created"))
        .build()
        .unwrap();

    let report = curate_local(&config, &NoOpProgressReporter);
    assert_eq!(report.errors.len(), 1);
    assert!(report.materialize.is_none());
}

struct FailingSearch;

#[async_trait]
impl ImageSearch for FailingSearch {
    async fn search(&self, query: &str, _limit: usize) -> Result<Vec<String>> {
        Err(CurationError::search(format!("No vqd token for query '{}'", query)))
    }
}

struct EmptySearch;

#[async_trait]
impl ImageSearch for EmptySearch {
    async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Refuses every download
struct RefusingFetcher;

#[async_trait]
impl ImageFetcher for RefusingFetcher {
    async fn fetch(&self, urls: &[String], destination: &Path, _limit: usize) -> Result<usize> {
        if urls.is_empty() {
            return Ok(0);
        }
        Err(CurationError::network_error(
            format!("No images could be downloaded into {}", destination.display()),
            "403 Forbidden",
        ))
    }
}

fn quick_settings() -> AcquisitionSettings {
    AcquisitionSettings {
        retry_delay: Duration::ZERO,
        ..AcquisitionSettings::default()
    }
}

#[tokio::test]
async fn test_search_failure_abandons_after_all_attempts() {
    let temp_dir = TempDir::new().unwrap();
    let acquirer = Acquirer::new(Arc::new(FailingSearch), Arc::new(RefusingFetcher), quick_settings());
    let category = Category::new("Snowshoe", CategoryGroup::Cats);

    let outcome = acquirer
        .acquire(&category, &category.raw_dir(temp_dir.path()))
        .await;
    match outcome {
        AcquisitionOutcome::Abandoned { attempts, last_error } => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("Snowshoe cat"));
        },
        other => panic!("expected Abandoned, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_search_result_is_not_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let acquirer = Acquirer::new(Arc::new(EmptySearch), Arc::new(RefusingFetcher), quick_settings());

    let outcome = acquirer
        .acquire(
            &Category::new("cars", CategoryGroup::NotAPet),
            &temp_dir.path().join("cars"),
        )
        .await;
    assert_eq!(outcome, AcquisitionOutcome::Downloaded { count: 0, attempts: 1 });
}

#[tokio::test]
async fn test_one_failing_category_does_not_stop_the_rest() {
    let temp_dir = TempDir::new().unwrap();
    let acquirer = Acquirer::new(Arc::new(FailingSearch), Arc::new(RefusingFetcher), quick_settings());
    let categories = vec![
        Category::new("sea", CategoryGroup::NotAPet),
        Category::new("boats", CategoryGroup::NotAPet),
    ];

    let results = acquirer
        .acquire_all(&categories, temp_dir.path(), &NoOpProgressReporter)
        .await;
    assert_eq!(results.len(), 2);
    assert!(results
        .iter()
        .all(|r| matches!(r.outcome, AcquisitionOutcome::Abandoned { .. })));
}
