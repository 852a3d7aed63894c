//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::Cli;
use crate::config::{AcquisitionSettings, CurationConfig, RunPlan, SplitRatios};
use anyhow::{Context, Result};
use std::time::Duration;

/// Convert CLI arguments to a [`CurationConfig`]
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the run configuration from CLI arguments
    pub(crate) fn from_cli(cli: &Cli) -> Result<CurationConfig> {
        let plan = RunPlan {
            download_other_images: cli.download_others,
            download_cat_images: cli.download_cats,
            sanitize: !cli.skip_sanitize,
            split_and_resize: !cli.skip_split,
        };

        let acquisition = AcquisitionSettings {
            target_count: cli.target_count,
            required_count: cli.required_count,
            max_retries: cli.max_retries,
            retry_delay: Duration::from_secs(cli.retry_delay),
        };

        CurationConfig::builder()
            .root(cli.root.clone())
            .ratios(SplitRatios::new(cli.train, cli.test, cli.valid))
            .target_size(cli.size, cli.size)
            .min_size(cli.min_size, cli.min_size)
            .jpeg_quality(cli.jpeg_quality)
            .workers(cli.workers)
            .seed(cli.seed)
            .acquisition(acquisition)
            .plan(plan)
            .build()
            .context("Invalid configuration")
    }

    /// Validate CLI arguments that the configuration builder does not see
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if cli.download_concurrency == 0 {
            anyhow::bail!("--download-concurrency must be at least 1");
        }

        if cli.root.exists() && !cli.root.is_dir() {
            anyhow::bail!(
                "Dataset root exists and is a file, not a directory: {}",
                cli.root.display()
            );
        }

        if !cli.download_cats && !cli.download_others && !cli.root.exists() {
            log::warn!(
                "Dataset root {} does not exist and no downloads are enabled",
                cli.root.display()
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["dataset-curator"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_cli_config_conversion() {
        let cli = parse(&[
            "--root",
            "/tmp/pets",
            "--download-others",
            "--skip-split",
            "--size",
            "224",
            "--min-size",
            "64",
            "--jpeg-quality",
            "90",
            "--retry-delay",
            "1",
            "--seed",
            "11",
        ]);
        let config = CliConfigBuilder::from_cli(&cli).unwrap();

        assert_eq!(config.layout.root, PathBuf::from("/tmp/pets"));
        assert!(config.plan.download_other_images);
        assert!(!config.plan.download_cat_images);
        assert!(config.plan.sanitize);
        assert!(!config.plan.split_and_resize);
        assert_eq!(config.resize.target_width, 224);
        assert_eq!(config.resize.min_height, 64);
        assert_eq!(config.resize.jpeg_quality, 90);
        assert_eq!(config.acquisition.retry_delay, Duration::from_secs(1));
        assert_eq!(config.seed, Some(11));
    }

    #[test]
    fn test_defaults_match_library_defaults() {
        let config = CliConfigBuilder::from_cli(&parse(&[])).unwrap();
        let defaults = CurationConfig::default();
        assert_eq!(config.ratios, defaults.ratios);
        assert_eq!(config.resize, defaults.resize);
        assert_eq!(config.acquisition, defaults.acquisition);
        assert_eq!(config.plan, defaults.plan);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(CliConfigBuilder::from_cli(&parse(&["--target-count", "1000"])).is_err());
        assert!(CliConfigBuilder::from_cli(&parse(&["--train", "1.5"])).is_err());
        assert!(CliConfigBuilder::from_cli(&parse(&["--max-retries", "0"])).is_err());
        assert!(CliConfigBuilder::from_cli(&parse(&["--jpeg-quality", "0"])).is_err());
    }

    #[test]
    fn test_cli_validation() {
        assert!(CliConfigBuilder::validate_cli(&parse(&[])).is_ok());
        assert!(CliConfigBuilder::validate_cli(&parse(&["--download-concurrency", "0"])).is_err());

        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_string_lossy().to_string();
        assert!(CliConfigBuilder::validate_cli(&parse(&["--root", &path])).is_err());
    }
}
