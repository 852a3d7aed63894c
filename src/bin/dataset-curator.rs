//! Dataset curation CLI tool
//!
//! Command-line interface for acquiring, sanitizing, splitting and resizing an
//! image classification dataset with the dataset-curator library.

#[cfg(feature = "cli")]
use dataset_curator::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
