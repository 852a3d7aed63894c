//! Services separating I/O and progress reporting from the curation stages

pub mod io;
pub mod progress;

pub use io::ImageIOService;
pub use progress::{
    ConsoleProgressReporter, CurationStage, NoOpProgressReporter, ProgressReporter,
};
