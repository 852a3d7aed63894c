//! Error types for dataset curation operations

use thiserror::Error;

/// Result type alias for dataset curation operations
pub type Result<T> = std::result::Result<T, CurationError>;

/// Error types for dataset curation operations
///
/// Stage drivers never let these escape for a single file or category: they
/// are logged and counted at the stage boundary instead.
#[derive(Error, Debug)]
pub enum CurationError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decode or encode errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Transport or HTTP status errors from the search or download collaborator
    #[error("Network error: {0}")]
    Network(String),

    /// Search provider protocol errors (missing token, malformed payload)
    #[error("Search error: {0}")]
    Search(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Stage-level processing errors
    #[error("Processing error: {0}")]
    Processing(String),
}

impl CurationError {
    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new search provider error
    pub fn search<S: Into<String>>(msg: S) -> Self {
        Self::Search(msg.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create network error with context
    pub fn network_error<S: Into<String>, E: std::fmt::Display>(context: S, error: E) -> Self {
        Self::Network(format!("{}: {}", context.into(), error))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Create processing error with stage context
    pub fn processing_stage_error(stage: &str, details: &str, input_info: Option<&str>) -> Self {
        let input_context = match input_info {
            Some(info) => format!(" (input: {})", info),
            None => String::new(),
        };

        Self::Processing(format!(
            "Processing failed at stage '{}'{}: {}",
            stage, input_context, details
        ))
    }
}
