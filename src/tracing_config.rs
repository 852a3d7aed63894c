//! Tracing configuration module for structured logging and observability
//!
//! Applications configure the subscriber (see [`TracingConfig::init`]); the
//! library itself only emits events and spans.

#[cfg(feature = "cli")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Configuration for tracing output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable console output with colors (default for CLI)
    Console,
    /// Compact console output without colors for CI environments
    Compact,
    /// JSON structured logging
    #[cfg(feature = "tracing-json")]
    Json,
}

/// Tracing configuration builder
#[derive(Debug)]
pub struct TracingConfig {
    /// Verbosity level (maps to log levels)
    pub verbosity: u8,
    /// Output format
    pub format: TracingFormat,
    /// Environment filter string (overrides verbosity if set)
    pub env_filter: Option<String>,
    /// Session ID for correlation
    pub session_id: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            format: TracingFormat::Console,
            env_filter: None,
            session_id: None,
        }
    }
}

impl TracingConfig {
    /// Create a new tracing configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity level (0-2+)
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set output format
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Set custom environment filter
    #[must_use]
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Set session ID for run correlation
    #[must_use]
    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Convert verbosity level to tracing filter string
    #[must_use]
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Initialize the global tracing subscriber
    ///
    /// `log` records emitted by the library are forwarded through the
    /// subscriber's `tracing-log` bridge.
    #[cfg(feature = "cli")]
    pub fn init(self) -> anyhow::Result<()> {
        use tracing_subscriber::fmt;

        let filter = if let Some(env_filter) = &self.env_filter {
            EnvFilter::try_new(env_filter)?
        } else {
            EnvFilter::try_new(self.verbosity_to_filter())?
        };

        let registry = Registry::default().with(filter);

        match self.format {
            TracingFormat::Console => {
                let fmt_layer = fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_level(true)
                    .compact();

                registry.with(fmt_layer).try_init()?;
            },

            TracingFormat::Compact => {
                let fmt_layer = fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_thread_ids(false)
                    .compact();

                registry.with(fmt_layer).try_init()?;
            },

            #[cfg(feature = "tracing-json")]
            TracingFormat::Json => {
                let fmt_layer = fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true);

                registry.with(fmt_layer).try_init()?;
            },
        }

        if let Some(session_id) = &self.session_id {
            tracing::info!(session_id = %session_id, "Curation session started");
        }

        Ok(())
    }
}

/// Span creation helpers for the curation stages
pub mod spans {
    use tracing::{Level, Span};

    /// Span for the whole run
    pub fn session(session_id: &str, root: &std::path::Path) -> Span {
        tracing::span!(
            Level::INFO,
            "session",
            session_id = %session_id,
            root = %root.display()
        )
    }

    /// Span for one category's acquisition
    pub fn acquisition(category: &str, destination: &std::path::Path) -> Span {
        tracing::span!(
            Level::INFO,
            "acquisition",
            category = %category,
            destination = %destination.display()
        )
    }

    /// Span for one sanitizer pass
    pub fn sanitize_pass(pass: &str, root: &std::path::Path) -> Span {
        tracing::span!(
            Level::INFO,
            "sanitize_pass",
            pass = %pass,
            root = %root.display()
        )
    }

    /// Span for split planning
    pub fn split_planning(leaf_count: usize) -> Span {
        tracing::span!(Level::INFO, "split_planning", leaf_count = %leaf_count)
    }

    /// Span for the parallel resize stage
    pub fn materialize(task_count: usize, workers: usize) -> Span {
        tracing::span!(
            Level::INFO,
            "materialize",
            task_count = %task_count,
            workers = %workers
        )
    }
}

/// Event helpers for common logging patterns
pub mod events {
    use tracing::{debug, error, warn};

    /// Log an error with context
    pub fn error_with_context(error: &dyn std::error::Error, context: &str) {
        error!(error = %error, context = %context, "Operation failed");
    }

    /// Log a retry decision
    pub fn retry_scheduled(operation: &str, attempt: u32, max_attempts: u32, delay_ms: u128) {
        warn!(
            operation = %operation,
            attempt = %attempt,
            max_attempts = %max_attempts,
            delay_ms = %delay_ms,
            "Retrying"
        );
    }

    /// Log performance metrics
    pub fn performance_metric(operation: &str, duration_ms: u128, items: usize) {
        debug!(
            operation = %operation,
            duration_ms = %duration_ms,
            items = %items,
            "Performance metric"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_mapping() {
        assert_eq!(TracingConfig::new().with_verbosity(0).verbosity_to_filter(), "info");
        assert_eq!(TracingConfig::new().with_verbosity(1).verbosity_to_filter(), "debug");
        assert_eq!(TracingConfig::new().with_verbosity(2).verbosity_to_filter(), "trace");
        assert_eq!(TracingConfig::new().with_verbosity(9).verbosity_to_filter(), "trace");
    }

    #[test]
    fn test_config_builder() {
        let config = TracingConfig::new()
            .with_verbosity(1)
            .with_format(TracingFormat::Compact)
            .with_env_filter("dataset_curator=trace")
            .with_session_id("test-session");

        assert_eq!(config.verbosity, 1);
        assert_eq!(config.format, TracingFormat::Compact);
        assert_eq!(config.env_filter.as_deref(), Some("dataset_curator=trace"));
        assert_eq!(config.session_id.as_deref(), Some("test-session"));
    }

    #[test]
    fn test_default_config() {
        let config = TracingConfig::default();
        assert_eq!(config.verbosity, 0);
        assert_eq!(config.format, TracingFormat::Console);
        assert!(config.env_filter.is_none());
        assert!(config.session_id.is_none());
    }

    #[test]
    fn test_spans_without_subscriber() {
        let _guard = spans::sanitize_pass("format", std::path::Path::new("/tmp")).entered();
        let _split = spans::split_planning(3);
        events::performance_metric("noop", 0, 0);
    }
}
