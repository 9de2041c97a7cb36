//! Prometheus metrics for interaction runs.
//!
//! The pipeline records through the `metrics` facade; nothing is exported
//! until a recorder is installed. [`MetricsExporter`] installs the
//! Prometheus recorder and renders the scrape text.
//!
//! # Example
//!
//! ```rust,no_run
//! use composable_interactions_runtime::metrics::MetricsExporter;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut exporter = MetricsExporter::new();
//! exporter.install()?;
//!
//! // ... run interactions ...
//!
//! if let Some(text) = exporter.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Counter of finished `run` calls, labelled by form and outcome
pub const RUNS_TOTAL: &str = "interaction_runs_total";

/// Counter of runs that stopped at validation, labelled by form
pub const VALIDATION_FAILURES_TOTAL: &str = "interaction_validation_failures_total";

/// Histogram of business-logic duration, labelled by form
pub const EXECUTE_DURATION_SECONDS: &str = "interaction_execute_duration_seconds";

/// Errors from metrics installation.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build the exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install the recorder
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// How a `run` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Empty input with `wait_for_input` set
    Waiting,
    /// The instance had already executed
    Repeated,
    /// Validation failed
    Invalid,
    /// A `beforeExecute` handler stopped execution
    Cancelled,
    /// Executed without errors
    Succeeded,
    /// Executed, but errors were recorded
    Failed,
    /// The business logic raised
    Error,
}

impl Outcome {
    /// Label value used on [`RUNS_TOTAL`]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Repeated => "repeated",
            Self::Invalid => "invalid",
            Self::Cancelled => "cancelled",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Installs the Prometheus recorder and renders scrape output.
#[derive(Default)]
pub struct MetricsExporter {
    handle: Option<PrometheusHandle>,
}

impl MetricsExporter {
    /// Exporter with no recorder installed yet
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Describe the interaction metrics and install the global recorder.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Build`] if the bucket configuration is
    /// rejected, or [`MetricsError::Install`] if installation fails for a
    /// reason other than a recorder already being present.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Interaction metrics recorder installed");
                Ok(())
            },
            Err(e) => {
                let message = e.to_string();
                if message.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping");
                    Ok(())
                } else {
                    Err(MetricsError::Install(message))
                }
            },
        }
    }

    /// Prometheus text for every recorded metric, once installed
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

impl fmt::Debug for MetricsExporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsExporter")
            .field("installed", &self.handle.is_some())
            .finish()
    }
}

/// Register descriptions for the interaction metrics.
pub fn register_metrics() {
    describe_counter!(RUNS_TOTAL, "Total number of interaction runs by outcome");
    describe_counter!(
        VALIDATION_FAILURES_TOTAL,
        "Total number of interaction runs rejected by validation"
    );
    describe_histogram!(
        EXECUTE_DURATION_SECONDS,
        "Time spent in interaction business logic"
    );
}

pub(crate) fn record_run(form: &'static str, outcome: Outcome) {
    counter!(RUNS_TOTAL, "form" => form, "outcome" => outcome.as_str()).increment(1);
}

pub(crate) fn record_validation_failure(form: &'static str) {
    counter!(VALIDATION_FAILURES_TOTAL, "form" => form).increment(1);
}

pub(crate) fn record_execute_duration(form: &'static str, duration: Duration) {
    histogram!(EXECUTE_DURATION_SECONDS, "form" => form).record(duration.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(Outcome::Succeeded.as_str(), "succeeded");
        assert_eq!(Outcome::Invalid.to_string(), "invalid");
    }

    #[test]
    fn test_render_before_install() {
        let exporter = MetricsExporter::new();
        assert!(exporter.render().is_none());
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_run("Checkout", Outcome::Waiting);
        record_validation_failure("Checkout");
        record_execute_duration("Checkout", Duration::from_millis(3));
    }
}
