//! Prometheus metrics for the Store and the checkout flow.
//!
//! Metrics are recorded through the `metrics` facade everywhere; this module
//! only installs a Prometheus recorder and registers descriptions.
//!
//! ```rust,no_run
//! use checkout_runtime::metrics::MetricsRecorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let recorder = MetricsRecorder::install()?;
//! // ... run the checkout ...
//! println!("{}", recorder.render());
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Installed Prometheus recorder
#[derive(Clone)]
pub struct MetricsRecorder {
    handle: PrometheusHandle,
}

impl MetricsRecorder {
    /// Install the global Prometheus recorder and describe all metrics.
    ///
    /// # Errors
    ///
    /// Returns an error if the exporter cannot be built or a recorder is
    /// already installed.
    pub fn install() -> Result<Self, MetricsError> {
        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.000_01, 0.000_1, 0.001, 0.01, 0.1, 1.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        let handle = builder
            .install_recorder()
            .map_err(|e| MetricsError::Install(e.to_string()))?;

        register_metrics();
        tracing::debug!("Prometheus recorder installed");

        Ok(Self { handle })
    }

    /// Render current metrics in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl std::fmt::Debug for MetricsRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRecorder").finish_non_exhaustive()
    }
}

fn register_metrics() {
    describe_counter!("store.commands.total", "Actions sent to the store");
    describe_histogram!(
        "store.reducer.duration_seconds",
        "Time spent inside the reducer per action"
    );
    describe_counter!("store.effects.executed", "Effects executed, by type");
    describe_counter!(
        "store.effects.cancelled",
        "Cancellable effects aborted, by reason"
    );
    describe_counter!(
        "store.shutdown.rejected_actions",
        "Actions rejected because the store was shutting down"
    );
    describe_counter!(
        "checkout.prices.fallback",
        "Price catalog fetches that fell back to an empty catalog"
    );
    describe_counter!(
        "checkout.discount.stale_discarded",
        "Discount results dropped because their inputs changed"
    );
    describe_counter!("checkout.discount.applied", "Discounts applied to a session");
    describe_counter!(
        "checkout.session.fallback",
        "Sessions started from default state after provider failure"
    );
    describe_counter!(
        "checkout.timer.expired",
        "Reservation windows that ran out on the contact step"
    );
    describe_counter!("checkout.payment.submitted", "Payment submissions, by outcome");
}
