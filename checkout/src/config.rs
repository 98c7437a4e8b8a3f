//! Configuration for the checkout flow.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::error::ConfigError;
use checkout_runtime::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Route the user is sent to when backing out of ticket selection
pub const DEFAULT_EXIT_PATH: &str = "/tickets";

/// Checkout configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// How long tickets stay reserved while contact details are entered
    pub reservation_window: Duration,
    /// Granularity of the reservation countdown
    pub tick_interval: Duration,
    /// Upper bound for a single price catalog fetch attempt
    pub price_fetch_timeout: Duration,
    /// Retries after the first failed price fetch
    pub price_fetch_retries: usize,
    /// Delay before the first retry, doubled for each further retry
    pub retry_initial_delay: Duration,
    /// Route for leaving the checkout
    pub exit_path: String,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            reservation_window: Duration::from_secs(600),
            tick_interval: Duration::from_secs(1),
            price_fetch_timeout: Duration::from_secs(10),
            price_fetch_retries: 2,
            retry_initial_delay: Duration::from_millis(500),
            exit_path: DEFAULT_EXIT_PATH.to_string(),
        }
    }
}

impl CheckoutConfig {
    /// Load configuration from `CHECKOUT_*` environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `CHECKOUT_RESERVATION_SECS` | 600 |
    /// | `CHECKOUT_TICK_MILLIS` | 1000 |
    /// | `CHECKOUT_PRICE_FETCH_TIMEOUT_SECS` | 10 |
    /// | `CHECKOUT_PRICE_FETCH_RETRIES` | 2 |
    /// | `CHECKOUT_RETRY_DELAY_MILLIS` | 500 |
    /// | `CHECKOUT_EXIT_PATH` | `/tickets` |
    ///
    /// Unparseable values fall back to the default.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());

        Self {
            reservation_window: parsed("CHECKOUT_RESERVATION_SECS")
                .map_or(defaults.reservation_window, Duration::from_secs),
            tick_interval: parsed("CHECKOUT_TICK_MILLIS")
                .map_or(defaults.tick_interval, Duration::from_millis),
            price_fetch_timeout: parsed("CHECKOUT_PRICE_FETCH_TIMEOUT_SECS")
                .map_or(defaults.price_fetch_timeout, Duration::from_secs),
            price_fetch_retries: lookup("CHECKOUT_PRICE_FETCH_RETRIES")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.price_fetch_retries),
            retry_initial_delay: parsed("CHECKOUT_RETRY_DELAY_MILLIS")
                .map_or(defaults.retry_initial_delay, Duration::from_millis),
            exit_path: lookup("CHECKOUT_EXIT_PATH").unwrap_or(defaults.exit_path),
        }
    }

    /// Check the configuration for values the checkout cannot run with
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for zero durations, a tick longer than the
    /// reservation window, or a relative exit path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reservation_window.is_zero() {
            return Err(ConfigError::ZeroDuration("reservation_window"));
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("tick_interval"));
        }
        if self.price_fetch_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("price_fetch_timeout"));
        }
        if self.tick_interval > self.reservation_window {
            return Err(ConfigError::TickExceedsWindow {
                tick: self.tick_interval,
                window: self.reservation_window,
            });
        }
        if !self.exit_path.starts_with('/') {
            return Err(ConfigError::InvalidExitPath(self.exit_path.clone()));
        }
        Ok(())
    }

    /// Retry policy for price catalog fetches
    #[must_use]
    pub fn price_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(self.price_fetch_retries)
            .initial_delay(self.retry_initial_delay)
            .max_delay(self.price_fetch_timeout)
            .jitter(true)
            .build()
    }
}
