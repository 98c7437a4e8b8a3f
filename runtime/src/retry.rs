//! Bounded retries with exponential backoff.
//!
//! Effects that call flaky collaborators (the price catalog fetch) wrap the
//! call in [`retry_with_predicate`]. Only errors the caller marks as
//! transient are retried; anything else fails on the spot.
//!
//! # Example
//!
//! ```rust
//! use checkout_runtime::retry::{retry_with_predicate, RetryPolicy};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), String> {
//! let policy = RetryPolicy::builder()
//!     .max_retries(2)
//!     .initial_delay(Duration::from_millis(100))
//!     .build();
//!
//! let prices = retry_with_predicate(
//!     "price catalog fetch",
//!     policy,
//!     || async { Ok::<_, String>(42) },
//!     |err: &String| err.starts_with("503"),
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;
use tokio::time::sleep;

/// How often and how patiently to retry.
///
/// Delay before retry `n` (0-indexed) is
/// `min(initial_delay * multiplier^n, max_delay)`, scaled into `[50%, 100%]`
/// when `jitter` is on.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: usize,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
    /// Randomise each delay to spread out concurrent retries
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryPolicy {
    /// Builder starting from 3 retries, 100ms initial delay, 30s cap,
    /// doubling, no jitter
    #[must_use]
    pub const fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder {
            policy: Self {
                max_retries: 3,
                initial_delay: Duration::from_millis(100),
                max_delay: Duration::from_secs(30),
                multiplier: 2.0,
                jitter: false,
            },
        }
    }

    /// Delay before retry number `retry` (0-indexed)
    #[must_use]
    pub fn delay_for_retry(&self, retry: usize) -> Duration {
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let exponent = retry.min(64) as i32;
        let cap = self.max_delay.as_secs_f64();
        let mut secs = (self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent)).min(cap);

        if self.jitter {
            use rand::Rng;
            secs *= rand::thread_rng().gen_range(0.5..=1.0);
        }

        Duration::from_secs_f64(secs)
    }
}

/// Builder for [`RetryPolicy`]
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    policy: RetryPolicy,
}

impl RetryPolicyBuilder {
    /// Retries after the first attempt
    #[must_use]
    pub const fn max_retries(mut self, max_retries: usize) -> Self {
        self.policy.max_retries = max_retries;
        self
    }

    /// Delay before the first retry
    #[must_use]
    pub const fn initial_delay(mut self, delay: Duration) -> Self {
        self.policy.initial_delay = delay;
        self
    }

    /// Upper bound for any single delay
    #[must_use]
    pub const fn max_delay(mut self, delay: Duration) -> Self {
        self.policy.max_delay = delay;
        self
    }

    /// Growth factor between consecutive delays
    #[must_use]
    pub const fn multiplier(mut self, multiplier: f64) -> Self {
        self.policy.multiplier = multiplier;
        self
    }

    /// Randomise delays
    #[must_use]
    pub const fn jitter(mut self, jitter: bool) -> Self {
        self.policy.jitter = jitter;
        self
    }

    /// Finish building
    #[must_use]
    pub fn build(self) -> RetryPolicy {
        self.policy
    }
}

/// Run `operation` until it succeeds, fails with an error `is_transient`
/// rejects, or `policy.max_retries` retries are spent.
///
/// `label` names the operation in logs.
///
/// # Errors
///
/// Returns the first non-transient error, or the error of the final attempt.
pub async fn retry_with_predicate<F, Fut, T, E, P>(
    label: &'static str,
    policy: RetryPolicy,
    mut operation: F,
    is_transient: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut retries = 0;

    loop {
        let err = match operation().await {
            Ok(value) => {
                if retries > 0 {
                    tracing::info!(operation = label, retries, "Succeeded after retrying");
                }
                return Ok(value);
            },
            Err(err) => err,
        };

        if !is_transient(&err) {
            tracing::warn!(operation = label, error = %err, "Permanent failure, not retrying");
            return Err(err);
        }
        if retries >= policy.max_retries {
            tracing::warn!(operation = label, retries, error = %err, "Giving up");
            return Err(err);
        }

        let delay = policy.delay_for_retry(retries);
        tracing::debug!(
            operation = label,
            retry = retries + 1,
            delay_ms = delay.as_millis(),
            error = %err,
            "Transient failure, backing off"
        );
        sleep(delay).await;
        retries += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(
        calls: &Arc<AtomicUsize>,
        succeed_on: usize,
    ) -> impl FnMut() -> std::future::Ready<Result<usize, String>> {
        let calls = Arc::clone(calls);
        move || {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(if call >= succeed_on {
                Ok(call)
            } else {
                Err(format!("503 on call {call}"))
            })
        }
    }

    fn always_transient(_: &String) -> bool {
        true
    }

    #[test]
    fn delays_double_up_to_the_cap() {
        let policy = RetryPolicy::builder()
            .initial_delay(Duration::from_millis(500))
            .max_delay(Duration::from_secs(3))
            .build();

        assert_eq!(policy.delay_for_retry(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for_retry(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for_retry(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for_retry(3), Duration::from_secs(3));
        assert_eq!(policy.delay_for_retry(40), Duration::from_secs(3));
    }

    #[test]
    fn jitter_keeps_delay_between_half_and_full() {
        let policy = RetryPolicy::builder()
            .initial_delay(Duration::from_millis(400))
            .multiplier(1.0)
            .jitter(true)
            .build();

        for retry in 0..20 {
            let delay = policy.delay_for_retry(retry);
            assert!(delay >= Duration::from_millis(200), "{delay:?}");
            assert!(delay <= Duration::from_millis(400), "{delay:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_until_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = RetryPolicy::builder().max_retries(3).build();

        let result =
            retry_with_predicate("test", policy, counting(&calls, 2), always_transient).await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_with_last_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = RetryPolicy::builder().max_retries(2).build();

        let result =
            retry_with_predicate("test", policy, counting(&calls, usize::MAX), always_transient)
                .await;

        assert_eq!(result, Err("503 on call 2".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));

        let result = retry_with_predicate(
            "test",
            RetryPolicy::default(),
            counting(&calls, usize::MAX),
            |err: &String| !err.starts_with("503"),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
