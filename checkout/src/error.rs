//! Error types for the checkout flow.
//!
//! Only payment errors ever reach the user. Everything else is recovered
//! where it happens and logged.

use std::time::Duration;
use thiserror::Error;

/// Session state could not be obtained from its provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The provider had no session to give
    #[error("No checkout session available")]
    Missing,

    /// The provider failed while building the session
    #[error("Session provider failed: {0}")]
    Provider(String),
}

/// The price catalog could not be fetched
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceFetchError {
    /// A single attempt took longer than the configured timeout
    #[error("Price fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The pricing service could not be reached
    #[error("Pricing service unavailable: {0}")]
    Unavailable(String),

    /// The catalog document could not be parsed
    #[error("Malformed price catalog: {0}")]
    Malformed(String),
}

impl PriceFetchError {
    /// Whether retrying could help
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Unavailable(_))
    }
}

/// A referral code could not be turned into a discount
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscountError {
    /// No such referral code
    #[error("Unknown referral code: {0}")]
    UnknownCode(String),

    /// The code exists but no longer applies
    #[error("Referral code {0} has expired")]
    Expired(String),

    /// The discount service could not be reached
    #[error("Discount service unavailable: {0}")]
    Unavailable(String),
}

/// Payment submission failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// Nothing to charge
    #[error("Cannot submit a payment for a zero total")]
    ZeroTotal,

    /// A referral discount is still being resolved for the current total
    #[error("Discount is still being applied, try again in a moment")]
    DiscountPending,

    /// The gateway declined the charge
    #[error("Payment declined: {0}")]
    Declined(String),

    /// The gateway could not be reached
    #[error("Payment gateway unavailable: {0}")]
    Unavailable(String),
}

/// Invalid checkout configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A duration that must be positive is zero
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    /// The tick interval is longer than the reservation window
    #[error("Tick interval {tick:?} exceeds reservation window {window:?}")]
    TickExceedsWindow {
        /// Configured tick interval
        tick: Duration,
        /// Configured reservation window
        window: Duration,
    },

    /// The exit path is not an absolute route
    #[error("Exit path must start with '/': {0}")]
    InvalidExitPath(String),
}
