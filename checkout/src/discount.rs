//! Referral discounts.
//!
//! A discount is resolved asynchronously from a referral code and the total it
//! applies to. That pair is the request's signature: when either changes, a
//! fresh resolution starts and any result for an older signature is dropped,
//! however late it arrives.

use crate::error::DiscountError;
use crate::types::{DiscountRate, Money};
use checkout_core::effect::EffectId;
use futures::future::{self, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Id under which discount resolutions run; a new one aborts the old one
pub const DISCOUNT_EFFECT: EffectId = EffectId::new("checkout.discount");

/// Validates referral codes
pub trait DiscountService: Send + Sync {
    /// Resolve `code` against `original_total`
    ///
    /// # Errors
    ///
    /// Returns [`DiscountError`] if the code does not grant a discount or the
    /// service is unreachable.
    fn resolve(
        &self,
        code: &str,
        original_total: Money,
    ) -> BoxFuture<'static, Result<DiscountRate, DiscountError>>;
}

/// In-memory table of referral codes. Codes match case-insensitively.
#[derive(Clone, Debug, Default)]
pub struct ReferralTable {
    codes: Arc<HashMap<String, DiscountRate>>,
}

impl ReferralTable {
    /// Empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns this table with `code` granting `rate`
    #[must_use]
    pub fn with_code(self, code: &str, rate: DiscountRate) -> Self {
        let mut codes = Arc::unwrap_or_clone(self.codes);
        codes.insert(normalize(code), rate);
        Self {
            codes: Arc::new(codes),
        }
    }
}

impl DiscountService for ReferralTable {
    fn resolve(
        &self,
        code: &str,
        _original_total: Money,
    ) -> BoxFuture<'static, Result<DiscountRate, DiscountError>> {
        let result = self
            .codes
            .get(&normalize(code))
            .copied()
            .ok_or_else(|| DiscountError::UnknownCode(code.to_string()));
        future::ready(result).boxed()
    }
}

fn normalize(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Inputs a discount resolution was computed from
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscountRequest {
    /// Referral code, trimmed
    pub referral_code: String,
    /// Total the discount applies to
    pub original_total: Money,
}

impl DiscountRequest {
    /// Request for `code` against `original_total`
    #[must_use]
    pub fn new(code: &str, original_total: Money) -> Self {
        Self {
            referral_code: code.trim().to_string(),
            original_total,
        }
    }

    /// Whether no code was entered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.referral_code.is_empty()
    }
}

/// What to do after the discount inputs were re-read
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiscountDecision {
    /// Inputs changed; start resolving this request
    Resolve(DiscountRequest),
    /// The code was cleared; abort anything in flight, keep totals as they are
    Clear,
    /// Same inputs as before; nothing to do
    Unchanged,
}

/// Tracks which discount request is current and which one the applied
/// discount was resolved for
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountResolver {
    current: Option<DiscountRequest>,
    applied: Option<DiscountRequest>,
    pending: bool,
}

impl DiscountResolver {
    /// Compare the latest inputs with the current request
    pub fn evaluate(&mut self, code: &str, original_total: Money) -> DiscountDecision {
        let request = DiscountRequest::new(code, original_total);

        if request.is_empty() {
            self.pending = false;
            return match self.current.take() {
                Some(_) => DiscountDecision::Clear,
                None => DiscountDecision::Unchanged,
            };
        }

        if self.current.as_ref() == Some(&request) {
            return DiscountDecision::Unchanged;
        }

        self.current = Some(request.clone());
        self.pending = true;
        DiscountDecision::Resolve(request)
    }

    fn settle(&mut self, request: &DiscountRequest) -> bool {
        if self.current.as_ref() == Some(request) {
            self.pending = false;
            true
        } else {
            false
        }
    }

    /// Accept a discount granted for `request` if it is still current.
    ///
    /// Returns `false` for a stale result, which must be discarded.
    pub fn accept(&mut self, request: &DiscountRequest) -> bool {
        let current = self.settle(request);
        if current {
            self.applied = Some(request.clone());
        }
        current
    }

    /// Accept a rejection of `request` if it is still current. A current
    /// rejection withdraws any previously applied discount.
    ///
    /// Returns `false` for a stale result, which must be discarded.
    pub fn reject(&mut self, request: &DiscountRequest) -> bool {
        let current = self.settle(request);
        if current {
            self.applied = None;
        }
        current
    }

    /// Whether the applied discount was granted for exactly `code` and
    /// `original_total`. An empty code never matches.
    #[must_use]
    pub fn applies_to(&self, code: &str, original_total: Money) -> bool {
        let request = DiscountRequest::new(code, original_total);
        !request.is_empty() && self.applied.as_ref() == Some(&request)
    }

    /// The request results are currently accepted for
    #[must_use]
    pub const fn current(&self) -> Option<&DiscountRequest> {
        self.current.as_ref()
    }

    /// Whether a resolution for the current request has not come back yet
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending
    }
}
