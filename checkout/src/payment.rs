//! Payment hand-off.
//!
//! The checkout only prepares what the payment step needs and forwards it to
//! a [`PaymentGateway`]. The gateway's own protocol is not modelled here.

use crate::error::PaymentError;
use crate::session::ContactDetails;
use crate::types::{Money, TicketCounts};
use chrono::{DateTime, Utc};
use futures::future::{self, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Everything the payment step receives
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Who is paying
    pub contact: ContactDetails,
    /// What they are paying for
    pub counts: TicketCounts,
    /// Discounted total if a discount applied, else the subtotal
    pub final_total: Money,
    /// When the request was built
    pub requested_at: DateTime<Utc>,
}

/// Proof of a completed payment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    /// Gateway transaction reference
    pub reference: String,
    /// Amount charged
    pub amount: Money,
}

/// Payment step progress
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Nothing submitted yet
    #[default]
    Idle,
    /// Waiting for the gateway
    Submitting,
    /// Charged
    Completed(PaymentReceipt),
    /// Rejected; may be submitted again
    Failed(String),
}

impl PaymentStatus {
    /// Whether a submission is in flight
    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        matches!(self, Self::Submitting)
    }

    /// Whether the payment went through
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Payment gateway trait
///
/// Abstraction over payment processors like Stripe, `PayPal`, Apple Pay, etc.
pub trait PaymentGateway: Send + Sync {
    /// Charge `request.final_total`
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError`] if the charge is declined or the gateway is
    /// unreachable.
    fn submit(&self, request: PaymentRequest) -> BoxFuture<'static, Result<PaymentReceipt, PaymentError>>;
}

/// Mock payment gateway for development and testing
///
/// Approves every request unless built with [`MockPaymentGateway::declining`].
/// Submitted requests are recorded.
#[derive(Clone, Debug, Default)]
pub struct MockPaymentGateway {
    decline_reason: Option<String>,
    submissions: Arc<Mutex<Vec<PaymentRequest>>>,
    next_reference: Arc<AtomicU64>,
}

impl MockPaymentGateway {
    /// Gateway approving every payment
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway declining every payment with `reason`
    #[must_use]
    pub fn declining(reason: impl Into<String>) -> Self {
        Self {
            decline_reason: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Shared handle for the environment
    #[must_use]
    pub fn shared(self) -> Arc<dyn PaymentGateway> {
        Arc::new(self)
    }

    /// Every request submitted so far
    #[must_use]
    pub fn submissions(&self) -> Vec<PaymentRequest> {
        self.submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PaymentGateway for MockPaymentGateway {
    fn submit(&self, request: PaymentRequest) -> BoxFuture<'static, Result<PaymentReceipt, PaymentError>> {
        let amount = request.final_total;
        self.submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        let result = match &self.decline_reason {
            Some(reason) => Err(PaymentError::Declined(reason.clone())),
            None => {
                let n = self.next_reference.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(PaymentReceipt {
                    reference: format!("mock_txn_{n:06}"),
                    amount,
                })
            },
        };
        future::ready(result).boxed()
    }
}
