//! Checkout session state.
//!
//! [`CheckoutSession`] is the single source of truth for what the user has
//! entered. It is created once per pass through the checkout and mutated only
//! through its setters, whether the change comes from the user or from a
//! resolved async fetch.
//!
//! Session state comes from a [`SessionProvider`]. If the provider fails, the
//! flow carries on in degraded mode with [`CheckoutSession::default()`].

use crate::error::SessionError;
use crate::types::{DiscountRate, Money, PriceCatalog, TicketCounts, Tier};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Contact details
// ============================================================================

/// What the user typed into the contact form
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDetails {
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Email address
    pub email: String,
    /// Phone number, free-form
    pub phone: String,
    /// Referral code; empty means no discount requested
    pub referral_code: String,
}

/// A field of [`ContactDetails`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContactField {
    /// First name
    FirstName,
    /// Last name
    LastName,
    /// Email address
    Email,
    /// Phone number
    Phone,
    /// Referral code
    ReferralCode,
}

impl ContactField {
    /// Field name as used by the form
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::ReferralCode => "referralCode",
        }
    }
}

impl fmt::Display for ContactField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Currently invalid fields and why. An absent field is valid or unchecked.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<ContactField, String>);

impl ValidationErrors {
    /// No errors
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `field` invalid
    pub fn insert(&mut self, field: ContactField, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    /// Message for `field`, if it is invalid
    #[must_use]
    pub fn get(&self, field: ContactField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    /// Whether `field` is invalid
    #[must_use]
    pub fn contains(&self, field: ContactField) -> bool {
        self.0.contains_key(&field)
    }

    /// Whether every field is valid
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of invalid fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Invalid fields in form order
    pub fn iter(&self) -> impl Iterator<Item = (ContactField, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }
}

// ============================================================================
// Session
// ============================================================================

/// Everything the user has entered during one pass through the checkout
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    ticket_counts: TicketCounts,
    contact_details: ContactDetails,
    errors: ValidationErrors,
    discounted_total: Option<Money>,
    discount_amount: Money,
}

/// Where the session state came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionOrigin {
    /// Built by the session provider
    Provided,
    /// Provider failed; running on default state
    Fallback,
}

/// Source of session state at checkout entry
pub trait SessionProvider: Send + Sync {
    /// Build the session for a new pass through the checkout
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if no session can be built.
    fn provide(&self) -> Result<CheckoutSession, SessionError>;
}

/// Starts every checkout empty
#[derive(Clone, Copy, Debug, Default)]
pub struct FreshSession;

impl SessionProvider for FreshSession {
    fn provide(&self) -> Result<CheckoutSession, SessionError> {
        Ok(CheckoutSession::default())
    }
}

/// Starts the checkout with tickets picked on the listing page
#[derive(Clone, Copy, Debug, Default)]
pub struct PreselectedSession {
    counts: TicketCounts,
}

impl PreselectedSession {
    /// Provider seeding the given counts
    #[must_use]
    pub const fn new(counts: TicketCounts) -> Self {
        Self { counts }
    }
}

impl SessionProvider for PreselectedSession {
    fn provide(&self) -> Result<CheckoutSession, SessionError> {
        let mut session = CheckoutSession::default();
        session.set_ticket_counts(self.counts);
        Ok(session)
    }
}

/// Sum of count × price over every tier. A tier missing from the catalog adds nothing.
#[must_use]
pub fn derive_subtotal(counts: &TicketCounts, prices: &PriceCatalog) -> Money {
    Tier::ALL
        .into_iter()
        .map(|tier| prices.price(tier).saturating_mul(counts.get(tier)))
        .sum()
}

impl CheckoutSession {
    /// Obtain session state from `provider`, falling back to defaults on failure.
    ///
    /// Never fails: a provider error is logged and the canonical default
    /// session is used instead.
    pub fn initialize(provider: &dyn SessionProvider) -> (Self, SessionOrigin) {
        match provider.provide() {
            Ok(session) => (session, SessionOrigin::Provided),
            Err(error) => {
                tracing::warn!(%error, "Session provider failed, continuing with default session");
                metrics::counter!("checkout.session.fallback").increment(1);
                (Self::default(), SessionOrigin::Fallback)
            },
        }
    }

    /// Selected ticket quantities
    #[must_use]
    pub const fn ticket_counts(&self) -> &TicketCounts {
        &self.ticket_counts
    }

    /// Contact form contents
    #[must_use]
    pub const fn contact_details(&self) -> &ContactDetails {
        &self.contact_details
    }

    /// Current validation errors
    #[must_use]
    pub const fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Total after the last applied discount, if one was applied
    #[must_use]
    pub const fn discounted_total(&self) -> Option<Money> {
        self.discounted_total
    }

    /// Amount taken off by the last applied discount
    #[must_use]
    pub const fn discount_amount(&self) -> Money {
        self.discount_amount
    }

    /// Subtotal of the current counts at `prices`
    #[must_use]
    pub fn subtotal(&self, prices: &PriceCatalog) -> Money {
        derive_subtotal(&self.ticket_counts, prices)
    }

    /// Replace the ticket counts
    pub const fn set_ticket_counts(&mut self, counts: TicketCounts) {
        self.ticket_counts = counts;
    }

    /// Replace the contact details
    pub fn set_contact_details(&mut self, details: ContactDetails) {
        self.contact_details = details;
    }

    /// Replace the validation errors
    pub fn set_errors(&mut self, errors: ValidationErrors) {
        self.errors = errors;
    }

    /// Record a resolved discount.
    ///
    /// `discounted_total` is stored as given; the discount amount is `rate`
    /// of `subtotal`, which is zero whenever the subtotal is zero.
    pub fn apply_discount(&mut self, discounted_total: Money, rate: DiscountRate, subtotal: Money) {
        self.discounted_total = Some(discounted_total);
        self.discount_amount = rate.of(subtotal);
    }

    /// Drop the applied discount
    pub const fn clear_discount(&mut self) {
        self.discounted_total = None;
        self.discount_amount = Money::ZERO;
    }

    /// The discounted total when present, else `subtotal`
    #[must_use]
    pub fn final_total(&self, subtotal: Money) -> Money {
        self.discounted_total.unwrap_or(subtotal)
    }
}
