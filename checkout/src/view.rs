//! What the host renders.
//!
//! [`render`] turns a [`CheckoutState`] into plain, serialisable props for the
//! active step view and the summary panel. Views send their callbacks back
//! as [`CheckoutAction`](crate::orchestrator::CheckoutAction)s; nothing here
//! holds on to the session.

use crate::orchestrator::CheckoutState;
use crate::payment::PaymentStatus;
use crate::session::{ContactDetails, ValidationErrors};
use crate::types::{Money, PriceCatalog, Step, TicketCounts, Tier};
use serde::Serialize;

/// Placeholder text shown until prices resolve
pub const LOADING_MESSAGE: &str = "Loading ticket prices...";

/// Full checkout screen
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutScreen {
    /// Step shown in the progress indicator
    pub progress: Step,
    /// Content of the step area
    pub active: ActiveStep,
    /// Order summary panel
    pub summary: SummaryView,
}

/// Content of the step area
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "camelCase")]
pub enum ActiveStep {
    /// Prices still loading; no step view is mounted
    Loading {
        /// Placeholder text
        message: &'static str,
    },
    /// Step 1
    TicketSelection(TicketSelectionProps),
    /// Step 2
    ContactEntry(ContactEntryProps),
    /// Step 3
    Payment(PaymentProps),
}

impl ActiveStep {
    /// Step whose view is mounted, if any
    #[must_use]
    pub const fn step(&self) -> Option<Step> {
        match self {
            Self::Loading { .. } => None,
            Self::TicketSelection(_) => Some(Step::TicketSelection),
            Self::ContactEntry(_) => Some(Step::ContactEntry),
            Self::Payment(_) => Some(Step::Payment),
        }
    }
}

/// Ticket selection view input
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketSelectionProps {
    /// Current prices
    pub prices: PriceCatalog,
    /// Selected quantities
    pub counts: TicketCounts,
}

/// Contact entry view input
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactEntryProps {
    /// Form contents
    pub contact_details: ContactDetails,
    /// Inline errors
    pub errors: ValidationErrors,
    /// Reservation time left, `MM:SS`
    pub formatted_time_remaining: String,
}

/// Payment view input
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentProps {
    /// Who is paying
    pub contact_details: ContactDetails,
    /// What they are paying for
    pub ticket_counts: TicketCounts,
    /// Amount charged
    pub final_total: Money,
    /// Submission progress
    pub status: PaymentStatus,
}

/// One tier in the summary
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryLine {
    /// Tier
    pub tier: Tier,
    /// Display name
    pub label: &'static str,
    /// Quantity
    pub count: u32,
    /// Price per ticket
    pub unit_price: Money,
    /// `count * unit_price`
    pub line_total: Money,
}

/// Read-only order summary
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryView {
    /// Tiers with at least one ticket, in display order
    pub lines: Vec<SummaryLine>,
    /// Sum of line totals
    pub subtotal: Money,
    /// Taken off by the applied discount
    pub discount_amount: Money,
    /// Total after discount, if one applied
    pub discounted_total: Option<Money>,
    /// What the payment step charges
    pub total: Money,
}

/// Build the screen for `state`
#[must_use]
pub fn render(state: &CheckoutState) -> CheckoutScreen {
    CheckoutScreen {
        progress: state.step,
        active: active_step(state),
        summary: summary(state),
    }
}

fn active_step(state: &CheckoutState) -> ActiveStep {
    if state.prices.is_loading() {
        return ActiveStep::Loading {
            message: LOADING_MESSAGE,
        };
    }

    let session = &state.session;
    match state.step {
        Step::TicketSelection => ActiveStep::TicketSelection(TicketSelectionProps {
            prices: state.prices.catalog().clone(),
            counts: *session.ticket_counts(),
        }),
        Step::ContactEntry => ActiveStep::ContactEntry(ContactEntryProps {
            contact_details: session.contact_details().clone(),
            errors: session.errors().clone(),
            formatted_time_remaining: state.time_remaining(),
        }),
        Step::Payment => ActiveStep::Payment(PaymentProps {
            contact_details: session.contact_details().clone(),
            ticket_counts: *session.ticket_counts(),
            final_total: state.final_total(),
            status: state.payment.clone(),
        }),
    }
}

fn summary(state: &CheckoutState) -> SummaryView {
    let catalog = state.prices.catalog();
    let lines = state
        .session
        .ticket_counts()
        .iter()
        .filter(|&(_, count)| count > 0)
        .map(|(tier, count)| {
            let unit_price = catalog.price(tier);
            SummaryLine {
                tier,
                label: tier.label(),
                count,
                unit_price,
                line_total: unit_price.saturating_mul(count),
            }
        })
        .collect();

    let applies = state.discount_applies();
    SummaryView {
        lines,
        subtotal: state.subtotal(),
        discount_amount: if applies {
            state.session.discount_amount()
        } else {
            Money::ZERO
        },
        discounted_total: state.session.discounted_total().filter(|_| applies),
        total: state.final_total(),
    }
}
