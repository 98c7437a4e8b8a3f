//! Ticket Checkout - a three-step purchase flow built on reducers and effects
//!
//! The checkout walks a buyer through ticket selection, contact entry and
//! payment while keeping one session record consistent under asynchronous
//! input:
//!
//! - **Price catalog**: fetched once per visit with timeout and retry; until it
//!   resolves every price reads as zero and the step area shows a placeholder
//! - **Reservation timer**: counts down only on the contact step; expiry sends
//!   the buyer back to ticket selection
//! - **Referral discounts**: resolved asynchronously; a result computed from an
//!   outdated code or total is never applied
//! - **Degraded mode**: if session state cannot be obtained the flow still
//!   renders with default values
//!
//! # Architecture
//!
//! ```text
//!   user input ──▶ CheckoutAction ──▶ CheckoutReducer ──▶ CheckoutState ──▶ view::render
//!                        ▲                  │
//!                        │               Effects
//!                        │                  ▼
//!                        └──── Store runtime (prices, discounts, ticks, payment)
//! ```
//!
//! Every mutation goes through [`CheckoutReducer`]. Async results re-enter as
//! actions, so user input and resolved fetches share one mutation path.
//!
//! # Usage
//!
//! ```ignore
//! let env = CheckoutEnvironment::new(Arc::new(StaticPriceSource::new(catalog)), config);
//! let state = CheckoutState::initialize(&FreshSession, &env.config);
//! let store = Store::new(state, CheckoutReducer::new(), env);
//!
//! store.send(CheckoutAction::Started).await?;
//! let screen = store.state(view::render).await;
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod discount;
pub mod error;
pub mod navigation;
pub mod orchestrator;
pub mod payment;
pub mod pricing;
pub mod session;
pub mod timer;
pub mod types;
pub mod validation;
pub mod view;

pub use config::CheckoutConfig;
pub use discount::{DiscountRequest, DiscountResolver, DiscountService, ReferralTable, DISCOUNT_EFFECT};
pub use error::{ConfigError, DiscountError, PaymentError, PriceFetchError, SessionError};
pub use navigation::{LoggingNavigator, Navigator, RecordingNavigator};
pub use orchestrator::{
    CheckoutAction, CheckoutEnvironment, CheckoutReducer, CheckoutState, PRICES_EFFECT, TIMER_EFFECT,
};
pub use payment::{MockPaymentGateway, PaymentGateway, PaymentReceipt, PaymentRequest, PaymentStatus};
pub use pricing::{JsonPriceSource, PriceCatalogState, PriceSource, StaticPriceSource};
pub use session::{
    derive_subtotal, CheckoutSession, ContactDetails, ContactField, FreshSession,
    PreselectedSession, SessionOrigin, SessionProvider, ValidationErrors,
};
pub use timer::{format_time, ReservationTimer};
pub use types::{DiscountRate, Money, PriceCatalog, Step, TicketCounts, Tier};
pub use view::{render, ActiveStep, CheckoutScreen};
