//! The checkout flow as a reducer.
//!
//! [`CheckoutReducer`] owns every state transition: step navigation, the
//! reservation countdown, price loading, discount resolution and payment
//! submission. Side effects are returned as [`Effect`] values; their results
//! come back as [`CheckoutAction`]s and pass through the same reducer.
//!
//! ## Step machine
//!
//! ```text
//!            Continue            Continue / SubmitContact
//!  TicketSelection ───────▶ ContactEntry ───────────────▶ Payment
//!        │          ◀───────            ◀───────────────
//!        │      Back (resets timer)          Back
//!        ▼
//!   navigate to exit path
//! ```
//!
//! The reservation timer runs only on `ContactEntry`. When it runs out the
//! user is sent back to `TicketSelection` and the timer is re-armed; counts
//! and contact details are kept.

use crate::config::CheckoutConfig;
use crate::discount::{
    DiscountDecision, DiscountRequest, DiscountResolver, DiscountService, ReferralTable,
    DISCOUNT_EFFECT,
};
use crate::error::PaymentError;
use crate::navigation::{LoggingNavigator, Navigator};
use crate::payment::{MockPaymentGateway, PaymentGateway, PaymentReceipt, PaymentRequest, PaymentStatus};
use crate::pricing::{fetch_with_retry, PriceCatalogState, PriceSource};
use crate::session::{CheckoutSession, ContactDetails, SessionOrigin, SessionProvider, ValidationErrors};
use crate::timer::{ReservationTimer, TickOutcome};
use crate::types::{DiscountRate, Money, PriceCatalog, Step, TicketCounts, Tier};
use crate::validation::validate_contact;
use checkout_core::effect::{Effect, EffectId};
use checkout_core::environment::{Clock, SystemClock};
use checkout_core::reducer::Reducer;
use checkout_core::{async_effect, cancellable, delay};
use smallvec::{smallvec, SmallVec};
use std::sync::Arc;

/// Id of the pending reservation tick
pub const TIMER_EFFECT: EffectId = EffectId::new("checkout.timer");

/// Id of the price catalog fetch
pub const PRICES_EFFECT: EffectId = EffectId::new("checkout.prices");

type Effects = SmallVec<[Effect<CheckoutAction>; 4]>;

// ============================================================================
// State
// ============================================================================

/// Everything the checkout knows
#[derive(Clone, Debug)]
pub struct CheckoutState {
    /// Active step
    pub step: Step,
    /// User-entered data and applied discount
    pub session: CheckoutSession,
    /// Whether the session came from its provider or from defaults
    pub origin: SessionOrigin,
    /// Price catalog and whether it is still loading
    pub prices: PriceCatalogState,
    /// Reservation countdown
    pub timer: ReservationTimer,
    /// Which discount request results are accepted for
    pub discount: DiscountResolver,
    /// Payment step progress
    pub payment: PaymentStatus,
}

impl CheckoutState {
    /// State on entry to the checkout
    #[must_use]
    pub fn new(session: CheckoutSession, origin: SessionOrigin, config: &CheckoutConfig) -> Self {
        Self {
            step: Step::TicketSelection,
            session,
            origin,
            prices: PriceCatalogState::default(),
            timer: ReservationTimer::new(config.reservation_window),
            discount: DiscountResolver::default(),
            payment: PaymentStatus::Idle,
        }
    }

    /// State on entry to the checkout, with the session from `provider`.
    ///
    /// Falls back to the default session if the provider fails.
    #[must_use]
    pub fn initialize(provider: &dyn SessionProvider, config: &CheckoutConfig) -> Self {
        let (session, origin) = CheckoutSession::initialize(provider);
        Self::new(session, origin, config)
    }

    /// Subtotal at current prices; zero while prices are loading
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.session.subtotal(self.prices.catalog())
    }

    /// Whether the applied discount was resolved for the current referral
    /// code and subtotal
    #[must_use]
    pub fn discount_applies(&self) -> bool {
        self.discount
            .applies_to(&self.session.contact_details().referral_code, self.subtotal())
    }

    /// Amount the payment step charges.
    ///
    /// A discount resolved for other inputs is kept on the session but never charged.
    #[must_use]
    pub fn final_total(&self) -> Money {
        let subtotal = self.subtotal();
        if self.discount_applies() {
            self.session.final_total(subtotal)
        } else {
            subtotal
        }
    }

    /// Reservation time left as `MM:SS`
    #[must_use]
    pub fn time_remaining(&self) -> String {
        self.timer.formatted()
    }
}

impl Default for CheckoutState {
    fn default() -> Self {
        Self::new(
            CheckoutSession::default(),
            SessionOrigin::Provided,
            &CheckoutConfig::default(),
        )
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Inputs to the checkout: user events, ticks and async results
#[derive(Clone, Debug)]
pub enum CheckoutAction {
    /// Checkout mounted; start loading prices
    Started,
    /// Price fetch succeeded
    PricesLoaded {
        /// Fetched catalog
        catalog: PriceCatalog,
    },
    /// Price fetch gave up
    PricesFailed {
        /// Last fetch error
        reason: String,
    },
    /// Replace all ticket counts
    SetTicketCounts {
        /// New counts
        counts: TicketCounts,
    },
    /// Change the count of one tier
    SetTicketCount {
        /// Tier to change
        tier: Tier,
        /// New count
        count: u32,
    },
    /// Replace the contact details
    SetContactDetails {
        /// New details
        details: ContactDetails,
    },
    /// Replace the validation errors
    SetErrors {
        /// New errors
        errors: ValidationErrors,
    },
    /// Contact form submitted: validate, then advance if valid
    SubmitContact,
    /// Advance one step
    Continue,
    /// Go back one step, or leave the checkout from the first step
    Back,
    /// One tick interval passed
    TimerTicked,
    /// Re-arm the reservation timer
    ResetTimer,
    /// A discount resolution succeeded
    DiscountResolved {
        /// Inputs it was computed from
        request: DiscountRequest,
        /// Total after discount
        discounted_total: Money,
        /// Rate granted
        rate: DiscountRate,
    },
    /// A discount resolution failed
    DiscountRejected {
        /// Inputs it was computed from
        request: DiscountRequest,
        /// Why
        reason: String,
    },
    /// Pay the final total
    SubmitPayment,
    /// The gateway charged the payment
    PaymentSucceeded {
        /// Gateway receipt
        receipt: PaymentReceipt,
    },
    /// The gateway rejected the payment
    PaymentFailed {
        /// Why
        reason: String,
    },
}

// ============================================================================
// Environment
// ============================================================================

/// Injected collaborators
#[derive(Clone)]
pub struct CheckoutEnvironment {
    /// Price catalog source
    pub prices: Arc<dyn PriceSource>,
    /// Referral code validation
    pub discounts: Arc<dyn DiscountService>,
    /// Payment processor
    pub payments: Arc<dyn PaymentGateway>,
    /// Route changes
    pub navigator: Arc<dyn Navigator>,
    /// Clock for timestamps
    pub clock: Arc<dyn Clock>,
    /// Timings and routes
    pub config: CheckoutConfig,
}

impl CheckoutEnvironment {
    /// Environment with the given price source, no referral codes, a mock
    /// gateway, logged navigation and the system clock
    #[must_use]
    pub fn new(prices: Arc<dyn PriceSource>, config: CheckoutConfig) -> Self {
        Self {
            prices,
            discounts: Arc::new(ReferralTable::new()),
            payments: MockPaymentGateway::new().shared(),
            navigator: Arc::new(LoggingNavigator),
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replace the discount service
    #[must_use]
    pub fn with_discounts(mut self, discounts: Arc<dyn DiscountService>) -> Self {
        self.discounts = discounts;
        self
    }

    /// Replace the payment gateway
    #[must_use]
    pub fn with_payments(mut self, payments: Arc<dyn PaymentGateway>) -> Self {
        self.payments = payments;
        self
    }

    /// Replace the navigator
    #[must_use]
    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    /// Replace the clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl std::fmt::Debug for CheckoutEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutEnvironment")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the checkout flow
#[derive(Clone, Copy, Debug, Default)]
pub struct CheckoutReducer;

impl CheckoutReducer {
    /// Creates a new `CheckoutReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn none() -> Effects {
        smallvec![Effect::None]
    }

    fn finish(effects: Effects) -> Effects {
        if effects.is_empty() {
            Self::none()
        } else {
            effects
        }
    }

    fn load_prices(env: &CheckoutEnvironment) -> Effect<CheckoutAction> {
        let source = Arc::clone(&env.prices);
        let timeout = env.config.price_fetch_timeout;
        let policy = env.config.price_retry_policy();

        cancellable! {
            id: PRICES_EFFECT,
            effect: async_effect! {
                match fetch_with_retry(source, timeout, policy).await {
                    Ok(catalog) => Some(CheckoutAction::PricesLoaded { catalog }),
                    Err(error) => Some(CheckoutAction::PricesFailed {
                        reason: error.to_string(),
                    }),
                }
            }
        }
    }

    fn schedule_tick(env: &CheckoutEnvironment) -> Effect<CheckoutAction> {
        cancellable! {
            id: TIMER_EFFECT,
            effect: delay! {
                duration: env.config.tick_interval,
                action: CheckoutAction::TimerTicked
            }
        }
    }

    fn resolve_discount(env: &CheckoutEnvironment, request: DiscountRequest) -> Effect<CheckoutAction> {
        let service = Arc::clone(&env.discounts);

        cancellable! {
            id: DISCOUNT_EFFECT,
            effect: async_effect! {
                let resolution = service.resolve(&request.referral_code, request.original_total);
                match resolution.await {
                    Ok(rate) => Some(CheckoutAction::DiscountResolved {
                        discounted_total: rate.apply(request.original_total),
                        rate,
                        request,
                    }),
                    Err(error) => Some(CheckoutAction::DiscountRejected {
                        reason: error.to_string(),
                        request,
                    }),
                }
            }
        }
    }

    fn navigate_out(env: &CheckoutEnvironment) -> Effect<CheckoutAction> {
        let navigator = Arc::clone(&env.navigator);
        let path = env.config.exit_path.clone();

        async_effect! {
            navigator.navigate_to(&path);
            None
        }
    }

    fn submit_payment(env: &CheckoutEnvironment, request: PaymentRequest) -> Effect<CheckoutAction> {
        let gateway = Arc::clone(&env.payments);

        async_effect! {
            match gateway.submit(request).await {
                Ok(receipt) => Some(CheckoutAction::PaymentSucceeded { receipt }),
                Err(error) => Some(CheckoutAction::PaymentFailed {
                    reason: error.to_string(),
                }),
            }
        }
    }

    /// Re-read the discount inputs after counts, prices or the code changed.
    ///
    /// Nothing is resolved while prices are loading; the load result triggers
    /// the evaluation instead.
    fn reevaluate_discount(state: &mut CheckoutState, env: &CheckoutEnvironment) -> Effects {
        if state.prices.is_loading() {
            return Self::none();
        }

        let subtotal = state.subtotal();
        let code = &state.session.contact_details().referral_code;

        match state.discount.evaluate(code, subtotal) {
            DiscountDecision::Resolve(request) => {
                tracing::debug!(
                    code = %request.referral_code,
                    total = %request.original_total,
                    "Resolving referral discount"
                );
                smallvec![Self::resolve_discount(env, request)]
            },
            DiscountDecision::Clear => {
                tracing::debug!("Referral code cleared, keeping current totals");
                smallvec![Effect::Cancel(DISCOUNT_EFFECT)]
            },
            DiscountDecision::Unchanged => Self::none(),
        }
    }

    /// Move to `to`, pausing or resuming the reservation timer as needed
    fn go_to(state: &mut CheckoutState, to: Step, env: &CheckoutEnvironment) -> Effects {
        let from = state.step;
        if from == to {
            return Self::none();
        }

        state.step = to;
        tracing::debug!(from = from.number(), to = to.number(), "Step changed");

        let mut effects = Effects::new();
        if from == Step::ContactEntry {
            state.timer.pause();
            effects.push(Effect::Cancel(TIMER_EFFECT));
        }
        if state.timer.start(to) {
            effects.push(Self::schedule_tick(env));
        }
        Self::finish(effects)
    }

    fn submit_contact(state: &mut CheckoutState, env: &CheckoutEnvironment) -> Effects {
        if state.step != Step::ContactEntry {
            tracing::debug!(step = state.step.number(), "Ignoring contact submit outside contact step");
            return Self::none();
        }

        let errors = validate_contact(state.session.contact_details());
        let valid = errors.is_empty();
        if !valid {
            tracing::debug!(invalid_fields = errors.len(), "Contact details rejected");
        }
        state.session.set_errors(errors);

        if valid {
            let next = state.step.next();
            Self::go_to(state, next, env)
        } else {
            Self::none()
        }
    }

    fn timer_ticked(state: &mut CheckoutState, env: &CheckoutEnvironment) -> Effects {
        if state.step != Step::ContactEntry {
            state.timer.pause();
            return Self::none();
        }

        match state.timer.tick(env.config.tick_interval) {
            TickOutcome::Idle => Self::none(),
            TickOutcome::Counting(_) => smallvec![Self::schedule_tick(env)],
            TickOutcome::Expired => {
                tracing::info!("Reservation expired, returning to ticket selection");
                metrics::counter!("checkout.timer.expired").increment(1);
                state.timer.reset();
                Self::go_to(state, Step::TicketSelection, env)
            },
        }
    }

    fn discount_resolved(
        state: &mut CheckoutState,
        request: &DiscountRequest,
        discounted_total: Money,
        rate: DiscountRate,
    ) -> Effects {
        if !state.discount.accept(request) {
            tracing::debug!(total = %request.original_total, "Discarding stale discount result");
            metrics::counter!("checkout.discount.stale_discarded").increment(1);
            return Self::none();
        }

        let subtotal = state.subtotal();
        state.session.apply_discount(discounted_total, rate, subtotal);
        tracing::info!(%rate, %discounted_total, "Referral discount applied");
        metrics::counter!("checkout.discount.applied").increment(1);
        Self::none()
    }

    fn discount_rejected(state: &mut CheckoutState, request: &DiscountRequest, reason: &str) -> Effects {
        if state.discount.reject(request) {
            tracing::debug!(reason, "Referral code rejected, discount withdrawn");
            state.session.clear_discount();
        } else {
            tracing::debug!(total = %request.original_total, "Discarding stale discount rejection");
            metrics::counter!("checkout.discount.stale_discarded").increment(1);
        }
        Self::none()
    }

    fn request_payment(state: &mut CheckoutState, env: &CheckoutEnvironment) -> Effects {
        if state.step != Step::Payment {
            tracing::warn!(step = state.step.number(), "Ignoring payment submit outside payment step");
            return Self::none();
        }
        if state.payment.is_submitting() || state.payment.is_completed() {
            tracing::debug!("Payment already submitted");
            return Self::none();
        }

        let rejection = if state.discount.is_pending() {
            Some(PaymentError::DiscountPending)
        } else if state.final_total().is_zero() {
            Some(PaymentError::ZeroTotal)
        } else {
            None
        };
        if let Some(error) = rejection {
            tracing::debug!(%error, "Payment not submitted");
            metrics::counter!("checkout.payment.submitted", "outcome" => "rejected").increment(1);
            state.payment = PaymentStatus::Failed(error.to_string());
            return Self::none();
        }

        let request = PaymentRequest {
            contact: state.session.contact_details().clone(),
            counts: *state.session.ticket_counts(),
            final_total: state.final_total(),
            requested_at: env.clock.now(),
        };
        tracing::info!(total = %request.final_total, "Submitting payment");
        state.payment = PaymentStatus::Submitting;
        smallvec![Self::submit_payment(env, request)]
    }
}

impl Reducer for CheckoutReducer {
    type State = CheckoutState;
    type Action = CheckoutAction;
    type Environment = CheckoutEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            CheckoutAction::Started => {
                if state.origin == SessionOrigin::Fallback {
                    tracing::info!("Checkout started in degraded mode");
                }
                state.prices.begin_loading();
                smallvec![Self::load_prices(env)]
            },

            // ========== Prices ==========
            CheckoutAction::PricesLoaded { catalog } => {
                tracing::info!(tiers = catalog.len(), "Price catalog loaded");
                state.prices.loaded(catalog);
                Self::reevaluate_discount(state, env)
            },
            CheckoutAction::PricesFailed { reason } => {
                tracing::warn!(%reason, "Price catalog unavailable, continuing with zero prices");
                metrics::counter!("checkout.prices.fallback").increment(1);
                state.prices.failed();
                Self::reevaluate_discount(state, env)
            },

            // ========== Session setters ==========
            CheckoutAction::SetTicketCounts { counts } => {
                state.session.set_ticket_counts(counts);
                Self::reevaluate_discount(state, env)
            },
            CheckoutAction::SetTicketCount { tier, count } => {
                let mut counts = *state.session.ticket_counts();
                counts.set(tier, count);
                state.session.set_ticket_counts(counts);
                Self::reevaluate_discount(state, env)
            },
            CheckoutAction::SetContactDetails { details } => {
                state.session.set_contact_details(details);
                Self::reevaluate_discount(state, env)
            },
            CheckoutAction::SetErrors { errors } => {
                state.session.set_errors(errors);
                Self::none()
            },

            // ========== Navigation ==========
            CheckoutAction::SubmitContact => Self::submit_contact(state, env),
            CheckoutAction::Continue => {
                let next = state.step.next();
                Self::go_to(state, next, env)
            },
            CheckoutAction::Back => match state.step.previous() {
                None => smallvec![Self::navigate_out(env)],
                Some(previous) => {
                    if state.step == Step::ContactEntry {
                        state.timer.reset();
                    }
                    Self::go_to(state, previous, env)
                },
            },

            // ========== Reservation timer ==========
            CheckoutAction::TimerTicked => Self::timer_ticked(state, env),
            CheckoutAction::ResetTimer => {
                state.timer.reset();
                if state.timer.is_running() {
                    smallvec![Self::schedule_tick(env)]
                } else {
                    Self::none()
                }
            },

            // ========== Discount ==========
            CheckoutAction::DiscountResolved {
                request,
                discounted_total,
                rate,
            } => Self::discount_resolved(state, &request, discounted_total, rate),
            CheckoutAction::DiscountRejected { request, reason } => {
                Self::discount_rejected(state, &request, &reason)
            },

            // ========== Payment ==========
            CheckoutAction::SubmitPayment => Self::request_payment(state, env),
            CheckoutAction::PaymentSucceeded { receipt } => {
                if !state.payment.is_submitting() {
                    return Self::none();
                }
                tracing::info!(reference = %receipt.reference, "Payment completed");
                metrics::counter!("checkout.payment.submitted", "outcome" => "completed").increment(1);
                state.payment = PaymentStatus::Completed(receipt);
                Self::none()
            },
            CheckoutAction::PaymentFailed { reason } => {
                if !state.payment.is_submitting() {
                    return Self::none();
                }
                tracing::warn!(%reason, "Payment failed");
                metrics::counter!("checkout.payment.submitted", "outcome" => "failed").increment(1);
                state.payment = PaymentStatus::Failed(reason);
                Self::none()
            },
        }
    }
}
