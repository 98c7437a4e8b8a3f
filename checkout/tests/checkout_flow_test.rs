//! End-to-end checkout flows driven through the Store.
//!
//! Time is paused, so reservation ticks and retry backoff run instantly.
//!
//! Run with: `cargo test --test checkout_flow_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

mod common;

use checkout_runtime::Store;
use common::{contact, dispatch, environment, store, FailingPriceSource, FailingSessionProvider};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use ticket_checkout::{
    render, ActiveStep, CheckoutAction, CheckoutConfig, CheckoutReducer, CheckoutState,
    MockPaymentGateway, Money, PaymentStatus, RecordingNavigator, SessionOrigin, Step,
    TicketCounts, Tier, TIMER_EFFECT,
};

fn two_early_birds() -> CheckoutAction {
    CheckoutAction::SetTicketCounts {
        counts: TicketCounts::new().with(Tier::EarlyBird, 2),
    }
}

#[tokio::test(start_paused = true)]
async fn test_full_purchase_without_discount() {
    let gateway = MockPaymentGateway::new();
    let env = environment(CheckoutConfig::default()).with_payments(Arc::new(gateway.clone()));
    let store = store(env);

    dispatch(&store, CheckoutAction::Started).await;
    dispatch(&store, two_early_birds()).await;
    assert_eq!(store.state(CheckoutState::subtotal).await, Money::from_dollars(100));

    dispatch(&store, CheckoutAction::Continue).await;
    dispatch(&store, CheckoutAction::SetContactDetails { details: contact("") }).await;
    dispatch(&store, CheckoutAction::SubmitContact).await;
    assert_eq!(store.state(|s| s.step).await, Step::Payment);

    let screen = store.state(render).await;
    let ActiveStep::Payment(props) = screen.active else {
        panic!("expected payment view, got {:?}", screen.active);
    };
    assert_eq!(props.final_total, Money::from_dollars(100));

    dispatch(&store, CheckoutAction::SubmitPayment).await;

    let payment = store.state(|s| s.payment.clone()).await;
    assert!(payment.is_completed(), "payment should complete: {payment:?}");
    let submissions = gateway.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].final_total, Money::from_dollars(100));
    assert_eq!(submissions[0].contact.email, "grace@example.com");

    store.shutdown(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_referral_discount_reaches_payment() {
    let gateway = MockPaymentGateway::new();
    let env = environment(CheckoutConfig::default()).with_payments(Arc::new(gateway.clone()));
    let store = store(env);

    dispatch(&store, CheckoutAction::Started).await;
    dispatch(&store, two_early_birds()).await;
    dispatch(&store, CheckoutAction::Continue).await;
    dispatch(&store, CheckoutAction::SetContactDetails { details: contact("friend10") }).await;

    let summary = store.state(|s| render(s).summary).await;
    assert_eq!(summary.subtotal, Money::from_dollars(100));
    assert_eq!(summary.discount_amount, Money::from_dollars(10));
    assert_eq!(summary.discounted_total, Some(Money::from_dollars(90)));
    assert_eq!(summary.total, Money::from_dollars(90));

    dispatch(&store, CheckoutAction::SubmitContact).await;
    dispatch(&store, CheckoutAction::SubmitPayment).await;

    assert_eq!(gateway.submissions()[0].final_total, Money::from_dollars(90));
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_discount_service_keeps_undiscounted_total() {
    let env = environment(CheckoutConfig::default())
        .with_discounts(Arc::new(common::UnreachableDiscountService));
    let store = store(env);

    dispatch(&store, CheckoutAction::Started).await;
    dispatch(&store, two_early_birds()).await;
    dispatch(&store, CheckoutAction::SetContactDetails { details: contact("FRIEND10") }).await;

    let (discounted, amount, pending) = store
        .state(|s| {
            (
                s.session.discounted_total(),
                s.session.discount_amount(),
                s.discount.is_pending(),
            )
        })
        .await;
    assert_eq!(discounted, None);
    assert_eq!(amount, Money::ZERO);
    assert!(!pending);
}

#[tokio::test(start_paused = true)]
async fn test_prices_unavailable_degrade_to_zero() {
    let source = FailingPriceSource::default();
    let attempts = Arc::clone(&source.attempts);
    let mut env = environment(CheckoutConfig::default());
    env.prices = Arc::new(source);
    let store = store(env);

    dispatch(&store, CheckoutAction::Started).await;
    dispatch(&store, two_early_birds()).await;

    // One attempt plus the configured retries
    assert_eq!(attempts.load(Ordering::SeqCst), 3);

    let screen = store.state(render).await;
    assert_eq!(screen.active.step(), Some(Step::TicketSelection));
    assert_eq!(screen.summary.subtotal, Money::ZERO);
    assert_eq!(screen.summary.lines[0].unit_price, Money::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_loading_placeholder_until_prices_resolve() {
    let store = store(environment(CheckoutConfig::default()));

    let before = store.state(render).await;
    assert_eq!(before.active.step(), None);

    dispatch(&store, CheckoutAction::Started).await;

    let after = store.state(render).await;
    assert_eq!(after.active.step(), Some(Step::TicketSelection));
}

#[tokio::test(start_paused = true)]
async fn test_failed_session_provider_still_renders() {
    let env = environment(CheckoutConfig::default());
    let state = CheckoutState::initialize(&FailingSessionProvider, &env.config);
    let store = Store::new(state, CheckoutReducer::new(), env);

    dispatch(&store, CheckoutAction::Started).await;

    let origin = store.state(|s| s.origin).await;
    assert_eq!(origin, SessionOrigin::Fallback);

    let screen = store.state(render).await;
    assert_eq!(screen.active.step(), Some(Step::TicketSelection));
    assert!(screen.summary.lines.is_empty());
    assert_eq!(screen.summary.total, Money::ZERO);
    assert_eq!(screen.summary.discounted_total, None);
}

#[tokio::test(start_paused = true)]
async fn test_back_from_first_step_leaves_checkout() {
    let navigator = RecordingNavigator::new();
    let env = environment(CheckoutConfig::default()).with_navigator(Arc::new(navigator.clone()));
    let store = store(env);

    dispatch(&store, CheckoutAction::Started).await;
    dispatch(&store, CheckoutAction::Back).await;

    assert_eq!(navigator.history(), vec!["/tickets".to_string()]);
    assert_eq!(store.state(|s| s.step).await, Step::TicketSelection);
}

#[tokio::test(start_paused = true)]
async fn test_back_from_contact_step_resets_timer() {
    let store = store(environment(CheckoutConfig::default()));

    dispatch(&store, CheckoutAction::Started).await;
    store.send(CheckoutAction::Continue).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5_500)).await;

    let left = store.state(CheckoutState::time_remaining).await;
    assert_eq!(left, "09:55");

    dispatch(&store, CheckoutAction::Back).await;

    let (step, remaining, running) = store
        .state(|s| (s.step, s.timer.remaining(), s.timer.is_running()))
        .await;
    assert_eq!(step, Step::TicketSelection);
    assert_eq!(remaining, Duration::from_secs(600));
    assert!(!running);
    assert!(!store.is_in_flight(TIMER_EFFECT));
}

#[tokio::test(start_paused = true)]
async fn test_timer_pauses_on_payment_and_resumes_on_back() {
    let store = store(environment(CheckoutConfig::default()));

    dispatch(&store, CheckoutAction::Started).await;
    store.send(CheckoutAction::Continue).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10_500)).await;
    dispatch(&store, CheckoutAction::Continue).await;

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(store.state(CheckoutState::time_remaining).await, "09:50");
    assert!(!store.is_in_flight(TIMER_EFFECT));

    store.send(CheckoutAction::Back).await.unwrap();
    let (step, left) = store.state(|s| (s.step, s.time_remaining())).await;
    assert_eq!(step, Step::ContactEntry);
    assert_eq!(left, "09:50");
    assert!(store.is_in_flight(TIMER_EFFECT));
}

#[tokio::test(start_paused = true)]
async fn test_reservation_expiry_returns_to_ticket_selection() {
    let config = CheckoutConfig {
        reservation_window: Duration::from_secs(3),
        ..CheckoutConfig::default()
    };
    let store = store(environment(config));

    dispatch(&store, CheckoutAction::Started).await;
    dispatch(&store, two_early_birds()).await;
    store.send(CheckoutAction::Continue).await.unwrap();
    dispatch(&store, CheckoutAction::SetContactDetails { details: contact("") }).await;

    tokio::time::sleep(Duration::from_millis(3_500)).await;

    let (step, remaining, counts, first_name) = store
        .state(|s| {
            (
                s.step,
                s.timer.remaining(),
                *s.session.ticket_counts(),
                s.session.contact_details().first_name.clone(),
            )
        })
        .await;
    assert_eq!(step, Step::TicketSelection);
    assert_eq!(remaining, Duration::from_secs(3));
    assert_eq!(counts.get(Tier::EarlyBird), 2);
    assert_eq!(first_name, "Grace");
    assert!(!store.is_in_flight(TIMER_EFFECT));
}

#[tokio::test(start_paused = true)]
async fn test_declined_payment_can_be_retried() {
    let declining = MockPaymentGateway::declining("card expired");
    let env = environment(CheckoutConfig::default()).with_payments(Arc::new(declining.clone()));
    let store = store(env);

    dispatch(&store, CheckoutAction::Started).await;
    dispatch(&store, two_early_birds()).await;
    dispatch(&store, CheckoutAction::Continue).await;
    dispatch(&store, CheckoutAction::Continue).await;
    dispatch(&store, CheckoutAction::SubmitPayment).await;

    let status = store.state(|s| s.payment.clone()).await;
    assert_eq!(
        status,
        PaymentStatus::Failed("Payment declined: card expired".to_string())
    );

    dispatch(&store, CheckoutAction::SubmitPayment).await;
    assert_eq!(declining.submissions().len(), 2);
}
