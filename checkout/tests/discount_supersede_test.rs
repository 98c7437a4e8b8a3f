//! Referral discounts under changing inputs.
//!
//! A resolution started for one (code, total) pair must never land once the
//! pair has changed, however late it completes.
//!
//! Run with: `cargo test --test discount_supersede_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

mod common;

use common::{contact, dispatch, environment, store, ten_percent, SlowDiscountService};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use ticket_checkout::{CheckoutAction, CheckoutConfig, Money, TicketCounts, Tier, DISCOUNT_EFFECT};

fn counts(early_birds: u32) -> CheckoutAction {
    CheckoutAction::SetTicketCounts {
        counts: TicketCounts::new().with(Tier::EarlyBird, early_birds),
    }
}

#[tokio::test(start_paused = true)]
async fn test_slow_result_for_old_total_is_superseded() {
    // The $100 resolution is slow, the $200 one fast: the old result would
    // arrive last if it were not superseded.
    let service = SlowDiscountService::new(ten_percent())
        .with_latency(Money::from_dollars(100), Duration::from_millis(500))
        .with_latency(Money::from_dollars(200), Duration::from_millis(50));
    let calls = service.calls();
    let store = store(environment(CheckoutConfig::default()).with_discounts(Arc::new(service)));

    dispatch(&store, CheckoutAction::Started).await;
    dispatch(&store, counts(2)).await;

    let mut first = store
        .send(CheckoutAction::SetContactDetails { details: contact("FRIEND10") })
        .await
        .unwrap();
    assert!(store.is_in_flight(DISCOUNT_EFFECT));

    // Let the $100 resolution reach the service before the total changes
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let mut second = store.send(counts(4)).await.unwrap();
    second.wait().await;
    first.wait().await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    let (discounted, amount, pending) = store
        .state(|s| {
            (
                s.session.discounted_total(),
                s.session.discount_amount(),
                s.discount.is_pending(),
            )
        })
        .await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(discounted, Some(Money::from_dollars(180)));
    assert_eq!(amount, Money::from_dollars(20));
    assert!(!pending);
}

#[tokio::test(start_paused = true)]
async fn test_late_result_dropped_even_without_runtime_cancel() {
    let store = store(environment(CheckoutConfig::default()));

    dispatch(&store, CheckoutAction::Started).await;
    dispatch(&store, counts(2)).await;
    dispatch(&store, CheckoutAction::SetContactDetails { details: contact("FRIEND10") }).await;
    dispatch(&store, counts(4)).await;

    // A result for the $100 request delivered after the total moved to $200
    let stale = ticket_checkout::DiscountRequest::new("FRIEND10", Money::from_dollars(100));
    dispatch(
        &store,
        CheckoutAction::DiscountResolved {
            request: stale,
            discounted_total: Money::from_dollars(90),
            rate: ten_percent(),
        },
    )
    .await;

    let discounted = store.state(|s| s.session.discounted_total()).await;
    assert_eq!(discounted, Some(Money::from_dollars(180)));
}

#[tokio::test(start_paused = true)]
async fn test_cleared_code_keeps_applied_discount() {
    let store = store(environment(CheckoutConfig::default()));

    dispatch(&store, CheckoutAction::Started).await;
    dispatch(&store, counts(2)).await;
    dispatch(&store, CheckoutAction::SetContactDetails { details: contact("FRIEND10") }).await;
    dispatch(&store, CheckoutAction::SetContactDetails { details: contact("") }).await;

    let (discounted, amount) = store
        .state(|s| (s.session.discounted_total(), s.session.discount_amount()))
        .await;
    assert_eq!(discounted, Some(Money::from_dollars(90)));
    assert_eq!(amount, Money::from_dollars(10));
}

#[tokio::test(start_paused = true)]
async fn test_empty_code_never_resolves() {
    let service = SlowDiscountService::new(ten_percent());
    let calls = service.calls();
    let store = store(environment(CheckoutConfig::default()).with_discounts(Arc::new(service)));

    dispatch(&store, CheckoutAction::Started).await;
    dispatch(&store, counts(2)).await;
    dispatch(&store, CheckoutAction::SetContactDetails { details: contact("   ") }).await;
    dispatch(&store, counts(3)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    let (discounted, amount) = store
        .state(|s| (s.session.discounted_total(), s.session.discount_amount()))
        .await;
    assert_eq!(discounted, None);
    assert_eq!(amount, Money::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_code_entered_before_prices_resolves_against_loaded_total() {
    let store = store(environment(CheckoutConfig::default()));

    dispatch(&store, counts(2)).await;
    dispatch(&store, CheckoutAction::SetContactDetails { details: contact("FRIEND10") }).await;
    assert_eq!(store.state(|s| s.session.discounted_total()).await, None);

    dispatch(&store, CheckoutAction::Started).await;

    // PricesLoaded started the resolution; let it land
    tokio::time::sleep(Duration::from_millis(10)).await;
    let discounted = store.state(|s| s.session.discounted_total()).await;
    assert_eq!(discounted, Some(Money::from_dollars(90)));
}
