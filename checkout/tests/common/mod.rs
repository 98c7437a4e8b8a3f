//! Shared fixtures for checkout integration tests.

#![allow(dead_code)]

use checkout_runtime::Store;
use checkout_testing::test_clock;
use futures::future::{self, BoxFuture, FutureExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use ticket_checkout::{
    CheckoutAction, CheckoutConfig, CheckoutEnvironment, CheckoutReducer, CheckoutSession,
    CheckoutState, ContactDetails, DiscountError, DiscountRate, DiscountService, Money,
    PriceCatalog, PriceFetchError, PriceSource, ReferralTable, SessionError, SessionProvider,
    StaticPriceSource, Tier,
};

pub type CheckoutStore = Store<CheckoutState, CheckoutAction, CheckoutEnvironment, CheckoutReducer>;

/// Early bird $50, regular $75
pub fn catalog() -> PriceCatalog {
    PriceCatalog::empty()
        .with_price(Tier::EarlyBird, Money::from_dollars(50))
        .with_price(Tier::Regular, Money::from_dollars(75))
}

pub fn ten_percent() -> DiscountRate {
    DiscountRate::from_percent(10).unwrap()
}

pub fn contact(referral_code: &str) -> ContactDetails {
    ContactDetails {
        first_name: "Grace".to_string(),
        last_name: "Hopper".to_string(),
        email: "grace@example.com".to_string(),
        phone: "+1 555 010 0199".to_string(),
        referral_code: referral_code.to_string(),
    }
}

/// Environment serving [`catalog`], accepting `FRIEND10` and using the fixed test clock
pub fn environment(config: CheckoutConfig) -> CheckoutEnvironment {
    CheckoutEnvironment::new(Arc::new(StaticPriceSource::new(catalog())), config)
        .with_discounts(Arc::new(ReferralTable::new().with_code("FRIEND10", ten_percent())))
        .with_clock(Arc::new(test_clock()))
}

pub fn store(env: CheckoutEnvironment) -> CheckoutStore {
    let state = CheckoutState::new(
        CheckoutSession::default(),
        ticket_checkout::SessionOrigin::Provided,
        &env.config,
    );
    Store::new(state, CheckoutReducer::new(), env)
}

/// Send `action` and wait until its effects, including the reduction of
/// anything they fed back, are done
pub async fn dispatch(store: &CheckoutStore, action: CheckoutAction) {
    let mut handle = store.send(action).await.unwrap();
    handle.wait().await;
}

// ============================================================================
// Collaborator doubles
// ============================================================================

/// Session provider that always fails
pub struct FailingSessionProvider;

impl SessionProvider for FailingSessionProvider {
    fn provide(&self) -> Result<CheckoutSession, SessionError> {
        Err(SessionError::Provider("session context not mounted".to_string()))
    }
}

/// Price source that is always unavailable, counting attempts
#[derive(Clone, Default)]
pub struct FailingPriceSource {
    pub attempts: Arc<AtomicUsize>,
}

impl PriceSource for FailingPriceSource {
    fn fetch(&self) -> BoxFuture<'static, Result<PriceCatalog, PriceFetchError>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        future::ready(Err(PriceFetchError::Unavailable("connection refused".to_string()))).boxed()
    }
}

/// Resolves every code to a fixed rate after a latency chosen by total
pub struct SlowDiscountService {
    rate: DiscountRate,
    latency: HashMap<Money, Duration>,
    calls: Arc<AtomicUsize>,
}

impl SlowDiscountService {
    pub fn new(rate: DiscountRate) -> Self {
        Self {
            rate,
            latency: HashMap::new(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_latency(mut self, total: Money, latency: Duration) -> Self {
        self.latency.insert(total, latency);
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl DiscountService for SlowDiscountService {
    fn resolve(
        &self,
        _code: &str,
        original_total: Money,
    ) -> BoxFuture<'static, Result<DiscountRate, DiscountError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let latency = self.latency.get(&original_total).copied().unwrap_or_default();
        let rate = self.rate;

        async move {
            tokio::time::sleep(latency).await;
            Ok(rate)
        }
        .boxed()
    }
}

/// Discount service that cannot be reached
pub struct UnreachableDiscountService;

impl DiscountService for UnreachableDiscountService {
    fn resolve(
        &self,
        _code: &str,
        _original_total: Money,
    ) -> BoxFuture<'static, Result<DiscountRate, DiscountError>> {
        future::ready(Err(DiscountError::Unavailable("503 Service Unavailable".to_string()))).boxed()
    }
}
