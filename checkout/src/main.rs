//! Checkout demo binary
//!
//! Drives one buyer through the whole checkout against in-memory
//! collaborators and prints each rendered screen.

use anyhow::Context;
use checkout_runtime::metrics::MetricsRecorder;
use checkout_runtime::Store;
use std::sync::Arc;
use std::time::Duration;
use ticket_checkout::{
    render, CheckoutAction, CheckoutConfig, CheckoutEnvironment, CheckoutReducer, CheckoutState,
    ContactDetails, DiscountRate, JsonPriceSource, PreselectedSession, ReferralTable,
    TicketCounts, Tier,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEMO_CATALOG: &str = r#"{
    "earlyBird": 4500,
    "regular": 6000,
    "vipSolo": 15000,
    "vipTable5": 65000,
    "vipTable7": 87500,
    "vipTable10": 120000
}"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ticket_checkout=debug,checkout_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CheckoutConfig::from_env();
    config.validate().context("invalid checkout configuration")?;
    let recorder = MetricsRecorder::install()?;

    let referral_rate = DiscountRate::from_percent(10).context("referral rate out of range")?;
    let env = CheckoutEnvironment::new(Arc::new(JsonPriceSource::new(DEMO_CATALOG)), config)
        .with_discounts(Arc::new(ReferralTable::new().with_code("FRIEND10", referral_rate)));

    let preselected = PreselectedSession::new(TicketCounts::new().with(Tier::EarlyBird, 2));
    let state = CheckoutState::initialize(&preselected, &env.config);
    let store = Store::new(state, CheckoutReducer::new(), env);

    println!("=== Ticket Checkout Demo ===\n");

    println!(">>> Loading prices");
    store.send(CheckoutAction::Started).await?.wait().await;
    print_screen(&store).await?;

    println!("\n>>> Adding a regular ticket and moving to contact details");
    store
        .send(CheckoutAction::SetTicketCount {
            tier: Tier::Regular,
            count: 1,
        })
        .await?;
    store.send(CheckoutAction::Continue).await?;

    store
        .send(CheckoutAction::SetContactDetails {
            details: ContactDetails {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: "ada@example.com".to_string(),
                phone: "+44 20 7946 0958".to_string(),
                referral_code: "FRIEND10".to_string(),
            },
        })
        .await?
        .wait()
        .await;
    print_screen(&store).await?;

    println!("\n>>> Submitting contact details");
    store.send(CheckoutAction::SubmitContact).await?;
    print_screen(&store).await?;

    println!("\n>>> Paying");
    store.send(CheckoutAction::SubmitPayment).await?.wait().await;
    print_screen(&store).await?;

    store.shutdown(Duration::from_secs(5)).await?;

    println!("\n=== Metrics ===\n{}", recorder.render());
    Ok(())
}

type CheckoutStore = Store<CheckoutState, CheckoutAction, CheckoutEnvironment, CheckoutReducer>;

async fn print_screen(store: &CheckoutStore) -> anyhow::Result<()> {
    let screen = store.state(render).await;
    println!("{}", serde_json::to_string_pretty(&screen)?);
    Ok(())
}
