//! Kirana Commerce - storefront checkout and payments service

use anyhow::Result;
use kirana_commerce::checkout::CheckoutService;
use kirana_commerce::config::Config;
use kirana_commerce::domain::ports::{Catalog, Notifier, OrderStore};
use kirana_commerce::gateway::RazorpayGateway;
use kirana_commerce::http::{router, AppState};
use kirana_commerce::infrastructure::{InMemoryStore, PostgresStore, SessionCarts};
use kirana_commerce::notify::{BrevoNotifier, LogNotifier};
use kirana_commerce::payments::PaymentService;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let (catalog, orders): (Arc<dyn Catalog>, Arc<dyn OrderStore>) =
        match &config.database_url {
            Some(url) => {
                let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
                sqlx::migrate!("./migrations").run(&pool).await?;
                let store = Arc::new(PostgresStore::new(pool));
                tracing::info!("using postgres store");
                (store.clone(), store)
            }
            None => {
                let store = Arc::new(InMemoryStore::new());
                tracing::warn!("DATABASE_URL not set, using in-memory store");
                (store.clone(), store)
            }
        };

    let notifier: Arc<dyn Notifier> = match &config.brevo_api_key {
        Some(key) => Arc::new(BrevoNotifier::new(key, &config.mail_from)?),
        None => {
            tracing::warn!("BREVO_API_KEY not set, confirmation mails are log-only");
            Arc::new(LogNotifier)
        }
    };

    let gateway = RazorpayGateway::new(
        &config.razorpay_key_id,
        &config.razorpay_key_secret,
        &config.razorpay_api_base,
        config.gateway_timeout,
    )?;

    let carts = SessionCarts::new();
    let state = AppState {
        catalog: catalog.clone(),
        orders: orders.clone(),
        carts: carts.clone(),
        checkout: Arc::new(CheckoutService::new(
            catalog,
            orders.clone(),
            carts,
            &config.currency,
        )),
        payments: Arc::new(PaymentService::new(orders, gateway, notifier)),
        currency: config.currency.clone(),
    };

    let app = router(state);
    tracing::info!("kirana-commerce listening on {}", config.bind_addr);
    axum::serve(tokio::net::TcpListener::bind(&config.bind_addr).await?, app).await?;
    Ok(())
}
