use kaari_payment_gateway::{config, orders, router, AppState};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Load configuration
    let config = config::Config::from_env()?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.is_production() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!("Starting Kaari payment gateway");
    tracing::info!("Environment: {}", config.server.environment);
    tracing::info!("Paywall: {}", config.payzone.paywall_url);
    if !config.payzone.has_custom_credentials() {
        tracing::warn!("Payzone sandbox credentials in use");
    }

    let order_store = orders::from_config(&config.order_store)?;
    if config.order_store.url.is_none() {
        tracing::warn!("ORDER_STORE_URL not set, paid orders are kept in memory only");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = router(AppState::new(config, order_store));

    tracing::info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
