use std::sync::Arc;

use anyhow::Context;
use rust_decimal_macros::dec;
use tokio::signal;
use tracing::info;

use checkout_api as api;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    let (event_tx, event_rx) = api::events::channel(1024);
    tokio::spawn(api::events::process_events(event_rx));

    let orders = Arc::new(api::repositories::InMemoryOrderRepository::new());
    let carts = Arc::new(api::repositories::InMemoryCartStore::new());
    let products = Arc::new(api::repositories::InMemoryProductLookup::new());
    seed_catalog(&products);

    let state = api::AppState::build(cfg.clone(), event_tx, orders, carts, products)
        .map_err(|e| anyhow::anyhow!("failed to build application state: {}", e))?;

    let addr = cfg.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("listening on {}", addr);

    axum::serve(listener, api::app_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

// Demo catalog until a real product backend is attached.
fn seed_catalog(products: &api::repositories::InMemoryProductLookup) {
    products.insert(1, "Espresso", dec!(30000));
    products.insert(2, "Cappuccino", dec!(42000));
    products.insert(3, "Vietnamese Iced Coffee", dec!(38000));
    products.insert(4, "Croissant", dec!(34000));
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", err);
        return;
    }
    info!("shutdown signal received");
}
