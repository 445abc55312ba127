//! # Storefront
//!
//! Cart, promo code and checkout service for the shop front end.
//!
//! ## Usage
//!
//! ```bash
//! # Optional: persist carts and promo usage
//! export DATA_DIR=./data
//!
//! # Optional: email the shop owner on every order
//! export EMAILJS_SERVICE_ID=service_...
//! export EMAILJS_TEMPLATE_ID=template_...
//! export EMAILJS_PUBLIC_KEY=...
//!
//! # Run the server
//! storefront
//! ```

use shop_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    // Initialize application state
    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Products loaded: {}", state.shop.catalog().len());
    info!("Promo codes: {}", state.shop.promos().len());
    info!(
        "Store: {}, notifier: {}",
        state.shop.store().store_name(),
        state.shop.notifier().notifier_name()
    );

    // Create router
    let app = routes::create_router(state);

    info!("Storefront starting on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Cart: POST http://{}/api/v1/carts/{{cart_id}}/items", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Human-readable logs by default, JSON lines with `LOG_FORMAT=json`
fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
}
