//! # Routes
//!
//! Axum router configuration for the storefront API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Catalog:
///   - GET  /api/v1/products - List available products
///   - GET  /api/v1/products/{id} - Get product by ID
///
/// - Carts:
///   - GET    /api/v1/carts/{cart_id} - Cart contents
///   - DELETE /api/v1/carts/{cart_id} - Clear cart
///   - POST   /api/v1/carts/{cart_id}/items - Add one unit of a product
///   - PATCH  /api/v1/carts/{cart_id}/items/{product_id} - Change quantity
///   - DELETE /api/v1/carts/{cart_id}/items/{product_id} - Remove line
///   - POST   /api/v1/carts/{cart_id}/promo - Apply promo code
///   - DELETE /api/v1/carts/{cart_id}/promo - Cancel checkout, release code
///   - GET    /api/v1/carts/{cart_id}/summary?shipping= - Checkout summary
///   - POST   /api/v1/carts/{cart_id}/checkout - Place order
pub fn create_router(state: AppState) -> Router {
    // The storefront is served from a static host on another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check at root
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        // API v1
        .nest("/api/v1", api_routes())
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    let product_routes = Router::new()
        .route("/products", get(handlers::list_products))
        .route("/products/{product_id}", get(handlers::get_product));

    let cart_routes = Router::new()
        .route(
            "/carts/{cart_id}",
            get(handlers::get_cart).delete(handlers::clear_cart),
        )
        .route("/carts/{cart_id}/items", post(handlers::add_item))
        .route(
            "/carts/{cart_id}/items/{product_id}",
            patch(handlers::change_quantity).delete(handlers::remove_item),
        )
        .route(
            "/carts/{cart_id}/promo",
            post(handlers::apply_promo).delete(handlers::cancel_checkout),
        )
        .route("/carts/{cart_id}/summary", get(handlers::get_summary))
        .route("/carts/{cart_id}/checkout", post(handlers::checkout));

    Router::new().merge(product_routes).merge(cart_routes)
}
