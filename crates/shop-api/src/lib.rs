//! # shop-api
//!
//! HTTP API layer for the storefront.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - One `PricingEngine` per cart id, shared promo ledger and stores
//! - REST endpoints for the catalog, carts, promo codes and checkout
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/v1/products` | List products |
//! | GET | `/api/v1/products/{id}` | Get product |
//! | GET / DELETE | `/api/v1/carts/{cart_id}` | View / clear cart |
//! | POST | `/api/v1/carts/{cart_id}/items` | Add item |
//! | PATCH / DELETE | `/api/v1/carts/{cart_id}/items/{product_id}` | Change quantity / remove |
//! | POST / DELETE | `/api/v1/carts/{cart_id}/promo` | Apply code / cancel checkout |
//! | GET | `/api/v1/carts/{cart_id}/summary` | Checkout summary |
//! | POST | `/api/v1/carts/{cart_id}/checkout` | Place order |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState, CartRegistry};
