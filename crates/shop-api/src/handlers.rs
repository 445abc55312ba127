//! # Request Handlers
//!
//! Axum request handlers for the storefront API.
//! Every cart handler locks that cart's engine for the duration of the call.
//! Read-only handlers never keep a cart open; emptied carts are closed.

use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shop_core::{
    CartLine, CheckoutSummary, CustomerDetails, OrderReceipt, PricingEngine, ShippingMethod,
    ShopError,
};
use tracing::{error, info, instrument};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Add item request
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: String,
}

/// Change quantity request
#[derive(Debug, Deserialize)]
pub struct ChangeQuantityRequest {
    /// Signed change; a result of zero or less removes the line
    pub delta: i64,
}

/// Apply promo code request
#[derive(Debug, Deserialize)]
pub struct ApplyPromoRequest {
    pub code: String,
    #[serde(default)]
    pub email: String,
    /// Shipping method for the returned summary
    #[serde(default)]
    pub shipping: ShippingMethod,
}

/// Summary query string
#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    #[serde(default)]
    pub shipping: Option<String>,
}

/// Checkout request
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub customer: CustomerDetails,
    #[serde(default)]
    pub shipping: ShippingMethod,
}

/// Cart contents
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub cart_id: String,
    pub lines: Vec<CartLine>,
    pub item_count: u32,
    pub subtotal: Decimal,
    pub subtotal_display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,
}

impl CartResponse {
    fn from_engine(engine: &PricingEngine) -> Self {
        let subtotal = engine.subtotal();
        Self {
            cart_id: engine.cart_id().to_string(),
            lines: engine.cart().lines().to_vec(),
            item_count: engine.item_count(),
            subtotal: subtotal.amount,
            subtotal_display: subtotal.display(),
            promo_code: engine.active_promo().map(|p| p.code.clone()),
        }
    }
}

/// Applied promo code
#[derive(Debug, Serialize)]
pub struct PromoResponse {
    pub code: String,
    pub description: String,
    pub rate: Decimal,
    pub summary: SummaryResponse,
}

/// Checkout summary with display strings
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    #[serde(flatten)]
    pub summary: CheckoutSummary,
    pub shipping_label: String,
    pub subtotal_display: String,
    pub discount_display: String,
    pub delivery_display: String,
    pub total_display: String,
}

impl From<CheckoutSummary> for SummaryResponse {
    fn from(summary: CheckoutSummary) -> Self {
        Self {
            shipping_label: summary.shipping_method.label().to_string(),
            subtotal_display: summary.price(summary.subtotal).display(),
            discount_display: summary.discount_display(),
            delivery_display: summary.delivery_display(),
            total_display: summary.total_display(),
            summary,
        }
    }
}

/// Placed order
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    #[serde(flatten)]
    pub receipt: OrderReceipt,
    pub total_display: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn shop_error_to_response(err: ShopError) -> ApiError {
    let code = err.status_code();
    let mut response = ErrorResponse::new(err.to_string(), code);
    if err.is_user_correctable() {
        response = response.with_details("user_correctable");
    }
    (StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR), Json(response))
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "storefront",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// List available products
pub async fn list_products(State(state): State<AppState>) -> impl IntoResponse {
    let catalog = state.shop.catalog();
    let products: Vec<_> = catalog.available_products().collect();
    Json(serde_json::json!({
        "currency": catalog.currency,
        "products": products,
        "count": products.len()
    }))
}

/// Get single product
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.shop.catalog().get(&product_id).ok_or_else(|| {
        shop_error_to_response(ShopError::ProductNotFound {
            product_id: product_id.clone(),
        })
    })?;

    Ok(Json(product.clone()))
}

/// Cart contents
pub async fn get_cart(
    State(state): State<AppState>,
    Path(cart_id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let engine = state.peek_engine(&cart_id).await.map_err(shop_error_to_response)?;
    let engine = engine.lock().await;
    Ok(Json(CartResponse::from_engine(&engine)))
}

/// Empty the cart
#[instrument(skip(state))]
pub async fn clear_cart(
    State(state): State<AppState>,
    Path(cart_id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let handle = state.engine(&cart_id).await.map_err(shop_error_to_response)?;
    let response = {
        let mut engine = handle.lock().await;
        engine.clear();
        CartResponse::from_engine(&engine)
    };
    drop(handle);

    state.carts.close(&cart_id).await;
    Ok(Json(response))
}

/// Add one unit of a product
#[instrument(skip(state, request), fields(product_id = %request.product_id))]
pub async fn add_item(
    State(state): State<AppState>,
    Path(cart_id): Path<String>,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let engine = state.engine(&cart_id).await.map_err(shop_error_to_response)?;
    let mut engine = engine.lock().await;
    engine
        .add_product(&request.product_id)
        .map_err(shop_error_to_response)?;
    Ok(Json(CartResponse::from_engine(&engine)))
}

/// Change a line's quantity by a signed delta
#[instrument(skip(state, request), fields(delta = request.delta))]
pub async fn change_quantity(
    State(state): State<AppState>,
    Path((cart_id, product_id)): Path<(String, String)>,
    Json(request): Json<ChangeQuantityRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let engine = state.engine(&cart_id).await.map_err(shop_error_to_response)?;
    let mut engine = engine.lock().await;
    engine.change_quantity(&product_id, request.delta);
    Ok(Json(CartResponse::from_engine(&engine)))
}

/// Remove a line
#[instrument(skip(state))]
pub async fn remove_item(
    State(state): State<AppState>,
    Path((cart_id, product_id)): Path<(String, String)>,
) -> Result<Json<CartResponse>, ApiError> {
    let engine = state.engine(&cart_id).await.map_err(shop_error_to_response)?;
    let mut engine = engine.lock().await;
    engine.remove_item(&product_id);
    Ok(Json(CartResponse::from_engine(&engine)))
}

/// Apply a promo code for a customer email
#[instrument(skip(state, request), fields(code = %request.code))]
pub async fn apply_promo(
    State(state): State<AppState>,
    Path(cart_id): Path<String>,
    Json(request): Json<ApplyPromoRequest>,
) -> Result<Json<PromoResponse>, ApiError> {
    let engine = state.engine(&cart_id).await.map_err(shop_error_to_response)?;
    let mut engine = engine.lock().await;
    let promo = engine
        .apply_promo_code(&request.code, &request.email)
        .map_err(|e| {
            info!("Promo code rejected: {}", e);
            shop_error_to_response(e)
        })?;

    Ok(Json(PromoResponse {
        code: promo.code,
        description: promo.description,
        rate: promo.rate,
        summary: engine.compute_summary(request.shipping).into(),
    }))
}

/// Abandon checkout and release the active promo code
#[instrument(skip(state))]
pub async fn cancel_checkout(
    State(state): State<AppState>,
    Path(cart_id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let engine = state.engine(&cart_id).await.map_err(shop_error_to_response)?;
    let mut engine = engine.lock().await;
    engine.cancel_checkout();
    Ok(Json(CartResponse::from_engine(&engine)))
}

/// Checkout summary for a shipping method (defaults to collect)
pub async fn get_summary(
    State(state): State<AppState>,
    Path(cart_id): Path<String>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let method = match query.shipping.as_deref() {
        Some(raw) => raw
            .parse::<ShippingMethod>()
            .map_err(|e| shop_error_to_response(ShopError::InvalidRequest(e)))?,
        None => ShippingMethod::default(),
    };

    let engine = state.peek_engine(&cart_id).await.map_err(shop_error_to_response)?;
    let engine = engine.lock().await;
    Ok(Json(engine.compute_summary(method).into()))
}

/// Place the order and return the payment link
#[instrument(skip(state, request), fields(shipping = %request.shipping))]
pub async fn checkout(
    State(state): State<AppState>,
    Path(cart_id): Path<String>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let handle = state.engine(&cart_id).await.map_err(shop_error_to_response)?;
    let receipt = handle
        .lock()
        .await
        .place_order(&request.customer, request.shipping)
        .await
        .map_err(|e| {
            if e.is_user_correctable() {
                info!("Checkout rejected: {}", e);
            } else {
                error!("Checkout failed: {}", e);
            }
            shop_error_to_response(e)
        })?;
    drop(handle);

    info!("Order {} placed for cart {}", receipt.order_id, cart_id);
    state.carts.close(&cart_id).await;

    Ok(Json(CheckoutResponse {
        total_display: receipt.summary.total_display(),
        receipt,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response() {
        let err = ErrorResponse::new("Test error", 400);
        assert_eq!(err.error, "Test error");
        assert_eq!(err.code, 400);
        assert!(err.details.is_none());
    }

    #[test]
    fn test_shop_error_conversion() {
        let (status, Json(body)) = shop_error_to_response(ShopError::InvalidCode {
            code: "BOGUS".into(),
        });
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.details.as_deref(), Some("user_correctable"));

        let (status, Json(body)) = shop_error_to_response(ShopError::Storage("disk full".into()));
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.details.is_none());
    }

    #[test]
    fn test_summary_response_display_fields() {
        let summary = CheckoutSummary::compute(
            Decimal::new(192, 0),
            None,
            ShippingMethod::RegionalDelivery,
            &shop_core::ShippingRates::default(),
            shop_core::Currency::ZAR,
        );

        let response = SummaryResponse::from(summary);
        assert_eq!(response.total_display, "R 392.00");
        assert_eq!(response.shipping_label, "Regional Delivery");

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["shipping_method"], "regional_delivery");
        assert_eq!(json["delivery_is_quote"], false);
    }
}
