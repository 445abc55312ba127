//! # shop-core
//!
//! Cart, pricing and checkout engine for the storefront.
//!
//! This crate provides:
//! - `PricingEngine` owning one cart, its active promo code and the checkout summary
//! - `Product` and `ProductCatalog` for the product catalog
//! - `PromoCatalog` and `RedemptionLedger` for once-per-email promo codes
//! - `ShippingMethod` and `ShippingRates` for delivery costs
//! - `ShopStore` with memory, JSON file and fallback implementations
//! - `OrderNotifier` trait for order notifications
//! - `ShopError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use shop_core::{MemoryStore, PricingEngine, ShippingMethod, ShopContext, ShopSettings};
//! use std::sync::Arc;
//!
//! let ctx = Arc::new(ShopContext::new(ShopSettings::default(), Arc::new(MemoryStore::new())));
//! let mut engine = PricingEngine::open(ctx, "web-42")?;
//!
//! engine.add_product("spicy-pickled")?;
//! engine.add_product("spicy-pickled")?;
//! engine.apply_promo_code("FRESH10", "jo@example.com")?;
//!
//! let summary = engine.compute_summary(ShippingMethod::Collect);
//! assert_eq!(summary.total_display(), "R 172.80");
//!
//! let receipt = engine.place_order(&customer, ShippingMethod::Collect).await?;
//! // Redirect the customer to receipt.payment_url
//! ```

pub mod cart;
pub mod engine;
pub mod error;
pub mod notify;
pub mod order;
pub mod product;
pub mod promo;
pub mod settings;
pub mod shipping;
pub mod store;

// Re-exports for convenience
pub use cart::{
    Cart, CartLine, CartSnapshot, QuantityChange, StoredLine, StoredPromo, MAX_UNIT_PRICE,
};
pub use engine::{CartEvent, CartObserver, LoggingObserver, PricingEngine, ShopContext};
pub use error::{ShopError, ShopResult};
pub use notify::{BoxedNotifier, LoggingNotifier, OrderNotifier};
pub use order::{
    Address, CheckoutSummary, CustomerDetails, OrderNotification, OrderReceipt, PaymentLink,
};
pub use product::{round_currency, Currency, Price, Product, ProductCatalog};
pub use promo::{PromoCatalog, PromoCode, RedemptionLedger, RedemptionRecord};
pub use settings::ShopSettings;
pub use shipping::{ShippingMethod, ShippingRates};
pub use store::{FallbackStore, JsonFileStore, MemoryStore, ShopStore};
