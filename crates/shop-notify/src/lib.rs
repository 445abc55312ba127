//! # shop-notify
//!
//! Order notifications for the storefront, sent through the EmailJS REST
//! API.
//!
//! The shop owner receives one email per placed order with the customer's
//! contact details, the cart contents and the total to verify against the
//! payment provider. Delivery is advisory: `PricingEngine::place_order`
//! logs a failed send and still hands the customer the payment link.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shop_notify::EmailJsNotifier;
//! use shop_core::{ShopContext, ShopSettings, MemoryStore};
//! use std::sync::Arc;
//!
//! // Create notifier from environment
//! let notifier = EmailJsNotifier::from_env()?;
//!
//! let ctx = ShopContext::new(ShopSettings::default(), Arc::new(MemoryStore::new()))
//!     .with_notifier(Arc::new(notifier));
//! ```

pub mod config;
pub mod emailjs;

// Re-exports
pub use config::EmailJsConfig;
pub use emailjs::EmailJsNotifier;
