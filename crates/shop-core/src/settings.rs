//! # Shop Settings
//!
//! Reference data and pricing configuration, loaded from `config/shop.toml`.
//!
//! ```toml
//! currency = "zar"
//! payment_link = "https://pay.example.com/storefront"
//!
//! [shipping]
//! regional_fee = "200.00"
//! free_shipping_threshold = "750.00"   # optional
//!
//! [[promo_codes]]
//! code = "FRESH10"
//! rate = "0.10"
//! description = "10% off"
//!
//! [[products]]
//! id = "spicy-pickled"
//! name = "Spicy Pickled Cucamelons"
//! price = "96.00"
//! size = "455ml Bottle"
//! ```

use crate::cart::MAX_UNIT_PRICE;
use crate::error::{ShopError, ShopResult};
use crate::order::PaymentLink;
use crate::product::{Currency, Product, ProductCatalog};
use crate::promo::{PromoCatalog, PromoCode};
use crate::shipping::ShippingRates;
use serde::Deserialize;
use tracing::warn;

/// Validated shop configuration
#[derive(Debug, Clone)]
pub struct ShopSettings {
    pub catalog: ProductCatalog,
    pub promos: PromoCatalog,
    pub shipping: ShippingRates,
    pub payment_link: PaymentLink,
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    #[serde(default)]
    currency: Currency,
    #[serde(default)]
    payment_link: Option<String>,
    #[serde(default)]
    shipping: ShippingRates,
    #[serde(default)]
    promo_codes: Option<Vec<PromoCode>>,
    #[serde(default)]
    products: Vec<Product>,
}

impl ShopSettings {
    /// Parse and validate settings from a TOML document.
    ///
    /// Missing sections fall back to the built-in defaults; an empty product
    /// list falls back to the seeded catalog.
    pub fn from_toml(toml_str: &str) -> ShopResult<Self> {
        let raw: RawSettings =
            toml::from_str(toml_str).map_err(|e| ShopError::Configuration(e.to_string()))?;

        let catalog = if raw.products.is_empty() {
            warn!("settings contain no products, using the seeded catalog");
            ProductCatalog::seeded()
        } else {
            ProductCatalog {
                currency: raw.currency,
                products: raw.products,
            }
        };

        if let Some(product) = catalog.products.iter().find(|p| p.price.is_sign_negative()) {
            return Err(ShopError::Configuration(format!(
                "product {} has a negative price",
                product.id
            )));
        }
        if let Some(product) = catalog.products.iter().find(|p| p.price > MAX_UNIT_PRICE) {
            return Err(ShopError::Configuration(format!(
                "product {} is priced above {}",
                product.id, MAX_UNIT_PRICE
            )));
        }

        let promos = match raw.promo_codes {
            Some(codes) => PromoCatalog::new(codes)?,
            None => PromoCatalog::defaults(),
        };

        Ok(Self {
            catalog,
            promos,
            shipping: raw.shipping,
            payment_link: raw
                .payment_link
                .map(PaymentLink::new)
                .unwrap_or_default(),
        })
    }

    /// Builder: override the payment link
    pub fn with_payment_link(mut self, link: PaymentLink) -> Self {
        self.payment_link = link;
        self
    }
}

impl Default for ShopSettings {
    fn default() -> Self {
        Self {
            catalog: ProductCatalog::seeded(),
            promos: PromoCatalog::defaults(),
            shipping: ShippingRates::default(),
            payment_link: PaymentLink::default(),
        }
    }
}
