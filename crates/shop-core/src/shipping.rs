//! # Shipping
//!
//! Shipping methods and the delivery cost table.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Delivery option chosen at checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingMethod {
    /// Customer collects the order
    #[serde(alias = "pickup")]
    Collect,
    /// Flat-fee delivery inside the home region
    #[serde(alias = "delivery_gauteng")]
    RegionalDelivery,
    /// Outside the region or international, priced later
    #[serde(alias = "delivery_quote")]
    QuoteRequired,
}

impl ShippingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShippingMethod::Collect => "collect",
            ShippingMethod::RegionalDelivery => "regional_delivery",
            ShippingMethod::QuoteRequired => "quote_required",
        }
    }

    /// Label shown to the customer and in order notifications
    pub fn label(&self) -> &'static str {
        match self {
            ShippingMethod::Collect => "Collect",
            ShippingMethod::RegionalDelivery => "Regional Delivery",
            ShippingMethod::QuoteRequired => "Outside Region/International (Quote Required)",
        }
    }

    /// Whether a street address has to be captured
    pub fn requires_address(&self) -> bool {
        !matches!(self, ShippingMethod::Collect)
    }

    /// Whether the delivery cost is settled later by quote
    pub fn is_quote(&self) -> bool {
        matches!(self, ShippingMethod::QuoteRequired)
    }
}

impl Default for ShippingMethod {
    fn default() -> Self {
        ShippingMethod::Collect
    }
}

impl std::fmt::Display for ShippingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ShippingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "collect" | "pickup" => Ok(ShippingMethod::Collect),
            "regional_delivery" | "delivery_gauteng" => Ok(ShippingMethod::RegionalDelivery),
            "quote_required" | "delivery_quote" => Ok(ShippingMethod::QuoteRequired),
            other => Err(format!("unknown shipping method: {}", other)),
        }
    }
}

/// Delivery cost configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRates {
    /// Flat fee for regional delivery
    #[serde(default = "default_regional_fee")]
    pub regional_fee: Decimal,

    /// Subtotal at or above which regional delivery is free
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_shipping_threshold: Option<Decimal>,
}

fn default_regional_fee() -> Decimal {
    Decimal::new(200, 0)
}

impl ShippingRates {
    pub fn flat(regional_fee: Decimal) -> Self {
        Self {
            regional_fee,
            free_shipping_threshold: None,
        }
    }

    /// Builder: waive the regional fee from this subtotal upwards
    pub fn with_free_shipping_from(mut self, threshold: Decimal) -> Self {
        self.free_shipping_threshold = Some(threshold);
        self
    }

    /// Delivery cost for a method given the pre-discount subtotal
    pub fn delivery_cost(&self, method: ShippingMethod, subtotal: Decimal) -> Decimal {
        match method {
            ShippingMethod::Collect | ShippingMethod::QuoteRequired => Decimal::ZERO,
            ShippingMethod::RegionalDelivery => match self.free_shipping_threshold {
                Some(threshold) if subtotal >= threshold => Decimal::ZERO,
                _ => self.regional_fee,
            },
        }
    }
}

impl Default for ShippingRates {
    fn default() -> Self {
        Self::flat(default_regional_fee())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rates() {
        let rates = ShippingRates::default();
        let subtotal = Decimal::new(192, 0);

        assert_eq!(rates.delivery_cost(ShippingMethod::Collect, subtotal), Decimal::ZERO);
        assert_eq!(
            rates.delivery_cost(ShippingMethod::RegionalDelivery, subtotal),
            Decimal::new(200, 0)
        );
        assert_eq!(rates.delivery_cost(ShippingMethod::QuoteRequired, subtotal), Decimal::ZERO);
    }

    #[test]
    fn test_free_shipping_threshold() {
        let rates = ShippingRates::default().with_free_shipping_from(Decimal::new(500, 0));

        assert_eq!(
            rates.delivery_cost(ShippingMethod::RegionalDelivery, Decimal::new(49999, 2)),
            Decimal::new(200, 0)
        );
        assert_eq!(
            rates.delivery_cost(ShippingMethod::RegionalDelivery, Decimal::new(500, 0)),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_parse_methods_and_legacy_names() {
        assert_eq!("collect".parse::<ShippingMethod>(), Ok(ShippingMethod::Collect));
        assert_eq!(
            "delivery_gauteng".parse::<ShippingMethod>(),
            Ok(ShippingMethod::RegionalDelivery)
        );
        assert_eq!(
            " Quote_Required ".parse::<ShippingMethod>(),
            Ok(ShippingMethod::QuoteRequired)
        );
        assert!("drone".parse::<ShippingMethod>().is_err());

        let method: ShippingMethod = serde_json::from_str("\"delivery_quote\"").unwrap();
        assert_eq!(method, ShippingMethod::QuoteRequired);
    }

    #[test]
    fn test_address_requirement() {
        assert!(!ShippingMethod::Collect.requires_address());
        assert!(ShippingMethod::RegionalDelivery.requires_address());
        assert!(ShippingMethod::QuoteRequired.requires_address());
    }
}
