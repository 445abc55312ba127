//! # Order Types
//!
//! Customer details, the checkout summary and the records produced when an
//! order is placed.

use crate::cart::CartLine;
use crate::error::{ShopError, ShopResult};
use crate::product::{Currency, Price};
use crate::promo::PromoCode;
use crate::shipping::{ShippingMethod, ShippingRates};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Canonical form of an email address (trimmed, lower-case)
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Loose plausibility check: one `@`, a non-empty local part and a dotted domain
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Street address for delivery orders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub town: String,
    pub postal_code: String,
}

impl Address {
    pub fn new(
        street: impl Into<String>,
        town: impl Into<String>,
        postal_code: impl Into<String>,
    ) -> Self {
        Self {
            street: street.into(),
            town: town.into(),
            postal_code: postal_code.into(),
        }
    }

    fn is_complete(&self) -> bool {
        [&self.street, &self.town, &self.postal_code]
            .iter()
            .all(|part| !part.trim().is_empty())
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}, {}", self.street, self.town, self.postal_code)
    }
}

/// Contact details captured at checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

impl CustomerDetails {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: String::new(),
            address: None,
        }
    }

    /// Builder: set phone number
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = phone.into();
        self
    }

    /// Builder: set delivery address
    pub fn with_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    /// Check the details are enough to place an order with `method`
    pub fn validate(&self, method: ShippingMethod) -> ShopResult<()> {
        if self.name.trim().is_empty() {
            return Err(ShopError::InvalidRequest("customer name is required".into()));
        }
        if !is_valid_email(&self.email) {
            return Err(ShopError::EmailRequired);
        }
        if method.requires_address() && !self.address.as_ref().is_some_and(Address::is_complete) {
            return Err(ShopError::AddressRequired);
        }
        Ok(())
    }

    /// Address as printed on the order
    pub fn address_line(&self, method: ShippingMethod) -> String {
        match (&self.address, method.requires_address()) {
            (Some(address), true) => address.to_string(),
            _ => "Collection (No Address Required)".to_string(),
        }
    }
}

/// Derived checkout totals. Recomputed on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSummary {
    pub currency: Currency,
    pub shipping_method: ShippingMethod,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub delivery_cost: Decimal,
    pub total: Decimal,
    /// Delivery will be priced later; `total` excludes it
    pub delivery_is_quote: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,
}

impl CheckoutSummary {
    /// Totals for a subtotal, an optional active promo and a shipping method
    pub fn compute(
        subtotal: Decimal,
        promo: Option<&PromoCode>,
        method: ShippingMethod,
        rates: &ShippingRates,
        currency: Currency,
    ) -> Self {
        let discount_amount = promo
            .map(|p| p.discount_on(subtotal))
            .unwrap_or(Decimal::ZERO);
        let delivery_cost = rates.delivery_cost(method, subtotal);

        Self {
            currency,
            shipping_method: method,
            subtotal,
            discount_amount,
            delivery_cost,
            total: subtotal - discount_amount + delivery_cost,
            delivery_is_quote: method.is_quote(),
            promo_code: promo.map(|p| p.code.clone()),
        }
    }

    pub fn price(&self, amount: Decimal) -> Price {
        Price::new(amount, self.currency)
    }

    /// Total for display, flagging a pending delivery quote
    pub fn total_display(&self) -> String {
        let total = self.price(self.total).display();
        if self.delivery_is_quote {
            format!("{} + Delivery Quote", total)
        } else {
            total
        }
    }

    /// Delivery row for display
    pub fn delivery_display(&self) -> String {
        if self.delivery_is_quote {
            "To Be Quoted".to_string()
        } else {
            self.price(self.delivery_cost).display()
        }
    }

    /// Discount row for display
    pub fn discount_display(&self) -> String {
        if self.discount_amount > Decimal::ZERO {
            format!("- {}", self.price(self.discount_amount).display())
        } else {
            self.price(Decimal::ZERO).display()
        }
    }
}

/// Everything the shop owner needs to fulfil an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderNotification {
    pub order_id: String,
    pub customer: CustomerDetails,
    pub shipping_label: String,
    pub address_line: String,
    /// One "2x Name (R 96.00)" entry per line
    pub cart_details: String,
    /// "FRESH10 (10% off)" or "None"
    pub promo_label: String,
    pub summary: CheckoutSummary,
}

impl OrderNotification {
    pub fn new(
        order_id: impl Into<String>,
        customer: &CustomerDetails,
        lines: &[CartLine],
        promo: Option<&PromoCode>,
        summary: &CheckoutSummary,
    ) -> Self {
        let cart_details = lines
            .iter()
            .map(|l| {
                format!(
                    "{}x {} ({})",
                    l.quantity,
                    l.name,
                    summary.price(l.unit_price).display()
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            order_id: order_id.into(),
            customer: customer.clone(),
            shipping_label: summary.shipping_method.label().to_string(),
            address_line: customer.address_line(summary.shipping_method),
            cart_details,
            promo_label: promo.map(PromoCode::label).unwrap_or_else(|| "None".to_string()),
            summary: summary.clone(),
        }
    }

    /// Message body for the shop owner
    pub fn admin_message(&self) -> String {
        format!(
            "Method: {}\nAddress: {}\nPromo: {}\nDiscount: {}\n\nPAYMENT PENDING - Customer has opened the payment window. Verify payment before fulfilling the order.",
            self.shipping_label,
            self.address_line,
            self.promo_label,
            self.summary.discount_display()
        )
    }
}

/// Hosted card-payment page that accepts the amount as a query parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLink {
    pub base_url: String,
}

impl PaymentLink {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Payment URL for a total (e.g., "https://pay.example.com/shop?amount=172.80")
    pub fn url_for(&self, total: Decimal) -> String {
        let separator = if self.base_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}amount={:.2}",
            self.base_url,
            separator,
            crate::product::round_currency(total)
        )
    }
}

impl Default for PaymentLink {
    fn default() -> Self {
        Self::new("https://pay.example.com/storefront")
    }
}

/// Result of a placed order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order_id: String,
    pub summary: CheckoutSummary,
    /// Where to send the customer to pay
    pub payment_url: String,
    /// Whether the order notification was delivered
    pub notified: bool,
    pub created_at: DateTime<Utc>,
}
