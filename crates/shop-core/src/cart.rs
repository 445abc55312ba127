//! # Cart Types
//!
//! Cart line items and the persisted cart snapshot.
//!
//! The cart keeps lines in insertion order and never holds two lines for the
//! same product or a line with zero quantity.

use crate::product::Product;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Highest unit price a cart line may carry
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// A line item in the cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product ID
    pub product_id: String,

    /// Product name (denormalized for display and notifications)
    pub name: String,

    /// Unit price captured when the product was first added
    pub unit_price: Decimal,

    /// Quantity, always >= 1 while the line is in a cart
    pub quantity: u32,
}

impl CartLine {
    /// Create a single-unit line from a product
    pub fn from_product(product: &Product) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.price,
            quantity: 1,
        }
    }

    /// Total price for this line, saturating at `Decimal::MAX`
    pub fn total(&self) -> Decimal {
        self.unit_price
            .checked_mul(Decimal::from(self.quantity))
            .unwrap_or(Decimal::MAX)
    }
}

/// Outcome of a quantity change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    /// Product was not in the cart, or delta was zero
    Unchanged,
    /// Line now holds this quantity
    Updated(u32),
    /// Quantity dropped to zero or below and the line was removed
    Removed,
}

/// Ordered collection of cart lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Lines in display order
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn get(&self, product_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Add one unit of a product, returning the line's new quantity
    pub fn add(&mut self, product: &Product) -> u32 {
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            line.quantity = line.quantity.saturating_add(1);
            return line.quantity;
        }
        self.lines.push(CartLine::from_product(product));
        1
    }

    /// Remove a line entirely. Absent products are ignored.
    pub fn remove(&mut self, product_id: &str) -> Option<CartLine> {
        let index = self.lines.iter().position(|l| l.product_id == product_id)?;
        Some(self.lines.remove(index))
    }

    /// Add a signed delta to a line's quantity; a result <= 0 removes the line.
    pub fn change_quantity(&mut self, product_id: &str, delta: i64) -> QuantityChange {
        if delta == 0 {
            return QuantityChange::Unchanged;
        }
        let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) else {
            return QuantityChange::Unchanged;
        };

        let next = i64::from(line.quantity).saturating_add(delta);
        if next <= 0 {
            self.remove(product_id);
            return QuantityChange::Removed;
        }

        line.quantity = u32::try_from(next).unwrap_or(u32::MAX);
        QuantityChange::Updated(line.quantity)
    }

    /// Remove every line, returning true if anything was removed
    pub fn clear(&mut self) -> bool {
        let had_lines = !self.lines.is_empty();
        self.lines.clear();
        had_lines
    }

    /// Sum of quantity x unit price over all lines
    pub fn subtotal(&self) -> Decimal {
        self.lines
            .iter()
            .fold(Decimal::ZERO, |acc, l| acc.checked_add(l.total()).unwrap_or(Decimal::MAX))
    }

    /// Sum of quantities over all lines
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |acc, l| acc.saturating_add(l.quantity))
    }

    /// Serializable snapshot of the current lines
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            lines: self.lines.iter().map(StoredLine::from).collect(),
            promo: None,
        }
    }

    /// Rebuild a cart from a stored snapshot.
    ///
    /// Malformed lines (no id, no positive quantity, missing, negative or
    /// out-of-range price) are dropped; repeated ids are merged into the first occurrence.
    pub fn from_snapshot(snapshot: CartSnapshot) -> Self {
        let mut cart = Cart::new();

        for (index, stored) in snapshot.lines.into_iter().enumerate() {
            let Some(line) = stored.validate() else {
                warn!(index, "dropping malformed cart line from snapshot");
                continue;
            };

            match cart
                .lines
                .iter_mut()
                .find(|l| l.product_id == line.product_id)
            {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(line.quantity);
                }
                None => cart.lines.push(line),
            }
        }

        cart
    }
}

/// Persisted form of a cart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartSnapshot {
    #[serde(default)]
    pub lines: Vec<StoredLine>,

    /// Promo code reserved for this cart but not yet redeemed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo: Option<StoredPromo>,
}

/// A pending promo reservation as found in storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPromo {
    pub code: String,
    pub email: String,
}

/// A cart line as found in storage.
///
/// Every field is optional so that partially written or legacy records
/// (`{"id", "name", "price", "qty"}`) still deserialize and can be checked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredLine {
    #[serde(default, alias = "id")]
    pub product_id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, alias = "price")]
    pub unit_price: Option<Decimal>,

    #[serde(default, alias = "qty")]
    pub quantity: Option<i64>,
}

impl StoredLine {
    fn validate(self) -> Option<CartLine> {
        let product_id = self.product_id.filter(|id| !id.trim().is_empty())?;
        let unit_price = self
            .unit_price
            .filter(|p| !p.is_sign_negative() && *p <= MAX_UNIT_PRICE)?;
        let quantity = self
            .quantity
            .filter(|q| *q > 0)
            .and_then(|q| u32::try_from(q).ok())?;
        let name = self.name.unwrap_or_else(|| product_id.clone());

        Some(CartLine {
            product_id,
            name,
            unit_price,
            quantity,
        })
    }
}

impl From<&CartLine> for StoredLine {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: Some(line.product_id.clone()),
            name: Some(line.name.clone()),
            unit_price: Some(line.unit_price),
            quantity: Some(i64::from(line.quantity)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spicy() -> Product {
        Product::new("spicy-pickled", "Spicy Pickled Cucamelons", Decimal::new(96, 0))
    }

    fn punnet() -> Product {
        Product::new("fresh-punnet", "Fresh Cucamelons (250g)", Decimal::new(40, 0))
    }

    #[test]
    fn test_adding_twice_merges_lines() {
        let mut cart = Cart::new();
        assert_eq!(cart.add(&spicy()), 1);
        assert_eq!(cart.add(&spicy()), 2);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.subtotal(), Decimal::new(192, 0));
    }

    #[test]
    fn test_insertion_order_is_display_order() {
        let mut cart = Cart::new();
        cart.add(&punnet());
        cart.add(&spicy());
        cart.add(&punnet());

        let ids: Vec<_> = cart.lines().iter().map(|l| l.product_id.as_str()).collect();
        assert_eq!(ids, vec!["fresh-punnet", "spicy-pickled"]);
    }

    #[test]
    fn test_change_quantity_removes_at_zero() {
        let mut cart = Cart::new();
        cart.add(&spicy());
        cart.add(&spicy());

        assert_eq!(cart.change_quantity("spicy-pickled", -2), QuantityChange::Removed);
        assert!(cart.is_empty());
        assert_eq!(cart.change_quantity("spicy-pickled", -1), QuantityChange::Unchanged);
        assert_eq!(cart.item_count(), 0);
    }

    #[test]
    fn test_change_quantity_clamps_by_removal() {
        let mut cart = Cart::new();
        cart.add(&spicy());

        assert_eq!(cart.change_quantity("spicy-pickled", -10), QuantityChange::Removed);
        assert!(cart.get("spicy-pickled").is_none());
    }

    #[test]
    fn test_change_quantity_updates_and_ignores_unknown() {
        let mut cart = Cart::new();
        cart.add(&spicy());

        assert_eq!(cart.change_quantity("spicy-pickled", 3), QuantityChange::Updated(4));
        assert_eq!(cart.change_quantity("spicy-pickled", 0), QuantityChange::Unchanged);
        assert_eq!(cart.change_quantity("nope", 5), QuantityChange::Unchanged);
        assert_eq!(cart.item_count(), 4);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Cart::new();
        cart.add(&punnet());

        assert!(cart.remove("spicy-pickled").is_none());
        assert_eq!(cart.len(), 1);
        assert!(cart.remove("fresh-punnet").is_some());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_price_is_snapshotted_at_add() {
        let mut cart = Cart::new();
        cart.add(&spicy());

        let repriced = Product::new("spicy-pickled", "Spicy", Decimal::new(100, 0));
        cart.add(&repriced);

        assert_eq!(cart.get("spicy-pickled").unwrap().unit_price, Decimal::new(96, 0));
    }

    #[test]
    fn test_snapshot_restores_cart() {
        let mut cart = Cart::new();
        cart.add(&spicy());
        cart.add(&punnet());
        cart.add(&spicy());

        let restored = Cart::from_snapshot(cart.snapshot());
        assert_eq!(restored, cart);
    }

    #[test]
    fn test_snapshot_drops_malformed_lines() {
        let snapshot: CartSnapshot = serde_json::from_str(
            r#"{"lines": [
                {"product_id": "spicy-pickled", "name": "Spicy", "unit_price": "96.00", "quantity": 2},
                {"product_id": "", "unit_price": "10", "quantity": 1},
                {"product_id": "ghost", "quantity": 1},
                {"product_id": "negative", "unit_price": "-5", "quantity": 1},
                {"product_id": "zero", "unit_price": "5", "quantity": 0},
                {"product_id": "spicy-pickled", "unit_price": "99", "quantity": 1}
            ]}"#,
        )
        .unwrap();

        let cart = Cart::from_snapshot(snapshot);
        assert_eq!(cart.len(), 1);
        let line = cart.get("spicy-pickled").unwrap();
        assert_eq!(line.quantity, 3);
        assert_eq!(line.unit_price, Decimal::new(96, 0));
    }

    #[test]
    fn test_snapshot_drops_out_of_range_prices() {
        let mut snapshot = CartSnapshot::default();
        snapshot.lines.push(StoredLine {
            product_id: Some("huge".into()),
            name: None,
            unit_price: Some(Decimal::MAX),
            quantity: Some(3),
        });
        snapshot.lines.push(StoredLine {
            product_id: Some("spicy-pickled".into()),
            name: None,
            unit_price: Some(Decimal::new(96, 0)),
            quantity: Some(1),
        });

        let cart = Cart::from_snapshot(snapshot);
        assert!(cart.get("huge").is_none());
        assert_eq!(cart.subtotal(), Decimal::new(96, 0));
    }

    #[test]
    fn test_line_total_saturates_instead_of_overflowing() {
        let line = CartLine {
            product_id: "huge".into(),
            name: "Huge".into(),
            unit_price: Decimal::MAX,
            quantity: u32::MAX,
        };
        assert_eq!(line.total(), Decimal::MAX);
    }

    #[test]
    fn test_snapshot_accepts_legacy_field_names() {
        let snapshot: CartSnapshot = serde_json::from_str(
            r#"{"lines": [{"id": "pickled-mix", "name": "Pickled Mix", "price": 80, "qty": 1}]}"#,
        )
        .unwrap();

        let cart = Cart::from_snapshot(snapshot);
        assert_eq!(cart.subtotal(), Decimal::new(80, 0));
    }
}
