//! # Pricing Engine
//!
//! Owns one cart and the promo code applied to it, and computes checkout
//! summaries from the cart, the active promo and a shipping method.
//!
//! ```text
//!            ┌──────────────── ShopContext (shared) ────────────────┐
//!            │ catalog · promos · shipping · payment link           │
//!            │ store · redemption ledger · notifier                 │
//!            └──────────────────────────┬───────────────────────────┘
//!                                       │
//!   add_item / change_quantity ──▶ PricingEngine ──▶ CartObserver(s)
//!   apply_promo_code           ──▶   (one cart)  ──▶ ShopStore snapshot
//!   compute_summary            ──▶ CheckoutSummary
//!   place_order                ──▶ OrderReceipt (+ OrderNotifier)
//! ```
//!
//! Cart operations never fail: persistence errors are logged and the
//! in-memory cart stays authoritative.

use crate::cart::{Cart, CartSnapshot, QuantityChange, StoredPromo};
use crate::error::{ShopError, ShopResult};
use crate::notify::{BoxedNotifier, LoggingNotifier};
use crate::order::{
    is_valid_email, normalize_email, CheckoutSummary, CustomerDetails, OrderNotification,
    OrderReceipt, PaymentLink,
};
use crate::product::{Price, Product, ProductCatalog};
use crate::promo::{normalize_code, PromoCatalog, PromoCode, RedemptionLedger};
use crate::settings::ShopSettings;
use crate::shipping::{ShippingMethod, ShippingRates};
use crate::store::{validate_cart_id, ShopStore};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Collaborators shared by every engine in a process
pub struct ShopContext {
    settings: ShopSettings,
    store: Arc<dyn ShopStore>,
    ledger: RedemptionLedger,
    notifier: BoxedNotifier,
}

impl ShopContext {
    /// Context with a logging-only notifier
    pub fn new(settings: ShopSettings, store: Arc<dyn ShopStore>) -> Self {
        Self {
            settings,
            ledger: RedemptionLedger::new(store.clone()),
            store,
            notifier: Arc::new(LoggingNotifier),
        }
    }

    /// Builder: set the order notifier
    pub fn with_notifier(mut self, notifier: BoxedNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.settings.catalog
    }

    pub fn promos(&self) -> &PromoCatalog {
        &self.settings.promos
    }

    pub fn shipping(&self) -> &ShippingRates {
        &self.settings.shipping
    }

    pub fn payment_link(&self) -> &PaymentLink {
        &self.settings.payment_link
    }

    pub fn ledger(&self) -> &RedemptionLedger {
        &self.ledger
    }

    pub fn store(&self) -> &Arc<dyn ShopStore> {
        &self.store
    }

    pub fn notifier(&self) -> &BoxedNotifier {
        &self.notifier
    }
}

impl std::fmt::Debug for ShopContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopContext")
            .field("products", &self.settings.catalog.len())
            .field("promo_codes", &self.settings.promos.len())
            .field("store", &self.store.store_name())
            .field("notifier", &self.notifier.notifier_name())
            .finish()
    }
}

/// Something that happened to a cart
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    ItemAdded { product_id: String, quantity: u32 },
    QuantityChanged { product_id: String, quantity: u32 },
    ItemRemoved { product_id: String },
    Cleared,
    PromoApplied { code: String },
    PromoCleared { code: String },
    OrderPlaced { order_id: String },
}

/// Receives cart events after the cart has been updated and persisted.
pub trait CartObserver: Send + Sync {
    fn on_cart_event(&self, cart_id: &str, event: &CartEvent, cart: &Cart);
}

/// Observer that writes every event to the debug log
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl CartObserver for LoggingObserver {
    fn on_cart_event(&self, cart_id: &str, event: &CartEvent, cart: &Cart) {
        debug!(
            cart_id,
            items = cart.item_count(),
            subtotal = %cart.subtotal(),
            "cart event: {:?}",
            event
        );
    }
}

#[derive(Debug, Clone)]
struct ActivePromo {
    promo: PromoCode,
    email: String,
}

/// Cart state plus the pricing rules applied to it
pub struct PricingEngine {
    cart_id: String,
    ctx: Arc<ShopContext>,
    cart: Cart,
    active_promo: Option<ActivePromo>,
    observers: Vec<Arc<dyn CartObserver>>,
}

impl PricingEngine {
    /// Open the engine for a cart, rehydrating the last saved snapshot.
    ///
    /// A missing or unreadable snapshot yields an empty cart. A promo code
    /// that was reserved but not redeemed becomes active again.
    pub fn open(ctx: Arc<ShopContext>, cart_id: impl Into<String>) -> ShopResult<Self> {
        let cart_id = cart_id.into();
        validate_cart_id(&cart_id)?;

        let mut snapshot = match ctx.store.load_cart(&cart_id) {
            Ok(snapshot) => snapshot.unwrap_or_default(),
            Err(e) => {
                warn!(cart_id = %cart_id, store = ctx.store.store_name(), "failed to load cart, starting empty: {}", e);
                CartSnapshot::default()
            }
        };

        let active_promo = snapshot
            .promo
            .take()
            .and_then(|stored| restore_promo(&ctx, &cart_id, stored));
        let cart = Cart::from_snapshot(snapshot);

        debug!(
            cart_id = %cart_id,
            lines = cart.len(),
            promo = active_promo.as_ref().map(|a| a.promo.code.as_str()),
            "opened cart"
        );

        Ok(Self {
            cart_id,
            ctx,
            cart,
            active_promo,
            observers: Vec::new(),
        })
    }

    /// Register an observer for cart events
    pub fn subscribe(&mut self, observer: Arc<dyn CartObserver>) {
        self.observers.push(observer);
    }

    pub fn cart_id(&self) -> &str {
        &self.cart_id
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn context(&self) -> &Arc<ShopContext> {
        &self.ctx
    }

    /// Currently applied promo code, if any
    pub fn active_promo(&self) -> Option<&PromoCode> {
        self.active_promo.as_ref().map(|a| &a.promo)
    }

    /// Add one unit of `product`
    pub fn add_item(&mut self, product: &Product) {
        let quantity = self.cart.add(product);
        self.commit_change(CartEvent::ItemAdded {
            product_id: product.id.clone(),
            quantity,
        });
    }

    /// Add one unit of a catalog product by id
    pub fn add_product(&mut self, product_id: &str) -> ShopResult<()> {
        let ctx = Arc::clone(&self.ctx);
        let product = ctx
            .catalog()
            .get(product_id)
            .ok_or_else(|| ShopError::ProductNotFound {
                product_id: product_id.to_string(),
            })?;

        if !product.available {
            return Err(ShopError::ProductUnavailable {
                product_id: product_id.to_string(),
            });
        }

        self.add_item(product);
        Ok(())
    }

    /// Remove a product's line. Absent products are ignored.
    pub fn remove_item(&mut self, product_id: &str) {
        if self.cart.remove(product_id).is_some() {
            self.commit_change(CartEvent::ItemRemoved {
                product_id: product_id.to_string(),
            });
        }
    }

    /// Add a signed delta to a line's quantity; dropping to zero removes it
    pub fn change_quantity(&mut self, product_id: &str, delta: i64) {
        let event = match self.cart.change_quantity(product_id, delta) {
            QuantityChange::Unchanged => return,
            QuantityChange::Updated(quantity) => CartEvent::QuantityChanged {
                product_id: product_id.to_string(),
                quantity,
            },
            QuantityChange::Removed => CartEvent::ItemRemoved {
                product_id: product_id.to_string(),
            },
        };
        self.commit_change(event);
    }

    /// Empty the cart
    pub fn clear(&mut self) {
        self.cart.clear();
        self.commit_change(CartEvent::Cleared);
    }

    /// Sum of quantity x price over all lines
    pub fn subtotal(&self) -> Price {
        Price::new(self.cart.subtotal(), self.ctx.catalog().currency)
    }

    /// Sum of quantities over all lines
    pub fn item_count(&self) -> u32 {
        self.cart.item_count()
    }

    /// Apply a promo code for a customer email.
    ///
    /// The code is reserved for the email straight away; it is committed when
    /// the order is placed and released by [`cancel_checkout`]. A new code
    /// replaces the active one, which stays reserved.
    ///
    /// [`cancel_checkout`]: PricingEngine::cancel_checkout
    pub fn apply_promo_code(&mut self, code: &str, email: &str) -> ShopResult<PromoCode> {
        if !is_valid_email(email) {
            return Err(ShopError::EmailRequired);
        }

        let promo = self
            .ctx
            .promos()
            .get(code)
            .cloned()
            .ok_or_else(|| ShopError::InvalidCode {
                code: normalize_code(code),
            })?;

        let email = normalize_email(email);
        self.ctx.ledger.reserve(&email, &promo.code)?;

        if let Some(previous) = &self.active_promo {
            info!(cart_id = %self.cart_id, previous = %previous.promo.code, "replacing active promo code");
        }
        info!(cart_id = %self.cart_id, code = %promo.code, "promo code applied");

        self.active_promo = Some(ActivePromo {
            promo: promo.clone(),
            email,
        });
        self.commit_change(CartEvent::PromoApplied {
            code: promo.code.clone(),
        });

        Ok(promo)
    }

    /// Totals for the current cart, active promo and `method`
    pub fn compute_summary(&self, method: ShippingMethod) -> CheckoutSummary {
        CheckoutSummary::compute(
            self.cart.subtotal(),
            self.active_promo(),
            method,
            self.ctx.shipping(),
            self.ctx.catalog().currency,
        )
    }

    /// Abandon checkout: release the active code's reservation
    pub fn cancel_checkout(&mut self) {
        let Some(active) = self.active_promo.take() else {
            return;
        };
        if let Err(e) = self.ctx.ledger.release(&active.email, &active.promo.code) {
            warn!(cart_id = %self.cart_id, "failed to release promo reservation: {}", e);
        }
        self.commit_change(CartEvent::PromoCleared {
            code: active.promo.code,
        });
    }

    /// Submit the order.
    ///
    /// Sends the order notification (failures are logged, not returned),
    /// commits the active promo redemption, clears the cart and returns the
    /// receipt with the payment URL.
    #[instrument(skip(self, customer), fields(cart_id = %self.cart_id, shipping = %method))]
    pub async fn place_order(
        &mut self,
        customer: &CustomerDetails,
        method: ShippingMethod,
    ) -> ShopResult<OrderReceipt> {
        if self.cart.is_empty() {
            return Err(ShopError::EmptyCart);
        }
        customer.validate(method)?;

        let summary = self.compute_summary(method);
        let order_id = Uuid::new_v4().to_string();
        let notification = OrderNotification::new(
            order_id.as_str(),
            customer,
            self.cart.lines(),
            self.active_promo(),
            &summary,
        );

        let notifier = Arc::clone(&self.ctx.notifier);
        let notified = match notifier.notify(&notification).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    order_id = %order_id,
                    notifier = notifier.notifier_name(),
                    "order notification failed, continuing to payment: {}",
                    e
                );
                false
            }
        };

        if let Some(active) = self.active_promo.take() {
            if let Err(e) = self.ctx.ledger.commit(&active.email, &active.promo.code) {
                warn!(order_id = %order_id, "failed to commit promo redemption: {}", e);
            }
        }

        let payment_url = self.ctx.payment_link().url_for(summary.total);
        info!(order_id = %order_id, total = %summary.total_display(), notified, "order placed");

        self.cart.clear();
        self.commit_change(CartEvent::OrderPlaced {
            order_id: order_id.clone(),
        });

        Ok(OrderReceipt {
            order_id,
            summary,
            payment_url,
            notified,
            created_at: Utc::now(),
        })
    }

    fn snapshot(&self) -> CartSnapshot {
        let mut snapshot = self.cart.snapshot();
        snapshot.promo = self.active_promo.as_ref().map(|a| StoredPromo {
            code: a.promo.code.clone(),
            email: a.email.clone(),
        });
        snapshot
    }

    fn commit_change(&mut self, event: CartEvent) {
        if let Err(e) = self.ctx.store.save_cart(&self.cart_id, &self.snapshot()) {
            warn!(cart_id = %self.cart_id, store = self.ctx.store.store_name(), "failed to persist cart: {}", e);
        }
        self.emit(&event);
    }

    fn emit(&self, event: &CartEvent) {
        for observer in &self.observers {
            observer.on_cart_event(&self.cart_id, event, &self.cart);
        }
    }
}

/// Reactivate a stored reservation if the code is still offered and the
/// ledger still holds it, uncommitted, for the email. Codes dropped from the catalog are
/// released.
fn restore_promo(ctx: &ShopContext, cart_id: &str, stored: StoredPromo) -> Option<ActivePromo> {
    let Some(promo) = ctx.promos().get(&stored.code).cloned() else {
        warn!(cart_id, code = %stored.code, "stored promo code is no longer offered, releasing it");
        if let Err(e) = ctx.ledger.release(&stored.email, &stored.code) {
            warn!(cart_id, "failed to release promo reservation: {}", e);
        }
        return None;
    };

    if !ctx.ledger.is_reserved(&stored.email, &promo.code) {
        debug!(cart_id, code = %promo.code, "stored promo reservation no longer held");
        return None;
    }

    Some(ActivePromo {
        promo,
        email: stored.email,
    })
}

impl std::fmt::Debug for PricingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PricingEngine")
            .field("cart_id", &self.cart_id)
            .field("cart", &self.cart)
            .field("active_promo", &self.active_promo().map(|p| &p.code))
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::Address;
    use crate::store::tests::UnavailableStore;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::Mutex;

    fn context() -> Arc<ShopContext> {
        Arc::new(ShopContext::new(
            ShopSettings::default(),
            Arc::new(MemoryStore::new()),
        ))
    }

    fn engine() -> PricingEngine {
        PricingEngine::open(context(), "cart-1").unwrap()
    }

    fn spicy(ctx: &ShopContext) -> Product {
        ctx.catalog().get("spicy-pickled").unwrap().clone()
    }

    /// Notifier that always fails
    struct BrokenNotifier;

    #[async_trait]
    impl crate::notify::OrderNotifier for BrokenNotifier {
        async fn notify(&self, _notification: &OrderNotification) -> ShopResult<()> {
            Err(ShopError::Notification("smtp down".into()))
        }

        fn notifier_name(&self) -> &'static str {
            "broken"
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<CartEvent>>,
    }

    impl CartObserver for RecordingObserver {
        fn on_cart_event(&self, _cart_id: &str, event: &CartEvent, _cart: &Cart) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn test_add_same_product_twice() {
        let mut engine = engine();
        let product = spicy(engine.context());

        engine.add_item(&product);
        engine.add_item(&product);

        assert_eq!(engine.cart().len(), 1);
        assert_eq!(engine.cart().get("spicy-pickled").unwrap().quantity, 2);
        assert_eq!(engine.item_count(), 2);
        assert_eq!(engine.subtotal().amount, Decimal::new(192, 0));
    }

    #[test]
    fn test_add_product_by_id() {
        let mut engine = engine();

        engine.add_product("fresh-punnet").unwrap();
        assert_eq!(engine.item_count(), 1);

        assert_eq!(
            engine.add_product("caviar"),
            Err(ShopError::ProductNotFound {
                product_id: "caviar".into()
            })
        );
    }

    #[test]
    fn test_unavailable_product_rejected() {
        let mut settings = ShopSettings::default();
        settings.catalog = ProductCatalog::new()
            .with_product(Product::new("sold-out", "Sold Out", Decimal::new(50, 0)).unavailable());
        let ctx = Arc::new(ShopContext::new(settings, Arc::new(MemoryStore::new())));
        let mut engine = PricingEngine::open(ctx, "cart-1").unwrap();

        assert!(matches!(
            engine.add_product("sold-out"),
            Err(ShopError::ProductUnavailable { .. })
        ));
        assert!(engine.cart().is_empty());
    }

    #[test]
    fn test_change_quantity_to_zero_removes_line() {
        let mut engine = engine();
        let product = spicy(engine.context());
        engine.add_item(&product);
        engine.add_item(&product);

        engine.change_quantity("spicy-pickled", -2);
        assert!(engine.cart().get("spicy-pickled").is_none());

        engine.change_quantity("spicy-pickled", -1);
        assert!(engine.cart().is_empty());
        assert_eq!(engine.item_count(), 0);
    }

    #[test]
    fn test_item_count_matches_lines_after_mixed_operations() {
        let mut engine = engine();
        let ctx = Arc::clone(engine.context());
        let ids = ["spicy-pickled", "dill-pickled", "fresh-punnet"];

        for (step, id) in ids.iter().cycle().take(12).enumerate() {
            let product = ctx.catalog().get(id).unwrap();
            match step % 4 {
                0 | 1 => engine.add_item(product),
                2 => engine.change_quantity(id, -(step as i64)),
                _ => engine.change_quantity(id, 3),
            }
            if step == 9 {
                engine.remove_item("dill-pickled");
            }

            let lines = engine.cart().lines();
            assert!(lines.iter().all(|l| l.quantity > 0));
            assert_eq!(
                engine.item_count(),
                lines.iter().map(|l| l.quantity).sum::<u32>()
            );
        }
    }

    #[test]
    fn test_remove_absent_item_is_noop() {
        let mut engine = engine();
        let observer = Arc::new(RecordingObserver::default());
        engine.subscribe(observer.clone());

        engine.remove_item("spicy-pickled");

        assert!(engine.cart().is_empty());
        assert!(observer.events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_empty_cart_summary() {
        let engine = engine();

        assert_eq!(engine.subtotal().amount, Decimal::ZERO);
        assert_eq!(engine.compute_summary(ShippingMethod::Collect).total, Decimal::ZERO);
        assert_eq!(
            engine.compute_summary(ShippingMethod::RegionalDelivery).total,
            Decimal::new(200, 0)
        );
    }

    #[test]
    fn test_fresh10_with_collect() {
        let mut engine = engine();
        let product = spicy(engine.context());
        engine.add_item(&product);
        engine.add_item(&product);

        let before = engine.compute_summary(ShippingMethod::Collect);
        engine.apply_promo_code("fresh10", "jo@example.com").unwrap();
        let summary = engine.compute_summary(ShippingMethod::Collect);

        assert_eq!(summary.subtotal, Decimal::new(192, 0));
        assert_eq!(summary.discount_amount, Decimal::new(1920, 2));
        assert_eq!(summary.total, Decimal::new(17280, 2));
        assert_eq!(before.total - summary.total, Decimal::new(1920, 2));
        assert_eq!(summary, engine.compute_summary(ShippingMethod::Collect));
    }

    #[test]
    fn test_regional_delivery_without_code() {
        let mut engine = engine();
        let product = spicy(engine.context());
        engine.add_item(&product);
        engine.add_item(&product);

        let summary = engine.compute_summary(ShippingMethod::RegionalDelivery);
        assert_eq!(summary.total, Decimal::new(392, 0));
        assert!(!summary.delivery_is_quote);
    }

    #[test]
    fn test_promo_errors() {
        let mut engine = engine();

        assert_eq!(
            engine.apply_promo_code("FRESH10", "not-an-email"),
            Err(ShopError::EmailRequired)
        );
        assert_eq!(
            engine.apply_promo_code("bogus", "jo@example.com"),
            Err(ShopError::InvalidCode {
                code: "BOGUS".into()
            })
        );
        assert!(engine.active_promo().is_none());

        engine.apply_promo_code("FRESH10", "jo@example.com").unwrap();
        assert_eq!(
            engine.apply_promo_code("FRESH10", " JO@example.com "),
            Err(ShopError::AlreadyRedeemed {
                code: "FRESH10".into()
            })
        );
    }

    #[test]
    fn test_replacing_code_keeps_previous_reserved() {
        let mut engine = engine();
        engine.apply_promo_code("FRESH10", "jo@example.com").unwrap();
        engine.apply_promo_code("WELCOME15", "jo@example.com").unwrap();

        assert_eq!(engine.active_promo().unwrap().code, "WELCOME15");
        let ledger = engine.context().ledger();
        assert!(ledger.is_redeemed("jo@example.com", "FRESH10"));
        assert!(ledger.is_redeemed("jo@example.com", "WELCOME15"));
    }

    #[test]
    fn test_ledger_shared_between_carts() {
        let ctx = context();
        let mut first = PricingEngine::open(Arc::clone(&ctx), "cart-a").unwrap();
        let mut second = PricingEngine::open(ctx, "cart-b").unwrap();

        first.apply_promo_code("FRESH10", "jo@example.com").unwrap();
        assert!(matches!(
            second.apply_promo_code("FRESH10", "jo@example.com"),
            Err(ShopError::AlreadyRedeemed { .. })
        ));
    }

    #[test]
    fn test_cancel_checkout_releases_code() {
        let mut engine = engine();
        engine.apply_promo_code("FRESH10", "jo@example.com").unwrap();

        engine.cancel_checkout();

        assert!(engine.active_promo().is_none());
        assert!(!engine.context().ledger().is_redeemed("jo@example.com", "FRESH10"));
        engine.apply_promo_code("FRESH10", "jo@example.com").unwrap();
    }

    #[test]
    fn test_reserved_code_survives_restart() {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let restart = || {
            let ctx = Arc::new(ShopContext::new(ShopSettings::default(), store.clone()));
            PricingEngine::open(ctx, "cart-1").unwrap()
        };

        let mut engine = restart();
        engine.add_product("spicy-pickled").unwrap();
        engine.apply_promo_code("FRESH10", "jo@example.com").unwrap();
        drop(engine);

        let mut reopened = restart();
        assert_eq!(reopened.active_promo().unwrap().code, "FRESH10");
        assert_eq!(
            reopened.compute_summary(ShippingMethod::Collect).discount_amount,
            Decimal::new(960, 2)
        );

        reopened.cancel_checkout();
        drop(reopened);

        let mut after_cancel = restart();
        assert!(after_cancel.active_promo().is_none());
        after_cancel.apply_promo_code("FRESH10", "jo@example.com").unwrap();
    }

    #[test]
    fn test_withdrawn_code_is_released_on_open() {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let ctx = Arc::new(ShopContext::new(ShopSettings::default(), store.clone()));
        let mut engine = PricingEngine::open(ctx, "cart-1").unwrap();
        engine.apply_promo_code("WELCOME15", "jo@example.com").unwrap();
        drop(engine);

        let mut settings = ShopSettings::default();
        settings.promos = PromoCatalog::new(vec![PromoCode::new(
            "FRESH10",
            Decimal::new(10, 2),
            "10% off",
        )])
        .unwrap();
        let ctx = Arc::new(ShopContext::new(settings, store));
        let reopened = PricingEngine::open(ctx, "cart-1").unwrap();

        assert!(reopened.active_promo().is_none());
        assert!(!reopened.context().ledger().is_redeemed("jo@example.com", "WELCOME15"));
    }

    #[test]
    fn test_cart_persists_across_engines() {
        let ctx = context();
        let mut engine = PricingEngine::open(Arc::clone(&ctx), "cart-1").unwrap();
        engine.add_product("spicy-pickled").unwrap();
        engine.add_product("spicy-pickled").unwrap();
        drop(engine);

        let reopened = PricingEngine::open(ctx, "cart-1").unwrap();
        assert_eq!(reopened.item_count(), 2);
        assert_eq!(reopened.subtotal().amount, Decimal::new(192, 0));
    }

    #[test]
    fn test_open_rejects_bad_cart_id() {
        assert!(matches!(
            PricingEngine::open(context(), "../secrets"),
            Err(ShopError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_unavailable_store_degrades() {
        let ctx = Arc::new(ShopContext::new(
            ShopSettings::default(),
            Arc::new(UnavailableStore),
        ));
        let mut engine = PricingEngine::open(ctx, "cart-1").unwrap();

        engine.add_product("spicy-pickled").unwrap();
        assert_eq!(engine.item_count(), 1);
        engine.apply_promo_code("FRESH10", "jo@example.com").unwrap();
        assert_eq!(
            engine.compute_summary(ShippingMethod::Collect).discount_amount,
            Decimal::new(960, 2)
        );
    }

    #[test]
    fn test_observer_receives_events() {
        let mut engine = engine();
        let observer = Arc::new(RecordingObserver::default());
        engine.subscribe(observer.clone());

        engine.add_product("spicy-pickled").unwrap();
        engine.change_quantity("spicy-pickled", 2);
        engine.apply_promo_code("FRESH10", "jo@example.com").unwrap();
        engine.change_quantity("spicy-pickled", -5);
        engine.clear();

        let events = observer.events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                CartEvent::ItemAdded {
                    product_id: "spicy-pickled".into(),
                    quantity: 1
                },
                CartEvent::QuantityChanged {
                    product_id: "spicy-pickled".into(),
                    quantity: 3
                },
                CartEvent::PromoApplied {
                    code: "FRESH10".into()
                },
                CartEvent::ItemRemoved {
                    product_id: "spicy-pickled".into()
                },
                CartEvent::Cleared,
            ]
        );
    }

    #[tokio::test]
    async fn test_place_order_commits_and_clears() {
        let mut engine = engine();
        engine.add_product("spicy-pickled").unwrap();
        engine.add_product("spicy-pickled").unwrap();
        engine.apply_promo_code("FRESH10", "jo@example.com").unwrap();

        let customer = CustomerDetails::new("Jo", "jo@example.com");
        let receipt = engine
            .place_order(&customer, ShippingMethod::Collect)
            .await
            .unwrap();

        assert!(receipt.notified);
        assert_eq!(receipt.summary.total, Decimal::new(17280, 2));
        assert!(receipt.payment_url.ends_with("amount=172.80"));
        assert!(engine.cart().is_empty());
        assert!(engine.active_promo().is_none());

        // committed codes survive a cancel
        engine.cancel_checkout();
        assert!(engine.context().ledger().is_redeemed("jo@example.com", "FRESH10"));
    }

    #[tokio::test]
    async fn test_place_order_survives_notifier_failure() {
        let ctx = Arc::new(
            ShopContext::new(ShopSettings::default(), Arc::new(MemoryStore::new()))
                .with_notifier(Arc::new(BrokenNotifier)),
        );
        let mut engine = PricingEngine::open(ctx, "cart-1").unwrap();
        engine.add_product("dill-pickled").unwrap();

        let customer = CustomerDetails::new("Jo", "jo@example.com")
            .with_address(Address::new("1 Main Rd", "Pretoria", "0181"));
        let receipt = engine
            .place_order(&customer, ShippingMethod::RegionalDelivery)
            .await
            .unwrap();

        assert!(!receipt.notified);
        assert_eq!(receipt.summary.total, Decimal::new(296, 0));
    }

    #[tokio::test]
    async fn test_place_order_validation() {
        let mut engine = engine();
        let customer = CustomerDetails::new("Jo", "jo@example.com");

        assert_eq!(
            engine.place_order(&customer, ShippingMethod::Collect).await.unwrap_err(),
            ShopError::EmptyCart
        );

        engine.add_product("spicy-pickled").unwrap();
        assert_eq!(
            engine
                .place_order(&customer, ShippingMethod::QuoteRequired)
                .await
                .unwrap_err(),
            ShopError::AddressRequired
        );
        assert_eq!(engine.item_count(), 1);
    }
}
