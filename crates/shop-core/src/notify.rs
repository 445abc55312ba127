//! # Order Notifier Trait
//!
//! Outbound order notification (email to the shop owner, chat message,
//! ...). Delivery is advisory: the engine logs a failed notification and
//! still completes the order.

use crate::error::ShopResult;
use crate::order::OrderNotification;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Sends order notifications through some channel.
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    /// Deliver a notification for a freshly placed order.
    async fn notify(&self, notification: &OrderNotification) -> ShopResult<()>;

    /// Notifier name (for logging).
    fn notifier_name(&self) -> &'static str;
}

/// Type alias for a shared notifier (dynamic dispatch)
pub type BoxedNotifier = Arc<dyn OrderNotifier>;

/// Notifier that only writes the order to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotifier;

#[async_trait]
impl OrderNotifier for LoggingNotifier {
    async fn notify(&self, notification: &OrderNotification) -> ShopResult<()> {
        info!(
            order_id = %notification.order_id,
            customer = %notification.customer.email,
            shipping = %notification.shipping_label,
            total = %notification.summary.total_display(),
            "Order placed:\n{}",
            notification.cart_details
        );
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "log"
    }
}
