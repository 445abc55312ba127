//! # EmailJS Notifier
//!
//! Sends the shop owner an order email through the EmailJS REST API.
//!
//! ```text
//! POST {api_base_url}/api/v1.0/email/send
//! {
//!   "service_id": "...", "template_id": "...", "user_id": "<public key>",
//!   "template_params": { "name", "email", "phone", "message", "total", "cart_details" }
//! }
//! ```
//!
//! EmailJS answers `200 OK` with a plain-text body on success.

use crate::config::EmailJsConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use shop_core::{OrderNotification, OrderNotifier, ShopError, ShopResult};
use tracing::{debug, error, info, instrument};

/// Order notifier backed by EmailJS
pub struct EmailJsNotifier {
    config: EmailJsConfig,
    client: Client,
}

impl EmailJsNotifier {
    /// Create a new EmailJS notifier
    pub fn new(config: EmailJsConfig) -> ShopResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ShopError::Configuration(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> ShopResult<Self> {
        let config = EmailJsConfig::from_env()?;
        Self::new(config)
    }

    pub fn config(&self) -> &EmailJsConfig {
        &self.config
    }

    fn build_request<'a>(&'a self, notification: &'a OrderNotification) -> SendEmailRequest<'a> {
        SendEmailRequest {
            service_id: &self.config.service_id,
            template_id: &self.config.template_id,
            user_id: &self.config.public_key,
            template_params: TemplateParams {
                name: &notification.customer.name,
                email: &notification.customer.email,
                phone: &notification.customer.phone,
                message: notification.admin_message(),
                total: notification.summary.total_display(),
                cart_details: &notification.cart_details,
            },
        }
    }
}

#[async_trait]
impl OrderNotifier for EmailJsNotifier {
    #[instrument(skip(self, notification), fields(order_id = %notification.order_id))]
    async fn notify(&self, notification: &OrderNotification) -> ShopResult<()> {
        let request = self.build_request(notification);
        let url = self.config.send_url();

        debug!(
            "Sending EmailJS notification: template={}, total={}",
            request.template_id, request.template_params.total
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ShopError::Notification(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("EmailJS API error: status={}, body={}", status, body);
            return Err(ShopError::Notification(format!("HTTP {}: {}", status, body)));
        }

        info!("Order notification sent via EmailJS");
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "emailjs"
    }
}

impl std::fmt::Debug for EmailJsNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailJsNotifier")
            .field("service_id", &self.config.service_id)
            .field("template_id", &self.config.template_id)
            .field("api_base_url", &self.config.api_base_url)
            .finish()
    }
}

// =============================================================================
// EmailJS API Types
// =============================================================================

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: TemplateParams<'a>,
}

#[derive(Debug, Serialize)]
struct TemplateParams<'a> {
    name: &'a str,
    email: &'a str,
    phone: &'a str,
    message: String,
    total: String,
    cart_details: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shop_core::{
        CartLine, CheckoutSummary, Currency, CustomerDetails, PromoCode, ShippingMethod,
        ShippingRates,
    };
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notification() -> OrderNotification {
        let promo = PromoCode::new("FRESH10", Decimal::new(10, 2), "10% off");
        let summary = CheckoutSummary::compute(
            Decimal::new(192, 0),
            Some(&promo),
            ShippingMethod::Collect,
            &ShippingRates::default(),
            Currency::ZAR,
        );
        let customer = CustomerDetails::new("Jo", "jo@example.com").with_phone("0820000000");
        let lines = [CartLine {
            product_id: "spicy-pickled".into(),
            name: "Spicy Pickled Cucamelons".into(),
            unit_price: Decimal::new(96, 0),
            quantity: 2,
        }];

        OrderNotification::new("ord-1", &customer, &lines, Some(&promo), &summary)
    }

    fn notifier(server: &MockServer) -> EmailJsNotifier {
        let config = EmailJsConfig::new("service_test", "template_test", "pk_test")
            .with_api_base_url(server.uri());
        EmailJsNotifier::new(config).unwrap()
    }

    #[test]
    fn test_request_payload() {
        let config = EmailJsConfig::new("service_test", "template_test", "pk_test");
        let notifier = EmailJsNotifier::new(config).unwrap();
        let notification = notification();

        let json = serde_json::to_value(notifier.build_request(&notification)).unwrap();

        assert_eq!(json["service_id"], "service_test");
        assert_eq!(json["user_id"], "pk_test");
        assert_eq!(json["template_params"]["total"], "R 172.80");
        assert_eq!(
            json["template_params"]["cart_details"],
            "2x Spicy Pickled Cucamelons (R 96.00)"
        );
        assert!(json["template_params"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Method: Collect\nAddress: Collection (No Address Required)"));
    }

    #[tokio::test]
    async fn test_notify_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1.0/email/send"))
            .and(body_partial_json(serde_json::json!({
                "service_id": "service_test",
                "template_id": "template_test",
                "template_params": { "email": "jo@example.com", "phone": "0820000000" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .expect(1)
            .mount(&server)
            .await;

        notifier(&server).notify(&notification()).await.unwrap();
    }

    #[tokio::test]
    async fn test_notify_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1.0/email/send"))
            .respond_with(ResponseTemplate::new(400).set_body_string("The user ID is invalid"))
            .mount(&server)
            .await;

        let err = notifier(&server).notify(&notification()).await.unwrap_err();
        match err {
            ShopError::Notification(message) => assert!(message.contains("user ID is invalid")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_notify_unreachable() {
        let config = EmailJsConfig::new("service_test", "template_test", "pk_test")
            .with_api_base_url("http://127.0.0.1:1");
        let notifier = EmailJsNotifier::new(config).unwrap();

        let err = notifier.notify(&notification()).await.unwrap_err();
        assert!(matches!(err, ShopError::Notification(_)));
    }
}
