//! # EmailJS Configuration
//!
//! Configuration for the EmailJS integration.
//! All identifiers are loaded from environment variables.

use shop_core::ShopError;
use std::env;

const DEFAULT_API_URL: &str = "https://api.emailjs.com";

/// EmailJS API configuration
#[derive(Debug, Clone)]
pub struct EmailJsConfig {
    /// Email service id (service_...)
    pub service_id: String,

    /// Template used for the owner notification (template_...)
    pub template_id: String,

    /// Public key, sent as `user_id`
    pub public_key: String,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,
}

impl EmailJsConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `EMAILJS_SERVICE_ID`
    /// - `EMAILJS_TEMPLATE_ID`
    /// - `EMAILJS_PUBLIC_KEY`
    ///
    /// `EMAILJS_API_URL` overrides the API base URL.
    pub fn from_env() -> Result<Self, ShopError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let service_id = required("EMAILJS_SERVICE_ID")?;
        let template_id = required("EMAILJS_TEMPLATE_ID")?;
        let public_key = required("EMAILJS_PUBLIC_KEY")?;

        let config = Self::new(service_id, template_id, public_key);
        Ok(match env::var("EMAILJS_API_URL") {
            Ok(url) if !url.trim().is_empty() => config.with_api_base_url(url.trim()),
            _ => config,
        })
    }

    /// Create config with explicit values
    pub fn new(
        service_id: impl Into<String>,
        template_id: impl Into<String>,
        public_key: impl Into<String>,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            template_id: template_id.into(),
            public_key: public_key.into(),
            api_base_url: DEFAULT_API_URL.to_string(),
        }
    }

    /// Endpoint for sending a templated email
    pub fn send_url(&self) -> String {
        format!("{}/api/v1.0/email/send", self.api_base_url.trim_end_matches('/'))
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

fn required(key: &str) -> Result<String, ShopError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ShopError::Configuration(format!("{} not set", key))),
    }
}
