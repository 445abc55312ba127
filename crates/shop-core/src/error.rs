//! # Shop Error Types
//!
//! Typed error handling for the storefront engine.
//! Every fallible operation returns `Result<T, ShopError>`.

use thiserror::Error;

/// Core error type for cart, promo and checkout operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShopError {
    /// Promo code is not in the promo catalog
    #[error("Invalid promo code: {code}")]
    InvalidCode { code: String },

    /// This email has already used (or reserved) the promo code
    #[error("Promo code {code} has already been used with this email")]
    AlreadyRedeemed { code: String },

    /// A valid contact email is needed before a promo code can be redeemed
    #[error("A valid email address is required")]
    EmailRequired,

    /// Checkout attempted with nothing in the cart
    #[error("Cart is empty")]
    EmptyCart,

    /// Delivery selected without a delivery address
    #[error("A delivery address is required for this shipping method")]
    AddressRequired,

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Product not found in catalog
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: String },

    /// Product exists but is marked unavailable
    #[error("Product is not available: {product_id}")]
    ProductUnavailable { product_id: String },

    /// Persistence collaborator failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Order notification could not be delivered
    #[error("Notification error: {0}")]
    Notification(String),

    /// Configuration errors (bad settings file, invalid promo table)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ShopError {
    /// Returns true for conditions the customer can fix inline
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            ShopError::InvalidCode { .. }
                | ShopError::AlreadyRedeemed { .. }
                | ShopError::EmailRequired
                | ShopError::EmptyCart
                | ShopError::AddressRequired
                | ShopError::InvalidRequest(_)
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ShopError::InvalidCode { .. } => 422,
            ShopError::AlreadyRedeemed { .. } => 409,
            ShopError::EmailRequired => 422,
            ShopError::EmptyCart => 400,
            ShopError::AddressRequired => 422,
            ShopError::InvalidRequest(_) => 400,
            ShopError::ProductNotFound { .. } => 404,
            ShopError::ProductUnavailable { .. } => 409,
            ShopError::Storage(_) => 503,
            ShopError::Notification(_) => 502,
            ShopError::Configuration(_) => 500,
            ShopError::Serialization(_) => 500,
        }
    }
}

impl From<serde_json::Error> for ShopError {
    fn from(err: serde_json::Error) -> Self {
        ShopError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for ShopError {
    fn from(err: std::io::Error) -> Self {
        ShopError::Storage(err.to_string())
    }
}

/// Result type alias for shop operations
pub type ShopResult<T> = Result<T, ShopError>;
