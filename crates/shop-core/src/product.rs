//! # Product Types
//!
//! Product catalog types for the storefront.
//! Products are loaded from the `[[products]]` table of `config/shop.toml`,
//! or from the built-in reference list when no settings file is available.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    ZAR,
    USD,
    EUR,
    GBP,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::ZAR => "zar",
            Currency::USD => "usd",
            Currency::EUR => "eur",
            Currency::GBP => "gbp",
        }
    }

    /// Display symbol used in front of amounts
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::ZAR => "R",
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::ZAR
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// Round a monetary amount to two decimal places, half away from zero.
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Decimal amount paired with its currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in currency units (rands, not cents)
    pub amount: Decimal,
    /// Currency
    pub currency: Currency,
}

impl Price {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Shortcut for the shop's home currency
    pub fn zar(amount: Decimal) -> Self {
        Self::new(amount, Currency::ZAR)
    }

    pub fn zero(currency: Currency) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// Format for display (e.g., "R 96.00")
    pub fn display(&self) -> String {
        format!("{} {:.2}", self.currency.symbol(), round_currency(self.amount))
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}

/// A product in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product identifier (e.g., "spicy-pickled")
    pub id: String,

    /// Display name
    pub name: String,

    /// Short description
    #[serde(default)]
    pub description: String,

    /// Unit price in the catalog currency
    pub price: Decimal,

    /// Packaging size (e.g., "455ml Bottle")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    /// Whether this product can currently be ordered
    #[serde(default = "default_true")]
    pub available: bool,

    /// Highlighted in the storefront grid
    #[serde(default)]
    pub best_seller: bool,
}

fn default_true() -> bool {
    true
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            price,
            size: None,
            available: true,
            best_seller: false,
        }
    }

    /// Builder: set description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Builder: set packaging size
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    /// Builder: mark as best seller
    pub fn best_seller(mut self) -> Self {
        self.best_seller = true;
        self
    }

    /// Builder: mark as sold out
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }
}

/// Built-in reference list: (id, name, price in cents, size, best seller, description)
const SEEDED_PRODUCTS: &[(&str, &str, i64, &str, bool, &str)] = &[
    (
        "white-wine-vinegar",
        "White Wine Vinegar",
        12000,
        "455ml Bottle",
        true,
        "White Wine Vinegar infused with salt, sugar, fresh dill, spearmint leaves, peppercorns, coriander, garlic, and grape leaves.",
    ),
    (
        "spicy-pickled",
        "Spicy Pickled Cucamelons",
        9600,
        "455ml Bottle",
        false,
        "Crunchy cucamelons pickled with a kick of chilli and garlic.",
    ),
    (
        "dill-pickled",
        "Dill & Garlic Pickled Cucamelons",
        9600,
        "455ml Bottle",
        true,
        "Classic dill flavor, perfect for salads and cheeseboards.",
    ),
    (
        "sweet-sour",
        "Sweet & Sour Pickled Cucamelons",
        9600,
        "455ml Bottle",
        false,
        "A delightful balance of sweet and tangy flavors.",
    ),
    (
        "sweet-cucamelon",
        "Sweet Cucamelon",
        9600,
        "455ml Bottle",
        false,
        "A unique twist with a sweet kick from Drink-O-Pop powder.",
    ),
    (
        "fresh-punnet",
        "Fresh Cucamelons (250g)",
        4000,
        "250g Punnet",
        true,
        "Freshly harvested cucamelons, perfect for snacking.",
    ),
    (
        "sweet-spicy-pickled",
        "Pickled Sweet&Spicy",
        12000,
        "455ml Bottle",
        false,
        "A perfect blend of sweet and spicy flavors.",
    ),
    (
        "apple-cider-vinegar",
        "Pickled Apple Cider Vinegar",
        13000,
        "455ml Bottle",
        false,
        "Cucamelons pickled in apple cider vinegar with fresh herbs.",
    ),
    (
        "pickled-mix",
        "Pickled Mix",
        8000,
        "455ml Bottle",
        false,
        "A mix of our favorite pickled varieties in one jar.",
    ),
];

/// Product catalog (loaded from settings, read-only once loaded)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductCatalog {
    /// Currency every price in this catalog is expressed in
    #[serde(default)]
    pub currency: Currency,

    #[serde(default)]
    pub products: Vec<Product>,
}

impl ProductCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            currency: Currency::ZAR,
            products: Vec::new(),
        }
    }

    /// The hardcoded reference list used when no catalog can be loaded
    pub fn seeded() -> Self {
        let products = SEEDED_PRODUCTS
            .iter()
            .map(|&(id, name, cents, size, best_seller, description)| {
                let product = Product::new(id, name, Decimal::new(cents, 2))
                    .with_size(size)
                    .with_description(description);
                if best_seller {
                    product.best_seller()
                } else {
                    product
                }
            })
            .collect();

        Self {
            currency: Currency::ZAR,
            products,
        }
    }

    /// Add a product to the catalog
    pub fn add(&mut self, product: Product) {
        self.products.push(product);
    }

    /// Builder: add a product
    pub fn with_product(mut self, product: Product) -> Self {
        self.add(product);
        self
    }

    /// Find a product by ID
    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Get all products that can be ordered
    pub fn available_products(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|p| p.available)
    }

    /// Unit price of a product as a `Price`
    pub fn price_of(&self, product: &Product) -> Price {
        Price::new(product.price, self.currency)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Load catalog from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}
