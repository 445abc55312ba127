//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the shop context (catalog, promo codes, stores, notifier) and
//! the pricing engines of recently used carts.

use shop_core::{
    BoxedNotifier, FallbackStore, JsonFileStore, LoggingObserver, MemoryStore, PaymentLink,
    PricingEngine, ShopContext, ShopResult, ShopSettings, ShopStore,
};
use shop_notify::EmailJsNotifier;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Engines untouched for this long are closed on the next insert
pub const DEFAULT_CART_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Most engines kept open at once
pub const DEFAULT_MAX_OPEN_CARTS: usize = 10_000;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Directory for cart and promo-usage JSON files; memory only when unset
    pub data_dir: Option<PathBuf>,
    /// Explicit path to the shop settings file
    pub shop_config: Option<PathBuf>,
    /// Hosted payment page override
    pub payment_link: Option<String>,
    /// How long an unused cart engine stays open
    pub cart_idle_timeout: Duration,
    /// Upper bound on open cart engines
    pub max_open_carts: usize,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            data_dir: non_empty("DATA_DIR").map(PathBuf::from),
            shop_config: non_empty("SHOP_CONFIG").map(PathBuf::from),
            payment_link: non_empty("PAYMENT_LINK"),
            cart_idle_timeout: non_empty("CART_IDLE_SECS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_CART_IDLE_TIMEOUT),
            max_open_carts: non_empty("MAX_OPEN_CARTS")
                .and_then(|n| n.parse().ok())
                .unwrap_or(DEFAULT_MAX_OPEN_CARTS),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid socket address {}:{}: {}", self.host, self.port, e))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[derive(Debug)]
struct OpenCart {
    engine: Arc<Mutex<PricingEngine>>,
    last_used: Instant,
}

impl OpenCart {
    // Any handle besides the registry's own belongs to a request
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.engine) > 1
    }
}

/// Open pricing engines keyed by cart id.
///
/// Every engine change is already persisted, so closing an engine loses
/// nothing: the next request reopens it from the store. Idle and least
/// recently used engines are swept on insert.
#[derive(Debug)]
pub struct CartRegistry {
    engines: Mutex<HashMap<String, OpenCart>>,
    idle_timeout: Duration,
    max_open: usize,
}

impl Default for CartRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CART_IDLE_TIMEOUT, DEFAULT_MAX_OPEN_CARTS)
    }
}

impl CartRegistry {
    pub fn new(idle_timeout: Duration, max_open: usize) -> Self {
        Self {
            engines: Mutex::new(HashMap::new()),
            idle_timeout,
            max_open: max_open.max(1),
        }
    }

    /// Engine for `cart_id`, opened from the store on first use and kept open
    pub async fn engine(
        &self,
        ctx: &Arc<ShopContext>,
        cart_id: &str,
    ) -> ShopResult<Arc<Mutex<PricingEngine>>> {
        let now = Instant::now();
        let mut engines = self.engines.lock().await;
        if let Some(open) = engines.get_mut(cart_id) {
            open.last_used = now;
            return Ok(Arc::clone(&open.engine));
        }

        let mut engine = PricingEngine::open(Arc::clone(ctx), cart_id)?;
        engine.subscribe(Arc::new(LoggingObserver));
        let engine = Arc::new(Mutex::new(engine));

        self.evict(&mut engines, now);
        engines.insert(
            cart_id.to_string(),
            OpenCart {
                engine: Arc::clone(&engine),
                last_used: now,
            },
        );
        Ok(engine)
    }

    /// Engine for a read-only request.
    ///
    /// Returns the open engine when there is one, otherwise a throwaway
    /// engine loaded from the store that is not kept.
    pub async fn peek(
        &self,
        ctx: &Arc<ShopContext>,
        cart_id: &str,
    ) -> ShopResult<Arc<Mutex<PricingEngine>>> {
        {
            let mut engines = self.engines.lock().await;
            if let Some(open) = engines.get_mut(cart_id) {
                open.last_used = Instant::now();
                return Ok(Arc::clone(&open.engine));
            }
        }

        let engine = PricingEngine::open(Arc::clone(ctx), cart_id)?;
        Ok(Arc::new(Mutex::new(engine)))
    }

    /// Close a cart's engine unless a request is still using it
    pub async fn close(&self, cart_id: &str) -> bool {
        let mut engines = self.engines.lock().await;
        match engines.get(cart_id) {
            Some(open) if !open.in_use() => {
                engines.remove(cart_id);
                debug!(cart_id, "closed cart engine");
                true
            }
            _ => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.engines.lock().await.len()
    }

    // Drop idle engines, then the least recently used ones until there is
    // room for one more. Engines held by a request are never dropped.
    fn evict(&self, engines: &mut HashMap<String, OpenCart>, now: Instant) {
        let before = engines.len();
        engines.retain(|_, open| open.in_use() || now.duration_since(open.last_used) < self.idle_timeout);

        while engines.len() >= self.max_open {
            let oldest = engines
                .iter()
                .filter(|(_, open)| !open.in_use())
                .min_by_key(|(_, open)| open.last_used)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    engines.remove(&id);
                }
                None => {
                    warn!(open = engines.len(), "every open cart is busy, exceeding the cart limit");
                    break;
                }
            }
        }

        let closed = before - engines.len();
        if closed > 0 {
            debug!(closed, open = engines.len(), "closed unused cart engines");
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Catalog, promo codes, stores and notifier
    pub shop: Arc<ShopContext>,
    /// Open carts
    pub carts: Arc<CartRegistry>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create a new AppState from the environment
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();

        let mut settings = load_shop_settings(config.shop_config.as_deref())?;
        if let Some(link) = &config.payment_link {
            settings = settings.with_payment_link(PaymentLink::new(link.clone()));
        }

        let store = build_store(&config);

        // EmailJS is optional; orders are logged when it is not configured
        let shop = match EmailJsNotifier::from_env() {
            Ok(notifier) => {
                ShopContext::new(settings, store).with_notifier(Arc::new(notifier) as BoxedNotifier)
            }
            Err(e) => {
                warn!("EmailJS not configured, order notifications go to the log: {}", e);
                ShopContext::new(settings, store)
            }
        };

        Ok(Self::with_context(shop, config))
    }

    /// Create state around an existing shop context
    pub fn with_context(shop: ShopContext, config: AppConfig) -> Self {
        Self {
            shop: Arc::new(shop),
            carts: Arc::new(CartRegistry::new(
                config.cart_idle_timeout,
                config.max_open_carts,
            )),
            config,
        }
    }

    /// Pricing engine for a cart, kept open for later requests
    pub async fn engine(&self, cart_id: &str) -> ShopResult<Arc<Mutex<PricingEngine>>> {
        self.carts.engine(&self.shop, cart_id).await
    }

    /// Pricing engine for a read-only request; never opens a cart for good
    pub async fn peek_engine(&self, cart_id: &str) -> ShopResult<Arc<Mutex<PricingEngine>>> {
        self.carts.peek(&self.shop, cart_id).await
    }
}

/// JSON files under `DATA_DIR` backed by an in-memory store, or memory only
fn build_store(config: &AppConfig) -> Arc<dyn ShopStore> {
    let local: Arc<dyn ShopStore> = Arc::new(MemoryStore::new());

    let Some(dir) = &config.data_dir else {
        info!("DATA_DIR not set, carts are kept in memory");
        return local;
    };

    match JsonFileStore::open(dir) {
        Ok(files) => {
            info!("Persisting carts to {}", dir.display());
            Arc::new(FallbackStore::new(Arc::new(files), local))
        }
        Err(e) => {
            warn!("Cannot use {} for storage, keeping carts in memory: {}", dir.display(), e);
            local
        }
    }
}

/// Load shop settings from an explicit path or `config/shop.toml`
fn load_shop_settings(explicit: Option<&std::path::Path>) -> anyhow::Result<ShopSettings> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let settings = ShopSettings::from_toml(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
        info!("Loaded {} products from {}", settings.catalog.len(), path.display());
        return Ok(settings);
    }

    let config_paths = [
        "config/shop.toml",
        "../config/shop.toml",
        "../../config/shop.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let settings = ShopSettings::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            info!("Loaded {} products from {}", settings.catalog.len(), path);
            return Ok(settings);
        }
    }

    warn!("No shop settings found, using the seeded catalog");
    Ok(ShopSettings::default())
}
