//! # Storage
//!
//! Persistence collaborator for carts and the promo redemption record.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              ShopStore (trait)               │
//! │  ├── load_cart() / save_cart()               │
//! │  └── load_redemptions() / save_redemptions() │
//! └──────────────────────────────────────────────┘
//!                        ▲
//!        ┌───────────────┼────────────────┐
//!  ┌─────┴──────┐ ┌──────┴───────┐ ┌──────┴────────┐
//!  │MemoryStore │ │JsonFileStore │ │ FallbackStore │
//!  └────────────┘ └──────────────┘ └───────────────┘
//! ```

use crate::cart::CartSnapshot;
use crate::error::{ShopError, ShopResult};
use crate::promo::RedemptionRecord;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Storage backend for carts and redemptions.
///
/// Implementations must be safe to share between engines; the engine treats
/// every error as non-fatal and logs it.
pub trait ShopStore: Send + Sync {
    /// Last saved snapshot for a cart, `None` if it was never saved
    fn load_cart(&self, cart_id: &str) -> ShopResult<Option<CartSnapshot>>;

    /// Replace the stored snapshot for a cart
    fn save_cart(&self, cart_id: &str, snapshot: &CartSnapshot) -> ShopResult<()>;

    /// Current redemption record (empty if none saved yet)
    fn load_redemptions(&self) -> ShopResult<RedemptionRecord>;

    /// Replace the redemption record
    fn save_redemptions(&self, record: &RedemptionRecord) -> ShopResult<()>;

    /// Store name for logging
    fn store_name(&self) -> &'static str;
}

/// Check that a cart id is safe to use as a storage key
pub fn validate_cart_id(cart_id: &str) -> ShopResult<()> {
    let valid = !cart_id.is_empty()
        && cart_id.len() <= 64
        && cart_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(ShopError::InvalidRequest(format!("invalid cart id: {:?}", cart_id)))
    }
}

/// Process-local store, lost on restart
#[derive(Debug, Default)]
pub struct MemoryStore {
    carts: Mutex<HashMap<String, CartSnapshot>>,
    redemptions: Mutex<RedemptionRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ShopStore for MemoryStore {
    fn load_cart(&self, cart_id: &str) -> ShopResult<Option<CartSnapshot>> {
        let carts = self.carts.lock().unwrap_or_else(|e| e.into_inner());
        Ok(carts.get(cart_id).cloned())
    }

    fn save_cart(&self, cart_id: &str, snapshot: &CartSnapshot) -> ShopResult<()> {
        let mut carts = self.carts.lock().unwrap_or_else(|e| e.into_inner());
        carts.insert(cart_id.to_string(), snapshot.clone());
        Ok(())
    }

    fn load_redemptions(&self) -> ShopResult<RedemptionRecord> {
        let record = self.redemptions.lock().unwrap_or_else(|e| e.into_inner());
        Ok(record.clone())
    }

    fn save_redemptions(&self, record: &RedemptionRecord) -> ShopResult<()> {
        let mut current = self.redemptions.lock().unwrap_or_else(|e| e.into_inner());
        *current = record.clone();
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}

/// JSON documents under a data directory:
/// `cart-{id}.json` per cart and `promo-usage.json` for redemptions.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

const REDEMPTIONS_FILE: &str = "promo-usage.json";

impl JsonFileStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> ShopResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn cart_path(&self, cart_id: &str) -> ShopResult<PathBuf> {
        validate_cart_id(cart_id)?;
        Ok(self.dir.join(format!("cart-{}.json", cart_id)))
    }

    fn read_json<T: DeserializeOwned>(path: &Path) -> ShopResult<Option<T>> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // Write to a sibling temp file first so readers never see a torn document
    fn write_json<T: Serialize>(path: &Path, value: &T) -> ShopResult<()> {
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
        std::fs::rename(&tmp, path)?;
        debug!(path = %path.display(), "wrote document");
        Ok(())
    }
}

impl ShopStore for JsonFileStore {
    fn load_cart(&self, cart_id: &str) -> ShopResult<Option<CartSnapshot>> {
        Self::read_json(&self.cart_path(cart_id)?)
    }

    fn save_cart(&self, cart_id: &str, snapshot: &CartSnapshot) -> ShopResult<()> {
        Self::write_json(&self.cart_path(cart_id)?, snapshot)
    }

    fn load_redemptions(&self) -> ShopResult<RedemptionRecord> {
        Ok(Self::read_json(&self.dir.join(REDEMPTIONS_FILE))?.unwrap_or_default())
    }

    fn save_redemptions(&self, record: &RedemptionRecord) -> ShopResult<()> {
        Self::write_json(&self.dir.join(REDEMPTIONS_FILE), record)
    }

    fn store_name(&self) -> &'static str {
        "json_file"
    }
}

/// Primary store with a local mirror.
///
/// Reads come from the primary and fall back to the local store when the
/// primary fails. Writes go to both; the call only fails if both fail.
pub struct FallbackStore {
    primary: Arc<dyn ShopStore>,
    local: Arc<dyn ShopStore>,
}

impl FallbackStore {
    pub fn new(primary: Arc<dyn ShopStore>, local: Arc<dyn ShopStore>) -> Self {
        Self { primary, local }
    }

    fn read<T>(&self, what: &str, read: impl Fn(&dyn ShopStore) -> ShopResult<T>) -> ShopResult<T> {
        read(self.primary.as_ref()).or_else(|e| {
            warn!(
                primary = self.primary.store_name(),
                local = self.local.store_name(),
                "primary store failed to load {}, using local copy: {}",
                what,
                e
            );
            read(self.local.as_ref())
        })
    }

    fn write(&self, what: &str, write: impl Fn(&dyn ShopStore) -> ShopResult<()>) -> ShopResult<()> {
        let primary = write(self.primary.as_ref());
        let local = write(self.local.as_ref());

        match (primary, local) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(e), Ok(())) => {
                warn!(primary = self.primary.store_name(), "primary store failed to save {}: {}", what, e);
                Ok(())
            }
            (Ok(()), Err(e)) => {
                warn!(local = self.local.store_name(), "local store failed to save {}: {}", what, e);
                Ok(())
            }
            (Err(e), Err(_)) => Err(e),
        }
    }
}

impl ShopStore for FallbackStore {
    fn load_cart(&self, cart_id: &str) -> ShopResult<Option<CartSnapshot>> {
        self.read("cart", |s| s.load_cart(cart_id))
    }

    fn save_cart(&self, cart_id: &str, snapshot: &CartSnapshot) -> ShopResult<()> {
        self.write("cart", |s| s.save_cart(cart_id, snapshot))
    }

    fn load_redemptions(&self) -> ShopResult<RedemptionRecord> {
        self.read("redemptions", |s| s.load_redemptions())
    }

    fn save_redemptions(&self, record: &RedemptionRecord) -> ShopResult<()> {
        self.write("redemptions", |s| s.save_redemptions(record))
    }

    fn store_name(&self) -> &'static str {
        "fallback"
    }
}

impl std::fmt::Debug for FallbackStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackStore")
            .field("primary", &self.primary.store_name())
            .field("local", &self.local.store_name())
            .finish()
    }
}
