//! # Promo Codes
//!
//! Promo code reference data and the per-email redemption ledger.
//!
//! A code is *reserved* for an email when the customer applies it, and only
//! *committed* once the order is placed. Cancelling checkout releases the
//! reservation. Either state blocks the same email from applying the code
//! again.

use crate::error::{ShopError, ShopResult};
use crate::order::normalize_email;
use crate::product::round_currency;
use crate::store::ShopStore;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Canonical form of a promo code (trimmed, upper-case)
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// A percentage discount token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoCode {
    /// Code as typed by customers (matched case-insensitively)
    pub code: String,

    /// Discount rate, strictly between 0 and 1
    pub rate: Decimal,

    /// Human description (e.g., "10% off")
    pub description: String,
}

impl PromoCode {
    pub fn new(code: impl AsRef<str>, rate: Decimal, description: impl Into<String>) -> Self {
        Self {
            code: normalize_code(code.as_ref()),
            rate,
            description: description.into(),
        }
    }

    /// Discount on a subtotal, rounded to cents
    pub fn discount_on(&self, subtotal: Decimal) -> Decimal {
        round_currency(subtotal * self.rate)
    }

    /// Label used on order notifications (e.g., "FRESH10 (10% off)")
    pub fn label(&self) -> String {
        format!("{} ({})", self.code, self.description)
    }
}

/// Known promo codes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromoCatalog {
    codes: Vec<PromoCode>,
}

impl PromoCatalog {
    /// Build a catalog, rejecting blank or duplicate codes and rates outside (0, 1)
    pub fn new(codes: Vec<PromoCode>) -> ShopResult<Self> {
        let mut seen = BTreeSet::new();
        let mut normalized = Vec::with_capacity(codes.len());

        for promo in codes {
            let code = normalize_code(&promo.code);
            if code.is_empty() {
                return Err(ShopError::Configuration("promo code must not be blank".into()));
            }
            if promo.rate <= Decimal::ZERO || promo.rate >= Decimal::ONE {
                return Err(ShopError::Configuration(format!(
                    "promo code {} has rate {} outside (0, 1)",
                    code, promo.rate
                )));
            }
            if !seen.insert(code.clone()) {
                return Err(ShopError::Configuration(format!(
                    "duplicate promo code {}",
                    code
                )));
            }
            normalized.push(PromoCode { code, ..promo });
        }

        Ok(Self { codes: normalized })
    }

    /// Codes the shop launched with
    pub fn defaults() -> Self {
        Self {
            codes: vec![
                PromoCode::new("FRESH10", Decimal::new(10, 2), "10% off"),
                PromoCode::new("WELCOME15", Decimal::new(15, 2), "15% off first order"),
            ],
        }
    }

    /// Case-insensitive lookup
    pub fn get(&self, code: &str) -> Option<&PromoCode> {
        let code = normalize_code(code);
        self.codes.iter().find(|p| p.code == code)
    }

    pub fn codes(&self) -> &[PromoCode] {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl Default for PromoCatalog {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Codes one email has used or is holding
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRedemptions {
    #[serde(default)]
    pub committed: BTreeSet<String>,

    #[serde(default)]
    pub reserved: BTreeSet<String>,
}

/// Persistent log of which email has used which promo code
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionRecord {
    #[serde(default)]
    pub emails: BTreeMap<String, EmailRedemptions>,
}

impl RedemptionRecord {
    /// True if the email has committed or reserved the code
    pub fn is_redeemed(&self, email: &str, code: &str) -> bool {
        let code = normalize_code(code);
        self.emails
            .get(&normalize_email(email))
            .map(|e| e.committed.contains(&code) || e.reserved.contains(&code))
            .unwrap_or(false)
    }

    /// True if the code is held for the email but not yet committed
    pub fn is_reserved(&self, email: &str, code: &str) -> bool {
        self.emails
            .get(&normalize_email(email))
            .map(|e| e.reserved.contains(&normalize_code(code)))
            .unwrap_or(false)
    }

    /// Reserve a code; returns false if the email already holds or used it
    pub fn reserve(&mut self, email: &str, code: &str) -> bool {
        if self.is_redeemed(email, code) {
            return false;
        }
        self.emails
            .entry(normalize_email(email))
            .or_default()
            .reserved
            .insert(normalize_code(code))
    }

    /// Mark a code as used for good
    pub fn commit(&mut self, email: &str, code: &str) {
        let code = normalize_code(code);
        let entry = self.emails.entry(normalize_email(email)).or_default();
        entry.reserved.remove(&code);
        entry.committed.insert(code);
    }

    /// Drop a reservation; committed codes are never released
    pub fn release(&mut self, email: &str, code: &str) -> bool {
        let email = normalize_email(email);
        let Some(entry) = self.emails.get_mut(&email) else {
            return false;
        };
        let released = entry.reserved.remove(&normalize_code(code));
        if entry.committed.is_empty() && entry.reserved.is_empty() {
            self.emails.remove(&email);
        }
        released
    }
}

/// Serialized read-modify-write access to the redemption record.
///
/// One ledger is shared by every engine in a process so that two carts
/// cannot reserve the same email and code at once.
pub struct RedemptionLedger {
    store: Arc<dyn ShopStore>,
    lock: Mutex<()>,
}

impl RedemptionLedger {
    pub fn new(store: Arc<dyn ShopStore>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// Reserve `code` for `email`, failing with `AlreadyRedeemed` if taken
    pub fn reserve(&self, email: &str, code: &str) -> ShopResult<()> {
        self.update(|record| {
            if record.reserve(email, code) {
                Ok(())
            } else {
                Err(ShopError::AlreadyRedeemed {
                    code: normalize_code(code),
                })
            }
        })
    }

    /// Commit a reservation after the order went through
    pub fn commit(&self, email: &str, code: &str) -> ShopResult<()> {
        self.update(|record| {
            record.commit(email, code);
            Ok(())
        })
    }

    /// Release a reservation after an abandoned checkout
    pub fn release(&self, email: &str, code: &str) -> ShopResult<()> {
        self.update(|record| {
            if !record.release(email, code) {
                debug!(code, "no reservation to release");
            }
            Ok(())
        })
    }

    pub fn is_redeemed(&self, email: &str, code: &str) -> bool {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.load().is_redeemed(email, code)
    }

    pub fn is_reserved(&self, email: &str, code: &str) -> bool {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.load().is_reserved(email, code)
    }

    fn update<T>(&self, apply: impl FnOnce(&mut RedemptionRecord) -> ShopResult<T>) -> ShopResult<T> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut record = self.load();
        let value = apply(&mut record)?;
        if let Err(e) = self.store.save_redemptions(&record) {
            warn!(store = self.store.store_name(), "failed to persist redemption record: {}", e);
        }
        Ok(value)
    }

    fn load(&self) -> RedemptionRecord {
        self.store.load_redemptions().unwrap_or_else(|e| {
            warn!(store = self.store.store_name(), "failed to load redemption record: {}", e);
            RedemptionRecord::default()
        })
    }
}

impl std::fmt::Debug for RedemptionLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedemptionLedger")
            .field("store", &self.store.store_name())
            .finish()
    }
}
