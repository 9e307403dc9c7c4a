//! Order validation and persistence.
//!
//! The conversational layer builds a pending order out of `CartLine`s; this
//! module validates it against the catalog and writes a confirmed
//! `OrderRecord` through an `OrderStore`, deduplicated by idempotency key.

mod journal;
mod persist;
mod validate;

pub use journal::JournalOrderStore;
pub use persist::{idempotency_key, persist_order, PersistOutcome, PersistRequest};
pub use validate::{validate_cart_before_checkout, validate_item_before_add};

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// One line of a pending or committed cart. Prices in PLN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub menu_item_id: String,
    pub restaurant_id: String,
    pub name: String,
    pub price: f64,
    pub qty: u32,
}

impl CartLine {
    pub fn line_total(&self) -> f64 {
        self.price * self.qty as f64
    }
}

/// Persisted line: integer cents for precision, PLN kept on the record
/// total for analytics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub menu_item_id: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub qty: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Assigned by the store on insert when empty.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub restaurant_id: String,
    pub restaurant_name: String,
    pub session_id: String,
    #[serde(default)]
    pub idempotency_key: Option<String>,
    pub items: Vec<OrderItem>,
    /// PLN.
    pub total_price: f64,
    pub total_cents: i64,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("cart mixes restaurants")]
    MixedRestaurants,

    #[error("unknown restaurant: {0}")]
    RestaurantUnknown(String),

    #[error("restaurant {0} is closed")]
    RestaurantClosed(String),

    #[error("item not available: {0}")]
    ItemNotAvailable(String),

    #[error("quantity {qty} exceeds limit {max}")]
    QuantityTooHigh { qty: u32, max: u32 },

    #[error("order total {total:.2} below minimum {min:.2}")]
    MinOrderNotMet { total: f64, min: f64 },

    #[error("store does not support idempotency keys")]
    IdempotencyKeyUnsupported,

    #[error("order store failure: {0}")]
    Store(String),

    #[error(transparent)]
    Catalog(#[from] crate::catalog::CatalogError),
}

/// Non-fatal findings surfaced in the reply but not blocking the order.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderWarning {
    ItemPriceIncreased {
        name: String,
        from: f64,
        to: f64,
    },
    DifferentRestaurantSuggestion {
        restaurant_name: String,
    },
}

/// Store contract for confirmed orders.
pub trait OrderStore: Send + Sync {
    /// Insert a record, returning its id. Stores that cannot persist the
    /// `idempotency_key` column reject with `IdempotencyKeyUnsupported`;
    /// the persistence path retries once without it.
    fn insert(&self, record: OrderRecord) -> Result<String, OrderError>;

    fn find_by_idempotency_key(&self, key: &str) -> Option<OrderRecord>;

    fn all(&self) -> Vec<OrderRecord>;
}

/// Plain in-memory store.
#[derive(Default)]
pub struct MemoryOrderStore {
    records: Mutex<Vec<OrderRecord>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderStore for MemoryOrderStore {
    fn insert(&self, mut record: OrderRecord) -> Result<String, OrderError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| OrderError::Store("order store poisoned".to_string()))?;
        if let Some(ref key) = record.idempotency_key {
            if let Some(existing) = records
                .iter()
                .find(|r| r.idempotency_key.as_deref() == Some(key.as_str()))
            {
                return Ok(existing.id.clone());
            }
        }
        if record.id.is_empty() {
            record.id = format!("ord_{}", records.len() + 1);
        }
        let id = record.id.clone();
        records.push(record);
        Ok(id)
    }

    fn find_by_idempotency_key(&self, key: &str) -> Option<OrderRecord> {
        self.records
            .lock()
            .ok()?
            .iter()
            .find(|r| r.idempotency_key.as_deref() == Some(key))
            .cloned()
    }

    fn all(&self) -> Vec<OrderRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}
