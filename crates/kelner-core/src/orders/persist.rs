//! Idempotent order persistence.

use sha2::{Digest, Sha256};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, warn};

use super::{CartLine, OrderError, OrderItem, OrderRecord, OrderStore};

/// Deterministic SHA-256 over the session id and the sorted cart lines.
/// Two identical confirmations of the same cart hash to the same key.
pub fn idempotency_key(session_id: &str, items: &[CartLine]) -> String {
    let mut sorted: Vec<&CartLine> = items.iter().collect();
    sorted.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then(a.qty.cmp(&b.qty))
            .then(a.price.total_cmp(&b.price))
    });

    let mut hasher = Sha256::new();
    hasher.update(session_id.as_bytes());
    for line in sorted {
        hasher.update(line.name.as_bytes());
        hasher.update(line.qty.to_le_bytes());
        hasher.update(line.price.to_le_bytes());
    }
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

pub struct PersistRequest {
    pub user_id: Option<String>,
    pub restaurant_id: String,
    pub restaurant_name: String,
    pub session_id: String,
    pub items: Vec<CartLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersistOutcome {
    pub order_id: String,
    /// True when an identical order already existed and no row was written.
    pub skipped: bool,
}

/// Write a confirmed order.
///
/// An existing row with the same idempotency key short-circuits. A store
/// that rejects the key column gets one retry without it.
pub fn persist_order(
    store: &dyn OrderStore,
    req: PersistRequest,
) -> Result<PersistOutcome, OrderError> {
    let key = idempotency_key(&req.session_id, &req.items);
    if let Some(existing) = store.find_by_idempotency_key(&key) {
        debug!(order_id = %existing.id, "order_persist_skipped");
        return Ok(PersistOutcome {
            order_id: existing.id,
            skipped: true,
        });
    }

    let total_price: f64 = req.items.iter().map(CartLine::line_total).sum();
    let total_cents: i64 = req
        .items
        .iter()
        .map(|l| ((l.price * 100.0).round() as i64) * l.qty as i64)
        .sum();
    let created_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();

    let record = OrderRecord {
        id: String::new(),
        user_id: req.user_id,
        restaurant_id: req.restaurant_id,
        restaurant_name: req.restaurant_name,
        session_id: req.session_id,
        idempotency_key: Some(key),
        items: req.items.iter().map(to_order_item).collect(),
        total_price,
        total_cents,
        status: "confirmed".to_string(),
        created_at,
    };

    match store.insert(record.clone()) {
        Ok(order_id) => {
            debug!(%order_id, total_cents, "order_persisted");
            Ok(PersistOutcome {
                order_id,
                skipped: false,
            })
        }
        Err(OrderError::IdempotencyKeyUnsupported) => {
            warn!("order store rejected idempotency key, retrying without it");
            let mut bare = record;
            bare.idempotency_key = None;
            let order_id = store.insert(bare)?;
            Ok(PersistOutcome {
                order_id,
                skipped: false,
            })
        }
        Err(e) => Err(e),
    }
}

fn to_order_item(line: &CartLine) -> OrderItem {
    OrderItem {
        menu_item_id: line.menu_item_id.clone(),
        name: line.name.clone(),
        unit_price_cents: (line.price * 100.0).round() as i64,
        qty: line.qty,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use super::super::MemoryOrderStore;
    use super::*;

    fn lines() -> Vec<CartLine> {
        vec![
            CartLine {
                menu_item_id: "m1".to_string(),
                restaurant_id: "1".to_string(),
                name: "Pizza".to_string(),
                price: 25.0,
                qty: 2,
            },
            CartLine {
                menu_item_id: "m2".to_string(),
                restaurant_id: "1".to_string(),
                name: "Cola".to_string(),
                price: 6.5,
                qty: 1,
            },
        ]
    }

    fn request() -> PersistRequest {
        PersistRequest {
            user_id: None,
            restaurant_id: "1".to_string(),
            restaurant_name: "Bar Praha".to_string(),
            session_id: "sess_A".to_string(),
            items: lines(),
        }
    }

    #[test]
    fn test_key_stable_under_item_order() {
        let mut reversed = lines();
        reversed.reverse();
        assert_eq!(
            idempotency_key("sess_A", &lines()),
            idempotency_key("sess_A", &reversed)
        );
        assert_ne!(
            idempotency_key("sess_A", &lines()),
            idempotency_key("sess_B", &lines())
        );
    }

    #[test]
    fn test_persist_idempotent() {
        let store = MemoryOrderStore::new();
        let first = persist_order(&store, request()).unwrap();
        assert!(!first.skipped);

        let second = persist_order(&store, request()).unwrap();
        assert!(second.skipped);
        assert_eq!(first.order_id, second.order_id);
        assert_eq!(store.all().len(), 1);
    }

    #[test]
    fn test_persist_totals() {
        let store = MemoryOrderStore::new();
        persist_order(&store, request()).unwrap();
        let record = &store.all()[0];
        assert!((record.total_price - 56.5).abs() < 1e-9);
        assert_eq!(record.total_cents, 5650);
        assert_eq!(record.status, "confirmed");
        assert_eq!(record.items.len(), 2);
        assert_eq!(record.items[0].unit_price_cents, 2500);
    }

    /// Store that rejects the idempotency key column on the first attempt.
    #[derive(Default)]
    struct LegacyStore {
        rejected: AtomicBool,
        records: Mutex<Vec<OrderRecord>>,
    }

    impl OrderStore for LegacyStore {
        fn insert(&self, mut record: OrderRecord) -> Result<String, OrderError> {
            if record.idempotency_key.is_some() {
                self.rejected.store(true, Ordering::SeqCst);
                return Err(OrderError::IdempotencyKeyUnsupported);
            }
            record.id = "ord_legacy_1".to_string();
            self.records.lock().unwrap().push(record);
            Ok("ord_legacy_1".to_string())
        }

        fn find_by_idempotency_key(&self, _key: &str) -> Option<OrderRecord> {
            None
        }

        fn all(&self) -> Vec<OrderRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    #[test]
    fn test_retry_without_key() {
        let store = LegacyStore::default();
        let outcome = persist_order(&store, request()).unwrap();
        assert_eq!(outcome.order_id, "ord_legacy_1");
        assert!(store.rejected.load(Ordering::SeqCst));
        assert_eq!(store.all().len(), 1);
        assert!(store.all()[0].idempotency_key.is_none());
    }
}
