//! File-backed order store: append-only JSONL journal with an atomic
//! checkpoint. Replay on open tolerates truncated trailing lines.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;

use super::{OrderError, OrderRecord, OrderStore};

pub struct JournalOrderStore {
    path: PathBuf,
    records: Mutex<Vec<OrderRecord>>,
}

impl JournalOrderStore {
    /// Open the journal, replaying existing records. A missing file starts
    /// an empty store; unparseable lines are skipped with a warning.
    pub fn open(path: &Path) -> Result<Self, OrderError> {
        let mut records: Vec<OrderRecord> = Vec::new();
        match fs::read_to_string(path) {
            Ok(content) => {
                for line in content.lines() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<OrderRecord>(line) {
                        Ok(record) => {
                            let duplicate = record.idempotency_key.as_ref().is_some_and(|key| {
                                records
                                    .iter()
                                    .any(|r| r.idempotency_key.as_deref() == Some(key.as_str()))
                            });
                            if !duplicate {
                                records.push(record);
                            }
                        }
                        Err(e) => warn!("skipping bad journal line: {e}"),
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(OrderError::Store(e.to_string())),
        }
        Ok(Self {
            path: path.to_path_buf(),
            records: Mutex::new(records),
        })
    }

    /// Rewrite the journal from memory: write to `.tmp`, then rename.
    pub fn checkpoint(&self) -> Result<(), OrderError> {
        let records = self
            .records
            .lock()
            .map_err(|_| OrderError::Store("journal poisoned".to_string()))?;
        let mut body = String::new();
        for record in records.iter() {
            body.push_str(
                &serde_json::to_string(record).map_err(|e| OrderError::Store(e.to_string()))?,
            );
            body.push('\n');
        }
        let tmp = self.path.with_extension("tmp");
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| OrderError::Store(e.to_string()))?;
        }
        fs::write(&tmp, body).map_err(|e| OrderError::Store(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| OrderError::Store(e.to_string()))?;
        Ok(())
    }

    fn append_line(&self, record: &OrderRecord) -> Result<(), OrderError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| OrderError::Store(e.to_string()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| OrderError::Store(e.to_string()))?;
        let line =
            serde_json::to_string(record).map_err(|e| OrderError::Store(e.to_string()))?;
        writeln!(file, "{line}").map_err(|e| OrderError::Store(e.to_string()))?;
        Ok(())
    }
}

impl OrderStore for JournalOrderStore {
    fn insert(&self, mut record: OrderRecord) -> Result<String, OrderError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| OrderError::Store("journal poisoned".to_string()))?;
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
        self.append_line(&record)?;
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

#[cfg(test)]
mod tests {
    use super::super::OrderItem;
    use super::*;

    fn record(session: &str) -> OrderRecord {
        OrderRecord {
            id: String::new(),
            user_id: None,
            restaurant_id: "1".to_string(),
            restaurant_name: "Bar Praha".to_string(),
            session_id: session.to_string(),
            idempotency_key: Some(format!("key-{session}")),
            items: vec![OrderItem {
                menu_item_id: "m1".to_string(),
                name: "Pizza".to_string(),
                unit_price_cents: 2500,
                qty: 2,
            }],
            total_price: 50.0,
            total_cents: 5000,
            status: "confirmed".to_string(),
            created_at: "2026-01-01T12:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_insert_and_replay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.jsonl");

        let store = JournalOrderStore::open(&path).unwrap();
        let id1 = store.insert(record("sess_A")).unwrap();
        store.insert(record("sess_B")).unwrap();
        assert_eq!(store.all().len(), 2);

        let reopened = JournalOrderStore::open(&path).unwrap();
        assert_eq!(reopened.all().len(), 2);
        assert_eq!(
            reopened.find_by_idempotency_key("key-sess_A").unwrap().id,
            id1
        );
    }

    #[test]
    fn test_duplicate_key_dedupes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.jsonl");

        let store = JournalOrderStore::open(&path).unwrap();
        let id1 = store.insert(record("sess_A")).unwrap();
        let id2 = store.insert(record("sess_A")).unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.all().len(), 1);
    }

    #[test]
    fn test_replay_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.jsonl");

        let store = JournalOrderStore::open(&path).unwrap();
        store.insert(record("sess_A")).unwrap();
        drop(store);

        // Simulate a torn write at the tail.
        let mut content = fs::read_to_string(&path).unwrap();
        content.push_str("{\"id\":\"ord_tr");
        fs::write(&path, content).unwrap();

        let reopened = JournalOrderStore::open(&path).unwrap();
        assert_eq!(reopened.all().len(), 1);
    }

    #[test]
    fn test_checkpoint_compacts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.jsonl");

        let store = JournalOrderStore::open(&path).unwrap();
        store.insert(record("sess_A")).unwrap();
        store.insert(record("sess_B")).unwrap();
        store.checkpoint().unwrap();

        let reopened = JournalOrderStore::open(&path).unwrap();
        assert_eq!(reopened.all().len(), 2);
    }
}
