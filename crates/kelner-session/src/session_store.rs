//! Keyed session store with per-session locks and close/rotation lifecycle.
//!
//! Sessions are created lazily on first lookup. A closed session is never
//! mutated again: a request carrying its id is routed to the successor
//! allocated at close time, and the response reports both ids.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use rand::Rng;
use time::OffsetDateTime;
use tracing::debug;

use crate::types::{CloseReason, Session, SessionStatus};

pub fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// `sess_<unix_ms>_<6 lowercase alphanumerics>`.
pub fn generate_session_id() -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("sess_{}_{}", now_ms(), suffix)
}

pub struct SessionResolution {
    pub session: Arc<Mutex<Session>>,
    pub session_id: String,
    /// Set when a closed id was presented and a successor took over.
    pub rotated_from: Option<String>,
}

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().ok()?.get(id).cloned()
    }

    fn insert_new(&self, id: String) -> Arc<Mutex<Session>> {
        let session = Arc::new(Mutex::new(Session::new(id.clone())));
        if let Ok(mut map) = self.sessions.write() {
            map.insert(id, session.clone());
        }
        session
    }

    /// Resolve a request's session id to an active session, rotating away
    /// from closed ids. Follows at most a short successor chain; a broken
    /// chain falls back to a fresh id.
    pub fn get_or_create_active(&self, requested: Option<&str>) -> SessionResolution {
        let mut current_id = match requested {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => generate_session_id(),
        };
        let mut rotated_from: Option<String> = None;

        for _ in 0..8 {
            let existing = self.get(&current_id);
            match existing {
                None => {
                    let session = self.insert_new(current_id.clone());
                    return SessionResolution {
                        session,
                        session_id: current_id,
                        rotated_from,
                    };
                }
                Some(session) => {
                    let (closed, successor) = {
                        let guard = match session.lock() {
                            Ok(g) => g,
                            Err(poisoned) => poisoned.into_inner(),
                        };
                        (guard.is_closed(), guard.successor_id.clone())
                    };
                    if !closed {
                        return SessionResolution {
                            session,
                            session_id: current_id,
                            rotated_from,
                        };
                    }
                    debug!(closed_id = %current_id, "session_rotated");
                    rotated_from.get_or_insert(current_id.clone());
                    current_id = successor.unwrap_or_else(generate_session_id);
                }
            }
        }

        // Pathological successor cycle: cut it with a fresh session.
        let fresh = generate_session_id();
        let session = self.insert_new(fresh.clone());
        SessionResolution {
            session,
            session_id: fresh,
            rotated_from,
        }
    }

    /// Close a session (one-way) and allocate its successor eagerly so the
    /// next turn with the old id lands somewhere deterministic.
    pub fn close(&self, session: &mut Session, reason: CloseReason) -> String {
        session.status = SessionStatus::Closed;
        session.closed_reason = Some(reason);
        session.closed_at = Some(now_ms());

        let successor = generate_session_id();
        session.successor_id = Some(successor.clone());
        self.insert_new(successor.clone());
        debug!(closed = %session.id, reason = reason.as_str(), %successor, "session_closed");
        successor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_format() {
        let id = generate_session_id();
        let parts: Vec<&str> = id.splitn(3, '_').collect();
        assert_eq!(parts[0], "sess");
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 6);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_lazy_creation() {
        let store = SessionStore::new();
        let res = store.get_or_create_active(Some("sess_1_custom"));
        assert_eq!(res.session_id, "sess_1_custom");
        assert!(res.rotated_from.is_none());
        assert!(store.get("sess_1_custom").is_some());
    }

    #[test]
    fn test_generated_when_absent() {
        let store = SessionStore::new();
        let res = store.get_or_create_active(None);
        assert!(res.session_id.starts_with("sess_"));
    }

    #[test]
    fn test_close_is_one_way_and_rotates() {
        let store = SessionStore::new();
        let res = store.get_or_create_active(Some("sess_1_aaaaaa"));
        let successor = {
            let mut guard = res.session.lock().unwrap();
            store.close(&mut guard, CloseReason::OrderConfirmed)
        };

        // The closed id now resolves to the successor.
        let rotated = store.get_or_create_active(Some("sess_1_aaaaaa"));
        assert_eq!(rotated.session_id, successor);
        assert_eq!(rotated.rotated_from.as_deref(), Some("sess_1_aaaaaa"));
        assert!(!rotated.session.lock().unwrap().is_closed());

        // The closed session itself is untouched.
        let closed = store.get("sess_1_aaaaaa").unwrap();
        let guard = closed.lock().unwrap();
        assert!(guard.is_closed());
        assert_eq!(guard.closed_reason, Some(CloseReason::OrderConfirmed));
        assert!(guard.closed_at.is_some());
    }

    #[test]
    fn test_double_close_chain() {
        let store = SessionStore::new();
        let first = store.get_or_create_active(Some("sess_1_bbbbbb"));
        let second_id = {
            let mut guard = first.session.lock().unwrap();
            store.close(&mut guard, CloseReason::CartItemAdded)
        };
        let second = store.get(&second_id).unwrap();
        let third_id = {
            let mut guard = second.lock().unwrap();
            store.close(&mut guard, CloseReason::OrderConfirmed)
        };

        // Chain resolves end-to-end from the oldest id.
        let res = store.get_or_create_active(Some("sess_1_bbbbbb"));
        assert_eq!(res.session_id, third_id);
        assert_eq!(res.rotated_from.as_deref(), Some("sess_1_bbbbbb"));
    }
}
