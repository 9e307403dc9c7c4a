//! Dialog engine for the kelner conversational ordering system.
//!
//! `DialogEngine` owns the catalog and order store behind trait objects,
//! the keyed session map, and the runtime admin toggles. One call to
//! `handle_turn` runs the full pipeline: navigation guard → NLU → ICM gate
//! → UX guards → domain handler → surface render → atomic session merge →
//! optional TTS.

pub mod icm;
pub mod types;

mod handlers;
mod nav_guard;
mod nlu;
mod pipeline;
mod search_cache;
mod session_store;

#[cfg(test)]
mod tests;

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, RwLock};

use kelner_core::catalog::Catalog;
use kelner_core::orders::OrderStore;
use kelner_core::tts::SpeechSynthesizer;

pub use nav_guard::NavAction;
pub use nlu::{IntentResolver, ResolvedIntent};
pub use session_store::{generate_session_id, SessionStore};
pub use types::{
    Action, ContextUpdates, DomainResult, Entities, ExpectedContext, Intent, IntentSource,
    NluResult, Session, SessionStatus, TurnRequest, TurnResponse,
};

/// Runtime admin toggles; may change between turns.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminConfig {
    pub tts_enabled: bool,
    pub dialog_navigation_enabled: bool,
    pub fallback_mode: FallbackMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackMode {
    Smart,
    Simple,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            tts_enabled: true,
            dialog_navigation_enabled: true,
            fallback_mode: FallbackMode::Smart,
        }
    }
}

pub struct DialogEngine {
    catalog: Arc<dyn Catalog>,
    orders: Arc<dyn OrderStore>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    resolver: Option<Arc<dyn IntentResolver>>,
    admin: RwLock<AdminConfig>,
    store: SessionStore,
    /// Barge-in flag shared with the TTS path.
    tts_abort: Arc<AtomicBool>,
}

impl DialogEngine {
    pub fn new(catalog: Arc<dyn Catalog>, orders: Arc<dyn OrderStore>) -> Self {
        Self {
            catalog: Arc::new(search_cache::CachedCatalog::new(catalog)),
            orders,
            synthesizer: None,
            resolver: None,
            admin: RwLock::new(AdminConfig::default()),
            store: SessionStore::new(),
            tts_abort: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn IntentResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Run one turn. Concurrent calls for different sessions proceed in
    /// parallel; calls for the same session serialize on its lock.
    pub fn handle_turn(&self, req: TurnRequest) -> TurnResponse {
        pipeline::run(self, req)
    }

    pub fn admin(&self) -> AdminConfig {
        self.admin
            .read()
            .map(|a| a.clone())
            .unwrap_or_default()
    }

    pub fn set_admin(&self, config: AdminConfig) {
        if let Ok(mut admin) = self.admin.write() {
            *admin = config;
        }
    }

    /// Signal barge-in: abort any in-flight TTS stream.
    pub fn abort_tts(&self) {
        self.tts_abort.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    /// Read-only snapshot of a session, for diagnostics and tests.
    pub fn session_snapshot(&self, id: &str) -> Option<Session> {
        let session = self.store.get(id)?;
        let guard = match session.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        Some(guard.clone())
    }

    pub(crate) fn catalog(&self) -> &dyn Catalog {
        self.catalog.as_ref()
    }

    pub(crate) fn orders(&self) -> &dyn OrderStore {
        self.orders.as_ref()
    }

    pub(crate) fn resolver(&self) -> Option<&dyn IntentResolver> {
        self.resolver.as_deref()
    }

    pub(crate) fn synthesizer(&self) -> Option<&dyn SpeechSynthesizer> {
        self.synthesizer.as_deref()
    }

    pub(crate) fn store(&self) -> &SessionStore {
        &self.store
    }

    pub(crate) fn tts_abort(&self) -> &AtomicBool {
        &self.tts_abort
    }
}
