//! Shared application state for the Marquee server.
//!
//! [`AppState`] owns the process-wide timeline store, the vote ledger,
//! the option and config caches, and the verifier. It is built once at
//! startup, wrapped in [`Arc`], and injected via Axum's `State` extractor.

use std::sync::Arc;

use marquee_core::backend::EventBackend;
use marquee_core::catalog::EventCatalog;
use marquee_core::ledger::VoteLedger;
use marquee_core::timeline::TimelineStore;

use crate::turnstile::Verifier;

/// Shared state for the Axum application.
pub struct AppState<B> {
    /// The data backend.
    pub backend: Arc<B>,
    /// Cached event timeline. Shared with the change listener.
    pub timeline: Arc<TimelineStore<B>>,
    /// Vote validation and recording.
    pub ledger: VoteLedger<B>,
    /// Cached cast options and event config.
    pub catalog: EventCatalog<B>,
    /// Proof-of-humanity verifier.
    pub verifier: Verifier,
}

impl<B: EventBackend> AppState<B> {
    /// Build the state around `backend`.
    pub fn new(backend: Arc<B>, verifier: Verifier, require_open: bool) -> Self {
        Self {
            timeline: Arc::new(TimelineStore::new(Arc::clone(&backend))),
            ledger: VoteLedger::new(Arc::clone(&backend), require_open),
            catalog: EventCatalog::new(Arc::clone(&backend)),
            backend,
            verifier,
        }
    }
}
