//! In-process backend and verifier for tests and local development.
//!
//! [`MemoryBackend`] keeps every table in memory and enforces the same
//! constraints the Postgres schema does: one cast per identity, casts
//! reference existing identities and options, and step updates target an
//! existing timeline.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use marquee_types::{
    CastOption, CastRow, EventConfig, Identity, IdentityId, NewCast, OptionId, PermissionSet,
    Timeline, TimelineId,
};
use tokio::sync::Mutex;

use crate::backend::{AccessToken, BackendError, EventBackend, HumanVerifier, IdentityName};

/// Event data held in memory.
#[derive(Default)]
pub struct MemoryBackend {
    timeline: Mutex<Option<Timeline>>,
    identities: Vec<Identity>,
    decoys: Vec<Identity>,
    options: Vec<CastOption>,
    event_config: Mutex<Option<EventConfig>>,
    sessions: HashMap<String, PermissionSet>,
    casts: Mutex<BTreeMap<IdentityId, CastRow>>,
    fetch_delay: Option<Duration>,
    failing: AtomicBool,
    timeline_fetches: AtomicUsize,
    step_updates: AtomicUsize,
}

impl MemoryBackend {
    /// An empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the timeline row.
    #[must_use]
    pub fn with_timeline(mut self, timeline: Timeline) -> Self {
        *self.timeline.get_mut() = Some(timeline);
        self
    }

    /// Seed the real identities.
    #[must_use]
    pub fn with_identities(mut self, identities: Vec<Identity>) -> Self {
        self.identities = identities;
        self
    }

    /// Seed the decoy identities.
    #[must_use]
    pub fn with_decoys(mut self, decoys: Vec<Identity>) -> Self {
        self.decoys = decoys;
        self
    }

    /// Seed the cast options.
    #[must_use]
    pub fn with_options(mut self, options: Vec<CastOption>) -> Self {
        self.options = options;
        self
    }

    /// Seed placeholder cast options with the given ids.
    #[must_use]
    pub fn with_option_ids(self, ids: impl IntoIterator<Item = i64>) -> Self {
        let options = ids
            .into_iter()
            .map(|id| CastOption {
                id: OptionId(id),
                name: format!("Option {id}"),
                author: String::from("Unknown"),
                description: None,
                image_urls: Vec::new(),
            })
            .collect();
        self.with_options(options)
    }

    /// Seed the event configuration row.
    #[must_use]
    pub fn with_event_config(mut self, config: EventConfig) -> Self {
        *self.event_config.get_mut() = Some(config);
        self
    }

    /// Register a bearer token with the given permissions.
    #[must_use]
    pub fn with_session<'a>(
        mut self,
        token: &str,
        perms: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        self.sessions
            .insert(token.to_owned(), perms.into_iter().collect());
        self
    }

    /// Delay every timeline fetch.
    #[must_use]
    pub const fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    /// Make every operation fail with a query error until cleared.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Replace the event configuration row.
    pub async fn set_event_config(&self, config: Option<EventConfig>) {
        *self.event_config.lock().await = config;
    }

    /// Number of timeline fetches served so far.
    pub fn timeline_fetches(&self) -> usize {
        self.timeline_fetches.load(Ordering::SeqCst)
    }

    /// Number of successful step updates so far.
    pub fn step_updates(&self) -> usize {
        self.step_updates.load(Ordering::SeqCst)
    }

    /// Snapshot of every recorded cast.
    pub async fn casts(&self) -> Vec<CastRow> {
        self.casts.lock().await.values().cloned().collect()
    }

    fn check_available(&self) -> Result<(), BackendError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BackendError::Query(String::from("backend unavailable")));
        }
        Ok(())
    }
}

impl EventBackend for MemoryBackend {
    async fn fetch_timeline(&self) -> Result<Option<Timeline>, BackendError> {
        self.timeline_fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        self.check_available()?;
        Ok(self.timeline.lock().await.clone())
    }

    async fn update_timeline_step(&self, timeline: TimelineId, step: i64) -> Result<(), BackendError> {
        self.check_available()?;
        let mut slot = self.timeline.lock().await;
        match slot.as_mut() {
            Some(row) if row.id == timeline => {
                row.step = Some(step);
                self.step_updates.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            _ => Err(BackendError::NotFound(format!("timeline {timeline} not found"))),
        }
    }

    async fn fetch_identities(&self) -> Result<Vec<Identity>, BackendError> {
        self.check_available()?;
        Ok(self.identities.clone())
    }

    async fn fetch_decoy_identities(&self) -> Result<Vec<Identity>, BackendError> {
        self.check_available()?;
        Ok(self.decoys.clone())
    }

    async fn find_identity(&self, id: IdentityId) -> Result<Option<Identity>, BackendError> {
        self.check_available()?;
        Ok(self.identities.iter().find(|i| i.id == id).cloned())
    }

    async fn lookup_identity_by_name(
        &self,
        name: &IdentityName,
    ) -> Result<Option<Identity>, BackendError> {
        self.check_available()?;
        let mut matches = self.identities.iter().filter(|i| {
            i.first_name == name.first_name
                && i.last_name == name.last_name
                && i.middle_name == name.middle_name
        });

        let first = matches.next().cloned();
        if matches.next().is_some() {
            return Err(BackendError::Query(String::from(
                "multiple identities match the given name",
            )));
        }
        Ok(first)
    }

    async fn insert_cast(&self, cast: &NewCast) -> Result<(), BackendError> {
        self.check_available()?;

        if !self.identities.iter().any(|i| i.id == cast.id) {
            return Err(BackendError::InvalidReference(format!(
                "identity {} does not exist",
                cast.id
            )));
        }
        if let Some(missing) = cast
            .selections
            .iter()
            .find(|id| !self.options.iter().any(|o| o.id == **id))
        {
            return Err(BackendError::InvalidReference(format!(
                "cast option {missing} does not exist"
            )));
        }

        let [selection_1, selection_2, selection_3] = cast.selections;
        let mut casts = self.casts.lock().await;
        match casts.entry(cast.id) {
            Entry::Occupied(_) => {
                Err(BackendError::ConstraintViolation(String::from(
                    "duplicate key value violates unique constraint \"casts_pkey\"",
                )))
            }
            Entry::Vacant(slot) => {
                slot.insert(CastRow {
                    id: cast.id,
                    selection_1: Some(selection_1),
                    selection_2: Some(selection_2),
                    selection_3: Some(selection_3),
                    created_at: Utc::now(),
                    extracted_ip: cast.extracted_ip.clone(),
                });
                Ok(())
            }
        }
    }

    async fn fetch_casts(&self) -> Result<Vec<CastRow>, BackendError> {
        self.check_available()?;
        Ok(self.casts().await)
    }

    async fn fetch_cast_options(&self) -> Result<Vec<CastOption>, BackendError> {
        self.check_available()?;
        Ok(self.options.clone())
    }

    async fn fetch_event_config(&self) -> Result<Option<EventConfig>, BackendError> {
        self.check_available()?;
        Ok(self.event_config.lock().await.clone())
    }

    async fn caller_permissions(
        &self,
        token: &AccessToken,
    ) -> Result<Option<PermissionSet>, BackendError> {
        self.check_available()?;
        Ok(self.sessions.get(token.as_str()).cloned())
    }
}

/// A verifier with a fixed outcome that counts its calls.
#[derive(Debug)]
pub struct FixedVerifier {
    outcome: Result<bool, BackendError>,
    calls: AtomicUsize,
}

impl FixedVerifier {
    /// Accepts every token.
    pub const fn passing() -> Self {
        Self::with_outcome(Ok(true))
    }

    /// Rejects every token.
    pub const fn failing() -> Self {
        Self::with_outcome(Ok(false))
    }

    /// Fails as if the verification service were unreachable.
    pub fn unavailable() -> Self {
        Self::with_outcome(Err(BackendError::Query(String::from(
            "verification service unreachable",
        ))))
    }

    const fn with_outcome(outcome: Result<bool, BackendError>) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of verifications performed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl HumanVerifier for FixedVerifier {
    async fn verify(&self, _token: &str, _remote_ip: Option<&str>) -> Result<bool, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn person(first: &str, last: &str, middle: Option<&str>) -> Identity {
        Identity {
            id: IdentityId::new(),
            first_name: first.to_owned(),
            last_name: last.to_owned(),
            middle_name: middle.map(ToOwned::to_owned),
            grade: None,
            restricted: false,
        }
    }

    #[tokio::test]
    async fn name_lookup_treats_missing_middle_name_as_a_value() {
        let with_middle = person("Ivan", "Petrov", Some("Olegovich"));
        let without = person("Ivan", "Petrov", None);
        let backend =
            MemoryBackend::new().with_identities(vec![with_middle.clone(), without.clone()]);

        let found = backend
            .lookup_identity_by_name(&IdentityName {
                first_name: String::from("Ivan"),
                last_name: String::from("Petrov"),
                middle_name: None,
            })
            .await
            .unwrap();
        assert_eq!(found.map(|i| i.id), Some(without.id));
    }

    #[tokio::test]
    async fn ambiguous_name_is_a_query_error() {
        let backend = MemoryBackend::new().with_identities(vec![
            person("Anna", "Ivanova", None),
            person("Anna", "Ivanova", None),
        ]);

        let err = backend
            .lookup_identity_by_name(&IdentityName {
                first_name: String::from("Anna"),
                last_name: String::from("Ivanova"),
                middle_name: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Query(_)));
    }

    #[tokio::test]
    async fn cast_for_unknown_identity_is_an_invalid_reference() {
        let backend = MemoryBackend::new().with_option_ids(1..=3);
        let err = backend
            .insert_cast(&NewCast {
                id: IdentityId::new(),
                selections: [OptionId(1), OptionId(2), OptionId(3)],
                extracted_ip: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidReference(_)));
    }
}
