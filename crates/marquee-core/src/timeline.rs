//! Timeline store and cue derivation.
//!
//! The [`TimelineStore`] caches the event timeline process-wide. It is
//! filled by a single fetch on cold start and afterwards only changes when
//! an update is applied (from a change notification or an explicit
//! refresh). Every stored timeline has its cues sorted by index.
//!
//! The "current cue" is never stored. [`latest_cue`] and [`filtered_cues`]
//! derive it from a timeline snapshot on every read.

use std::sync::Arc;

use marquee_types::{Cue, CueField, Timeline, TimelineId, perms};
use tokio::sync::broadcast;

use crate::access::require_permission;
use crate::backend::{AccessToken, EventBackend};
use crate::cache::CachedResource;
use crate::error::CoreError;

/// Sort a timeline's cues ascending by index.
///
/// The sort is stable: cues with equal indices keep their input order.
/// Duplicates are not rejected. All other fields are left untouched.
pub fn normalize(mut timeline: Timeline) -> Timeline {
    timeline.cues.sort_by_key(|cue| cue.index);
    timeline
}

/// Cues of `timeline` that carry `criterion`, or all cues without one.
///
/// An absent timeline yields nothing. The iterator is lazy and can be
/// cloned to restart it.
pub fn filtered_cues(
    timeline: Option<&Timeline>,
    criterion: Option<CueField>,
) -> impl Iterator<Item = &Cue> + Clone {
    timeline
        .map(|t| t.cues.as_slice())
        .unwrap_or_default()
        .iter()
        .filter(move |cue| criterion.is_none_or(|field| cue.has(field)))
}

/// The cue with the greatest index not exceeding the timeline's step.
///
/// Returns `None` if the timeline is absent, its step is absent or 0, or
/// no cue (matching `criterion`) qualifies.
pub fn latest_cue(timeline: Option<&Timeline>, criterion: Option<CueField>) -> Option<&Cue> {
    let step = timeline?.step.filter(|step| *step != 0)?;

    filtered_cues(timeline, criterion)
        .filter(|cue| cue.index <= step)
        .max_by_key(|cue| cue.index)
}

/// Process-wide cache of the event timeline.
pub struct TimelineStore<B> {
    backend: Arc<B>,
    cache: CachedResource<Timeline>,
}

impl<B: EventBackend> TimelineStore<B> {
    /// Create an empty store backed by `backend`.
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            cache: CachedResource::absent_when_none(),
        }
    }

    /// The cached timeline, without any I/O.
    pub async fn current(&self) -> Option<Arc<Timeline>> {
        self.cache.current().await
    }

    /// Return the cached timeline, fetching it once if the store is empty.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Backend`] if the fetch fails. The store stays
    /// empty in that case.
    pub async fn fetch_or_get(&self) -> Result<Option<Arc<Timeline>>, CoreError> {
        let backend = &self.backend;
        self.cache
            .get_or_fetch(move || async move {
                backend
                    .fetch_timeline()
                    .await
                    .map(|t| t.map(normalize))
            })
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "timeline fetch failed");
                CoreError::from(e)
            })
    }

    /// Re-fetch the timeline and apply it, even if one is cached.
    ///
    /// This is the change-notification path.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Backend`] if the fetch fails. The cached
    /// timeline is kept in that case.
    pub async fn refresh(&self) -> Result<Option<Arc<Timeline>>, CoreError> {
        let backend = &self.backend;
        let refreshed = self
            .cache
            .refetch(move || async move {
                backend
                    .fetch_timeline()
                    .await
                    .map(|t| t.map(normalize))
            })
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "timeline refresh failed");
                CoreError::from(e)
            })?;

        tracing::debug!(
            step = refreshed.as_ref().and_then(|t| t.step),
            cues = refreshed.as_ref().map_or(0, |t| t.cues.len()),
            "timeline refreshed"
        );
        Ok(refreshed)
    }

    /// Normalize and publish a new timeline, or clear the store with `None`.
    pub async fn apply_update(&self, timeline: Option<Timeline>) -> Option<Arc<Timeline>> {
        self.cache.publish(timeline.map(normalize)).await
    }

    /// Cues carrying `criterion` (all cues without one).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Backend`] if a cold-start fetch fails.
    pub async fn cues(&self, criterion: Option<CueField>) -> Result<Vec<Cue>, CoreError> {
        let timeline = self.fetch_or_get().await?;
        Ok(filtered_cues(timeline.as_deref(), criterion)
            .cloned()
            .collect())
    }

    /// The current cue carrying `criterion`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Backend`] if a cold-start fetch fails.
    pub async fn latest(&self, criterion: Option<CueField>) -> Result<Option<Cue>, CoreError> {
        let timeline = self.fetch_or_get().await?;
        Ok(latest_cue(timeline.as_deref(), criterion).cloned())
    }

    /// Persist a new step for `timeline`. Requires the `cues` permission.
    ///
    /// The local cache is not touched; the change reaches it through a
    /// refresh or a change notification.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Forbidden`] without calling the backend if the
    /// caller lacks the permission, [`CoreError::NotFound`] if no timeline
    /// has that id, or [`CoreError::Backend`] on backend failure.
    pub async fn advance_step(
        &self,
        caller: Option<&AccessToken>,
        timeline: TimelineId,
        index: i64,
    ) -> Result<(), CoreError> {
        require_permission(self.backend.as_ref(), caller, perms::CUES).await?;

        self.backend.update_timeline_step(timeline, index).await?;

        tracing::info!(%timeline, step = index, "timeline step advanced");
        Ok(())
    }

    /// Subscribe to every applied update.
    pub fn subscribe(&self) -> broadcast::Receiver<Option<Arc<Timeline>>> {
        self.cache.subscribe()
    }

    /// Unix milliseconds of the last applied update (0 before the first).
    pub fn last_update_ms(&self) -> i64 {
        self.cache.last_update_ms()
    }
}
