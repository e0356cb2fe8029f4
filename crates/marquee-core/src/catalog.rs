//! Cached read-mostly event data: cast options and the event config.

use std::sync::Arc;

use marquee_types::{CastOption, EventConfig};

use crate::backend::EventBackend;
use crate::cache::CachedResource;
use crate::error::CoreError;

/// Cast options and event configuration, cached process-wide.
pub struct EventCatalog<B> {
    backend: Arc<B>,
    options: CachedResource<Vec<CastOption>>,
    config: CachedResource<EventConfig>,
}

impl<B: EventBackend> EventCatalog<B> {
    /// Create an empty catalog backed by `backend`.
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            options: CachedResource::new(Vec::is_empty),
            config: CachedResource::absent_when_none(),
        }
    }

    /// The option list, fetched if the cache holds none (an empty list
    /// counts as none).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Backend`] if the fetch fails.
    pub async fn cast_options(&self) -> Result<Vec<CastOption>, CoreError> {
        let backend = &self.backend;
        let options = self
            .options
            .get_or_fetch(move || async move { backend.fetch_cast_options().await.map(Some) })
            .await?;

        Ok(options.as_deref().cloned().unwrap_or_default())
    }

    /// The event configuration row, fetched if absent or when `refetch`
    /// is set.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Backend`] if the fetch fails.
    pub async fn event_config(&self, refetch: bool) -> Result<Option<Arc<EventConfig>>, CoreError> {
        let backend = &self.backend;
        let fetch = move || async move { backend.fetch_event_config().await };

        let config = if refetch {
            tracing::debug!("event config refetch requested");
            self.config.refetch(fetch).await?
        } else {
            self.config.get_or_fetch(fetch).await?
        };
        Ok(config)
    }
}
