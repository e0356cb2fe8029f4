//! Timeline change notifications.
//!
//! A trigger on `timelines` issues `pg_notify('timeline_changed', id)` on
//! every insert or update. [`listen_for_timeline_changes`] holds a
//! dedicated `LISTEN` connection and refreshes the [`TimelineStore`] for
//! each notification, so every process sees an operator's step change.
//!
//! Notifications sent while the connection is down are not queued by
//! `PostgreSQL`. Every reconnect is therefore followed by an unconditional
//! refresh.

use std::time::Duration;

use marquee_core::backend::EventBackend;
use marquee_core::timeline::TimelineStore;
use sqlx::postgres::PgListener;

use crate::error::DbError;
use crate::postgres::PostgresPool;

/// Notification channel raised by the `timelines` trigger.
pub const TIMELINE_CHANNEL: &str = "timeline_changed";

/// Delay between attempts to re-establish the listen connection.
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// What the listen connection reported.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ListenEvent {
    /// A timeline row changed; the payload is its id.
    Changed(String),
    /// The connection dropped and was re-established. Anything notified in
    /// between is lost.
    Reconnected,
}

/// Refresh `store` on every timeline change notification. Runs until the
/// listen connection cannot be established at all.
///
/// A failed refresh is logged and the loop keeps going; the store keeps
/// its previous value.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the initial `LISTEN` fails.
pub async fn listen_for_timeline_changes<B: EventBackend>(
    pool: &PostgresPool,
    store: &TimelineStore<B>,
) -> Result<(), DbError> {
    let mut listener = subscribe(pool).await?;
    tracing::info!(channel = TIMELINE_CHANNEL, "Listening for timeline changes");

    loop {
        let err = forward_events(&mut listener, store).await;
        tracing::warn!(error = %err, "Timeline listener connection lost, reconnecting");

        listener = loop {
            tokio::time::sleep(RECONNECT_DELAY).await;
            match subscribe(pool).await {
                Ok(fresh) => break fresh,
                Err(e) => tracing::warn!(error = %e, "Timeline listener reconnect failed"),
            }
        };
        apply_event(store, &ListenEvent::Reconnected).await;
    }
}

async fn subscribe(pool: &PostgresPool) -> Result<PgListener, DbError> {
    let mut listener = pool.listener().await?;
    listener.listen(TIMELINE_CHANNEL).await?;
    Ok(listener)
}

/// Apply listener events to `store` until the connection fails outright.
///
/// `try_recv` yields `None` after it has transparently reconnected and
/// re-issued `LISTEN`.
async fn forward_events<B: EventBackend>(
    listener: &mut PgListener,
    store: &TimelineStore<B>,
) -> sqlx::Error {
    loop {
        let event = match listener.try_recv().await {
            Ok(Some(notification)) => ListenEvent::Changed(notification.payload().to_owned()),
            Ok(None) => ListenEvent::Reconnected,
            Err(e) => return e,
        };
        apply_event(store, &event).await;
    }
}

async fn apply_event<B: EventBackend>(store: &TimelineStore<B>, event: &ListenEvent) {
    match event {
        ListenEvent::Changed(timeline) => {
            tracing::debug!(timeline = %timeline, "Timeline change notified");
        }
        ListenEvent::Reconnected => {
            tracing::info!("Timeline listener reconnected, resynchronizing");
        }
    }

    if let Err(e) = store.refresh().await {
        tracing::warn!(error = %e, "Timeline refresh after listener event failed");
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

    use std::sync::Arc;

    use marquee_core::memory::MemoryBackend;
    use marquee_types::{Cue, Timeline, TimelineId};

    use super::*;

    fn timeline(step: i64) -> Timeline {
        Timeline {
            id: TimelineId(1),
            step: Some(step),
            cues: vec![Cue::at(1), Cue::at(2), Cue::at(3)],
        }
    }

    #[tokio::test]
    async fn reconnect_picks_up_changes_missed_while_disconnected() {
        let backend = Arc::new(MemoryBackend::new().with_timeline(timeline(1)));
        let store = TimelineStore::new(Arc::clone(&backend));
        store.fetch_or_get().await.unwrap();

        // Another process advances the show while this listener is down.
        backend.update_timeline_step(TimelineId(1), 3).await.unwrap();
        assert_eq!(store.current().await.unwrap().step, Some(1));

        apply_event(&store, &ListenEvent::Reconnected).await;
        assert_eq!(store.current().await.unwrap().step, Some(3));
    }

    #[tokio::test]
    async fn notification_refreshes_the_store() {
        let backend = Arc::new(MemoryBackend::new().with_timeline(timeline(1)));
        let store = TimelineStore::new(Arc::clone(&backend));
        store.fetch_or_get().await.unwrap();
        let fetches = backend.timeline_fetches();

        backend.update_timeline_step(TimelineId(1), 2).await.unwrap();
        apply_event(&store, &ListenEvent::Changed(String::from("1"))).await;

        assert_eq!(backend.timeline_fetches(), fetches + 1);
        assert_eq!(store.current().await.unwrap().step, Some(2));
    }

    #[tokio::test]
    async fn failed_resync_keeps_the_cached_timeline() {
        let backend = Arc::new(MemoryBackend::new().with_timeline(timeline(2)));
        let store = TimelineStore::new(Arc::clone(&backend));
        store.fetch_or_get().await.unwrap();

        backend.set_failing(true);
        apply_event(&store, &ListenEvent::Reconnected).await;
        assert_eq!(store.current().await.unwrap().step, Some(2));
    }
}
