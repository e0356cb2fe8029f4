//! [`PgBackend`]: the core's [`EventBackend`] over `PostgreSQL`.

use marquee_core::backend::{AccessToken, BackendError, EventBackend, IdentityName};
use marquee_types::{
    CastOption, CastRow, EventConfig, Identity, IdentityId, NewCast, PermissionSet, Timeline,
    TimelineId,
};
use sqlx::PgPool;

use crate::cast_store::CastStore;
use crate::error::DbError;
use crate::event_config_store::EventConfigStore;
use crate::identity_store::IdentityStore;
use crate::postgres::PostgresPool;
use crate::profile_store::ProfileStore;
use crate::timeline_store::TimelineRowStore;

/// Event data backed by a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    /// Build a backend over an open pool.
    pub fn new(pool: &PostgresPool) -> Self {
        Self {
            pool: pool.pool().clone(),
        }
    }

    /// The underlying pool.
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn seam<T>(result: Result<T, DbError>) -> Result<T, BackendError> {
    result.map_err(|e| {
        let err = BackendError::from(e);
        if matches!(err, BackendError::Query(_)) {
            tracing::error!(error = %err, "Database query failed");
        }
        err
    })
}

impl EventBackend for PgBackend {
    async fn fetch_timeline(&self) -> Result<Option<Timeline>, BackendError> {
        seam(TimelineRowStore::new(&self.pool).fetch().await)
    }

    async fn update_timeline_step(&self, timeline: TimelineId, step: i64) -> Result<(), BackendError> {
        seam(TimelineRowStore::new(&self.pool).update_step(timeline, step).await)
    }

    async fn fetch_identities(&self) -> Result<Vec<Identity>, BackendError> {
        seam(IdentityStore::new(&self.pool).all().await)
    }

    async fn fetch_decoy_identities(&self) -> Result<Vec<Identity>, BackendError> {
        seam(IdentityStore::new(&self.pool).decoys().await)
    }

    async fn find_identity(&self, id: IdentityId) -> Result<Option<Identity>, BackendError> {
        seam(IdentityStore::new(&self.pool).find(id).await)
    }

    async fn lookup_identity_by_name(
        &self,
        name: &IdentityName,
    ) -> Result<Option<Identity>, BackendError> {
        seam(IdentityStore::new(&self.pool).find_by_name(name).await)
    }

    async fn insert_cast(&self, cast: &NewCast) -> Result<(), BackendError> {
        seam(CastStore::new(&self.pool).insert(cast).await)
    }

    async fn fetch_casts(&self) -> Result<Vec<CastRow>, BackendError> {
        seam(CastStore::new(&self.pool).all().await)
    }

    async fn fetch_cast_options(&self) -> Result<Vec<CastOption>, BackendError> {
        seam(CastStore::new(&self.pool).options().await)
    }

    async fn fetch_event_config(&self) -> Result<Option<EventConfig>, BackendError> {
        seam(EventConfigStore::new(&self.pool).fetch().await)
    }

    async fn caller_permissions(
        &self,
        token: &AccessToken,
    ) -> Result<Option<PermissionSet>, BackendError> {
        seam(
            ProfileStore::new(&self.pool)
                .permissions_for_token(token.as_str())
                .await,
        )
    }
}
