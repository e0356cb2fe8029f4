//! Reads and step updates on the `timelines` table.
//!
//! The cue list is stored as a single JSONB array in the camelCase wire
//! shape, so a row maps directly onto [`Timeline`].

use marquee_types::{Cue, Timeline, TimelineId};
use sqlx::PgPool;
use sqlx::types::Json;

use crate::error::DbError;

/// Operations on the `timelines` table.
pub struct TimelineRowStore<'a> {
    pool: &'a PgPool,
}

impl<'a> TimelineRowStore<'a> {
    /// Create a new timeline store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Fetch the event's timeline (the lowest id if several exist).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails or the cue column
    /// does not decode.
    pub async fn fetch(&self) -> Result<Option<Timeline>, DbError> {
        let row = sqlx::query_as::<_, TimelineRow>(
            r"SELECT id, step, cues
              FROM timelines
              ORDER BY id
              LIMIT 1",
        )
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Timeline::from))
    }

    /// Set `step` on the given timeline.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no row has that id, or
    /// [`DbError::Postgres`] if the update fails.
    pub async fn update_step(&self, id: TimelineId, step: i64) -> Result<(), DbError> {
        let result = sqlx::query(r"UPDATE timelines SET step = $2 WHERE id = $1")
            .bind(id.into_inner())
            .bind(step)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("timeline {id} not found")));
        }

        tracing::debug!(timeline = %id, step, "Updated timeline step");
        Ok(())
    }

    /// Insert a timeline row. Used by seeding tools and tests.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn insert(&self, step: Option<i64>, cues: &[Cue]) -> Result<TimelineId, DbError> {
        let id: i64 = sqlx::query_scalar(
            r"INSERT INTO timelines (step, cues) VALUES ($1, $2) RETURNING id",
        )
        .bind(step)
        .bind(Json(cues))
        .fetch_one(self.pool)
        .await?;

        Ok(TimelineId(id))
    }
}

/// A row from the `timelines` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TimelineRow {
    /// Row id.
    pub id: i64,
    /// Playback position.
    pub step: Option<i64>,
    /// Cue list as stored.
    pub cues: Json<Vec<Cue>>,
}

impl From<TimelineRow> for Timeline {
    fn from(row: TimelineRow) -> Self {
        Self {
            id: TimelineId(row.id),
            step: row.step,
            cues: row.cues.0,
        }
    }
}
