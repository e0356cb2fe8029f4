//! Vote persistence on the `casts` and `"cast-options"` tables.
//!
//! A vote is one `INSERT`. The primary key on `casts.id` is what makes a
//! second vote for the same identity fail; nothing here reads before
//! writing.

use chrono::{DateTime, Utc};
use marquee_types::{CastOption, CastRow, IdentityId, NewCast, OptionId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Operations on the vote tables.
pub struct CastStore<'a> {
    pool: &'a PgPool,
}

impl<'a> CastStore<'a> {
    /// Create a new cast store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a vote.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] wrapping a unique violation if the
    /// identity already voted, or a foreign key violation if the identity
    /// or an option does not exist.
    pub async fn insert(&self, cast: &NewCast) -> Result<(), DbError> {
        let [selection_1, selection_2, selection_3] = cast.selections;

        sqlx::query(
            r"INSERT INTO casts (id, selection_1, selection_2, selection_3, extracted_ip)
              VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(cast.id.into_inner())
        .bind(selection_1.into_inner())
        .bind(selection_2.into_inner())
        .bind(selection_3.into_inner())
        .bind(cast.extracted_ip.as_deref())
        .execute(self.pool)
        .await?;

        tracing::debug!(identity = %cast.id, "Inserted cast");
        Ok(())
    }

    /// Every recorded vote, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn all(&self) -> Result<Vec<CastRow>, DbError> {
        let rows = sqlx::query_as::<_, CastDbRow>(
            r"SELECT id, selection_1, selection_2, selection_3, created_at, extracted_ip
              FROM casts
              ORDER BY created_at",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(CastRow::from).collect())
    }

    /// Every cast option, by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn options(&self) -> Result<Vec<CastOption>, DbError> {
        let rows = sqlx::query_as::<_, OptionRow>(
            r#"SELECT id, name, author, description, image_urls
               FROM "cast-options"
               ORDER BY id"#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(CastOption::from).collect())
    }
}

/// A row from the `casts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CastDbRow {
    /// Voting identity.
    pub id: Uuid,
    /// First selection.
    pub selection_1: Option<i64>,
    /// Second selection.
    pub selection_2: Option<i64>,
    /// Third selection.
    pub selection_3: Option<i64>,
    /// Insert time.
    pub created_at: DateTime<Utc>,
    /// Client address.
    pub extracted_ip: Option<String>,
}

impl From<CastDbRow> for CastRow {
    fn from(row: CastDbRow) -> Self {
        Self {
            id: IdentityId(row.id),
            selection_1: row.selection_1.map(OptionId),
            selection_2: row.selection_2.map(OptionId),
            selection_3: row.selection_3.map(OptionId),
            created_at: row.created_at,
            extracted_ip: row.extracted_ip,
        }
    }
}

/// A row from the `"cast-options"` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OptionRow {
    /// Option id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Author or performer.
    pub author: String,
    /// Longer description.
    pub description: Option<String>,
    /// Gallery images.
    pub image_urls: Vec<String>,
}

impl From<OptionRow> for CastOption {
    fn from(row: OptionRow) -> Self {
        Self {
            id: OptionId(row.id),
            name: row.name,
            author: row.author,
            description: row.description,
            image_urls: row.image_urls,
        }
    }
}
