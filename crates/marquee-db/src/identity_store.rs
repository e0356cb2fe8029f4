//! Reads on the `identities` and `"fake-identities"` tables.

use marquee_core::backend::IdentityName;
use marquee_types::{Identity, IdentityId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Operations on the identity tables.
pub struct IdentityStore<'a> {
    pool: &'a PgPool,
}

impl<'a> IdentityStore<'a> {
    /// Create a new identity store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every real identity, ordered by family name.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn all(&self) -> Result<Vec<Identity>, DbError> {
        let rows = sqlx::query_as::<_, IdentityRow>(
            r"SELECT id, first_name, last_name, middle_name, grade, restricted
              FROM identities
              ORDER BY last_name, first_name",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Identity::from).collect())
    }

    /// Every decoy identity. Decoys carry no middle name.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn decoys(&self) -> Result<Vec<Identity>, DbError> {
        let rows = sqlx::query_as::<_, IdentityRow>(
            r#"SELECT id, first_name, last_name, NULL::TEXT AS middle_name, grade, restricted
               FROM "fake-identities""#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Identity::from).collect())
    }

    /// Look up a real identity by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn find(&self, id: IdentityId) -> Result<Option<Identity>, DbError> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r"SELECT id, first_name, last_name, middle_name, grade, restricted
              FROM identities
              WHERE id = $1",
        )
        .bind(id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Identity::from))
    }

    /// Look up a real identity by exact name.
    ///
    /// `middle_name` is compared null-safely, so `None` only matches rows
    /// without a middle name. More than one match is an error.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails, or
    /// [`DbError::Ambiguous`] if several identities share the name.
    pub async fn find_by_name(&self, name: &IdentityName) -> Result<Option<Identity>, DbError> {
        let mut rows = sqlx::query_as::<_, IdentityRow>(
            r"SELECT id, first_name, last_name, middle_name, grade, restricted
              FROM identities
              WHERE first_name = $1
                AND last_name = $2
                AND middle_name IS NOT DISTINCT FROM $3
              LIMIT 2",
        )
        .bind(&name.first_name)
        .bind(&name.last_name)
        .bind(name.middle_name.as_deref())
        .fetch_all(self.pool)
        .await?;

        if rows.len() > 1 {
            return Err(DbError::Ambiguous(String::from(
                "multiple identities match the given name",
            )));
        }
        Ok(rows.pop().map(Identity::from))
    }
}

/// A row from either identity table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IdentityRow {
    /// Identity UUID.
    pub id: Uuid,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Middle name (always `NULL` for decoys).
    pub middle_name: Option<String>,
    /// Grade label.
    pub grade: Option<String>,
    /// Hidden from public listings.
    pub restricted: bool,
}

impl From<IdentityRow> for Identity {
    fn from(row: IdentityRow) -> Self {
        Self {
            id: IdentityId(row.id),
            first_name: row.first_name,
            last_name: row.last_name,
            middle_name: row.middle_name,
            grade: row.grade,
            restricted: row.restricted,
        }
    }
}
