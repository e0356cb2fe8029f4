//! Operator profiles and bearer-token sessions.
//!
//! Tokens are never stored. A session row holds the SHA-256 of the token,
//! hex encoded, and the lookup hashes the presented token the same way.

use chrono::{DateTime, Utc};
use marquee_types::{PermissionSet, UserId};
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use crate::error::DbError;

/// Hex-encoded SHA-256 of a bearer token.
pub fn token_hash(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Operations on the `profiles` and `sessions` tables.
pub struct ProfileStore<'a> {
    pool: &'a PgPool,
}

impl<'a> ProfileStore<'a> {
    /// Create a new profile store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Permissions of the profile behind an unexpired session token.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn permissions_for_token(
        &self,
        token: &str,
    ) -> Result<Option<PermissionSet>, DbError> {
        let perms: Option<Vec<String>> = sqlx::query_scalar(
            r"SELECT p.perms
              FROM sessions s
              JOIN profiles p ON p.id = s.user_id
              WHERE s.token_hash = $1
                AND s.expires_at > now()",
        )
        .bind(token_hash(token))
        .fetch_optional(self.pool)
        .await?;

        Ok(perms.map(|perms| perms.into_iter().collect()))
    }

    /// Create or replace a profile's permissions.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the upsert fails.
    pub async fn upsert_profile(&self, user: UserId, perms: &PermissionSet) -> Result<(), DbError> {
        let perms: Vec<&str> = perms.iter().collect();
        sqlx::query(
            r"INSERT INTO profiles (id, perms) VALUES ($1, $2)
              ON CONFLICT (id) DO UPDATE SET perms = EXCLUDED.perms",
        )
        .bind(user.into_inner())
        .bind(&perms)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Register a session token for a profile.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn create_session(
        &self,
        user: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO sessions (token_hash, user_id, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(token_hash(token))
        .bind(user.into_inner())
        .bind(expires_at)
        .execute(self.pool)
        .await?;

        tracing::info!(user = %user, "Session created");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_hash_is_lowercase_hex_sha256() {
        assert_eq!(
            token_hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(token_hash("").len(), 64);
    }
}
