//! Reads on the `"event-config"` table.

use marquee_types::EventConfig;
use sqlx::PgPool;

use crate::error::DbError;

/// Operations on the `"event-config"` table.
pub struct EventConfigStore<'a> {
    pool: &'a PgPool,
}

impl<'a> EventConfigStore<'a> {
    /// Create a new event config store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Fetch the configuration row (the first by event key if several
    /// exist).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn fetch(&self) -> Result<Option<EventConfig>, DbError> {
        let row = sqlx::query_as::<_, EventConfigRow>(
            r#"SELECT event, name, description, cover_url, logo_url, restricted,
                      state, stream_shown, twitch_stream_channel, voting_open
               FROM "event-config"
               ORDER BY event
               LIMIT 1"#,
        )
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(EventConfig::from))
    }
}

/// A row from the `"event-config"` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventConfigRow {
    /// Event key.
    pub event: String,
    /// Display name.
    pub name: Option<String>,
    /// Long description.
    pub description: Option<String>,
    /// Cover image URL.
    pub cover_url: Option<String>,
    /// Logo URL.
    pub logo_url: Option<String>,
    /// Public pages restricted.
    pub restricted: bool,
    /// Presentation state document.
    pub state: serde_json::Value,
    /// Livestream embed shown.
    pub stream_shown: bool,
    /// Twitch channel.
    pub twitch_stream_channel: Option<String>,
    /// Votes accepted.
    pub voting_open: bool,
}

impl From<EventConfigRow> for EventConfig {
    fn from(row: EventConfigRow) -> Self {
        Self {
            event: row.event,
            name: row.name,
            description: row.description,
            cover_url: row.cover_url,
            logo_url: row.logo_url,
            restricted: row.restricted,
            state: row.state,
            stream_shown: row.stream_shown,
            twitch_stream_channel: row.twitch_stream_channel,
            voting_open: row.voting_open,
        }
    }
}
