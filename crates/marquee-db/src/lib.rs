//! `PostgreSQL` data layer for the Marquee service.
//!
//! Each table family gets a small store that borrows the pool and speaks
//! `marquee-types`. [`PgBackend`] composes the stores behind the core's
//! [`EventBackend`](marquee_core::backend::EventBackend) trait, and the
//! listener keeps a [`TimelineStore`](marquee_core::timeline::TimelineStore)
//! in sync with `pg_notify` change events.
//!
//! Queries use runtime construction (not compile-time checked) so the
//! crate builds without a live database.
//!
//! # Modules
//!
//! - [`postgres`] -- Connection pool, configuration, migrations
//! - [`timeline_store`] -- `timelines` reads and step updates
//! - [`identity_store`] -- Real and decoy identity reads
//! - [`cast_store`] -- Vote inserts and reads, cast options
//! - [`event_config_store`] -- Event configuration row
//! - [`profile_store`] -- Operator profiles and hashed session tokens
//! - [`backend`] -- [`PgBackend`]
//! - [`listener`] -- `LISTEN timeline_changed` refresh loop
//! - [`error`] -- Shared error types

pub mod backend;
pub mod cast_store;
pub mod error;
pub mod event_config_store;
pub mod identity_store;
pub mod listener;
pub mod postgres;
pub mod profile_store;
pub mod timeline_store;

// Re-export primary types for convenience.
pub use backend::PgBackend;
pub use cast_store::{CastDbRow, CastStore, OptionRow};
pub use error::DbError;
pub use event_config_store::{EventConfigRow, EventConfigStore};
pub use identity_store::{IdentityRow, IdentityStore};
pub use listener::{TIMELINE_CHANNEL, listen_for_timeline_changes};
pub use postgres::{PostgresConfig, PostgresPool};
pub use profile_store::{ProfileStore, token_hash};
pub use timeline_store::{TimelineRow, TimelineRowStore};
