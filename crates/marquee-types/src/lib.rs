//! Shared type definitions for the Marquee service.
//!
//! This crate is the single source of truth for the data model shared by
//! the core, the data layer, and the HTTP API. Types flow downstream to
//! `TypeScript` via `ts-rs` for the attendee and operator frontends.
//!
//! # Modules
//!
//! - [`ids`] -- Typed identifiers (UUID and `BIGINT` keys)
//! - [`timeline`] -- Cues, stage display variants, the timeline itself
//! - [`identity`] -- Attendee identities and their public projection
//! - [`vote`] -- Cast options, cast rows, vote status
//! - [`event`] -- Event configuration row
//! - [`perms`] -- Permission sets and known capability tokens

pub mod event;
pub mod identity;
pub mod ids;
pub mod perms;
pub mod timeline;
pub mod vote;

// Re-export all public types at crate root for convenience.
pub use event::EventConfig;
pub use identity::{Identity, PublicIdentity};
pub use ids::{IdentityId, OptionId, TimelineId, UserId};
pub use perms::PermissionSet;
pub use timeline::{
    Cue, CueField, LivestreamCue, StageCue, StageDisplay, Timeline, UnknownCueField, WebsiteCue,
};
pub use vote::{CastOption, CastRow, IdentityVoteStatus, NewCast, SELECTIONS_PER_CAST};
