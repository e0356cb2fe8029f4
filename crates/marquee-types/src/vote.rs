//! Cast options and cast (vote) rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::identity::Identity;
use crate::ids::{IdentityId, OptionId};

/// Number of distinct options every vote must select.
pub const SELECTIONS_PER_CAST: usize = 3;

/// Something attendees can vote for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CastOption {
    /// Row identifier.
    pub id: OptionId,
    /// Display name.
    pub name: String,
    /// Author or performer.
    pub author: String,
    /// Longer description.
    #[serde(default)]
    pub description: Option<String>,
    /// Gallery images.
    #[serde(default)]
    pub image_urls: Vec<String>,
}

/// A persisted vote. At most one exists per identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CastRow {
    /// The voting identity; also the primary key.
    pub id: IdentityId,
    /// First selected option.
    pub selection_1: Option<OptionId>,
    /// Second selected option.
    pub selection_2: Option<OptionId>,
    /// Third selected option.
    pub selection_3: Option<OptionId>,
    /// When the vote was recorded.
    pub created_at: DateTime<Utc>,
    /// Client address, kept for abuse tracing only.
    #[serde(default)]
    pub extracted_ip: Option<String>,
}

/// A vote ready to be inserted.
///
/// The selections are distinct and in ascending option-id order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCast {
    /// The voting identity.
    pub id: IdentityId,
    /// The three chosen options.
    pub selections: [OptionId; SELECTIONS_PER_CAST],
    /// Client address, if known.
    pub extracted_ip: Option<String>,
}

/// An identity joined with its vote, for the operator vote-status view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct IdentityVoteStatus {
    /// The identity.
    #[serde(flatten)]
    pub identity: Identity,
    /// The identity's vote, if it has cast one.
    pub vote: Option<CastRow>,
}
