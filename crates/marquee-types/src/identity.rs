//! Attendee identities and their public projection.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::IdentityId;

/// A real or decoy attendee record.
///
/// Decoys live in their own table and are only ever used to pad public
/// listings. They are never considered when resolving a vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Identity {
    /// Row identifier.
    pub id: IdentityId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Patronymic or middle name, if recorded.
    #[serde(default)]
    pub middle_name: Option<String>,
    /// School grade or class label.
    #[serde(default)]
    pub grade: Option<String>,
    /// Hidden from every public listing when set.
    #[serde(default)]
    pub restricted: bool,
}

impl Identity {
    /// Project onto the only shape that may be exposed publicly.
    pub fn to_public(&self) -> PublicIdentity {
        PublicIdentity {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            grade: self.grade.clone(),
        }
    }
}

/// Privacy-filtered identity as served by the public roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PublicIdentity {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// School grade or class label.
    pub grade: Option<String>,
}
