//! Capability tokens attached to operator profiles.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// May advance the event timeline.
pub const CUES: &str = "cues";

/// May read the per-identity vote status.
pub const VOTES: &str = "votes";

/// Unordered set of capability tokens.
///
/// Membership is exact: there is no hierarchy or wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    /// An empty permission set.
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Whether the set grants `permission`.
    pub fn contains(&self, permission: &str) -> bool {
        self.0.contains(permission)
    }

    /// Iterate over the granted tokens in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of granted tokens.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is granted.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
