//! Per-event configuration row.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Event-wide configuration and display flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EventConfig {
    /// Event key.
    pub event: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Long description.
    #[serde(default)]
    pub description: Option<String>,
    /// Cover image URL.
    #[serde(default)]
    pub cover_url: Option<String>,
    /// Logo URL.
    #[serde(default)]
    pub logo_url: Option<String>,
    /// Restricts the public pages when set.
    #[serde(default)]
    pub restricted: bool,
    /// Free-form theme/presentation state document.
    #[serde(default)]
    pub state: serde_json::Value,
    /// Whether the livestream embed is shown.
    #[serde(default)]
    pub stream_shown: bool,
    /// Twitch channel carrying the livestream.
    #[serde(default)]
    pub twitch_stream_channel: Option<String>,
    /// Whether votes are currently accepted.
    #[serde(default)]
    pub voting_open: bool,
}
