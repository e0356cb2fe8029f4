//! Timeline and cue types.
//!
//! A [`Timeline`] is the event's full script: an ordered sequence of
//! [`Cue`]s plus the current playback position (`step`). Cue payloads are
//! stored as a JSON document column, so the wire format here is the storage
//! format too (camelCase keys, absent fields omitted).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::TimelineId;

/// A single point in the event's script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Cue {
    /// Unique ordering key. Cues are ordered by index, never by insertion.
    #[ts(as = "f64")]
    pub index: i64,
    /// Unix time the cue takes effect. Only used for countdown display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional, as = "Option<f64>")]
    pub timestamp: Option<i64>,
    /// What is said before moving on to the next cue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub dialogs: Option<String>,
    /// Short operator-facing summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub comment: Option<String>,
    /// What the stage screen shows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub stage_display: Option<StageDisplay>,
    /// Prompt for the stage crew.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub stage_cue: Option<StageCue>,
    /// Livestream overlay state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub livestream: Option<LivestreamCue>,
    /// Public website state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub website: Option<WebsiteCue>,
}

impl Cue {
    /// Create a bare cue with only an index set.
    pub fn at(index: i64) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    /// Whether the given field is present on this cue.
    pub const fn has(&self, field: CueField) -> bool {
        match field {
            CueField::Index => true,
            CueField::Timestamp => self.timestamp.is_some(),
            CueField::Dialogs => self.dialogs.is_some(),
            CueField::Comment => self.comment.is_some(),
            CueField::StageDisplay => self.stage_display.is_some(),
            CueField::StageCue => self.stage_cue.is_some(),
            CueField::Livestream => self.livestream.is_some(),
            CueField::Website => self.website.is_some(),
        }
    }
}

/// Content shown on the stage screen.
///
/// Serialized as `{"type": "...", "content": "..."}`. `content` is a hex
/// color code for [`StageDisplay::Color`] and a URL for every other kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum StageDisplay {
    /// Solid color, hex code.
    Color(String),
    /// Still image URL.
    Image(String),
    /// Video file URL.
    Video(String),
    /// `YouTube` video URL.
    YtVideo(String),
}

impl StageDisplay {
    /// The raw content string (hex code or URL).
    pub fn content(&self) -> &str {
        match self {
            Self::Color(c) | Self::Image(c) | Self::Video(c) | Self::YtVideo(c) => c,
        }
    }
}

/// Prompt for the stage crew.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StageCue {
    /// Concise text carrying critical information.
    pub yelp: String,
}

/// Livestream overlay payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct LivestreamCue {
    /// Overlay text, usually the act name.
    pub overlay_text: String,
}

/// Website headline payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WebsiteCue {
    /// Headline shown to attendees.
    pub headline: String,
}

/// Field names usable as a presence criterion when filtering cues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum CueField {
    /// `index` (always present).
    Index,
    /// `timestamp`.
    Timestamp,
    /// `dialogs`.
    Dialogs,
    /// `comment`.
    Comment,
    /// `stageDisplay`.
    StageDisplay,
    /// `stageCue`.
    StageCue,
    /// `livestream`.
    Livestream,
    /// `website`.
    Website,
}

impl CueField {
    /// Wire name of the field.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Timestamp => "timestamp",
            Self::Dialogs => "dialogs",
            Self::Comment => "comment",
            Self::StageDisplay => "stageDisplay",
            Self::StageCue => "stageCue",
            Self::Livestream => "livestream",
            Self::Website => "website",
        }
    }
}

impl core::str::FromStr for CueField {
    type Err = UnknownCueField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "index" => Ok(Self::Index),
            "timestamp" => Ok(Self::Timestamp),
            "dialogs" => Ok(Self::Dialogs),
            "comment" => Ok(Self::Comment),
            "stageDisplay" => Ok(Self::StageDisplay),
            "stageCue" => Ok(Self::StageCue),
            "livestream" => Ok(Self::Livestream),
            "website" => Ok(Self::Website),
            other => Err(UnknownCueField(other.to_owned())),
        }
    }
}

/// A criterion name that does not match any [`CueField`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown cue field: {0}")]
pub struct UnknownCueField(pub String);

/// The event's full script plus playback position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Timeline {
    /// Row identifier.
    pub id: TimelineId,
    /// Current position. `None` (or 0) means the show has not started.
    #[serde(default)]
    #[ts(as = "Option<f64>")]
    pub step: Option<i64>,
    /// The script, kept sorted ascending by [`Cue::index`] once stored.
    #[serde(default)]
    pub cues: Vec<Cue>,
}
