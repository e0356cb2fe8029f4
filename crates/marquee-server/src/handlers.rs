//! Public REST endpoint handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness probe |
//! | `GET` | `/api/timeline` | Cached timeline |
//! | `GET` | `/api/timeline/cues` | Cues, optionally filtered by field |
//! | `GET` | `/api/timeline/latest` | Current cue, optionally by field |
//! | `GET` | `/api/identities` | Shuffled public roster |
//! | `POST` | `/api/vote` | Cast a vote |
//! | `GET` | `/api/cast-options` | Cast option list |
//! | `GET` | `/api/event-config` | Event configuration |

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use marquee_core::backend::{EventBackend, IdentityName};
use marquee_core::ledger::{IdentityRef, VoteSubmission};
use marquee_core::roster::public_roster;
use marquee_core::timeline::{filtered_cues, latest_cue};
use marquee_types::{
    CastOption, Cue, CueField, EventConfig, IdentityId, OptionId, PublicIdentity, Timeline,
};
use serde::Deserialize;

use crate::error::ApiError;
use crate::extract::ClientIp;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Query parameters for the cue endpoints.
#[derive(Debug, Deserialize)]
pub struct CueQuery {
    /// Only cues carrying this field (wire name, e.g. `stageDisplay`).
    pub criterion: Option<String>,
}

impl CueQuery {
    fn field(&self) -> Result<Option<CueField>, ApiError> {
        self.criterion
            .as_deref()
            .map(CueField::from_str)
            .transpose()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))
    }
}

/// Query parameters for `GET /api/event-config`.
#[derive(Debug, Default, Deserialize)]
pub struct EventConfigQuery {
    /// Bypass the cache.
    #[serde(default)]
    pub refetch: bool,
}

/// Body of `POST /api/vote`.
///
/// The voter is named either by `id` or by `first_name` + `last_name`
/// (+ `middle_name`). Every field is optional here; the ledger reports
/// what is missing.
#[derive(Debug, Default, Deserialize)]
pub struct VoteRequest {
    /// Identity id.
    pub id: Option<IdentityId>,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Middle name.
    pub middle_name: Option<String>,
    /// Turnstile token.
    pub turnstile: Option<String>,
    /// Option id to chosen flag.
    pub selection: Option<BTreeMap<OptionId, bool>>,
}

impl VoteRequest {
    fn into_submission(self, client_ip: ClientIp) -> VoteSubmission {
        let identity = match (self.id, self.first_name, self.last_name) {
            (Some(id), _, _) => Some(IdentityRef::Id(id)),
            (None, Some(first_name), Some(last_name)) => Some(IdentityRef::Name(IdentityName {
                first_name,
                last_name,
                middle_name: self.middle_name,
            })),
            _ => None,
        };

        VoteSubmission {
            identity,
            proof_token: self.turnstile,
            selection: self.selection,
            client_ip: client_ip.0.map(|ip| ip.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

/// Liveness probe.
#[allow(clippy::unused_async)]
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

/// The cached timeline (fetched once on a cold cache), or `null`.
///
/// # Errors
///
/// Returns 500 if the cold-start fetch fails.
pub async fn get_timeline<B: EventBackend>(
    State(state): State<Arc<AppState<B>>>,
) -> Result<Json<Option<Timeline>>, ApiError> {
    let timeline = state.timeline.fetch_or_get().await?;
    Ok(Json(timeline.as_deref().cloned()))
}

/// Cues carrying `criterion`, or all cues.
///
/// # Errors
///
/// Returns 422 for an unknown criterion, 500 if the cold-start fetch fails.
pub async fn get_cues<B: EventBackend>(
    State(state): State<Arc<AppState<B>>>,
    Query(query): Query<CueQuery>,
) -> Result<Json<Vec<Cue>>, ApiError> {
    let field = query.field()?;
    let timeline = state.timeline.fetch_or_get().await?;

    Ok(Json(
        filtered_cues(timeline.as_deref(), field).cloned().collect(),
    ))
}

/// The current cue, or `null`.
///
/// # Errors
///
/// Returns 422 for an unknown criterion, 500 if the cold-start fetch fails.
pub async fn get_latest_cue<B: EventBackend>(
    State(state): State<Arc<AppState<B>>>,
    Query(query): Query<CueQuery>,
) -> Result<Json<Option<Cue>>, ApiError> {
    let field = query.field()?;
    let timeline = state.timeline.fetch_or_get().await?;

    Ok(Json(latest_cue(timeline.as_deref(), field).cloned()))
}

// ---------------------------------------------------------------------------
// Identities and votes
// ---------------------------------------------------------------------------

/// Real and decoy identities, shuffled, restricted rows removed.
///
/// # Errors
///
/// Returns 500 if either identity fetch fails.
pub async fn list_identities<B: EventBackend>(
    State(state): State<Arc<AppState<B>>>,
) -> Result<Json<Vec<PublicIdentity>>, ApiError> {
    Ok(Json(public_roster(state.backend.as_ref()).await?))
}

/// Cast a vote. Responds 200 with an empty body on success.
///
/// # Errors
///
/// 422 for a malformed body, missing fields, or an invalid selection; 403
/// if the proof fails; 404 if voting is closed or the identity is
/// unknown; 409 for a second vote; 500 on backend failure.
pub async fn cast_vote<B: EventBackend>(
    State(state): State<Arc<AppState<B>>>,
    client_ip: ClientIp,
    body: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;

    state
        .ledger
        .cast_vote(&state.verifier, request.into_submission(client_ip))
        .await?;

    Ok(StatusCode::OK)
}

/// The cast option list.
///
/// # Errors
///
/// Returns 500 if the fetch fails on a cold cache.
pub async fn list_cast_options<B: EventBackend>(
    State(state): State<Arc<AppState<B>>>,
) -> Result<Json<Vec<CastOption>>, ApiError> {
    Ok(Json(state.catalog.cast_options().await?))
}

/// The event configuration, or `null`. `?refetch=true` bypasses the cache.
///
/// # Errors
///
/// Returns 500 if a fetch fails.
pub async fn get_event_config<B: EventBackend>(
    State(state): State<Arc<AppState<B>>>,
    Query(query): Query<EventConfigQuery>,
) -> Result<Json<Option<EventConfig>>, ApiError> {
    let config = state.catalog.event_config(query.refetch).await?;
    Ok(Json(config.as_deref().cloned()))
}
