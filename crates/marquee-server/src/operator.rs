//! Operator REST API handlers.
//!
//! These endpoints require a bearer token. Authorization is checked in the
//! core against the caller's profile permissions.
//!
//! # Endpoints
//!
//! | Method | Path | Permission | Description |
//! |--------|------|------------|-------------|
//! | `PUT` | `/api/cue` | `cues` | Advance the timeline step |
//! | `GET` | `/api/me/perms` | any token | Caller's permission set |
//! | `GET` | `/api/votes` | `votes` | Identities with their votes |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use marquee_core::access::caller_permissions;
use marquee_core::backend::EventBackend;
use marquee_types::{IdentityVoteStatus, PermissionSet, TimelineId};
use serde::Deserialize;

use crate::error::ApiError;
use crate::extract::Caller;
use crate::state::AppState;

/// Request body for `PUT /api/cue`.
#[derive(Debug, Deserialize)]
pub struct AdvanceCueRequest {
    /// The timeline to move.
    #[serde(rename = "timelineID")]
    pub timeline_id: TimelineId,
    /// The new step (a cue index).
    pub index: i64,
}

/// Advance the timeline to `index`.
///
/// After the write the store is refreshed so this process serves the new
/// step even without the change listener. A failed refresh is logged; the
/// write itself already succeeded.
///
/// # Errors
///
/// 403 without the `cues` permission, 404 for an unknown timeline, 422 for
/// a malformed body, 500 on backend failure.
pub async fn advance_cue<B: EventBackend>(
    State(state): State<Arc<AppState<B>>>,
    caller: Caller,
    body: Result<Json<AdvanceCueRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;

    state
        .timeline
        .advance_step(caller.token(), request.timeline_id, request.index)
        .await?;

    if let Err(e) = state.timeline.refresh().await {
        tracing::warn!(error = %e, "Timeline refresh after step change failed");
    }

    Ok(StatusCode::OK)
}

/// The caller's permission set, or `null` for an anonymous or unknown
/// caller.
///
/// # Errors
///
/// Returns 500 if the lookup fails.
pub async fn my_permissions<B: EventBackend>(
    State(state): State<Arc<AppState<B>>>,
    caller: Caller,
) -> Result<Json<Option<PermissionSet>>, ApiError> {
    let perms = caller_permissions(state.backend.as_ref(), caller.token()).await?;
    Ok(Json(perms))
}

/// Every real identity with its vote.
///
/// # Errors
///
/// 403 without the `votes` permission, 500 on backend failure.
pub async fn vote_status<B: EventBackend>(
    State(state): State<Arc<AppState<B>>>,
    caller: Caller,
) -> Result<Json<Vec<IdentityVoteStatus>>, ApiError> {
    Ok(Json(state.ledger.vote_status(caller.token()).await?))
}
