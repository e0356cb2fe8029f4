//! Axum router construction for the Marquee API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS and request tracing.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use marquee_core::backend::EventBackend;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, operator, ws};

/// Build the complete Axum router.
///
/// The attendee and operator frontends are served from other origins, so
/// CORS allows any origin. Operator routes authenticate by bearer token,
/// not cookies.
pub fn build_router<B: EventBackend>(state: Arc<AppState<B>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        // WebSocket
        .route("/ws/timeline", get(ws::ws_timeline::<B>))
        // Public API
        .route("/api/timeline", get(handlers::get_timeline::<B>))
        .route("/api/timeline/cues", get(handlers::get_cues::<B>))
        .route("/api/timeline/latest", get(handlers::get_latest_cue::<B>))
        .route("/api/identities", get(handlers::list_identities::<B>))
        .route("/api/vote", post(handlers::cast_vote::<B>))
        .route("/api/cast-options", get(handlers::list_cast_options::<B>))
        .route("/api/event-config", get(handlers::get_event_config::<B>))
        // Operator API
        .route("/api/cue", put(operator::advance_cue::<B>))
        .route("/api/me/perms", get(operator::my_permissions::<B>))
        .route("/api/votes", get(operator::vote_status::<B>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
