//! Integration tests for the Marquee API endpoints.
//!
//! Most tests drive the Axum `Router` directly via `tower::ServiceExt`
//! against the in-process backend. The Turnstile and `WebSocket` tests bind
//! real listeners on ephemeral ports.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::post;
use axum::{Form, Json, Router};
use futures::StreamExt;
use marquee_core::memory::MemoryBackend;
use marquee_server::config::TurnstileConfig;
use marquee_server::turnstile::TurnstileVerifier;
use marquee_server::{AppState, Verifier, build_router};
use marquee_types::{Cue, EventConfig, Identity, IdentityId, StageDisplay, Timeline, TimelineId};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;
use tower::ServiceExt;

fn identity(first: &str, last: &str, restricted: bool) -> Identity {
    Identity {
        id: IdentityId::new(),
        first_name: first.to_owned(),
        last_name: last.to_owned(),
        middle_name: Some(String::from("Petrovna")),
        grade: Some(String::from("10A")),
        restricted,
    }
}

fn event_config(voting_open: bool) -> EventConfig {
    EventConfig {
        event: String::from("spring-gala"),
        name: Some(String::from("Spring Gala")),
        description: None,
        cover_url: None,
        logo_url: None,
        restricted: false,
        state: json!({}),
        stream_shown: false,
        twitch_stream_channel: None,
        voting_open,
    }
}

fn timeline() -> Timeline {
    Timeline {
        id: TimelineId(1),
        step: Some(2),
        cues: vec![
            Cue::at(3),
            Cue {
                stage_display: Some(StageDisplay::Color(String::from("#112233"))),
                ..Cue::at(2)
            },
            Cue::at(1),
        ],
    }
}

struct Fixture {
    backend: Arc<MemoryBackend>,
    state: Arc<AppState<MemoryBackend>>,
    voter: Identity,
}

impl Fixture {
    fn new(backend: MemoryBackend, voter: Identity, verifier: Verifier) -> Self {
        let backend = Arc::new(backend);
        let state = Arc::new(AppState::new(Arc::clone(&backend), verifier, true));
        Self {
            backend,
            state,
            voter,
        }
    }

    fn standard() -> Self {
        let voter = identity("Anna", "Ivanova", false);
        let backend = MemoryBackend::new()
            .with_timeline(timeline())
            .with_identities(vec![voter.clone(), identity("Secret", "Person", true)])
            .with_decoys(vec![identity("Decoy", "Name", false)])
            .with_option_ids(1..=4)
            .with_event_config(event_config(true))
            .with_session("operator", ["cues", "votes"])
            .with_session("viewer", Vec::<&str>::new());
        Self::new(backend, voter, Verifier::Fixed(true))
    }

    fn router(&self) -> Router {
        build_router(Arc::clone(&self.state))
    }
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(router: Router, path: &str) -> (StatusCode, Value) {
    let response = router
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn send_json(
    router: Router,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: &Value,
) -> axum::response::Response {
    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", "application/json");
    if let Some(token) = token {
        request = request.header("authorization", format!("Bearer {token}"));
    }
    router
        .oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

fn vote_body(voter: &Identity, picks: &[(i64, bool)]) -> Value {
    let selection: serde_json::Map<String, Value> = picks
        .iter()
        .map(|(id, on)| (id.to_string(), Value::Bool(*on)))
        .collect();
    json!({
        "id": voter.id,
        "turnstile": "token",
        "selection": selection,
    })
}

// =========================================================================
// Health and timeline
// =========================================================================

#[tokio::test]
async fn health_is_ok() {
    let fixture = Fixture::standard();
    let (status, json) = get(fixture.router(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn timeline_is_served_sorted() {
    let fixture = Fixture::standard();
    let (status, json) = get(fixture.router(), "/api/timeline").await;

    assert_eq!(status, StatusCode::OK);
    let indices: Vec<i64> = json["cues"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["index"].as_i64().unwrap())
        .collect();
    assert_eq!(indices, vec![1, 2, 3]);
    assert_eq!(json["cues"][1]["stageDisplay"]["type"], "color");
}

#[tokio::test]
async fn missing_timeline_is_null() {
    let fixture = Fixture::new(
        MemoryBackend::new(),
        identity("A", "B", false),
        Verifier::Fixed(true),
    );
    let (status, json) = get(fixture.router(), "/api/timeline").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.is_null());
}

#[tokio::test]
async fn cue_views_apply_criterion() {
    let fixture = Fixture::standard();

    let (status, json) = get(fixture.router(), "/api/timeline/cues?criterion=stageDisplay").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["index"], 2);

    let (_, latest) = get(fixture.router(), "/api/timeline/latest").await;
    assert_eq!(latest["index"], 2);

    let (_, none) = get(fixture.router(), "/api/timeline/latest?criterion=website").await;
    assert!(none.is_null());

    let (status, err) = get(fixture.router(), "/api/timeline/cues?criterion=bogus").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["status"], 422);
}

#[tokio::test]
async fn timeline_fetch_failure_is_500() {
    let fixture = Fixture::standard();
    fixture.backend.set_failing(true);

    let (status, json) = get(fixture.router(), "/api/timeline").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["status"], 500);
    assert!(json["error"].is_string());
}

// =========================================================================
// Operator
// =========================================================================

#[tokio::test]
async fn advance_cue_requires_cues_permission() {
    let fixture = Fixture::standard();
    let body = json!({ "timelineID": 1, "index": 3 });

    let response = send_json(fixture.router(), "PUT", "/api/cue", None, &body).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send_json(fixture.router(), "PUT", "/api/cue", Some("viewer"), &body).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    assert_eq!(fixture.backend.step_updates(), 0);
}

#[tokio::test]
async fn advance_cue_updates_step_and_refreshes() {
    let fixture = Fixture::standard();
    let (_, before) = get(fixture.router(), "/api/timeline/latest").await;
    assert_eq!(before["index"], 2);

    let body = json!({ "timelineID": 1, "index": 3 });
    let response = send_json(fixture.router(), "PUT", "/api/cue", Some("operator"), &body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let (_, after) = get(fixture.router(), "/api/timeline/latest").await;
    assert_eq!(after["index"], 3);
}

#[tokio::test]
async fn advance_cue_on_unknown_timeline_is_404() {
    let fixture = Fixture::standard();
    let body = json!({ "timelineID": 42, "index": 1 });
    let response = send_json(fixture.router(), "PUT", "/api/cue", Some("operator"), &body).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn my_permissions_reflect_the_token() {
    let fixture = Fixture::standard();

    let response = fixture
        .router()
        .oneshot(
            Request::get("/api/me/perms")
                .header("authorization", "Bearer operator")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json, json!(["cues", "votes"]));

    let (_, anonymous) = get(fixture.router(), "/api/me/perms").await;
    assert!(anonymous.is_null());
}

// =========================================================================
// Roster, options, config
// =========================================================================

#[tokio::test]
async fn identities_hide_restricted_rows_and_private_fields() {
    let fixture = Fixture::standard();
    let (status, json) = get(fixture.router(), "/api/identities").await;

    assert_eq!(status, StatusCode::OK);
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    for row in rows {
        assert_ne!(row["first_name"], "Secret");
        let mut keys: Vec<&str> = row.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["first_name", "grade", "last_name"]);
    }
}

#[tokio::test]
async fn cast_options_and_event_config_are_served() {
    let fixture = Fixture::standard();

    let (status, options) = get(fixture.router(), "/api/cast-options").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(options.as_array().unwrap().len(), 4);

    let (status, config) = get(fixture.router(), "/api/event-config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(config["voting_open"], true);

    fixture.backend.set_event_config(Some(event_config(false))).await;
    let (_, cached) = get(fixture.router(), "/api/event-config").await;
    assert_eq!(cached["voting_open"], true);
    let (_, fresh) = get(fixture.router(), "/api/event-config?refetch=true").await;
    assert_eq!(fresh["voting_open"], false);
}

// =========================================================================
// Voting
// =========================================================================

#[tokio::test]
async fn first_vote_succeeds_second_conflicts() {
    let fixture = Fixture::standard();
    let body = vote_body(&fixture.voter, &[(1, true), (2, false), (3, true), (4, true)]);

    let response = send_json(fixture.router(), "POST", "/api/vote", None, &body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send_json(fixture.router(), "POST", "/api/vote", None, &body).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 409);

    assert_eq!(fixture.backend.casts().await.len(), 1);
}

#[tokio::test]
async fn vote_by_name_is_accepted() {
    let fixture = Fixture::standard();
    let body = json!({
        "first_name": "Anna",
        "last_name": "Ivanova",
        "middle_name": "Petrovna",
        "turnstile": "token",
        "selection": { "1": true, "2": true, "3": true },
    });

    let response = send_json(fixture.router(), "POST", "/api/vote", None, &body).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(fixture.backend.casts().await[0].id, fixture.voter.id);
}

#[tokio::test]
async fn vote_validation_statuses() {
    let fixture = Fixture::standard();

    let missing = json!({ "id": fixture.voter.id, "selection": { "1": true } });
    let response = send_json(fixture.router(), "POST", "/api/vote", None, &missing).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let two = vote_body(&fixture.voter, &[(1, true), (2, true)]);
    let response = send_json(fixture.router(), "POST", "/api/vote", None, &two).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["error"], "invalid selection");

    let stranger = identity("Nobody", "Known", false);
    let unknown = vote_body(&stranger, &[(1, true), (2, true), (3, true)]);
    let response = send_json(fixture.router(), "POST", "/api/vote", None, &unknown).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = fixture
        .router()
        .oneshot(
            Request::post("/api/vote")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn failed_proof_is_403() {
    let voter = identity("Anna", "Ivanova", false);
    let backend = MemoryBackend::new()
        .with_identities(vec![voter.clone()])
        .with_option_ids(1..=3)
        .with_event_config(event_config(true));
    let fixture = Fixture::new(backend, voter, Verifier::Fixed(false));

    let body = vote_body(&fixture.voter, &[(1, true), (2, true), (3, true)]);
    let response = send_json(fixture.router(), "POST", "/api/vote", None, &body).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn closed_voting_is_404_before_selection_checks() {
    let voter = identity("Anna", "Ivanova", false);
    let backend = MemoryBackend::new()
        .with_identities(vec![voter.clone()])
        .with_option_ids(1..=3)
        .with_event_config(event_config(false));
    let fixture = Fixture::new(backend, voter, Verifier::Fixed(true));

    let body = vote_body(&fixture.voter, &[(1, true)]);
    let response = send_json(fixture.router(), "POST", "/api/vote", None, &body).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["error"], "voting is closed");
}

#[tokio::test]
async fn vote_status_requires_votes_permission() {
    let fixture = Fixture::standard();
    let body = vote_body(&fixture.voter, &[(1, true), (2, true), (3, true)]);
    send_json(fixture.router(), "POST", "/api/vote", None, &body).await;

    let (status, _) = get(fixture.router(), "/api/votes").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let response = fixture
        .router()
        .oneshot(
            Request::get("/api/votes")
                .header("authorization", "Bearer operator")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    let anna = rows
        .iter()
        .find(|r| r["first_name"] == "Anna")
        .unwrap();
    assert_eq!(anna["vote"]["selection_1"], 1);
    let secret = rows
        .iter()
        .find(|r| r["first_name"] == "Secret")
        .unwrap();
    assert!(secret["vote"].is_null());
}

// ---------------------------------------------------------------------------
// Turnstile
// ---------------------------------------------------------------------------

/// Serve `router` on an ephemeral local port.
async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

fn turnstile_at(addr: SocketAddr) -> Verifier {
    Verifier::Turnstile(TurnstileVerifier::new(&TurnstileConfig {
        enabled: true,
        secret_key: String::from("site-secret"),
        verify_url: format!("http://{addr}/siteverify"),
    }))
}

fn voting_backend(voter: &Identity) -> MemoryBackend {
    MemoryBackend::new()
        .with_identities(vec![voter.clone()])
        .with_option_ids(1..=3)
        .with_event_config(event_config(true))
}

#[tokio::test]
async fn turnstile_outage_is_500_and_records_nothing() {
    let siteverify = Router::new().route(
        "/siteverify",
        post(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    );
    let addr = serve(siteverify).await;

    let voter = identity("Anna", "Ivanova", false);
    let fixture = Fixture::new(voting_backend(&voter), voter, turnstile_at(addr));

    let body = vote_body(&fixture.voter, &[(1, true), (2, true), (3, true)]);
    let response = send_json(fixture.router(), "POST", "/api/vote", None, &body).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 500);
    assert!(json["error"].as_str().unwrap().contains("503"));
    assert!(fixture.backend.casts().await.is_empty());
}

#[tokio::test]
async fn turnstile_receives_secret_and_token() {
    let siteverify = Router::new().route(
        "/siteverify",
        post(|Form(form): Form<HashMap<String, String>>| async move {
            let ok = form.get("secret").map(String::as_str) == Some("site-secret")
                && form.get("response").map(String::as_str) == Some("token");
            Json(json!({ "success": ok, "error-codes": [] }))
        }),
    );
    let addr = serve(siteverify).await;

    let voter = identity("Anna", "Ivanova", false);
    let fixture = Fixture::new(voting_backend(&voter), voter, turnstile_at(addr));

    let body = vote_body(&fixture.voter, &[(1, true), (2, true), (3, true)]);
    let response = send_json(fixture.router(), "POST", "/api/vote", None, &body).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(fixture.backend.casts().await.len(), 1);
}

// ---------------------------------------------------------------------------
// Timeline WebSocket
// ---------------------------------------------------------------------------

type Socket =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn next_json(socket: &mut Socket) -> Value {
    let message = tokio::time::timeout(Duration::from_secs(5), socket.next())
        .await
        .expect("timed out waiting for a timeline message")
        .unwrap()
        .unwrap();
    match message {
        Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("unexpected message: {other:?}"),
    }
}

#[tokio::test]
async fn timeline_socket_sends_snapshot_then_each_change_once() {
    let fixture = Fixture::standard();
    let addr = serve(fixture.router()).await;

    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws/timeline"))
        .await
        .unwrap();

    let initial = next_json(&mut socket).await;
    assert_eq!(initial["step"], 2);
    assert_eq!(initial["cues"][0]["index"], 1);

    let body = json!({ "timelineID": 1, "index": 3 });
    let response = send_json(fixture.router(), "PUT", "/api/cue", Some("operator"), &body).await;
    assert_eq!(response.status(), StatusCode::OK);

    // The cold-start fetch is not echoed, so the next frame is the change.
    let advanced = next_json(&mut socket).await;
    assert_eq!(advanced["step"], 3);

    fixture.state.timeline.apply_update(None).await;
    assert!(next_json(&mut socket).await.is_null());
}

#[tokio::test]
async fn timeline_socket_sends_null_without_a_timeline() {
    let fixture = Fixture::new(
        MemoryBackend::new(),
        identity("Anna", "Ivanova", false),
        Verifier::Fixed(true),
    );
    let addr = serve(fixture.router()).await;

    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws/timeline"))
        .await
        .unwrap();
    assert!(next_json(&mut socket).await.is_null());
}
