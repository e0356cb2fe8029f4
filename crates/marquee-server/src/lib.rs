//! HTTP + `WebSocket` API server for the Marquee service.
//!
//! This crate provides an Axum server that exposes:
//!
//! - **Public REST endpoints** for the timeline, derived cue views, the
//!   public roster, cast options, event config, and vote submission
//! - **Operator REST endpoints** for advancing the timeline and reading
//!   vote status, authorized by bearer token
//! - **`WebSocket` endpoint** (`/ws/timeline`) pushing every timeline
//!   update from the store's broadcast channel
//!
//! # Architecture
//!
//! Handlers are generic over the core's
//! [`EventBackend`](marquee_core::backend::EventBackend). The binary wires
//! in the `PostgreSQL` backend; tests use the in-process one.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod operator;
pub mod router;
pub mod server;
pub mod state;
pub mod turnstile;
pub mod ws;

// Re-export primary types for convenience.
pub use config::{ConfigError, MarqueeConfig};
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
pub use turnstile::Verifier;
