//! Timeline store, vote ledger, and backend seams for the Marquee service.
//!
//! Nothing in this crate knows about HTTP or SQL. Operations are written
//! against the [`EventBackend`] and [`HumanVerifier`] traits; the data
//! layer and the server plug real implementations in.
//!
//! # Modules
//!
//! - [`access`] -- Permission checks for privileged operations
//! - [`backend`] -- Backend and verifier seams, [`BackendError`]
//! - [`cache`] -- [`CachedResource`], a single-flight cached value
//! - [`catalog`] -- Cached cast options and event configuration
//! - [`error`] -- [`CoreError`], the client-visible error taxonomy
//! - [`ledger`] -- [`VoteLedger`]: vote validation and recording
//! - [`memory`] -- In-process backend and fixed verifier
//! - [`roster`] -- Shuffled, privacy-filtered public identity listing
//! - [`timeline`] -- [`TimelineStore`] and derived cue views
//!
//! [`EventBackend`]: backend::EventBackend
//! [`HumanVerifier`]: backend::HumanVerifier
//! [`BackendError`]: backend::BackendError
//! [`CachedResource`]: cache::CachedResource
//! [`CoreError`]: error::CoreError
//! [`VoteLedger`]: ledger::VoteLedger
//! [`TimelineStore`]: timeline::TimelineStore

pub mod access;
pub mod backend;
pub mod cache;
pub mod catalog;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod roster;
pub mod timeline;
