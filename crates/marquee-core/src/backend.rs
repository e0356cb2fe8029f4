//! Seams to the external collaborators: the data backend and the
//! proof-of-humanity verifier.
//!
//! Both traits return `Send` futures so handlers built on them can run on
//! a multi-threaded runtime. They are used as generic parameters rather
//! than trait objects because async methods are not dyn-compatible.

use std::future::Future;

use marquee_types::{
    CastOption, CastRow, EventConfig, Identity, IdentityId, NewCast, PermissionSet, Timeline,
    TimelineId,
};

/// Errors reported by a backend implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Transport or query failure.
    #[error("{0}")]
    Query(String),

    /// A uniqueness constraint rejected the write.
    #[error("{0}")]
    ConstraintViolation(String),

    /// A foreign key did not match any row.
    #[error("{0}")]
    InvalidReference(String),

    /// The targeted row does not exist.
    #[error("{0}")]
    NotFound(String),
}

/// An opaque bearer token issued by the auth service.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

/// A name tuple used to look up an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityName {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Middle name; `None` only matches identities without one.
    pub middle_name: Option<String>,
}

/// Operations the core consumes from the data backend.
pub trait EventBackend: Send + Sync + 'static {
    /// Fetch the event's timeline row, if one exists.
    fn fetch_timeline(&self)
    -> impl Future<Output = Result<Option<Timeline>, BackendError>> + Send;

    /// Persist a new step for the given timeline.
    ///
    /// Returns [`BackendError::NotFound`] if no timeline has that id.
    fn update_timeline_step(
        &self,
        timeline: TimelineId,
        step: i64,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Fetch every real identity.
    fn fetch_identities(&self) -> impl Future<Output = Result<Vec<Identity>, BackendError>> + Send;

    /// Fetch every decoy identity.
    fn fetch_decoy_identities(
        &self,
    ) -> impl Future<Output = Result<Vec<Identity>, BackendError>> + Send;

    /// Look up a real identity by id.
    fn find_identity(
        &self,
        id: IdentityId,
    ) -> impl Future<Output = Result<Option<Identity>, BackendError>> + Send;

    /// Look up a real identity by exact name match.
    fn lookup_identity_by_name(
        &self,
        name: &IdentityName,
    ) -> impl Future<Output = Result<Option<Identity>, BackendError>> + Send;

    /// Insert a vote as a single atomic row write.
    ///
    /// A second vote for the same identity must fail with
    /// [`BackendError::ConstraintViolation`].
    fn insert_cast(&self, cast: &NewCast) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Fetch every recorded vote.
    fn fetch_casts(&self) -> impl Future<Output = Result<Vec<CastRow>, BackendError>> + Send;

    /// Fetch every cast option.
    fn fetch_cast_options(
        &self,
    ) -> impl Future<Output = Result<Vec<CastOption>, BackendError>> + Send;

    /// Fetch the event configuration row, if one exists.
    fn fetch_event_config(
        &self,
    ) -> impl Future<Output = Result<Option<EventConfig>, BackendError>> + Send;

    /// Resolve a bearer token to its profile's permission set.
    ///
    /// Unknown or expired tokens yield `None`.
    fn caller_permissions(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<Option<PermissionSet>, BackendError>> + Send;
}

/// External proof-of-humanity check.
pub trait HumanVerifier: Send + Sync {
    /// Verify a client-supplied token. `Ok(false)` means the proof failed.
    fn verify(
        &self,
        token: &str,
        remote_ip: Option<&str>,
    ) -> impl Future<Output = Result<bool, BackendError>> + Send;
}
