//! Vote ledger: one vote per identity, three distinct selections.
//!
//! The ledger validates a submission and hands a single row to the
//! backend. It never checks for an existing vote itself: the backend's
//! uniqueness constraint on the cast's identity is the only guard, so two
//! racing submissions cannot both succeed.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use marquee_types::{
    IdentityId, IdentityVoteStatus, NewCast, OptionId, SELECTIONS_PER_CAST, perms,
};

use crate::access::require_permission;
use crate::backend::{AccessToken, EventBackend, HumanVerifier, IdentityName};
use crate::error::CoreError;

/// How a submission names the voter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityRef {
    /// Direct identity id.
    Id(IdentityId),
    /// Exact name match.
    Name(IdentityName),
}

/// A vote as received from a client. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteSubmission {
    /// Who is voting.
    pub identity: Option<IdentityRef>,
    /// Proof-of-humanity token.
    pub proof_token: Option<String>,
    /// Option id to chosen flag.
    pub selection: Option<BTreeMap<OptionId, bool>>,
    /// Client address, recorded for abuse tracing only.
    pub client_ip: Option<String>,
}

/// Reduce a sparse selection map to exactly three chosen option ids.
///
/// The result is in ascending option-id order.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] unless exactly three options are chosen.
pub fn reduce_selection(
    selection: &BTreeMap<OptionId, bool>,
) -> Result<[OptionId; SELECTIONS_PER_CAST], CoreError> {
    let chosen: Vec<OptionId> = selection
        .iter()
        .filter(|(_, chosen)| **chosen)
        .map(|(id, _)| *id)
        .collect();

    <[OptionId; SELECTIONS_PER_CAST]>::try_from(chosen).map_err(|chosen| {
        tracing::debug!(chosen = chosen.len(), "selection rejected");
        CoreError::Validation(String::from("invalid selection"))
    })
}

/// Accepts vote submissions and records them through the backend.
pub struct VoteLedger<B> {
    backend: Arc<B>,
    require_open: bool,
}

impl<B: EventBackend> VoteLedger<B> {
    /// Create a ledger. With `require_open`, votes are only accepted while
    /// the event config has `voting_open` set.
    pub const fn new(backend: Arc<B>, require_open: bool) -> Self {
        Self {
            backend,
            require_open,
        }
    }

    /// Validate a submission and record the vote.
    ///
    /// Checks run in order and fail fast: required fields, proof of
    /// humanity, voting gate, selection shape, identity resolution.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Validation`] for missing fields, a selection that is
    ///   not exactly three options, or an unknown option id
    /// - [`CoreError::Verification`] if the proof token is rejected
    /// - [`CoreError::NotFound`] if voting is closed or the identity does
    ///   not resolve
    /// - [`CoreError::Conflict`] if the identity has already voted
    /// - [`CoreError::Backend`] on backend or verifier failure
    pub async fn cast_vote<V: HumanVerifier>(
        &self,
        verifier: &V,
        submission: VoteSubmission,
    ) -> Result<IdentityId, CoreError> {
        let VoteSubmission {
            identity,
            proof_token,
            selection,
            client_ip,
        } = submission;

        let (Some(identity), Some(proof_token), Some(selection)) = (
            identity.filter(is_complete),
            proof_token.filter(|token| !token.is_empty()),
            selection,
        ) else {
            return Err(CoreError::Validation(String::from(
                "missing required fields",
            )));
        };

        let verified = verifier
            .verify(&proof_token, client_ip.as_deref())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "proof-of-humanity verifier unavailable");
                CoreError::from(e)
            })?;
        if !verified {
            tracing::warn!("vote rejected: proof-of-humanity failed");
            return Err(CoreError::Verification);
        }

        if self.require_open {
            let config = self.backend.fetch_event_config().await?;
            if !config.is_some_and(|c| c.voting_open) {
                tracing::debug!("vote rejected: voting closed");
                return Err(CoreError::NotFound(String::from("voting is closed")));
            }
        }

        let selections = reduce_selection(&selection)?;

        let id = self
            .resolve(&identity)
            .await?
            .ok_or_else(|| CoreError::NotFound(String::from("identity not found")))?;

        let cast = NewCast {
            id,
            selections,
            extracted_ip: client_ip,
        };

        self.backend.insert_cast(&cast).await.map_err(|e| {
            let err = CoreError::from(e);
            if matches!(err, CoreError::Conflict(_)) {
                tracing::info!(identity = %id, "duplicate vote rejected");
            }
            err
        })?;

        tracing::info!(identity = %id, ?selections, "vote recorded");
        Ok(id)
    }

    /// Every real identity joined with its vote. Requires `votes`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Forbidden`] without the permission, or
    /// [`CoreError::Backend`] on backend failure.
    pub async fn vote_status(
        &self,
        caller: Option<&AccessToken>,
    ) -> Result<Vec<IdentityVoteStatus>, CoreError> {
        require_permission(self.backend.as_ref(), caller, perms::VOTES).await?;

        let (identities, casts) =
            tokio::try_join!(self.backend.fetch_identities(), self.backend.fetch_casts())?;

        let mut by_identity: HashMap<IdentityId, _> =
            casts.into_iter().map(|cast| (cast.id, cast)).collect();

        Ok(identities
            .into_iter()
            .map(|identity| {
                let vote = by_identity.remove(&identity.id);
                IdentityVoteStatus { identity, vote }
            })
            .collect())
    }

    async fn resolve(&self, identity: &IdentityRef) -> Result<Option<IdentityId>, CoreError> {
        let found = match identity {
            IdentityRef::Id(id) => self.backend.find_identity(*id).await?,
            IdentityRef::Name(name) => self.backend.lookup_identity_by_name(name).await?,
        };
        Ok(found.map(|identity| identity.id))
    }
}

fn is_complete(identity: &IdentityRef) -> bool {
    match identity {
        IdentityRef::Id(_) => true,
        IdentityRef::Name(name) => !name.first_name.is_empty() && !name.last_name.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::indexing_slicing)]

    use marquee_types::{EventConfig, Identity, IdentityId};

    use super::*;
    use crate::memory::{FixedVerifier, MemoryBackend};

    fn selection(pairs: &[(i64, bool)]) -> BTreeMap<OptionId, bool> {
        pairs.iter().map(|(id, on)| (OptionId(*id), *on)).collect()
    }

    fn identity(first: &str, last: &str, middle: Option<&str>) -> Identity {
        Identity {
            id: IdentityId::new(),
            first_name: first.to_owned(),
            last_name: last.to_owned(),
            middle_name: middle.map(ToOwned::to_owned),
            grade: Some(String::from("10B")),
            restricted: false,
        }
    }

    fn open_config(open: bool) -> EventConfig {
        EventConfig {
            event: String::from("spring-gala"),
            name: None,
            description: None,
            cover_url: None,
            logo_url: None,
            restricted: false,
            state: serde_json::Value::Null,
            stream_shown: false,
            twitch_stream_channel: None,
            voting_open: open,
        }
    }

    fn submission(identity: IdentityRef, picks: &[(i64, bool)]) -> VoteSubmission {
        VoteSubmission {
            identity: Some(identity),
            proof_token: Some(String::from("token")),
            selection: Some(selection(picks)),
            client_ip: Some(String::from("203.0.113.7")),
        }
    }

    fn backend_with(voter: &Identity) -> Arc<MemoryBackend> {
        Arc::new(
            MemoryBackend::new()
                .with_identities(vec![voter.clone()])
                .with_option_ids(1..=5)
                .with_event_config(open_config(true)),
        )
    }

    #[test]
    fn reduce_selection_keeps_only_chosen_ids() {
        let picked = reduce_selection(&selection(&[(1, true), (2, false), (3, true), (4, true)]));
        assert_eq!(picked, Ok([OptionId(1), OptionId(3), OptionId(4)]));
    }

    #[test]
    fn reduce_selection_requires_exactly_three() {
        let two = reduce_selection(&selection(&[(1, true), (2, true)]));
        assert_eq!(two, Err(CoreError::Validation(String::from("invalid selection"))));

        let four = reduce_selection(&selection(&[(1, true), (2, true), (3, true), (4, true)]));
        assert!(four.is_err());

        assert!(reduce_selection(&BTreeMap::new()).is_err());
    }

    #[tokio::test]
    async fn second_vote_for_same_identity_conflicts() {
        let voter = identity("Anna", "Ivanova", None);
        let backend = backend_with(&voter);
        let ledger = VoteLedger::new(Arc::clone(&backend), true);
        let verifier = FixedVerifier::passing();

        let id = ledger
            .cast_vote(
                &verifier,
                submission(IdentityRef::Id(voter.id), &[(1, true), (2, true), (3, true)]),
            )
            .await
            .unwrap();
        assert_eq!(id, voter.id);

        let err = ledger
            .cast_vote(
                &verifier,
                submission(IdentityRef::Id(voter.id), &[(3, true), (4, true), (5, true)]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));

        let casts = backend.casts().await;
        assert_eq!(casts.len(), 1);
        assert_eq!(casts[0].selection_1, Some(OptionId(1)));
        assert_eq!(casts[0].selection_3, Some(OptionId(3)));
        assert_eq!(casts[0].extracted_ip.as_deref(), Some("203.0.113.7"));
    }

    #[tokio::test]
    async fn missing_fields_are_rejected_before_verification() {
        let voter = identity("Anna", "Ivanova", None);
        let ledger = VoteLedger::new(backend_with(&voter), true);
        let verifier = FixedVerifier::failing();

        let mut no_token = submission(IdentityRef::Id(voter.id), &[(1, true)]);
        no_token.proof_token = None;
        let err = ledger.cast_vote(&verifier, no_token).await.unwrap_err();
        assert_eq!(
            err,
            CoreError::Validation(String::from("missing required fields"))
        );

        let mut empty_name = submission(
            IdentityRef::Name(IdentityName {
                first_name: String::new(),
                last_name: String::from("Ivanova"),
                middle_name: None,
            }),
            &[(1, true)],
        );
        empty_name.selection = Some(BTreeMap::new());
        let err = ledger.cast_vote(&verifier, empty_name).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(verifier.calls(), 0);
    }

    #[tokio::test]
    async fn failed_proof_is_a_verification_error() {
        let voter = identity("Anna", "Ivanova", None);
        let backend = backend_with(&voter);
        let ledger = VoteLedger::new(Arc::clone(&backend), true);

        let err = ledger
            .cast_vote(
                &FixedVerifier::failing(),
                submission(IdentityRef::Id(voter.id), &[(1, true), (2, true), (3, true)]),
            )
            .await
            .unwrap_err();
        assert_eq!(err, CoreError::Verification);
        assert!(backend.casts().await.is_empty());
    }

    #[tokio::test]
    async fn verifier_outage_is_a_backend_error() {
        let voter = identity("Anna", "Ivanova", None);
        let backend = backend_with(&voter);
        let ledger = VoteLedger::new(Arc::clone(&backend), true);
        let verifier = FixedVerifier::unavailable();

        let err = ledger
            .cast_vote(
                &verifier,
                submission(IdentityRef::Id(voter.id), &[(1, true), (2, true), (3, true)]),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::Backend(String::from("verification service unreachable"))
        );
        assert_eq!(verifier.calls(), 1);
        assert!(backend.casts().await.is_empty());
    }

    #[tokio::test]
    async fn closed_voting_is_not_found_and_checked_before_selection() {
        let voter = identity("Anna", "Ivanova", None);
        let backend = Arc::new(
            MemoryBackend::new()
                .with_identities(vec![voter.clone()])
                .with_option_ids(1..=3)
                .with_event_config(open_config(false)),
        );
        let ledger = VoteLedger::new(Arc::clone(&backend), true);

        let err = ledger
            .cast_vote(
                &FixedVerifier::passing(),
                submission(IdentityRef::Id(voter.id), &[(1, true)]),
            )
            .await
            .unwrap_err();
        assert_eq!(err, CoreError::NotFound(String::from("voting is closed")));
    }

    #[tokio::test]
    async fn missing_event_config_counts_as_closed_when_gated() {
        let voter = identity("Anna", "Ivanova", None);
        let backend = Arc::new(
            MemoryBackend::new()
                .with_identities(vec![voter.clone()])
                .with_option_ids(1..=3),
        );
        let picks = [(1, true), (2, true), (3, true)];

        let gated = VoteLedger::new(Arc::clone(&backend), true);
        let err = gated
            .cast_vote(
                &FixedVerifier::passing(),
                submission(IdentityRef::Id(voter.id), &picks),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));

        let ungated = VoteLedger::new(Arc::clone(&backend), false);
        ungated
            .cast_vote(
                &FixedVerifier::passing(),
                submission(IdentityRef::Id(voter.id), &picks),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn identity_resolves_by_exact_name() {
        let voter = identity("Ivan", "Petrov", Some("Sergeevich"));
        let backend = backend_with(&voter);
        let ledger = VoteLedger::new(Arc::clone(&backend), true);
        let picks = [(2, true), (4, true), (5, true)];

        let without_middle = IdentityRef::Name(IdentityName {
            first_name: String::from("Ivan"),
            last_name: String::from("Petrov"),
            middle_name: None,
        });
        let err = ledger
            .cast_vote(&FixedVerifier::passing(), submission(without_middle, &picks))
            .await
            .unwrap_err();
        assert_eq!(err, CoreError::NotFound(String::from("identity not found")));

        let exact = IdentityRef::Name(IdentityName {
            first_name: String::from("Ivan"),
            last_name: String::from("Petrov"),
            middle_name: Some(String::from("Sergeevich")),
        });
        let id = ledger
            .cast_vote(&FixedVerifier::passing(), submission(exact, &picks))
            .await
            .unwrap();
        assert_eq!(id, voter.id);
    }

    #[tokio::test]
    async fn unknown_option_is_a_validation_error() {
        let voter = identity("Anna", "Ivanova", None);
        let backend = backend_with(&voter);
        let ledger = VoteLedger::new(Arc::clone(&backend), true);

        let err = ledger
            .cast_vote(
                &FixedVerifier::passing(),
                submission(IdentityRef::Id(voter.id), &[(1, true), (2, true), (99, true)]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(backend.casts().await.is_empty());
    }

    #[tokio::test]
    async fn vote_status_joins_identities_with_votes() {
        let voted = identity("Anna", "Ivanova", None);
        let pending = identity("Boris", "Smirnov", None);
        let backend = Arc::new(
            MemoryBackend::new()
                .with_identities(vec![voted.clone(), pending.clone()])
                .with_option_ids(1..=3)
                .with_event_config(open_config(true))
                .with_session("staff", ["votes"]),
        );
        let ledger = VoteLedger::new(Arc::clone(&backend), true);
        ledger
            .cast_vote(
                &FixedVerifier::passing(),
                submission(IdentityRef::Id(voted.id), &[(1, true), (2, true), (3, true)]),
            )
            .await
            .unwrap();

        let err = ledger.vote_status(None).await.unwrap_err();
        assert_eq!(err, CoreError::Forbidden);

        let token = AccessToken::new("staff");
        let status = ledger.vote_status(Some(&token)).await.unwrap();
        assert_eq!(status.len(), 2);
        let anna = status.iter().find(|s| s.identity.id == voted.id).unwrap();
        assert!(anna.vote.is_some());
        let boris = status.iter().find(|s| s.identity.id == pending.id).unwrap();
        assert!(boris.vote.is_none());
    }
}
