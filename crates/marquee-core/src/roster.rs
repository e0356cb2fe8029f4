//! Public roster: real and decoy identities, shuffled and privacy-filtered.

use marquee_types::{Identity, PublicIdentity};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::backend::EventBackend;
use crate::error::CoreError;

/// Mix decoys into the real identities, shuffle, and project.
///
/// Restricted rows are dropped after the shuffle and never leave this
/// function in any form.
pub fn build_roster<R: Rng + ?Sized>(
    real: Vec<Identity>,
    decoys: Vec<Identity>,
    rng: &mut R,
) -> Vec<PublicIdentity> {
    let mut all = real;
    all.extend(decoys);
    all.shuffle(rng);

    all.iter()
        .filter(|identity| !identity.restricted)
        .map(Identity::to_public)
        .collect()
}

/// Fetch both identity lists and build a freshly shuffled roster.
///
/// # Errors
///
/// Returns [`CoreError::Backend`] if either fetch fails.
pub async fn public_roster<B: EventBackend>(backend: &B) -> Result<Vec<PublicIdentity>, CoreError> {
    let (real, decoys) =
        tokio::try_join!(backend.fetch_identities(), backend.fetch_decoy_identities())?;

    tracing::debug!(real = real.len(), decoys = decoys.len(), "building public roster");
    Ok(build_roster(real, decoys, &mut rand::rng()))
}
