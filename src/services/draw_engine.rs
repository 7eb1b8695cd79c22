//! Constrained random draw over the fixed outcome set.
//!
//! Every call pulls fresh entropy from the operating system; no generator state is kept
//! between draws.

use rand::{Rng, TryRngCore, rngs::OsRng, seq::IndexedRandom};
use thiserror::Error;

use crate::state::outcome::Outcome;

/// Failures of the draw engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DrawError {
    /// The exclusion removed every candidate. Indicates a broken outcome set.
    #[error("no eligible outcome left to draw from")]
    EmptyEligibleSet,
}

/// Outcomes still eligible once `excluded` is removed.
pub fn eligible_outcomes(excluded: Option<Outcome>) -> Vec<Outcome> {
    Outcome::ALL
        .into_iter()
        .filter(|outcome| Some(*outcome) != excluded)
        .collect()
}

/// Pick one outcome uniformly among those not `excluded`.
pub fn draw(excluded: Option<Outcome>) -> Result<Outcome, DrawError> {
    let mut rng = OsRng.unwrap_err();
    draw_from(&eligible_outcomes(excluded), &mut rng)
}

/// Pick one outcome uniformly from `eligible` using `rng`.
pub(crate) fn draw_from<R>(eligible: &[Outcome], rng: &mut R) -> Result<Outcome, DrawError>
where
    R: Rng + ?Sized,
{
    eligible
        .choose(rng)
        .copied()
        .ok_or(DrawError::EmptyEligibleSet)
}
