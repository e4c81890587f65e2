//! Single-site Metropolis update.
//!
//! One step picks a site, proposes a trial flip, and either commits it
//! (state + estimators, O(1)) or discards it without touching anything.

use crate::estimators::Estimators;
use crate::state::SpinState;
use crate::topology::LatticeTopology;
use crate::trial::{propose, TrialFlip};
use crate::utils::rng::RandomStream;
use rand::RngCore;

/// Where a step ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Accepted,
    Rejected,
}

/// Returned by [`step`], lets the driver keep acceptance statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepInfo {
    pub site: usize,
    pub outcome: StepOutcome,
    pub energy_difference: f64,
}

impl StepInfo {
    #[inline(always)]
    pub fn accepted(&self) -> bool {
        self.outcome == StepOutcome::Accepted
    }
}

/// Boltzmann weight `exp(-ΔE / T)` of an uphill move.
#[inline(always)]
pub fn proposal_distribution(energy_difference: f64, temperature: f64) -> f64 {
    (-energy_difference / temperature).exp()
}

/// Metropolis rule. Downhill moves are taken without a draw; otherwise one
/// uniform `r` is drawn and the move is kept iff `r <= exp(-ΔE / T)`, so a
/// zero energy difference is always accepted.
#[inline(always)]
pub fn accept_or_reject<R: RngCore>(
    energy_difference: f64,
    temperature: f64,
    rng: &mut RandomStream<R>,
) -> bool {
    if energy_difference < 0.0 {
        return true;
    }
    let probability = proposal_distribution(energy_difference, temperature);
    rng.uniform() <= probability
}

/// Commit an accepted trial flip.
#[inline(always)]
pub fn keep_flip(
    topology: &LatticeTopology,
    state: &mut SpinState,
    estimators: &mut Estimators,
    flip: &TrialFlip,
) {
    let change = flip.trial_spin - flip.current_spin;
    state.set(flip.site, flip.trial_spin);
    estimators.apply_flip(topology.sublattice_of(flip.site), flip.energy_difference, &change);
}

/// One Metropolis step on a randomly chosen site.
///
/// `temperature` must be strictly positive; that is checked once when the
/// run is configured, not here.
#[inline]
pub fn step<R: RngCore>(
    topology: &LatticeTopology,
    state: &mut SpinState,
    estimators: &mut Estimators,
    temperature: f64,
    rng: &mut RandomStream<R>,
) -> StepInfo {
    let site = rng.random_site_index();
    let flip = propose(topology, state, site, rng);

    let outcome = if accept_or_reject(flip.energy_difference, temperature, rng) {
        keep_flip(topology, state, estimators, &flip);
        StepOutcome::Accepted
    } else {
        StepOutcome::Rejected
    };

    StepInfo {
        site,
        outcome,
        energy_difference: flip.energy_difference,
    }
}
