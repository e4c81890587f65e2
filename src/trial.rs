// Trial flip proposals: a fresh spin drawn uniformly on the unit sphere.

use crate::energy::site_energy;
use crate::state::{Spin, SpinState};
use crate::topology::LatticeTopology;
use crate::utils::rng::RandomStream;
use rand::RngCore;
use std::f64::consts::TAU;

/// Candidate replacement for the spin at `site`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialFlip {
    pub site: usize,
    pub energy_difference: f64,
    pub current_spin: Spin,
    pub trial_spin: Spin,
}

/// Uniform point on the unit sphere.
///
/// Draws the azimuth first, then `phi = acos(2u - 1)`, which gives uniform
/// measure on the sphere rather than uniform angles.
#[inline(always)]
pub fn sample_unit_vector<R: RngCore>(rng: &mut RandomStream<R>) -> Spin {
    let theta = TAU * rng.uniform();
    let phi = (2.0 * rng.uniform() - 1.0).acos();
    let (sin_phi, cos_phi) = phi.sin_cos();
    let (sin_theta, cos_theta) = theta.sin_cos();
    Spin::new(sin_phi * cos_theta, sin_phi * sin_theta, cos_phi)
}

/// Propose a new spin for `site` and score it against the current one.
///
/// Both site energies are evaluated in full; no incremental shortcut.
pub fn propose<R: RngCore>(
    topology: &LatticeTopology,
    state: &SpinState,
    site: usize,
    rng: &mut RandomStream<R>,
) -> TrialFlip {
    let trial_spin = sample_unit_vector(rng);
    let current_spin = state.get(site);

    let energy_before = site_energy(topology, state, site, &current_spin);
    let energy_after = site_energy(topology, state, site, &trial_spin);

    TrialFlip {
        site,
        energy_difference: energy_after - energy_before,
        current_spin,
        trial_spin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::Bond;

    #[test]
    fn samples_are_unit_vectors() {
        let mut rng = RandomStream::new(2024, 1);
        for _ in 0..50_000 {
            let s = sample_unit_vector(&mut rng);
            assert!((s.norm() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn samples_cover_sphere_evenly() {
        // For uniform measure <z> = 0 and <z^2> = 1/3.
        let mut rng = RandomStream::new(11, 1);
        let n = 200_000;
        let (mut mz, mut mz2) = (0.0, 0.0);
        for _ in 0..n {
            let s = sample_unit_vector(&mut rng);
            mz += s.z;
            mz2 += s.z * s.z;
        }
        mz /= n as f64;
        mz2 /= n as f64;
        assert!(mz.abs() < 0.01, "<z> = {mz}");
        assert!((mz2 - 1.0 / 3.0).abs() < 0.01, "<z^2> = {mz2}");
    }

    #[test]
    fn energy_difference_matches_site_energies() {
        let bonds = [
            Bond { site: 0, neighbor: 1, interaction: 0.7 },
            Bond { site: 0, neighbor: 2, interaction: -1.3 },
            Bond { site: 1, neighbor: 0, interaction: 0.7 },
            Bond { site: 2, neighbor: 0, interaction: -1.3 },
        ];
        let t = LatticeTopology::from_bonds(1, vec![0, 0, 0], &bonds).unwrap();
        let mut rng = RandomStream::new(3, 3);
        let s = SpinState::random(3, &mut rng);

        let flip = propose(&t, &s, 0, &mut rng);
        let expected = site_energy(&t, &s, 0, &flip.trial_spin) - site_energy(&t, &s, 0, &s.get(0));
        assert_eq!(flip.energy_difference, expected);
        assert_eq!(flip.current_spin, s.get(0));
        assert_eq!(flip.site, 0);
    }
}
