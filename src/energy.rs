//! Bilinear Heisenberg energy: per-site contributions, total energy and
//! sublattice spin sums.
//!
//! All functions read the neighbor run of a site straight out of the
//! flattened topology tables; nothing is gathered into a temporary container.

use crate::state::{Spin, SpinState};
use crate::topology::LatticeTopology;

/// Energy of `spin` placed at `site`, interacting with the current spins of
/// the site's neighbors: `Σ_k J_k (spin · s_{n_k})`.
///
/// This is one endpoint's view of each bond, so summing it over all sites
/// counts every bond twice. A site without neighbors always scores 0.
#[inline(always)]
pub fn site_energy(topology: &LatticeTopology, state: &SpinState, site: usize, spin: &Spin) -> f64 {
    let (neighbors, couplings) = topology.neighbors(site);
    let (sx, sy, sz) = (spin.x, spin.y, spin.z);
    let (x, y, z) = (&state.x[..], &state.y[..], &state.z[..]);

    let mut energy = 0.0;
    for (&n, &j) in neighbors.iter().zip(couplings) {
        energy += j * (sx * x[n] + sy * y[n] + sz * z[n]);
    }
    energy
}

/// Energy of the spin currently sitting at `site`.
#[inline(always)]
pub fn current_site_energy(topology: &LatticeTopology, state: &SpinState, site: usize) -> f64 {
    site_energy(topology, state, site, &state.get(site))
}

/// Total lattice energy, each bond counted once.
pub fn total_energy(topology: &LatticeTopology, state: &SpinState) -> f64 {
    let raw: f64 = (0..topology.number_sites())
        .map(|site| current_site_energy(topology, state, site))
        .sum();
    raw / 2.0
}

/// Sum of spin vectors grouped by sublattice.
pub fn sublattice_spin_sums(topology: &LatticeTopology, state: &SpinState) -> Vec<Spin> {
    let mut sums = vec![Spin::zeros(); topology.number_sublattices()];
    for (site, &sublattice) in topology.sublattice_table().iter().enumerate() {
        sums[sublattice] += state.get(site);
    }
    sums
}

/// Norm of the total spin vector summed over all sublattices.
pub fn magnetization(spin_vector: &[Spin]) -> f64 {
    spin_vector.iter().fold(Spin::zeros(), |acc, s| acc + s).norm()
}
