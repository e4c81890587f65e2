// estimators.rs - running energy / magnetization estimators for one run

use crate::energy::magnetization;
use crate::state::Spin;

/// Running averages of `x, x^2, x^3, x^4`.
pub type Moments = [f64; 4];

#[inline]
fn push_moments(moments: &mut Moments, sample: f64, number_samples: usize) {
    let n = (number_samples + 1) as f64;
    let mut power = 1.0;
    for moment in moments.iter_mut() {
        power *= sample;
        *moment += (power - *moment) / n;
    }
}

/// Estimators owned by a simulation.
///
/// `energy` and `spin_vector` are updated incrementally on every accepted
/// flip; `magnetization` and the moment averages only at sampling events.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimators {
    pub energy: f64,
    pub spin_vector: Vec<Spin>,
    pub magnetization: f64,
    pub number_samples: usize,

    pub energy_moments: Moments,
    pub magnetization_moments: Moments,
    pub sublattice_magnetization_moments: Vec<Moments>,
}

impl Estimators {
    pub fn new(number_sublattices: usize) -> Self {
        Self {
            energy: 0.0,
            spin_vector: vec![Spin::zeros(); number_sublattices],
            magnetization: 0.0,
            number_samples: 0,
            energy_moments: [0.0; 4],
            magnetization_moments: [0.0; 4],
            sublattice_magnetization_moments: vec![[0.0; 4]; number_sublattices],
        }
    }

    /// O(1) bookkeeping for an accepted flip.
    #[inline(always)]
    pub fn apply_flip(&mut self, sublattice: usize, energy_difference: f64, spin_change: &Spin) {
        self.energy += energy_difference;
        self.spin_vector[sublattice] += spin_change;
    }

    /// Recompute the magnetization and fold the current values into the moments.
    pub fn record_sample(&mut self) {
        self.magnetization = magnetization(&self.spin_vector);

        let n = self.number_samples;
        push_moments(&mut self.energy_moments, self.energy, n);
        push_moments(&mut self.magnetization_moments, self.magnetization, n);
        for (moments, s) in self
            .sublattice_magnetization_moments
            .iter_mut()
            .zip(&self.spin_vector)
        {
            push_moments(moments, s.norm(), n);
        }
        self.number_samples += 1;
    }

    pub fn mean_energy(&self) -> f64 {
        self.energy_moments[0]
    }

    pub fn mean_magnetization(&self) -> f64 {
        self.magnetization_moments[0]
    }

    /// `(<E^2> - <E>^2) / (N T^2)`
    pub fn specific_heat(&self, temperature: f64, number_sites: usize) -> f64 {
        let [e1, e2, ..] = self.energy_moments;
        (e2 - e1 * e1) / (number_sites as f64 * temperature * temperature)
    }

    /// `(<M^2> - <M>^2) / (N T)`
    pub fn susceptibility(&self, temperature: f64, number_sites: usize) -> f64 {
        let [m1, m2, ..] = self.magnetization_moments;
        (m2 - m1 * m1) / (number_sites as f64 * temperature)
    }

    /// `1 - <M^4> / (3 <M^2>^2)`, 0 before any magnetized sample.
    pub fn binder_cumulant(&self) -> f64 {
        let [_, m2, _, m4] = self.magnetization_moments;
        if m2 > 0.0 {
            1.0 - m4 / (3.0 * m2 * m2)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moments_are_running_means_of_powers() {
        let mut est = Estimators::new(1);
        for (k, e) in [1.0, 2.0, 3.0].into_iter().enumerate() {
            est.energy = e;
            est.spin_vector[0] = Spin::new(0.0, 0.0, e);
            est.record_sample();
            assert_eq!(est.number_samples, k + 1);
        }
        assert!((est.mean_energy() - 2.0).abs() < 1e-12);
        assert!((est.energy_moments[1] - 14.0 / 3.0).abs() < 1e-12);
        assert!((est.energy_moments[3] - 98.0 / 3.0).abs() < 1e-12);
        assert_eq!(est.magnetization, 3.0);
        assert!((est.sublattice_magnetization_moments[0][0] - 2.0).abs() < 1e-12);
        assert!((est.specific_heat(1.0, 1) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn binder_of_constant_magnetization_is_two_thirds() {
        let mut est = Estimators::new(2);
        est.spin_vector = vec![Spin::x(), Spin::x()];
        for _ in 0..5 {
            est.record_sample();
        }
        assert!((est.binder_cumulant() - 2.0 / 3.0).abs() < 1e-12);
        assert!(est.susceptibility(1.0, 2).abs() < 1e-12);
    }

    #[test]
    fn apply_flip_is_incremental() {
        let mut est = Estimators::new(2);
        est.apply_flip(1, -0.5, &Spin::new(0.0, 1.0, 0.0));
        est.apply_flip(1, 0.25, &Spin::new(0.0, 1.0, 0.0));
        assert_eq!(est.energy, -0.25);
        assert_eq!(est.spin_vector[1], Spin::new(0.0, 2.0, 0.0));
        assert_eq!(est.spin_vector[0], Spin::zeros());
    }
}
