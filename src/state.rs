use crate::error::ConfigError;
use crate::trial::sample_unit_vector;
use crate::utils::rng::RandomStream;
use nalgebra::Vector3;
use rand::RngCore;

/// A classical Heisenberg spin.
pub type Spin = Vector3<f64>;

/// Tolerance used when accepting externally supplied spins as unit vectors.
pub const UNIT_NORM_TOLERANCE: f64 = 1e-9;

/// Per-site unit spin vectors, stored as three parallel component arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinState {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl SpinState {
    /// Independent uniformly distributed spins on every site.
    pub fn random<R: RngCore>(number_sites: usize, rng: &mut RandomStream<R>) -> Self {
        let mut state = Self {
            x: vec![0.0; number_sites],
            y: vec![0.0; number_sites],
            z: vec![0.0; number_sites],
        };
        for site in 0..number_sites {
            state.set(site, sample_unit_vector(rng));
        }
        state
    }

    /// Every site pointing along `direction` (normalised here).
    pub fn aligned(number_sites: usize, direction: Spin) -> Result<Self, ConfigError> {
        let degenerate = || ConfigError::DegenerateDirection([direction.x, direction.y, direction.z]);
        if !direction.iter().all(|c| c.is_finite()) {
            return Err(degenerate());
        }
        let d = direction.try_normalize(f64::MIN_POSITIVE).ok_or_else(degenerate)?;
        Ok(Self {
            x: vec![d.x; number_sites],
            y: vec![d.y; number_sites],
            z: vec![d.z; number_sites],
        })
    }

    /// Take externally supplied components, checking lengths and unit norm.
    pub fn from_components(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> Result<Self, ConfigError> {
        if y.len() != x.len() {
            return Err(ConfigError::TableLengthMismatch { table: "y", expected: x.len(), actual: y.len() });
        }
        if z.len() != x.len() {
            return Err(ConfigError::TableLengthMismatch { table: "z", expected: x.len(), actual: z.len() });
        }
        let state = Self { x, y, z };
        state.check_unit_norms()?;
        Ok(state)
    }

    /// First site whose spin is not a finite unit vector, as an error.
    pub fn check_unit_norms(&self) -> Result<(), ConfigError> {
        for site in 0..self.len() {
            let norm = self.get(site).norm();
            // NaN fails the comparison too
            if !((norm - 1.0).abs() <= UNIT_NORM_TOLERANCE) {
                return Err(ConfigError::NonUnitSpin { site, norm });
            }
        }
        Ok(())
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    #[inline(always)]
    pub fn get(&self, site: usize) -> Spin {
        Spin::new(self.x[site], self.y[site], self.z[site])
    }

    /// Replace (never perturb) the spin at `site`.
    #[inline(always)]
    pub fn set(&mut self, site: usize, spin: Spin) {
        self.x[site] = spin.x;
        self.y[site] = spin.y;
        self.z[site] = spin.z;
    }

    /// Largest deviation of any spin norm from 1.
    pub fn max_norm_error(&self) -> f64 {
        (0..self.len())
            .map(|site| (self.get(site).norm() - 1.0).abs())
            .fold(0.0, f64::max)
    }
}
