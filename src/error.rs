//! Error types for the Heisenberg Monte Carlo engine.
//!
//! ```text
//! ConfigError       (fatal, raised before any sweep runs)
//! NumericDegeneracy (soft, only from the verification path)
//! DataError         (CSV / file I/O around the engine)
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Invalid topology, state or run parameters.
///
/// Every variant names the invariant that failed so the input can be fixed
/// without a debugger. These are only produced at construction time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("temperature must be a finite value > 0, got {0}")]
    NonPositiveTemperature(f64),

    #[error("sample_interval must be >= 1")]
    ZeroSampleInterval,

    #[error("resync_interval must be >= 1 when set")]
    ZeroResyncInterval,

    #[error("lattice has no sites")]
    EmptyLattice,

    #[error("number_sublattices must be >= 1")]
    NoSublattices,

    #[error("table `{table}` has length {actual}, expected {expected}")]
    TableLengthMismatch {
        table: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("site {site} is assigned to sublattice {sublattice}, but only {number_sublattices} exist")]
    SublatticeOutOfRange {
        site: usize,
        sublattice: usize,
        number_sublattices: usize,
    },

    #[error("bond refers to site {site}, but the lattice has {number_sites} sites")]
    SiteOutOfRange { site: usize, number_sites: usize },

    #[error("site {site} lists neighbor {neighbor}, but the lattice has {number_sites} sites")]
    NeighborOutOfRange {
        site: usize,
        neighbor: usize,
        number_sites: usize,
    },

    #[error("neighbor run of site {site} ([{start}, {start}+{count})) exceeds table length {len}")]
    NeighborRunOutOfBounds {
        site: usize,
        start: usize,
        count: usize,
        len: usize,
    },

    #[error("interaction parameter at table position {position} is not finite ({value})")]
    NonFiniteInteraction { position: usize, value: f64 },

    #[error("spin state has {actual} sites, lattice has {expected}")]
    StateSizeMismatch { expected: usize, actual: usize },

    #[error("spin at site {site} has norm {norm}, expected 1")]
    NonUnitSpin { site: usize, norm: f64 },

    #[error("cannot align spins along a zero or non-finite direction {0:?}")]
    DegenerateDirection([f64; 3]),
}

/// Incremental estimators drifted away from a full recomputation.
///
/// Reported by [`crate::simulation::Simulation::verify_estimators`]; never
/// raised while stepping.
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "estimator drift above tolerance {tolerance:e}: energy drift {energy_drift:e}, spin vector drift {spin_vector_drift:e}"
)]
pub struct NumericDegeneracy {
    pub energy_drift: f64,
    pub spin_vector_drift: f64,
    pub tolerance: f64,
}

/// Errors from reading topologies or writing traces and snapshots.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{path:?}, record {record}: {message}")]
    Parse {
        path: PathBuf,
        record: usize,
        message: String,
    },

    #[error("snapshot writer failed: {0}")]
    Snapshot(String),
}
