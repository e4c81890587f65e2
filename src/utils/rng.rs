use rand::distributions::{Distribution, Uniform};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_pcg::Pcg64;

/// Single owned random source for one simulation run.
///
/// Site-index draws and acceptance draws come out of the same engine, so the
/// full trajectory is a pure function of the seed. The integer range can be
/// reconfigured without touching the engine state.
#[derive(Debug, Clone)]
pub struct RandomStream<R = Pcg64> {
    engine: R,
    unit: Uniform<f64>,
    sites: Uniform<usize>,
    number_sites: usize,
}

impl RandomStream<Pcg64> {
    /// Seed a Pcg64 engine and set the site range to `[0, number_sites)`.
    pub fn new(seed: u64, number_sites: usize) -> Self {
        Self::from_engine(Pcg64::seed_from_u64(seed), number_sites)
    }
}

impl<R: RngCore> RandomStream<R> {
    /// Wrap an existing engine (any `RngCore`, e.g. `ChaCha20Rng` in tests).
    pub fn from_engine(engine: R, number_sites: usize) -> Self {
        Self {
            engine,
            unit: Uniform::new(0.0, 1.0),
            sites: site_distribution(number_sites),
            number_sites,
        }
    }

    /// Uniform real in `[0, 1)`.
    #[inline(always)]
    pub fn uniform(&mut self) -> f64 {
        self.unit.sample(&mut self.engine)
    }

    /// Uniform site index in `[0, number_sites)`.
    #[inline(always)]
    pub fn random_site_index(&mut self) -> usize {
        self.sites.sample(&mut self.engine)
    }

    /// Change the integer range; the engine keeps its position in the stream.
    pub fn set_site_range(&mut self, number_sites: usize) {
        self.sites = site_distribution(number_sites);
        self.number_sites = number_sites;
    }

    pub fn number_sites(&self) -> usize {
        self.number_sites
    }

    /// Direct access to the engine for callers that need other distributions.
    pub fn engine_mut(&mut self) -> &mut R {
        &mut self.engine
    }
}

// An empty range cannot be sampled; a zero-site stream only ever yields 0.
fn site_distribution(number_sites: usize) -> Uniform<usize> {
    Uniform::new(0, number_sites.max(1))
}

/// SplitMix64 finaliser used to decorrelate neighbouring replica indices.
#[inline]
fn mix64(mut x: u64) -> u64 {
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D049BB133111EB);
    x ^ (x >> 31)
}

/// Deterministic seed for replica `index` of a run seeded with `master`.
pub fn replica_seed(master: u64, index: usize) -> u64 {
    let mut chacha = ChaCha20Rng::seed_from_u64(master);
    chacha.set_stream(index as u64);
    mix64(chacha.next_u64() ^ (index as u64).wrapping_mul(0x9E3779B97F4A7C15))
}
