//! Sweep driver for one Heisenberg Metropolis run.
//!
//! A [`Simulation`] owns the spin state, the random stream and the
//! estimators, and borrows an immutable [`LatticeTopology`]. Everything runs
//! on the calling thread; trace records and snapshots are handed to sinks
//! supplied by the caller.

use crate::config::SimulationParameters;
use crate::energy::{sublattice_spin_sums, total_energy};
use crate::error::{ConfigError, NumericDegeneracy};
use crate::estimators::Estimators;
use crate::metropolis::{self, StepInfo};
use crate::state::SpinState;
use crate::topology::LatticeTopology;
use crate::trace::{SnapshotSink, TraceRecord, TraceSink};
use crate::utils::rng::RandomStream;
use rand::RngCore;
use rand_pcg::Pcg64;
use tracing::{debug, info, warn};

/// Drift above this during a periodic resync is logged as a warning.
pub const RESYNC_WARN_TOLERANCE: f64 = 1e-6;

/// Difference between the incremental estimators and a full recomputation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftReport {
    pub energy_drift: f64,
    /// Largest per-sublattice norm of the spin vector difference.
    pub spin_vector_drift: f64,
}

impl DriftReport {
    pub fn max(&self) -> f64 {
        self.energy_drift.max(self.spin_vector_drift)
    }
}

/// Counters for a block of sweeps.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunSummary {
    pub sweeps: usize,
    pub steps_attempted: u64,
    pub steps_accepted: u64,
    pub stopped_early: bool,
}

impl RunSummary {
    pub fn acceptance_rate(&self) -> f64 {
        if self.steps_attempted == 0 {
            0.0
        } else {
            self.steps_accepted as f64 / self.steps_attempted as f64
        }
    }

    fn combine(self, other: RunSummary) -> RunSummary {
        RunSummary {
            sweeps: self.sweeps + other.sweeps,
            steps_attempted: self.steps_attempted + other.steps_attempted,
            steps_accepted: self.steps_accepted + other.steps_accepted,
            stopped_early: self.stopped_early || other.stopped_early,
        }
    }
}

pub struct Simulation<'a, R: RngCore = Pcg64> {
    topology: &'a LatticeTopology,
    parameters: SimulationParameters,
    state: SpinState,
    rng: RandomStream<R>,
    estimators: Estimators,
    snapshot: Option<Box<dyn SnapshotSink + 'a>>,
    steps_attempted: u64,
    steps_accepted: u64,
    // production sweeps done so far, across all calls
    production_sweeps: usize,
}

impl<'a> Simulation<'a, Pcg64> {
    /// Random initial state drawn from the run's own stream (`parameters.seed`).
    pub fn new(
        topology: &'a LatticeTopology,
        parameters: SimulationParameters,
    ) -> Result<Self, ConfigError> {
        parameters.validate()?;
        let mut rng = RandomStream::new(parameters.seed, topology.number_sites());
        let state = SpinState::random(topology.number_sites(), &mut rng);
        Self::from_parts(topology, parameters, state, rng)
    }

    /// Caller-supplied initial state, stream seeded from `parameters.seed`.
    pub fn with_state(
        topology: &'a LatticeTopology,
        parameters: SimulationParameters,
        state: SpinState,
    ) -> Result<Self, ConfigError> {
        let rng = RandomStream::new(parameters.seed, topology.number_sites());
        Self::from_parts(topology, parameters, state, rng)
    }
}

impl<'a, R: RngCore> Simulation<'a, R> {
    /// Assemble a run from its parts. Validates everything and sets the
    /// estimator baseline with a full recomputation.
    pub fn from_parts(
        topology: &'a LatticeTopology,
        parameters: SimulationParameters,
        state: SpinState,
        mut rng: RandomStream<R>,
    ) -> Result<Self, ConfigError> {
        parameters.validate()?;
        let number_sites = topology.number_sites();
        if number_sites == 0 {
            return Err(ConfigError::EmptyLattice);
        }
        if state.len() != number_sites {
            return Err(ConfigError::StateSizeMismatch {
                expected: number_sites,
                actual: state.len(),
            });
        }
        state.check_unit_norms()?;

        let asymmetric = topology.asymmetric_bonds();
        if !asymmetric.is_empty() {
            warn!(
                count = asymmetric.len(),
                first = ?asymmetric[0],
                "neighbor table is not symmetric; one-way bonds are simulated as given"
            );
        }

        rng.set_site_range(number_sites);

        let mut simulation = Self {
            topology,
            estimators: Estimators::new(topology.number_sublattices()),
            parameters,
            state,
            rng,
            snapshot: None,
            steps_attempted: 0,
            steps_accepted: 0,
            production_sweeps: 0,
        };
        simulation.save_full_state();
        Ok(simulation)
    }

    /// Request a snapshot at every sampling event.
    pub fn with_snapshot_sink(mut self, sink: Box<dyn SnapshotSink + 'a>) -> Self {
        self.snapshot = Some(sink);
        self
    }

    pub fn topology(&self) -> &LatticeTopology {
        self.topology
    }

    pub fn parameters(&self) -> &SimulationParameters {
        &self.parameters
    }

    pub fn state(&self) -> &SpinState {
        &self.state
    }

    pub fn estimators(&self) -> &Estimators {
        &self.estimators
    }

    /// Production sweeps completed so far. The next production sweep gets
    /// this number as its sweep index.
    pub fn production_sweeps(&self) -> usize {
        self.production_sweeps
    }

    /// Acceptance counters over the whole lifetime of this run.
    pub fn acceptance_rate(&self) -> f64 {
        if self.steps_attempted == 0 {
            0.0
        } else {
            self.steps_accepted as f64 / self.steps_attempted as f64
        }
    }

    /// One Metropolis step.
    #[inline]
    pub fn step(&mut self) -> StepInfo {
        let info = metropolis::step(
            self.topology,
            &mut self.state,
            &mut self.estimators,
            self.parameters.temperature,
            &mut self.rng,
        );
        self.steps_attempted += 1;
        self.steps_accepted += info.accepted() as u64;
        info
    }

    /// `number_sites` independent steps, then a sample if this is a
    /// production sweep on the sampling grid.
    pub fn sweep(&mut self, sweep_index: usize, is_equilibration: bool, trace: &mut dyn TraceSink) {
        for _ in 0..self.topology.number_sites() {
            self.step();
        }

        if !is_equilibration && sweep_index % self.parameters.sample_interval == 0 {
            self.estimators.record_sample();
            trace.append(TraceRecord {
                sweep: sweep_index,
                energy: self.estimators.energy,
                spin_vector: self.estimators.spin_vector.clone(),
                magnetization: self.estimators.magnetization,
            });
            if let Some(sink) = self.snapshot.as_mut() {
                sink.write_snapshot(&self.state, sweep_index + 1);
            }
        }
    }

    /// All equilibration sweeps, or all production sweeps.
    pub fn run_sweeps(&mut self, is_equilibration: bool, trace: &mut dyn TraceSink) -> RunSummary {
        self.run_sweeps_with(is_equilibration, trace, |_| true)
    }

    /// Like [`Self::run_sweeps`], asking `keep_going(i)` before the `i`-th
    /// sweep of this call. Stopping only ever happens between sweeps.
    ///
    /// Equilibration sweeps are numbered from 0 on every call. Production
    /// sweeps continue from [`Self::production_sweeps`], so repeated calls
    /// append to a trace with increasing sweep indices.
    pub fn run_sweeps_with(
        &mut self,
        is_equilibration: bool,
        trace: &mut dyn TraceSink,
        mut keep_going: impl FnMut(usize) -> bool,
    ) -> RunSummary {
        let total = if is_equilibration {
            self.parameters.equilibration_sweeps
        } else {
            self.parameters.sweeps
        };
        let (attempted0, accepted0) = (self.steps_attempted, self.steps_accepted);

        let mut summary = RunSummary::default();
        for local_index in 0..total {
            if !keep_going(local_index) {
                summary.stopped_early = true;
                break;
            }
            let sweep_index = if is_equilibration { local_index } else { self.production_sweeps };
            self.sweep(sweep_index, is_equilibration, trace);
            summary.sweeps += 1;

            if !is_equilibration {
                self.production_sweeps += 1;
                if let Some(k) = self.parameters.resync_interval {
                    if self.production_sweeps % k == 0 {
                        self.resync(sweep_index);
                    }
                }
            }
        }

        summary.steps_attempted = self.steps_attempted - attempted0;
        summary.steps_accepted = self.steps_accepted - accepted0;
        summary
    }

    /// Equilibration, baseline recomputation, then production.
    pub fn run(&mut self, trace: &mut dyn TraceSink) -> RunSummary {
        self.run_with(trace, |_| true)
    }

    /// [`Self::run`] with a cooperative stop check before every sweep of
    /// both phases. The flag receives the position of the sweep within its
    /// phase of this call.
    pub fn run_with(
        &mut self,
        trace: &mut dyn TraceSink,
        mut keep_going: impl FnMut(usize) -> bool,
    ) -> RunSummary {
        info!(
            sites = self.topology.number_sites(),
            sublattices = self.topology.number_sublattices(),
            temperature = self.parameters.temperature,
            equilibration_sweeps = self.parameters.equilibration_sweeps,
            sweeps = self.parameters.sweeps,
            sample_interval = self.parameters.sample_interval,
            seed = self.parameters.seed,
            "starting run"
        );

        let equilibration = self.run_sweeps_with(true, trace, &mut keep_going);
        if equilibration.stopped_early {
            info!(sweeps = equilibration.sweeps, "stopped during equilibration");
            return equilibration;
        }
        debug!(acceptance = equilibration.acceptance_rate(), "equilibration done");

        self.save_full_state();
        let production = self.run_sweeps_with(false, trace, &mut keep_going);

        info!(
            sweeps = production.sweeps,
            acceptance = production.acceptance_rate(),
            samples = self.estimators.number_samples,
            mean_energy = self.estimators.mean_energy(),
            mean_magnetization = self.estimators.mean_magnetization(),
            stopped_early = production.stopped_early,
            "run finished"
        );
        equilibration.combine(production)
    }

    /// Overwrite `energy` and `spin_vector` with a from-scratch recomputation.
    pub fn save_full_state(&mut self) {
        self.estimators.energy = total_energy(self.topology, &self.state);
        self.estimators.spin_vector = sublattice_spin_sums(self.topology, &self.state);
    }

    /// Compare the incremental estimators against a full recomputation.
    pub fn estimator_drift(&self) -> DriftReport {
        let energy = total_energy(self.topology, &self.state);
        let sums = sublattice_spin_sums(self.topology, &self.state);
        let spin_vector_drift = sums
            .iter()
            .zip(&self.estimators.spin_vector)
            .map(|(full, running)| (full - running).norm())
            .fold(0.0, f64::max);
        DriftReport {
            energy_drift: (energy - self.estimators.energy).abs(),
            spin_vector_drift,
        }
    }

    /// [`Self::estimator_drift`] checked against `tolerance`.
    pub fn verify_estimators(&self, tolerance: f64) -> Result<DriftReport, NumericDegeneracy> {
        let drift = self.estimator_drift();
        if drift.max() > tolerance {
            return Err(NumericDegeneracy {
                energy_drift: drift.energy_drift,
                spin_vector_drift: drift.spin_vector_drift,
                tolerance,
            });
        }
        Ok(drift)
    }

    fn resync(&mut self, sweep_index: usize) {
        let drift = self.estimator_drift();
        if drift.max() > RESYNC_WARN_TOLERANCE {
            warn!(sweep = sweep_index, energy_drift = drift.energy_drift,
                  spin_vector_drift = drift.spin_vector_drift, "estimator drift before resync");
        } else {
            debug!(sweep = sweep_index, drift = drift.max(), "resync");
        }
        self.save_full_state();
    }
}
