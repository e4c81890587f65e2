//! Time-series samples and state snapshots handed to the outside world.

use crate::state::{Spin, SpinState};

/// One sampling event.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRecord {
    pub sweep: usize,
    pub energy: f64,
    pub spin_vector: Vec<Spin>,
    pub magnetization: f64,
}

/// Receiver of trace records, appended in sweep order.
pub trait TraceSink {
    fn append(&mut self, record: TraceRecord);
}

/// Receiver of full-state snapshots. Fire-and-forget: the sweep loop does
/// not wait for, or look at, the outcome.
pub trait SnapshotSink {
    fn write_snapshot(&mut self, state: &SpinState, sweep_index: usize);
}

/// In-memory, append-only trace. Records are kept in arrival order; one
/// simulation always delivers them with increasing sweep indices.
#[derive(Debug, Clone, Default)]
pub struct SimulationTrace {
    pub records: Vec<TraceRecord>,
}

impl SimulationTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { records: Vec::with_capacity(capacity) }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn energies(&self) -> impl Iterator<Item = f64> + '_ {
        self.records.iter().map(|r| r.energy)
    }

    pub fn magnetizations(&self) -> impl Iterator<Item = f64> + '_ {
        self.records.iter().map(|r| r.magnetization)
    }
}

impl TraceSink for SimulationTrace {
    fn append(&mut self, record: TraceRecord) {
        self.records.push(record);
    }
}

/// Drops every record; for equilibration-only or throwaway runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardTrace;

impl TraceSink for DiscardTrace {
    fn append(&mut self, _record: TraceRecord) {}
}

/// Keeps snapshots in memory, mostly useful in tests.
#[derive(Debug, Clone, Default)]
pub struct SnapshotRecorder {
    pub snapshots: Vec<(usize, SpinState)>,
}

impl SnapshotSink for SnapshotRecorder {
    fn write_snapshot(&mut self, state: &SpinState, sweep_index: usize) {
        self.snapshots.push((sweep_index, state.clone()));
    }
}

impl<S: SnapshotSink + ?Sized> SnapshotSink for &mut S {
    fn write_snapshot(&mut self, state: &SpinState, sweep_index: usize) {
        (**self).write_snapshot(state, sweep_index);
    }
}
