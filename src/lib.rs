pub mod config;
pub mod energy;
pub mod error;
pub mod estimators;
pub mod io;
pub mod metropolis;
pub mod scan;
pub mod simulation;
pub mod state;
pub mod topology;
pub mod trace;
pub mod trial;
pub mod utils;

pub use config::SimulationParameters;
pub use error::{ConfigError, DataError, NumericDegeneracy};
pub use simulation::{RunSummary, Simulation};
pub use state::{Spin, SpinState};
pub use topology::{Bond, LatticeTopology};
pub use trace::{SimulationTrace, SnapshotSink, TraceRecord, TraceSink};
