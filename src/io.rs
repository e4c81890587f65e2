//! CSV persistence around the engine: topology and state input, trace and
//! scan output, and a background snapshot writer.
//!
//! File layouts:
//!
//! | file        | columns                                   |
//! |-------------|-------------------------------------------|
//! | bonds       | `site,neighbor,interaction` (directed)    |
//! | sublattices | `site,sublattice`                         |
//! | state       | `site,x,y,z`                              |
//! | trace       | `sweep,energy,magnetization,s1_x,s1_y,..` |

use crate::error::DataError;
use crate::scan::ScanPoint;
use crate::state::SpinState;
use crate::topology::{Bond, LatticeTopology};
use crate::trace::{SimulationTrace, SnapshotSink};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

fn field<T: FromStr>(
    record: &StringRecord,
    column: usize,
    name: &str,
    path: &Path,
    row: usize,
) -> Result<T, DataError> {
    let raw = record.get(column).ok_or_else(|| DataError::Parse {
        path: path.to_path_buf(),
        record: row,
        message: format!("missing column `{name}`"),
    })?;
    raw.parse::<T>().map_err(|_| DataError::Parse {
        path: path.to_path_buf(),
        record: row,
        message: format!("cannot parse `{name}` from {raw:?}"),
    })
}

fn reader(path: &Path) -> Result<csv::Reader<std::fs::File>, DataError> {
    Ok(ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_path(path)?)
}

/// Load a topology from a bond list and a sublattice assignment.
///
/// Every site must appear exactly once in the sublattice file; the number of
/// sublattices is one more than the largest label used.
pub fn read_topology(bonds_path: &Path, sublattices_path: &Path) -> Result<LatticeTopology, DataError> {
    let mut labels: Vec<Option<usize>> = Vec::new();
    for (row, record) in reader(sublattices_path)?.records().enumerate() {
        let record = record?;
        let site: usize = field(&record, 0, "site", sublattices_path, row)?;
        let sublattice: usize = field(&record, 1, "sublattice", sublattices_path, row)?;
        if site >= labels.len() {
            labels.resize(site + 1, None);
        }
        if labels[site].replace(sublattice).is_some() {
            return Err(DataError::Parse {
                path: sublattices_path.to_path_buf(),
                record: row,
                message: format!("site {site} listed twice"),
            });
        }
    }
    let sublattice_of = labels
        .iter()
        .enumerate()
        .map(|(site, label)| {
            label.ok_or_else(|| DataError::Parse {
                path: sublattices_path.to_path_buf(),
                record: site,
                message: format!("site {site} has no sublattice"),
            })
        })
        .collect::<Result<Vec<usize>, DataError>>()?;
    let number_sublattices = sublattice_of.iter().max().map_or(0, |&m| m + 1);

    let mut bonds = Vec::new();
    for (row, record) in reader(bonds_path)?.records().enumerate() {
        let record = record?;
        bonds.push(Bond {
            site: field(&record, 0, "site", bonds_path, row)?,
            neighbor: field(&record, 1, "neighbor", bonds_path, row)?,
            interaction: field(&record, 2, "interaction", bonds_path, row)?,
        });
    }

    debug!(sites = sublattice_of.len(), bonds = bonds.len(), number_sublattices, "loaded topology");
    Ok(LatticeTopology::from_bonds(number_sublattices, sublattice_of, &bonds)?)
}

/// Read a `site,x,y,z` file into a validated state (sites in any order).
pub fn read_state(path: &Path) -> Result<SpinState, DataError> {
    let mut rows: Vec<(usize, f64, f64, f64)> = Vec::new();
    for (row, record) in reader(path)?.records().enumerate() {
        let record = record?;
        rows.push((
            field(&record, 0, "site", path, row)?,
            field(&record, 1, "x", path, row)?,
            field(&record, 2, "y", path, row)?,
            field(&record, 3, "z", path, row)?,
        ));
    }
    rows.sort_by_key(|r| r.0);
    for (expected, r) in rows.iter().enumerate() {
        if r.0 != expected {
            return Err(DataError::Parse {
                path: path.to_path_buf(),
                record: expected,
                message: format!("expected site {expected}, found {}", r.0),
            });
        }
    }
    let x = rows.iter().map(|r| r.1).collect();
    let y = rows.iter().map(|r| r.2).collect();
    let z = rows.iter().map(|r| r.3).collect();
    Ok(SpinState::from_components(x, y, z)?)
}

/// Write a state as `site,x,y,z`.
pub fn write_state(path: &Path, state: &SpinState) -> Result<(), DataError> {
    let mut wtr = WriterBuilder::new().from_path(path)?;
    wtr.write_record(["site", "x", "y", "z"])?;
    for site in 0..state.len() {
        wtr.write_record(&[
            site.to_string(),
            state.x[site].to_string(),
            state.y[site].to_string(),
            state.z[site].to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the sampled trace, one row per sampling event.
pub fn write_trace(path: &Path, trace: &SimulationTrace, number_sublattices: usize) -> Result<(), DataError> {
    let mut wtr = WriterBuilder::new().from_path(path)?;

    let mut header = vec!["sweep".to_string(), "energy".to_string(), "magnetization".to_string()];
    for k in 1..=number_sublattices {
        for c in ["x", "y", "z"] {
            header.push(format!("s{k}_{c}"));
        }
    }
    wtr.write_record(&header)?;

    for r in &trace.records {
        let mut row = vec![r.sweep.to_string(), r.energy.to_string(), r.magnetization.to_string()];
        for s in &r.spin_vector {
            row.extend([s.x.to_string(), s.y.to_string(), s.z.to_string()]);
        }
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write temperature-scan results.
pub fn write_scan(path: &Path, points: &[ScanPoint]) -> Result<(), DataError> {
    let mut wtr = WriterBuilder::new().from_path(path)?;
    wtr.write_record([
        "temperature", "seed", "samples", "acceptance", "mean_energy",
        "specific_heat", "mean_magnetization", "susceptibility", "binder",
    ])?;
    for p in points {
        wtr.write_record(&[
            p.temperature.to_string(), p.seed.to_string(), p.samples.to_string(),
            p.acceptance_rate.to_string(), p.mean_energy.to_string(),
            p.specific_heat.to_string(), p.mean_magnetization.to_string(),
            p.susceptibility.to_string(), p.binder_cumulant.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Snapshot sink that writes `snapshot_{sweep:08}.csv` files on a
/// background thread.
///
/// `write_snapshot` only copies the state into a channel. Failures are logged
/// as they happen and the first one is returned by [`Self::finish`].
pub struct CsvSnapshotWriter {
    sender: Option<Sender<(usize, SpinState)>>,
    handle: Option<JoinHandle<Result<usize, DataError>>>,
}

impl CsvSnapshotWriter {
    pub fn spawn(directory: impl Into<PathBuf>) -> Result<Self, DataError> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;

        let (sender, receiver) = mpsc::channel::<(usize, SpinState)>();
        let handle = thread::spawn(move || {
            let mut written = 0usize;
            let mut first_error = None;
            for (sweep, state) in receiver {
                let path = directory.join(format!("snapshot_{sweep:08}.csv"));
                match write_state(&path, &state) {
                    Ok(()) => written += 1,
                    Err(e) => {
                        error!(path = %path.display(), "snapshot write failed: {e}");
                        first_error.get_or_insert(e);
                    }
                }
            }
            match first_error {
                Some(e) => Err(e),
                None => Ok(written),
            }
        });

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    /// Close the channel, wait for pending writes, return how many were written.
    pub fn finish(mut self) -> Result<usize, DataError> {
        self.sender.take();
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| DataError::Snapshot("writer thread panicked".into()))?,
            None => Ok(0),
        }
    }
}

impl SnapshotSink for CsvSnapshotWriter {
    fn write_snapshot(&mut self, state: &SpinState, sweep_index: usize) {
        if let Some(sender) = &self.sender {
            if sender.send((sweep_index, state.clone())).is_err() {
                error!(sweep = sweep_index, "snapshot writer thread has stopped");
            }
        }
    }
}

impl Drop for CsvSnapshotWriter {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
