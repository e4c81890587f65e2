// scan.rs - independent runs over a list of temperatures, in parallel

use crate::config::SimulationParameters;
use crate::error::ConfigError;
use crate::simulation::Simulation;
use crate::topology::LatticeTopology;
use crate::trace::DiscardTrace;
use crate::utils::rng::replica_seed;
use rayon::prelude::*;

/// Summary of one temperature point.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPoint {
    pub temperature: f64,
    pub seed: u64,
    pub samples: usize,
    pub acceptance_rate: f64,
    pub mean_energy: f64,
    pub specific_heat: f64,
    pub mean_magnetization: f64,
    pub susceptibility: f64,
    pub binder_cumulant: f64,
}

/// Run one full simulation per temperature.
///
/// Every point gets its own random initial state and its own stream, seeded
/// from `base.seed` and the temperature's position in `temperatures`, so the
/// output does not depend on how rayon schedules the work. `on_done` is
/// called once per finished point (from worker threads).
pub fn temperature_scan<F>(
    topology: &LatticeTopology,
    base: &SimulationParameters,
    temperatures: &[f64],
    on_done: F,
) -> Result<Vec<ScanPoint>, ConfigError>
where
    F: Fn(&ScanPoint) + Sync,
{
    // Fail before spawning anything.
    base.validate()?;
    for &t in temperatures {
        base.with_temperature(t).validate()?;
    }

    let mut points = temperatures
        .par_iter()
        .enumerate()
        .map(|(index, &temperature)| -> Result<ScanPoint, ConfigError> {
            let parameters = SimulationParameters {
                temperature,
                seed: replica_seed(base.seed, index),
                ..base.clone()
            };
            let point = run_point(topology, parameters)?;
            on_done(&point);
            Ok(point)
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

    points.sort_by(|a, b| a.temperature.total_cmp(&b.temperature));
    Ok(points)
}

fn run_point(
    topology: &LatticeTopology,
    parameters: SimulationParameters,
) -> Result<ScanPoint, ConfigError> {
    let seed = parameters.seed;
    let temperature = parameters.temperature;
    let n = topology.number_sites();

    let mut simulation = Simulation::new(topology, parameters)?;
    let summary = simulation.run(&mut DiscardTrace);
    let est = simulation.estimators();

    Ok(ScanPoint {
        temperature,
        seed,
        samples: est.number_samples,
        acceptance_rate: summary.acceptance_rate(),
        mean_energy: est.mean_energy(),
        specific_heat: est.specific_heat(temperature, n),
        mean_magnetization: est.mean_magnetization(),
        susceptibility: est.susceptibility(temperature, n),
        binder_cumulant: est.binder_cumulant(),
    })
}

/// `count` evenly spaced temperatures from `t_min` to `t_max` inclusive.
pub fn linspace(t_min: f64, t_max: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![t_min],
        _ => {
            let dt = (t_max - t_min) / (count - 1) as f64;
            (0..count).map(|i| t_min + dt * i as f64).collect()
        }
    }
}
