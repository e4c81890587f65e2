use heisenberg_mc::scan::{linspace, temperature_scan};
use heisenberg_mc::utils::rng::replica_seed;
use heisenberg_mc::{Bond, ConfigError, LatticeTopology, SimulationParameters};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Periodic square lattice with ferromagnetic coupling (J < 0).
fn square(l: usize) -> LatticeTopology {
    let idx = |x: usize, y: usize| (x % l) + l * (y % l);
    let mut bonds = Vec::new();
    let mut sublattice_of = vec![0; l * l];
    for y in 0..l {
        for x in 0..l {
            let site = idx(x, y);
            sublattice_of[site] = (x + y) % 2;
            for neighbor in [idx(x + 1, y), idx(x + l - 1, y), idx(x, y + 1), idx(x, y + l - 1)] {
                bonds.push(Bond { site, neighbor, interaction: -1.0 });
            }
        }
    }
    LatticeTopology::from_bonds(2, sublattice_of, &bonds).unwrap()
}

fn base() -> SimulationParameters {
    SimulationParameters {
        sweeps: 200,
        equilibration_sweeps: 100,
        seed: 2024,
        ..Default::default()
    }
}

#[test]
fn test_scan_is_reproducible_and_sorted() {
    let topology = square(6);
    // Deliberately unsorted input.
    let temperatures = [2.0, 0.2, 1.0, 5.0];
    let finished = AtomicUsize::new(0);

    let first = temperature_scan(&topology, &base(), &temperatures, |_| {
        finished.fetch_add(1, Ordering::Relaxed);
    })
    .unwrap();
    let second = temperature_scan(&topology, &base(), &temperatures, |_| {}).unwrap();

    assert_eq!(finished.load(Ordering::Relaxed), 4);
    assert_eq!(first, second);

    let ts: Vec<f64> = first.iter().map(|p| p.temperature).collect();
    assert_eq!(ts, vec![0.2, 1.0, 2.0, 5.0]);

    for point in &first {
        let index = temperatures.iter().position(|&t| t == point.temperature).unwrap();
        assert_eq!(point.seed, replica_seed(2024, index));
        assert_eq!(point.samples, 200);
    }
}

#[test]
fn test_scan_orders_energy_with_temperature() {
    let topology = square(6);
    let points = temperature_scan(&topology, &base(), &linspace(0.1, 10.0, 3), |_| {}).unwrap();

    let cold = &points[0];
    let hot = &points[2];
    assert!(cold.mean_energy < hot.mean_energy,
            "cold {} vs hot {}", cold.mean_energy, hot.mean_energy);
    assert!(cold.mean_magnetization > hot.mean_magnetization);
    assert!(cold.acceptance_rate < hot.acceptance_rate);
    assert!(points.iter().all(|p| p.specific_heat >= 0.0 && p.susceptibility >= 0.0));
}

#[test]
fn test_scan_rejects_bad_temperature_up_front() {
    let topology = square(4);
    let calls = AtomicUsize::new(0);
    let result = temperature_scan(&topology, &base(), &[1.0, -0.5], |_| {
        calls.fetch_add(1, Ordering::Relaxed);
    });
    assert!(matches!(result, Err(ConfigError::NonPositiveTemperature(t)) if t == -0.5));
    assert_eq!(calls.load(Ordering::Relaxed), 0);
}
