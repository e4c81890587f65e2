//! Unit‑test: Metropolis stepping on small lattices.

use heisenberg_mc::energy::{sublattice_spin_sums, total_energy};
use heisenberg_mc::estimators::Estimators;
use heisenberg_mc::metropolis::{self, StepOutcome};
use heisenberg_mc::trace::SimulationTrace;
use heisenberg_mc::trial::propose;
use heisenberg_mc::utils::rng::RandomStream;
use heisenberg_mc::{Bond, LatticeTopology, Simulation, SimulationParameters, Spin, SpinState};

/// Periodic simple-cubic lattice, L^3 sites, two checkerboard sublattices.
fn cubic(l: usize, j: f64) -> LatticeTopology {
    let idx = |x: usize, y: usize, z: usize| (x % l) + l * ((y % l) + l * (z % l));
    let mut bonds = Vec::new();
    let mut sublattice_of = vec![0; l * l * l];
    for z in 0..l {
        for y in 0..l {
            for x in 0..l {
                let site = idx(x, y, z);
                sublattice_of[site] = (x + y + z) % 2;
                for neighbor in [
                    idx(x + 1, y, z), idx(x + l - 1, y, z),
                    idx(x, y + 1, z), idx(x, y + l - 1, z),
                    idx(x, y, z + 1), idx(x, y, z + l - 1),
                ] {
                    bonds.push(Bond { site, neighbor, interaction: j });
                }
            }
        }
    }
    LatticeTopology::from_bonds(2, sublattice_of, &bonds).unwrap()
}

#[test]
fn test_metropolis_acceptance_rate() {
    let topology = cubic(4, 1.0);
    let parameters = SimulationParameters { temperature: 1.0, seed: 0xDEADBEEF, ..Default::default() };
    let mut sim = Simulation::new(&topology, parameters).unwrap();

    let n_steps = 10_000;
    let accepted = (0..n_steps).filter(|_| sim.step().accepted()).count();
    let acc_rate = accepted as f64 / n_steps as f64;

    assert!(
        (0.01..=0.99).contains(&acc_rate),
        "Acceptance rate {acc_rate:.3} is outside plausible range"
    );
    assert!((sim.acceptance_rate() - acc_rate).abs() < 1e-12);
}

#[test]
fn test_same_seed_same_trajectory() {
    let topology = cubic(3, -1.0);
    let parameters = SimulationParameters {
        temperature: 0.8,
        sweeps: 20,
        equilibration_sweeps: 5,
        seed: 1234,
        ..Default::default()
    };

    let mut a = Simulation::new(&topology, parameters.clone()).unwrap();
    let mut b = Simulation::new(&topology, parameters).unwrap();
    assert_eq!(a.state(), b.state());

    for _ in 0..2_000 {
        assert_eq!(a.step(), b.step());
    }
    assert_eq!(a.state(), b.state());

    let (mut ta, mut tb) = (SimulationTrace::new(), SimulationTrace::new());
    a.run(&mut ta);
    b.run(&mut tb);
    assert_eq!(ta.records, tb.records);
    assert_eq!(a.state(), b.state());
    assert_eq!(a.estimators(), b.estimators());
}

#[test]
fn test_different_seed_different_trajectory() {
    let topology = cubic(3, -1.0);
    let mk = |seed| SimulationParameters { seed, ..Default::default() };
    let a = Simulation::new(&topology, mk(1)).unwrap();
    let b = Simulation::new(&topology, mk(2)).unwrap();
    assert_ne!(a.state(), b.state());
}

#[test]
fn test_isolated_site_always_accepts() {
    // Single free spin, seed 42, 10 sweeps, sample every sweep.
    let topology = LatticeTopology::from_bonds(1, vec![0], &[]).unwrap();
    let parameters = SimulationParameters {
        temperature: 1.0,
        sweeps: 10,
        equilibration_sweeps: 0,
        sample_interval: 1,
        seed: 42,
        resync_interval: None,
    };
    let mut sim = Simulation::new(&topology, parameters).unwrap();
    let mut trace = SimulationTrace::new();
    let summary = sim.run(&mut trace);

    assert_eq!(summary.steps_attempted, 10);
    assert_eq!(summary.steps_accepted, 10);
    assert_eq!(sim.estimators().number_samples, 10);
    assert_eq!(trace.len(), 10);
    assert!(trace.energies().all(|e| e == 0.0));
    assert_eq!(sim.estimators().energy, 0.0);

    for _ in 0..1_000 {
        let info = sim.step();
        assert!(info.accepted());
        assert_eq!(info.energy_difference, 0.0);
    }
}

#[test]
fn test_spins_stay_on_unit_sphere() {
    let topology = cubic(4, 0.5);
    let mut sim = Simulation::new(&topology, SimulationParameters { temperature: 2.0, ..Default::default() }).unwrap();
    for _ in 0..20_000 {
        sim.step();
    }
    assert!(sim.state().max_norm_error() < 1e-9);
}

#[test]
fn test_coupled_pair_relaxes_to_ground_state() {
    let bonds = [
        Bond { site: 0, neighbor: 1, interaction: 1.0 },
        Bond { site: 1, neighbor: 0, interaction: 1.0 },
    ];
    let topology = LatticeTopology::from_bonds(2, vec![0, 1], &bonds).unwrap();

    // Antiparallel start: each site sees -1, each bond counted once.
    let antiparallel = SpinState::from_components(vec![0.0, 0.0], vec![0.0, 0.0], vec![1.0, -1.0]).unwrap();
    assert_eq!(total_energy(&topology, &antiparallel), -1.0);

    // From the aligned (highest energy) configuration, a cold run drifts
    // down to the antiparallel ground state.
    let aligned = SpinState::aligned(2, Spin::z()).unwrap();
    assert_eq!(total_energy(&topology, &aligned), 1.0);

    let parameters = SimulationParameters {
        temperature: 0.01,
        sweeps: 2_000,
        equilibration_sweeps: 0,
        sample_interval: 1,
        seed: 7,
        resync_interval: None,
    };
    let mut sim = Simulation::with_state(&topology, parameters, aligned).unwrap();
    let mut trace = SimulationTrace::new();
    sim.run(&mut trace);

    let tail: Vec<f64> = trace.energies().skip(1_500).collect();
    let mean = tail.iter().sum::<f64>() / tail.len() as f64;
    assert!(mean < -0.9, "late mean energy {mean} is not near -1");
    assert!(sim.verify_estimators(1e-10).is_ok());
}

#[test]
fn test_rejected_step_leaves_everything_untouched() {
    // Cold ferromagnet in its aligned ground state: nearly every trial is uphill.
    let topology = cubic(3, -1.0);
    let n = topology.number_sites();
    let mut state = SpinState::aligned(n, Spin::z()).unwrap();
    let mut estimators = Estimators::new(topology.number_sublattices());
    estimators.energy = total_energy(&topology, &state);
    estimators.spin_vector = sublattice_spin_sums(&topology, &state);
    let mut rng = RandomStream::new(31, n);

    let mut rejected = 0;
    for _ in 0..200 {
        let (state_before, estimators_before, rng_before) = (state.clone(), estimators.clone(), rng.clone());
        let info = metropolis::step(&topology, &mut state, &mut estimators, 0.05, &mut rng);
        if info.outcome != StepOutcome::Rejected {
            continue;
        }
        rejected += 1;

        for site in 0..n {
            assert_eq!(state.x[site].to_bits(), state_before.x[site].to_bits());
            assert_eq!(state.y[site].to_bits(), state_before.y[site].to_bits());
            assert_eq!(state.z[site].to_bits(), state_before.z[site].to_bits());
        }
        assert_eq!(estimators.energy.to_bits(), estimators_before.energy.to_bits());
        assert_eq!(estimators, estimators_before);

        // Replay: site draw, two draws for the proposal, one acceptance draw.
        let mut replay = rng_before;
        let site = replay.random_site_index();
        assert_eq!(site, info.site);
        let flip = propose(&topology, &state_before, site, &mut replay);
        assert_eq!(flip.energy_difference, info.energy_difference);
        assert!(flip.energy_difference > 0.0);
        replay.uniform();
        for _ in 0..4 {
            assert_eq!(replay.uniform(), rng.uniform());
        }
    }
    assert!(rejected > 50, "only {rejected} rejections");
}
