//! Command-line driver for Heisenberg Metropolis runs and temperature scans.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use heisenberg_mc::estimators::Estimators;
use heisenberg_mc::io::{read_state, read_topology, write_scan, write_trace, CsvSnapshotWriter};
use heisenberg_mc::scan::{linspace, temperature_scan};
use heisenberg_mc::{Simulation, SimulationParameters, SimulationTrace, SnapshotSink};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "heisenberg_mc", version, about = "Metropolis Monte Carlo for classical Heisenberg lattices")]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true, value_parser = clap::value_parser!(LevelFilter))]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Single run at one temperature.
    Run(RunArgs),
    /// Independent runs over a temperature range, in parallel.
    Scan(ScanArgs),
}

#[derive(Args, Debug)]
struct LatticeArgs {
    /// Bond list, `site,neighbor,interaction` per directed entry.
    #[arg(long, value_name = "FILE")]
    bonds: PathBuf,

    /// Sublattice assignment, `site,sublattice`.
    #[arg(long, value_name = "FILE")]
    sublattices: PathBuf,
}

#[derive(Args, Debug)]
struct SweepArgs {
    #[arg(long, default_value_t = 1_000)]
    sweeps: usize,

    #[arg(long, default_value_t = 100)]
    equilibration_sweeps: usize,

    #[arg(long, default_value_t = 1)]
    sample_interval: usize,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Recompute the estimators from scratch every N production sweeps.
    #[arg(long, value_name = "N")]
    resync_interval: Option<usize>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    lattice: LatticeArgs,

    #[command(flatten)]
    sweeps: SweepArgs,

    #[arg(long, short = 't')]
    temperature: f64,

    /// Start from this `site,x,y,z` state instead of a random one.
    #[arg(long, value_name = "FILE")]
    initial_state: Option<PathBuf>,

    /// Write the sampled trace here.
    #[arg(long, value_name = "FILE")]
    trace: Option<PathBuf>,

    /// Write a state snapshot into this directory at every sample.
    #[arg(long, value_name = "DIR")]
    snapshot_dir: Option<PathBuf>,

    /// Write the final state here.
    #[arg(long, value_name = "FILE")]
    final_state: Option<PathBuf>,

    /// Allowed drift between running and recomputed estimators at the end.
    #[arg(long, default_value_t = 1e-8)]
    verify_tolerance: f64,
}

#[derive(Args, Debug)]
struct ScanArgs {
    #[command(flatten)]
    lattice: LatticeArgs,

    #[command(flatten)]
    sweeps: SweepArgs,

    #[arg(long)]
    t_min: f64,

    #[arg(long)]
    t_max: f64,

    #[arg(long, default_value_t = 16)]
    points: usize,

    #[arg(long, default_value = "scan_results.csv")]
    output: PathBuf,
}

impl SweepArgs {
    fn parameters(&self, temperature: f64) -> SimulationParameters {
        SimulationParameters {
            temperature,
            sweeps: self.sweeps,
            equilibration_sweeps: self.equilibration_sweeps,
            sample_interval: self.sample_interval,
            seed: self.seed,
            resync_interval: self.resync_interval,
        }
    }
}

fn progress_bar(len: u64) -> anyhow::Result<ProgressBar> {
    let bar = ProgressBar::new(len);
    bar.set_style(ProgressStyle::with_template(
        " {bar:40.cyan/blue} {pos}/{len} [{elapsed_precise}]",
    )?);
    Ok(bar)
}

/// Printed summary of a run. Extensive quantities are divided by the site count.
fn observable_rows(est: &Estimators, temperature: f64, number_sites: usize) -> [(&'static str, f64); 5] {
    let n = number_sites as f64;
    [
        ("Energy per site", est.mean_energy() / n),
        ("Magnetization per site", est.mean_magnetization() / n),
        ("Specific heat per site", est.specific_heat(temperature, number_sites)),
        ("Susceptibility per site", est.susceptibility(temperature, number_sites)),
        ("Binder cumulant", est.binder_cumulant()),
    ]
}

fn run(args: RunArgs) -> anyhow::Result<()> {
    let topology = read_topology(&args.lattice.bonds, &args.lattice.sublattices)
        .context("loading lattice")?;
    let parameters = args.sweeps.parameters(args.temperature);

    let simulation = match &args.initial_state {
        Some(path) => {
            let state = read_state(path).with_context(|| format!("loading {}", path.display()))?;
            Simulation::with_state(&topology, parameters, state)?
        }
        None => Simulation::new(&topology, parameters)?,
    };

    let mut snapshots = args.snapshot_dir.clone().map(|dir| CsvSnapshotWriter::spawn(dir)).transpose()?;
    let mut trace = SimulationTrace::with_capacity(simulation.parameters().expected_samples());

    let final_state = {
        let mut simulation = match snapshots.as_mut() {
            Some(writer) => simulation.with_snapshot_sink(Box::new(writer) as Box<dyn SnapshotSink + '_>),
            None => simulation,
        };

        let p = simulation.parameters();
        let bar = progress_bar((p.equilibration_sweeps + p.sweeps) as u64)?;
        let summary = simulation.run_with(&mut trace, |_| {
            bar.inc(1);
            true
        });
        bar.finish();

        match simulation.verify_estimators(args.verify_tolerance) {
            Ok(drift) => info!(drift = drift.max(), "estimators verified"),
            Err(e) => warn!("{e}"),
        }

        println!("{:<28} = {:.4}", "Acceptance rate", summary.acceptance_rate());
        let rows = observable_rows(
            simulation.estimators(),
            simulation.parameters().temperature,
            topology.number_sites(),
        );
        for (label, value) in rows {
            println!("{label:<28} = {value}");
        }

        simulation.state().clone()
    };

    if let Some(writer) = snapshots {
        let written = writer.finish().context("writing snapshots")?;
        info!(written, "snapshots written");
    }
    if let Some(path) = &args.trace {
        write_trace(path, &trace, topology.number_sublattices())
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Trace ({} samples) → {}", trace.len(), path.display());
    }
    if let Some(path) = &args.final_state {
        heisenberg_mc::io::write_state(path, &final_state)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

fn scan(args: ScanArgs) -> anyhow::Result<()> {
    let topology = read_topology(&args.lattice.bonds, &args.lattice.sublattices)
        .context("loading lattice")?;
    let base = args.sweeps.parameters(args.t_min);
    let temperatures = linspace(args.t_min, args.t_max, args.points);

    let bar = progress_bar(temperatures.len() as u64)?;
    let points = temperature_scan(&topology, &base, &temperatures, |_| bar.inc(1))?;
    bar.finish();

    write_scan(&args.output, &points).with_context(|| format!("writing {}", args.output.display()))?;
    println!("Scan complete → {}", args.output.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    match cli.command {
        Command::Run(args) => run(args),
        Command::Scan(args) => scan(args),
    }
}
