// smbna_sim/src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use smbna_sim::cli::{Cli, RunMode};
use smbna_sim::simulation::config::ScenarioConfig;
use smbna_sim::simulation::monte_carlo::{run_ablation, run_monte_carlo, run_threshold_sweep};
use smbna_sim::simulation::runner::run_simulation;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise the verbosity flag picks the level.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // --- 1. Resolve the scenario ---
    let config = ScenarioConfig::load(cli.scenario.as_deref(), &cli.overrides())
        .context("could not load the scenario")?;
    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    // --- 2. Run ---
    match cli.mode() {
        RunMode::Single => println!("{}", run_simulation(&config)?.summary()),
        RunMode::MonteCarlo { runs } => println!("{}", run_monte_carlo(&config, runs)?),
        RunMode::Sweep { thresholds, runs } => {
            println!("{}", run_threshold_sweep(&config, &thresholds, runs)?)
        }
        RunMode::Ablation { runs } => println!("{}", run_ablation(&config, runs)?),
    }
    Ok(())
}
