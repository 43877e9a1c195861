// smbna_sim/src/cli.rs

use clap::Parser;
use std::path::PathBuf;

use crate::simulation::config::{ScenarioOverrides, Variant};
use crate::simulation::monte_carlo::{DEFAULT_BATCH_RUNS, DEFAULT_SWEEP_THRESHOLDS};

/// SMBNA: spoofing-resilient multi-belief navigation, in simulation.
///
/// Runs a seeded scenario (or a Monte Carlo batch of them) and reports how
/// often navigation was refused and how far the accepted estimate drifted.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Scenario TOML file. Built-in defaults are used for anything it omits.
    #[arg(short, long)]
    pub scenario: Option<PathBuf>,

    /// Override the scenario's random seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the scenario's duration, in seconds.
    #[arg(short, long)]
    pub duration: Option<f64>,

    /// Override the estimator stack under test.
    #[arg(long, value_enum)]
    pub variant: Option<Variant>,

    /// Run a batch of this many seeds instead of a single run. Also sets the
    /// seeds per point for `--sweep-thresholds` and `--ablation`.
    #[arg(long, value_name = "RUNS")]
    pub monte_carlo: Option<usize>,

    /// Sweep the refusal threshold over a comma-separated list
    /// (5,10,15,20,30,50 when given without values).
    #[arg(
        long,
        value_name = "LIST",
        value_delimiter = ',',
        num_args = 0..,
        conflicts_with = "ablation"
    )]
    pub sweep_thresholds: Option<Vec<f64>>,

    /// Run baseline and multi-belief on the same seeds and report the deltas.
    #[arg(long, default_value_t = false)]
    pub ablation: bool,

    /// Print the resolved scenario as TOML and exit.
    #[arg(long, default_value_t = false)]
    pub print_config: bool,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// What the binary should run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunMode {
    Single,
    MonteCarlo { runs: usize },
    Sweep { thresholds: Vec<f64>, runs: usize },
    Ablation { runs: usize },
}

impl Cli {
    pub fn mode(&self) -> RunMode {
        let runs = self.monte_carlo.unwrap_or(DEFAULT_BATCH_RUNS);
        if let Some(thresholds) = &self.sweep_thresholds {
            let thresholds = if thresholds.is_empty() {
                DEFAULT_SWEEP_THRESHOLDS.to_vec()
            } else {
                thresholds.clone()
            };
            return RunMode::Sweep { thresholds, runs };
        }
        if self.ablation {
            return RunMode::Ablation { runs };
        }
        match self.monte_carlo {
            Some(runs) => RunMode::MonteCarlo { runs },
            None => RunMode::Single,
        }
    }

    pub fn overrides(&self) -> ScenarioOverrides {
        ScenarioOverrides {
            seed: self.seed,
            duration_seconds: self.duration,
            variant: self.variant,
        }
    }
}
