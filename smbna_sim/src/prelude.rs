// smbna_sim/src/prelude.rs

// Re-export the entire smbna_core prelude so you can easily access
// pure types like `BeliefState`, `Decision`, `NavigationPipeline`, etc.
pub use smbna_core::prelude::*;

// Re-export common simulation-specific types.
pub use crate::cli::{Cli, RunMode};
pub use crate::simulation::config::{ScenarioConfig, ScenarioOverrides, Variant};
pub use crate::simulation::environment::{Environment, GpsSample, SensorFrame, TruthState};
pub use crate::simulation::metrics::{nan_safe_stats, SeriesStats};
pub use crate::simulation::monte_carlo::{
    run_ablation, run_monte_carlo, run_threshold_sweep, AblationSummary, MonteCarloSummary,
    PairedRun, SweepPoint, ThresholdSweep, DEFAULT_BATCH_RUNS, DEFAULT_SWEEP_THRESHOLDS,
};
pub use crate::simulation::prng::SimulationRng;
pub use crate::simulation::runner::{run_simulation, RunSummary, SimulationLog, StepRecord};
pub use crate::simulation::spoofing::SpoofingConfig;
