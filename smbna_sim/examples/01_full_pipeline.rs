// smbna_sim/examples/01_full_pipeline.rs

//! Runs the drift-attack scenario through both estimator stacks and prints
//! them side by side.
//!
//! To run this example:
//! `cargo run --example 01_full_pipeline`

use anyhow::{Context, Result};
use std::path::Path;

use smbna_sim::prelude::*;

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    // --- 1. Load Simulation Configuration ---
    let scenario_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../assets/scenarios/drift_attack.toml");
    println!("Loading scenario from: {}", scenario_path.display());

    // --- 2. Run every variant on the same seed ---
    for variant in [Variant::Baseline, Variant::MultiBelief] {
        let overrides = ScenarioOverrides {
            variant: Some(variant),
            ..Default::default()
        };
        let config = ScenarioConfig::load(Some(&scenario_path), &overrides)
            .with_context(|| format!("failed to load {}", scenario_path.display()))?;
        let log = run_simulation(&config)?;

        // --- 3. Report ---
        println!("\n{}", log.summary());
        if let Some(first) = log.records.iter().find(|r| r.decision.is_unsafe()) {
            println!(
                "first refusal:        t = {:.1} s ({})",
                first.time, first.decision
            );
        }
    }
    Ok(())
}
