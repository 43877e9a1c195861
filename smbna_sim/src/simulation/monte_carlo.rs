// smbna_sim/src/simulation/monte_carlo.rs

use std::fmt;

use anyhow::{ensure, Context};
use tracing::info;

use crate::simulation::config::{ScenarioConfig, Variant};
use crate::simulation::metrics::{nan_safe_stats, SeriesStats};
use crate::simulation::runner::{run_simulation, RunSummary};

/// Refusal thresholds swept when none are given.
pub const DEFAULT_SWEEP_THRESHOLDS: [f64; 6] = [5.0, 10.0, 15.0, 20.0, 30.0, 50.0];

/// Seeds per sweep point or ablation when no run count is given.
pub const DEFAULT_BATCH_RUNS: usize = 20;

/// Aggregate over a batch of runs that differ only in their seed.
#[derive(Debug, Clone, PartialEq)]
pub struct MonteCarloSummary {
    pub variant: Variant,
    pub runs: Vec<RunSummary>,
    pub mean_refusal_rate: f64,
    pub total_spoofs_accepted: usize,
    /// Final position error across runs. Runs that never navigated are skipped.
    pub final_position_error: Option<SeriesStats>,
    /// Per-run mean position error across runs.
    pub mean_position_error: Option<SeriesStats>,
}

/// Runs `runs` copies of `base`, run `i` seeded with `base.simulation.seed + i`.
pub fn run_monte_carlo(base: &ScenarioConfig, runs: usize) -> anyhow::Result<MonteCarloSummary> {
    ensure!(runs > 0, "a Monte Carlo batch needs at least one run");

    let mut summaries = Vec::with_capacity(runs);
    for i in 0..runs {
        let summary = run_simulation(&seeded(base, i))?.summary();
        info!(
            run = i + 1,
            of = runs,
            seed = summary.seed,
            refusal_rate = summary.refusal_rate,
            final_position_error = ?summary.final_position_error,
            "monte carlo run finished"
        );
        summaries.push(summary);
    }

    let error_series = |pick: fn(&RunSummary) -> Option<f64>| {
        nan_safe_stats(summaries.iter().map(|s| pick(s).unwrap_or(f64::NAN)))
    };
    Ok(MonteCarloSummary {
        variant: base.simulation.variant,
        mean_refusal_rate: summaries.iter().map(|s| s.refusal_rate).sum::<f64>() / runs as f64,
        total_spoofs_accepted: summaries.iter().map(|s| s.spoofs_accepted).sum(),
        final_position_error: error_series(|s| s.final_position_error),
        mean_position_error: error_series(|s| s.mean_position_error),
        runs: summaries,
    })
}


/// `base` with the seed of batch run `i`.
fn seeded(base: &ScenarioConfig, i: usize) -> ScenarioConfig {
    let mut config = base.clone();
    config.simulation.seed = base.simulation.seed.wrapping_add(i as u64);
    config
}

// == Threshold Sweep ==

/// One refusal threshold and the batch run with it.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPoint {
    pub threshold: f64,
    pub summary: MonteCarloSummary,
}

/// Sensitivity of refusal rate and error to the refusal threshold.
///
/// Every point runs the same seeds, so points differ only in the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSweep {
    pub variant: Variant,
    pub points: Vec<SweepPoint>,
}

/// Runs a Monte Carlo batch of `runs` seeds for each refusal threshold.
pub fn run_threshold_sweep(
    base: &ScenarioConfig,
    thresholds: &[f64],
    runs: usize,
) -> anyhow::Result<ThresholdSweep> {
    ensure!(!thresholds.is_empty(), "a threshold sweep needs at least one threshold");

    let mut points = Vec::with_capacity(thresholds.len());
    for &threshold in thresholds {
        let mut config = base.clone();
        config.navigation.refusal.threshold = threshold;
        let summary = run_monte_carlo(&config, runs)
            .with_context(|| format!("sweep failed at refusal threshold {threshold}"))?;
        info!(
            threshold,
            mean_refusal_rate = summary.mean_refusal_rate,
            spoofs_accepted = summary.total_spoofs_accepted,
            "sweep point finished"
        );
        points.push(SweepPoint { threshold, summary });
    }
    Ok(ThresholdSweep {
        variant: base.simulation.variant,
        points,
    })
}

// == Paired Ablation ==

/// Both estimator stacks on one seed.
#[derive(Debug, Clone, PartialEq)]
pub struct PairedRun {
    pub seed: u64,
    pub baseline: RunSummary,
    pub multi_belief: RunSummary,
}

impl PairedRun {
    /// Multi-belief minus baseline.
    pub fn refusal_rate_delta(&self) -> f64 {
        self.multi_belief.refusal_rate - self.baseline.refusal_rate
    }

    /// Multi-belief minus baseline; `None` if either run never navigated.
    pub fn final_error_delta(&self) -> Option<f64> {
        Some(self.multi_belief.final_position_error? - self.baseline.final_position_error?)
    }

    pub fn spoofs_accepted_delta(&self) -> f64 {
        self.multi_belief.spoofs_accepted as f64 - self.baseline.spoofs_accepted as f64
    }
}

/// What multi-belief arbitration adds over the single-filter baseline.
/// Every delta is multi-belief minus baseline, taken per seed.
#[derive(Debug, Clone, PartialEq)]
pub struct AblationSummary {
    pub pairs: Vec<PairedRun>,
    pub refusal_rate_delta: Option<SeriesStats>,
    /// Seeds where either variant never navigated are skipped.
    pub final_error_delta: Option<SeriesStats>,
    pub spoofs_accepted_delta: Option<SeriesStats>,
}

/// Runs `Baseline` and `MultiBelief` on the same `runs` seeds. The variant
/// set in `base` is ignored.
pub fn run_ablation(base: &ScenarioConfig, runs: usize) -> anyhow::Result<AblationSummary> {
    ensure!(runs > 0, "an ablation needs at least one seed");

    let mut pairs = Vec::with_capacity(runs);
    for i in 0..runs {
        let mut config = seeded(base, i);
        config.simulation.variant = Variant::Baseline;
        let baseline = run_simulation(&config)?.summary();
        config.simulation.variant = Variant::MultiBelief;
        let multi_belief = run_simulation(&config)?.summary();

        let pair = PairedRun {
            seed: config.simulation.seed,
            baseline,
            multi_belief,
        };
        info!(
            seed = pair.seed,
            refusal_rate_delta = pair.refusal_rate_delta(),
            final_error_delta = ?pair.final_error_delta(),
            "ablation pair finished"
        );
        pairs.push(pair);
    }

    Ok(AblationSummary {
        refusal_rate_delta: nan_safe_stats(pairs.iter().map(PairedRun::refusal_rate_delta)),
        final_error_delta: nan_safe_stats(
            pairs.iter().map(|p| p.final_error_delta().unwrap_or(f64::NAN)),
        ),
        spoofs_accepted_delta: nan_safe_stats(pairs.iter().map(PairedRun::spoofs_accepted_delta)),
        pairs,
    })
}

impl fmt::Display for MonteCarloSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "variant:              {} ({} runs)", self.variant, self.runs.len())?;
        writeln!(f, "mean refusal rate:    {:.1}%", 100.0 * self.mean_refusal_rate)?;
        writeln!(f, "spoofs accepted:      {}", self.total_spoofs_accepted)?;
        match &self.final_position_error {
            Some(stats) => writeln!(f, "final position error: {stats}")?,
            None => writeln!(f, "final position error: n/a")?,
        }
        match &self.mean_position_error {
            Some(stats) => write!(f, "mean position error:  {stats}"),
            None => write!(f, "mean position error:  n/a"),
        }
    }
}

impl fmt::Display for ThresholdSweep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let runs = self.points.first().map_or(0, |p| p.summary.runs.len());
        writeln!(f, "variant: {} ({} runs per threshold)", self.variant, runs)?;
        write!(
            f,
            "{:>10} {:>10} {:>8} {:>18}",
            "threshold", "refusals", "spoofs", "final error"
        )?;
        for point in &self.points {
            let error = point
                .summary
                .final_position_error
                .as_ref()
                .map_or_else(|| "n/a".to_string(), |s| format!("{:.3} ± {:.3}", s.mean, s.std));
            write!(
                f,
                "\n{:>10.1} {:>9.1}% {:>8} {:>18}",
                point.threshold,
                100.0 * point.summary.mean_refusal_rate,
                point.summary.total_spoofs_accepted,
                error
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for AblationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ablation: multi-belief minus baseline over {} seeds", self.pairs.len())?;
        let rows = [
            ("refusal rate", &self.refusal_rate_delta),
            ("final error", &self.final_error_delta),
            ("spoofs accepted", &self.spoofs_accepted_delta),
        ];
        for (i, (label, stats)) in rows.into_iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            match stats {
                Some(stats) => write!(f, "{:<16} {stats}", format!("{label}:"))?,
                None => write!(f, "{:<16} n/a", format!("{label}:"))?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_are_consecutive() {
        let mut base = ScenarioConfig::default();
        base.simulation.duration_seconds = 2.0;
        base.simulation.seed = 10;
        let summary = run_monte_carlo(&base, 3).unwrap();

        let seeds: Vec<u64> = summary.runs.iter().map(|r| r.seed).collect();
        assert_eq!(seeds, vec![10, 11, 12]);
        assert!((0.0..=1.0).contains(&summary.mean_refusal_rate));
    }

    #[test]
    fn zero_runs_is_an_error() {
        assert!(run_monte_carlo(&ScenarioConfig::default(), 0).is_err());
        assert!(run_ablation(&ScenarioConfig::default(), 0).is_err());
    }

    #[test]
    fn empty_sweep_is_an_error() {
        assert!(run_threshold_sweep(&ScenarioConfig::default(), &[], 1).is_err());
    }

    #[test]
    fn negative_threshold_fails_the_sweep() {
        let mut base = ScenarioConfig::default();
        base.simulation.duration_seconds = 1.0;
        assert!(run_threshold_sweep(&base, &[10.0, -1.0], 1).is_err());
    }

    #[test]
    fn pair_deltas_are_multi_belief_minus_baseline() {
        let mut base = ScenarioConfig::default();
        base.simulation.duration_seconds = 2.0;
        let baseline = run_simulation(&base).unwrap().summary();
        let multi_belief = RunSummary {
            refusal_rate: baseline.refusal_rate + 0.25,
            spoofs_accepted: baseline.spoofs_accepted + 3,
            final_position_error: None,
            ..baseline.clone()
        };
        let pair = PairedRun {
            seed: baseline.seed,
            baseline,
            multi_belief,
        };
        assert!((pair.refusal_rate_delta() - 0.25).abs() < 1e-12);
        assert_eq!(pair.spoofs_accepted_delta(), 3.0);
        assert_eq!(pair.final_error_delta(), None);
    }
}
