// smbna_sim/src/simulation/config.rs

//! Scenario configuration: built-in defaults, an optional TOML scenario file,
//! and command-line overrides, layered with figment in that order.

use std::path::Path;

use anyhow::{ensure, Context};
use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use smbna_core::beliefs::ConfidenceConfig;
use smbna_core::config::NavigationConfig;

use crate::simulation::spoofing::SpoofingConfig;

// =========================================================================
// == Top-Level Scenario ==
// =========================================================================

/// # ScenarioConfig
/// Root of the data parsed from a `scenario.toml` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)] // Fail if the TOML has fields not in our struct
pub struct ScenarioConfig {
    pub simulation: SimulationSection,
    pub truth: TruthConfig,
    pub sensors: SensorsConfig,
    pub filter: FilterConfig,
    pub navigation: NavigationConfig,
}

/// Which estimator stack a run exercises.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// One GPS-aided filter guarded only by the innovation gate.
    Baseline,
    /// GPS and dead-reckoning beliefs with invariant scoring and trust arbitration.
    #[default]
    MultiBelief,
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Variant::Baseline => "baseline",
            Variant::MultiBelief => "multi-belief",
        })
    }
}

// =========================================================================
// == Configuration Sub-Structs ==
// These map directly to the sections in a scenario.toml file.
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationSection {
    /// Seed of the run's pseudo-random number generator.
    pub seed: u64,
    /// Fixed time step in seconds.
    pub dt: f64,
    /// Duration of the simulation in seconds.
    pub duration_seconds: f64,
    pub variant: Variant,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            seed: 42,
            dt: 0.1,
            duration_seconds: 300.0,
            variant: Variant::default(),
        }
    }
}

/// Initial ground truth. The platform then flies at constant velocity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TruthConfig {
    pub initial_position: [f64; 2],
    pub initial_velocity: [f64; 2],
    pub heading: f64,
}

impl Default for TruthConfig {
    fn default() -> Self {
        Self {
            initial_position: [0.0, 0.0],
            initial_velocity: [1.0, 0.5],
            heading: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SensorsConfig {
    pub gps: GpsConfig,
    pub imu: ImuConfig,
    pub magnetometer: MagnetometerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GpsConfig {
    /// Per-axis position noise (meters, 1 sigma). Also the filter's `R`.
    pub noise_stddev: f64,
    /// Probability that a step has no fix.
    pub dropout_prob: f64,
    pub spoofing: SpoofingConfig,
}

impl Default for GpsConfig {
    fn default() -> Self {
        Self {
            noise_stddev: 2.0,
            dropout_prob: 0.2,
            spoofing: SpoofingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImuConfig {
    /// Per-axis acceleration noise (m/s^2, 1 sigma).
    pub noise_stddev: f64,
}

impl Default for ImuConfig {
    fn default() -> Self {
        Self {
            noise_stddev: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MagnetometerConfig {
    pub enabled: bool,
    /// Local reference field in the navigation frame (microtesla).
    pub field: [f64; 3],
    /// Per-axis noise (microtesla, 1 sigma).
    pub noise_stddev: f64,
    /// Optional window in which the measured field is rotated away from truth.
    pub anomaly: Option<FieldAnomaly>,
}

impl Default for MagnetometerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            field: [20.0, 0.0, 45.0],
            noise_stddev: 0.5,
            anomaly: None,
        }
    }
}

/// Rotates the measured field about the vertical axis by `rotation` radians
/// for `start_time <= t < end_time`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldAnomaly {
    pub start_time: f64,
    pub end_time: f64,
    pub rotation: f64,
}

impl FieldAnomaly {
    pub fn is_active(&self, t: f64) -> bool {
        t >= self.start_time && t < self.end_time
    }
}

/// Filter tuning shared by every engine of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    /// Diagonal of `Q`.
    pub process_noise: f64,
    /// Diagonal of the initial `P`.
    pub initial_covariance: f64,
    /// The initial estimate is truth plus noise of this standard deviation.
    pub initial_error_stddev: f64,
    pub gps_confidence: ConfidenceConfig,
    pub dead_reckoning_confidence: ConfidenceConfig,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            process_noise: 0.01,
            initial_covariance: 1.0,
            initial_error_stddev: 1.0,
            gps_confidence: ConfidenceConfig::default(),
            dead_reckoning_confidence: ConfidenceConfig::dead_reckoning(),
        }
    }
}

// =========================================================================
// == Loading ==
// =========================================================================

/// Command-line values that take precedence over the scenario file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioOverrides {
    pub seed: Option<u64>,
    pub duration_seconds: Option<f64>,
    pub variant: Option<Variant>,
}

impl ScenarioConfig {
    /// The layered figment: defaults, then the scenario file, then overrides.
    pub fn figment(scenario: Option<&Path>, overrides: &ScenarioOverrides) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(ScenarioConfig::default()));
        if let Some(path) = scenario {
            figment = figment.merge(Toml::file(path));
        }
        if let Some(seed) = overrides.seed {
            figment = figment.merge(Serialized::default("simulation.seed", seed));
        }
        if let Some(duration) = overrides.duration_seconds {
            figment = figment.merge(Serialized::default("simulation.duration_seconds", duration));
        }
        if let Some(variant) = overrides.variant {
            figment = figment.merge(Serialized::default("simulation.variant", variant));
        }
        figment
    }

    /// Loads and validates a scenario.
    pub fn load(scenario: Option<&Path>, overrides: &ScenarioOverrides) -> anyhow::Result<Self> {
        if let Some(path) = scenario {
            ensure!(path.is_file(), "scenario file {} does not exist", path.display());
        }
        let config: ScenarioConfig = Self::figment(scenario, overrides)
            .extract()
            .context("failed to parse scenario configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let sim = &self.simulation;
        ensure!(
            sim.dt.is_finite() && sim.dt > 0.0,
            "simulation.dt must be > 0, got {}",
            sim.dt
        );
        ensure!(
            sim.duration_seconds.is_finite() && sim.duration_seconds >= sim.dt,
            "simulation.duration_seconds must cover at least one step, got {}",
            sim.duration_seconds
        );

        let gps = &self.sensors.gps;
        ensure!(
            gps.noise_stddev.is_finite() && gps.noise_stddev > 0.0,
            "sensors.gps.noise_stddev must be > 0, got {}",
            gps.noise_stddev
        );
        ensure!(
            (0.0..=1.0).contains(&gps.dropout_prob),
            "sensors.gps.dropout_prob must lie in [0, 1], got {}",
            gps.dropout_prob
        );
        gps.spoofing.validate().context("invalid sensors.gps.spoofing")?;
        ensure!(
            self.sensors.imu.noise_stddev.is_finite() && self.sensors.imu.noise_stddev >= 0.0,
            "sensors.imu.noise_stddev must be >= 0"
        );
        ensure!(
            self.sensors.magnetometer.noise_stddev.is_finite()
                && self.sensors.magnetometer.noise_stddev >= 0.0,
            "sensors.magnetometer.noise_stddev must be >= 0"
        );

        let filter = &self.filter;
        ensure!(
            filter.process_noise.is_finite() && filter.process_noise >= 0.0,
            "filter.process_noise must be >= 0"
        );
        ensure!(
            filter.initial_covariance.is_finite() && filter.initial_covariance > 0.0,
            "filter.initial_covariance must be > 0"
        );
        ensure!(
            filter.initial_error_stddev.is_finite() && filter.initial_error_stddev >= 0.0,
            "filter.initial_error_stddev must be >= 0"
        );
        filter.gps_confidence.validate()?;
        filter.dead_reckoning_confidence.validate()?;

        self.navigation.validate()?;
        Ok(())
    }

    /// Number of steps the run takes.
    pub fn step_count(&self) -> usize {
        (self.simulation.duration_seconds / self.simulation.dt).round() as usize
    }

    /// The resolved configuration rendered back to TOML.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("failed to render scenario as TOML")
    }
}
