// smbna_sim/src/simulation/environment.rs

//! Ground truth and simulated sensors. All randomness of a run is drawn here.

use nalgebra::{DVector, Rotation3, Vector2, Vector3};

use smbna_core::messages::{MeasurementData, StepInput};

use crate::simulation::config::{ScenarioConfig, SensorsConfig, TruthConfig};
use crate::simulation::prng::SimulationRng;

/// Planar ground truth `[x, y, vx, vy, heading]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruthState {
    pub position: Vector2<f64>,
    pub velocity: Vector2<f64>,
    pub heading: f64,
}

impl TruthState {
    pub fn from_config(config: &TruthConfig) -> Self {
        Self {
            position: Vector2::from(config.initial_position),
            velocity: Vector2::from(config.initial_velocity),
            heading: config.heading,
        }
    }

    /// Constant-velocity propagation.
    pub fn propagate(&mut self, dt: f64) {
        self.position += self.velocity * dt;
    }

    pub fn as_array(&self) -> [f64; 5] {
        [
            self.position.x,
            self.position.y,
            self.velocity.x,
            self.velocity.y,
            self.heading,
        ]
    }
}

/// What the GPS receiver produced this step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsSample {
    /// `None` on dropout.
    pub fix: Option<Vector2<f64>>,
    pub spoofed: bool,
}

/// Everything sensed during one step, ready to hand to the estimators.
#[derive(Debug, Clone)]
pub struct SensorFrame {
    pub input: StepInput,
    pub gps: GpsSample,
}

/// Truth plus sensor simulation for one run.
#[derive(Debug, Clone)]
pub struct Environment {
    truth: TruthState,
    sensors: SensorsConfig,
    dt: f64,
    time: f64,
    rng: SimulationRng,
}

impl Environment {
    pub fn new(config: &ScenarioConfig, rng: SimulationRng) -> Self {
        Self {
            truth: TruthState::from_config(&config.truth),
            sensors: config.sensors.clone(),
            dt: config.simulation.dt,
            time: 0.0,
            rng,
        }
    }

    pub fn truth(&self) -> &TruthState {
        &self.truth
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Advances truth by one step and samples every sensor.
    ///
    /// The IMU reports the (zero) true acceleration plus noise, and is
    /// delivered as the control input.
    pub fn step(&mut self, step_index: usize) -> SensorFrame {
        // Time is derived from the index so it does not accumulate round-off.
        self.time = step_index as f64 * self.dt;
        self.truth.propagate(self.dt);

        let accel = self.rng.gaussian2(self.sensors.imu.noise_stddev);
        let mut input = StepInput::new(
            self.time,
            self.dt,
            DVector::from_column_slice(accel.as_slice()),
        );

        let gps = self.sample_gps();
        if let Some(fix) = gps.fix {
            input = input.with_measurement(MeasurementData::GpsPosition(DVector::from_column_slice(
                fix.as_slice(),
            )));
        }
        if let Some(field) = self.sample_magnetometer() {
            input = input.with_measurement(MeasurementData::Magnetometer(field));
        }

        SensorFrame { input, gps }
    }

    fn sample_gps(&mut self) -> GpsSample {
        let gps = &self.sensors.gps;
        if self.rng.chance(gps.dropout_prob) {
            return GpsSample {
                fix: None,
                spoofed: false,
            };
        }
        let mut fix = self.truth.position + self.rng.gaussian2(gps.noise_stddev);
        let offset = gps.spoofing.offset(self.time, &mut self.rng);
        if let Some(offset) = offset {
            fix += offset;
        }
        GpsSample {
            fix: Some(fix),
            spoofed: offset.is_some(),
        }
    }

    fn sample_magnetometer(&mut self) -> Option<Vector3<f64>> {
        let mag = &self.sensors.magnetometer;
        if !mag.enabled {
            return None;
        }
        let mut field = Vector3::from(mag.field);
        if let Some(anomaly) = mag.anomaly.filter(|a| a.is_active(self.time)) {
            field = Rotation3::from_axis_angle(&Vector3::z_axis(), anomaly.rotation) * field;
        }
        Some(field + self.rng.gaussian3(mag.noise_stddev))
    }
}
