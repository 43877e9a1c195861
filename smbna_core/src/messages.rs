use crate::types::Control;
use nalgebra::{DVector, Vector3};

// =========================================================================
// == Core Message and Data Enums ==
// =========================================================================

/// A self-describing container for one sensor reading.
#[derive(Clone, Debug, PartialEq)]
pub enum MeasurementData {
    /// Absolute position fix (2-D or 3-D, meters).
    GpsPosition(DVector<f64>),
    /// Velocity-aiding reading (2-D or 3-D, m/s).
    Velocity(DVector<f64>),
    /// Measured magnetic field vector in the navigation frame.
    Magnetometer(Vector3<f64>),
}

// NOTE: A measurement model decides for itself which variants it consumes
// (see `Measurement::extract`). Engines never switch on sensor types.

/// The generic message that carries one sensor reading through the system.
#[derive(Clone, Debug, PartialEq)]
pub struct MeasurementMessage {
    pub timestamp: f64,
    pub data: MeasurementData,
}

impl MeasurementMessage {
    pub fn new(timestamp: f64, data: MeasurementData) -> Self {
        Self { timestamp, data }
    }
}

/// Everything the external sensor layer delivers for one timestep.
///
/// `measurements` is empty on a full dropout. Every engine sees the same
/// input and picks the readings its own models understand.
#[derive(Clone, Debug)]
pub struct StepInput {
    pub timestamp: f64,
    pub dt: f64,
    /// Control / IMU input driving the motion model.
    pub control: Control,
    pub measurements: Vec<MeasurementMessage>,
}

impl StepInput {
    pub fn new(timestamp: f64, dt: f64, control: Control) -> Self {
        Self {
            timestamp,
            dt,
            control,
            measurements: Vec::new(),
        }
    }

    pub fn with_measurement(mut self, data: MeasurementData) -> Self {
        self.measurements
            .push(MeasurementMessage::new(self.timestamp, data));
        self
    }

    /// The first magnetometer reading delivered this step, if any.
    pub fn magnetometer(&self) -> Option<Vector3<f64>> {
        self.measurements.iter().find_map(|m| match m.data {
            MeasurementData::Magnetometer(v) => Some(v),
            _ => None,
        })
    }
}
