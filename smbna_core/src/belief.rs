// smbna_core/src/belief.rs

//! The belief data model: an immutable per-timestep snapshot of one engine's
//! estimate, and the append-only history of those snapshots.

use nalgebra::{DMatrix, DVector, Vector3};
use std::collections::{BTreeMap, VecDeque};

use crate::error::EstimationError;
use crate::types::BeliefId;
use crate::utils::is_symmetric_psd;

/// Metadata key under which engines publish a measured magnetic field vector.
pub const MAG_VECTOR_KEY: &str = "mag_vector";

/// A single engine-specific diagnostic value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Vector(Vec<f64>),
}

impl MetadataValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Float(v) => Some(*v),
            MetadataValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Interprets a three-element `Vector` value as a `Vector3`.
    pub fn as_vector3(&self) -> Option<Vector3<f64>> {
        match self {
            MetadataValue::Vector(v) if v.len() == 3 => Some(Vector3::new(v[0], v[1], v[2])),
            _ => None,
        }
    }
}

impl From<Vector3<f64>> for MetadataValue {
    fn from(v: Vector3<f64>) -> Self {
        MetadataValue::Vector(vec![v.x, v.y, v.z])
    }
}

pub type Metadata = BTreeMap<String, MetadataValue>;

// =========================================================================
// == BeliefState ==
// =========================================================================

/// One belief engine's estimate at one instant.
///
/// Constructed once per timestep by the owning engine and never mutated
/// afterwards: the fields are private and only readable. Equality is exact
/// element-wise equality of every field.
#[derive(Debug, Clone, PartialEq)]
pub struct BeliefState {
    belief_id: BeliefId,
    position: DVector<f64>,
    velocity: DVector<f64>,
    covariance: DMatrix<f64>,
    internal_confidence: f64,
    timestamp: f64,
    metadata: Metadata,
}

impl BeliefState {
    /// Validates and builds a belief.
    ///
    /// `position` and `velocity` must share a dimension D of 2 or 3,
    /// `covariance` must be a DxD symmetric PSD matrix,
    /// `internal_confidence` must lie in `[0, 1]` and `timestamp` must be finite.
    pub fn new(
        belief_id: impl Into<BeliefId>,
        position: DVector<f64>,
        velocity: DVector<f64>,
        covariance: DMatrix<f64>,
        internal_confidence: f64,
        timestamp: f64,
    ) -> Result<Self, EstimationError> {
        let dim = position.len();
        if !(2..=3).contains(&dim) {
            return Err(EstimationError::DimensionMismatch {
                context: "belief position",
                expected: if dim < 2 { 2 } else { 3 },
                actual: dim,
            });
        }
        if velocity.len() != dim {
            return Err(EstimationError::DimensionMismatch {
                context: "belief velocity",
                expected: dim,
                actual: velocity.len(),
            });
        }
        if covariance.nrows() != dim || covariance.ncols() != dim {
            return Err(EstimationError::DimensionMismatch {
                context: "belief covariance",
                expected: dim,
                actual: covariance.nrows().max(covariance.ncols()),
            });
        }
        if !is_symmetric_psd(&covariance) {
            return Err(EstimationError::NotPositiveSemidefinite("belief covariance"));
        }
        if !(0.0..=1.0).contains(&internal_confidence) {
            return Err(EstimationError::ConfidenceOutOfRange(internal_confidence));
        }
        if !timestamp.is_finite() {
            return Err(EstimationError::NonFiniteTimestamp(timestamp));
        }

        Ok(Self {
            belief_id: belief_id.into(),
            position,
            velocity,
            covariance,
            internal_confidence,
            timestamp,
            metadata: Metadata::new(),
        })
    }

    /// Convenience constructor from plain slices.
    pub fn from_slices(
        belief_id: impl Into<BeliefId>,
        position: &[f64],
        velocity: &[f64],
        covariance: DMatrix<f64>,
        internal_confidence: f64,
        timestamp: f64,
    ) -> Result<Self, EstimationError> {
        Self::new(
            belief_id,
            DVector::from_row_slice(position),
            DVector::from_row_slice(velocity),
            covariance,
            internal_confidence,
            timestamp,
        )
    }

    /// Attaches a diagnostic value. Consumes the belief, so metadata can only
    /// be added while the snapshot is being built.
    pub fn with_metadata(mut self, key: impl Into<String>, value: MetadataValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn belief_id(&self) -> &BeliefId {
        &self.belief_id
    }

    pub fn position(&self) -> &DVector<f64> {
        &self.position
    }

    pub fn velocity(&self) -> &DVector<f64> {
        &self.velocity
    }

    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    pub fn internal_confidence(&self) -> f64 {
        self.internal_confidence
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Spatial dimension D of position and velocity.
    pub fn dim(&self) -> usize {
        self.position.len()
    }

    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }

    /// The measured field vector, if the engine published one.
    pub fn measured_field(&self) -> Option<Vector3<f64>> {
        self.metadata
            .get(MAG_VECTOR_KEY)
            .and_then(MetadataValue::as_vector3)
    }
}

// =========================================================================
// == BeliefHistory ==
// =========================================================================

/// Append-only, temporally ordered log of one belief's past states.
///
/// Insertion order is temporal order. The log is unbounded unless a
/// retention capacity is set, in which case the oldest entries are dropped.
#[derive(Debug, Clone, Default)]
pub struct BeliefHistory {
    states: VecDeque<BeliefState>,
    capacity: Option<usize>,
}

impl BeliefHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A history that retains at most `capacity` entries (at least one).
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            states: VecDeque::with_capacity(capacity.max(1)),
            capacity: Some(capacity.max(1)),
        }
    }

    /// Builds a history from states already in temporal order.
    pub fn from_states(
        states: impl IntoIterator<Item = BeliefState>,
    ) -> Result<Self, EstimationError> {
        let mut history = Self::new();
        for state in states {
            history.push(state)?;
        }
        Ok(history)
    }

    /// Appends a state. Rejects states from another belief and states whose
    /// timestamp precedes the last entry.
    pub fn push(&mut self, state: BeliefState) -> Result<(), EstimationError> {
        if let Some(last) = self.states.back() {
            if last.belief_id() != state.belief_id() {
                return Err(EstimationError::ForeignBelief {
                    expected: last.belief_id().clone(),
                    actual: state.belief_id().clone(),
                });
            }
            if state.timestamp() < last.timestamp() {
                return Err(EstimationError::TimestampRegression {
                    belief_id: state.belief_id().clone(),
                    previous: last.timestamp(),
                    current: state.timestamp(),
                });
            }
        }

        self.states.push_back(state);
        if let Some(cap) = self.capacity {
            while self.states.len() > cap {
                self.states.pop_front();
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn last(&self) -> Option<&BeliefState> {
        self.states.back()
    }

    /// Entry `index` counted from the oldest retained state.
    pub fn get(&self, index: usize) -> Option<&BeliefState> {
        self.states.get(index)
    }

    /// Entry `n` places back from the newest (`0` is the newest).
    pub fn nth_back(&self, n: usize) -> Option<&BeliefState> {
        self.states.len().checked_sub(n + 1).and_then(|i| self.states.get(i))
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &BeliefState> + '_ {
        self.states.iter()
    }

    /// The newest `n` entries in temporal order.
    pub fn last_n(&self, n: usize) -> impl Iterator<Item = &BeliefState> + '_ {
        let skip = self.states.len().saturating_sub(n);
        self.states.iter().skip(skip)
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }
}
