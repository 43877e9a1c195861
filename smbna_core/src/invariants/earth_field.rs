use crate::belief::{BeliefHistory, BeliefState};
use crate::field::FieldModel;
use crate::invariants::Invariant;
use crate::utils::angle_between;

/// Checks the field an engine measured against the field expected at the
/// position it claims. A spoofed position lands where the reference field
/// points elsewhere.
#[derive(Debug, Clone)]
pub struct EarthFieldStructure {
    max_angle: f64,
    field_model: Box<dyn FieldModel>,
}

impl EarthFieldStructure {
    pub fn new(max_angle: f64, field_model: Box<dyn FieldModel>) -> Self {
        Self {
            max_angle,
            field_model,
        }
    }
}

impl Invariant for EarthFieldStructure {
    fn name(&self) -> &'static str {
        "earth_field_structure"
    }

    fn score(&self, belief: &BeliefState, _history: &BeliefHistory, _siblings: &[&BeliefState]) -> f64 {
        let Some(measured) = belief.measured_field() else {
            return 0.0;
        };
        let expected = self.field_model.expected_field(belief.position());
        match angle_between(&expected, &measured) {
            Some(angle) if angle > self.max_angle => angle / self.max_angle,
            _ => 0.0,
        }
    }
}
