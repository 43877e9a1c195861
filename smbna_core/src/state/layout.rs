// smbna_core/src/state/layout.rs
use crate::state::StateVariable;

/// Dimension of the planar navigation state.
pub const PLANAR_STATE_DIM: usize = 5;
/// Dimension of the 3-D position + velocity state.
pub const SPATIAL_STATE_DIM: usize = 6;

/// Returns the 5-dimensional planar layout used by the drone navigation filters.
///
/// The state is composed of:
/// - Position (2): x, y
/// - Velocity (2): vx, vy
/// - Heading (1), carried through prediction but not observed by any sensor
pub fn planar_layout() -> Vec<StateVariable> {
    vec![
        // --- Position --- indices 0-1
        StateVariable::Px,
        StateVariable::Py,
        // --- Velocity --- indices 2-3
        StateVariable::Vx,
        StateVariable::Vy,
        // --- Heading --- index 4
        StateVariable::Heading,
    ]
}

/// Returns the 6-dimensional layout: 3-D position followed by 3-D velocity.
pub fn spatial_layout() -> Vec<StateVariable> {
    vec![
        // --- Position --- indices 0-2
        StateVariable::Px,
        StateVariable::Py,
        StateVariable::Pz,
        // --- Velocity --- indices 3-5
        StateVariable::Vx,
        StateVariable::Vy,
        StateVariable::Vz,
    ]
}
