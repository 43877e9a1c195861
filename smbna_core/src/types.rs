// smbna_core/src/types.rs

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

// --- Core Type Aliases ---
pub type State = DVector<f64>;
pub type Control = DVector<f64>;

// --- Core Identifier ---
/// Stable identifier of one belief engine instance (e.g. "gps", "dead_reckoning").
///
/// Ordering is lexicographic on the underlying string. The arbiter relies on
/// this ordering to break trust ties deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BeliefId(pub String);

impl BeliefId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BeliefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BeliefId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for BeliefId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// Lets maps keyed by `BeliefId` be queried with a plain `&str`.
impl Borrow<str> for BeliefId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
