// smbna_core/src/refusal.rs

use crate::config::RefusalConfig;
use crate::error::ConfigError;

/// Innovation norm above which navigation is refused when nothing else is configured.
pub const DEFAULT_REFUSAL_THRESHOLD: f64 = 20.0;

/// PURE FUNCTION: `true` iff `innovation_norm > threshold`.
///
/// The comparison is strict, and a NaN innovation (no measurement fused)
/// never triggers a refusal.
pub fn should_refuse_navigation(innovation_norm: f64, threshold: f64) -> bool {
    if innovation_norm.is_nan() {
        return false;
    }
    innovation_norm > threshold
}

/// Innovation-threshold veto, usable on its own with a single filter or as
/// the last stage of the full pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefusalGate {
    threshold: f64,
}

impl RefusalGate {
    pub fn new(config: RefusalConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            threshold: config.threshold,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn should_refuse(&self, innovation_norm: f64) -> bool {
        should_refuse_navigation(innovation_norm, self.threshold)
    }
}

impl Default for RefusalGate {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_REFUSAL_THRESHOLD,
        }
    }
}
