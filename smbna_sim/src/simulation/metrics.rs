// smbna_sim/src/simulation/metrics.rs

use std::fmt;

/// Summary statistics of a series, computed over its finite entries only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStats {
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    pub max: f64,
    pub median: f64,
    /// How many entries were finite and entered the statistics.
    pub count_valid: usize,
}

/// Statistics that skip NaN and infinite entries (dropout steps report NaN
/// innovations). Returns `None` if nothing finite remains.
pub fn nan_safe_stats(values: impl IntoIterator<Item = f64>) -> Option<SeriesStats> {
    let mut valid: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
    if valid.is_empty() {
        return None;
    }
    valid.sort_by(f64::total_cmp);

    let n = valid.len();
    let mean = valid.iter().sum::<f64>() / n as f64;
    let variance = valid.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    let median = if n % 2 == 1 {
        valid[n / 2]
    } else {
        0.5 * (valid[n / 2 - 1] + valid[n / 2])
    };

    Some(SeriesStats {
        mean,
        std: variance.sqrt(),
        max: valid[n - 1],
        median,
        count_valid: n,
    })
}

impl fmt::Display for SeriesStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mean {:.3}, std {:.3}, median {:.3}, max {:.3} (n = {})",
            self.mean, self.std, self.median, self.max, self.count_valid
        )
    }
}
