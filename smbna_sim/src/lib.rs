// smbna_sim/src/lib.rs

//! Closed-loop simulation harness around `smbna_core`: ground truth, noisy
//! and spoofed sensors, the baseline and multi-belief estimator stacks, and
//! Monte Carlo evaluation.

// This prelude is for convenience for other files WITHIN the smbna_sim crate.
pub mod prelude;

pub mod cli;
pub mod simulation;
