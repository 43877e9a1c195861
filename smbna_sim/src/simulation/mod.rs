// smbna_sim/src/simulation/mod.rs

pub mod config;
pub mod environment;
pub mod metrics;
pub mod monte_carlo;
pub mod prng;
pub mod runner;
pub mod spoofing;
