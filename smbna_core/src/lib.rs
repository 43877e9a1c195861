// smbna_core/src/lib.rs

//! Multi-belief navigation core: recursive estimators, belief snapshots,
//! consistency invariants, trust arbitration and explicit refusal.
//!
//! The crate is pure computation. It never installs a logging subscriber and
//! never draws random numbers.

pub mod arbitration;
pub mod belief;
pub mod beliefs;
pub mod config;
pub mod error;
pub mod estimation;
pub mod field;
pub mod invariants;
pub mod messages;
pub mod models;
pub mod pipeline;
pub mod prelude;
pub mod refusal;
pub mod scoring;
pub mod state;
pub mod types;
pub mod utils;
