// smbna_core/src/models/mod.rs

//! Motion and sensor models consumed by the estimators.

pub mod estimation;
