//! Numeric helpers shared across the pipeline.

pub mod optimization;
pub mod stats;

pub use optimization::{nelder_mead, NelderMeadConfig, NelderMeadResult};
pub use stats::{mean, quantile_normal, variance};
