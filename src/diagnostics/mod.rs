//! Diagnostics that gate and guide model selection.

mod correlation;
mod stationarity;

pub use correlation::{correlation_profile, CorrelationProfile};
pub use stationarity::{test_series, CriticalValues, StationarityReport, Verdict, MIN_OBSERVATIONS};
