//! # demandcast
//!
//! Seasonal demand forecasting pipeline for tabular time-series records.
//!
//! Takes raw (date, quantity, optional item label) tables through cleaning,
//! fixed-frequency resampling, stationarity diagnostics, SARIMA fitting with
//! a persisted model cache, interval forecasting, and derived analytics
//! (totals, growth rate, period rollups). Chart rendering and UI concerns
//! are left to the caller; this crate produces the numbers.

#![allow(clippy::needless_range_loop)]
#![allow(clippy::too_many_arguments)]

pub mod analytics;
pub mod core;
pub mod diagnostics;
pub mod error;
pub mod forecast;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod utils;

pub use error::{DemandError, Result};

pub mod prelude {
    pub use crate::analytics::{summarize, AnalyticsSummary};
    pub use crate::core::{ForecastResult, Series};
    pub use crate::diagnostics::{correlation_profile, test_series, StationarityReport, Verdict};
    pub use crate::error::{DemandError, Result};
    pub use crate::forecast::{forecast, write_csv};
    pub use crate::ingest::{resample, ColumnConfig, Period, RawTable, SanitizeOptions};
    pub use crate::models::{FittedSarima, ModelManager, ModelStore, Sarima, SarimaSpec};
    pub use crate::pipeline::{
        run_aggregate, run_per_entity, EntityOutcome, EntityReport, PipelineConfig,
        PipelineOutcome,
    };
}
