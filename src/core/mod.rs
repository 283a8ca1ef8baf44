//! Core data structures for the forecasting pipeline.

mod forecast;
mod series;

pub use forecast::ForecastResult;
pub use series::Series;
