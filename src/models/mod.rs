//! SARIMA model: specification, fitting, persistence, and lifecycle.

mod diff;
mod manager;
mod sarima;
mod store;

pub use diff::{difference, integrate, seasonal_difference, seasonal_integrate};
pub use manager::{ModelManager, Resolution};
pub use sarima::{FittedSarima, RawForecast, Sarima, SarimaSpec};
pub use store::ModelStore;
