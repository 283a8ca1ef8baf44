//! Raw table ingestion: schema checking, sanitization, and resampling.

mod resample;
mod sanitize;
mod table;

pub use resample::{resample, Period};
pub use sanitize::{
    aggregate_series, entity_series, sanitize_records, CleanRecord, QuantityPolicy,
    SanitizeOptions,
};
pub use table::{ColumnConfig, RawTable};
