//! Quantity series indexed by timestamp.

use crate::error::{DemandError, Result};
use chrono::{DateTime, Datelike, Utc};
use std::collections::BTreeMap;

/// An ordered demand series: strictly increasing timestamps with one
/// non-negative quantity each, optionally tagged with the entity (item)
/// it belongs to.
///
/// Immutable once constructed; every pipeline stage that changes the data
/// produces a new `Series`.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    timestamps: Vec<DateTime<Utc>>,
    quantities: Vec<f64>,
    entity: Option<String>,
}

impl Series {
    /// Create a series, validating the ordering invariant.
    pub fn new(timestamps: Vec<DateTime<Utc>>, quantities: Vec<f64>) -> Result<Self> {
        if timestamps.len() != quantities.len() {
            return Err(DemandError::DimensionMismatch {
                expected: timestamps.len(),
                got: quantities.len(),
            });
        }
        for pair in timestamps.windows(2) {
            if pair[1] <= pair[0] {
                return Err(DemandError::Timestamp(
                    "timestamps must be strictly increasing".to_string(),
                ));
            }
        }
        if quantities.iter().any(|q| !q.is_finite() || *q < 0.0) {
            return Err(DemandError::Validation(
                "quantities must be finite and non-negative".to_string(),
            ));
        }
        Ok(Self {
            timestamps,
            quantities,
            entity: None,
        })
    }

    /// Create a series tagged with an entity label.
    pub fn with_entity(
        timestamps: Vec<DateTime<Utc>>,
        quantities: Vec<f64>,
        entity: impl Into<String>,
    ) -> Result<Self> {
        let mut series = Self::new(timestamps, quantities)?;
        series.entity = Some(entity.into());
        Ok(series)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn quantities(&self) -> &[f64] {
        &self.quantities
    }

    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.last().copied()
    }

    /// The modal calendar year of the series' timestamps, used as the
    /// default model selection key. Ties resolve to the smallest year.
    pub fn dominant_year(&self) -> Option<i32> {
        if self.is_empty() {
            return None;
        }
        let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
        for ts in &self.timestamps {
            *counts.entry(ts.year()).or_insert(0) += 1;
        }
        let mut best: Option<(i32, usize)> = None;
        for (year, count) in counts {
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((year, count)),
            }
        }
        best.map(|(year, _)| year)
    }

    /// Quantities under the log1p variance-stabilizing transform.
    pub fn log1p_quantities(&self) -> Vec<f64> {
        self.quantities.iter().map(|q| q.ln_1p()).collect()
    }

    /// Total quantity across the series.
    pub fn total(&self) -> f64 {
        self.quantities.iter().sum()
    }
}
