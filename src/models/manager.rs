//! Cache-aware model resolution: load a persisted artifact when one
//! exists for the selection key, otherwise fit and persist.

use crate::core::Series;
use crate::error::{DemandError, Result};
use crate::ingest::Period;
use crate::models::sarima::{FittedSarima, Sarima, SarimaSpec};
use crate::models::store::ModelStore;

/// Outcome of a resolution, for callers that report cache behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    CacheHit,
    Fitted,
}

#[derive(Debug, Clone)]
pub struct ModelManager {
    store: ModelStore,
    log_transform: bool,
}

impl ModelManager {
    pub fn new(store: ModelStore) -> Self {
        Self {
            store,
            log_transform: false,
        }
    }

    /// Fit on log1p-transformed quantities; resolved artifacts carry the
    /// tag so forecasts invert the transform.
    pub fn with_log_transform(mut self) -> Self {
        self.log_transform = true;
        self
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    /// Resolve a model for `series`: reuse the cached artifact for the
    /// selection key when one loads cleanly, otherwise fit a fresh one
    /// and persist it. The key defaults to the dominant calendar year of
    /// the series.
    ///
    /// A cached artifact is returned as-is even when its structure
    /// differs from `spec`; the mismatch is logged but not rejected, so
    /// a stale cache can serve an older structure until invalidated.
    pub fn resolve(
        &self,
        series: &Series,
        spec: &SarimaSpec,
        period: Period,
        selection_key: Option<i32>,
    ) -> Result<(FittedSarima, Resolution)> {
        let key = match selection_key.or_else(|| series.dominant_year()) {
            Some(key) => key,
            None => {
                return Err(DemandError::Validation(
                    "cannot derive a selection key from an empty series".to_string(),
                ))
            }
        };

        match self.store.load(key) {
            Ok(Some(cached)) => {
                if cached.spec() != *spec {
                    tracing::info!(
                        key,
                        cached_spec = %cached.spec(),
                        requested_spec = %spec,
                        "serving cached model with a different structure"
                    );
                } else {
                    tracing::debug!(key, spec = %spec, "model cache hit");
                }
                return Ok((cached, Resolution::CacheHit));
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(key, error = %e, "unreadable cached model, refitting");
            }
        }

        let fitted = self.fit(series, spec, period, key)?;
        if let Err(e) = self.store.save(key, &fitted) {
            // The fit is still good; persistence is best effort.
            tracing::warn!(key, error = %e, "failed to persist fitted model");
        }
        Ok((fitted, Resolution::Fitted))
    }

    fn fit(
        &self,
        series: &Series,
        spec: &SarimaSpec,
        period: Period,
        key: i32,
    ) -> Result<FittedSarima> {
        tracing::info!(key, spec = %spec, log_space = self.log_transform, "fitting model");
        Sarima::new(*spec)
            .fit(series, period, self.log_transform)
            .map_err(|e| match e {
                DemandError::InsufficientData { .. } => e,
                other => DemandError::ModelFit {
                    context: series.entity().unwrap_or("aggregate").to_string(),
                    selection_key: key,
                    spec: spec.to_string(),
                    reason: other.to_string(),
                },
            })
    }
}
