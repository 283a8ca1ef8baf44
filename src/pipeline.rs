//! End-to-end orchestration: raw table in, forecasts and analytics out.
//!
//! Two flows mirror the two ways demand data is consumed. The aggregate
//! flow models total demand with a persisted year-keyed model cache; the
//! per-entity flow fits fresh models for each item label, gated on a
//! stationarity check, and runs entities in parallel.

use crate::analytics::{summarize, AnalyticsSummary};
use crate::core::{ForecastResult, Series};
use crate::diagnostics::{correlation_profile, test_series, CorrelationProfile, StationarityReport};
use crate::error::{DemandError, Result};
use crate::forecast::forecast;
use crate::ingest::{
    aggregate_series, entity_series, resample, sanitize_records, ColumnConfig, Period,
    QuantityPolicy, RawTable, SanitizeOptions,
};
use crate::models::{ModelManager, ModelStore, Resolution, Sarima, SarimaSpec};
use rayon::prelude::*;
use std::path::PathBuf;

/// Pipeline configuration. `Default` gives the aggregate flow's
/// conventions; [`PipelineConfig::per_entity_defaults`] gives the
/// per-entity ones.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub columns: ColumnConfig,
    pub sanitize: SanitizeOptions,
    pub period: Period,
    pub spec: SarimaSpec,
    pub horizon: usize,
    /// Two-sided interval level, e.g. 0.95.
    pub confidence_level: f64,
    /// Cache key override; defaults to the dominant calendar year.
    pub selection_key: Option<i32>,
    /// Fit on log1p-transformed quantities.
    pub log_transform: bool,
    /// Model cache directory for the aggregate flow.
    pub model_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            columns: ColumnConfig::default(),
            sanitize: SanitizeOptions::default(),
            period: Period::Monthly,
            // Non-seasonal baseline for monthly totals.
            spec: SarimaSpec::nonseasonal((1, 1, 1)),
            horizon: 12,
            confidence_level: 0.95,
            selection_key: None,
            log_transform: false,
            model_dir: PathBuf::from("models"),
        }
    }
}

impl PipelineConfig {
    /// Conventions for the per-entity flow: weekly cadence, a yearly
    /// seasonal structure, and zero-coercion so entity rows with junk
    /// quantity cells drop out instead of failing the batch.
    pub fn per_entity_defaults() -> Self {
        Self {
            sanitize: SanitizeOptions {
                quantity_policy: QuantityPolicy::CoerceZero,
                excluded_label_substring: None,
            },
            period: Period::Weekly,
            spec: SarimaSpec::with_yearly_cycle((1, 0, 1), (1, 0, 1), Period::Weekly),
            ..Self::default()
        }
    }
}

/// Everything the aggregate flow produces for rendering.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub series: Series,
    pub stationarity: StationarityReport,
    pub correlation: CorrelationProfile,
    pub forecast: ForecastResult,
    pub summary: AnalyticsSummary,
    /// Whether the model came from the cache or a fresh fit.
    pub cache_hit: bool,
}

/// Aggregate flow: clean, resample, diagnose, resolve a cached or fresh
/// model, forecast, summarize.
///
/// A non-stationary verdict does not stop this flow; the report is
/// surfaced so the caller can warn, and the configured differencing is
/// trusted to handle the trend.
pub fn run_aggregate(table: &RawTable, config: &PipelineConfig) -> Result<PipelineOutcome> {
    let records = sanitize_records(table, &config.columns, &config.sanitize)?;
    let series = resample(&aggregate_series(&records)?, config.period)?;
    tracing::info!(observations = series.len(), period = ?config.period, "aggregate series ready");

    let stationarity = test_series(&series)?;
    if !stationarity.is_stationary() {
        tracing::warn!(
            p_value = stationarity.p_value,
            "aggregate series looks non-stationary, relying on differencing"
        );
    }
    let correlation = correlation_profile(&series)?;

    let manager = {
        let store = ModelStore::new(&config.model_dir);
        if config.log_transform {
            ModelManager::new(store).with_log_transform()
        } else {
            ModelManager::new(store)
        }
    };
    let (model, resolution) =
        manager.resolve(&series, &config.spec, config.period, config.selection_key)?;

    let forecast = forecast(&model, config.horizon, config.confidence_level)?;
    let summary = summarize(&forecast);

    Ok(PipelineOutcome {
        series,
        stationarity,
        correlation,
        forecast,
        summary,
        cache_hit: resolution == Resolution::CacheHit,
    })
}

/// Why an entity did or did not get a forecast.
#[derive(Debug, Clone)]
pub enum EntityOutcome {
    Forecasted {
        stationarity: StationarityReport,
        forecast: ForecastResult,
        summary: AnalyticsSummary,
    },
    /// Failed the stationarity gate; use [`forecast_entity`] to override.
    NonStationary { stationarity: StationarityReport },
    /// Too short for the stationarity test.
    InsufficientData { needed: usize, got: usize },
    FitFailed { error: DemandError },
}

/// One entity's result. Reports come back in label order, except when
/// `run_per_entity` is given `top_n`: then they are ordered by total
/// quantity, largest first.
#[derive(Debug, Clone)]
pub struct EntityReport {
    pub entity: String,
    pub series: Series,
    pub outcome: EntityOutcome,
}

/// Per-entity flow: split the table by entity label, optionally keep only
/// the `top_n` entities by total quantity, then diagnose and forecast each
/// in parallel.
///
/// Entities are never fatal to each other: a short or non-stationary or
/// unfittable entity yields its own [`EntityOutcome`] while the rest
/// proceed. Models are fit fresh here, not cached; entity sets churn too
/// much for year-keyed artifacts to be worth invalidating.
pub fn run_per_entity(
    table: &RawTable,
    config: &PipelineConfig,
    top_n: Option<usize>,
) -> Result<Vec<EntityReport>> {
    let records = sanitize_records(table, &config.columns, &config.sanitize)?;
    let mut all = entity_series(&records)?;

    if let Some(n) = top_n {
        all.sort_by(|a, b| {
            b.total()
                .partial_cmp(&a.total())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        all.truncate(n);
    }
    tracing::info!(entities = all.len(), "per-entity forecasting starting");

    let reports = all
        .into_par_iter()
        .map(|raw| forecast_one(raw, config))
        .collect::<Result<Vec<_>>>()?;
    Ok(reports)
}

fn forecast_one(raw: Series, config: &PipelineConfig) -> Result<EntityReport> {
    let entity = raw.entity().unwrap_or("(unnamed)").to_string();
    let series = resample(&raw, config.period)?;

    let stationarity = match test_series(&series) {
        Ok(report) => report,
        Err(DemandError::InsufficientData { needed, got }) => {
            tracing::debug!(entity = %entity, got, "entity too short, skipping");
            return Ok(EntityReport {
                entity,
                series,
                outcome: EntityOutcome::InsufficientData { needed, got },
            });
        }
        Err(e) => return Err(e),
    };

    if !stationarity.is_stationary() {
        tracing::debug!(entity = %entity, p_value = stationarity.p_value, "entity gated out");
        return Ok(EntityReport {
            entity,
            series,
            outcome: EntityOutcome::NonStationary { stationarity },
        });
    }

    let outcome = match fit_and_forecast(&series, config) {
        Ok((forecast, summary)) => EntityOutcome::Forecasted {
            stationarity,
            forecast,
            summary,
        },
        Err(error) => {
            tracing::warn!(entity = %entity, error = %error, "entity fit failed");
            EntityOutcome::FitFailed { error }
        }
    };
    Ok(EntityReport {
        entity,
        series,
        outcome,
    })
}

/// Forecast a single entity regardless of its stationarity verdict. The
/// manual override for series an analyst still wants numbers for.
pub fn forecast_entity(series: &Series, config: &PipelineConfig) -> Result<EntityReport> {
    let entity = series.entity().unwrap_or("(unnamed)").to_string();
    let series = resample(series, config.period)?;
    let stationarity = test_series(&series)?;
    let (forecast, summary) = fit_and_forecast(&series, config)?;
    Ok(EntityReport {
        entity,
        series,
        outcome: EntityOutcome::Forecasted {
            stationarity,
            forecast,
            summary,
        },
    })
}

fn fit_and_forecast(
    series: &Series,
    config: &PipelineConfig,
) -> Result<(ForecastResult, AnalyticsSummary)> {
    let fitted = Sarima::new(config.spec).fit(series, config.period, config.log_transform)?;
    let result = forecast(&fitted, config.horizon, config.confidence_level)?;
    let summary = summarize(&result);
    Ok((result, summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: Vec<(&str, &str, &str)>) -> RawTable {
        RawTable::new(
            vec!["Date".into(), "Amount".into(), "Item Name".into()],
            rows.into_iter()
                .map(|(d, a, n)| vec![d.to_string(), a.to_string(), n.to_string()])
                .collect(),
        )
    }

    fn monthly_rows(n: usize, base: i64, step: i64) -> Vec<(String, String, String)> {
        (0..n)
            .map(|i| {
                let year = 2023 + i / 12;
                let month = i % 12 + 1;
                (
                    format!("{year}-{month:02}-15"),
                    (base + step * i as i64).to_string(),
                    "Widget".to_string(),
                )
            })
            .collect()
    }

    fn table_owned(rows: Vec<(String, String, String)>) -> RawTable {
        RawTable::new(
            vec!["Date".into(), "Amount".into(), "Item Name".into()],
            rows.into_iter().map(|(d, a, n)| vec![d, a, n]).collect(),
        )
    }

    #[test]
    fn aggregate_flow_produces_a_full_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            model_dir: dir.path().to_path_buf(),
            horizon: 6,
            ..PipelineConfig::default()
        };
        let outcome = run_aggregate(&table_owned(monthly_rows(24, 100, 10)), &config).unwrap();

        assert_eq!(outcome.series.len(), 24);
        assert_eq!(outcome.forecast.horizon(), 6);
        assert!(!outcome.cache_hit);
        assert!(outcome.summary.total > 0.0);

        // Second run reuses the persisted model.
        let again = run_aggregate(&table_owned(monthly_rows(24, 100, 10)), &config).unwrap();
        assert!(again.cache_hit);
    }

    #[test]
    fn per_entity_flow_separates_outcomes() {
        // "Widget" has two years of steady weekly-ish sales; "Rare" has
        // three rows, far below the diagnostic minimum.
        let mut rows: Vec<(String, String, String)> = (0..104)
            .map(|i| {
                let day = (i % 28) + 1;
                let month = (i / 9) % 12 + 1;
                let year = 2023 + (i / 108);
                (
                    format!("{year}-{month:02}-{day:02}"),
                    format!("{}", 20 + (i * 7) % 13),
                    "Widget".to_string(),
                )
            })
            .collect();
        rows.push(("2023-05-01".into(), "3".into(), "Rare".into()));
        rows.push(("2023-06-01".into(), "4".into(), "Rare".into()));
        rows.push(("2023-07-01".into(), "5".into(), "Rare".into()));

        let config = PipelineConfig {
            spec: SarimaSpec::nonseasonal((1, 0, 1)),
            horizon: 8,
            ..PipelineConfig::per_entity_defaults()
        };
        let reports = run_per_entity(&table_owned(rows), &config, None).unwrap();
        assert_eq!(reports.len(), 2);

        let rare = reports.iter().find(|r| r.entity == "rare").unwrap();
        assert!(matches!(
            rare.outcome,
            EntityOutcome::InsufficientData { .. } | EntityOutcome::NonStationary { .. }
        ));
    }

    #[test]
    fn top_n_keeps_largest_entities() {
        let rows = vec![
            ("2023-01-01", "500", "Big"),
            ("2023-02-01", "500", "Big"),
            ("2023-01-01", "90", "Mid"),
            ("2023-02-01", "90", "Mid"),
            ("2023-01-01", "1", "Small"),
            ("2023-02-01", "1", "Small"),
        ];
        let config = PipelineConfig::per_entity_defaults();
        let reports = run_per_entity(&table(rows.clone()), &config, Some(2)).unwrap();
        assert_eq!(reports.len(), 2);
        // Ranked by total quantity, largest first.
        assert_eq!(reports[0].entity, "big");
        assert_eq!(reports[1].entity, "mid");

        // Without top_n, reports come back in label order.
        let all = run_per_entity(&table(rows), &config, None).unwrap();
        let labels: Vec<&str> = all.iter().map(|r| r.entity.as_str()).collect();
        assert_eq!(labels, ["big", "mid", "small"]);
    }

    #[test]
    fn missing_column_fails_fast() {
        let bad = RawTable::new(
            vec!["When".into(), "Amount".into()],
            vec![vec!["2023-01-01".into(), "5".into()]],
        );
        let config = PipelineConfig::default();
        assert!(matches!(
            run_aggregate(&bad, &config),
            Err(DemandError::MissingColumn(c)) if c == "Date"
        ));
    }

    #[test]
    fn short_aggregate_series_reports_insufficient_data() {
        let config = PipelineConfig {
            model_dir: tempfile::tempdir().unwrap().path().to_path_buf(),
            ..PipelineConfig::default()
        };
        let result = run_aggregate(&table_owned(monthly_rows(10, 50, 5)), &config);
        assert!(matches!(
            result,
            Err(DemandError::InsufficientData { needed: 11, got: 10 })
        ));
    }
}
