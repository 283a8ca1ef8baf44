//! Series sanitization: quantity cleaning, date parsing, label
//! normalization, and deduplication.

use crate::core::Series;
use crate::error::{DemandError, Result};
use crate::ingest::table::{ColumnConfig, RawTable};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::collections::BTreeMap;
use tracing::debug;

/// What to do with a quantity cell that has no digits left after cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityPolicy {
    /// Coerce to zero. Used by per-entity flows; the zero is then removed
    /// by the non-positive filter, so the row never reaches modeling.
    CoerceZero,
    /// Drop the row entirely. Used by aggregate flows.
    DropRow,
}

/// Sanitizer configuration.
#[derive(Debug, Clone)]
pub struct SanitizeOptions {
    pub quantity_policy: QuantityPolicy,
    /// Rows whose normalized entity label contains this substring are
    /// dropped. A data-quality filter for known junk labels (the reference
    /// data mixed service jobs into the product table), not a business rule.
    pub excluded_label_substring: Option<String>,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self {
            quantity_policy: QuantityPolicy::DropRow,
            excluded_label_substring: None,
        }
    }
}

/// One cleaned row: typed timestamp, positive quantity, normalized label.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanRecord {
    pub timestamp: DateTime<Utc>,
    pub quantity: f64,
    pub entity: Option<String>,
}

/// Clean a raw table into typed records.
///
/// Steps, in order: entity label normalization and exclusion filtering,
/// quantity digit-stripping and parsing (per policy), date parsing (bad
/// dates always drop the row), non-positive quantity filtering, and a
/// stable sort by timestamp. Duplicate timestamps survive here; the
/// series constructors below resolve them per flow.
///
/// Fails with `MissingColumn` when the date or quantity column is absent,
/// or when the entity column is absent while an exclusion filter needs it.
pub fn sanitize_records(
    table: &RawTable,
    columns: &ColumnConfig,
    options: &SanitizeOptions,
) -> Result<Vec<CleanRecord>> {
    let date_col = table.column_index(&columns.date)?;
    let quantity_col = table.column_index(&columns.quantity)?;
    let entity_col = table.column_index(&columns.entity).ok();
    if entity_col.is_none() && options.excluded_label_substring.is_some() {
        return Err(DemandError::MissingColumn(columns.entity.clone()));
    }

    let mut records = Vec::with_capacity(table.len());
    let mut dropped = 0usize;

    for row in 0..table.len() {
        let entity = entity_col.map(|col| normalize_label(table.cell(row, col)));
        if let (Some(label), Some(excluded)) = (&entity, &options.excluded_label_substring) {
            if label.contains(excluded.as_str()) {
                dropped += 1;
                continue;
            }
        }

        let quantity = match parse_quantity(table.cell(row, quantity_col)) {
            Some(q) => q,
            None => match options.quantity_policy {
                QuantityPolicy::CoerceZero => 0.0,
                QuantityPolicy::DropRow => {
                    dropped += 1;
                    continue;
                }
            },
        };

        let timestamp = match parse_date(table.cell(row, date_col)) {
            Some(ts) => ts,
            None => {
                dropped += 1;
                continue;
            }
        };

        // Zero or negative demand is absence of signal, not an observation.
        if quantity <= 0.0 {
            dropped += 1;
            continue;
        }

        records.push(CleanRecord {
            timestamp,
            quantity,
            entity,
        });
    }

    records.sort_by_key(|r| r.timestamp);
    if dropped > 0 {
        debug!(dropped, kept = records.len(), "sanitizer dropped rows");
    }
    Ok(records)
}

/// Build one series over all records, resolving duplicate timestamps by
/// keeping the last occurrence (keep-last on duplicate key).
pub fn aggregate_series(records: &[CleanRecord]) -> Result<Series> {
    let mut by_timestamp: BTreeMap<DateTime<Utc>, f64> = BTreeMap::new();
    for record in records {
        by_timestamp.insert(record.timestamp, record.quantity);
    }
    let (timestamps, quantities) = by_timestamp.into_iter().unzip();
    Series::new(timestamps, quantities)
}

/// Build one series per entity label, summing duplicate timestamps within
/// an entity (multiple same-day transactions are all real demand).
/// Records without a label are skipped. Output is ordered by label.
pub fn entity_series(records: &[CleanRecord]) -> Result<Vec<Series>> {
    let mut by_entity: BTreeMap<&str, BTreeMap<DateTime<Utc>, f64>> = BTreeMap::new();
    for record in records {
        if let Some(entity) = record.entity.as_deref() {
            *by_entity
                .entry(entity)
                .or_default()
                .entry(record.timestamp)
                .or_insert(0.0) += record.quantity;
        }
    }
    by_entity
        .into_iter()
        .map(|(entity, points)| {
            let (timestamps, quantities) = points.into_iter().unzip();
            Series::with_entity(timestamps, quantities, entity)
        })
        .collect()
}

/// Trim, lowercase, and collapse internal whitespace runs.
fn normalize_label(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strip every non-digit character, then parse what remains as an integer
/// quantity. Returns `None` when no digits remain.
fn parse_quantity(raw: &str) -> Option<f64> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u64>().ok().map(|v| v as f64)
}

/// Parse a date-like cell into a UTC timestamp. Accepts the formats the
/// reference data used; anything unparseable drops the row.
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }
    for format in ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
        }
    }
    None
}
