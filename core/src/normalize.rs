//! Raw observation → IndicatorRecord.

use crate::{extract::RawObservation, record::IndicatorRecord};
use chrono::{DateTime, Utc};

/// Convert raw observations into typed records, dropping null values.
///
/// Unparseable values are dropped with a warning. An unparseable date
/// becomes `period_year = None` and is rejected later by validation.
pub fn normalize(raw: &[RawObservation], extracted_at: DateTime<Utc>) -> Vec<IndicatorRecord> {
    raw.iter()
        .filter_map(|obs| {
            let value = match parse_value(obs.value.as_ref()) {
                Ok(Some(v)) => v,
                Ok(None) => return None,
                Err(bad) => {
                    log::warn!(
                        "Dropping {}/{} {}: unparseable value {bad}",
                        entity_code(obs),
                        obs.indicator.id,
                        obs.date
                    );
                    return None;
                }
            };
            Some(IndicatorRecord {
                entity_code: entity_code(obs).to_string(),
                entity_name: obs.country.value.clone(),
                metric_code: obs.indicator.id.clone(),
                metric_name: obs.indicator.value.clone(),
                period_year: obs.date.trim().parse().ok(),
                value: Some(value),
                extracted_at,
            })
        })
        .collect()
}

/// Prefer the ISO3 code the pipeline is configured with.
fn entity_code(obs: &RawObservation) -> &str {
    obs.country_iso3
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(obs.country.id.as_str())
}

/// `Ok(None)` for null, `Err(raw)` for anything that is not a finite number.
fn parse_value(value: Option<&serde_json::Value>) -> Result<Option<f64>, String> {
    let parsed = match value {
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(value.map(|v| v.to_string()).unwrap_or_default()),
    }
}
