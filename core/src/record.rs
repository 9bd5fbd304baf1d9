//! Row types flowing between pipeline stages.

use crate::types::{EntityCode, MetricCode, Year};
use chrono::{DateTime, Utc};

/// One observation after normalization.
///
/// `period_year` and `value` stay optional until enrichment so that
/// validation sees missing data instead of the normalizer guessing.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRecord {
    pub entity_code:  EntityCode,
    pub entity_name:  String,
    pub metric_code:  MetricCode,
    pub metric_name:  String,
    pub period_year:  Option<Year>,
    pub value:        Option<f64>,
    pub extracted_at: DateTime<Utc>,
}

impl IndicatorRecord {
    /// Natural key used for deduplication. None when the year is missing.
    pub fn key(&self) -> (&str, &str, Option<Year>) {
        (&self.entity_code, &self.metric_code, self.period_year)
    }
}

/// A validated, deduplicated observation with derived fields.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub entity_code:   EntityCode,
    pub entity_name:   String,
    pub metric_code:   MetricCode,
    pub metric_name:   String,
    pub period_year:   Year,
    /// Rounded to two decimal places.
    pub value:         f64,
    pub extracted_at:  DateTime<Utc>,
    pub decade:        Year,
    pub period_bucket: Option<String>,
    pub region:        Option<String>,
}

/// Year truncated to the nearest lower multiple of ten.
pub fn decade_of(year: Year) -> Year {
    year.div_euclid(10) * 10
}

/// Round to two decimal places, ties away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
