//! Derived views over a clean dataset.
//!
//! Pure functions of their input. Output is ordered by entity, metric,
//! then year or decade.

use crate::{
    record::EnrichedRecord,
    types::{EntityCode, MetricCode, Year},
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct LatestValue {
    pub entity_code: EntityCode,
    pub metric_code: MetricCode,
    pub year:        Year,
    pub value:       f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct YoyChange {
    pub entity_code: EntityCode,
    pub metric_code: MetricCode,
    pub year:        Year,
    pub value:       f64,
    /// Percent change against the previous present year.
    pub pct_change:  f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecadeAverage {
    pub entity_code: EntityCode,
    pub metric_code: MetricCode,
    pub decade:      Year,
    pub mean_value:  f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateViews {
    pub latest:          Vec<LatestValue>,
    pub yoy:             Vec<YoyChange>,
    pub decade_averages: Vec<DecadeAverage>,
}

/// Rows of one (entity, metric) pair, stably sorted by year ascending.
fn series(rows: &[EnrichedRecord]) -> BTreeMap<(&str, &str), Vec<&EnrichedRecord>> {
    let mut groups: BTreeMap<(&str, &str), Vec<&EnrichedRecord>> = BTreeMap::new();
    for row in rows {
        groups
            .entry((row.entity_code.as_str(), row.metric_code.as_str()))
            .or_default()
            .push(row);
    }
    for group in groups.values_mut() {
        // sort_by_key is stable: equal years keep input order.
        group.sort_by_key(|r| r.period_year);
    }
    groups
}

pub fn aggregate(rows: &[EnrichedRecord]) -> AggregateViews {
    let groups = series(rows);
    AggregateViews {
        latest: latest_values(&groups),
        yoy: yoy_changes(&groups),
        decade_averages: decade_averages(rows),
    }
}

fn latest_values(groups: &BTreeMap<(&str, &str), Vec<&EnrichedRecord>>) -> Vec<LatestValue> {
    groups
        .values()
        .filter_map(|group| group.last())
        .map(|r| LatestValue {
            entity_code: r.entity_code.clone(),
            metric_code: r.metric_code.clone(),
            year: r.period_year,
            value: r.value,
        })
        .collect()
}

fn yoy_changes(groups: &BTreeMap<(&str, &str), Vec<&EnrichedRecord>>) -> Vec<YoyChange> {
    let mut out = Vec::new();
    for group in groups.values() {
        for pair in group.windows(2) {
            let (prev, cur) = (pair[0], pair[1]);
            if prev.value == 0.0 {
                log::debug!(
                    "{}/{} {}: previous value is zero, change undefined",
                    cur.entity_code,
                    cur.metric_code,
                    cur.period_year
                );
                continue;
            }
            out.push(YoyChange {
                entity_code: cur.entity_code.clone(),
                metric_code: cur.metric_code.clone(),
                year: cur.period_year,
                value: cur.value,
                pct_change: (cur.value - prev.value) / prev.value * 100.0,
            });
        }
    }
    out
}

fn decade_averages(rows: &[EnrichedRecord]) -> Vec<DecadeAverage> {
    let mut sums: BTreeMap<(&str, &str, Year), (f64, usize)> = BTreeMap::new();
    for row in rows {
        let acc = sums
            .entry((row.entity_code.as_str(), row.metric_code.as_str(), row.decade))
            .or_insert((0.0, 0));
        acc.0 += row.value;
        acc.1 += 1;
    }
    sums.into_iter()
        .map(|((entity, metric, decade), (sum, count))| DecadeAverage {
            entity_code: entity.to_string(),
            metric_code: metric.to_string(),
            decade,
            mean_value: sum / count as f64,
        })
        .collect()
}
