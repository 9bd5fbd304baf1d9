//! Deduplication, validation and derived fields.

use crate::{
    config::EtlConfig,
    error::{EtlError, EtlResult},
    record::{decade_of, round2, EnrichedRecord, IndicatorRecord},
};
use std::collections::HashSet;

/// Clean a batch of normalized records.
///
/// Steps, in order: drop duplicate (entity, metric, year) keys keeping the
/// first occurrence, drop missing values, validate, derive decade / period
/// bucket / region, round values to two decimals.
///
/// Any row with an empty entity code, a missing year or a year below
/// `config.year_floor` fails the whole batch; nothing is returned.
pub fn enrich(records: Vec<IndicatorRecord>, config: &EtlConfig) -> EtlResult<Vec<EnrichedRecord>> {
    log::info!("Starting transformation of {} records", records.len());

    let initial = records.len();
    let deduped = dedupe(records);
    log::info!("Removed {} duplicates", initial - deduped.len());

    let before_drop = deduped.len();
    let present: Vec<IndicatorRecord> =
        deduped.into_iter().filter(|r| r.value.is_some()).collect();
    if present.len() < before_drop {
        log::info!("Dropped {} rows with missing values", before_drop - present.len());
    }

    validate(&present, config)?;

    let mut unclassified = 0usize;
    let enriched: Vec<EnrichedRecord> = present
        .into_iter()
        .filter_map(|r| {
            // validate() guarantees both are present.
            let year = r.period_year?;
            let value = r.value?;
            let period_bucket = config.period_bucket_for(year).map(str::to_string);
            if period_bucket.is_none() {
                unclassified += 1;
            }
            let region = config.region_for(&r.entity_code).map(str::to_string);
            Some(EnrichedRecord {
                decade: decade_of(year),
                period_bucket,
                region,
                value: round2(value),
                period_year: year,
                entity_code: r.entity_code,
                entity_name: r.entity_name,
                metric_code: r.metric_code,
                metric_name: r.metric_name,
                extracted_at: r.extracted_at,
            })
        })
        .collect();

    if unclassified > 0 {
        log::debug!("{unclassified} rows fall outside every period bucket");
    }
    log::info!("Transformation complete. Final records: {}", enriched.len());
    Ok(enriched)
}

fn dedupe(records: Vec<IndicatorRecord>) -> Vec<IndicatorRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| {
            seen.insert((r.entity_code.clone(), r.metric_code.clone(), r.period_year))
        })
        .collect()
}

fn validate(records: &[IndicatorRecord], config: &EtlConfig) -> EtlResult<()> {
    if let Some(r) = records.iter().find(|r| r.entity_code.trim().is_empty()) {
        return Err(fail(format!(
            "null entity code found ({} {:?})",
            r.metric_code, r.period_year
        )));
    }
    if let Some(r) = records.iter().find(|r| r.period_year.is_none()) {
        return Err(fail(format!("null year found for {}/{}", r.entity_code, r.metric_code)));
    }
    if let Some(r) = records
        .iter()
        .find(|r| r.period_year.is_some_and(|y| y < config.year_floor))
    {
        return Err(fail(format!(
            "invalid year {:?} for {}/{} (floor {})",
            r.period_year, r.entity_code, r.metric_code, config.year_floor
        )));
    }
    Ok(())
}

fn fail(reason: String) -> EtlError {
    log::error!("Data quality check failed: {reason}");
    EtlError::validation(reason)
}
