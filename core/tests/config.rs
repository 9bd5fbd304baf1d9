//! Configuration tests.

use indicator_etl_core::config::{EtlConfig, PeriodBucket, GDP_METRIC};

fn shipped_config_path() -> String {
    format!("{}/../data/etl_config.json", env!("CARGO_MANIFEST_DIR"))
}

/// The shipped JSON file and the built-in defaults describe the same run.
#[test]
fn shipped_config_matches_builtin() {
    let loaded = EtlConfig::load(&shipped_config_path()).expect("load shipped config");
    let builtin = EtlConfig::world_bank();

    assert_eq!(loaded.entities, builtin.entities);
    assert_eq!(loaded.metrics, builtin.metrics);
    assert_eq!(loaded.regions, builtin.regions);
    assert_eq!(loaded.year_floor, 2000);
    assert_eq!(loaded.period_buckets, builtin.period_buckets);
    assert_eq!(loaded.summary_metrics, builtin.summary_metrics);
    assert_eq!(loaded.extraction, builtin.extraction);
}

#[test]
fn builtin_defaults() {
    let config = EtlConfig::world_bank();

    assert_eq!(config.entities.len(), 7);
    assert_eq!(config.metrics.len(), 8);
    assert_eq!(config.extraction.timeout_secs, 10);
    assert_eq!(config.extraction.request_delay_ms, 500);
    assert_eq!((config.extraction.start_year, config.extraction.end_year), (2010, 2023));
    assert_eq!(config.entity_name("DEU"), Some("Germany"));
    assert_eq!(config.metric_name(GDP_METRIC), Some("GDP (current US$)"));
    assert_eq!(config.region_for("BRA"), Some("South America"));
    assert_eq!(config.region_for("FRA"), None);
    config.validate().expect("defaults are valid");
}

#[test]
fn missing_file_is_reported() {
    let err = EtlConfig::load("/nonexistent/etl_config.json").unwrap_err();
    assert!(err.to_string().contains("Cannot read"), "{err}");
}

#[test]
fn validate_rejects_inverted_year_range() {
    let mut config = EtlConfig::world_bank();
    config.extraction.start_year = 2024;
    config.extraction.end_year = 2010;

    assert!(config.validate().is_err());
}

#[test]
fn validate_rejects_overlapping_buckets() {
    let mut config = EtlConfig::world_bank();
    config.period_buckets.push(PeriodBucket { label: "late".into(), start: 2022, end: 2030 });

    assert!(config.validate().is_err());
}

#[test]
fn period_bucket_boundaries() {
    let config = EtlConfig::world_bank();

    assert_eq!(config.period_bucket_for(1999), None);
    assert_eq!(config.period_bucket_for(2000), Some("2000s"));
    assert_eq!(config.period_bucket_for(2010), Some("2010-2015"));
    assert_eq!(config.period_bucket_for(2019), Some("2015-2020"));
    assert_eq!(config.period_bucket_for(2025), Some("2020s"));
    assert_eq!(config.period_bucket_for(2026), None);
}

#[test]
fn no_buckets_means_unclassified() {
    let mut config = EtlConfig::world_bank();
    config.period_buckets.clear();

    assert_eq!(config.period_bucket_for(2015), None);
}
