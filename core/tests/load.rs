//! Upsert loader tests, mostly against an in-memory store.

use chrono::{TimeZone, Utc};
use indicator_etl_core::{
    aggregate::{aggregate, LatestValue},
    config::{EtlConfig, GDP_GROWTH_METRIC, GDP_METRIC, POPULATION_METRIC},
    enrich::enrich,
    error::EtlError,
    record::{EnrichedRecord, IndicatorRecord},
    store::{
        IndicatorStore, TABLE_DECADE, TABLE_INDICATORS, TABLE_LATEST, TABLE_SUMMARY, TABLE_YOY,
    },
};
use std::path::PathBuf;

fn store() -> IndicatorStore {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = IndicatorStore::in_memory().expect("in-memory store");
    store.create_tables().expect("create tables");
    store
}

/// A database file in the temp dir, removed on drop.
struct TempDb(PathBuf);

impl TempDb {
    fn new() -> Self {
        TempDb(std::env::temp_dir().join(format!("etl-load-{}.db", uuid::Uuid::new_v4())))
    }

    fn path(&self) -> &str {
        self.0.to_str().expect("utf-8 temp path")
    }

    /// Second connection for schema tweaks the store does not expose.
    fn raw(&self) -> rusqlite::Connection {
        rusqlite::Connection::open(&self.0).expect("open raw connection")
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", self.0.display()));
        }
    }
}

fn record(entity: &str, metric: &str, year: i32, value: f64) -> IndicatorRecord {
    IndicatorRecord {
        entity_code: entity.to_string(),
        entity_name: format!("{entity} name"),
        metric_code: metric.to_string(),
        metric_name: format!("{metric} name"),
        period_year: Some(year),
        value: Some(value),
        extracted_at: Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap(),
    }
}

fn sample_batch(config: &EtlConfig) -> Vec<EnrichedRecord> {
    let rows = vec![
        record("IND", GDP_METRIC, 2019, 2.83e12),
        record("IND", GDP_METRIC, 2020, 2.66e12),
        record("IND", GDP_METRIC, 2021, 3.17e12),
        record("IND", POPULATION_METRIC, 2020, 1.396e9),
        record("IND", POPULATION_METRIC, 2021, 1.407e9),
        record("IND", GDP_GROWTH_METRIC, 2019, 3.87),
        record("IND", GDP_GROWTH_METRIC, 2020, -5.83),
        record("IND", GDP_GROWTH_METRIC, 2021, 9.05),
        record("USA", GDP_METRIC, 2021, 2.33e13),
    ];
    enrich(rows, config).expect("enrich")
}

fn load(store: &IndicatorStore, config: &EtlConfig, batch: &[EnrichedRecord]) {
    let views = aggregate(batch);
    store.upsert_indicators(batch).expect("main table");
    store.load_aggregations(&views).expect("aggregations");
    store
        .refresh_entity_summary(&config.summary_metrics)
        .expect("summary");
}

fn counts(store: &IndicatorStore) -> Vec<i64> {
    [TABLE_INDICATORS, TABLE_LATEST, TABLE_YOY, TABLE_DECADE, TABLE_SUMMARY]
        .iter()
        .map(|t| store.row_count(t).expect("count"))
        .collect()
}

/// Loading the same batch twice adds no rows and changes no values.
#[test]
fn loading_twice_is_idempotent() {
    let config = EtlConfig::world_bank();
    let store = store();
    let batch = sample_batch(&config);

    load(&store, &config, &batch);
    let counts_first = counts(&store);
    let gdp_first = store.indicator("IND", GDP_METRIC, 2021).unwrap();
    let latest_first = store.latest_value("IND", GDP_METRIC).unwrap();
    let yoy_first = store.yoy_changes("IND", GDP_METRIC).unwrap();
    let summary_first = store.entity_summary("IND").unwrap();

    load(&store, &config, &batch);

    assert_eq!(counts(&store), counts_first, "Row counts changed on re-load");
    assert_eq!(counts_first, vec![9, 4, 5, 6, 2]);
    assert_eq!(store.indicator("IND", GDP_METRIC, 2021).unwrap(), gdp_first);
    assert_eq!(store.latest_value("IND", GDP_METRIC).unwrap(), latest_first);
    assert_eq!(store.yoy_changes("IND", GDP_METRIC).unwrap(), yoy_first);
    assert_eq!(store.entity_summary("IND").unwrap(), summary_first);
}

/// On conflict only value and extracted_at change; descriptive fields keep
/// whatever the first load wrote.
#[test]
fn main_table_conflict_updates_only_volatile_fields() {
    let config = EtlConfig::world_bank();
    let store = store();

    let first = enrich(vec![record("IND", GDP_METRIC, 2021, 3.17e12)], &config).unwrap();
    store.upsert_indicators(&first).unwrap();

    let mut second = first.clone();
    second[0].value = 3.2e12;
    second[0].entity_name = "Republic of India".to_string();
    second[0].metric_name = "renamed".to_string();
    second[0].region = Some("Elsewhere".to_string());
    second[0].period_bucket = None;
    second[0].extracted_at = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    store.upsert_indicators(&second).unwrap();

    let stored = store
        .indicator("IND", GDP_METRIC, 2021)
        .unwrap()
        .expect("row present");
    assert_eq!(store.row_count(TABLE_INDICATORS).unwrap(), 1);
    assert_eq!(stored.value, Some(3.2e12));
    assert_eq!(
        stored.extracted_at,
        Some(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap())
    );
    assert_eq!(stored.entity_name, "IND name");
    assert_eq!(stored.metric_name, format!("{GDP_METRIC} name"));
    assert_eq!(stored.region.as_deref(), Some("Asia"));
    assert_eq!(stored.period_bucket.as_deref(), Some("2020s"));
    assert_eq!(stored.decade, Some(2020));
}

/// The latest view overwrites unconditionally: the last row applied wins,
/// even when it carries an older year.
#[test]
fn latest_view_overwrites_without_year_comparison() {
    let store = store();
    let newer = LatestValue {
        entity_code: "IND".into(),
        metric_code: GDP_METRIC.into(),
        year: 2021,
        value: 3.17e12,
    };
    let older = LatestValue { year: 2019, value: 2.83e12, ..newer.clone() };

    store.upsert_latest_values(&[newer, older.clone()]).unwrap();

    assert_eq!(store.row_count(TABLE_LATEST).unwrap(), 1);
    assert_eq!(store.latest_value("IND", GDP_METRIC).unwrap(), Some(older));
}

/// Summary reads the most recent year per metric and averages growth over
/// every stored year.
#[test]
fn entity_summary_uses_latest_year_per_metric() {
    let config = EtlConfig::world_bank();
    let store = store();
    load(&store, &config, &sample_batch(&config));

    let ind = store.entity_summary("IND").unwrap().expect("IND summary");
    assert_eq!(ind.entity_name.as_deref(), Some("IND name"));
    assert_eq!(ind.total_metrics, 3);
    assert_eq!(ind.latest_gdp, Some(3.17e12));
    assert_eq!(ind.latest_population, Some(1.407e9));
    let avg = ind.avg_gdp_growth.expect("growth average");
    let expected = (3.87 - 5.83 + 9.05) / 3.0;
    assert!((avg - expected).abs() < 1e-9, "avg growth {avg} != {expected}");

    let usa = store.entity_summary("USA").unwrap().expect("USA summary");
    assert_eq!(usa.total_metrics, 1);
    assert_eq!(usa.latest_gdp, Some(2.33e13));
    assert_eq!(usa.latest_population, None);
    assert_eq!(usa.avg_gdp_growth, None);
}

/// A later batch with a newer year replaces every summary field.
#[test]
fn entity_summary_refresh_overwrites_existing_rows() {
    let config = EtlConfig::world_bank();
    let store = store();
    load(&store, &config, &sample_batch(&config));

    let newer = enrich(
        vec![
            record("IND", GDP_METRIC, 2022, 3.35e12),
            record("IND", "SL.UEM.TOTL.ZS", 2022, 7.33),
        ],
        &config,
    )
    .unwrap();
    load(&store, &config, &newer);

    let ind = store.entity_summary("IND").unwrap().expect("IND summary");
    assert_eq!(store.row_count(TABLE_SUMMARY).unwrap(), 2);
    assert_eq!(ind.total_metrics, 4);
    assert_eq!(ind.latest_gdp, Some(3.35e12));
}

#[test]
fn decade_averages_are_persisted() {
    let config = EtlConfig::world_bank();
    let store = store();
    load(&store, &config, &sample_batch(&config));

    let avg = store
        .decade_average("IND", GDP_METRIC, 2020)
        .unwrap()
        .expect("decade row");
    assert!((avg - (2.66e12 + 3.17e12) / 2.0).abs() < 1.0);
    assert_eq!(store.decade_average("IND", GDP_METRIC, 2000).unwrap(), None);
}

/// A write against a missing table surfaces as a LoadError naming the table.
#[test]
fn write_failure_is_reported_as_load_error() {
    let config = EtlConfig::world_bank();
    let store = IndicatorStore::in_memory().unwrap();
    let batch = sample_batch(&config);

    let err = store.upsert_indicators(&batch).unwrap_err();

    match err {
        EtlError::Load { table, .. } => assert_eq!(table, TABLE_INDICATORS),
        other => panic!("Expected LoadError, got {other:?}"),
    }
}

/// A row rejected mid-batch rolls back the rows written before it.
#[test]
fn failed_batch_is_rolled_back() {
    let config = EtlConfig::world_bank();
    let db = TempDb::new();
    let store = IndicatorStore::open(db.path()).unwrap();
    store.create_tables().unwrap();
    db.raw()
        .execute_batch(
            "CREATE TRIGGER reject_2012 BEFORE INSERT ON economic_indicators
             WHEN NEW.period_year = 2012
             BEGIN SELECT RAISE(ABORT, 'boom'); END;",
        )
        .unwrap();
    let batch = enrich(
        vec![
            record("IND", GDP_METRIC, 2010, 1.68e12),
            record("IND", GDP_METRIC, 2011, 1.82e12),
            record("IND", GDP_METRIC, 2012, 1.83e12),
        ],
        &config,
    )
    .unwrap();

    let err = store.upsert_indicators(&batch).unwrap_err();

    match &err {
        EtlError::Load { table, .. } => assert_eq!(*table, TABLE_INDICATORS),
        other => panic!("Expected LoadError, got {other:?}"),
    }
    assert!(err.to_string().contains("boom"), "{err}");
    assert_eq!(store.row_count(TABLE_INDICATORS).unwrap(), 0, "Partial batch was committed");

    // The connection is usable again once the offending row is gone.
    store.upsert_indicators(&batch[..2]).unwrap();
    assert_eq!(store.row_count(TABLE_INDICATORS).unwrap(), 2);
}

#[test]
fn create_tables_is_repeatable() {
    let store = store();
    store.create_tables().expect("second create_tables");
    assert_eq!(store.row_count(TABLE_INDICATORS).unwrap(), 0);
}

#[test]
fn row_count_rejects_unknown_tables() {
    let store = store();
    assert!(matches!(
        store.row_count("sqlite_master; DROP TABLE x"),
        Err(EtlError::Config(_))
    ));
}
