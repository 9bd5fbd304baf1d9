//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Pipeline stages hand rows to store methods; they never execute SQL.
//!
//! Every write group runs in its own transaction. A failure rolls back
//! that group only; groups already committed stay committed. Re-running
//! the same batch converges because every write is an upsert.

use crate::{
    error::{EtlError, EtlResult},
    types::{EntityCode, MetricCode, RunId, Year},
};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction};

mod indicator;
mod run;
mod summary;
mod views;

pub use run::{RUN_FAILED, RUN_RUNNING, RUN_SUCCEEDED};

pub const TABLE_INDICATORS: &str = "economic_indicators";
pub const TABLE_LATEST: &str = "latest_indicators";
pub const TABLE_YOY: &str = "yoy_changes";
pub const TABLE_DECADE: &str = "decade_averages";
pub const TABLE_SUMMARY: &str = "entity_summary";
pub const TABLE_RUN: &str = "pipeline_run";

pub struct IndicatorStore {
    conn: Connection,
}

impl IndicatorStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &str) -> EtlResult<Self> {
        let conn = Connection::open(path)?;
        // WAL only applies to real files; ignore the answer for URIs.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        log::info!("Opened indicator store at {path}");
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> EtlResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Create every table and index if absent.
    pub fn create_tables(&self) -> EtlResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_indicators.sql"))
            .map_err(|e| {
                log::error!("Error creating tables: {e}");
                EtlError::Database(e)
            })?;
        log::info!("All tables created successfully");
        Ok(())
    }

    /// Run `work` inside a transaction, committing on success.
    ///
    /// On failure the transaction is rolled back, the error is logged with
    /// the table name and returned as `EtlError::Load`.
    fn in_transaction<T>(
        &self,
        table: &'static str,
        work: impl FnOnce(&Transaction<'_>) -> rusqlite::Result<T>,
    ) -> EtlResult<T> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|source| load_error(table, source))?;
        match work(&tx) {
            Ok(out) => {
                tx.commit().map_err(|source| load_error(table, source))?;
                Ok(out)
            }
            Err(source) => {
                if let Err(e) = tx.rollback() {
                    log::error!("Rollback of {table} failed: {e}");
                }
                Err(load_error(table, source))
            }
        }
    }

    /// Row count of one of the store's tables.
    pub fn row_count(&self, table: &str) -> EtlResult<i64> {
        let known = [
            TABLE_INDICATORS,
            TABLE_LATEST,
            TABLE_YOY,
            TABLE_DECADE,
            TABLE_SUMMARY,
            TABLE_RUN,
        ];
        let Some(table) = known.iter().find(|t| **t == table) else {
            return Err(EtlError::Config(format!("unknown table '{table}'")));
        };
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count)
    }
}

fn load_error(table: &'static str, source: rusqlite::Error) -> EtlError {
    log::error!("Error loading {table}: {source}");
    EtlError::Load { table, source }
}

/// Timestamps are stored as RFC 3339 text.
fn parse_timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|t| t.with_timezone(&Utc))
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredIndicator {
    pub entity_code:   EntityCode,
    pub entity_name:   String,
    pub metric_code:   MetricCode,
    pub metric_name:   String,
    pub period_year:   Year,
    pub value:         Option<f64>,
    pub decade:        Option<Year>,
    pub period_bucket: Option<String>,
    pub region:        Option<String>,
    pub extracted_at:  Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntitySummary {
    pub entity_code:       EntityCode,
    pub entity_name:       Option<String>,
    pub total_metrics:     i64,
    pub latest_gdp:        Option<f64>,
    pub latest_population: Option<f64>,
    pub avg_gdp_growth:    Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRunRow {
    pub run_id:            RunId,
    pub started_at:        Option<DateTime<Utc>>,
    pub finished_at:       Option<DateTime<Utc>>,
    pub status:            String,
    pub records_extracted: i64,
    pub records_loaded:    i64,
    pub error:             Option<String>,
}
