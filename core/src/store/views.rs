//! Store methods for the aggregate views.
//!
//! Conflicts overwrite unconditionally, with no comparison against the
//! stored year. The last row applied per key wins, so callers must pass
//! rows in the order `aggregate()` produces them.

use super::{IndicatorStore, TABLE_DECADE, TABLE_LATEST, TABLE_YOY};
use crate::{
    aggregate::{AggregateViews, DecadeAverage, LatestValue, YoyChange},
    error::EtlResult,
    types::Year,
};
use rusqlite::{params, OptionalExtension};

impl IndicatorStore {
    pub fn upsert_latest_values(&self, rows: &[LatestValue]) -> EtlResult<usize> {
        self.in_transaction(TABLE_LATEST, |tx| {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO latest_indicators (entity_code, metric_code, latest_year, latest_value)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(entity_code, metric_code) DO UPDATE SET
                    latest_year  = excluded.latest_year,
                    latest_value = excluded.latest_value,
                    updated_at   = CURRENT_TIMESTAMP",
            )?;
            for r in rows {
                stmt.execute(params![&r.entity_code, &r.metric_code, r.year, r.value])?;
            }
            Ok(rows.len())
        })
    }

    pub fn upsert_yoy_changes(&self, rows: &[YoyChange]) -> EtlResult<usize> {
        self.in_transaction(TABLE_YOY, |tx| {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO yoy_changes (entity_code, metric_code, period_year, value, pct_change)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(entity_code, metric_code, period_year) DO UPDATE SET
                    value      = excluded.value,
                    pct_change = excluded.pct_change",
            )?;
            for r in rows {
                stmt.execute(params![
                    &r.entity_code,
                    &r.metric_code,
                    r.year,
                    r.value,
                    r.pct_change,
                ])?;
            }
            Ok(rows.len())
        })
    }

    pub fn upsert_decade_averages(&self, rows: &[DecadeAverage]) -> EtlResult<usize> {
        self.in_transaction(TABLE_DECADE, |tx| {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO decade_averages (entity_code, metric_code, decade, mean_value)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(entity_code, metric_code, decade) DO UPDATE SET
                    mean_value = excluded.mean_value",
            )?;
            for r in rows {
                stmt.execute(params![&r.entity_code, &r.metric_code, r.decade, r.mean_value])?;
            }
            Ok(rows.len())
        })
    }

    /// Apply all three views, one transaction per table.
    pub fn load_aggregations(&self, views: &AggregateViews) -> EtlResult<()> {
        let latest = self.upsert_latest_values(&views.latest)?;
        let yoy = self.upsert_yoy_changes(&views.yoy)?;
        let decade = self.upsert_decade_averages(&views.decade_averages)?;
        log::info!(
            "Loaded all aggregations successfully (latest={latest}, yoy={yoy}, decade={decade})"
        );
        Ok(())
    }

    // ── Reads ─────────────────────────────────────────────────────

    pub fn latest_value(
        &self,
        entity_code: &str,
        metric_code: &str,
    ) -> EtlResult<Option<LatestValue>> {
        let row = self
            .conn
            .query_row(
                "SELECT entity_code, metric_code, latest_year, latest_value
                 FROM latest_indicators WHERE entity_code = ?1 AND metric_code = ?2",
                params![entity_code, metric_code],
                |row| {
                    Ok(LatestValue {
                        entity_code: row.get(0)?,
                        metric_code: row.get(1)?,
                        year: row.get(2)?,
                        value: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// YoY rows for one pair, oldest first.
    pub fn yoy_changes(&self, entity_code: &str, metric_code: &str) -> EtlResult<Vec<YoyChange>> {
        let mut stmt = self.conn.prepare(
            "SELECT entity_code, metric_code, period_year, value, pct_change
             FROM yoy_changes WHERE entity_code = ?1 AND metric_code = ?2
             ORDER BY period_year ASC",
        )?;
        let rows = stmt.query_map(params![entity_code, metric_code], |row| {
            Ok(YoyChange {
                entity_code: row.get(0)?,
                metric_code: row.get(1)?,
                year: row.get(2)?,
                value: row.get(3)?,
                pct_change: row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn decade_average(
        &self,
        entity_code: &str,
        metric_code: &str,
        decade: Year,
    ) -> EtlResult<Option<f64>> {
        let mean = self
            .conn
            .query_row(
                "SELECT mean_value FROM decade_averages
                 WHERE entity_code = ?1 AND metric_code = ?2 AND decade = ?3",
                params![entity_code, metric_code, decade],
                |row| row.get(0),
            )
            .optional()?;
        Ok(mean)
    }
}
