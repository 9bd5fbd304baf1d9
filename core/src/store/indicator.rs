use super::{parse_timestamp, IndicatorStore, StoredIndicator, TABLE_INDICATORS};
use crate::{error::EtlResult, record::EnrichedRecord, types::Year};
use rusqlite::{params, OptionalExtension};

impl IndicatorStore {
    // ── Main table ────────────────────────────────────────────────

    /// Upsert the clean dataset keyed on (entity, metric, year).
    ///
    /// On conflict only `value` and `extracted_at` change. Names, decade,
    /// period bucket and region keep whatever the first load wrote.
    pub fn upsert_indicators(&self, rows: &[EnrichedRecord]) -> EtlResult<usize> {
        self.in_transaction(TABLE_INDICATORS, |tx| {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO economic_indicators (
                    entity_code, entity_name, metric_code, metric_name,
                    period_year, value, decade, period_bucket, region, extracted_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(entity_code, metric_code, period_year) DO UPDATE SET
                    value        = excluded.value,
                    extracted_at = excluded.extracted_at",
            )?;
            for r in rows {
                stmt.execute(params![
                    &r.entity_code,
                    &r.entity_name,
                    &r.metric_code,
                    &r.metric_name,
                    r.period_year,
                    r.value,
                    r.decade,
                    r.period_bucket.as_deref(),
                    r.region.as_deref(),
                    r.extracted_at.to_rfc3339(),
                ])?;
            }
            Ok(rows.len())
        })
        .inspect(|n| log::info!("Loaded {n} records to {TABLE_INDICATORS} table"))
    }

    pub fn indicator(
        &self,
        entity_code: &str,
        metric_code: &str,
        year: Year,
    ) -> EtlResult<Option<StoredIndicator>> {
        let row = self
            .conn
            .query_row(
                "SELECT entity_code, entity_name, metric_code, metric_name, period_year,
                        value, decade, period_bucket, region, extracted_at
                 FROM economic_indicators
                 WHERE entity_code = ?1 AND metric_code = ?2 AND period_year = ?3",
                params![entity_code, metric_code, year],
                |row| {
                    Ok(StoredIndicator {
                        entity_code: row.get(0)?,
                        entity_name: row.get(1)?,
                        metric_code: row.get(2)?,
                        metric_name: row.get(3)?,
                        period_year: row.get(4)?,
                        value: row.get(5)?,
                        decade: row.get(6)?,
                        period_bucket: row.get(7)?,
                        region: row.get(8)?,
                        extracted_at: parse_timestamp(row.get(9)?),
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Number of stored years for one (entity, metric) pair.
    pub fn indicator_year_count(&self, entity_code: &str, metric_code: &str) -> EtlResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM economic_indicators WHERE entity_code = ?1 AND metric_code = ?2",
            params![entity_code, metric_code],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
