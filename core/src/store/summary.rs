//! Per-entity rollup, computed from the persisted main table.

use super::{EntitySummary, IndicatorStore, TABLE_SUMMARY};
use crate::{config::SummaryMetrics, error::EtlResult};
use rusqlite::{params, OptionalExtension};

fn summary_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntitySummary> {
    Ok(EntitySummary {
        entity_code: row.get(0)?,
        entity_name: row.get(1)?,
        total_metrics: row.get(2)?,
        latest_gdp: row.get(3)?,
        latest_population: row.get(4)?,
        avg_gdp_growth: row.get(5)?,
    })
}

impl IndicatorStore {
    /// Rebuild `entity_summary` from `economic_indicators`.
    ///
    /// Latest GDP and population come from the most recent stored year of
    /// each metric. Average GDP growth spans every stored year. Existing
    /// summary rows are overwritten in full. Returns the number of entities.
    pub fn refresh_entity_summary(&self, metrics: &SummaryMetrics) -> EtlResult<usize> {
        self.in_transaction(TABLE_SUMMARY, |tx| {
            tx.execute(
                "WITH ranked AS (
                    SELECT entity_code, entity_name, metric_code, value,
                           ROW_NUMBER() OVER (
                               PARTITION BY entity_code, metric_code
                               ORDER BY period_year DESC
                           ) AS rn
                    FROM economic_indicators
                 ),
                 growth AS (
                    SELECT entity_code, AVG(value) AS avg_growth
                    FROM economic_indicators
                    WHERE metric_code = ?3
                    GROUP BY entity_code
                 )
                 INSERT INTO entity_summary (
                    entity_code, entity_name, total_metrics,
                    latest_gdp, latest_population, avg_gdp_growth
                 )
                 SELECT r.entity_code,
                        MAX(r.entity_name),
                        COUNT(DISTINCT r.metric_code),
                        MAX(CASE WHEN r.metric_code = ?1 THEN r.value END),
                        MAX(CASE WHEN r.metric_code = ?2 THEN r.value END),
                        MAX(g.avg_growth)
                 FROM ranked r
                 LEFT JOIN growth g ON g.entity_code = r.entity_code
                 WHERE r.rn = 1
                 GROUP BY r.entity_code
                 ON CONFLICT(entity_code) DO UPDATE SET
                    entity_name       = excluded.entity_name,
                    total_metrics     = excluded.total_metrics,
                    latest_gdp        = excluded.latest_gdp,
                    latest_population = excluded.latest_population,
                    avg_gdp_growth    = excluded.avg_gdp_growth,
                    updated_at        = CURRENT_TIMESTAMP",
                params![&metrics.gdp, &metrics.population, &metrics.gdp_growth],
            )
        })
        .inspect(|n| log::info!("Entity summary refreshed for {n} entities"))
    }

    pub fn entity_summary(&self, entity_code: &str) -> EtlResult<Option<EntitySummary>> {
        let row = self
            .conn
            .query_row(
                "SELECT entity_code, entity_name, total_metrics,
                        latest_gdp, latest_population, avg_gdp_growth
                 FROM entity_summary WHERE entity_code = ?1",
                params![entity_code],
                summary_row_mapper,
            )
            .optional()?;
        Ok(row)
    }

    /// All summaries, ordered by entity code.
    pub fn entity_summaries(&self) -> EtlResult<Vec<EntitySummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT entity_code, entity_name, total_metrics,
                    latest_gdp, latest_population, avg_gdp_growth
             FROM entity_summary ORDER BY entity_code ASC",
        )?;
        let rows = stmt.query_map([], summary_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
