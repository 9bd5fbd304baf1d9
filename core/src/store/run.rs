//! Store methods for the pipeline run audit table.

use super::{parse_timestamp, IndicatorStore, PipelineRunRow};
use crate::error::EtlResult;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

pub const RUN_RUNNING: &str = "running";
pub const RUN_SUCCEEDED: &str = "succeeded";
pub const RUN_FAILED: &str = "failed";

impl IndicatorStore {
    pub fn insert_run(&self, run_id: &str, started_at: DateTime<Utc>) -> EtlResult<()> {
        self.conn.execute(
            "INSERT INTO pipeline_run (run_id, started_at, status) VALUES (?1, ?2, ?3)",
            params![run_id, started_at.to_rfc3339(), RUN_RUNNING],
        )?;
        Ok(())
    }

    /// Close a run. `error` is None for a successful run.
    pub fn finish_run(
        &self,
        run_id: &str,
        finished_at: DateTime<Utc>,
        records_extracted: usize,
        records_loaded: usize,
        error: Option<&str>,
    ) -> EtlResult<()> {
        let status = if error.is_some() { RUN_FAILED } else { RUN_SUCCEEDED };
        self.conn.execute(
            "UPDATE pipeline_run
             SET finished_at = ?2, status = ?3, records_extracted = ?4,
                 records_loaded = ?5, error = ?6
             WHERE run_id = ?1",
            params![
                run_id,
                finished_at.to_rfc3339(),
                status,
                records_extracted as i64,
                records_loaded as i64,
                error,
            ],
        )?;
        Ok(())
    }

    pub fn pipeline_run(&self, run_id: &str) -> EtlResult<Option<PipelineRunRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT run_id, started_at, finished_at, status,
                        records_extracted, records_loaded, error
                 FROM pipeline_run WHERE run_id = ?1",
                params![run_id],
                run_row_mapper,
            )
            .optional()?;
        Ok(row)
    }

    /// Every recorded run, oldest first.
    pub fn pipeline_runs(&self) -> EtlResult<Vec<PipelineRunRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, started_at, finished_at, status,
                    records_extracted, records_loaded, error
             FROM pipeline_run ORDER BY started_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map([], run_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

fn run_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<PipelineRunRow> {
    Ok(PipelineRunRow {
        run_id: row.get(0)?,
        started_at: parse_timestamp(row.get(1)?),
        finished_at: parse_timestamp(row.get(2)?),
        status: row.get(3)?,
        records_extracted: row.get(4)?,
        records_loaded: row.get(5)?,
        error: row.get(6)?,
    })
}
