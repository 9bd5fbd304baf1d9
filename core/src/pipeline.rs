//! The ETL pipeline: one linear, single-threaded run.
//!
//! EXECUTION ORDER (fixed, never reordered):
//!   1. Extract   every entity × metric pair, throttled
//!   2. Enrich    dedupe, validate, derive, round
//!   3. Aggregate latest / yoy / decade views
//!   4. Load      main table, then each view, then the entity summary
//!
//! RULES:
//!   - An invalid configuration is rejected before the store is touched.
//!   - An empty extraction stops the run before the transform stage.
//!   - Validation and load failures abort the run.
//!   - Each table is its own transaction; a failed run may leave earlier
//!     tables loaded. Re-running the same input repairs that.
//!   - Every run leaves one row in `pipeline_run`.

use crate::{
    aggregate::{aggregate, AggregateViews},
    config::EtlConfig,
    enrich::enrich,
    error::{EtlError, EtlResult},
    extract::{extract_all, IndicatorSource},
    record::EnrichedRecord,
    store::{EntitySummary, IndicatorStore},
    types::RunId,
};
use chrono::Utc;
use std::time::{Duration, Instant};

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id:      RunId,
    pub extracted:   usize,
    pub loaded:      usize,
    pub latest_rows: usize,
    pub yoy_rows:    usize,
    pub decade_rows: usize,
    pub summaries:   Vec<EntitySummary>,
    pub elapsed:     Duration,
}

pub struct EtlPipeline<'a> {
    config: &'a EtlConfig,
    store:  &'a IndicatorStore,
}

impl<'a> EtlPipeline<'a> {
    pub fn new(config: &'a EtlConfig, store: &'a IndicatorStore) -> Self {
        Self { config, store }
    }

    /// Execute the full pipeline against `source`.
    pub fn run(&self, source: &dyn IndicatorSource) -> EtlResult<RunReport> {
        let started = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();

        log::info!("{}", "=".repeat(60));
        log::info!("Starting economic indicators ETL pipeline (run {run_id})");
        log::info!("{}", "=".repeat(60));

        self.config.validate()?;
        self.store.create_tables()?;
        self.store.insert_run(&run_id, Utc::now())?;

        let mut extracted = 0usize;
        let outcome = self.execute(source, &run_id, started, &mut extracted);

        let (loaded, error) = match &outcome {
            Ok(report) => (report.loaded, None),
            Err(e) => {
                log::error!("Pipeline failed: {e}");
                (0, Some(e.to_string()))
            }
        };
        if let Err(e) =
            self.store
                .finish_run(&run_id, Utc::now(), extracted, loaded, error.as_deref())
        {
            log::error!("Could not record outcome of run {run_id}: {e}");
        }

        if let Ok(report) = &outcome {
            log::info!("{}", "=".repeat(60));
            log::info!(
                "Pipeline completed successfully in {:.2} seconds",
                report.elapsed.as_secs_f64()
            );
            log::info!("Total records processed: {}", report.loaded);
            log::info!("{}", "=".repeat(60));
        }
        outcome
    }

    fn execute(
        &self,
        source: &dyn IndicatorSource,
        run_id: &str,
        started: Instant,
        extracted: &mut usize,
    ) -> EtlResult<RunReport> {
        log::info!("STEP 1: EXTRACT");
        let raw = extract_all(source, self.config);
        *extracted = raw.len();
        if raw.is_empty() {
            log::error!("No data extracted. Exiting.");
            return Err(EtlError::EmptyExtraction);
        }

        log::info!("STEP 2: TRANSFORM");
        let clean = enrich(raw, self.config)?;
        let views = aggregate(&clean);
        log::info!(
            "Transformed {} records (latest={}, yoy={}, decade={})",
            clean.len(),
            views.latest.len(),
            views.yoy.len(),
            views.decade_averages.len()
        );

        log::info!("STEP 3: LOAD");
        self.load(&clean, &views)?;
        let summaries = self.store.entity_summaries()?;

        Ok(RunReport {
            run_id: run_id.to_string(),
            extracted: *extracted,
            loaded: clean.len(),
            latest_rows: views.latest.len(),
            yoy_rows: views.yoy.len(),
            decade_rows: views.decade_averages.len(),
            summaries,
            elapsed: started.elapsed(),
        })
    }

    /// Load an already-transformed batch: main table, views, summary.
    pub fn load(&self, clean: &[EnrichedRecord], views: &AggregateViews) -> EtlResult<()> {
        self.store.upsert_indicators(clean)?;
        self.store.load_aggregations(views)?;
        self.store.refresh_entity_summary(&self.config.summary_metrics)?;
        Ok(())
    }
}
