//! etl-runner: run the full economic indicators pipeline once.
//!
//! Usage:
//!   etl-runner
//!   etl-runner --config data/etl_config.json --db worldbank_etl.db
//!   etl-runner --delay-ms 0
//!
//! Exits 0 when at least one record was extracted and the load completed,
//! 1 otherwise.

use anyhow::Result;
use indicator_etl_core::{
    config::EtlConfig,
    extract::WorldBankClient,
    pipeline::{EtlPipeline, RunReport},
    store::IndicatorStore,
};
use std::env;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(report) => {
            print_summary(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Pipeline failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<RunReport> {
    let args: Vec<String> = env::args().collect();

    let mut config = match flag(&args, "--config") {
        Some(path) => EtlConfig::load(path)?,
        None => EtlConfig::world_bank(),
    };
    if let Some(db) = flag(&args, "--db") {
        config.storage.database_path = db.to_string();
    }
    if let Some(delay) = flag(&args, "--delay-ms").and_then(|d| d.parse().ok()) {
        config.extraction.request_delay_ms = delay;
    }

    println!("Economic indicators ETL: etl-runner");
    println!("  entities:  {}", config.entities.len());
    println!("  metrics:   {}", config.metrics.len());
    println!(
        "  years:     {}:{}",
        config.extraction.start_year, config.extraction.end_year
    );
    println!("  db:        {}", config.storage.database_path);
    println!();

    let store = IndicatorStore::open(&config.storage.database_path)?;
    let client = WorldBankClient::new(config.extraction.clone())?;
    let report = EtlPipeline::new(&config, &store).run(&client)?;
    Ok(report)
}

fn print_summary(report: &RunReport) {
    println!("=== RUN SUMMARY ===");
    println!("  run_id:       {}", report.run_id);
    println!("  extracted:    {}", report.extracted);
    println!("  loaded:       {}", report.loaded);
    println!("  latest rows:  {}", report.latest_rows);
    println!("  yoy rows:     {}", report.yoy_rows);
    println!("  decade rows:  {}", report.decade_rows);
    println!("  elapsed:      {:.2}s", report.elapsed.as_secs_f64());

    println!();
    println!("=== ENTITY SUMMARY ===");
    for s in &report.summaries {
        println!(
            "  {} {:<16} metrics: {:>2} | GDP: {} | Pop: {} | Avg growth: {}",
            s.entity_code,
            s.entity_name.as_deref().unwrap_or("-"),
            s.total_metrics,
            fmt_opt(s.latest_gdp, 0),
            fmt_opt(s.latest_population, 0),
            fmt_opt(s.avg_gdp_growth, 2),
        );
    }
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{v:.precision$}"))
        .unwrap_or_else(|| "-".to_string())
}

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].as_str())
}
