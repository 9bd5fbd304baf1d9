//! World Bank extraction.
//!
//! RULE: Only this module talks HTTP.
//! The pipeline sees an `IndicatorSource` and never builds URLs itself.

use crate::{
    config::{EtlConfig, ExtractionConfig},
    error::{EtlError, EtlResult},
    normalize::normalize,
    record::IndicatorRecord,
};
use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CodeRef {
    pub id: String,
    pub value: String,
}

/// One element of the `data` half of a World Bank response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawObservation {
    pub country: CodeRef,
    /// Three-letter code; `country.id` is the two-letter one.
    #[serde(default, rename = "countryiso3code")]
    pub country_iso3: Option<String>,
    pub indicator: CodeRef,
    pub date: String,
    /// Number, numeric string or null.
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct PageMeta {
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    pages: Option<u32>,
}

/// One decoded response page.
#[derive(Debug, Clone, Default)]
pub struct ObservationPage {
    pub page: u32,
    pub pages: u32,
    pub observations: Vec<RawObservation>,
}

/// Decode a World Bank `[metadata, data]` payload.
///
/// A one-element array (the API's error shape) or a null data half
/// decodes to an empty page.
pub fn parse_page(body: &str) -> EtlResult<ObservationPage> {
    let parts: Vec<serde_json::Value> = serde_json::from_str(body)?;
    let mut parts = parts.into_iter();
    let meta = parts.next();
    let data = parts.next();

    let Some(data) = data else {
        if let Some(meta) = meta {
            log::warn!("World Bank API returned no data section: {meta}");
        }
        return Ok(ObservationPage::default());
    };

    let meta: Option<PageMeta> = meta.map(serde_json::from_value).transpose()?;
    let observations: Option<Vec<RawObservation>> = serde_json::from_value(data)?;

    Ok(ObservationPage {
        page: meta.as_ref().and_then(|m| m.page).unwrap_or(1),
        pages: meta.as_ref().and_then(|m| m.pages).unwrap_or(1),
        observations: observations.unwrap_or_default(),
    })
}

/// Anything that can produce raw observations for one entity/metric pair.
pub trait IndicatorSource {
    fn fetch(&self, entity_code: &str, metric_code: &str) -> EtlResult<Vec<RawObservation>>;
}

/// Blocking client for the World Bank v2 indicator endpoint.
pub struct WorldBankClient {
    client: reqwest::blocking::Client,
    settings: ExtractionConfig,
}

impl WorldBankClient {
    pub fn new(settings: ExtractionConfig) -> EtlResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| EtlError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client, settings })
    }

    fn fetch_page(
        &self,
        entity_code: &str,
        metric_code: &str,
        page: u32,
    ) -> EtlResult<ObservationPage> {
        let url = format!(
            "{}/country/{entity_code}/indicator/{metric_code}",
            self.settings.base_url.trim_end_matches('/')
        );
        let date = format!("{}:{}", self.settings.start_year, self.settings.end_year);
        let per_page = self.settings.per_page.to_string();
        let page = page.to_string();

        let body = self
            .client
            .get(&url)
            .query(&[
                ("format", "json"),
                ("date", date.as_str()),
                ("per_page", per_page.as_str()),
                ("page", page.as_str()),
            ])
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .map_err(|e| EtlError::extraction(entity_code, metric_code, e))?;

        parse_page(&body).map_err(|e| EtlError::extraction(entity_code, metric_code, e))
    }
}

impl IndicatorSource for WorldBankClient {
    fn fetch(&self, entity_code: &str, metric_code: &str) -> EtlResult<Vec<RawObservation>> {
        let first = self.fetch_page(entity_code, metric_code, 1)?;
        let mut observations = first.observations;
        for page in 2..=first.pages {
            std::thread::sleep(Duration::from_millis(self.settings.request_delay_ms));
            let next = self.fetch_page(entity_code, metric_code, page)?;
            observations.extend(next.observations);
        }
        Ok(observations)
    }
}

/// Pull every configured entity × metric pair and normalize the result.
///
/// A failing pair is logged and contributes nothing; the sweep continues.
/// Sleeps `request_delay_ms` after every pair. Every record of one sweep
/// carries the same `extracted_at`.
pub fn extract_all(source: &dyn IndicatorSource, config: &EtlConfig) -> Vec<IndicatorRecord> {
    let total = config.entities.len() * config.metrics.len();
    let delay = Duration::from_millis(config.extraction.request_delay_ms);
    let mut records = Vec::new();
    let mut current = 0usize;
    let extracted_at = Utc::now();

    log::info!(
        "Starting extraction for {} entities and {} metrics",
        config.entities.len(),
        config.metrics.len()
    );

    for entity in &config.entities {
        for metric in &config.metrics {
            current += 1;
            log::info!("[{current}/{total}] Extracting {} - {}", entity.name, metric.name);

            match source.fetch(&entity.code, &metric.code) {
                Ok(raw) => {
                    let normalized = normalize(&raw, extracted_at);
                    log::debug!(
                        "{}/{}: {} raw, {} kept",
                        entity.code,
                        metric.code,
                        raw.len(),
                        normalized.len()
                    );
                    records.extend(normalized);
                }
                Err(e) => log::error!("Error fetching {}/{}: {e}", entity.code, metric.code),
            }

            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }
    }

    log::info!("Extracted {} total records", records.len());
    records
}
