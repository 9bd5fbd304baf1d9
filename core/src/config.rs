//! Static pipeline configuration.
//!
//! Built once at startup and passed by reference into every stage.
//! Nothing in the pipeline reads configuration from globals.

use crate::types::{EntityCode, MetricCode, Year};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const WORLD_BANK_API: &str = "https://api.worldbank.org/v2";

pub const GDP_METRIC: &str = "NY.GDP.MKTP.CD";
pub const POPULATION_METRIC: &str = "SP.POP.TOTL";
pub const GDP_GROWTH_METRIC: &str = "NY.GDP.MKTP.KD.ZG";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityConfig {
    pub code: EntityCode,
    pub name: String,
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricConfig {
    pub code: MetricCode,
    pub name: String,
}

/// A labelled year range. Lower bound inclusive, upper bound exclusive,
/// except for the last bucket in the list which is closed on both ends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeriodBucket {
    pub label: String,
    pub start: Year,
    pub end: Year,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionConfig {
    pub base_url: String,
    pub start_year: Year,
    pub end_year: Year,
    pub per_page: u32,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Pause after every API call.
    pub request_delay_ms: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            base_url: WORLD_BANK_API.to_string(),
            start_year: 2010,
            end_year: 2023,
            per_page: 500,
            timeout_secs: 10,
            request_delay_ms: 500,
        }
    }
}

/// Metric codes the per-entity rollup reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryMetrics {
    pub gdp: MetricCode,
    pub population: MetricCode,
    pub gdp_growth: MetricCode,
}

impl Default for SummaryMetrics {
    fn default() -> Self {
        Self {
            gdp: GDP_METRIC.to_string(),
            population: POPULATION_METRIC.to_string(),
            gdp_growth: GDP_GROWTH_METRIC.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { database_path: "worldbank_etl.db".to_string() }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct EtlConfigFile {
    entities: Vec<EntityConfig>,
    metrics: Vec<MetricConfig>,
    #[serde(default = "default_year_floor")]
    year_floor: Year,
    #[serde(default = "default_period_buckets")]
    period_buckets: Vec<PeriodBucket>,
    #[serde(default)]
    summary_metrics: SummaryMetrics,
    #[serde(default)]
    extraction: ExtractionConfig,
    #[serde(default)]
    storage: StorageConfig,
}

fn default_year_floor() -> Year {
    2000
}

fn default_period_buckets() -> Vec<PeriodBucket> {
    [
        ("2000s", 2000, 2010),
        ("2010-2015", 2010, 2015),
        ("2015-2020", 2015, 2020),
        ("2020s", 2020, 2025),
    ]
    .into_iter()
    .map(|(label, start, end)| PeriodBucket { label: label.into(), start, end })
    .collect()
}

#[derive(Debug, Clone)]
pub struct EtlConfig {
    /// Extraction order follows this list.
    pub entities: Vec<EntityConfig>,
    pub metrics: Vec<MetricConfig>,
    pub regions: HashMap<EntityCode, String>,
    /// Rows with an earlier period year fail validation.
    pub year_floor: Year,
    pub period_buckets: Vec<PeriodBucket>,
    pub summary_metrics: SummaryMetrics,
    pub extraction: ExtractionConfig,
    pub storage: StorageConfig,
}

impl EtlConfig {
    /// Load from a JSON configuration file.
    /// Without a file, use EtlConfig::world_bank().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let file: EtlConfigFile = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        let config = Self::from_parts(file);
        config.validate()?;
        Ok(config)
    }

    fn from_parts(file: EtlConfigFile) -> Self {
        let regions = file
            .entities
            .iter()
            .filter_map(|e| e.region.clone().map(|r| (e.code.clone(), r)))
            .collect();
        Self {
            entities: file.entities,
            metrics: file.metrics,
            regions,
            year_floor: file.year_floor,
            period_buckets: file.period_buckets,
            summary_metrics: file.summary_metrics,
            extraction: file.extraction,
            storage: file.storage,
        }
    }

    /// Seven economies, eight indicators, 2010–2023.
    pub fn world_bank() -> Self {
        let entities = [
            ("IND", "India", "Asia"),
            ("USA", "United States", "North America"),
            ("CHN", "China", "Asia"),
            ("GBR", "United Kingdom", "Europe"),
            ("JPN", "Japan", "Asia"),
            ("DEU", "Germany", "Europe"),
            ("BRA", "Brazil", "South America"),
        ]
        .into_iter()
        .map(|(code, name, region)| EntityConfig {
            code: code.into(),
            name: name.into(),
            region: Some(region.into()),
        })
        .collect();

        let metrics = [
            (GDP_METRIC, "GDP (current US$)"),
            ("NY.GDP.PCAP.CD", "GDP per capita (current US$)"),
            (GDP_GROWTH_METRIC, "GDP growth (annual %)"),
            (POPULATION_METRIC, "Population, total"),
            ("FP.CPI.TOTL.ZG", "Inflation, consumer prices (annual %)"),
            ("SL.UEM.TOTL.ZS", "Unemployment, total (% of labor force)"),
            ("NE.EXP.GNFS.ZS", "Exports of goods and services (% of GDP)"),
            ("NE.IMP.GNFS.ZS", "Imports of goods and services (% of GDP)"),
        ]
        .into_iter()
        .map(|(code, name)| MetricConfig { code: code.into(), name: name.into() })
        .collect();

        Self::from_parts(EtlConfigFile {
            entities,
            metrics,
            year_floor: default_year_floor(),
            period_buckets: default_period_buckets(),
            summary_metrics: SummaryMetrics::default(),
            extraction: ExtractionConfig::default(),
            storage: StorageConfig::default(),
        })
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.entities.is_empty() {
            anyhow::bail!("no entities configured");
        }
        if self.metrics.is_empty() {
            anyhow::bail!("no metrics configured");
        }
        let ex = &self.extraction;
        if ex.start_year > ex.end_year {
            anyhow::bail!(
                "extraction start year {} is after end year {}",
                ex.start_year,
                ex.end_year
            );
        }
        if ex.per_page == 0 {
            anyhow::bail!("extraction per_page must be positive");
        }
        for pair in self.period_buckets.windows(2) {
            if pair[0].end > pair[1].start {
                anyhow::bail!(
                    "period buckets '{}' and '{}' overlap or are out of order",
                    pair[0].label,
                    pair[1].label
                );
            }
        }
        if let Some(b) = self.period_buckets.iter().find(|b| b.start > b.end) {
            anyhow::bail!("period bucket '{}' has start after end", b.label);
        }
        Ok(())
    }

    pub fn region_for(&self, entity_code: &str) -> Option<&str> {
        self.regions.get(entity_code).map(String::as_str)
    }

    /// Label of the bucket containing `year`, if any.
    pub fn period_bucket_for(&self, year: Year) -> Option<&str> {
        let last = self.period_buckets.len().checked_sub(1)?;
        self.period_buckets
            .iter()
            .enumerate()
            .find(|(i, b)| {
                year >= b.start && (year < b.end || (*i == last && year == b.end))
            })
            .map(|(_, b)| b.label.as_str())
    }

    pub fn entity_name(&self, code: &str) -> Option<&str> {
        self.entities.iter().find(|e| e.code == code).map(|e| e.name.as_str())
    }

    pub fn metric_name(&self, code: &str) -> Option<&str> {
        self.metrics.iter().find(|m| m.code == code).map(|m| m.name.as_str())
    }
}
