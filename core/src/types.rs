//! Shared primitive types used across the pipeline.

/// ISO 3166 alpha-3 country code, e.g. `IND`.
pub type EntityCode = String;

/// Dotted World Bank indicator code, e.g. `NY.GDP.MKTP.CD`.
pub type MetricCode = String;

/// A calendar year of observation.
pub type Year = i32;

/// The canonical pipeline run identifier.
pub type RunId = String;
