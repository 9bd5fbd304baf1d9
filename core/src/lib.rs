//! Economic indicators ETL.
//!
//! Extracts World Bank indicator series for a fixed set of countries,
//! cleans and aggregates them, and upserts the result into SQLite.

pub mod aggregate;
pub mod config;
pub mod enrich;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod pipeline;
pub mod record;
pub mod store;
pub mod types;
