//! Geoscout - geospatial file discovery and metadata enrichment
//!
//! This library crate exposes the crawler, catalog store, enrichment pipeline
//! and publisher used by the `geoscout` binary.

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod enrichment;
pub mod extract;
pub mod listing;
pub mod publish;
