use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub crawl: CrawlConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub enrich: EnrichConfig,

    #[serde(default)]
    pub extract: ExtractConfig,

    #[serde(default)]
    pub publish: PublishConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrawlConfig {
    /// Listing endpoint the walk starts from
    #[serde(default = "default_root_url")]
    pub root_url: String,

    /// File extension to keep, with or without the leading dot
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Per-request timeout for listing fetches
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Upper bound on listing fetches in flight across the whole tree
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_root_url() -> String {
    "https://data.source.coop/cholmes/overture/".to_string()
}
fn default_extension() -> String {
    "parquet".to_string()
}
fn default_request_timeout() -> u64 {
    10
}
fn default_max_concurrency() -> usize {
    16
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            root_url: default_root_url(),
            extension: default_extension(),
            request_timeout_secs: default_request_timeout(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// Checkpoint file holding the crawled and enriched catalog
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("results/parquet_result.json")
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnrichConfig {
    /// Maximum number of items processed per run (unbounded when unset)
    #[serde(default)]
    pub limit: Option<usize>,

    /// Write a checkpoint after this many processed items (default: 1)
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: usize,
}

fn default_checkpoint_every() -> usize {
    1
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            limit: None,
            checkpoint_every: default_checkpoint_every(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractConfig {
    /// Path to the duckdb binary (looked up on PATH when unset)
    #[serde(default)]
    pub duckdb_path: Option<PathBuf>,

    /// Column holding WKB-encoded geometries
    #[serde(default = "default_geometry_column")]
    pub geometry_column: String,

    /// Maximum time for a single metadata query
    #[serde(default = "default_extract_timeout")]
    pub timeout_secs: u64,
}

fn default_geometry_column() -> String {
    "geometry".to_string()
}
fn default_extract_timeout() -> u64 {
    300
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            duckdb_path: None,
            geometry_column: default_geometry_column(),
            timeout_secs: default_extract_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PublishConfig {
    /// Directory the STAC catalog is written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_catalog_id")]
    pub catalog_id: String,

    #[serde(default = "default_description")]
    pub description: String,

    /// RFC 3339 timestamp stamped on every item (default: publish time)
    #[serde(default)]
    pub item_datetime: Option<String>,

    /// Media type of the data asset on each item
    #[serde(default = "default_media_type")]
    pub media_type: String,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results/stac")
}
fn default_catalog_id() -> String {
    "geoscout-catalog".to_string()
}
fn default_description() -> String {
    "Geospatial files discovered and described by geoscout".to_string()
}
fn default_media_type() -> String {
    "application/parquet".to_string()
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            catalog_id: default_catalog_id(),
            description: default_description(),
            item_datetime: None,
            media_type: default_media_type(),
        }
    }
}
