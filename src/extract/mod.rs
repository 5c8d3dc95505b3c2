//! Metadata extraction for remote geospatial files.
//!
//! The enrichment pipeline talks only to [`MetadataExtractor`]; the query
//! engine behind it is an adapter ([`DuckDbExtractor`] for the `duckdb` CLI).

pub mod command;
pub mod duckdb;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use geoscout_common::{Error, Facets, ResourceRef, Result};
use serde::Serialize;

use crate::config::ExtractConfig;

pub use command::{ToolCommand, ToolOutput};
pub use duckdb::DuckDbExtractor;

/// Computes facets for one remote file.
///
/// A facet that cannot be computed is returned as `None`; only a failure that
/// prevents the whole extraction (e.g. the engine cannot be started at all)
/// is an `Err`.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    async fn extract(&self, resource: &ResourceRef) -> Result<Facets>;
}

/// Availability of an external tool, as reported by `check-tools`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    /// First line of `--version` output.
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

/// Locate a tool: the configured path if it exists, otherwise `PATH`.
pub fn locate_tool(name: &str, configured: Option<&Path>) -> Result<PathBuf> {
    match configured {
        Some(path) if path.exists() => Ok(path.to_path_buf()),
        _ => which::which(name)
            .map_err(|_| Error::tool(name, format!("{name} not found; is it installed and in PATH?"))),
    }
}

/// Check every tool extraction depends on.
pub fn check_tools(config: &ExtractConfig) -> Vec<ToolInfo> {
    let name = "duckdb";
    match locate_tool(name, config.duckdb_path.as_deref()) {
        Ok(path) => vec![ToolInfo {
            name: name.to_string(),
            available: true,
            version: detect_version(&path),
            path: Some(path),
        }],
        Err(_) => vec![ToolInfo {
            name: name.to_string(),
            available: false,
            version: None,
            path: None,
        }],
    }
}

fn detect_version(path: &Path) -> Option<String> {
    let output = std::process::Command::new(path)
        .arg("--version")
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.trim().to_string())
}
