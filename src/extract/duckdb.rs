//! Metadata extraction through the `duckdb` command-line shell.
//!
//! Each facet is one shell invocation in JSON output mode with the `spatial`
//! and `httpfs` extensions loaded, reading the remote file in place. A facet
//! whose query fails comes back absent; the other facets are still tried.

use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use geoscout_common::{
    normalize_geometry_type, Bbox, Columns, Coord, Error, Facet, Facets, ResourceRef, Result,
};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::command::ToolCommand;
use super::{locate_tool, MetadataExtractor};
use crate::config::ExtractConfig;

const TOOL: &str = "duckdb";

/// Statements run ahead of every query. INSTALL is a no-op once installed.
const SETUP_SQL: &str = "INSTALL spatial; LOAD spatial; INSTALL httpfs; LOAD httpfs;";

type Row = Map<String, Value>;

/// [`MetadataExtractor`] backed by the duckdb CLI.
#[derive(Debug, Clone)]
pub struct DuckDbExtractor {
    program: PathBuf,
    geometry_column: String,
    timeout: Duration,
}

impl DuckDbExtractor {
    pub fn new(program: PathBuf, geometry_column: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program,
            geometry_column: geometry_column.into(),
            timeout,
        }
    }

    /// Build from config, resolving `duckdb` on `PATH` when no usable path is set.
    pub fn from_config(config: &ExtractConfig) -> Result<Self> {
        let program = locate_tool(TOOL, config.duckdb_path.as_deref())?;

        Ok(Self::new(
            program,
            config.geometry_column.clone(),
            Duration::from_secs(config.timeout_secs),
        ))
    }

    async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        let output = ToolCommand::new(self.program.clone())
            .args(["-json", "-c"])
            .arg(format!("{SETUP_SQL}\n{sql}"))
            .timeout(self.timeout)
            .execute()
            .await?;

        parse_json_rows(&output.stdout)
    }

    fn geometry_expr(&self) -> String {
        format!("ST_GeomFromWKB({})", quote_ident(&self.geometry_column))
    }

    /// Column name to declared type, in schema order.
    pub async fn columns(&self, url: &str) -> Result<Columns> {
        let sql = format!(
            "DESCRIBE SELECT * FROM read_parquet({});",
            quote_literal(url)
        );
        parse_describe(&self.query(&sql).await?)
    }

    /// Envelope of every geometry in the file.
    pub async fn bbox(&self, url: &str) -> Result<Bbox> {
        let sql = format!(
            "SELECT ST_AsText(ST_Envelope_Agg({})) AS bbox FROM read_parquet({});",
            self.geometry_expr(),
            quote_literal(url)
        );
        let rows = self.query(&sql).await?;
        let wkt = first_string(&rows, "bbox", Facet::Bbox)?;
        parse_wkt_rings(&wkt)
    }

    /// Geometry type of the first row, normalized (`MULTI_POLYGON` -> `MultiPolygon`).
    pub async fn geometry_type(&self, url: &str) -> Result<String> {
        let sql = format!(
            "SELECT ST_GeometryType({}) AS geometry_type FROM read_parquet({}) LIMIT 1;",
            self.geometry_expr(),
            quote_literal(url)
        );
        let rows = self.query(&sql).await?;
        let raw = first_string(&rows, "geometry_type", Facet::GeometryType)?;
        Ok(normalize_geometry_type(&raw))
    }
}

#[async_trait]
impl MetadataExtractor for DuckDbExtractor {
    fn name(&self) -> &'static str {
        TOOL
    }

    async fn extract(&self, resource: &ResourceRef) -> Result<Facets> {
        let url = resource.url.as_str();

        let columns = facet(url, Facet::Columns, self.columns(url)).await;
        let bbox = facet(url, Facet::Bbox, self.bbox(url)).await;
        let geometry_type = facet(url, Facet::GeometryType, self.geometry_type(url)).await;

        Ok(Facets {
            columns,
            bbox,
            geometry_type,
        })
    }
}

/// Await one facet query, logging its timing and turning failure into absence.
async fn facet<T>(url: &str, facet: Facet, query: impl Future<Output = Result<T>>) -> Option<T> {
    let start = Instant::now();
    match query.await {
        Ok(value) => {
            debug!(
                url = url,
                facet = %facet,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Facet extracted"
            );
            Some(value)
        }
        Err(e) => {
            warn!(
                url = url,
                facet = %facet,
                elapsed_ms = start.elapsed().as_millis() as u64,
                error = %e,
                "Facet extraction failed"
            );
            None
        }
    }
}

/// SQL string literal.
fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// SQL quoted identifier.
fn quote_ident(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Rows of the last result set printed by `duckdb -json`.
///
/// Setup statements print nothing; an empty result prints nothing either.
pub fn parse_json_rows(stdout: &str) -> Result<Vec<Row>> {
    let mut last = None;
    for value in serde_json::Deserializer::from_str(stdout).into_iter::<Vec<Row>>() {
        last = Some(value.map_err(|e| Error::decode(TOOL, e))?);
    }
    Ok(last.unwrap_or_default())
}

/// `DESCRIBE` rows to a column map.
pub fn parse_describe(rows: &[Row]) -> Result<Columns> {
    let mut columns = Columns::new();
    for row in rows {
        let name = row.get("column_name").and_then(Value::as_str);
        let type_name = row.get("column_type").and_then(Value::as_str);
        match (name, type_name) {
            (Some(name), Some(type_name)) => columns.insert(name, type_name),
            _ => {
                return Err(Error::extraction(
                    Facet::Columns,
                    format!("unexpected DESCRIBE row: {}", Value::Object(row.clone())),
                ))
            }
        }
    }

    if columns.is_empty() {
        return Err(Error::extraction(Facet::Columns, "no columns reported"));
    }
    Ok(columns)
}

fn first_string(rows: &[Row], key: &str, facet: Facet) -> Result<String> {
    match rows.first().and_then(|row| row.get(key)) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Null) | None => Err(Error::extraction(facet, "query returned no value")),
        Some(other) => Err(Error::extraction(facet, format!("unexpected value: {other}"))),
    }
}

/// Parse the rings of a WKT polygonal geometry.
///
/// Every innermost parenthesized coordinate list becomes one ring, so
/// `POLYGON`, `MULTIPOLYGON` and a degenerate `POINT` envelope all parse.
/// Any third (Z) ordinate is dropped.
pub fn parse_wkt_rings(wkt: &str) -> Result<Bbox> {
    let mut rings = Vec::new();
    let mut open = None;

    for (i, c) in wkt.char_indices() {
        match c {
            '(' => open = Some(i + 1),
            ')' => {
                if let Some(start) = open.take() {
                    rings.push(parse_ring(&wkt[start..i])?);
                }
            }
            _ => {}
        }
    }

    if rings.is_empty() {
        return Err(Error::extraction(
            Facet::Bbox,
            format!("no coordinates in WKT: {wkt}"),
        ));
    }
    Ok(Bbox::new(rings))
}

fn parse_ring(text: &str) -> Result<Vec<Coord>> {
    text.split(',')
        .map(|pair| {
            let mut ordinates = pair.split_whitespace().map(str::parse::<f64>);
            match (ordinates.next(), ordinates.next()) {
                (Some(Ok(x)), Some(Ok(y))) => Ok([x, y]),
                _ => Err(Error::extraction(
                    Facet::Bbox,
                    format!("bad coordinate pair: {:?}", pair.trim()),
                )),
            }
        })
        .collect()
}
