//! Self-contained STAC catalog output.
//!
//! Layout under the output directory:
//!
//! ```text
//! catalog.json
//! <collection>/collection.json
//! <collection>/<item>/<item>.json
//! ```
//!
//! Each directory of the catalog that holds files (other than the root)
//! becomes a collection whose id is its path joined with `-`. Every link is
//! relative, so the tree can be moved or uploaded as a unit.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use geoscout_common::{EnrichedItem, Envelope, Error, Result};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{CatalogPublisher, PublishReport};
use crate::catalog::Catalog;
use crate::config::PublishConfig;

pub const STAC_VERSION: &str = "1.0.0";
const FILE_EXTENSION_SCHEMA: &str = "https://stac-extensions.github.io/file/v2.1.0/schema.json";

/// Writes a catalog as STAC JSON documents.
#[derive(Debug, Clone)]
pub struct StacPublisher {
    output_dir: PathBuf,
    catalog_id: String,
    description: String,
    datetime: String,
    media_type: String,
}

impl StacPublisher {
    /// Build from config. Items are stamped with `item_datetime`, or the
    /// current time when unset.
    pub fn from_config(config: &PublishConfig) -> Result<Self> {
        let datetime = match config.item_datetime {
            Some(ref ts) => DateTime::parse_from_rfc3339(ts)
                .map_err(|e| Error::config(format!("invalid item_datetime {ts:?}: {e}")))?
                .with_timezone(&Utc),
            None => Utc::now(),
        };

        Ok(Self {
            output_dir: config.output_dir.clone(),
            catalog_id: config.catalog_id.clone(),
            description: config.description.clone(),
            datetime: datetime.to_rfc3339_opts(SecondsFormat::Secs, true),
            media_type: config.media_type.clone(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn catalog_document(&self, children: &[String]) -> Value {
        let mut links = vec![link("root", "./catalog.json", "application/json")];
        links.extend(
            children
                .iter()
                .map(|id| link("child", &format!("./{id}/collection.json"), "application/json")),
        );

        json!({
            "type": "Catalog",
            "id": self.catalog_id,
            "stac_version": STAC_VERSION,
            "description": self.description,
            "links": links,
        })
    }

    fn collection_document(&self, id: &str, extent: Envelope, item_ids: &[String]) -> Value {
        let mut links = vec![
            link("root", "../catalog.json", "application/json"),
            link("parent", "../catalog.json", "application/json"),
        ];
        links.extend(
            item_ids
                .iter()
                .map(|item| link("item", &format!("./{item}/{item}.json"), "application/geo+json")),
        );

        json!({
            "type": "Collection",
            "id": id,
            "stac_version": STAC_VERSION,
            "description": format!("Files under {id}"),
            "license": "other",
            "extent": {
                "spatial": { "bbox": [extent.to_array()] },
                "temporal": { "interval": [[self.datetime, Value::Null]] },
            },
            "links": links,
        })
    }

    fn item_document(&self, id: &str, collection: &str, item: &EnrichedItem) -> Option<(Value, Envelope)> {
        let bbox = item.bbox()?;
        let envelope = bbox.envelope()?;

        let document = json!({
            "type": "Feature",
            "stac_version": STAC_VERSION,
            "stac_extensions": [FILE_EXTENSION_SCHEMA],
            "id": id,
            "collection": collection,
            "geometry": {
                "type": "Polygon",
                "coordinates": bbox.rings(),
            },
            "bbox": envelope.to_array(),
            "properties": {
                "datetime": self.datetime,
                "geometry_type": item.geometry_type,
                "columns": item.columns,
                "file:size": item.size,
            },
            "assets": {
                "data": {
                    "href": item.url,
                    "title": id,
                    "type": self.media_type,
                    "roles": ["data"],
                },
            },
            "links": [
                link("root", "../../catalog.json", "application/json"),
                link("parent", "../collection.json", "application/json"),
                link("collection", "../collection.json", "application/json"),
            ],
        });

        Some((document, envelope))
    }
}

impl CatalogPublisher for StacPublisher {
    fn publish(&self, catalog: &Catalog) -> Result<PublishReport> {
        let mut report = PublishReport::default();
        let mut collection_ids = Vec::new();

        for (path, files) in catalog.directories() {
            if path.is_empty() {
                if !files.is_empty() {
                    warn!(
                        files = files.len(),
                        "Files at the catalog root belong to no collection; skipping"
                    );
                    report.skipped += files.len();
                }
                continue;
            }

            let collection_id = path.join("-");
            if collection_ids.contains(&collection_id) {
                warn!(
                    path = %path.join("/"),
                    collection = %collection_id,
                    "Collection id already published by another directory; skipping"
                );
                report.skipped += files.len();
                continue;
            }
            let collection_dir = self.output_dir.join(&collection_id);
            let mut item_ids = Vec::new();
            let mut seen = HashSet::new();
            let mut extent: Option<Envelope> = None;

            for item in files {
                let resource = item.resource();
                let item_id = resource.file_stem();

                if !item.is_complete() {
                    warn!(
                        url = %item.url,
                        missing = ?item.missing_facets(),
                        "Skipping incomplete item"
                    );
                    report.skipped += 1;
                    continue;
                }
                if !seen.insert(item_id.to_string()) {
                    warn!(url = %item.url, id = item_id, collection = %collection_id, "Duplicate item id; skipping");
                    report.skipped += 1;
                    continue;
                }

                let Some((document, envelope)) = self.item_document(item_id, &collection_id, item)
                else {
                    report.skipped += 1;
                    continue;
                };

                write_json(
                    &collection_dir.join(item_id).join(format!("{item_id}.json")),
                    &document,
                )?;
                extent = Some(extent.map_or(envelope, |e| e.union(&envelope)));
                item_ids.push(item_id.to_string());
            }

            if item_ids.is_empty() {
                debug!(collection = %collection_id, "No publishable items; collection omitted");
                continue;
            }

            let document =
                self.collection_document(&collection_id, extent.unwrap_or(Envelope::GLOBAL), &item_ids);
            write_json(&collection_dir.join("collection.json"), &document)?;

            report.items += item_ids.len();
            collection_ids.push(collection_id);
        }

        report.collections = collection_ids.len();
        write_json(
            &self.output_dir.join("catalog.json"),
            &self.catalog_document(&collection_ids),
        )?;

        info!(
            output = %self.output_dir.display(),
            collections = report.collections,
            items = report.items,
            skipped = report.skipped,
            "STAC catalog written"
        );
        Ok(report)
    }
}

fn link(rel: &str, href: &str, media_type: &str) -> Value {
    json!({ "rel": rel, "href": href, "type": media_type })
}

fn write_json(path: &Path, value: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| Error::Io(e.into()))?;
    std::fs::write(path, bytes)?;
    Ok(())
}
