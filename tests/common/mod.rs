//! Shared test harness for integration tests.
//!
//! Provides a wiremock-backed listing service ([`ListingServer`]), a
//! [`StubExtractor`] returning canned facets, and a [`CountingSink`] that
//! forwards checkpoints to a real [`CatalogStore`] while counting them.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use geoscout::catalog::{Catalog, CatalogStore, CheckpointSink};
use geoscout::crawler::TreeCrawler;
use geoscout::extract::MetadataExtractor;
use geoscout::listing::ListingClient;
use geoscout_common::{Bbox, Error, Facets, ResourceRef, Result};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A mock listing service.
pub struct ListingServer {
    pub server: MockServer,
}

impl ListingServer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Absolute URL for a path on the mock server.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.server.uri(), path)
    }

    /// Serve `body` as the listing at `path`.
    pub async fn listing(&self, at: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Serve `response` at `path`.
    pub async fn respond(&self, at: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// A listing object entry for a file under `dir`.
    pub fn object(&self, dir: &str, name: &str, size: u64) -> Value {
        json!({
            "name": name,
            "url": self.url(&format!("{dir}{name}")),
            "size": size,
        })
    }

    /// Mount the two-level tree used across the tests:
    ///
    /// ```text
    /// /root/      AD.parquet (100), prefixes [sub/]
    /// /root/sub/  AE.parquet (50)
    /// ```
    pub async fn mount_basic_tree(&self) {
        self.listing(
            "/root/",
            json!({
                "objects": [self.object("/root/", "AD.parquet", 100)],
                "prefixes": ["sub/"],
            }),
        )
        .await;
        self.listing(
            "/root/sub/",
            json!({ "objects": [self.object("/root/sub/", "AE.parquet", 50)] }),
        )
        .await;
    }
}

pub fn crawler(max_concurrency: usize) -> TreeCrawler {
    TreeCrawler::new(ListingClient::default(), "parquet", max_concurrency)
}

/// The facets every stub extraction returns unless overridden.
pub fn polygon_facets() -> Facets {
    Facets {
        columns: Some([("geometry", "BLOB")].into_iter().collect()),
        bbox: Some(Bbox::new(vec![vec![
            [0.0, 0.0],
            [0.0, 1.0],
            [1.0, 1.0],
            [1.0, 0.0],
            [0.0, 0.0],
        ]])),
        geometry_type: Some("Polygon".into()),
    }
}

/// Extractor with canned answers, keyed by URL suffix.
#[derive(Default)]
pub struct StubExtractor {
    default: Facets,
    overrides: HashMap<String, Option<Facets>>,
    calls: Mutex<Vec<String>>,
}

impl StubExtractor {
    pub fn new(default: Facets) -> Self {
        Self {
            default,
            ..Default::default()
        }
    }

    /// Return `facets` for URLs ending in `suffix`.
    pub fn with(mut self, suffix: &str, facets: Facets) -> Self {
        self.overrides.insert(suffix.to_string(), Some(facets));
        self
    }

    /// Fail the whole call for URLs ending in `suffix`.
    pub fn failing(mut self, suffix: &str) -> Self {
        self.overrides.insert(suffix.to_string(), None);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataExtractor for StubExtractor {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn extract(&self, resource: &ResourceRef) -> Result<Facets> {
        self.calls.lock().unwrap().push(resource.url.clone());
        let answer = self
            .overrides
            .iter()
            .find(|(suffix, _)| resource.url.ends_with(suffix.as_str()))
            .map(|(_, answer)| answer.clone())
            .unwrap_or_else(|| Some(self.default.clone()));

        answer.ok_or_else(|| Error::tool("stub", format!("cannot read {}", resource.url)))
    }
}

/// Checkpoint sink writing through to a store and counting writes.
pub struct CountingSink {
    pub store: CatalogStore,
    count: AtomicUsize,
}

impl CountingSink {
    pub fn new(store: CatalogStore) -> Arc<Self> {
        Arc::new(Self {
            store,
            count: AtomicUsize::new(0),
        })
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl CheckpointSink for CountingSink {
    fn checkpoint(&self, catalog: &Catalog) -> Result<()> {
        self.store.save(catalog)?;
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
