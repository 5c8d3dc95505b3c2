//! Recursive crawler turning a remote listing tree into a directory tree of
//! matching files.
//!
//! Every prefix of a node is crawled in its own task; the node resolves once
//! all of them have finished. A branch that fails (network, decode, or a
//! panicking task) is logged and left out of the parent, so siblings and
//! ancestors are unaffected. A single semaphore caps listing fetches in
//! flight across the whole tree. Prefixes that normalize to a key already
//! seen under the same node are skipped; the first one wins.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::FutureExt;
use geoscout_common::{EnrichedItem, Error, ResourceRef, Result};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::catalog::{Catalog, CatalogStore, DirectoryNode, FILES_KEY};
use crate::config::CrawlConfig;
use crate::listing::{ListingClient, ListingDocument, ListingObject};

/// Default cap on concurrent listing fetches.
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// Directory key for a listing prefix (`"sub/"` becomes `"sub"`).
pub fn prefix_key(prefix: &str) -> &str {
    prefix.trim_matches('/')
}

/// Listing URL of a child directory: exactly one `/` between parent and key,
/// and one trailing `/`.
pub fn child_url(parent: &str, key: &str) -> String {
    format!("{}/{}/", parent.trim_end_matches('/'), key)
}

/// Concurrent listing-tree crawler. Cheap to clone.
#[derive(Clone)]
pub struct TreeCrawler {
    client: ListingClient,
    suffix: Arc<str>,
    permits: Arc<Semaphore>,
}

impl TreeCrawler {
    /// Create a crawler keeping files whose name ends in `.{extension}`.
    ///
    /// `extension` may be given with or without its leading dot.
    pub fn new(client: ListingClient, extension: &str, max_concurrency: usize) -> Self {
        let suffix = format!(".{}", extension.trim_start_matches('.'));
        Self {
            client,
            suffix: suffix.into(),
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    pub fn from_config(config: &CrawlConfig) -> Self {
        let client = ListingClient::new(Duration::from_secs(config.request_timeout_secs));
        Self::new(client, &config.extension, config.max_concurrency)
    }

    /// Walk the tree rooted at `root_url`.
    ///
    /// # Errors
    ///
    /// Only a failure to fetch or decode the root listing itself is returned;
    /// failures below the root drop the affected branch.
    pub async fn crawl(&self, root_url: &str) -> Result<DirectoryNode<ResourceRef>> {
        let start = Instant::now();
        info!(root_url = root_url, suffix = %self.suffix, "Starting crawl");

        let tree = self.clone().crawl_branch(root_url.to_string()).await?;

        info!(
            root_url = root_url,
            files = tree.file_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Crawl complete"
        );
        Ok(tree)
    }

    /// Crawl and write the result as a fresh catalog.
    pub async fn crawl_to_store(&self, root_url: &str, store: &CatalogStore) -> Result<Catalog> {
        let catalog = self.crawl(root_url).await?.map_files(EnrichedItem::from);
        store.save(&catalog)?;
        info!(path = %store.path().display(), "Initial catalog written");
        Ok(catalog)
    }

    fn crawl_branch(self, url: String) -> BoxFuture<'static, Result<DirectoryNode<ResourceRef>>> {
        async move {
            let document = self.fetch(&url).await?;
            let ListingDocument { objects, prefixes } = document;

            let files = objects.map(|objects| self.matching(objects));

            let mut handles = Vec::new();
            let mut seen = HashSet::new();
            for prefix in prefixes.unwrap_or_default() {
                let key = prefix_key(&prefix).to_string();
                if key.is_empty() || key == FILES_KEY {
                    warn!(url = %url, prefix = %prefix, "Ignoring prefix that cannot be a directory key");
                    continue;
                }
                if !seen.insert(key.clone()) {
                    warn!(url = %url, prefix = %prefix, key = %key, "Ignoring repeated directory key");
                    continue;
                }
                let child = tokio::spawn(self.clone().crawl_branch(child_url(&url, &key)));
                handles.push((prefix, key, child));
            }

            let mut children = Vec::with_capacity(handles.len());
            for (prefix, key, handle) in handles {
                match handle.await {
                    Ok(Ok(node)) => children.push((key, node)),
                    Ok(Err(e)) => {
                        error!(url = %url, prefix = %prefix, error = %e, "Skipping branch");
                    }
                    Err(e) => {
                        error!(url = %url, prefix = %prefix, error = %e, "Branch task failed; skipping");
                    }
                }
            }

            Ok(DirectoryNode::from_parts(files, children))
        }
        .boxed()
    }

    async fn fetch(&self, url: &str) -> Result<ListingDocument> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| Error::network(url, e))?;

        let start = Instant::now();
        let result = self.client.fetch(url).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => debug!(url = url, elapsed_ms = elapsed_ms, "Listing fetched"),
            Err(e) => warn!(url = url, elapsed_ms = elapsed_ms, error = %e, "Listing fetch failed"),
        }
        result
    }

    fn matching(&self, objects: Vec<ListingObject>) -> Vec<ResourceRef> {
        objects
            .into_iter()
            .filter(|obj| obj.name.ends_with(&*self.suffix))
            .map(|obj| ResourceRef::new(obj.url, obj.size))
            .collect()
    }
}
