//! The nested catalog of discovered files and its persistence.
//!
//! - [`node`] -- The recursive [`DirectoryNode`] tree and its JSON shape.
//! - [`store`] -- Loading and checkpointing the catalog document.

pub mod node;
pub mod store;

use std::fmt;

use geoscout_common::EnrichedItem;

pub use node::{Children, DirectoryNode, ItemSlot, FILES_KEY};
pub use store::{load_catalog, save_catalog, CatalogStore, CheckpointSink};

/// The persisted catalog: a directory tree of enriched items.
pub type Catalog = DirectoryNode<EnrichedItem>;

/// URLs of every file in the catalog, in traversal order.
///
/// This is the enrichment worklist; duplicates are kept.
pub fn collect_resource_urls(catalog: &Catalog) -> Vec<String> {
    catalog.iter_files().map(|item| item.url.clone()).collect()
}

/// Completeness counts across a catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogSummary {
    pub total: usize,
    pub complete: usize,
    pub incomplete: usize,
}

impl CatalogSummary {
    pub fn of(catalog: &Catalog) -> Self {
        let (total, complete) = catalog
            .iter_files()
            .fold((0, 0), |(total, complete), item| {
                (total + 1, complete + usize::from(item.is_complete()))
            });

        Self {
            total,
            complete,
            incomplete: total - complete,
        }
    }
}

impl fmt::Display for CatalogSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} complete, {} incomplete, {} total",
            self.complete, self.incomplete, self.total
        )
    }
}
