//! Turning an enriched catalog into a published document set.

pub mod stac;

use std::fmt;

use geoscout_common::Result;

use crate::catalog::Catalog;

pub use stac::StacPublisher;

/// Consumes the final catalog state and emits a published format.
pub trait CatalogPublisher {
    fn publish(&self, catalog: &Catalog) -> Result<PublishReport>;
}

/// Counts of what a publish wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub collections: usize,
    pub items: usize,
    /// Files left out (incomplete, outside any collection, or duplicate ids).
    pub skipped: usize,
}

impl fmt::Display for PublishReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} collections, {} items, {} skipped",
            self.collections, self.items, self.skipped
        )
    }
}
