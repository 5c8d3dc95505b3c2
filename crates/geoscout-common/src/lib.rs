//! Geoscout-Common: shared catalog types and errors.
//!
//! This crate provides the value types that flow between the crawler, the
//! catalog store and the enrichment pipeline:
//!
//! - **Resources**: [`ResourceRef`] identifies one discovered file
//! - **Catalog items**: [`EnrichedItem`] carries the metadata facets
//! - **Geometry**: [`Bbox`] rings, [`Envelope`] rectangles, geometry type names
//! - **Error Handling**: the [`Error`] taxonomy and [`Result`] alias
//!
//! # Examples
//!
//! ```
//! use geoscout_common::{EnrichedItem, ResourceRef};
//!
//! let item = EnrichedItem::from(ResourceRef::new("https://example.com/AD.parquet", 100));
//! assert!(!item.is_complete());
//! assert_eq!(item.resource().file_stem(), "AD");
//! ```

pub mod error;
pub mod geometry;
pub mod types;

pub use error::{Error, Result};
pub use geometry::{normalize_geometry_type, Bbox, Coord, Envelope};
pub use types::*;
