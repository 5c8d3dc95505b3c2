//! Resource and catalog item types.
//!
//! A [`ResourceRef`] is what the crawler discovers. An [`EnrichedItem`] is the
//! same resource as it sits in the persisted catalog, with whatever metadata
//! facets have been extracted so far.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::geometry::Bbox;

/// One discoverable file. Identity is the URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub url: String,
    pub size: u64,
}

impl ResourceRef {
    pub fn new(url: impl Into<String>, size: u64) -> Self {
        Self {
            url: url.into(),
            size,
        }
    }

    /// Last path segment of the URL.
    pub fn file_name(&self) -> &str {
        self.url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.url)
    }

    /// File name without its final extension.
    pub fn file_stem(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(idx) if idx > 0 => &name[..idx],
            _ => name,
        }
    }
}

/// One of the three metadata dimensions attached to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facet {
    Columns,
    Bbox,
    GeometryType,
}

impl Facet {
    pub const ALL: [Facet; 3] = [Facet::Columns, Facet::Bbox, Facet::GeometryType];
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Columns => write!(f, "columns"),
            Self::Bbox => write!(f, "bbox"),
            Self::GeometryType => write!(f, "geometry_type"),
        }
    }
}

/// Column schema: field name to declared type name, in declaration order.
///
/// Serialized as a JSON object. Order is kept so a catalog written by this
/// crate reads back column-for-column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Columns(Vec<(String, String)>);

impl Columns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a column, replacing the type of an existing column of the same name.
    pub fn insert(&mut self, name: impl Into<String>, type_name: impl Into<String>) {
        let name = name.into();
        let type_name = type_name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = type_name,
            None => self.0.push((name, type_name)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, t)| (n.as_str(), t.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Columns {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut columns = Columns::new();
        for (name, type_name) in iter {
            columns.insert(name, type_name);
        }
        columns
    }
}

impl Serialize for Columns {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, type_name) in &self.0 {
            map.serialize_entry(name, type_name)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Columns {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ColumnsVisitor;

        impl<'de> Visitor<'de> for ColumnsVisitor {
            type Value = Columns;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of column name to type name")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Columns, A::Error> {
                let mut columns = Columns::new();
                while let Some((name, type_name)) = access.next_entry::<String, String>()? {
                    columns.insert(name, type_name);
                }
                Ok(columns)
            }
        }

        deserializer.deserialize_map(ColumnsVisitor)
    }
}

/// Facets returned by one extraction call. Absent facets could not be computed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Facets {
    pub columns: Option<Columns>,
    pub bbox: Option<Bbox>,
    pub geometry_type: Option<String>,
}

impl Facets {
    /// Facets that carry a usable (non-empty) value.
    pub fn present(&self) -> Vec<Facet> {
        let mut present = Vec::with_capacity(3);
        if self.columns.as_ref().is_some_and(|c| !c.is_empty()) {
            present.push(Facet::Columns);
        }
        if self.bbox.as_ref().is_some_and(|b| !b.is_empty()) {
            present.push(Facet::Bbox);
        }
        if self.geometry_type.as_ref().is_some_and(|g| !g.is_empty()) {
            present.push(Facet::GeometryType);
        }
        present
    }
}

/// A catalog entry: a resource plus whatever facets have been extracted.
///
/// Completeness is always derived from the facet fields, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedItem {
    pub url: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Columns>,
    /// Raw JSON so that legacy or malformed shapes still load; see [`Self::bbox`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry_type: Option<String>,
    /// Keys this crate does not interpret, carried through load/save untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<ResourceRef> for EnrichedItem {
    fn from(resource: ResourceRef) -> Self {
        Self {
            url: resource.url,
            size: resource.size,
            columns: None,
            bbox: None,
            geometry_type: None,
            extra: Map::new(),
        }
    }
}

impl EnrichedItem {
    pub fn resource(&self) -> ResourceRef {
        ResourceRef::new(self.url.clone(), self.size)
    }

    /// The bbox as polygon rings, or `None` if absent or not ring-shaped.
    pub fn bbox(&self) -> Option<Bbox> {
        self.bbox
            .as_ref()
            .and_then(|value| Bbox::deserialize(value).ok())
    }

    /// Whether one facet is present and well-formed.
    pub fn has_facet(&self, facet: Facet) -> bool {
        match facet {
            Facet::Columns => self.columns.as_ref().is_some_and(|c| !c.is_empty()),
            Facet::Bbox => self.bbox().is_some_and(|b| b.is_well_formed()),
            Facet::GeometryType => self.geometry_type.as_ref().is_some_and(|g| !g.is_empty()),
        }
    }

    /// Facets still needed before the item counts as complete.
    pub fn missing_facets(&self) -> Vec<Facet> {
        Facet::ALL
            .into_iter()
            .filter(|facet| !self.has_facet(*facet))
            .collect()
    }

    /// `true` iff columns are non-empty, the bbox has a ring of at least three
    /// pairs, and the geometry type is a non-empty string.
    pub fn is_complete(&self) -> bool {
        Facet::ALL.into_iter().all(|facet| self.has_facet(facet))
    }

    /// Merge extracted facets into this item.
    ///
    /// Non-empty facets overwrite; absent or empty ones leave the prior value.
    pub fn merge(&mut self, facets: Facets) {
        if let Some(columns) = facets.columns.filter(|c| !c.is_empty()) {
            self.columns = Some(columns);
        }
        if let Some(bbox) = facets.bbox.filter(|b| !b.is_empty()) {
            if let Ok(value) = serde_json::to_value(&bbox) {
                self.bbox = Some(value);
            }
        }
        if let Some(geometry_type) = facets.geometry_type.filter(|g| !g.is_empty()) {
            self.geometry_type = Some(geometry_type);
        }
    }
}
