//! Bounding geometry and geometry type names.
//!
//! A [`Bbox`] is stored the way the query engine reports an envelope: a list
//! of polygon rings, each ring a list of `[x, y]` pairs. Downstream consumers
//! usually want the enclosing rectangle, see [`Bbox::envelope`].

use serde::{Deserialize, Serialize};

/// A single `[x, y]` coordinate pair.
pub type Coord = [f64; 2];

/// Minimum number of coordinate pairs for a ring to describe an area.
const MIN_RING_LEN: usize = 3;

/// Polygon rings describing the spatial extent of a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bbox(pub Vec<Vec<Coord>>);

impl Bbox {
    /// Create a bbox from polygon rings.
    pub fn new(rings: Vec<Vec<Coord>>) -> Self {
        Self(rings)
    }

    /// The polygon rings.
    pub fn rings(&self) -> &[Vec<Coord>] {
        &self.0
    }

    /// Returns `true` when no ring is present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` when at least one ring has enough points to enclose an area.
    pub fn is_well_formed(&self) -> bool {
        self.0.iter().any(|ring| ring.len() >= MIN_RING_LEN)
    }

    /// Enclosing rectangle over every ring.
    ///
    /// Holes and disjoint parts all contribute, so the result covers the
    /// full extent of multi-ring geometries.
    pub fn envelope(&self) -> Option<Envelope> {
        Envelope::from_coords(self.0.iter().flatten())
    }

    /// Enclosing rectangle of the first ring only.
    ///
    /// Matches catalogs produced by earlier tooling, which ignored every ring
    /// after the first.
    pub fn first_ring_envelope(&self) -> Option<Envelope> {
        self.0.first().and_then(|ring| Envelope::from_coords(ring))
    }
}

/// Axis-aligned rectangle `[minX, minY, maxX, maxY]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    /// The whole WGS84 coordinate space.
    pub const GLOBAL: Envelope = Envelope {
        min_x: -180.0,
        min_y: -90.0,
        max_x: 180.0,
        max_y: 90.0,
    };

    /// Smallest rectangle containing every coordinate, or `None` when empty.
    pub fn from_coords<'a>(coords: impl IntoIterator<Item = &'a Coord>) -> Option<Self> {
        coords.into_iter().fold(None, |acc, &[x, y]| {
            Some(match acc {
                None => Envelope {
                    min_x: x,
                    min_y: y,
                    max_x: x,
                    max_y: y,
                },
                Some(e) => Envelope {
                    min_x: e.min_x.min(x),
                    min_y: e.min_y.min(y),
                    max_x: e.max_x.max(x),
                    max_y: e.max_y.max(y),
                },
            })
        })
    }

    /// Smallest rectangle containing both rectangles.
    pub fn union(&self, other: &Envelope) -> Envelope {
        Envelope {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// `[minX, minY, maxX, maxY]`.
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}

/// Simple Features type names in their GeoJSON spelling, keyed by the
/// upper-case form with separators removed.
const KNOWN_GEOMETRY_TYPES: &[(&str, &str)] = &[
    ("POINT", "Point"),
    ("LINESTRING", "LineString"),
    ("POLYGON", "Polygon"),
    ("MULTIPOINT", "MultiPoint"),
    ("MULTILINESTRING", "MultiLineString"),
    ("MULTIPOLYGON", "MultiPolygon"),
    ("GEOMETRYCOLLECTION", "GeometryCollection"),
];

/// Normalize a geometry type name reported by the query engine.
///
/// `MULTI_POLYGON`, `MULTIPOLYGON` and `multipolygon` all become
/// `MultiPolygon`. Unknown names are capitalized word by word on `_`.
pub fn normalize_geometry_type(raw: &str) -> String {
    let raw = raw.trim();
    let compact: String = raw
        .chars()
        .filter(|c| *c != '_' && !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();

    if let Some((_, name)) = KNOWN_GEOMETRY_TYPES.iter().find(|(k, _)| *k == compact) {
        return (*name).to_string();
    }

    raw.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect()
}
