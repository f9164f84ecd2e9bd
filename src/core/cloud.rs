//! Point cloud types - measured points grouped by feature
//!
//! A `PointCloud` maps canonical feature names to the ordered list of points
//! probed on that feature. Feature names sort in natural (length-aware)
//! order, so `PB_2` comes before `PB_10` in every listing.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single measured point in millimeters.
///
/// Points are immutable once parsed; tilt correction produces new points
/// rather than mutating the originals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Point3D { x, y, z }
    }

    /// Planar (x, y) distance to another point, ignoring z.
    pub fn planar_distance(&self, other_x: f64, other_y: f64) -> f64 {
        ((self.x - other_x).powi(2) + (self.y - other_y).powi(2)).sqrt()
    }

    /// Same point with a replacement z coordinate.
    pub fn with_z(&self, z: f64) -> Self {
        Point3D { z, ..*self }
    }
}

/// Canonical identity of a physical feature instance (e.g. `Sensor`, `PB_2`).
///
/// Ordering is natural: digit runs compare numerically before falling back to
/// the plain string, so capacitor and powerboard indices list in human order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureName(String);

impl FeatureName {
    pub fn new(name: impl Into<String>) -> Self {
        FeatureName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The fixed name of the tilt-reference group (the vacuum-chuck surface).
    pub fn sensor() -> Self {
        FeatureName("Sensor".to_string())
    }
}

impl std::fmt::Display for FeatureName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FeatureName {
    fn from(s: &str) -> Self {
        FeatureName(s.to_string())
    }
}

/// One piece of a natural sort key: either a digit run or a text run.
#[derive(Debug, PartialEq, Eq)]
enum KeyPiece<'a> {
    Num(u64),
    Text(&'a str),
}

/// Split a name into alternating text and digit runs.
fn natural_pieces(s: &str) -> Vec<KeyPiece<'_>> {
    let mut pieces = Vec::new();
    let mut rest = s;
    while let Some(first) = rest.chars().next() {
        let digits = first.is_ascii_digit();
        let split = rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digits)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (run, tail) = rest.split_at(split);
        if digits {
            // Runs longer than u64 would overflow; CMM labels never get there.
            pieces.push(run.parse().map(KeyPiece::Num).unwrap_or(KeyPiece::Text(run)));
        } else {
            pieces.push(KeyPiece::Text(run));
        }
        rest = tail;
    }
    pieces
}

impl Ord for FeatureName {
    fn cmp(&self, other: &Self) -> Ordering {
        let a = natural_pieces(&self.0);
        let b = natural_pieces(&other.0);
        for (pa, pb) in a.iter().zip(b.iter()) {
            let ord = match (pa, pb) {
                (KeyPiece::Num(x), KeyPiece::Num(y)) => x.cmp(y),
                (KeyPiece::Text(x), KeyPiece::Text(y)) => x.cmp(y),
                // Digit runs sort ahead of text runs, as in human ordering.
                (KeyPiece::Num(_), KeyPiece::Text(_)) => Ordering::Less,
                (KeyPiece::Text(_), KeyPiece::Num(_)) => Ordering::Greater,
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        // Tie-break on the raw string so Ord stays consistent with Eq
        // (e.g. "C01" vs "C1" share a natural key).
        a.len().cmp(&b.len()).then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for FeatureName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Measured points grouped by canonical feature name.
///
/// Iteration order follows the natural ordering of `FeatureName`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    features: BTreeMap<FeatureName, Vec<Point3D>>,
}

impl PointCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a point to a feature group, creating the group on first use.
    pub fn push(&mut self, name: FeatureName, point: Point3D) {
        self.features.entry(name).or_default().push(point);
    }

    /// Points probed on a feature, in probe order.
    pub fn points(&self, name: &FeatureName) -> Option<&[Point3D]> {
        self.features.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &FeatureName) -> bool {
        self.features.contains_key(name)
    }

    /// Feature groups in natural ascending name order.
    pub fn iter(&self) -> impl Iterator<Item = (&FeatureName, &[Point3D])> {
        self.features.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Number of feature groups.
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// Total number of points across all groups.
    pub fn point_count(&self) -> usize {
        self.features.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// A new cloud with every point transformed, groups unchanged.
    pub fn map_points(&self, mut f: impl FnMut(&Point3D) -> Point3D) -> PointCloud {
        PointCloud {
            features: self
                .features
                .iter()
                .map(|(name, pts)| (name.clone(), pts.iter().map(&mut f).collect()))
                .collect(),
        }
    }
}

impl FromIterator<(FeatureName, Vec<Point3D>)> for PointCloud {
    fn from_iter<I: IntoIterator<Item = (FeatureName, Vec<Point3D>)>>(iter: I) -> Self {
        PointCloud {
            features: iter.into_iter().collect(),
        }
    }
}
