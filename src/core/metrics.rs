//! Derived metrics - bow, positions, glue thickness, component heights
//!
//! Every function here consumes the tilt-corrected cloud and reports in
//! micrometers unless noted. All outputs are truncated toward zero to two
//! decimal places before comparison or display; truncation, not rounding,
//! is the contract the downstream database expects.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::classify::{categorize, is_chip_region, is_modified_powerboard, Category};
use crate::core::cloud::{FeatureName, Point3D, PointCloud};
use crate::core::config::FlexThickness;
use crate::core::positions::ReferencePositionTable;

/// Millimeters to micrometers.
const MM_TO_UM: f64 = 1000.0;

#[derive(Debug, Error)]
pub enum MetricError {
    #[error("feature group '{0}' has no points")]
    EmptyFeature(FeatureName),

    #[error("feature '{0}' required by the position table is absent from the cloud")]
    MissingFeature(FeatureName),
}

/// Truncate toward zero to two decimal places: 2.567 -> 2.56, -2.567 -> -2.56.
pub fn truncate2(value: f64) -> f64 {
    (value * 100.0).trunc() / 100.0
}

/// Bow direction, classified by which z-extremum lies nearer the geometric
/// center of the sensor's bounding extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Concavity {
    ConcaveUp,
    ConcaveDown,
}

impl std::fmt::Display for Concavity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Concavity::ConcaveUp => write!(f, "concave-up"),
            Concavity::ConcaveDown => write!(f, "concave-down"),
        }
    }
}

/// Signed peak-to-valley deformation of the sensor surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BowResult {
    /// Bow in micrometers, negative for concave-down surfaces
    pub bow_um: f64,
    pub concavity: Concavity,
}

/// Per-axis deviation from the expected design position, micrometers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionDeviation {
    pub dx_um: f64,
    pub dy_um: f64,
}

/// Positional deviations split by sub-assembly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionDeviations {
    /// Hybrid fiducials (names carrying an `H` marker)
    pub hybrid: BTreeMap<FeatureName, PositionDeviation>,

    /// Powerboard fiducials; `None` on module variants without a powerboard
    pub powerboard: Option<BTreeMap<FeatureName, PositionDeviation>>,
}

/// Glue-bond thickness metrics per component group, micrometers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlueMetrics {
    /// All hybrid glue-gap features (both rows)
    pub hybrid: BTreeMap<FeatureName, f64>,

    /// Chip-footprint subset of hybrid row 0
    pub abc_row0: BTreeMap<FeatureName, f64>,

    /// Chip-footprint subset of hybrid row 1
    pub abc_row1: BTreeMap<FeatureName, f64>,

    /// All powerboard glue-gap features; `None` when absent from the variant
    pub powerboard: Option<BTreeMap<FeatureName, f64>>,

    /// Powerboard positions 0-4, the bucket the average check runs on
    pub powerboard_modified: BTreeMap<FeatureName, f64>,
}

/// The complete derived-metric set for one measurement session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    /// Sensor bow; only computed by the bow flow
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bow: Option<BowResult>,

    pub positions: PositionDeviations,

    pub glue: GlueMetrics,

    /// Capacitor heights; `None` when the variant carries no capacitors
    pub capacitor_heights: Option<BTreeMap<FeatureName, f64>>,

    /// Maximum shield height; `None` when no shield points were probed
    pub shield_height_um: Option<f64>,
}

/// Compute sensor bow from the corrected cloud.
///
/// The extremum nearer the geometric center `(max_x/2, max_y/2)` decides
/// concavity: center-high surfaces are concave-down and report a negative
/// bow, center-low surfaces concave-up and positive.
pub fn compute_bow(cloud: &PointCloud) -> Result<BowResult, MetricError> {
    let sensor = FeatureName::sensor();
    let points = cloud
        .points(&sensor)
        .filter(|pts| !pts.is_empty())
        .ok_or_else(|| MetricError::EmptyFeature(sensor.clone()))?;

    let mut max_p = points[0];
    let mut min_p = points[0];
    let mut max_x = points[0].x;
    let mut max_y = points[0].y;
    for p in &points[1..] {
        if p.z > max_p.z {
            max_p = *p;
        }
        if p.z < min_p.z {
            min_p = *p;
        }
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    let mid_x = max_x / 2.0;
    let mid_y = max_y / 2.0;
    let d_max = max_p.planar_distance(mid_x, mid_y);
    let d_min = min_p.planar_distance(mid_x, mid_y);

    let (bow, concavity) = if d_max < d_min {
        ((min_p.z - max_p.z) * MM_TO_UM, Concavity::ConcaveDown)
    } else {
        ((max_p.z - min_p.z) * MM_TO_UM, Concavity::ConcaveUp)
    };

    Ok(BowResult {
        bow_um: truncate2(bow),
        concavity,
    })
}

/// Compute per-axis positional deviations against the reference table.
///
/// Only features present in both the cloud and the table contribute; the
/// measured position is the feature's first probed point. With `strict` set,
/// a table feature missing from the cloud is an error; otherwise it is
/// skipped (position analysis optional for the module type).
pub fn compute_position_deviations(
    cloud: &PointCloud,
    table: &ReferencePositionTable,
    strict: bool,
) -> Result<PositionDeviations, MetricError> {
    let mut hybrid = BTreeMap::new();
    let mut powerboard = BTreeMap::new();

    for (name, expected) in table.iter() {
        let Some(points) = cloud.points(name).filter(|pts| !pts.is_empty()) else {
            if strict {
                return Err(MetricError::MissingFeature(name.clone()));
            }
            continue;
        };
        let measured = points[0];
        let deviation = PositionDeviation {
            dx_um: truncate2((measured.x - expected.x) * MM_TO_UM),
            dy_um: truncate2((measured.y - expected.y) * MM_TO_UM),
        };
        if name.as_str().contains('H') {
            hybrid.insert(name.clone(), deviation);
        } else {
            powerboard.insert(name.clone(), deviation);
        }
    }

    Ok(PositionDeviations {
        hybrid,
        powerboard: none_if_empty(powerboard),
    })
}

/// Compute glue-bond thickness per glue-gap feature: mean corrected z in
/// micrometers minus the component type's nominal flex thickness.
pub fn compute_glue_thickness(cloud: &PointCloud, flex: &FlexThickness) -> GlueMetrics {
    let mut metrics = GlueMetrics::default();
    let mut powerboard = BTreeMap::new();

    for (name, points) in cloud.iter() {
        if points.is_empty() {
            continue;
        }
        match categorize(name.as_str()) {
            Some(Category::HybridRow0Glue) => {
                let thickness = glue_thickness(points, flex.hybrid_um);
                metrics.hybrid.insert(name.clone(), thickness);
                if is_chip_region(name) {
                    metrics.abc_row0.insert(name.clone(), thickness);
                }
            }
            Some(Category::HybridRow1Glue) => {
                let thickness = glue_thickness(points, flex.hybrid_um);
                metrics.hybrid.insert(name.clone(), thickness);
                if is_chip_region(name) {
                    metrics.abc_row1.insert(name.clone(), thickness);
                }
            }
            Some(Category::PowerboardGlue) => {
                let thickness = glue_thickness(points, flex.powerboard_um);
                powerboard.insert(name.clone(), thickness);
                if is_modified_powerboard(name) {
                    metrics.powerboard_modified.insert(name.clone(), thickness);
                }
            }
            _ => {}
        }
    }

    metrics.powerboard = none_if_empty(powerboard);
    metrics
}

fn glue_thickness(points: &[Point3D], flex_um: f64) -> f64 {
    truncate2(mean_z(points) * MM_TO_UM - flex_um)
}

/// Mean corrected z per capacitor feature, micrometers. `None` when the
/// variant carries no capacitors.
pub fn compute_capacitor_heights(cloud: &PointCloud) -> Option<BTreeMap<FeatureName, f64>> {
    let mut heights = BTreeMap::new();
    for (name, points) in cloud.iter() {
        if categorize(name.as_str()) == Some(Category::Capacitor) && !points.is_empty() {
            heights.insert(name.clone(), truncate2(mean_z(points) * MM_TO_UM));
        }
    }
    none_if_empty(heights)
}

/// Maximum corrected z across all shield points, micrometers. `None` when no
/// shield was probed (not an error; some variants have none).
pub fn compute_shield_height(cloud: &PointCloud) -> Option<f64> {
    cloud
        .iter()
        .filter(|(name, _)| categorize(name.as_str()) == Some(Category::Shield))
        .flat_map(|(_, points)| points.iter())
        .map(|p| p.z)
        .reduce(f64::max)
        .map(|z| truncate2(z * MM_TO_UM))
}

/// Compute the full metrology metric set (everything but bow).
pub fn compute_metrics(
    cloud: &PointCloud,
    table: &ReferencePositionTable,
    flex: &FlexThickness,
    strict_positions: bool,
) -> Result<DerivedMetrics, MetricError> {
    Ok(DerivedMetrics {
        bow: None,
        positions: compute_position_deviations(cloud, table, strict_positions)?,
        glue: compute_glue_thickness(cloud, flex),
        capacitor_heights: compute_capacitor_heights(cloud),
        shield_height_um: compute_shield_height(cloud),
    })
}

fn mean_z(points: &[Point3D]) -> f64 {
    points.iter().map(|p| p.z).sum::<f64>() / points.len() as f64
}

fn none_if_empty<K, V>(map: BTreeMap<K, V>) -> Option<BTreeMap<K, V>> {
    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}
