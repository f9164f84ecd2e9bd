//! Tilt correction - least-squares reference plane fit and re-projection
//!
//! Modules sit on a vacuum chuck that is never perfectly level under the
//! probe, so every cloud carries a global planar tilt. The sensor surface is
//! the reference: a least-squares plane fit over the `Sensor` group defines
//! the z = 0 datum, and every point in the cloud is re-projected onto it.
//!
//! The fit solves the overdetermined system
//!
//! ```text
//! | x1 y1 1 |   | a |   | z1 |
//! | x2 y2 1 | · | b | ≈ | z2 |
//! |   ...   |   | c |   | .. |
//! ```
//!
//! via SVD rather than the normal equations, which keeps the solve stable
//! when the probed pattern is nearly colinear.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::cloud::{FeatureName, Point3D, PointCloud};

/// Singular values below this (relative to the largest) count as rank loss.
const RANK_EPS: f64 = 1e-10;

/// The reference point set cannot support a plane fit.
#[derive(Debug, Error)]
pub enum DegenerateGeometryError {
    #[error("plane fit needs at least 3 points, found {found}")]
    TooFewPoints { found: usize },

    #[error("plane fit system is singular (points colinear or coincident)")]
    SingularSystem,
}

/// Best-fit plane z = a·x + b·y + c over a reference point set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneFit {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl PlaneFit {
    /// Ordinary least squares over the given points.
    ///
    /// Fails when fewer than 3 points are supplied or when the design matrix
    /// loses rank (all points on a line or coincident).
    pub fn fit(points: &[Point3D]) -> Result<PlaneFit, DegenerateGeometryError> {
        if points.len() < 3 {
            return Err(DegenerateGeometryError::TooFewPoints {
                found: points.len(),
            });
        }

        let design = DMatrix::from_fn(points.len(), 3, |row, col| match col {
            0 => points[row].x,
            1 => points[row].y,
            _ => 1.0,
        });
        let rhs = DVector::from_fn(points.len(), |row, _| points[row].z);

        let svd = design.svd(true, true);
        let max_sv = svd.singular_values.max();
        let eps = max_sv * RANK_EPS;
        if max_sv == 0.0 || svd.rank(eps) < 3 {
            return Err(DegenerateGeometryError::SingularSystem);
        }

        let coeffs = svd
            .solve(&rhs, eps)
            .map_err(|_| DegenerateGeometryError::SingularSystem)?;

        Ok(PlaneFit {
            a: coeffs[0],
            b: coeffs[1],
            c: coeffs[2],
        })
    }

    /// Fit the reference plane over the cloud's `Sensor` group.
    pub fn fit_reference(cloud: &PointCloud) -> Result<PlaneFit, DegenerateGeometryError> {
        let sensor = cloud.points(&FeatureName::sensor()).unwrap_or(&[]);
        PlaneFit::fit(sensor)
    }

    /// Signed distance from a point to the plane along the unit normal.
    ///
    /// A point exactly on the plane maps to 0 and the sign follows the
    /// original z-axis orientation.
    pub fn signed_distance(&self, point: &Point3D) -> f64 {
        -(self.a * point.x + self.b * point.y - point.z + self.c)
            / (self.a * self.a + self.b * self.b + 1.0).sqrt()
    }

    /// Plane height at (x, y).
    pub fn height_at(&self, x: f64, y: f64) -> f64 {
        self.a * x + self.b * y + self.c
    }

    /// Sum of squared z-residuals over a point set.
    pub fn residual_sum_squares(&self, points: &[Point3D]) -> f64 {
        points
            .iter()
            .map(|p| (p.z - self.height_at(p.x, p.y)).powi(2))
            .sum()
    }
}

/// Re-project every point in every feature group onto the fitted plane:
/// z becomes the signed normal distance, x and y stay put. Returns a new
/// cloud; the input is untouched.
pub fn apply_correction(cloud: &PointCloud, fit: &PlaneFit) -> PointCloud {
    cloud.map_points(|p| p.with_z(fit.signed_distance(p)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensor_cloud(points: &[(f64, f64, f64)]) -> PointCloud {
        let mut cloud = PointCloud::new();
        for &(x, y, z) in points {
            cloud.push(FeatureName::sensor(), Point3D::new(x, y, z));
        }
        cloud
    }

    // ===== Fit Tests =====

    #[test]
    fn test_flat_plane_fits_zero() {
        let cloud = sensor_cloud(&[
            (0.0, 0.0, 0.0),
            (10.0, 0.0, 0.0),
            (0.0, 10.0, 0.0),
            (10.0, 10.0, 0.0),
        ]);
        let fit = PlaneFit::fit_reference(&cloud).unwrap();
        assert!(fit.a.abs() < 1e-12);
        assert!(fit.b.abs() < 1e-12);
        assert!(fit.c.abs() < 1e-12);
    }

    #[test]
    fn test_exact_tilted_plane_recovered() {
        // z = 0.1x + 0.05y + 2 exactly
        let pts: Vec<(f64, f64, f64)> = [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (7.0, 3.0)]
            .iter()
            .map(|&(x, y)| (x, y, 0.1 * x + 0.05 * y + 2.0))
            .collect();
        let fit = PlaneFit::fit(
            &pts.iter()
                .map(|&(x, y, z)| Point3D::new(x, y, z))
                .collect::<Vec<_>>(),
        )
        .unwrap();
        assert!((fit.a - 0.1).abs() < 1e-9);
        assert!((fit.b - 0.05).abs() < 1e-9);
        assert!((fit.c - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_too_few_points() {
        let cloud = sensor_cloud(&[(0.0, 0.0, 0.0), (1.0, 0.0, 0.0)]);
        let err = PlaneFit::fit_reference(&cloud).unwrap_err();
        assert!(matches!(
            err,
            DegenerateGeometryError::TooFewPoints { found: 2 }
        ));
    }

    #[test]
    fn test_missing_sensor_group_is_too_few() {
        let cloud = PointCloud::new();
        let err = PlaneFit::fit_reference(&cloud).unwrap_err();
        assert!(matches!(
            err,
            DegenerateGeometryError::TooFewPoints { found: 0 }
        ));
    }

    #[test]
    fn test_colinear_points_are_singular() {
        let cloud = sensor_cloud(&[
            (0.0, 0.0, 0.1),
            (1.0, 1.0, 0.2),
            (2.0, 2.0, 0.3),
            (3.0, 3.0, 0.4),
        ]);
        let err = PlaneFit::fit_reference(&cloud).unwrap_err();
        assert!(matches!(err, DegenerateGeometryError::SingularSystem));
    }

    // ===== Least-Squares Property =====

    #[test]
    fn test_fit_minimizes_squared_residuals() {
        // No nearby perturbation of the coefficients may do better.
        let points: Vec<Point3D> = [
            (0.0, 0.0, 0.02),
            (10.0, 0.0, 0.98),
            (0.0, 10.0, 0.51),
            (10.0, 10.0, 1.53),
            (5.0, 5.0, 0.77),
        ]
        .iter()
        .map(|&(x, y, z)| Point3D::new(x, y, z))
        .collect();

        let fit = PlaneFit::fit(&points).unwrap();
        let best = fit.residual_sum_squares(&points);

        for da in [-0.01, 0.0, 0.01] {
            for db in [-0.01, 0.0, 0.01] {
                for dc in [-0.01, 0.0, 0.01] {
                    let perturbed = PlaneFit {
                        a: fit.a + da,
                        b: fit.b + db,
                        c: fit.c + dc,
                    };
                    assert!(
                        perturbed.residual_sum_squares(&points) >= best - 1e-12,
                        "perturbation ({da}, {db}, {dc}) beat the fit"
                    );
                }
            }
        }
    }

    // ===== Correction Tests =====

    #[test]
    fn test_correction_zeroes_a_flat_tilted_cloud() {
        // Scenario: coplanar sensor points correct to z = 0 everywhere.
        let pts: Vec<(f64, f64, f64)> = [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0)]
            .iter()
            .map(|&(x, y)| (x, y, 0.02 * x - 0.01 * y + 0.5))
            .collect();
        let cloud = sensor_cloud(&pts);
        let fit = PlaneFit::fit_reference(&cloud).unwrap();
        let corrected = apply_correction(&cloud, &fit);
        for p in corrected.points(&FeatureName::sensor()).unwrap() {
            assert!(p.z.abs() < 1e-9, "corrected z {} not ~0", p.z);
        }
    }

    #[test]
    fn test_mean_corrected_reference_z_is_zero() {
        // The fitted plane passes through the centroid, so the corrected
        // reference group averages to zero even with scatter.
        let pts = &[
            (0.0, 0.0, 0.12),
            (10.0, 0.0, 0.33),
            (0.0, 10.0, 0.28),
            (10.0, 10.0, 0.47),
            (5.0, 5.0, 0.25),
            (2.0, 8.0, 0.35),
        ];
        let cloud = sensor_cloud(pts);
        let fit = PlaneFit::fit_reference(&cloud).unwrap();
        let corrected = apply_correction(&cloud, &fit);
        let zs: Vec<f64> = corrected
            .points(&FeatureName::sensor())
            .unwrap()
            .iter()
            .map(|p| p.z)
            .collect();
        let mean = zs.iter().sum::<f64>() / zs.len() as f64;
        assert!(mean.abs() < 1e-9, "mean corrected z {mean} not ~0");
    }

    #[test]
    fn test_correction_applies_to_every_group() {
        let mut cloud = sensor_cloud(&[
            (0.0, 0.0, 0.0),
            (10.0, 0.0, 0.0),
            (0.0, 10.0, 0.0),
            (10.0, 10.0, 0.0),
        ]);
        cloud.push(FeatureName::from("PB_2"), Point3D::new(5.0, 5.0, 0.330));
        let fit = PlaneFit::fit_reference(&cloud).unwrap();
        let corrected = apply_correction(&cloud, &fit);
        let pb = corrected.points(&FeatureName::from("PB_2")).unwrap();
        assert!((pb[0].z - 0.330).abs() < 1e-12);
        assert_eq!(pb[0].x, 5.0);
        assert_eq!(pb[0].y, 5.0);
    }

    #[test]
    fn test_input_cloud_not_mutated() {
        let cloud = sensor_cloud(&[
            (0.0, 0.0, 0.1),
            (10.0, 0.0, 0.3),
            (0.0, 10.0, 0.2),
            (10.0, 10.0, 0.4),
        ]);
        let fit = PlaneFit::fit_reference(&cloud).unwrap();
        let _ = apply_correction(&cloud, &fit);
        assert_eq!(cloud.points(&FeatureName::sensor()).unwrap()[0].z, 0.1);
    }
}
