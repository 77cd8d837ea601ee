//! Oriented bounding boxes built by PCA over a point cloud.
//!
//! Ports the `makeOrientedBoundingBoxFromPoints` primitive spec §9 calls
//! out as an external dependency the original relies on: principal
//! component analysis of the sampled tile-corner point cloud gives the
//! box's orientation, then each point's projection onto those axes gives
//! its extent.

use glam::DVec3;

/// A box oriented along three orthonormal axes, not necessarily
/// world-aligned.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OrientedBoundingBox {
    /// Box center in the common space the input points were given in.
    pub center: DVec3,
    /// Three orthonormal axes, widest variance first.
    pub axes: [DVec3; 3],
    /// Half-extent along each axis, always non-negative.
    pub half_extents: DVec3,
}

impl OrientedBoundingBox {
    /// Build an OBB from a point cloud via PCA: the covariance matrix's
    /// eigenvectors give the orientation, then each point's projection onto
    /// those axes gives the extent along them.
    ///
    /// # Arguments
    ///
    /// * `points` - The point cloud to bound. Must be non-empty.
    ///
    /// # Return
    ///
    /// The smallest-possible oriented box enclosing every point.
    ///
    /// # Panics
    ///
    /// Panics if `points` is empty.
    pub fn from_points(points: &[DVec3]) -> Self {
        assert!(!points.is_empty(), "OBB needs at least one point");

        let n = points.len() as f64;
        let mean = points.iter().fold(DVec3::ZERO, |acc, &p| acc + p) / n;

        let mut cov = [[0.0f64; 3]; 3];
        for &p in points {
            let d = p - mean;
            let d = [d.x, d.y, d.z];
            for i in 0..3 {
                for j in 0..3 {
                    cov[i][j] += d[i] * d[j];
                }
            }
        }
        for row in cov.iter_mut() {
            for v in row.iter_mut() {
                *v /= n;
            }
        }

        let axes = jacobi_eigenvectors(cov);

        let mut min_proj = [f64::INFINITY; 3];
        let mut max_proj = [f64::NEG_INFINITY; 3];
        for &p in points {
            for (i, axis) in axes.iter().enumerate() {
                let proj = axis.dot(p);
                min_proj[i] = min_proj[i].min(proj);
                max_proj[i] = max_proj[i].max(proj);
            }
        }

        let half_extents = DVec3::new(
            (max_proj[0] - min_proj[0]) / 2.0,
            (max_proj[1] - min_proj[1]) / 2.0,
            (max_proj[2] - min_proj[2]) / 2.0,
        );
        let center = axes[0] * (min_proj[0] + max_proj[0]) / 2.0
            + axes[1] * (min_proj[1] + max_proj[1]) / 2.0
            + axes[2] * (min_proj[2] + max_proj[2]) / 2.0;

        Self {
            center,
            axes,
            half_extents,
        }
    }

    /// The 8 corners of the box, in no particular winding order.
    ///
    /// # Return
    ///
    /// The box's 8 corner points in the same space as `center`.
    pub fn corners(&self) -> [DVec3; 8] {
        let mut out = [DVec3::ZERO; 8];
        let signs = [-1.0, 1.0];
        let mut idx = 0;
        for &sx in &signs {
            for &sy in &signs {
                for &sz in &signs {
                    out[idx] = self.center
                        + self.axes[0] * (sx * self.half_extents.x)
                        + self.axes[1] * (sy * self.half_extents.y)
                        + self.axes[2] * (sz * self.half_extents.z);
                    idx += 1;
                }
            }
        }
        out
    }

    /// Closest distance from `point` to the box (0 if `point` is inside).
    ///
    /// # Arguments
    ///
    /// * `point` - The point to measure from, in the box's space.
    ///
    /// # Return
    ///
    /// The Euclidean distance from `point` to the box surface, or `0.0` if
    /// `point` is inside the box.
    pub fn distance_to(&self, point: DVec3) -> f64 {
        let local = point - self.center;
        let mut closest_local = DVec3::ZERO;
        let extents = [self.half_extents.x, self.half_extents.y, self.half_extents.z];
        for (i, axis) in self.axes.iter().enumerate() {
            let proj = local.dot(*axis).clamp(-extents[i], extents[i]);
            closest_local += *axis * proj;
        }
        let closest = self.center + closest_local;
        (point - closest).length()
    }
}

/// Jacobi eigenvalue algorithm for a symmetric 3x3 matrix, returning its
/// eigenvectors sorted by decreasing eigenvalue (widest spread first).
///
/// Cyclic sweeps over the three off-diagonal entries; converges in a
/// handful of sweeps for 3x3 in practice, so a fixed sweep count is used
/// rather than a convergence check.
fn jacobi_eigenvectors(mut a: [[f64; 3]; 3]) -> [DVec3; 3] {
    let mut v = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

    for _ in 0..30 {
        // Find the largest off-diagonal entry.
        let (mut p, mut q, mut max_val) = (0usize, 1usize, a[0][1].abs());
        for (i, j) in [(0, 2), (1, 2)] {
            if a[i][j].abs() > max_val {
                max_val = a[i][j].abs();
                p = i;
                q = j;
            }
        }
        if max_val < 1e-14 {
            break;
        }

        let theta = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
        let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
        let c = 1.0 / (t * t + 1.0).sqrt();
        let s = t * c;

        let a_pp = a[p][p];
        let a_qq = a[q][q];
        let a_pq = a[p][q];
        a[p][p] = c * c * a_pp - 2.0 * s * c * a_pq + s * s * a_qq;
        a[q][q] = s * s * a_pp + 2.0 * s * c * a_pq + c * c * a_qq;
        a[p][q] = 0.0;
        a[q][p] = 0.0;

        for i in 0..3 {
            if i != p && i != q {
                let a_ip = a[i][p];
                let a_iq = a[i][q];
                a[i][p] = c * a_ip - s * a_iq;
                a[p][i] = a[i][p];
                a[i][q] = s * a_ip + c * a_iq;
                a[q][i] = a[i][q];
            }
        }

        for i in 0..3 {
            let v_ip = v[i][p];
            let v_iq = v[i][q];
            v[i][p] = c * v_ip - s * v_iq;
            v[i][q] = s * v_ip + c * v_iq;
        }
    }

    let mut eigenpairs: Vec<(f64, DVec3)> = (0..3)
        .map(|i| (a[i][i], DVec3::new(v[0][i], v[1][i], v[2][i]).normalize_or_zero()))
        .collect();
    // `partial_cmp` returns `None` for a NaN eigenvalue, which a
    // NaN/infinite input point (e.g. a Web Mercator projection singular at
    // the poles) can produce; fall back to `Equal` rather than panicking so
    // a degenerate source bbox doesn't crash traversal.
    eigenpairs.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    [eigenpairs[0].1, eigenpairs[1].1, eigenpairs[2].1]
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn axis_aligned_cube_extents() {
        let points = [
            DVec3::new(-1.0, -2.0, -3.0),
            DVec3::new(1.0, -2.0, -3.0),
            DVec3::new(-1.0, 2.0, -3.0),
            DVec3::new(-1.0, -2.0, 3.0),
            DVec3::new(1.0, 2.0, 3.0),
        ];
        let obb = OrientedBoundingBox::from_points(&points);
        assert!((obb.center - DVec3::ZERO).length() < 1e-6);
        let mut extents = [obb.half_extents.x, obb.half_extents.y, obb.half_extents.z];
        extents.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((extents[0] - 1.0).abs() < 1e-6);
        assert!((extents[1] - 2.0).abs() < 1e-6);
        assert!((extents[2] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn distance_to_contains_point_inside_is_zero() {
        let points = [DVec3::new(-1.0, -1.0, -1.0), DVec3::new(1.0, 1.0, 1.0)];
        let obb = OrientedBoundingBox::from_points(&points);
        assert_eq!(obb.distance_to(DVec3::ZERO), 0.0);
    }

    #[test]
    fn distance_to_outside_point_is_positive() {
        let points = [DVec3::new(-1.0, -1.0, -1.0), DVec3::new(1.0, 1.0, 1.0)];
        let obb = OrientedBoundingBox::from_points(&points);
        assert!(obb.distance_to(DVec3::new(10.0, 0.0, 0.0)) > 0.0);
    }
}
