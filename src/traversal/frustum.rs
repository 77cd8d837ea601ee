//! Six-plane convex frustum and the visibility classification against it.
//!
//! Grounded on the six-plane convex-region cull the teacher's terrain patch
//! code runs against a sphere of sample points; here the sampled shape is an
//! [`OrientedBoundingBox`](crate::traversal::obb::OrientedBoundingBox)
//! instead, tested by its 8 corners.

use glam::DVec3;

use crate::traversal::obb::OrientedBoundingBox;

/// A half-space `{ p : normal . p + d >= 0 }`. The frustum's six planes all
/// have their normals pointing into the viewing volume.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Plane {
    /// Unit (or at least consistent-scale) outward... inward-pointing
    /// normal.
    pub normal: DVec3,
    /// Offset such that `signed_distance(p) = normal.dot(p) + d`.
    pub d: f64,
}

impl Plane {
    /// Build a plane from a normal and a point it passes through.
    ///
    /// # Arguments
    ///
    /// * `point` - A point the plane passes through.
    /// * `normal` - The plane's inward-facing normal.
    ///
    /// # Return
    ///
    /// The plane through `point` with the given `normal`.
    pub fn from_point_normal(point: DVec3, normal: DVec3) -> Self {
        Self {
            normal,
            d: -normal.dot(point),
        }
    }

    /// Signed distance from `point` to this plane; non-negative means
    /// `point` is on the inside (viewing-volume) side.
    ///
    /// # Arguments
    ///
    /// * `point` - The point to measure.
    ///
    /// # Return
    ///
    /// The signed distance from `point` to the plane.
    pub fn signed_distance(&self, point: DVec3) -> f64 {
        self.normal.dot(point) + self.d
    }
}

/// A camera's view frustum as six inward-facing planes
/// (left, right, top, bottom, near, far).
#[derive(Debug, Copy, Clone)]
pub struct Frustum {
    /// The six bounding planes, in no particular order.
    pub planes: [Plane; 6],
}

/// The result of testing a bounding volume against a [`Frustum`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Visibility {
    /// The volume lies entirely outside at least one plane: cull it.
    Outside,
    /// The volume straddles at least one plane.
    Intersecting,
    /// The volume lies entirely on the inside of every plane.
    Inside,
}

impl Frustum {
    /// Classify an oriented bounding box's visibility by testing its 8
    /// corners against each of the 6 planes.
    ///
    /// # Arguments
    ///
    /// * `obb` - The bounding box to classify.
    ///
    /// # Return
    ///
    /// [`Visibility::Outside`] if some plane has every corner outside it,
    /// [`Visibility::Inside`] if every plane has every corner inside it, and
    /// [`Visibility::Intersecting`] otherwise.
    pub fn classify(&self, obb: &OrientedBoundingBox) -> Visibility {
        let corners = obb.corners();
        let mut any_outside_a_plane = false;
        let mut fully_inside_every_plane = true;

        for plane in &self.planes {
            let mut positive = 0;
            for corner in &corners {
                if plane.signed_distance(*corner) >= 0.0 {
                    positive += 1;
                }
            }
            if positive == 0 {
                any_outside_a_plane = true;
                break;
            }
            if positive < corners.len() {
                fully_inside_every_plane = false;
            }
        }

        if any_outside_a_plane {
            Visibility::Outside
        } else if fully_inside_every_plane {
            Visibility::Inside
        } else {
            Visibility::Intersecting
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn axis_aligned_frustum(half_extent: f64) -> Frustum {
        let planes = [
            Plane::from_point_normal(DVec3::new(-half_extent, 0.0, 0.0), DVec3::X),
            Plane::from_point_normal(DVec3::new(half_extent, 0.0, 0.0), -DVec3::X),
            Plane::from_point_normal(DVec3::new(0.0, -half_extent, 0.0), DVec3::Y),
            Plane::from_point_normal(DVec3::new(0.0, half_extent, 0.0), -DVec3::Y),
            Plane::from_point_normal(DVec3::new(0.0, 0.0, -half_extent), DVec3::Z),
            Plane::from_point_normal(DVec3::new(0.0, 0.0, half_extent), -DVec3::Z),
        ];
        Frustum { planes }
    }

    #[test]
    fn box_inside_cube_frustum_is_inside() {
        let frustum = axis_aligned_frustum(10.0);
        let obb = OrientedBoundingBox::from_points(&[
            DVec3::new(-1.0, -1.0, -1.0),
            DVec3::new(1.0, 1.0, 1.0),
        ]);
        assert_eq!(frustum.classify(&obb), Visibility::Inside);
    }

    #[test]
    fn box_far_away_is_outside() {
        let frustum = axis_aligned_frustum(10.0);
        let obb = OrientedBoundingBox::from_points(&[
            DVec3::new(1000.0, 1000.0, 1000.0),
            DVec3::new(1001.0, 1001.0, 1001.0),
        ]);
        assert_eq!(frustum.classify(&obb), Visibility::Outside);
    }

    #[test]
    fn box_straddling_boundary_is_intersecting() {
        let frustum = axis_aligned_frustum(10.0);
        let obb = OrientedBoundingBox::from_points(&[
            DVec3::new(9.0, 0.0, 0.0),
            DVec3::new(12.0, 1.0, 1.0),
        ]);
        assert_eq!(frustum.classify(&obb), Visibility::Intersecting);
    }
}
