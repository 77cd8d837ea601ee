//! Geometric predicates shared by the mesh refiner and tile traversal.

use glam::DVec2;

/// 2-D orientation predicate: the signed area of `(a, b, c)` times two.
///
/// Positive when `c` lies left of the directed line `a -> b` (i.e. `(a,b,c)`
/// is counter-clockwise), negative when right, zero when collinear.
///
/// # Arguments
///
/// * `a` - First point of the directed line.
/// * `b` - Second point of the directed line.
/// * `c` - The point being classified against the line `a -> b`.
///
/// # Return
///
/// Twice the signed area of the triangle `(a, b, c)`: positive, negative, or
/// zero according to `c`'s side of the line.
#[inline(always)]
pub fn orient2d(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// In-circle predicate: `true` iff `d` lies strictly inside the circumcircle
/// of `(a, b, c)`, assuming `(a, b, c)` is wound counter-clockwise.
///
/// Standard signed-determinant formulation (Guibas-Stolfi), evaluated over
/// `f64` without exact-arithmetic fallback — adequate for UV-space meshes at
/// the scale this crate deals in (spec'd numerical semantics: no robust
/// predicates, no epsilon).
///
/// # Arguments
///
/// * `a` - First vertex of the triangle whose circumcircle is tested.
/// * `b` - Second vertex of the triangle.
/// * `c` - Third vertex of the triangle.
/// * `d` - The point being tested against the triangle's circumcircle.
///
/// # Return
///
/// `true` if `d` lies strictly inside the circumcircle of `(a, b, c)`.
#[inline(always)]
pub fn in_circle(a: DVec2, b: DVec2, c: DVec2, d: DVec2) -> bool {
    let adx = a.x - d.x;
    let ady = a.y - d.y;
    let bdx = b.x - d.x;
    let bdy = b.y - d.y;
    let cdx = c.x - d.x;
    let cdy = c.y - d.y;

    let ad_sq = adx * adx + ady * ady;
    let bd_sq = bdx * bdx + bdy * bdy;
    let cd_sq = cdx * cdx + cdy * cdy;

    let det = adx * (bdy * cd_sq - bd_sq * cdy) - ady * (bdx * cd_sq - bd_sq * cdx)
        + ad_sq * (bdx * cdy - bdy * cdx);
    det > 0.0
}
