//! Six-parameter 2-D affine transforms: construction, composition, inversion.
//!
//! An [`Affine`] maps pixel `(col, row)` to a target `(x, y)` by
//! `x' = a*col + b*row + c`, `y' = d*col + e*row + f`. It is the substrate
//! the mesh refiner ([`crate::mesh`]) and the tile-matrix-set model
//! ([`crate::tms`]) compose against.

use crate::error::{Error, Result};

/// A six-parameter affine transform, value-semantic and cheap to copy.
///
/// `x' = a*col + b*row + c`
/// `y' = d*col + e*row + f`
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Affine {
    /// Column scale / x-axis rotation term.
    pub a: f64,
    /// Row shear into x.
    pub b: f64,
    /// X translation.
    pub c: f64,
    /// Column shear into y.
    pub d: f64,
    /// Row scale / y-axis rotation term.
    pub e: f64,
    /// Y translation.
    pub f: f64,
}

impl Affine {
    /// The identity transform: `x' = col`, `y' = row`.
    ///
    /// # Return
    ///
    /// The affine that leaves every point unchanged.
    pub fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 0.0,
            e: 1.0,
            f: 0.0,
        }
    }

    /// A pure translation by `(xoff, yoff)`.
    ///
    /// # Arguments
    ///
    /// * `xoff` - Offset added to `x`.
    /// * `yoff` - Offset added to `y`.
    ///
    /// # Return
    ///
    /// The affine `x' = x + xoff`, `y' = y + yoff`.
    pub fn translation(xoff: f64, yoff: f64) -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: xoff,
            d: 0.0,
            e: 1.0,
            f: yoff,
        }
    }

    /// A pure scale, uniform if `sy` is omitted (pass `sx` again).
    ///
    /// # Arguments
    ///
    /// * `sx` - Scale factor applied to `x`.
    /// * `sy` - Scale factor applied to `y`.
    ///
    /// # Return
    ///
    /// The affine `x' = sx*x`, `y' = sy*y`.
    pub fn scale(sx: f64, sy: f64) -> Self {
        Self {
            a: sx,
            b: 0.0,
            c: 0.0,
            d: 0.0,
            e: sy,
            f: 0.0,
        }
    }

    /// `true` iff `b == 0.0 && d == 0.0`, i.e. this affine has no rotation or
    /// shear and is purely a per-axis scale plus translation. Tile-matrix
    /// geotransforms are required to satisfy this (spec §3, §7).
    ///
    /// # Return
    ///
    /// `true` if the affine has no rotation or shear term.
    pub fn is_orthogonal(&self) -> bool {
        self.b == 0.0 && self.d == 0.0
    }

    /// The determinant of the 2x2 linear part, `a*e - b*d`. Non-zero iff
    /// the affine is invertible.
    ///
    /// # Return
    ///
    /// `a*e - b*d`.
    pub fn determinant(&self) -> f64 {
        self.a * self.e - self.b * self.d
    }

    /// Apply the transform to a point: `(a*x + b*y + c, d*x + e*y + f)`.
    ///
    /// # Arguments
    ///
    /// * `x` - Input `x` coordinate.
    /// * `y` - Input `y` coordinate.
    ///
    /// # Return
    ///
    /// The transformed `(x', y')`.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.b * y + self.c,
            self.d * x + self.e * y + self.f,
        )
    }

    /// Compose two affines as 3x3 matrix multiplication, `self * other`,
    /// so that applying the result to a point is equivalent to applying
    /// `other` first and then `self`: `compose(a, b).apply(p) == a.apply(b.apply(p))`.
    ///
    /// # Arguments
    ///
    /// * `other` - The affine to apply first.
    ///
    /// # Return
    ///
    /// The composed affine `self * other`.
    pub fn compose(&self, other: &Affine) -> Affine {
        Affine {
            a: self.a * other.a + self.b * other.d,
            b: self.a * other.b + self.b * other.e,
            c: self.a * other.c + self.b * other.f + self.c,
            d: self.d * other.a + self.e * other.d,
            e: self.d * other.b + self.e * other.e,
            f: self.d * other.c + self.e * other.f + self.f,
        }
    }

    /// Invert the transform.
    ///
    /// # Return
    ///
    /// The affine `A'` such that `A'.apply(A.apply(x, y)) == (x, y)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DegenerateTransform`] if the determinant is zero —
    /// this must be caught here rather than surfacing as a NaN later (spec
    /// §4.1 edge cases: "Degenerate inverse transform... must fail at
    /// inversion time, not later").
    pub fn invert(&self) -> Result<Affine> {
        let det = self.determinant();
        if det == 0.0 {
            return Err(Error::DegenerateTransform);
        }
        let inv_det = 1.0 / det;
        let a = self.e * inv_det;
        let b = -self.b * inv_det;
        let d = -self.d * inv_det;
        let e = self.a * inv_det;
        // Translation of the inverse: -(inv_linear * (c, f)).
        let c = -(a * self.c + b * self.f);
        let f = -(d * self.c + e * self.f);
        Ok(Affine { a, b, c, d, e, f })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn nondegenerate_affine() -> impl Strategy<Value = Affine> {
        (-10.0..10.0f64, -10.0..10.0f64, -10.0..10.0f64, -10.0..10.0f64)
            .prop_filter_map("determinant must be well away from zero", |(a, b, d, e)| {
                let det = a * e - b * d;
                if det.abs() < 0.5 {
                    None
                } else {
                    Some(Affine {
                        a,
                        b,
                        c: 0.0,
                        d,
                        e,
                        f: 0.0,
                    })
                }
            })
    }

    #[test]
    fn identity_is_a_no_op() {
        let id = Affine::identity();
        assert_eq!(id.apply(3.0, 4.0), (3.0, 4.0));
    }

    #[test]
    fn translation_only_offsets() {
        let t = Affine::translation(10.0, 20.0);
        assert_eq!(t.apply(0.0, 0.0), (10.0, 20.0));
        assert_eq!(t.apply(255.0, 255.0), (265.0, 275.0));
    }

    #[test]
    fn invert_degenerate_fails() {
        let zero = Affine {
            a: 0.0,
            b: 0.0,
            c: 0.0,
            d: 0.0,
            e: 0.0,
            f: 0.0,
        };
        assert_eq!(zero.invert(), Err(Error::DegenerateTransform));
    }

    proptest! {
        #[test]
        fn round_trip_through_inverse(a in nondegenerate_affine(), x in -1000.0..1000.0f64, y in -1000.0..1000.0f64) {
            let inv = a.invert().unwrap();
            let (x2, y2) = inv.apply(a.apply(x, y).0, a.apply(x, y).1);
            prop_assert!((x2 - x).abs() <= 1e-6 * (x.abs().max(1.0)));
            prop_assert!((y2 - y).abs() <= 1e-6 * (y.abs().max(1.0)));
        }

        #[test]
        fn compose_is_associative(a in nondegenerate_affine(), b in nondegenerate_affine(), c in nondegenerate_affine(), x in -100.0..100.0f64, y in -100.0..100.0f64) {
            let left = a.compose(&b.compose(&c));
            let right = a.compose(&b).compose(&c);
            let (lx, ly) = left.apply(x, y);
            let (rx, ry) = right.apply(x, y);
            prop_assert!((lx - rx).abs() < 1e-6);
            prop_assert!((ly - ry).abs() < 1e-6);
        }

        #[test]
        fn compose_with_identity_is_a_no_op(a in nondegenerate_affine()) {
            let id = Affine::identity();
            prop_assert_eq!(a.compose(&id), a);
            prop_assert_eq!(id.compose(&a), a);
        }
    }

    #[test]
    fn compose_matches_apply_order() {
        let scale = Affine::scale(2.0, 3.0);
        let translate = Affine::translation(5.0, 7.0);
        let composed = translate.compose(&scale);
        assert_relative_eq!(composed.apply(1.0, 1.0).0, translate.apply(scale.apply(1.0, 1.0).0, scale.apply(1.0, 1.0).1).0);
    }
}
