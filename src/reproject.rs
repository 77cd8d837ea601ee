//! The four-function interface onto external projection code.
//!
//! `ReprojectionFns` is the seam between this crate and the proj4-style CRS
//! conversion code it consumes. Per spec §9, it is shaped as a struct of
//! function objects rather than a trait with a vtable: the refiner's hot
//! loop (spec §4.1) calls all four functions per sampled point, and
//! monomorphizing those calls (rather than dispatching through `dyn Fn`)
//! matters for a routine this is in the critical path.

/// Four pure functions bridging affine pixel space, source-CRS space, and
/// target-CRS (display) space.
///
/// - `forward_transform(col, row) -> (x_src, y_src)`: affine pixel to source CRS.
/// - `inverse_transform(x_src, y_src) -> (col, row)`: inverse of the above.
/// - `forward_reproject(x_src, y_src) -> (x_dst, y_dst)`: source CRS to target CRS.
/// - `inverse_reproject(x_dst, y_dst) -> (x_src, y_src)`: inverse of the above.
///
/// The composed forward path is `forward_reproject ∘ forward_transform`; the
/// composed inverse path is `inverse_transform ∘ inverse_reproject`. Callers
/// must ensure the two directions are numerically consistent to within
/// display-pixel precision — the refiner relies on this to bound error, and
/// has no way to detect an inconsistent pair other than by failing to
/// converge.
pub struct ReprojectionFns<FT, IT, FR, IR>
where
    FT: Fn(f64, f64) -> (f64, f64),
    IT: Fn(f64, f64) -> (f64, f64),
    FR: Fn(f64, f64) -> (f64, f64),
    IR: Fn(f64, f64) -> (f64, f64),
{
    forward_transform: FT,
    inverse_transform: IT,
    forward_reproject: FR,
    inverse_reproject: IR,
}

impl<FT, IT, FR, IR> ReprojectionFns<FT, IT, FR, IR>
where
    FT: Fn(f64, f64) -> (f64, f64),
    IT: Fn(f64, f64) -> (f64, f64),
    FR: Fn(f64, f64) -> (f64, f64),
    IR: Fn(f64, f64) -> (f64, f64),
{
    /// Bundle the four functions.
    ///
    /// # Arguments
    ///
    /// * `forward_transform` - Affine pixel `(col, row)` to source-CRS `(x, y)`.
    /// * `inverse_transform` - Source-CRS `(x, y)` to affine pixel `(col, row)`.
    /// * `forward_reproject` - Source-CRS `(x, y)` to target-CRS `(x, y)`.
    /// * `inverse_reproject` - Target-CRS `(x, y)` to source-CRS `(x, y)`.
    ///
    /// # Return
    ///
    /// The bundled `ReprojectionFns`.
    pub fn new(forward_transform: FT, inverse_transform: IT, forward_reproject: FR, inverse_reproject: IR) -> Self {
        Self {
            forward_transform,
            inverse_transform,
            forward_reproject,
            inverse_reproject,
        }
    }

    /// Affine pixel `(col, row)` to source-CRS `(x, y)`.
    ///
    /// # Arguments
    ///
    /// * `col` - Pixel column.
    /// * `row` - Pixel row.
    ///
    /// # Return
    ///
    /// The source-CRS `(x, y)`.
    pub fn forward_transform(&self, col: f64, row: f64) -> (f64, f64) {
        (self.forward_transform)(col, row)
    }

    /// Source-CRS `(x, y)` to affine pixel `(col, row)`.
    ///
    /// # Arguments
    ///
    /// * `x_src` - Source-CRS `x`.
    /// * `y_src` - Source-CRS `y`.
    ///
    /// # Return
    ///
    /// The affine pixel `(col, row)`.
    pub fn inverse_transform(&self, x_src: f64, y_src: f64) -> (f64, f64) {
        (self.inverse_transform)(x_src, y_src)
    }

    /// Source-CRS `(x, y)` to target-CRS `(x, y)`.
    ///
    /// # Arguments
    ///
    /// * `x_src` - Source-CRS `x`.
    /// * `y_src` - Source-CRS `y`.
    ///
    /// # Return
    ///
    /// The target-CRS `(x, y)`.
    pub fn forward_reproject(&self, x_src: f64, y_src: f64) -> (f64, f64) {
        (self.forward_reproject)(x_src, y_src)
    }

    /// Target-CRS `(x, y)` to source-CRS `(x, y)`.
    ///
    /// # Arguments
    ///
    /// * `x_dst` - Target-CRS `x`.
    /// * `y_dst` - Target-CRS `y`.
    ///
    /// # Return
    ///
    /// The source-CRS `(x, y)`.
    pub fn inverse_reproject(&self, x_dst: f64, y_dst: f64) -> (f64, f64) {
        (self.inverse_reproject)(x_dst, y_dst)
    }

    /// The composed forward path `forward_reproject ∘ forward_transform`:
    /// affine pixel straight through to target-CRS.
    ///
    /// # Arguments
    ///
    /// * `col` - Pixel column.
    /// * `row` - Pixel row.
    ///
    /// # Return
    ///
    /// The target-CRS `(x, y)`.
    pub fn forward(&self, col: f64, row: f64) -> (f64, f64) {
        let (x_src, y_src) = self.forward_transform(col, row);
        self.forward_reproject(x_src, y_src)
    }

    /// The composed inverse path `inverse_transform ∘ inverse_reproject`:
    /// target-CRS straight back to affine pixel.
    ///
    /// # Arguments
    ///
    /// * `x_dst` - Target-CRS `x`.
    /// * `y_dst` - Target-CRS `y`.
    ///
    /// # Return
    ///
    /// The affine pixel `(col, row)`.
    pub fn inverse(&self, x_dst: f64, y_dst: f64) -> (f64, f64) {
        let (x_src, y_src) = self.inverse_reproject(x_dst, y_dst);
        self.inverse_transform(x_src, y_src)
    }
}

/// A type alias for callers who'd rather not name four closure type
/// parameters, at the cost of going through `dyn Fn` dispatch.
pub type BoxedReprojectionFns = ReprojectionFns<
    Box<dyn Fn(f64, f64) -> (f64, f64)>,
    Box<dyn Fn(f64, f64) -> (f64, f64)>,
    Box<dyn Fn(f64, f64) -> (f64, f64)>,
    Box<dyn Fn(f64, f64) -> (f64, f64)>,
>;

/// Build a [`ReprojectionFns`] from an [`crate::affine::Affine`] pixel
/// transform composed with an identity reprojection (source CRS == target
/// CRS). Useful for tests and for pure-affine (no-reprojection) tiles.
///
/// # Arguments
///
/// * `affine` - The pixel-to-source-CRS affine; its inverse becomes
///   `inverse_transform`.
///
/// # Return
///
/// A `ReprojectionFns` whose reprojection legs are the identity.
///
/// # Errors
///
/// Returns [`crate::error::Error::DegenerateTransform`] if `affine` is not
/// invertible.
pub fn from_affine(affine: crate::affine::Affine) -> crate::error::Result<
    ReprojectionFns<
        impl Fn(f64, f64) -> (f64, f64),
        impl Fn(f64, f64) -> (f64, f64),
        impl Fn(f64, f64) -> (f64, f64),
        impl Fn(f64, f64) -> (f64, f64),
    >,
> {
    let inverse = affine.invert()?;
    Ok(ReprojectionFns::new(
        move |col, row| affine.apply(col, row),
        move |x, y| inverse.apply(x, y),
        |x, y| (x, y),
        |x, y| (x, y),
    ))
}
