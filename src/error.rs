//! The crate-wide error sum type.

/// Convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong in this crate.
///
/// Propagation policy: errors bubble synchronously to the caller at the
/// point of the offending public operation. `InvalidArgument` and
/// `UnsupportedTileMatrix` are caught at construction/parameter-validation
/// time, before any work is done. `BrokenTriangulation` indicates a bug in
/// the refiner rather than a recoverable condition; the refiner must not be
/// used further after producing one.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A caller-supplied argument was out of range, zero where positive was
    /// required, or non-finite.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An affine with a zero determinant was passed to [`crate::affine::Affine::invert`].
    #[error("affine transform is not invertible (determinant is zero)")]
    DegenerateTransform,

    /// A [`crate::tms::TileMatrix`] had a rotated/skewed geotransform
    /// (`b != 0` or `d != 0`), or the decimation factor between two adjacent
    /// levels was not an integer.
    #[error("unsupported tile matrix: {0}")]
    UnsupportedTileMatrix(String),

    /// An internal invariant of the mesh refiner was violated: a triangle
    /// expected to be in the pending list or the queue was in neither. This
    /// is a bug in the refiner, not a recoverable caller error.
    #[error("broken triangulation: {0}")]
    BrokenTriangulation(String),
}
