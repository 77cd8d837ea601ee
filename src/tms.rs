//! OGC-style tile-matrix-set model: one level's geometry (`TileMatrix`), the
//! ordered pyramid of levels (`TileMatrixSet`), and tile addressing
//! (`TileIndex`).

use crate::affine::Affine;
use crate::error::{Error, Result};

/// One level of a tile pyramid.
#[derive(Debug, Clone, PartialEq)]
pub struct TileMatrix {
    /// A level identifier, typically its zoom string (e.g. `"14"`).
    pub id: String,
    /// Source-CRS ground size of one pixel at this level.
    pub cell_size: f64,
    /// Nominal scale denominator (1 : N) for LOD comparisons.
    pub scale_denominator: f64,
    /// Source-CRS coordinates of the pixel grid's origin (top-left).
    pub point_of_origin: (f64, f64),
    /// Tile width in pixels.
    pub tile_width: u32,
    /// Tile height in pixels.
    pub tile_height: u32,
    /// Number of tile columns at this level.
    pub matrix_width: u32,
    /// Number of tile rows at this level.
    pub matrix_height: u32,
    /// Pixel-at-this-level to source-CRS affine. Must be orthogonal
    /// (`b == 0 && d == 0`); validated by [`TileMatrixSet::new`].
    pub geotransform: Affine,
}

impl TileMatrix {
    /// The source-CRS origin of tile `(x, y)`'s top-left pixel.
    ///
    /// # Arguments
    ///
    /// * `x` - Tile column within this level.
    /// * `y` - Tile row within this level.
    ///
    /// # Return
    ///
    /// The source-CRS `(x, y)` of the tile's top-left pixel corner.
    pub fn tile_origin(&self, x: u32, y: u32) -> (f64, f64) {
        self.geotransform
            .apply((x * self.tile_width) as f64, (y * self.tile_height) as f64)
    }
}

/// An ordered pyramid of [`TileMatrix`] levels, coarsest first, plus the
/// projection functions needed to place tiles in WGS84 and Web Mercator.
pub struct TileMatrixSet<F4, F3>
where
    F4: Fn(f64, f64) -> (f64, f64),
    F3: Fn(f64, f64) -> (f64, f64),
{
    tile_matrices: Vec<TileMatrix>,
    /// Source-CRS bounding box `(min_x, min_y, max_x, max_y)`.
    pub source_bbox: (f64, f64, f64, f64),
    /// WGS84 bounding box `(min_lon, min_lat, max_lon, max_lat)`, derived by
    /// densifying and projecting `source_bbox`.
    pub wgs84_bbox: (f64, f64, f64, f64),
    project_to_4326: F4,
    project_to_3857: F3,
}

impl<F4, F3> std::fmt::Debug for TileMatrixSet<F4, F3>
where
    F4: Fn(f64, f64) -> (f64, f64),
    F3: Fn(f64, f64) -> (f64, f64),
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileMatrixSet")
            .field("levels", &self.tile_matrices.len())
            .field("source_bbox", &self.source_bbox)
            .field("wgs84_bbox", &self.wgs84_bbox)
            .finish()
    }
}

impl<F4, F3> TileMatrixSet<F4, F3>
where
    F4: Fn(f64, f64) -> (f64, f64),
    F3: Fn(f64, f64) -> (f64, f64),
{
    /// Construct a tile-matrix-set, running [`Self::validate`] on
    /// `tile_matrices` before accepting it (spec §7: rotated/skewed
    /// geotransforms and non-integer decimation must fail at construction
    /// time, not later).
    ///
    /// # Arguments
    ///
    /// * `tile_matrices` - The pyramid's levels, coarsest first.
    /// * `source_bbox` - Source-CRS bounding box `(min_x, min_y, max_x,
    ///   max_y)`.
    /// * `wgs84_bbox` - WGS84 bounding box `(min_lon, min_lat, max_lon,
    ///   max_lat)`.
    /// * `project_to_4326` - Projects a source-CRS point to WGS84.
    /// * `project_to_3857` - Projects a source-CRS point to Web Mercator.
    ///
    /// # Return
    ///
    /// The constructed tile-matrix-set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedTileMatrix`] if any level's geotransform
    /// is non-orthogonal, if `tile_matrices` is empty, or if the decimation
    /// factor between two adjacent levels is not an integer.
    pub fn new(
        tile_matrices: Vec<TileMatrix>,
        source_bbox: (f64, f64, f64, f64),
        wgs84_bbox: (f64, f64, f64, f64),
        project_to_4326: F4,
        project_to_3857: F3,
    ) -> Result<Self> {
        Self::validate(&tile_matrices)?;
        Ok(Self {
            tile_matrices,
            source_bbox,
            wgs84_bbox,
            project_to_4326,
            project_to_3857,
        })
    }

    /// Pre-flight validation: every level's geotransform must be orthogonal,
    /// the pyramid must be non-empty, and cell sizes must shrink from coarse
    /// to fine by an integer factor at every step.
    ///
    /// # Arguments
    ///
    /// * `tile_matrices` - The pyramid's levels, coarsest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedTileMatrix`] describing the first
    /// violation found.
    pub fn validate(tile_matrices: &[TileMatrix]) -> Result<()> {
        if tile_matrices.is_empty() {
            return Err(Error::UnsupportedTileMatrix(
                "tile matrix set must have at least one level".into(),
            ));
        }
        for tm in tile_matrices {
            if !tm.geotransform.is_orthogonal() {
                return Err(Error::UnsupportedTileMatrix(format!(
                    "level {} has a rotated or skewed geotransform (b and d must be 0)",
                    tm.id
                )));
            }
        }
        for pair in tile_matrices.windows(2) {
            let (coarse, fine) = (&pair[0], &pair[1]);
            let ratio = coarse.cell_size / fine.cell_size;
            let rounded = ratio.round();
            if (ratio - rounded).abs() > 1e-6 || rounded < 1.0 {
                return Err(Error::UnsupportedTileMatrix(format!(
                    "decimation between levels {} and {} is not an integer (cellSize ratio {ratio})",
                    coarse.id, fine.id
                )));
            }
        }
        Ok(())
    }

    /// The pyramid's levels, coarsest first.
    ///
    /// # Return
    ///
    /// A slice over every level, ordered coarsest to finest.
    pub fn levels(&self) -> &[TileMatrix] {
        &self.tile_matrices
    }

    /// The integer decimation factor between level `z` (coarser) and `z+1`
    /// (finer): `round(cellSize[z] / cellSize[z+1])`.
    ///
    /// # Arguments
    ///
    /// * `z` - The coarser of the two adjacent levels to compare.
    ///
    /// # Return
    ///
    /// The integer ratio of level `z`'s cell size to level `z+1`'s.
    pub fn decimation(&self, z: usize) -> u32 {
        let coarse = &self.tile_matrices[z];
        let fine = &self.tile_matrices[z + 1];
        (coarse.cell_size / fine.cell_size).round() as u32
    }

    /// Project a source-CRS point to WGS84 `(lon, lat)`.
    ///
    /// # Arguments
    ///
    /// * `x` - Source-CRS x coordinate.
    /// * `y` - Source-CRS y coordinate.
    ///
    /// # Return
    ///
    /// The `(lon, lat)` equivalent in WGS84.
    pub fn project_to_4326(&self, x: f64, y: f64) -> (f64, f64) {
        (self.project_to_4326)(x, y)
    }

    /// Project a source-CRS point to Web Mercator meters.
    ///
    /// # Arguments
    ///
    /// * `x` - Source-CRS x coordinate.
    /// * `y` - Source-CRS y coordinate.
    ///
    /// # Return
    ///
    /// The equivalent point in Web Mercator meters.
    pub fn project_to_3857(&self, x: f64, y: f64) -> (f64, f64) {
        (self.project_to_3857)(x, y)
    }
}

/// A tile address: `z` indexes into [`TileMatrixSet::levels`], `x` and `y`
/// are column/row within that level's `matrix_width`/`matrix_height`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TileIndex {
    /// Tile column.
    pub x: u32,
    /// Tile row.
    pub y: u32,
    /// Pyramid level, 0 = coarsest.
    pub z: usize,
}

#[cfg(test)]
mod test {
    use super::*;

    fn level(id: &str, cell_size: f64, matrix_size: u32) -> TileMatrix {
        TileMatrix {
            id: id.to_string(),
            cell_size,
            scale_denominator: cell_size * 3779.5, // ~1px = 0.28mm, arbitrary for tests
            point_of_origin: (0.0, 0.0),
            tile_width: 256,
            tile_height: 256,
            matrix_width: matrix_size,
            matrix_height: matrix_size,
            geotransform: Affine {
                a: cell_size,
                b: 0.0,
                c: 0.0,
                d: 0.0,
                e: -cell_size,
                f: 0.0,
            },
        }
    }

    #[test]
    fn rejects_empty_pyramid() {
        assert!(TileMatrixSet::validate(&[]).is_err());
    }

    #[test]
    fn rejects_skewed_geotransform() {
        let mut tm = level("0", 10.0, 1);
        tm.geotransform.b = 1.0;
        assert!(TileMatrixSet::validate(&[tm]).is_err());
    }

    #[test]
    fn rejects_non_integer_decimation() {
        let levels = vec![level("0", 10.0, 1), level("1", 3.0, 3)];
        assert!(TileMatrixSet::validate(&levels).is_err());
    }

    #[test]
    fn s5_two_level_tms_accepts_and_reports_decimation() {
        let levels = vec![level("0", 10.0, 1), level("1", 5.0, 2)];
        let tms = TileMatrixSet::new(
            levels,
            (0.0, 0.0, 20.0, 20.0),
            (-180.0, -90.0, 180.0, 90.0),
            |x, y| (x, y),
            |x, y| (x, y),
        )
        .unwrap();
        assert_eq!(tms.decimation(0), 2);
        assert_eq!(tms.levels().len(), 2);
    }
}
