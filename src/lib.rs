//! Raster reprojection and tile-selection core.
//!
//! This crate decides which pyramid tiles of a source raster (GeoTIFF/COG,
//! Zarr pyramid, or client-side mosaic) are needed for the current viewport,
//! builds a warped triangle mesh per tile that maps source-pixel UVs onto a
//! different display projection within a bounded pixel error, and exposes
//! that mesh as geometry and texture coordinates for a GPU renderer.
//!
//! GeoTIFF/Zarr decoding, CRS math, GPU device/texture allocation, shader
//! modules, map-framework integration, UI, byte fetch/cache and STAC queries
//! are all external collaborators; this crate only consumes them through the
//! narrow interfaces in [`reproject`] and [`tms`].
#![warn(
    missing_docs,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod affine;
pub mod algorithm;
pub mod error;
pub mod mesh;
pub mod mosaic;
pub mod reproject;
pub mod tms;
pub mod traversal;
pub mod window;

pub use affine::Affine;
pub use error::{Error, Result};
pub use mesh::Refiner;
pub use mosaic::MosaicIndex;
pub use reproject::ReprojectionFns;
pub use tms::{TileIndex, TileMatrix, TileMatrixSet};
pub use traversal::{get_tile_indices, Viewport};
pub use window::Window;
