//! The adaptive Delaunay mesh refiner (spec §4.1, component C4).
//!
//! [`Refiner`] builds a warped triangle mesh over `[0,1]^2` UV space whose
//! linearly-interpolated reprojection stays within a caller-chosen pixel
//! error of the true reprojection, by inserting vertices where error is
//! worst and restoring the Delaunay property with edge flips.

mod heap;
mod refiner;

pub use refiner::Refiner;
