//! Integer pixel rectangles: validated construction and intersection.

use crate::error::{Error, Result};

/// An integer pixel rectangle `{col_off, row_off, width, height}`.
///
/// Invariants (enforced at construction): `col_off >= 0`, `row_off >= 0`,
/// `width > 0`, `height > 0`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Window {
    /// Column offset of the window's top-left corner.
    pub col_off: u32,
    /// Row offset of the window's top-left corner.
    pub row_off: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Window {
    /// Construct a window, validating that it has positive extent.
    ///
    /// # Arguments
    ///
    /// * `col_off` - Column offset of the window's top-left corner.
    /// * `row_off` - Row offset of the window's top-left corner.
    /// * `width` - Width in pixels; must be non-zero.
    /// * `height` - Height in pixels; must be non-zero.
    ///
    /// # Return
    ///
    /// The validated window.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `width == 0` or `height == 0`.
    pub fn new(col_off: u32, row_off: u32, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidArgument(format!(
                "window dimensions must be positive, got {width}x{height}"
            )));
        }
        Ok(Self {
            col_off,
            row_off,
            width,
            height,
        })
    }

    /// The column just past the window's right edge.
    ///
    /// # Return
    ///
    /// `col_off + width`.
    pub fn col_end(&self) -> u32 {
        self.col_off + self.width
    }

    /// The row just past the window's bottom edge.
    ///
    /// # Return
    ///
    /// `row_off + height`.
    pub fn row_end(&self) -> u32 {
        self.row_off + self.height
    }

    /// Intersect two windows.
    ///
    /// Returns `None` when the interior intersection is empty, including the
    /// case where the windows merely touch edges (one window's right edge
    /// equals the other's left edge is "no overlap", not a zero-width
    /// window — this type has no valid zero-extent representation).
    ///
    /// # Arguments
    ///
    /// * `other` - The window to intersect against.
    ///
    /// # Return
    ///
    /// The overlapping window, or `None` if the two do not overlap.
    pub fn intersect(&self, other: &Window) -> Option<Window> {
        let col_off = self.col_off.max(other.col_off);
        let row_off = self.row_off.max(other.row_off);
        let col_end = self.col_end().min(other.col_end());
        let row_end = self.row_end().min(other.row_end());
        if col_end <= col_off || row_end <= row_off {
            return None;
        }
        Some(Window {
            col_off,
            row_off,
            width: col_end - col_off,
            height: row_end - row_off,
        })
    }
}
