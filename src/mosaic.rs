//! Spatial index over bbox-bearing sources for viewport queries (spec §4.5,
//! component C7): used for collections of whole-image mosaic sources in
//! place of a single pyramid.
//!
//! Backed by `rstar`'s static R-tree, bulk-loaded once at construction
//! (`O(N log N)`) and queried by intersecting envelope (`O(log N + k)`),
//! matching spec's "packed Hilbert R-tree"-shaped requirement without
//! hand-rolling one.

use log::debug;
use rstar::{RTree, RTreeObject, AABB};

/// Anything with a 2-D bounding box in source-CRS coordinates
/// `(min_x, min_y, max_x, max_y)`.
pub trait HasBbox {
    /// The source's bounding box, `(min_x, min_y, max_x, max_y)`.
    ///
    /// # Return
    ///
    /// The source's bounding box in source-CRS coordinates.
    fn bbox(&self) -> (f64, f64, f64, f64);
}

/// An R-tree entry: the source's bbox plus its arbitrary payload. Kept
/// separate from `T` so `T` doesn't need to implement `RTreeObject` itself.
#[derive(Debug, Clone)]
struct Entry<T> {
    bbox: (f64, f64, f64, f64),
    value: T,
}

impl<T> RTreeObject for Entry<T> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let (min_x, min_y, max_x, max_y) = self.bbox;
        AABB::from_corners([min_x, min_y], [max_x, max_y])
    }
}

/// A static spatial index over mosaic sources (spec §4.5). Immutable after
/// construction and safe to read from multiple threads concurrently (spec
/// §5).
#[derive(Debug)]
pub struct MosaicIndex<T> {
    tree: RTree<Entry<T>>,
}

impl<T: HasBbox> MosaicIndex<T> {
    /// Bulk-load `sources` into a static R-tree. `O(N log N)`.
    ///
    /// # Arguments
    ///
    /// * `sources` - The mosaic sources to index.
    ///
    /// # Return
    ///
    /// A static index ready to be queried.
    pub fn build(sources: Vec<T>) -> Self {
        let count = sources.len();
        let entries = sources
            .into_iter()
            .map(|value| Entry {
                bbox: value.bbox(),
                value,
            })
            .collect();
        debug!("bulk-loading mosaic index with {count} sources");
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Every source whose bbox intersects `viewport_bbox`
    /// (`min_x, min_y, max_x, max_y`). `O(log N + k)`.
    ///
    /// # Arguments
    ///
    /// * `viewport_bbox` - The query envelope, `(min_x, min_y, max_x,
    ///   max_y)`.
    ///
    /// # Return
    ///
    /// Every indexed source whose bbox intersects `viewport_bbox`.
    pub fn search(&self, viewport_bbox: (f64, f64, f64, f64)) -> Vec<&T> {
        let (min_x, min_y, max_x, max_y) = viewport_bbox;
        let envelope = AABB::from_corners([min_x, min_y], [max_x, max_y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| &entry.value)
            .collect()
    }

    /// Number of sources held by the index.
    ///
    /// # Return
    ///
    /// The number of sources the index was built from.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether the index holds no sources.
    ///
    /// # Return
    ///
    /// `true` if the index was built from zero sources.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
