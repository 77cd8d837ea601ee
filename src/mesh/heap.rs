//! An indexed binary max-heap keyed by per-triangle error.
//!
//! Legalization needs to pull an arbitrary triangle out of the queue by id,
//! not just the max — a plain `BinaryHeap` has no O(log n) erase. This keeps
//! a position side-table (`slot_of`) so `remove` can find a triangle's heap
//! slot directly instead of scanning (spec §9: "do not substitute a general
//! priority-queue that lacks O(log n) erase").

/// Binary max-heap over `(triangle id, error)` pairs with O(log n) push, pop,
/// and arbitrary removal.
#[derive(Debug, Default, Clone)]
pub struct IndexedHeap {
    /// Heap-ordered slots: `(triangle id, error)`.
    slots: Vec<(u32, f64)>,
    /// `slot_of[triangle id]` is that triangle's index into `slots`, or
    /// `None` if the triangle is not currently queued.
    slot_of: Vec<Option<usize>>,
}

impl IndexedHeap {
    /// An empty heap.
    ///
    /// # Return
    ///
    /// A heap with no queued triangles.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any triangle is queued.
    ///
    /// # Return
    ///
    /// `true` if the heap holds no triangles.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of queued triangles.
    ///
    /// # Return
    ///
    /// The count of triangles currently queued.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// The error of the highest-priority triangle, or `0.0` if the heap is
    /// empty (spec §4.1: `getMaxError` is "0 when nothing exceeds threshold").
    ///
    /// # Return
    ///
    /// The largest queued error, or `0.0` if the heap is empty.
    pub fn peek_max_error(&self) -> f64 {
        self.slots.first().map(|&(_, err)| err).unwrap_or(0.0)
    }

    /// Whether `triangle` currently has a slot in the heap.
    ///
    /// # Arguments
    ///
    /// * `triangle` - The triangle id to look up.
    ///
    /// # Return
    ///
    /// `true` if `triangle` is currently queued.
    pub fn contains(&self, triangle: u32) -> bool {
        self.slot_of
            .get(triangle as usize)
            .copied()
            .flatten()
            .is_some()
    }

    fn ensure_capacity(&mut self, triangle: u32) {
        let idx = triangle as usize;
        if idx >= self.slot_of.len() {
            self.slot_of.resize(idx + 1, None);
        }
    }

    /// Push a new `(triangle, error)` pair. `triangle` must not already be
    /// queued.
    ///
    /// # Arguments
    ///
    /// * `triangle` - The triangle id to queue.
    /// * `error` - Its current error estimate, used as the heap key.
    pub fn push(&mut self, triangle: u32, error: f64) {
        self.ensure_capacity(triangle);
        debug_assert!(
            self.slot_of[triangle as usize].is_none(),
            "triangle {triangle} pushed while already queued"
        );
        let slot = self.slots.len();
        self.slots.push((triangle, error));
        self.slot_of[triangle as usize] = Some(slot);
        self.sift_up(slot);
    }

    /// Pop and return the triangle id with the largest error. `None` if
    /// empty.
    ///
    /// # Return
    ///
    /// The highest-error triangle id, or `None` if the heap is empty.
    pub fn pop_max(&mut self) -> Option<u32> {
        if self.slots.is_empty() {
            return None;
        }
        let last = self.slots.len() - 1;
        self.swap_slots(0, last);
        let (triangle, _) = self.slots.pop().expect("checked non-empty above");
        self.slot_of[triangle as usize] = None;
        if !self.slots.is_empty() {
            self.sift_down(0);
        }
        Some(triangle)
    }

    /// Remove `triangle` from the heap, wherever it sits. No-op if it is not
    /// currently queued.
    ///
    /// # Arguments
    ///
    /// * `triangle` - The triangle id to remove.
    pub fn remove(&mut self, triangle: u32) {
        let Some(slot) = self
            .slot_of
            .get(triangle as usize)
            .copied()
            .flatten()
        else {
            return;
        };
        let last = self.slots.len() - 1;
        self.swap_slots(slot, last);
        self.slots.pop();
        self.slot_of[triangle as usize] = None;
        if slot < self.slots.len() {
            // The element swapped into `slot` could violate the heap order
            // in either direction.
            self.sift_up(slot);
            self.sift_down(slot);
        }
    }

    fn swap_slots(&mut self, i: usize, j: usize) {
        self.slots.swap(i, j);
        self.slot_of[self.slots[i].0 as usize] = Some(i);
        self.slot_of[self.slots[j].0 as usize] = Some(j);
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.slots[parent].1 >= self.slots[i].1 {
                break;
            }
            self.swap_slots(parent, i);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let n = self.slots.len();
        loop {
            let left = 2 * i + 1;
            let right = 2 * i + 2;
            let mut largest = i;
            if left < n && self.slots[left].1 > self.slots[largest].1 {
                largest = left;
            }
            if right < n && self.slots[right].1 > self.slots[largest].1 {
                largest = right;
            }
            if largest == i {
                break;
            }
            self.swap_slots(i, largest);
            i = largest;
        }
    }
}
