//! Bounded max-heap tracking the running k-nearest candidates of one query row.
//!
//! The heap operates directly on borrowed slices of the shared output
//! matrices. Batched queries hand each fork-join task a disjoint row range, so
//! the heaps never alias and no synchronisation is needed.

/// Fixed-capacity max-heap over one `(distances, indices)` output row.
///
/// The worst candidate sits at the root; a push that cannot beat it is
/// rejected. Distances are kept in reduced units during traversal and
/// converted once a query finishes.
pub(crate) struct NeighborsHeap<'a> {
    dist: &'a mut [f64],
    idx: &'a mut [usize],
}

impl<'a> NeighborsHeap<'a> {
    /// Wraps a pre-filled row; `dist` must start at `f64::INFINITY`.
    pub(crate) fn new(dist: &'a mut [f64], idx: &'a mut [usize]) -> Self {
        debug_assert_eq!(dist.len(), idx.len());
        debug_assert!(!dist.is_empty());
        Self { dist, idx }
    }

    /// Returns the current worst candidate distance.
    pub(crate) fn largest(&self) -> f64 {
        self.dist[0]
    }

    /// Inserts `(value, index)` when it beats the current worst candidate.
    pub(crate) fn push(&mut self, value: f64, index: usize) {
        if value >= self.dist[0] {
            return;
        }

        self.dist[0] = value;
        self.idx[0] = index;

        // Sift the new root down to restore the max-heap property.
        let len = self.dist.len();
        let mut parent = 0;
        loop {
            let left = 2 * parent + 1;
            let right = left + 1;
            let mut swap = parent;
            if left < len && self.dist[left] > self.dist[swap] {
                swap = left;
            }
            if right < len && self.dist[right] > self.dist[swap] {
                swap = right;
            }
            if swap == parent {
                break;
            }
            self.dist.swap(parent, swap);
            self.idx.swap(parent, swap);
            parent = swap;
        }
    }
}

/// Sorts `dist` ascending, permuting `idx` in lockstep.
///
/// Quickselect-style recursion with a median-of-three pivot: short slices are
/// handled directly and only the partitions recurse, keeping the per-row cost
/// at amortised `O(k log k)`.
pub(crate) fn simultaneous_sort(dist: &mut [f64], idx: &mut [usize]) {
    debug_assert_eq!(dist.len(), idx.len());
    let len = dist.len();
    if len <= 1 {
        return;
    }
    if len == 2 {
        if dist[0] > dist[1] {
            dist.swap(0, 1);
            idx.swap(0, 1);
        }
        return;
    }

    // Median-of-three pivot, parked at the end during partitioning.
    let mid = len / 2;
    if dist[0] > dist[mid] {
        dist.swap(0, mid);
        idx.swap(0, mid);
    }
    if dist[mid] > dist[len - 1] {
        dist.swap(mid, len - 1);
        idx.swap(mid, len - 1);
        if dist[0] > dist[mid] {
            dist.swap(0, mid);
            idx.swap(0, mid);
        }
    }
    let pivot = dist[mid];
    dist.swap(mid, len - 2);
    idx.swap(mid, len - 2);

    let mut store = 0;
    for cursor in 0..len - 2 {
        if dist[cursor] < pivot {
            dist.swap(store, cursor);
            idx.swap(store, cursor);
            store += 1;
        }
    }
    dist.swap(store, len - 2);
    idx.swap(store, len - 2);

    let (dist_lo, dist_hi) = dist.split_at_mut(store);
    let (idx_lo, idx_hi) = idx.split_at_mut(store);
    simultaneous_sort(dist_lo, idx_lo);
    simultaneous_sort(&mut dist_hi[1..], &mut idx_hi[1..]);
}
