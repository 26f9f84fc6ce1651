//! Query result containers.

/// Fixed-width k-nearest-neighbour result: one row per query point, `k`
/// columns of `(distance, index)` pairs.
#[derive(Clone, Debug, PartialEq)]
pub struct Neighborhood {
    k: usize,
    rows: usize,
    distances: Vec<f64>,
    indices: Vec<usize>,
}

impl Neighborhood {
    pub(crate) fn new(rows: usize, k: usize, distances: Vec<f64>, indices: Vec<usize>) -> Self {
        debug_assert_eq!(distances.len(), rows * k);
        debug_assert_eq!(indices.len(), rows * k);
        Self {
            k,
            rows,
            distances,
            indices,
        }
    }

    /// Returns the number of query rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the neighbour count per row.
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Returns the distances of the neighbours of query point `row`.
    ///
    /// # Panics
    ///
    /// Panics when `row >= self.rows()`.
    #[must_use]
    pub fn distances(&self, row: usize) -> &[f64] {
        &self.distances[row * self.k..(row + 1) * self.k]
    }

    /// Returns the point indices of the neighbours of query point `row`.
    ///
    /// # Panics
    ///
    /// Panics when `row >= self.rows()`.
    #[must_use]
    pub fn indices(&self, row: usize) -> &[usize] {
        &self.indices[row * self.k..(row + 1) * self.k]
    }

    /// Consumes the result, returning the flat `(distances, indices)` buffers.
    #[must_use]
    pub fn into_parts(self) -> (Vec<f64>, Vec<usize>) {
        (self.distances, self.indices)
    }
}

/// Ragged radius-query result: per query row, the indices of all points
/// within the radius and, when requested, their distances.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RadiusNeighborhood {
    pub(crate) indices: Vec<Vec<usize>>,
    pub(crate) distances: Vec<Vec<f64>>,
}

impl RadiusNeighborhood {
    /// Returns the number of query rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.indices.len()
    }

    /// Returns the point indices within the radius of query point `row`.
    ///
    /// # Panics
    ///
    /// Panics when `row >= self.rows()`.
    #[must_use]
    pub fn indices(&self, row: usize) -> &[usize] {
        &self.indices[row]
    }

    /// Returns the matching distances for query point `row`; empty when the
    /// query did not request distances.
    ///
    /// # Panics
    ///
    /// Panics when `row >= self.rows()`.
    #[must_use]
    pub fn distances(&self, row: usize) -> &[f64] {
        &self.distances[row]
    }
}
