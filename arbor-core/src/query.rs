//! Single-tree and dual-tree query traversal.
//!
//! All traversal compares reduced distances (see [`crate::metric::Metric`]):
//! heaps and pruning bounds stay in reduced units until a query finishes and
//! the rows are converted and optionally sorted in one pass. Pruning
//! decisions are plain branches; no control-flow exceptions exist anywhere in
//! the recursion.

use crate::{
    error::{ArborError, Result},
    heap::{NeighborsHeap, simultaneous_sort},
    matrix::Matrix,
    metric::Metric,
    neighborhood::{Neighborhood, RadiusNeighborhood},
    tree::{SpatialTree, TreeGeometry},
};

/// Options controlling a k-nearest-neighbour query.
#[derive(Clone, Copy, Debug)]
pub struct QueryOptions {
    /// Run the dual-tree traversal instead of one single-tree pass per point.
    /// Results are set-identical; dual-tree amortises pruning across query
    /// points and wins on large batches.
    pub dual_tree: bool,
    /// Sort each result row ascending by distance.
    pub sort: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            dual_tree: false,
            sort: true,
        }
    }
}

/// Radius specification for [`SpatialTree::query_radius`]: one shared radius,
/// or one radius per query row.
#[derive(Clone, Debug)]
pub enum RadiusSpec {
    /// The same radius for every query point.
    Scalar(f64),
    /// One radius per query row.
    PerPoint(Vec<f64>),
}

impl RadiusSpec {
    fn validate(&self, rows: usize) -> Result<()> {
        match self {
            Self::Scalar(value) => validate_radius(*value),
            Self::PerPoint(values) => {
                if values.len() != rows {
                    return Err(ArborError::RadiusCountMismatch {
                        got: values.len(),
                        expected: rows,
                    });
                }
                values.iter().try_for_each(|value| validate_radius(*value))
            }
        }
    }

    fn radius_for(&self, row: usize) -> f64 {
        match self {
            Self::Scalar(value) => *value,
            Self::PerPoint(values) => values[row],
        }
    }
}

fn validate_radius(value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ArborError::InvalidRadius { value })
    }
}

/// Converts heap rows from reduced to full distances and sorts on request.
pub(crate) fn finalize_rows(
    metric: Metric,
    k: usize,
    dist: &mut [f64],
    idx: &mut [usize],
    sort: bool,
) {
    for (dist_row, idx_row) in dist.chunks_mut(k).zip(idx.chunks_mut(k)) {
        for value in dist_row.iter_mut() {
            *value = metric.rdist_to_dist(*value);
        }
        if sort {
            simultaneous_sort(dist_row, idx_row);
        }
    }
}

impl<G: TreeGeometry> SpatialTree<G> {
    pub(crate) fn validate_queries(&self, queries: &Matrix) -> Result<()> {
        if queries.cols() != self.points.cols() {
            return Err(ArborError::DimensionMismatch {
                query: queries.cols(),
                tree: self.points.cols(),
            });
        }
        Ok(())
    }

    /// Finds the `k` nearest indexed points of every query row.
    ///
    /// # Errors
    ///
    /// Returns [`ArborError::InvalidK`] when `k` is outside `1..=n_points`
    /// and [`ArborError::DimensionMismatch`] when the query dimensionality
    /// differs from the tree's.
    pub fn query(&self, queries: &Matrix, k: usize, options: QueryOptions) -> Result<Neighborhood> {
        self.validate_queries(queries)?;
        let n_points = self.points.rows();
        if k < 1 || k > n_points {
            return Err(ArborError::InvalidK {
                k,
                points: n_points,
            });
        }

        let rows = queries.rows();
        let mut dist = vec![f64::INFINITY; rows * k];
        let mut idx = vec![0_usize; rows * k];

        if options.dual_tree {
            self.query_dual_into(queries, k, &mut dist, &mut idx)?;
        } else {
            self.query_rows_into(queries, 0, rows, k, &mut dist, &mut idx);
        }

        finalize_rows(self.metric, k, &mut dist, &mut idx, options.sort);
        Ok(Neighborhood::new(rows, k, dist, idx))
    }

    /// Runs the single-tree query for `rows` query rows starting at `row0`,
    /// writing into caller-owned heap buffers covering exactly those rows.
    pub(crate) fn query_rows_into(
        &self,
        queries: &Matrix,
        row0: usize,
        rows: usize,
        k: usize,
        dist: &mut [f64],
        idx: &mut [usize],
    ) {
        for row in 0..rows {
            let point = queries.row(row0 + row);
            let mut heap = NeighborsHeap::new(
                &mut dist[row * k..(row + 1) * k],
                &mut idx[row * k..(row + 1) * k],
            );
            let lower = self
                .bounds
                .min_rdist(0, &self.nodes[0], point, self.metric);
            self.query_one(0, point, lower, &mut heap);
        }
    }

    /// Depth-first single-tree descent for one query point.
    fn query_one(&self, node: usize, point: &[f64], lower_bound: f64, heap: &mut NeighborsHeap<'_>) {
        if lower_bound > heap.largest() {
            return;
        }

        let data = self.nodes[node];
        if data.is_leaf {
            for slot in data.idx_start..data.idx_end {
                let candidate = self.idx[slot];
                let rdist = self.metric.rdist(point, self.points.row(candidate));
                heap.push(rdist, candidate);
            }
            return;
        }

        // Nearer child first improves the heap faster and prunes the sibling
        // more often; ordering does not affect the result set.
        let left = 2 * node + 1;
        let right = left + 1;
        let lower_left = self
            .bounds
            .min_rdist(left, &self.nodes[left], point, self.metric);
        let lower_right = self
            .bounds
            .min_rdist(right, &self.nodes[right], point, self.metric);
        if lower_left <= lower_right {
            self.query_one(left, point, lower_left, heap);
            self.query_one(right, point, lower_right, heap);
        } else {
            self.query_one(right, point, lower_right, heap);
            self.query_one(left, point, lower_left, heap);
        }
    }

    /// Dual-tree batch query: builds a second tree over the query points and
    /// recurses over (query-node, reference-node) pairs, sharing one
    /// upper-bound array across the query tree's nodes.
    fn query_dual_into(
        &self,
        queries: &Matrix,
        k: usize,
        dist: &mut [f64],
        idx: &mut [usize],
    ) -> Result<()> {
        let query_tree = SpatialTree::<G>::build(queries.clone(), self.leaf_size, self.metric)?;
        let mut node_bounds = vec![f64::INFINITY; query_tree.nodes.len()];
        let lower = query_tree.bounds.min_rdist_dual(
            0,
            &query_tree.nodes[0],
            &self.bounds,
            0,
            &self.nodes[0],
            self.metric,
        );
        self.query_dual_node(&query_tree, 0, 0, lower, &mut node_bounds, k, dist, idx);
        Ok(())
    }

    #[expect(clippy::too_many_arguments, reason = "traversal threads shared scratch state")]
    fn query_dual_node(
        &self,
        query_tree: &SpatialTree<G>,
        query_node: usize,
        ref_node: usize,
        lower_bound: f64,
        node_bounds: &mut [f64],
        k: usize,
        dist: &mut [f64],
        idx: &mut [usize],
    ) {
        if lower_bound > node_bounds[query_node] {
            return;
        }

        let query_data = query_tree.nodes[query_node];
        let ref_data = self.nodes[ref_node];

        if query_data.is_leaf && ref_data.is_leaf {
            let mut refreshed = f64::NEG_INFINITY;
            for slot in query_data.idx_start..query_data.idx_end {
                let query_row = query_tree.idx[slot];
                let point = query_tree.points.row(query_row);
                let mut heap = NeighborsHeap::new(
                    &mut dist[query_row * k..(query_row + 1) * k],
                    &mut idx[query_row * k..(query_row + 1) * k],
                );
                if lower_bound <= heap.largest() {
                    for ref_slot in ref_data.idx_start..ref_data.idx_end {
                        let candidate = self.idx[ref_slot];
                        let rdist = self.metric.rdist(point, self.points.row(candidate));
                        heap.push(rdist, candidate);
                    }
                }
                refreshed = refreshed.max(heap.largest());
            }

            // Tighten this leaf's bound and walk it up while it still
            // improves an ancestor.
            if refreshed < node_bounds[query_node] {
                node_bounds[query_node] = refreshed;
                let mut child = query_node;
                while child > 0 {
                    let parent = (child - 1) / 2;
                    let parent_bound =
                        node_bounds[2 * parent + 1].max(node_bounds[2 * parent + 2]);
                    if parent_bound < node_bounds[parent] {
                        node_bounds[parent] = parent_bound;
                        child = parent;
                    } else {
                        break;
                    }
                }
            }
            return;
        }

        if query_data.is_leaf {
            self.descend_reference(query_tree, query_node, ref_node, node_bounds, k, dist, idx);
            return;
        }

        if ref_data.is_leaf {
            for query_child in [2 * query_node + 1, 2 * query_node + 2] {
                let lower = query_tree.bounds.min_rdist_dual(
                    query_child,
                    &query_tree.nodes[query_child],
                    &self.bounds,
                    ref_node,
                    &ref_data,
                    self.metric,
                );
                self.query_dual_node(
                    query_tree,
                    query_child,
                    ref_node,
                    lower,
                    node_bounds,
                    k,
                    dist,
                    idx,
                );
            }
            return;
        }

        for query_child in [2 * query_node + 1, 2 * query_node + 2] {
            self.descend_reference(query_tree, query_child, ref_node, node_bounds, k, dist, idx);
        }
    }

    /// Recurses into the reference node's children, nearer pair first.
    #[expect(clippy::too_many_arguments, reason = "traversal threads shared scratch state")]
    fn descend_reference(
        &self,
        query_tree: &SpatialTree<G>,
        query_node: usize,
        ref_node: usize,
        node_bounds: &mut [f64],
        k: usize,
        dist: &mut [f64],
        idx: &mut [usize],
    ) {
        let query_data = &query_tree.nodes[query_node];
        let left = 2 * ref_node + 1;
        let right = left + 1;
        let lower_left = query_tree.bounds.min_rdist_dual(
            query_node,
            query_data,
            &self.bounds,
            left,
            &self.nodes[left],
            self.metric,
        );
        let lower_right = query_tree.bounds.min_rdist_dual(
            query_node,
            query_data,
            &self.bounds,
            right,
            &self.nodes[right],
            self.metric,
        );
        let ordered = if lower_left <= lower_right {
            [(left, lower_left), (right, lower_right)]
        } else {
            [(right, lower_right), (left, lower_left)]
        };
        for (child, lower) in ordered {
            self.query_dual_node(query_tree, query_node, child, lower, node_bounds, k, dist, idx);
        }
    }

    /// Returns, per query row, the indices of all indexed points within the
    /// radius (distance `<= r`).
    ///
    /// Subtrees wholly inside the radius contribute their indices without any
    /// per-point distance computation.
    ///
    /// # Errors
    ///
    /// Returns [`ArborError::InvalidRadius`] on a non-positive or non-finite
    /// radius, [`ArborError::RadiusCountMismatch`] when a per-point radius
    /// slice does not match the query rows, and
    /// [`ArborError::DimensionMismatch`] on dimensionality mismatch.
    pub fn query_radius(&self, queries: &Matrix, radius: &RadiusSpec) -> Result<Vec<Vec<usize>>> {
        let result = self.radius_traverse(queries, radius, false, false)?;
        Ok(result.indices)
    }

    /// Radius query returning matching distances as well, optionally sorted
    /// ascending per row.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`SpatialTree::query_radius`].
    pub fn query_radius_with_distance(
        &self,
        queries: &Matrix,
        radius: &RadiusSpec,
        sort: bool,
    ) -> Result<RadiusNeighborhood> {
        self.radius_traverse(queries, radius, true, sort)
    }

    /// Counts the indexed points within the radius of each query row without
    /// materialising their indices.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`SpatialTree::query_radius`].
    pub fn count_radius(&self, queries: &Matrix, radius: &RadiusSpec) -> Result<Vec<usize>> {
        self.validate_queries(queries)?;
        radius.validate(queries.rows())?;
        let counts = (0..queries.rows())
            .map(|row| {
                let r_rdist = self.metric.dist_to_rdist(radius.radius_for(row));
                self.radius_count_one(0, queries.row(row), r_rdist)
            })
            .collect();
        Ok(counts)
    }

    fn radius_traverse(
        &self,
        queries: &Matrix,
        radius: &RadiusSpec,
        want_distance: bool,
        sort: bool,
    ) -> Result<RadiusNeighborhood> {
        self.validate_queries(queries)?;
        radius.validate(queries.rows())?;

        let mut result = RadiusNeighborhood::default();
        for row in 0..queries.rows() {
            let point = queries.row(row);
            let r_rdist = self.metric.dist_to_rdist(radius.radius_for(row));
            let mut indices = Vec::new();
            let mut distances = Vec::new();
            self.radius_one(0, point, r_rdist, want_distance, &mut indices, &mut distances);
            if want_distance {
                for value in &mut distances {
                    *value = self.metric.rdist_to_dist(*value);
                }
                if sort {
                    simultaneous_sort(&mut distances, &mut indices);
                }
            }
            result.indices.push(indices);
            result.distances.push(distances);
        }
        Ok(result)
    }

    fn radius_one(
        &self,
        node: usize,
        point: &[f64],
        r_rdist: f64,
        want_distance: bool,
        indices: &mut Vec<usize>,
        distances: &mut Vec<f64>,
    ) {
        let data = self.nodes[node];
        let lower = self.bounds.min_rdist(node, &data, point, self.metric);
        if lower > r_rdist {
            return;
        }

        let upper = self.bounds.max_rdist(node, &data, point, self.metric);
        if upper <= r_rdist {
            // The whole subtree qualifies; no per-point radius tests needed.
            if want_distance {
                for slot in data.idx_start..data.idx_end {
                    let candidate = self.idx[slot];
                    indices.push(candidate);
                    distances.push(self.metric.rdist(point, self.points.row(candidate)));
                }
            } else {
                indices.extend_from_slice(&self.idx[data.idx_start..data.idx_end]);
            }
            return;
        }

        if data.is_leaf {
            for slot in data.idx_start..data.idx_end {
                let candidate = self.idx[slot];
                let rdist = self.metric.rdist(point, self.points.row(candidate));
                if rdist <= r_rdist {
                    indices.push(candidate);
                    if want_distance {
                        distances.push(rdist);
                    }
                }
            }
            return;
        }

        self.radius_one(2 * node + 1, point, r_rdist, want_distance, indices, distances);
        self.radius_one(2 * node + 2, point, r_rdist, want_distance, indices, distances);
    }

    fn radius_count_one(&self, node: usize, point: &[f64], r_rdist: f64) -> usize {
        let data = self.nodes[node];
        let lower = self.bounds.min_rdist(node, &data, point, self.metric);
        if lower > r_rdist {
            return 0;
        }
        let upper = self.bounds.max_rdist(node, &data, point, self.metric);
        if upper <= r_rdist {
            return data.point_count();
        }
        if data.is_leaf {
            return (data.idx_start..data.idx_end)
                .filter(|&slot| {
                    let candidate = self.idx[slot];
                    self.metric.rdist(point, self.points.row(candidate)) <= r_rdist
                })
                .count();
        }
        self.radius_count_one(2 * node + 1, point, r_rdist)
            + self.radius_count_one(2 * node + 2, point, r_rdist)
    }
}
