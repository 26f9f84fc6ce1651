//! Binary space-partitioning trees over a fixed point matrix.
//!
//! A [`SpatialTree`] never moves points: it permutes an index array so that
//! every node owns a contiguous `[idx_start, idx_end)` slice of it. Nodes are
//! laid out as an implicit complete binary tree (children of `i` at `2i + 1`
//! and `2i + 2`). The axis-aligned and centroid/radius geometries plug into
//! the same build and traversal machinery through [`TreeGeometry`].

mod ball;
mod kd;

use std::cmp::Ordering;

use tracing::warn;

use crate::{
    error::{ArborError, Result},
    matrix::Matrix,
    metric::Metric,
};

pub use self::ball::BallBounds;
pub use self::kd::KdBounds;

/// Per-node bookkeeping shared by both geometries.
#[derive(Clone, Copy, Debug, Default)]
pub struct NodeData {
    pub(crate) idx_start: usize,
    pub(crate) idx_end: usize,
    pub(crate) is_leaf: bool,
    /// Bounding radius; reduced-distance units for KD nodes, full-distance
    /// units for ball nodes.
    pub(crate) radius: f64,
}

impl NodeData {
    pub(crate) fn point_count(&self) -> usize {
        self.idx_end - self.idx_start
    }
}

/// Geometry capability used by the generic build and traversal engine.
///
/// Implementations own the per-node bound storage (an axis-aligned box per
/// node, or a centroid per node) and answer reduced-distance bound queries
/// against it. The engine is monomorphised over the geometry, so bound
/// computations in the traversal hot loops dispatch statically.
pub trait TreeGeometry: Send + Sync + Sized {
    /// Allocates bound storage for `n_nodes` nodes of dimensionality `dims`.
    fn allocate(n_nodes: usize, dims: usize) -> Self;

    /// Computes the bounds of `node` from the points listed in `members`,
    /// returning the node radius.
    fn init_node(&mut self, node: usize, points: &Matrix, members: &[usize], metric: Metric)
    -> f64;

    /// Lower bound on the reduced distance from `point` to any point in `node`.
    fn min_rdist(&self, node: usize, node_data: &NodeData, point: &[f64], metric: Metric) -> f64;

    /// Upper bound on the reduced distance from `point` to any point in `node`.
    fn max_rdist(&self, node: usize, node_data: &NodeData, point: &[f64], metric: Metric) -> f64;

    /// Lower bound on the reduced distance between any point of `node` and
    /// any point of `other_node` in `other`.
    fn min_rdist_dual(
        &self,
        node: usize,
        node_data: &NodeData,
        other: &Self,
        other_node: usize,
        other_data: &NodeData,
        metric: Metric,
    ) -> f64;

    /// Upper bound on the reduced distance between any point of `node` and
    /// any point of `other_node` in `other`.
    fn max_rdist_dual(
        &self,
        node: usize,
        node_data: &NodeData,
        other: &Self,
        other_node: usize,
        other_data: &NodeData,
        metric: Metric,
    ) -> f64;
}

/// Space-partitioning tree generic over its node geometry.
///
/// Built once over an owned copy of the point matrix and read-only
/// thereafter; queries allocate their own scratch state, so a tree can be
/// shared freely across threads.
#[derive(Clone, Debug)]
pub struct SpatialTree<G: TreeGeometry> {
    pub(crate) points: Matrix,
    pub(crate) idx: Vec<usize>,
    pub(crate) nodes: Vec<NodeData>,
    pub(crate) bounds: G,
    pub(crate) metric: Metric,
    pub(crate) leaf_size: usize,
}

/// Axis-aligned KD variant of [`SpatialTree`].
pub type KdTree = SpatialTree<KdBounds>;

/// Centroid/radius ball variant of [`SpatialTree`].
pub type BallTree = SpatialTree<BallBounds>;

impl<G: TreeGeometry> SpatialTree<G> {
    /// Builds a tree over `points` with the given target leaf size.
    ///
    /// An invalid metric is substituted with [`Metric::Euclidean`] and logged
    /// rather than failing. The level count is chosen so that leaves hold
    /// between `leaf_size` and `2 * leaf_size` points; when a skewed split
    /// forces a larger leaf the tree logs a warning and continues, trading
    /// pruning efficiency for stability of the node layout.
    ///
    /// # Errors
    ///
    /// Returns [`ArborError::InvalidLeafSize`] when `leaf_size < 1`. Shape
    /// and finiteness violations are rejected earlier, by [`Matrix`]
    /// construction.
    pub fn build(points: Matrix, leaf_size: usize, metric: Metric) -> Result<Self> {
        if leaf_size < 1 {
            return Err(ArborError::InvalidLeafSize { got: leaf_size });
        }
        let metric = if metric.is_valid() {
            metric
        } else {
            warn!(
                ?metric,
                "metric does not satisfy the pruning-bound axioms; substituting Euclidean"
            );
            Metric::Euclidean
        };

        let n_points = points.rows();
        let ratio = ((n_points - 1) / leaf_size).max(1);
        let n_levels = ratio.ilog2() as usize + 1;
        let n_nodes = (1_usize << n_levels) - 1;

        let mut idx: Vec<usize> = (0..n_points).collect();
        let mut nodes = vec![NodeData::default(); n_nodes];
        let mut bounds = G::allocate(n_nodes, points.cols());

        build_node(
            0,
            0,
            n_points,
            &points,
            metric,
            leaf_size,
            &mut idx,
            &mut nodes,
            &mut bounds,
        );

        Ok(Self {
            points,
            idx,
            nodes,
            bounds,
            metric,
            leaf_size,
        })
    }

    /// Returns the indexed point matrix.
    #[must_use]
    pub fn points(&self) -> &Matrix {
        &self.points
    }

    /// Returns the metric the tree was built with.
    #[must_use]
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Returns the configured target leaf size.
    #[must_use]
    pub fn leaf_size(&self) -> usize {
        self.leaf_size
    }

    /// Returns the number of allocated nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[expect(clippy::too_many_arguments, reason = "split borrows of the tree fields")]
fn build_node<G: TreeGeometry>(
    node: usize,
    start: usize,
    end: usize,
    points: &Matrix,
    metric: Metric,
    leaf_size: usize,
    idx: &mut [usize],
    nodes: &mut [NodeData],
    bounds: &mut G,
) {
    let radius = bounds.init_node(node, points, &idx[start..end], metric);
    let n_points = end - start;
    let has_child_slots = 2 * node + 1 < nodes.len();

    if !has_child_slots || n_points < 2 {
        nodes[node] = NodeData {
            idx_start: start,
            idx_end: end,
            is_leaf: true,
            radius,
        };
        if n_points > 2 * leaf_size {
            warn!(
                node,
                n_points, leaf_size, "forced leaf exceeds 2*leaf_size points; query pruning may degrade"
            );
        }
        return;
    }

    nodes[node] = NodeData {
        idx_start: start,
        idx_end: end,
        is_leaf: false,
        radius,
    };

    let split_dim = widest_dimension(points, &idx[start..end]);
    let mid = start + n_points / 2;
    partition_indices(points, &mut idx[start..end], split_dim, n_points / 2);

    build_node(
        2 * node + 1,
        start,
        mid,
        points,
        metric,
        leaf_size,
        idx,
        nodes,
        bounds,
    );
    build_node(
        2 * node + 2,
        mid,
        end,
        points,
        metric,
        leaf_size,
        idx,
        nodes,
        bounds,
    );
}

/// Returns the dimension with the largest coordinate spread over `members`.
fn widest_dimension(points: &Matrix, members: &[usize]) -> usize {
    let dims = points.cols();
    let mut best_dim = 0;
    let mut best_spread = f64::NEG_INFINITY;
    for dim in 0..dims {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &point in members {
            let value = points.row(point)[dim];
            lo = lo.min(value);
            hi = hi.max(value);
        }
        let spread = hi - lo;
        if spread > best_spread {
            best_spread = spread;
            best_dim = dim;
        }
    }
    best_dim
}

/// Partitions `idx` in place so that the `split_index` smallest coordinates
/// along `split_dim` end up left of `split_index`.
///
/// Single-pivot quickselect: only the partition holding the split position is
/// revisited, so the expected cost is linear in `idx.len()`.
fn partition_indices(points: &Matrix, idx: &mut [usize], split_dim: usize, split_index: usize) {
    let mut left = 0;
    let mut right = idx.len() - 1;
    loop {
        let pivot = points.row(idx[right])[split_dim];
        let mut store = left;
        for cursor in left..right {
            if points.row(idx[cursor])[split_dim] < pivot {
                idx.swap(store, cursor);
                store += 1;
            }
        }
        idx.swap(store, right);

        match store.cmp(&split_index) {
            Ordering::Equal => return,
            Ordering::Less => left = store + 1,
            Ordering::Greater => right = store - 1,
        }
    }
}

#[cfg(test)]
mod tests;
