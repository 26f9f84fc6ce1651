//! Dual-tree Boruvka minimum spanning tree over mutual-reachability distances.
//!
//! Every point starts as its own component. Each round, a dual-tree traversal
//! over (tree, tree) finds, per component, the cheapest edge leaving it under
//! the mutual-reachability distance `max(d / alpha, core(a), core(b))`;
//! accepted edges union their endpoints and the round's component structure
//! is re-cached per node so later rounds can prune whole single-component
//! subtree pairs. The loop terminates when one component remains.

mod union_find;

use std::cmp::Ordering;

use tracing::warn;

use crate::{
    error::{ArborError, Result},
    query::QueryOptions,
    tree::{SpatialTree, TreeGeometry},
};

use self::union_find::UnionFind;

const NO_POINT: usize = usize::MAX;

/// A spanning tree edge in discovery order; `weight` is the full
/// mutual-reachability distance between the endpoints.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MstEdge {
    source: usize,
    sink: usize,
    weight: f64,
}

impl MstEdge {
    /// Returns the endpoint whose component selected the edge.
    #[must_use]
    #[rustfmt::skip]
    pub fn source(&self) -> usize { self.source }

    /// Returns the endpoint in the neighbouring component.
    #[must_use]
    #[rustfmt::skip]
    pub fn sink(&self) -> usize { self.sink }

    /// Returns the mutual-reachability weight of the edge.
    #[must_use]
    #[rustfmt::skip]
    pub fn weight(&self) -> f64 { self.weight }
}

impl Eq for MstEdge {}

impl Ord for MstEdge {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .total_cmp(&other.weight)
            .then_with(|| self.source.cmp(&other.source))
            .then_with(|| self.sink.cmp(&other.sink))
    }
}

impl PartialOrd for MstEdge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Parameters for [`SpatialTree::boruvka_mst`].
#[derive(Clone, Copy, Debug)]
pub struct BoruvkaParams {
    min_samples: usize,
    alpha: f64,
    approx: bool,
}

impl Default for BoruvkaParams {
    fn default() -> Self {
        Self {
            min_samples: 1,
            alpha: 1.0,
            approx: false,
        }
    }
}

impl BoruvkaParams {
    /// Creates parameters with the defaults `min_samples = 1`, `alpha = 1.0`,
    /// `approx = false`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many neighbours define a point's core distance.
    #[must_use]
    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    /// Sets the scaling divisor applied to the raw distance inside the
    /// mutual-reachability formula.
    #[must_use]
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Enables the approximate variant: per-node pruning bounds are carried
    /// across rounds and reset only when a round accepts no edges off them,
    /// which speeds up later rounds but no longer guarantees a minimum
    /// spanning tree.
    #[must_use]
    pub fn with_approx(mut self, approx: bool) -> Self {
        self.approx = approx;
        self
    }

    /// Returns the configured neighbour count for core distances.
    #[must_use]
    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    /// Returns the configured mutual-reachability scaling divisor.
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Returns whether the approximate bound-reset heuristic is enabled.
    #[must_use]
    pub fn approx(&self) -> bool {
        self.approx
    }
}

impl<G: TreeGeometry> SpatialTree<G> {
    /// Builds the minimum spanning tree of the indexed points under the
    /// mutual-reachability distance, returning its `n - 1` edges.
    ///
    /// # Errors
    ///
    /// Returns [`ArborError::InvalidMinSamples`] when `min_samples` is zero
    /// or leaves no neighbour besides the point itself, and
    /// [`ArborError::InvalidAlpha`] on a non-positive or non-finite `alpha`.
    pub fn boruvka_mst(&self, params: &BoruvkaParams) -> Result<Vec<MstEdge>> {
        let n_points = self.points.rows();
        if params.min_samples < 1 || params.min_samples >= n_points {
            return Err(ArborError::InvalidMinSamples {
                got: params.min_samples,
                limit: n_points.saturating_sub(1),
            });
        }
        if !params.alpha.is_finite() || params.alpha <= 0.0 {
            return Err(ArborError::InvalidAlpha {
                value: params.alpha,
            });
        }

        // Core distance: the min_samples-th neighbour excluding the point
        // itself, hence k = min_samples + 1 with sorted rows.
        let knn = self.query(
            &self.points,
            params.min_samples + 1,
            QueryOptions {
                dual_tree: false,
                sort: true,
            },
        )?;
        let core_distance: Vec<f64> = (0..n_points)
            .map(|point| knn.distances(point)[params.min_samples])
            .collect();

        let mut scratch = BoruvkaScratch {
            tree: self,
            alpha: params.alpha,
            approx: params.approx,
            core_distance,
            union_find: UnionFind::new(n_points),
            component_of_point: (0..n_points).collect(),
            component_of_node: vec![None; self.nodes.len()],
            node_bounds: vec![f64::INFINITY; self.nodes.len()],
            candidate_point: vec![NO_POINT; n_points],
            candidate_neighbor: vec![NO_POINT; n_points],
            candidate_distance: vec![f64::INFINITY; n_points],
            edges: Vec::with_capacity(n_points - 1),
        };
        scratch.refresh_component_cache();
        scratch.run();
        Ok(scratch.edges)
    }
}

/// Mutable state of one MST computation; discarded once the edges are built.
struct BoruvkaScratch<'tree, G: TreeGeometry> {
    tree: &'tree SpatialTree<G>,
    alpha: f64,
    approx: bool,
    core_distance: Vec<f64>,
    union_find: UnionFind,
    /// Current component root of every point; refreshed once per round.
    component_of_point: Vec<usize>,
    /// Component root of a node when all its points agree, `None` while the
    /// node still spans several components.
    component_of_node: Vec<Option<usize>>,
    /// Per-node upper bound on the candidate distances its points can still
    /// improve; in full mutual-reachability units.
    node_bounds: Vec<f64>,
    /// Cheapest known external edge per component root.
    candidate_point: Vec<usize>,
    candidate_neighbor: Vec<usize>,
    candidate_distance: Vec<f64>,
    edges: Vec<MstEdge>,
}

impl<G: TreeGeometry> BoruvkaScratch<'_, G> {
    fn run(&mut self) {
        let n_points = self.tree.points.rows();
        // Bounds are infinity on entry; the approximate variant carries them
        // across rounds until a round accepts nothing off them.
        let mut bounds_fresh = true;
        while self.edges.len() < n_points - 1 {
            self.candidate_point.fill(NO_POINT);
            self.candidate_neighbor.fill(NO_POINT);
            self.candidate_distance.fill(f64::INFINITY);

            self.traverse(0, 0);

            let mut accepted = 0_usize;
            for component in 0..n_points {
                if !self.candidate_distance[component].is_finite() {
                    continue;
                }
                let source = self.candidate_point[component];
                let sink = self.candidate_neighbor[component];
                // A component merged earlier this round may have made the
                // candidate stale; skip it.
                if self.union_find.union(source, sink) {
                    self.edges.push(MstEdge {
                        source,
                        sink,
                        weight: self.candidate_distance[component],
                    });
                    accepted += 1;
                }
            }

            if accepted == 0 && self.union_find.components() > 1 {
                if bounds_fresh {
                    // Every pair of points has a finite mutual-reachability
                    // distance, so an empty round off open bounds indicates a
                    // logic error.
                    warn!(
                        components = self.union_find.components(),
                        edges = self.edges.len(),
                        "Boruvka round accepted no edges; stopping early"
                    );
                    return;
                }
                // Carried bounds pruned every cross-component pair; rerun the
                // round with open bounds.
                self.node_bounds.fill(f64::INFINITY);
                bounds_fresh = true;
                continue;
            }

            self.refresh_component_cache();

            // Exact mode re-examines everything each round. The approximate
            // variant carries the tightened bounds forward, trading the
            // minimality guarantee for fewer node visits.
            if self.approx {
                bounds_fresh = false;
            } else {
                self.node_bounds.fill(f64::INFINITY);
                bounds_fresh = true;
            }
        }
    }

    /// Recomputes per-point component roots and the bottom-up per-node
    /// component cache.
    fn refresh_component_cache(&mut self) {
        for point in 0..self.component_of_point.len() {
            self.component_of_point[point] = self.union_find.find(point);
        }

        for node in (0..self.tree.nodes.len()).rev() {
            let data = self.tree.nodes[node];
            self.component_of_node[node] = if data.is_leaf {
                let first = self.component_of_point[self.tree.idx[data.idx_start]];
                let uniform = self.tree.idx[data.idx_start..data.idx_end]
                    .iter()
                    .all(|&point| self.component_of_point[point] == first);
                uniform.then_some(first)
            } else {
                match (
                    self.component_of_node[2 * node + 1],
                    self.component_of_node[2 * node + 2],
                ) {
                    (Some(left), Some(right)) if left == right => Some(left),
                    _ => None,
                }
            };
        }
    }

    fn traverse(&mut self, query_node: usize, ref_node: usize) {
        let lower_rdist = self.tree.bounds.min_rdist_dual(
            query_node,
            &self.tree.nodes[query_node],
            &self.tree.bounds,
            ref_node,
            &self.tree.nodes[ref_node],
            self.tree.metric,
        );
        // Mutual reachability is at least d / alpha, so the scaled plain
        // lower bound stays a valid lower bound on any candidate weight.
        let lower_dist = self.tree.metric.rdist_to_dist(lower_rdist) / self.alpha;
        if lower_dist > self.node_bounds[query_node] {
            return;
        }
        if let (Some(left), Some(right)) = (
            self.component_of_node[query_node],
            self.component_of_node[ref_node],
        ) {
            if left == right {
                return;
            }
        }

        let query_data = self.tree.nodes[query_node];
        let ref_data = self.tree.nodes[ref_node];

        if query_data.is_leaf && ref_data.is_leaf {
            self.search_leaf_pair(query_node, ref_node);
            return;
        }

        if query_data.is_leaf {
            self.descend_reference(query_node, ref_node);
            return;
        }

        if ref_data.is_leaf {
            self.traverse(2 * query_node + 1, ref_node);
            self.traverse(2 * query_node + 2, ref_node);
            return;
        }

        self.descend_reference(2 * query_node + 1, ref_node);
        self.descend_reference(2 * query_node + 2, ref_node);
    }

    /// Recurses into the reference node's children, nearer pair first.
    fn descend_reference(&mut self, query_node: usize, ref_node: usize) {
        let left = 2 * ref_node + 1;
        let right = left + 1;
        let lower_left = self.pair_lower_rdist(query_node, left);
        let lower_right = self.pair_lower_rdist(query_node, right);
        if lower_left <= lower_right {
            self.traverse(query_node, left);
            self.traverse(query_node, right);
        } else {
            self.traverse(query_node, right);
            self.traverse(query_node, left);
        }
    }

    fn pair_lower_rdist(&self, query_node: usize, ref_node: usize) -> f64 {
        self.tree.bounds.min_rdist_dual(
            query_node,
            &self.tree.nodes[query_node],
            &self.tree.bounds,
            ref_node,
            &self.tree.nodes[ref_node],
            self.tree.metric,
        )
    }

    fn search_leaf_pair(&mut self, query_node: usize, ref_node: usize) {
        let query_data = self.tree.nodes[query_node];
        let ref_data = self.tree.nodes[ref_node];

        let mut refreshed = f64::NEG_INFINITY;
        for slot in query_data.idx_start..query_data.idx_end {
            let point = self.tree.idx[slot];
            let component = self.component_of_point[point];

            // Any edge through this point weighs at least its core distance.
            if self.core_distance[point] <= self.candidate_distance[component] {
                let row = self.tree.points.row(point);
                for ref_slot in ref_data.idx_start..ref_data.idx_end {
                    let neighbor = self.tree.idx[ref_slot];
                    if self.component_of_point[neighbor] == component {
                        continue;
                    }
                    let dist = self.tree.metric.dist(row, self.tree.points.row(neighbor));
                    let weight = (dist / self.alpha)
                        .max(self.core_distance[point])
                        .max(self.core_distance[neighbor]);
                    if weight < self.candidate_distance[component] {
                        self.candidate_distance[component] = weight;
                        self.candidate_point[component] = point;
                        self.candidate_neighbor[component] = neighbor;
                    }
                }
            }
            refreshed = refreshed.max(self.candidate_distance[component]);
        }

        if refreshed < self.node_bounds[query_node] {
            self.node_bounds[query_node] = refreshed;
            let mut child = query_node;
            while child > 0 {
                let parent = (child - 1) / 2;
                let parent_bound =
                    self.node_bounds[2 * parent + 1].max(self.node_bounds[2 * parent + 2]);
                if parent_bound < self.node_bounds[parent] {
                    self.node_bounds[parent] = parent_bound;
                    child = parent;
                } else {
                    break;
                }
            }
        }
    }
}
