//! Axis-aligned KD node geometry.

use crate::{matrix::Matrix, metric::Metric};

use super::{NodeData, TreeGeometry};

/// Per-node axis-aligned bounding boxes, stored as flat lower/upper arrays of
/// `n_nodes * dims` entries.
#[derive(Clone, Debug)]
pub struct KdBounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
    dims: usize,
}

impl KdBounds {
    fn lower_of(&self, node: usize) -> &[f64] {
        &self.lower[node * self.dims..(node + 1) * self.dims]
    }

    fn upper_of(&self, node: usize) -> &[f64] {
        &self.upper[node * self.dims..(node + 1) * self.dims]
    }
}

/// Accumulates per-dimension contributions under the metric's exponent: a
/// running maximum for the Chebyshev case, a powered sum otherwise.
fn accumulate(metric: Metric, acc: f64, term: f64) -> f64 {
    let p = metric.exponent();
    if p.is_infinite() {
        acc.max(term)
    } else if p == 1.0 {
        acc + term
    } else if p == 2.0 {
        acc + term * term
    } else {
        acc + term.powf(p)
    }
}

impl TreeGeometry for KdBounds {
    fn allocate(n_nodes: usize, dims: usize) -> Self {
        Self {
            lower: vec![f64::INFINITY; n_nodes * dims],
            upper: vec![f64::NEG_INFINITY; n_nodes * dims],
            dims,
        }
    }

    fn init_node(
        &mut self,
        node: usize,
        points: &Matrix,
        members: &[usize],
        metric: Metric,
    ) -> f64 {
        let base = node * self.dims;
        for dim in 0..self.dims {
            let mut lo = f64::INFINITY;
            let mut hi = f64::NEG_INFINITY;
            for &point in members {
                let value = points.row(point)[dim];
                lo = lo.min(value);
                hi = hi.max(value);
            }
            self.lower[base + dim] = lo;
            self.upper[base + dim] = hi;
        }

        // Radius in reduced-distance units: the metric evaluated on the
        // half-extents, with the max half-extent under Chebyshev.
        let mut radius = 0.0;
        for dim in 0..self.dims {
            let half = 0.5 * (self.upper[base + dim] - self.lower[base + dim]);
            radius = accumulate(metric, radius, half);
        }
        radius
    }

    fn min_rdist(&self, node: usize, _node_data: &NodeData, point: &[f64], metric: Metric) -> f64 {
        let lower = self.lower_of(node);
        let upper = self.upper_of(node);
        let mut bound = 0.0;
        for dim in 0..self.dims {
            let below = (lower[dim] - point[dim]).max(0.0);
            let above = (point[dim] - upper[dim]).max(0.0);
            bound = accumulate(metric, bound, below + above);
        }
        bound
    }

    fn max_rdist(&self, node: usize, _node_data: &NodeData, point: &[f64], metric: Metric) -> f64 {
        let lower = self.lower_of(node);
        let upper = self.upper_of(node);
        let mut bound = 0.0;
        for dim in 0..self.dims {
            let reach = (point[dim] - lower[dim]).max(upper[dim] - point[dim]);
            bound = accumulate(metric, bound, reach);
        }
        bound
    }

    fn min_rdist_dual(
        &self,
        node: usize,
        _node_data: &NodeData,
        other: &Self,
        other_node: usize,
        _other_data: &NodeData,
        metric: Metric,
    ) -> f64 {
        let lower = self.lower_of(node);
        let upper = self.upper_of(node);
        let other_lower = other.lower_of(other_node);
        let other_upper = other.upper_of(other_node);
        let mut bound = 0.0;
        for dim in 0..self.dims {
            let gap = (lower[dim] - other_upper[dim]).max(0.0)
                + (other_lower[dim] - upper[dim]).max(0.0);
            bound = accumulate(metric, bound, gap);
        }
        bound
    }

    fn max_rdist_dual(
        &self,
        node: usize,
        _node_data: &NodeData,
        other: &Self,
        other_node: usize,
        _other_data: &NodeData,
        metric: Metric,
    ) -> f64 {
        let lower = self.lower_of(node);
        let upper = self.upper_of(node);
        let other_lower = other.lower_of(other_node);
        let other_upper = other.upper_of(other_node);
        let mut bound = 0.0;
        for dim in 0..self.dims {
            let reach = (upper[dim] - other_lower[dim]).max(other_upper[dim] - lower[dim]);
            bound = accumulate(metric, bound, reach);
        }
        bound
    }
}
