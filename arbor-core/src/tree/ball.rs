//! Centroid/radius ball node geometry.

use crate::{matrix::Matrix, metric::Metric};

use super::{NodeData, TreeGeometry};

/// Per-node centroids stored as a flat array of `n_nodes * dims` entries; the
/// node radius lives in [`NodeData`], in full-distance units.
#[derive(Clone, Debug)]
pub struct BallBounds {
    centroids: Vec<f64>,
    dims: usize,
}

impl BallBounds {
    fn centroid_of(&self, node: usize) -> &[f64] {
        &self.centroids[node * self.dims..(node + 1) * self.dims]
    }
}

impl TreeGeometry for BallBounds {
    fn allocate(n_nodes: usize, dims: usize) -> Self {
        Self {
            centroids: vec![0.0; n_nodes * dims],
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
        self.centroids[base..base + self.dims].fill(0.0);
        for &point in members {
            let row = points.row(point);
            for dim in 0..self.dims {
                self.centroids[base + dim] += row[dim];
            }
        }
        let scale = 1.0 / members.len() as f64;
        for value in &mut self.centroids[base..base + self.dims] {
            *value *= scale;
        }

        let centroid = &self.centroids[base..base + self.dims];
        let max_rdist = members
            .iter()
            .map(|&point| metric.rdist(centroid, points.row(point)))
            .fold(0.0, f64::max);
        metric.rdist_to_dist(max_rdist)
    }

    fn min_rdist(&self, node: usize, node_data: &NodeData, point: &[f64], metric: Metric) -> f64 {
        let to_centroid = metric.dist(point, self.centroid_of(node));
        metric.dist_to_rdist((to_centroid - node_data.radius).max(0.0))
    }

    fn max_rdist(&self, node: usize, node_data: &NodeData, point: &[f64], metric: Metric) -> f64 {
        let to_centroid = metric.dist(point, self.centroid_of(node));
        metric.dist_to_rdist(to_centroid + node_data.radius)
    }

    fn min_rdist_dual(
        &self,
        node: usize,
        node_data: &NodeData,
        other: &Self,
        other_node: usize,
        other_data: &NodeData,
        metric: Metric,
    ) -> f64 {
        let between = metric.dist(self.centroid_of(node), other.centroid_of(other_node));
        metric.dist_to_rdist((between - node_data.radius - other_data.radius).max(0.0))
    }

    fn max_rdist_dual(
        &self,
        node: usize,
        node_data: &NodeData,
        other: &Self,
        other_node: usize,
        other_data: &NodeData,
        metric: Metric,
    ) -> f64 {
        let between = metric.dist(self.centroid_of(node), other.centroid_of(other_node));
        metric.dist_to_rdist(between + node_data.radius + other_data.radius)
    }
}
