//! Arbor core library.
//!
//! Spatial indexing and nearest-neighbour search for clustering workloads:
//! KD and ball trees over a fixed point matrix, single-tree and dual-tree
//! k-NN and radius queries with reduced-distance pruning, fork-join batched
//! execution, and a dual-tree Boruvka builder for the mutual-reachability
//! minimum spanning tree.

mod chunk;
mod error;
mod heap;
mod matrix;
mod metric;
mod mst;
mod neighborhood;
mod query;
mod tree;

pub use crate::{
    chunk::{BatchOptions, ChunkStrategy},
    error::{ArborError, ArborErrorCode, Result},
    matrix::Matrix,
    metric::Metric,
    mst::{BoruvkaParams, MstEdge},
    neighborhood::{Neighborhood, RadiusNeighborhood},
    query::{QueryOptions, RadiusSpec},
    tree::{BallBounds, BallTree, KdBounds, KdTree, NodeData, SpatialTree, TreeGeometry},
};
