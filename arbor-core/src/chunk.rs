//! Fork-join execution of batched queries.
//!
//! The query rows are cut into contiguous chunks and the pre-allocated output
//! matrices are split into the matching disjoint `&mut` row ranges, so every
//! fork-join task owns its output exclusively and no lock is needed. Per-row
//! results do not depend on chunk boundaries or scheduling: a serial run and
//! any parallel run produce bit-identical output.

use std::num::NonZeroUsize;

use tracing::warn;

use crate::{
    error::{ArborError, Result},
    matrix::Matrix,
    neighborhood::Neighborhood,
    query::finalize_rows,
    tree::{SpatialTree, TreeGeometry},
};

/// How a batch of query rows is cut into chunks.
///
/// All strategies are deterministic given the row count and the core count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkStrategy {
    /// Fixed number of rows per chunk.
    Sized(NonZeroUsize),
    /// Fixed number of chunks, sized as evenly as possible.
    Count(NonZeroUsize),
    /// One chunk per available core.
    PerCore,
}

impl ChunkStrategy {
    fn rows_per_chunk(self, rows: usize, cores: usize) -> usize {
        match self {
            Self::Sized(size) => size.get(),
            Self::Count(count) => rows.div_ceil(count.get()).max(1),
            Self::PerCore => rows.div_ceil(cores.max(1)).max(1),
        }
    }
}

/// Options controlling batched query execution.
#[derive(Clone, Copy, Debug)]
pub struct BatchOptions {
    /// Chunking strategy for the query rows.
    pub strategy: ChunkStrategy,
    /// When set, run on a dedicated pool with this many threads; when pool
    /// construction fails the batch falls back to serial execution with a
    /// warning. When unset, the shared global pool is used.
    pub threads: Option<NonZeroUsize>,
    /// Sort each result row ascending by distance.
    pub sort: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            strategy: ChunkStrategy::PerCore,
            threads: None,
            sort: true,
        }
    }
}

impl<G: TreeGeometry> SpatialTree<G> {
    /// Runs the single-tree k-NN query for a batch of query rows in parallel.
    ///
    /// Output is bit-identical to [`SpatialTree::query`] with the same
    /// arguments, across all chunk strategies and thread counts.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`SpatialTree::query`].
    pub fn query_batch(
        &self,
        queries: &Matrix,
        k: usize,
        options: &BatchOptions,
    ) -> Result<Neighborhood> {
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
        let chunk_rows = options
            .strategy
            .rows_per_chunk(rows, rayon::current_num_threads());

        match options.threads {
            Some(threads) => {
                match rayon::ThreadPoolBuilder::new()
                    .num_threads(threads.get())
                    .build()
                {
                    Ok(pool) => pool.install(|| {
                        self.query_chunked(queries, k, chunk_rows, 0, &mut dist, &mut idx);
                    }),
                    Err(error) => {
                        warn!(%error, "dedicated thread pool unavailable; executing batch serially");
                        self.query_rows_into(queries, 0, rows, k, &mut dist, &mut idx);
                    }
                }
            }
            None => self.query_chunked(queries, k, chunk_rows, 0, &mut dist, &mut idx),
        }

        finalize_rows(self.metric, k, &mut dist, &mut idx, options.sort);
        Ok(Neighborhood::new(rows, k, dist, idx))
    }

    /// Binary fork/join over chunk-aligned halves of the output rows. The
    /// split hands each side an exclusive sub-slice, so the join is purely
    /// structural.
    fn query_chunked(
        &self,
        queries: &Matrix,
        k: usize,
        chunk_rows: usize,
        row0: usize,
        dist: &mut [f64],
        idx: &mut [usize],
    ) {
        let rows = dist.len() / k;
        if rows <= chunk_rows {
            self.query_rows_into(queries, row0, rows, k, dist, idx);
            return;
        }

        let chunks = rows.div_ceil(chunk_rows);
        let mid = (chunks / 2) * chunk_rows;
        let (dist_lo, dist_hi) = dist.split_at_mut(mid * k);
        let (idx_lo, idx_hi) = idx.split_at_mut(mid * k);
        rayon::join(
            || self.query_chunked(queries, k, chunk_rows, row0, dist_lo, idx_lo),
            || self.query_chunked(queries, k, chunk_rows, row0 + mid, dist_hi, idx_hi),
        );
    }
}
