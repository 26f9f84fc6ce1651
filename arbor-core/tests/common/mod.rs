//! Shared helpers for the integration suites: deterministic datasets and
//! brute-force oracles the tree results are checked against.

use arbor_core::{Matrix, Metric, MstEdge};
use rand::{Rng, SeedableRng, rngs::SmallRng};

/// Uniform random points in `[-50, 50)^cols`; continuous draws, so ties in
/// pairwise distances do not occur in practice.
pub fn random_points(rows: usize, cols: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..rows)
        .map(|_| (0..cols).map(|_| rng.gen_range(-50.0..50.0)).collect())
        .collect()
}

pub fn matrix(points: &[Vec<f64>]) -> Matrix {
    Matrix::from_rows(points).expect("test points must form a valid matrix")
}

/// Exhaustive top-k: distances ascending, ties broken by index.
pub fn brute_force_knn(
    points: &[Vec<f64>],
    query: &[f64],
    k: usize,
    metric: Metric,
) -> Vec<(f64, usize)> {
    let mut all: Vec<(f64, usize)> = points
        .iter()
        .enumerate()
        .map(|(index, point)| (metric.dist(query, point), index))
        .collect();
    all.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    all.truncate(k);
    all
}

/// Exhaustive radius scan: every index with distance `<= radius`, ascending
/// by index.
pub fn brute_force_radius(
    points: &[Vec<f64>],
    query: &[f64],
    radius: f64,
    metric: Metric,
) -> Vec<usize> {
    points
        .iter()
        .enumerate()
        .filter(|(_, point)| metric.dist(query, point) <= radius)
        .map(|(index, _)| index)
        .collect()
}

/// Core distances by brute force: distance to the `min_samples`-th nearest
/// neighbour excluding the point itself.
pub fn brute_force_core_distances(
    points: &[Vec<f64>],
    min_samples: usize,
    metric: Metric,
) -> Vec<f64> {
    (0..points.len())
        .map(|point| {
            let mut dists: Vec<f64> = (0..points.len())
                .filter(|&other| other != point)
                .map(|other| metric.dist(&points[point], &points[other]))
                .collect();
            dists.sort_by(f64::total_cmp);
            dists[min_samples - 1]
        })
        .collect()
}

/// Asserts `edges` form a spanning tree over `n` points: `n - 1` edges and
/// every point reachable from point 0.
pub fn assert_spanning_tree(n: usize, edges: &[MstEdge]) {
    assert_eq!(edges.len(), n - 1);
    let mut adjacency = vec![Vec::new(); n];
    for edge in edges {
        adjacency[edge.source()].push(edge.sink());
        adjacency[edge.sink()].push(edge.source());
    }
    let mut visited = vec![false; n];
    visited[0] = true;
    let mut stack = vec![0];
    while let Some(node) = stack.pop() {
        for &next in &adjacency[node] {
            if !visited[next] {
                visited[next] = true;
                stack.push(next);
            }
        }
    }
    assert!(
        visited.iter().all(|&seen| seen),
        "edges leave points unreached"
    );
}

/// Total weight of a Prim MST over an arbitrary symmetric weight function.
pub fn prim_total_weight(n: usize, weight: impl Fn(usize, usize) -> f64) -> f64 {
    let mut in_tree = vec![false; n];
    let mut best = vec![f64::INFINITY; n];
    best[0] = 0.0;
    let mut total = 0.0;

    for _ in 0..n {
        let next = (0..n)
            .filter(|&node| !in_tree[node])
            .min_by(|&a, &b| best[a].total_cmp(&best[b]))
            .expect("an unvisited node must remain");
        in_tree[next] = true;
        total += best[next];
        for node in (0..n).filter(|&node| !in_tree[node]) {
            best[node] = best[node].min(weight(next, node));
        }
    }
    total
}

/// Mutual-reachability weight used by the Boruvka oracle.
pub fn mutual_reachability(
    points: &[Vec<f64>],
    core: &[f64],
    alpha: f64,
    metric: Metric,
    a: usize,
    b: usize,
) -> f64 {
    (metric.dist(&points[a], &points[b]) / alpha)
        .max(core[a])
        .max(core[b])
}
