//! k-nearest-neighbour correctness against brute-force oracles.

mod common;

use arbor_core::{
    ArborError, BallTree, KdTree, Matrix, Metric, QueryOptions, SpatialTree, TreeGeometry,
};
use proptest::prelude::*;
use rstest::rstest;

use common::{brute_force_knn, matrix, random_points};

const TOLERANCE: f64 = 1e-9;

fn check_against_brute_force<G: TreeGeometry>(
    points: &[Vec<f64>],
    metric: Metric,
    k: usize,
    leaf_size: usize,
) {
    let tree = SpatialTree::<G>::build(matrix(points), leaf_size, metric)
        .expect("tree build must succeed");
    let queries = matrix(points);
    let result = tree
        .query(&queries, k, QueryOptions::default())
        .expect("query must succeed");

    for (row, query) in points.iter().enumerate() {
        let expected = brute_force_knn(points, query, k, metric);
        let distances = result.distances(row);
        let indices = result.indices(row);
        for (position, (expected_dist, expected_index)) in expected.iter().enumerate() {
            assert!(
                (distances[position] - expected_dist).abs() < TOLERANCE,
                "row {row} position {position}: {} vs {expected_dist}",
                distances[position]
            );
            assert_eq!(indices[position], *expected_index, "row {row}");
        }
    }
}

#[rstest]
#[case(Metric::Euclidean)]
#[case(Metric::Manhattan)]
#[case(Metric::Chebyshev)]
#[case(Metric::Minkowski(3.0))]
fn kd_tree_matches_brute_force(#[case] metric: Metric) {
    for (rows, cols, k, leaf_size) in [(12, 2, 3, 2), (60, 3, 5, 4), (150, 4, 1, 8)] {
        let points = random_points(rows, cols, 1000 + rows as u64);
        check_against_brute_force::<arbor_core::KdBounds>(&points, metric, k, leaf_size);
    }
}

#[rstest]
#[case(Metric::Euclidean)]
#[case(Metric::Manhattan)]
#[case(Metric::Chebyshev)]
#[case(Metric::Minkowski(1.5))]
fn ball_tree_matches_brute_force(#[case] metric: Metric) {
    for (rows, cols, k, leaf_size) in [(12, 2, 3, 2), (60, 3, 5, 4), (150, 4, 1, 8)] {
        let points = random_points(rows, cols, 2000 + rows as u64);
        check_against_brute_force::<arbor_core::BallBounds>(&points, metric, k, leaf_size);
    }
}

#[test]
fn dual_tree_equals_single_tree() {
    for metric in [Metric::Euclidean, Metric::Manhattan, Metric::Chebyshev] {
        let points = random_points(90, 3, 37);
        let queries = random_points(40, 3, 38);
        let tree = KdTree::build(matrix(&points), 4, metric).expect("build must succeed");

        let single = tree
            .query(&matrix(&queries), 4, QueryOptions::default())
            .expect("single-tree query must succeed");
        let dual = tree
            .query(
                &matrix(&queries),
                4,
                QueryOptions {
                    dual_tree: true,
                    sort: true,
                },
            )
            .expect("dual-tree query must succeed");

        assert_eq!(single, dual);
    }
}

#[test]
fn dual_tree_equals_single_tree_for_ball_geometry() {
    let points = random_points(70, 2, 41);
    let queries = random_points(25, 2, 43);
    let tree = BallTree::build(matrix(&points), 3, Metric::Euclidean).expect("build must succeed");

    let single = tree
        .query(&matrix(&queries), 6, QueryOptions::default())
        .expect("single-tree query must succeed");
    let dual = tree
        .query(
            &matrix(&queries),
            6,
            QueryOptions {
                dual_tree: true,
                sort: true,
            },
        )
        .expect("dual-tree query must succeed");

    assert_eq!(single, dual);
}

#[test]
fn querying_every_point_with_k_equal_to_n_returns_all() {
    let points = random_points(15, 2, 5);
    let tree = KdTree::build(matrix(&points), 2, Metric::Euclidean).expect("build must succeed");
    let result = tree
        .query(&matrix(&points), 15, QueryOptions::default())
        .expect("query must succeed");

    for row in 0..15 {
        let mut indices = result.indices(row).to_vec();
        indices.sort_unstable();
        assert_eq!(indices, (0..15).collect::<Vec<_>>());
        assert_eq!(result.indices(row)[0], row, "self is the nearest point");
        assert_eq!(result.distances(row)[0], 0.0);
    }
}

#[rstest]
#[case(0)]
#[case(16)]
fn rejects_out_of_range_k(#[case] k: usize) {
    let points = random_points(15, 2, 6);
    let tree = KdTree::build(matrix(&points), 2, Metric::Euclidean).expect("build must succeed");
    let result = tree.query(&matrix(&points), k, QueryOptions::default());
    assert!(matches!(
        result,
        Err(ArborError::InvalidK { points: 15, .. })
    ));
}

#[test]
fn rejects_mismatched_query_dimension() {
    let tree = KdTree::build(matrix(&random_points(10, 3, 8)), 2, Metric::Euclidean)
        .expect("build must succeed");
    let queries = Matrix::from_rows(&[vec![0.0, 0.0]]).expect("matrix must build");
    let result = tree.query(&queries, 1, QueryOptions::default());
    assert!(matches!(
        result,
        Err(ArborError::DimensionMismatch { query: 2, tree: 3 })
    ));
}

fn points_and_k() -> impl Strategy<Value = (Vec<Vec<f64>>, usize)> {
    proptest::collection::vec(proptest::collection::vec(-100.0f64..100.0, 3), 1..40)
        .prop_flat_map(|points| {
            let n = points.len();
            (Just(points), 1..=n)
        })
}

proptest! {
    /// Shrunk inputs routinely contain duplicate points, so the property
    /// compares distances and re-derives each reported index's distance
    /// instead of demanding a particular tie order.
    #[test]
    fn knn_distances_match_brute_force((points, k) in points_and_k()) {
        let metric = Metric::Euclidean;
        let tree = KdTree::build(matrix(&points), 3, metric).expect("build must succeed");
        let result = tree
            .query(&matrix(&points), k, QueryOptions::default())
            .expect("query must succeed");

        for (row, query) in points.iter().enumerate() {
            let expected = brute_force_knn(&points, query, k, metric);
            for (position, (expected_dist, _)) in expected.iter().enumerate() {
                let got = result.distances(row)[position];
                prop_assert!((got - expected_dist).abs() < TOLERANCE);
                let via_index = metric.dist(query, &points[result.indices(row)[position]]);
                prop_assert!((got - via_index).abs() < TOLERANCE);
            }
        }
    }
}
