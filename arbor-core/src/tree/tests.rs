//! Unit tests for tree construction and the in-place index partition.

use rand::{Rng, SeedableRng, rngs::SmallRng};
use rstest::rstest;

use crate::{ArborError, Matrix, Metric};

use super::{BallBounds, KdBounds, SpatialTree, TreeGeometry, partition_indices, widest_dimension};

fn random_matrix(rows: usize, cols: usize, seed: u64) -> Matrix {
    let mut rng = SmallRng::seed_from_u64(seed);
    let data: Vec<f64> = (0..rows * cols).map(|_| rng.gen_range(-5.0..5.0)).collect();
    Matrix::from_flat(rows, cols, data).expect("random matrix must be valid")
}

/// Walks every node checking range contiguity, the permutation property, the
/// leaf-size contract, and the split-dimension partition invariant.
fn check_structure<G: TreeGeometry>(tree: &SpatialTree<G>) {
    let n_points = tree.points.rows();
    let mut seen = vec![false; n_points];
    for &point in &tree.idx {
        assert!(!seen[point], "index permutation repeats point {point}");
        seen[point] = true;
    }
    assert!(seen.iter().all(|&s| s), "index permutation drops points");

    for (node, data) in tree.nodes.iter().enumerate() {
        assert!(data.idx_start < data.idx_end, "node {node} owns no points");
        if data.is_leaf {
            continue;
        }

        let left = &tree.nodes[2 * node + 1];
        let right = &tree.nodes[2 * node + 2];
        assert_eq!(left.idx_start, data.idx_start);
        assert_eq!(left.idx_end, right.idx_start);
        assert_eq!(right.idx_end, data.idx_end);

        // The builder picks the widest dimension from the same member set, so
        // recomputing it here reproduces the split choice deterministically.
        let members = &tree.idx[data.idx_start..data.idx_end];
        let split_dim = widest_dimension(&tree.points, members);
        let left_max = tree.idx[left.idx_start..left.idx_end]
            .iter()
            .map(|&p| tree.points.row(p)[split_dim])
            .fold(f64::NEG_INFINITY, f64::max);
        let right_min = tree.idx[right.idx_start..right.idx_end]
            .iter()
            .map(|&p| tree.points.row(p)[split_dim])
            .fold(f64::INFINITY, f64::min);
        assert!(
            left_max <= right_min,
            "node {node} violates the partition invariant: {left_max} > {right_min}"
        );
    }
}

#[rstest]
#[case(1, 1)]
#[case(5, 2)]
#[case(40, 3)]
#[case(200, 5)]
fn kd_tree_structure_holds(#[case] rows: usize, #[case] cols: usize) {
    let tree = SpatialTree::<KdBounds>::build(random_matrix(rows, cols, 7), 4, Metric::Euclidean)
        .expect("build must succeed");
    check_structure(&tree);
}

#[rstest]
#[case(5, 2)]
#[case(120, 4)]
fn ball_tree_structure_holds(#[case] rows: usize, #[case] cols: usize) {
    let tree = SpatialTree::<BallBounds>::build(random_matrix(rows, cols, 11), 3, Metric::Manhattan)
        .expect("build must succeed");
    check_structure(&tree);
}

#[test]
fn leaves_stay_within_twice_leaf_size() {
    let leaf_size = 4;
    let tree =
        SpatialTree::<KdBounds>::build(random_matrix(257, 3, 3), leaf_size, Metric::Euclidean)
            .expect("build must succeed");
    for data in tree.nodes.iter().filter(|d| d.is_leaf) {
        assert!(data.point_count() <= 2 * leaf_size);
    }
}

#[test]
fn rejects_zero_leaf_size() {
    let result = SpatialTree::<KdBounds>::build(random_matrix(8, 2, 1), 0, Metric::Euclidean);
    assert!(matches!(result, Err(ArborError::InvalidLeafSize { got: 0 })));
}

#[test]
fn invalid_metric_falls_back_to_euclidean() {
    let subscriber = tracing_subscriber::fmt().with_test_writer().finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let tree = SpatialTree::<BallBounds>::build(random_matrix(8, 2, 5), 2, Metric::Minkowski(0.5))
        .expect("build must succeed despite the invalid metric");
    assert_eq!(tree.metric(), Metric::Euclidean);
}

#[test]
fn single_point_builds_a_root_leaf() {
    let tree = SpatialTree::<KdBounds>::build(
        Matrix::from_rows(&[vec![1.0, 2.0]]).expect("matrix must build"),
        4,
        Metric::Euclidean,
    )
    .expect("build must succeed");
    assert_eq!(tree.node_count(), 1);
    assert!(tree.nodes[0].is_leaf);
}

#[test]
fn partition_splits_around_the_requested_position() {
    let points = random_matrix(64, 1, 9);
    let mut idx: Vec<usize> = (0..64).collect();
    let split_index = 31;
    partition_indices(&points, &mut idx, 0, split_index);

    let pivot = points.row(idx[split_index])[0];
    for &point in &idx[..split_index] {
        assert!(points.row(point)[0] <= pivot);
    }
    for &point in &idx[split_index..] {
        assert!(points.row(point)[0] >= pivot);
    }
}

#[test]
fn partition_handles_constant_coordinates() {
    let points = Matrix::from_flat(16, 1, vec![2.5; 16]).expect("matrix must build");
    let mut idx: Vec<usize> = (0..16).collect();
    partition_indices(&points, &mut idx, 0, 8);
    let mut sorted = idx.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, (0..16).collect::<Vec<_>>());
}
