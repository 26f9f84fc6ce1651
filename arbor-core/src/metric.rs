//! Minkowski-family distance metrics.
//!
//! Tree traversal works in "reduced" distances wherever possible: the squared
//! Euclidean distance, or a Minkowski distance raised to its exponent without
//! the final root. Reduced distances preserve ordering, so pruning bounds and
//! heap comparisons avoid the expensive root operation until results are
//! converted for the caller.

#[derive(Clone, Copy, Debug, PartialEq)]
/// Distance metric applied by a tree and its queries.
pub enum Metric {
    /// L2 distance; reduced form is the squared distance.
    Euclidean,
    /// L1 distance; reduced form equals the full distance.
    Manhattan,
    /// L∞ distance; reduced form equals the full distance.
    Chebyshev,
    /// General Minkowski distance with exponent `p`; reduced form omits the
    /// final `1/p` root. Exponents below one do not form a metric and are
    /// substituted with [`Metric::Euclidean`] at tree construction.
    Minkowski(f64),
}

impl Metric {
    /// Returns the metric exponent, `f64::INFINITY` for [`Metric::Chebyshev`].
    #[must_use]
    pub fn exponent(&self) -> f64 {
        match self {
            Self::Euclidean => 2.0,
            Self::Manhattan => 1.0,
            Self::Chebyshev => f64::INFINITY,
            Self::Minkowski(p) => *p,
        }
    }

    /// Returns `true` when the metric satisfies the metric axioms required by
    /// the pruning bounds.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Euclidean | Self::Manhattan | Self::Chebyshev => true,
            Self::Minkowski(p) => p.is_finite() && *p >= 1.0,
        }
    }

    /// Computes the reduced (partial) distance between two points.
    #[must_use]
    pub fn rdist(&self, left: &[f64], right: &[f64]) -> f64 {
        match self {
            Self::Euclidean => left
                .iter()
                .zip(right)
                .map(|(a, b)| (a - b) * (a - b))
                .sum(),
            Self::Manhattan => left.iter().zip(right).map(|(a, b)| (a - b).abs()).sum(),
            Self::Chebyshev => left
                .iter()
                .zip(right)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max),
            Self::Minkowski(p) => left
                .iter()
                .zip(right)
                .map(|(a, b)| (a - b).abs().powf(*p))
                .sum(),
        }
    }

    /// Computes the full distance between two points.
    #[must_use]
    pub fn dist(&self, left: &[f64], right: &[f64]) -> f64 {
        self.rdist_to_dist(self.rdist(left, right))
    }

    /// Converts a reduced distance into a full distance.
    #[must_use]
    pub fn rdist_to_dist(&self, rdist: f64) -> f64 {
        match self {
            Self::Euclidean => rdist.sqrt(),
            Self::Manhattan | Self::Chebyshev => rdist,
            Self::Minkowski(p) => rdist.powf(p.recip()),
        }
    }

    /// Converts a full distance into a reduced distance.
    #[must_use]
    pub fn dist_to_rdist(&self, dist: f64) -> f64 {
        match self {
            Self::Euclidean => dist * dist,
            Self::Manhattan | Self::Chebyshev => dist,
            Self::Minkowski(p) => dist.powf(*p),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::Metric;

    const A: [f64; 3] = [0.0, 1.0, -2.0];
    const B: [f64; 3] = [3.0, 1.0, 2.0];

    #[rstest]
    #[case(Metric::Euclidean, 5.0)]
    #[case(Metric::Manhattan, 7.0)]
    #[case(Metric::Chebyshev, 4.0)]
    #[case(Metric::Minkowski(3.0), (27.0f64 + 64.0).powf(1.0 / 3.0))]
    fn computes_full_distances(#[case] metric: Metric, #[case] expected: f64) {
        assert!((metric.dist(&A, &B) - expected).abs() < 1e-12);
    }

    #[rstest]
    #[case(Metric::Euclidean)]
    #[case(Metric::Manhattan)]
    #[case(Metric::Chebyshev)]
    #[case(Metric::Minkowski(1.5))]
    fn reduced_distance_round_trips(#[case] metric: Metric) {
        let rdist = metric.rdist(&A, &B);
        let dist = metric.rdist_to_dist(rdist);
        assert!((metric.dist_to_rdist(dist) - rdist).abs() < 1e-9);
        assert!((metric.dist(&A, &B) - dist).abs() < 1e-12);
    }

    #[test]
    fn sub_unit_minkowski_exponent_is_invalid() {
        assert!(!Metric::Minkowski(0.5).is_valid());
        assert!(!Metric::Minkowski(f64::NAN).is_valid());
        assert!(Metric::Minkowski(1.0).is_valid());
    }
}
