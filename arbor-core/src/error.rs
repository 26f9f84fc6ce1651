//! Error types for the arbor core library.
//!
//! Defines the error enum exposed by the public API and a convenient result
//! alias. Every variant carries a stable machine-readable code so callers can
//! branch on failures without parsing display strings.

use std::fmt;

use thiserror::Error;

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

/// Error type produced while building or querying spatial trees.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ArborError {
    /// Leaf size must be at least one point.
    #[error("leaf_size must be at least 1 (got {got})")]
    InvalidLeafSize {
        /// The invalid leaf size supplied by the caller.
        got: usize,
    },
    /// The point matrix contained no rows.
    #[error("point matrix contains no rows")]
    EmptyPointSet,
    /// A row of the point matrix had a different length from the first row.
    #[error("row {row} has {got} columns but the matrix has {expected}")]
    JaggedRow {
        /// Index of the offending row.
        row: usize,
        /// Column count established by the first row.
        expected: usize,
        /// Column count of the offending row.
        got: usize,
    },
    /// The flat buffer length did not match the requested shape.
    #[error("buffer of length {len} cannot form a {rows}x{cols} matrix")]
    ShapeMismatch {
        /// Requested row count.
        rows: usize,
        /// Requested column count.
        cols: usize,
        /// Length of the provided buffer.
        len: usize,
    },
    /// A point coordinate was NaN or infinite.
    #[error("point matrix contains a non-finite value at row {row}, column {col}: {value}")]
    NonFinite {
        /// Row of the non-finite value.
        row: usize,
        /// Column of the non-finite value.
        col: usize,
        /// The offending value.
        value: f64,
    },
    /// The requested neighbour count was outside `1..=n_points`.
    #[error("k must be within 1..={points} (got {k})")]
    InvalidK {
        /// The invalid neighbour count supplied by the caller.
        k: usize,
        /// Number of points held by the tree.
        points: usize,
    },
    /// The query matrix dimensionality did not match the tree's.
    #[error("query points have dimension {query} but the tree holds dimension {tree}")]
    DimensionMismatch {
        /// Dimensionality of the query points.
        query: usize,
        /// Dimensionality of the indexed points.
        tree: usize,
    },
    /// A radius query was given a non-positive or non-finite radius.
    #[error("query radius must be positive and finite (got {value})")]
    InvalidRadius {
        /// The invalid radius supplied by the caller.
        value: f64,
    },
    /// A per-point radius slice did not match the number of query rows.
    #[error("{got} radii were supplied for {expected} query points")]
    RadiusCountMismatch {
        /// Number of radii supplied.
        got: usize,
        /// Number of query rows.
        expected: usize,
    },
    /// `min_samples` must leave at least one neighbour besides the point itself.
    #[error("min_samples must be within 1..={limit} (got {got})")]
    InvalidMinSamples {
        /// The invalid sample count supplied by the caller.
        got: usize,
        /// Largest admissible value for this tree (`n_points - 1`).
        limit: usize,
    },
    /// The mutual-reachability scaling factor must be positive and finite.
    #[error("alpha must be positive and finite (got {value})")]
    InvalidAlpha {
        /// The invalid scaling factor supplied by the caller.
        value: f64,
    },
}

define_error_codes! {
    /// Stable codes describing [`ArborError`] variants.
    enum ArborErrorCode for ArborError {
        /// Leaf size must be at least one point.
        InvalidLeafSize => InvalidLeafSize { .. } => "ARBOR_INVALID_LEAF_SIZE",
        /// The point matrix contained no rows.
        EmptyPointSet => EmptyPointSet => "ARBOR_EMPTY_POINT_SET",
        /// A row of the point matrix had a different length from the first row.
        JaggedRow => JaggedRow { .. } => "ARBOR_JAGGED_ROW",
        /// The flat buffer length did not match the requested shape.
        ShapeMismatch => ShapeMismatch { .. } => "ARBOR_SHAPE_MISMATCH",
        /// A point coordinate was NaN or infinite.
        NonFinite => NonFinite { .. } => "ARBOR_NON_FINITE",
        /// The requested neighbour count was outside `1..=n_points`.
        InvalidK => InvalidK { .. } => "ARBOR_INVALID_K",
        /// The query matrix dimensionality did not match the tree's.
        DimensionMismatch => DimensionMismatch { .. } => "ARBOR_DIMENSION_MISMATCH",
        /// A radius query was given a non-positive or non-finite radius.
        InvalidRadius => InvalidRadius { .. } => "ARBOR_INVALID_RADIUS",
        /// A per-point radius slice did not match the number of query rows.
        RadiusCountMismatch => RadiusCountMismatch { .. } => "ARBOR_RADIUS_COUNT_MISMATCH",
        /// `min_samples` was outside the admissible range.
        InvalidMinSamples => InvalidMinSamples { .. } => "ARBOR_INVALID_MIN_SAMPLES",
        /// The mutual-reachability scaling factor was invalid.
        InvalidAlpha => InvalidAlpha { .. } => "ARBOR_INVALID_ALPHA",
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, ArborError>;
