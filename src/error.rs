//! Error taxonomy shared by [`crate::point`], [`crate::index`], [`crate::front`]
//! and [`crate::archive`].

/// Errors raised by [`crate::point`] operations.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PointError {
    /// Two points (or a point and a direction vector) were combined but their
    /// dimensions differ.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the left-hand operand.
        expected: usize,
        /// Dimension of the right-hand operand.
        actual: usize,
    },
}

/// Errors raised by [`crate::index::SpatialIndex`] implementations.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum IndexError {
    /// A query point or box does not match the index's dimension.
    #[error(transparent)]
    DimensionMismatch(#[from] PointError),

    /// A `nearest` or similar query was issued against an empty index.
    #[error("operation requires a non-empty index")]
    EmptyIndex,

    /// An argument outside its valid domain was supplied (e.g. `k = 0`).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Errors raised by [`crate::front::Front`] operations.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FrontError {
    /// Propagated from the underlying index.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// `ideal`/`nadir`/`worst` or an indicator were requested on an empty front.
    #[error("operation requires a non-empty front")]
    EmptyFront,
}

/// Errors raised by [`crate::archive::Archive`] operations.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ArchiveError {
    /// Propagated from a contained front.
    #[error(transparent)]
    Front(#[from] FrontError),

    /// The archive's capacity was configured as zero.
    #[error("archive capacity must be greater than zero")]
    ZeroCapacity,
}
