//! Error types for the session layer.

/// Everything that can go wrong building or driving a session.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when an option line cannot be split into a key token.
    #[error("malformed option: '{0}' has no key token")]
    MalformedOption(String),

    /// Returned when two options with the same uppercased key are supplied
    /// to a constructor (merging handles duplicates; construction rejects them).
    #[error("duplicate option key '{0}'")]
    DuplicateOption(String),

    /// Returned when `observe` is called with different numbers of points
    /// and results.
    #[error("length mismatch: {points} points but {results} results")]
    LengthMismatch {
        /// The number of candidate points supplied.
        points: usize,
        /// The number of evaluation results supplied.
        results: usize,
    },

    /// Returned when a candidate point does not match the declared dimension.
    #[error("dimension mismatch: expected {expected} coordinates but point {index} has {got}")]
    DimensionMismatch {
        /// The dimension declared by the configuration set.
        expected: usize,
        /// The actual number of coordinates in the point.
        got: usize,
        /// The index of the offending point.
        index: usize,
    },

    /// Returned when an evaluation result does not match the declared
    /// number of blackbox outputs.
    #[error("output arity mismatch: expected {expected} outputs but result {index} has {got}")]
    OutputArityMismatch {
        /// The output count declared by `BB_OUTPUT_TYPE`.
        expected: usize,
        /// The actual number of values in the result.
        got: usize,
        /// The index of the offending result.
        index: usize,
    },

    /// Returned when `suggest` is called with a count of zero.
    #[error("invalid suggest count: count must be greater than zero")]
    InvalidSuggestCount,

    /// Returned when the lower bound is greater than the upper bound.
    #[error("invalid bounds: low ({low}) must be less than or equal to high ({high})")]
    InvalidBounds {
        /// The lower bound value.
        low: f64,
        /// The upper bound value.
        high: f64,
    },

    /// Returned when a session is built without a declared dimension.
    #[error("missing dimension: the configuration must declare DIMENSION")]
    MissingDimension,

    /// Returned when the optimizer engine fails. Session state is left
    /// untouched when this propagates.
    #[error("engine error: {0}")]
    Engine(String),

    /// Returned when an evaluation cache file cannot be read or written.
    #[error("cache error: {0}")]
    Cache(String),
}

/// Crate-wide result alias.
pub type Result<T> = core::result::Result<T, Error>;
