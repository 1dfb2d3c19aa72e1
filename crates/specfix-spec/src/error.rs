//! Error types for spec resolution and configuration.

use thiserror::Error;

/// Boxed error raised by user code (thunks, combining functions, teardown hooks).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while turning a spec into a value.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A thunk raised while being invoked.
    #[error("thunk failed: {0}")]
    Thunk(#[source] BoxError),

    /// A composition's combining function raised.
    #[error("combine function failed: {0}")]
    Combine(#[source] BoxError),

    /// Thunk chains or container nesting went deeper than the configured limit.
    #[error("spec nesting exceeded the depth limit of {limit}")]
    DepthExceeded {
        /// The configured `max_depth`.
        limit: usize,
    },

    /// A range bound did not resolve to a number.
    #[error("range bound must be an integer or real number, got {found}")]
    InvalidBound {
        /// Kind of the offending value.
        found: &'static str,
    },

    /// A choice or sample with replacement was drawn from an empty population.
    #[error("cannot draw from an empty population")]
    EmptyPopulation,

    /// The population spec resolved to something that has no members.
    #[error("population must be a list, tuple, set or text, got {found}")]
    NotAPopulation {
        /// Kind of the offending value.
        found: &'static str,
    },

    /// The sample size did not resolve to a non-negative integer.
    #[error("sample size must be a non-negative integer, got {found}")]
    InvalidCount {
        /// Rendering of the offending value.
        found: String,
    },

    /// Sampling without replacement asked for more members than exist.
    #[error("sample of {k} is larger than the population of {len}")]
    SampleTooLarge {
        /// Requested sample size.
        k: usize,
        /// Population size.
        len: usize,
    },
}

impl ResolveError {
    /// Wraps an arbitrary error raised by a thunk.
    pub fn thunk(err: impl Into<BoxError>) -> Self {
        Self::Thunk(err.into())
    }
}

/// Errors raised while loading or validating a [`crate::ResolveConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A `(low, high)` pair is inverted or otherwise unusable.
    #[error("invalid range for `{field}`")]
    InvalidRange {
        /// Name of the offending field.
        field: &'static str,
    },
}
