//! Error types for provided functions.

use specfix_spec::{BoxError, ResolveError};
use thiserror::Error;

use crate::teardown::TeardownFailures;

/// Failure of one call to a provided function.
///
/// A call stops at the first failing layer. Teardown of that layer has always
/// run by the time the error is returned; its failures are attached.
#[derive(Debug, Error)]
pub enum ProvideError {
    /// A fixture spec failed to resolve, so the function was not called.
    ///
    /// Values resolved earlier in the same layer were torn down.
    #[error("layer {layer}: resolving `{name}` failed: {source}")]
    Resolve {
        /// Index of the failing layer.
        layer: usize,
        /// Fixture name (positional fixtures are named `#0`, `#1`, ...).
        name: String,
        /// The resolution error.
        #[source]
        source: ResolveError,
        /// Failures while tearing down what had been resolved.
        teardown: TeardownFailures,
    },

    /// The wrapped function failed. This takes precedence over teardown
    /// failures, which are kept as secondary information.
    #[error("layer {layer}: function failed: {source}")]
    Body {
        /// Index of the failing layer.
        layer: usize,
        /// The function's error.
        #[source]
        source: BoxError,
        /// Failures while tearing down the layer's values.
        teardown: TeardownFailures,
    },

    /// The function succeeded but one or more teardowns failed.
    #[error("layer {layer}: {failures}")]
    Teardown {
        /// Index of the failing layer.
        layer: usize,
        /// Every teardown that failed.
        failures: TeardownFailures,
    },
}

impl ProvideError {
    /// Index of the layer that failed.
    pub fn layer(&self) -> usize {
        match self {
            Self::Resolve { layer, .. } | Self::Body { layer, .. } | Self::Teardown { layer, .. } => {
                *layer
            }
        }
    }

    /// Teardown failures of the failing layer, primary or secondary.
    pub fn teardown_failures(&self) -> &TeardownFailures {
        match self {
            Self::Resolve { teardown, .. } | Self::Body { teardown, .. } => teardown,
            Self::Teardown { failures, .. } => failures,
        }
    }

    /// The function's own error, if the function failed.
    pub fn body_error(&self) -> Option<&BoxError> {
        match self {
            Self::Body { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors raised when a function reads its fixture arguments.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// No argument with this name was delivered.
    #[error("fixture `{name}` was not provided")]
    Missing {
        /// Argument name.
        name: String,
    },

    /// The argument has a different kind or type.
    #[error("fixture `{name}` has kind {found}, expected {expected}")]
    Mismatch {
        /// Argument name.
        name: String,
        /// Requested kind or type.
        expected: &'static str,
        /// Actual kind or type.
        found: &'static str,
    },

    /// The object is already mutably borrowed.
    #[error("fixture `{name}` is already borrowed")]
    Borrowed {
        /// Argument name.
        name: String,
    },
}
