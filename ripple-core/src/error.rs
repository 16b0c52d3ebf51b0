//! Error Types
//!
//! The runtime distinguishes two families of failure:
//!
//! - **Usage errors** are programmer mistakes detected at the call site, such
//!   as registering a cleanup with no active scope or writing a store through
//!   a path that does not exist. They are returned as [`ReactiveError`] and
//!   [`StoreError`].
//!
//! - **Faults** are panics raised inside an effect body or cleanup. They never
//!   unwind through the dependency graph; the runtime catches them, records an
//!   [`EffectFault`], and reports it once control returns to the outermost
//!   caller.
//!
//! Reading and writing signals never fails.

use thiserror::Error;

use crate::graph::EffectId;

/// Misuse of the reactive scope API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// The operation needs an owning effect or root, but none is running.
    #[error("`{operation}` requires an active reactive scope")]
    NoActiveScope {
        /// The operation that was attempted.
        operation: &'static str,
    },
}

/// Failure to address or convert a value inside a [`Store`](crate::reactive::Store).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Nothing lives at the given path.
    #[error("no value at store path `{path}`")]
    PathNotFound { path: String },

    /// A list was indexed past its end.
    #[error("index {index} out of bounds at store path `{path}` (length {len})")]
    IndexOutOfBounds {
        path: String,
        index: usize,
        len: usize,
    },

    /// A length was requested for something that is not a list or object.
    #[error("store path `{path}` holds {kind}, not a collection")]
    NotACollection { path: String, kind: &'static str },

    /// A key was used on a list, an index on an object, or either on a scalar.
    #[error("cannot address {kind} at store path `{path}` with segment `{segment}`")]
    SegmentMismatch {
        path: String,
        segment: String,
        kind: &'static str,
    },

    /// A typed value could not be converted to or from a store tree.
    #[error("failed to convert store value: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A panic caught while running an effect body or one of its cleanups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("effect {effect} panicked: {message}")]
pub struct EffectFault {
    /// The effect whose body or cleanup panicked.
    pub effect: EffectId,
    /// The panic payload, rendered as text.
    pub message: String,
}
