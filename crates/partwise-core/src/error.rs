//! Engine error taxonomy.
//!
//! Operator-local failures carry one of these kinds; the scheduler turns them
//! into poisoned completion/validity events. Programming errors (double
//! trigger, second sparsity-map contributor, unknown event id) are *not*
//! represented here: those are assertion failures and panic.

use thiserror::Error;

/// Canonical result for the engine.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// An input event was poisoned; the operator never ran and its outputs
    /// are poisoned too.
    #[error("precondition event was poisoned")]
    PoisonedPrecondition,

    /// A field-data descriptor references a destroyed instance or an
    /// out-of-range field offset.
    #[error("invalid field-data descriptor: {0}")]
    InvalidDescriptor(String),

    /// Reserved: the engine itself never raises this, but callers that
    /// require non-empty outputs may map empty results into it.
    #[error("operation produced an empty result where a non-empty one was required")]
    EmptyResult,

    /// Coordinate arithmetic exceeded the scalar type's range.
    #[error("coordinate arithmetic overflow")]
    Overflow,

    #[error("invalid configuration: {0}")]
    Config(String),

    /// Submission was rejected because the engine is shutting down.
    #[error("engine is shutting down")]
    ShuttingDown,

    #[error("digest error: {0}")]
    Digest(String),

    #[error("internal invariant failed: {0}")]
    Invariant(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Digest(e.to_string())
    }
}
