//! Error types for the VcReplay core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type.
//!
//! Contract violations (adding to a closed batch, resolving twice) are not
//! errors but panics: they indicate a bug in the calling analysis layer,
//! not a data-driven failure.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

// ---------------------------------------------------------------------------
// Batch item construction errors
// ---------------------------------------------------------------------------

/// Errors from constructing a batched change item.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    /// A required path argument was missing or empty.
    #[error("missing required {field} path for {action} item")]
    MissingPath {
        field: &'static str,
        action: String,
    },
}

// ---------------------------------------------------------------------------
// Resolution errors
// ---------------------------------------------------------------------------

/// Fatal conditions raised while linearizing a batch.
///
/// Both variants represent violated algorithmic invariants: the input batch
/// is expected to be validated resolvable by the upstream analysis phase,
/// so none of these are retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The fixed-point loop stalled with unresolved items remaining.
    #[error("unable to resolve pending changes: {unresolved} item(s) remain after {passes} pass(es)")]
    UnresolvableBatch {
        unresolved: usize,
        passes: usize,
    },

    /// Cycle-breaking was invoked on a non-rename item. Only rename cycles
    /// can be linearized with intermediate paths.
    #[error("don't know how to break non-rename cycles ({action} on '{target}')")]
    NonRenameCycle {
        action: String,
        target: String,
    },

    /// An item was claimed as a dependent of two unrelated ancestors.
    #[error("item '{item}' conflicted with two items: '{first}' and '{second}'")]
    AmbiguousAncestry {
        item: String,
        first: String,
        second: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = BatchError::MissingPath {
            field: "source",
            action: "rename".to_string(),
        };
        assert_eq!(err.to_string(), "missing required source path for rename item");

        let err = ResolveError::UnresolvableBatch {
            unresolved: 2,
            passes: 3,
        };
        assert!(err.to_string().contains("unable to resolve pending changes"));

        let err = ResolveError::NonRenameCycle {
            action: "undelete".to_string(),
            target: "$/proj/file".to_string(),
        };
        assert!(err.to_string().contains("non-rename cycles"));
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let batch_err = BatchError::MissingPath {
            field: "target",
            action: "add".to_string(),
        };
        let core_err: CoreError = batch_err.into();
        assert!(matches!(core_err, CoreError::Batch(_)));

        let resolve_err = ResolveError::NonRenameCycle {
            action: "edit".to_string(),
            target: "$/x".to_string(),
        };
        let core_err: CoreError = resolve_err.into();
        assert!(matches!(core_err, CoreError::Resolve(_)));
    }
}
