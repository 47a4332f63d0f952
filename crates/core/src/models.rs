//! Domain model types used throughout VcReplay.
//!
//! These types describe pending version-control change actions as they move
//! through batching and ordering, independent of any particular backend.

use serde::{Deserialize, Serialize};

use crate::path::CaseMode;

// ---------------------------------------------------------------------------
// Change actions
// ---------------------------------------------------------------------------

/// The kind of a pending version-control change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    /// A new item is introduced at the target path.
    Add,
    /// The content of an existing item changes.
    Edit,
    /// The item at the target path is removed.
    Delete,
    /// The item moves from the source path to the target path.
    Rename,
    /// The source item is branched to the target path at a given version.
    Branch,
    /// Changes from the source item are merged into the target item.
    Merge,
    /// A previously deleted item is restored at the target path.
    Undelete,
    /// The item's encoding changes; treated like an edit for scheduling.
    Encoding,
}

impl ChangeAction {
    /// Whether this action introduces a path into the namespace.
    pub fn is_additive(self) -> bool {
        matches!(self, Self::Add | Self::Branch | Self::Undelete)
    }

    /// Whether this action modifies content rather than the namespace.
    /// Content changes are delayed until after all namespace operations
    /// in the same batch.
    pub fn is_content_change(self) -> bool {
        matches!(self, Self::Edit | Self::Delete)
    }

    /// Whether a source path is required at construction time.
    pub fn requires_source(self) -> bool {
        matches!(
            self,
            Self::Rename | Self::Branch | Self::Merge | Self::Undelete
        )
    }
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Edit => write!(f, "edit"),
            Self::Delete => write!(f, "delete"),
            Self::Rename => write!(f, "rename"),
            Self::Branch => write!(f, "branch"),
            Self::Merge => write!(f, "merge"),
            Self::Undelete => write!(f, "undelete"),
            Self::Encoding => write!(f, "encoding"),
        }
    }
}

// ---------------------------------------------------------------------------
// Recursion
// ---------------------------------------------------------------------------

/// Recursion mode for branch and merge operations.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecursionKind {
    /// The operation applies to the named item only.
    #[default]
    None,
    /// The operation applies to the item and its immediate children.
    OneLevel,
    /// The operation applies to the whole subtree.
    Full,
}

impl std::fmt::Display for RecursionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::OneLevel => write!(f, "one_level"),
            Self::Full => write!(f, "full"),
        }
    }
}

// ---------------------------------------------------------------------------
// Merge options
// ---------------------------------------------------------------------------

/// Options controlling how a merge item is replayed.
///
/// A merge starts as a discard merge (`always_accept_mine`); the batch
/// pre-processing step demotes it to a regular merge when the same path
/// also carries an edit, delete, or undelete in the batch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MergeOptions {
    pub always_accept_mine: bool,
    pub force_merge: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            always_accept_mine: true,
            force_merge: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Optimizer configuration
// ---------------------------------------------------------------------------

/// What to do when conflict detection finds an item claimed as a dependent
/// of two unrelated ancestors (a contradictory conflict graph).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguousAncestryPolicy {
    /// Fail resolution with [`ResolveError::AmbiguousAncestry`].
    ///
    /// [`ResolveError::AmbiguousAncestry`]: crate::errors::ResolveError::AmbiguousAncestry
    #[default]
    Reject,
    /// Keep the dependency recorded first and log a warning.
    KeepFirst,
}

/// Configuration for a [`ChangeOptimizer`].
///
/// [`ChangeOptimizer`]: crate::batch::ChangeOptimizer
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OptimizerOptions {
    /// Case handling for all path comparisons.
    pub case_mode: CaseMode,
    /// Behavior on contradictory ancestry claims.
    pub ambiguous_ancestry: AmbiguousAncestryPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_additive_actions() {
        assert!(ChangeAction::Add.is_additive());
        assert!(ChangeAction::Branch.is_additive());
        assert!(ChangeAction::Undelete.is_additive());
        assert!(!ChangeAction::Rename.is_additive());
        assert!(!ChangeAction::Edit.is_additive());
        assert!(!ChangeAction::Merge.is_additive());
    }

    #[test]
    fn test_content_changes() {
        assert!(ChangeAction::Edit.is_content_change());
        assert!(ChangeAction::Delete.is_content_change());
        assert!(!ChangeAction::Encoding.is_content_change());
        assert!(!ChangeAction::Add.is_content_change());
    }

    #[test]
    fn test_action_serde_names() {
        assert_eq!(
            serde_json::to_string(&ChangeAction::Undelete).unwrap(),
            "\"undelete\""
        );
        assert_eq!(ChangeAction::Undelete.to_string(), "undelete");
    }

    #[test]
    fn test_merge_options_default_is_discard() {
        let opts = MergeOptions::default();
        assert!(opts.always_accept_mine);
        assert!(opts.force_merge);
    }

    #[test]
    fn test_optimizer_options_default() {
        let opts = OptimizerOptions::default();
        assert_eq!(opts.case_mode, CaseMode::Insensitive);
        assert_eq!(opts.ambiguous_ancestry, AmbiguousAncestryPolicy::Reject);
    }
}
