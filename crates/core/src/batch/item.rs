//! A single pending version-control change awaiting ordering.
//!
//! [`BatchedItem`] is a value record: it carries the paths and kind-specific
//! metadata of one change action. Resolution state (priority, conflict edge,
//! resolved flag) lives in the optimizer's arena, keyed by handle, so items
//! can move between working sets without reference-equality semantics.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::BatchError;
use crate::models::{ChangeAction, MergeOptions, RecursionKind};

// ---------------------------------------------------------------------------
// BatchedItem
// ---------------------------------------------------------------------------

/// One pending change action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchedItem {
    id: Uuid,
    source: Option<String>,
    target: String,
    action: ChangeAction,
    version: Option<String>,
    merge_version_to: Option<String>,
    recursion: RecursionKind,
    merge_options: MergeOptions,
    skip: bool,
}

impl BatchedItem {
    /// Create an item for an action that operates on the target path alone
    /// (add, edit, delete, encoding).
    pub fn new(target: impl Into<String>, action: ChangeAction) -> Result<Self, BatchError> {
        if action.requires_source() {
            return Err(BatchError::MissingPath {
                field: "source",
                action: action.to_string(),
            });
        }
        Ok(Self::build(None, require("target", target, action)?, action))
    }

    /// Create an item carrying both a source and a target path (rename, or
    /// a content action whose logical content lives at a different path).
    pub fn with_source(
        source: impl Into<String>,
        target: impl Into<String>,
        action: ChangeAction,
    ) -> Result<Self, BatchError> {
        Ok(Self::build(
            Some(require("source", source, action)?),
            require("target", target, action)?,
            action,
        ))
    }

    /// Create a merge item. Merges carry the starting and ending versions of
    /// the merged range and replay before everything else in the batch.
    pub fn merge(
        source: impl Into<String>,
        target: impl Into<String>,
        recursion: RecursionKind,
        version_from: impl Into<String>,
        version_to: impl Into<String>,
    ) -> Result<Self, BatchError> {
        let mut item = Self::build(
            Some(require("source", source, ChangeAction::Merge)?),
            require("target", target, ChangeAction::Merge)?,
            ChangeAction::Merge,
        );
        item.version = Some(version_from.into());
        item.merge_version_to = Some(version_to.into());
        item.recursion = recursion;
        Ok(item)
    }

    /// Create a branch item from the source at the given version.
    pub fn branch(
        source: impl Into<String>,
        target: impl Into<String>,
        recursion: RecursionKind,
        version: impl Into<String>,
    ) -> Result<Self, BatchError> {
        let mut item = Self::build(
            Some(require("source", source, ChangeAction::Branch)?),
            require("target", target, ChangeAction::Branch)?,
            ChangeAction::Branch,
        );
        item.version = Some(version.into());
        item.recursion = recursion;
        Ok(item)
    }

    /// Create an undelete item restoring an item deleted at `deleted_version`.
    pub fn undelete(
        source: impl Into<String>,
        target: impl Into<String>,
        deleted_version: impl Into<String>,
    ) -> Result<Self, BatchError> {
        let mut item = Self::build(
            Some(require("source", source, ChangeAction::Undelete)?),
            require("target", target, ChangeAction::Undelete)?,
            ChangeAction::Undelete,
        );
        item.version = Some(deleted_version.into());
        Ok(item)
    }

    /// Synthetic renames fabricated during resolution bypass validation:
    /// their paths are generated and always non-empty.
    pub(crate) fn synthetic_rename(source: String, target: String) -> Self {
        Self::build(Some(source), target, ChangeAction::Rename)
    }

    fn build(source: Option<String>, target: String, action: ChangeAction) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            target,
            action,
            version: None,
            merge_version_to: None,
            recursion: RecursionKind::None,
            merge_options: MergeOptions::default(),
            skip: false,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Unique identity of this item, used for cycle-detection equality only.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn action(&self) -> ChangeAction {
        self.action
    }

    /// For undelete, the version at which the item was deleted; for branch,
    /// the branch-from version; for merge, the starting version of the range.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// For merge items, the end version of the merged range.
    pub fn merge_version_to(&self) -> Option<&str> {
        self.merge_version_to.as_deref()
    }

    pub fn recursion(&self) -> RecursionKind {
        self.recursion
    }

    pub fn merge_options(&self) -> MergeOptions {
        self.merge_options
    }

    /// If true, the item is excluded from execution during replay.
    pub fn skip(&self) -> bool {
        self.skip
    }

    pub fn set_skip(&mut self, skip: bool) {
        self.skip = skip;
    }

    // -----------------------------------------------------------------------
    // Mutators used during batching
    // -----------------------------------------------------------------------

    /// Patch a rename's source path after an ancestor folder was itself
    /// renamed earlier in processing. Collaborator hook for the analysis
    /// phase; the optimizer never calls this itself.
    pub fn adjust_source_for_parent_rename(&mut self, new_source: impl Into<String>) {
        self.source = Some(new_source.into());
    }

    pub(crate) fn set_source(&mut self, source: String) {
        self.source = Some(source);
    }

    pub(crate) fn set_target(&mut self, target: String) {
        self.target = target;
    }

    pub(crate) fn merge_options_mut(&mut self) -> &mut MergeOptions {
        &mut self.merge_options
    }
}

fn require(
    field: &'static str,
    value: impl Into<String>,
    action: ChangeAction,
) -> Result<String, BatchError> {
    let value = value.into();
    if value.is_empty() {
        return Err(BatchError::MissingPath {
            field,
            action: action.to_string(),
        });
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Resolved output
// ---------------------------------------------------------------------------

/// One entry of the ordered execution plan produced by resolution.
///
/// Synthetic intermediate renames appear here with fabricated paths that the
/// replay engine must execute literally. The `skip` flag may be flipped by
/// the caller before handing the plan to the replay engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedChange {
    pub id: Uuid,
    pub source: Option<String>,
    pub target: String,
    pub action: ChangeAction,
    pub version: Option<String>,
    pub merge_version_to: Option<String>,
    pub recursion: RecursionKind,
    pub merge_options: MergeOptions,
    /// Execution rank; the plan is sorted ascending by this value.
    pub priority: i32,
    pub skip: bool,
}

impl ResolvedChange {
    pub(crate) fn snapshot(item: &BatchedItem, priority: i32) -> Self {
        Self {
            id: item.id,
            source: item.source.clone(),
            target: item.target.clone(),
            action: item.action,
            version: item.version.clone(),
            merge_version_to: item.merge_version_to.clone(),
            recursion: item.recursion,
            merge_options: item.merge_options,
            priority,
            skip: item.skip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_target() {
        let err = BatchedItem::new("", ChangeAction::Add).unwrap_err();
        assert_eq!(
            err,
            BatchError::MissingPath {
                field: "target",
                action: "add".to_string()
            }
        );
    }

    #[test]
    fn test_new_rejects_source_requiring_actions() {
        let err = BatchedItem::new("$/proj/file", ChangeAction::Rename).unwrap_err();
        assert_eq!(
            err,
            BatchError::MissingPath {
                field: "source",
                action: "rename".to_string()
            }
        );
    }

    #[test]
    fn test_with_source_requires_both_paths() {
        assert!(BatchedItem::with_source("", "$/b", ChangeAction::Rename).is_err());
        assert!(BatchedItem::with_source("$/a", "", ChangeAction::Rename).is_err());
        let item = BatchedItem::with_source("$/a", "$/b", ChangeAction::Rename).unwrap();
        assert_eq!(item.source(), Some("$/a"));
        assert_eq!(item.target(), "$/b");
    }

    #[test]
    fn test_merge_metadata() {
        let item = BatchedItem::merge("$/src", "$/dst", RecursionKind::Full, "100", "200").unwrap();
        assert_eq!(item.action(), ChangeAction::Merge);
        assert_eq!(item.version(), Some("100"));
        assert_eq!(item.merge_version_to(), Some("200"));
        assert_eq!(item.recursion(), RecursionKind::Full);
        assert!(item.merge_options().always_accept_mine);
    }

    #[test]
    fn test_undelete_metadata() {
        let item = BatchedItem::undelete("$/old", "$/old", "42").unwrap();
        assert_eq!(item.action(), ChangeAction::Undelete);
        assert_eq!(item.version(), Some("42"));
    }

    #[test]
    fn test_adjust_source_for_parent_rename() {
        let mut item = BatchedItem::with_source("$/old/file", "$/new/file", ChangeAction::Rename)
            .unwrap();
        item.adjust_source_for_parent_rename("$/renamed/file");
        assert_eq!(item.source(), Some("$/renamed/file"));
    }

    #[test]
    fn test_skip_flag() {
        let mut item = BatchedItem::new("$/proj/file", ChangeAction::Edit).unwrap();
        assert!(!item.skip());
        item.set_skip(true);
        assert!(item.skip());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = BatchedItem::new("$/x", ChangeAction::Add).unwrap();
        let b = BatchedItem::new("$/x", ChangeAction::Add).unwrap();
        assert_ne!(a.id(), b.id());
    }
}
