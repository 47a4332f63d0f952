//! Change-action batching and conflict ordering.
//!
//! The [`ChangeOptimizer`] takes the unordered change actions of one change
//! group and produces a linearized, conflict-free execution plan:
//!
//! 1. `add` classifies each action into a working set (renames, additive
//!    actions, everything else) and absorbs renames that are side effects
//!    of an ancestor folder rename.
//! 2. `detect_conflicts` annotates items with the dependency they must wait
//!    for: namespace overlaps between renames and additive actions, rename
//!    chains, and parent-before-child creation order.
//! 3. `resolve` orders the batch by iterative priority bumping, breaking
//!    rename cycles with synthetic intermediate renames, and finally delays
//!    every content change behind the namespace operations.
//!
//! One optimizer instance handles one batch. `add` may be called from
//! multiple producer threads while analysis is running; `resolve` is called
//! exactly once and runs to completion on the calling thread. `clear`
//! resets the instance for the next batch.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::batch::item::{BatchedItem, ResolvedChange};
use crate::batch::namegen::{IntermediateNameGenerator, UuidNameGenerator};
use crate::errors::ResolveError;
use crate::models::{AmbiguousAncestryPolicy, ChangeAction, OptimizerOptions};
use crate::path::{self, CaseMode, PathMap, PathSet};

// ---------------------------------------------------------------------------
// Handles and arena
// ---------------------------------------------------------------------------

/// Opaque handle to an item owned by a [`ChangeOptimizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId(usize);

/// An arena slot: the item itself plus its resolution state. Keeping the
/// state out of [`BatchedItem`] lets the working sets be plain handle lists
/// and makes conflict-chain walks safe to combine with mutation.
struct Entry {
    item: BatchedItem,
    priority: i32,
    resolved: bool,
    conflict: Option<ItemId>,
}

struct State {
    entries: Vec<Entry>,
    /// Deletes/edits/merges at first; all surviving items after conflict
    /// detection merges the other two lists in.
    unresolved_changes: Vec<ItemId>,
    unresolved_renames: Vec<ItemId>,
    unresolved_additive: Vec<ItemId>,
    /// Final output order is built here; append-only once items resolve.
    resolved: Vec<ItemId>,
    implicit_renames: PathSet,
    implicit_adds: PathSet,
    /// Implicit rename target -> target of the parent rename that caused it.
    implicit_rename_parents: PathMap<String>,
    /// Rename target -> pre-rename source, first writer wins. Exact-match
    /// and case-sensitive: only items addressing the renamed slot itself
    /// are rewritten.
    rename_pairs: HashMap<String, String>,
    /// Merge target path -> every item in the batch operating on that path.
    merge_associated: PathMap<Vec<ItemId>>,
    accepting: bool,
    names: Box<dyn IntermediateNameGenerator>,
}

// ---------------------------------------------------------------------------
// Optimizer
// ---------------------------------------------------------------------------

/// Orders the change actions of one change group for replay.
pub struct ChangeOptimizer {
    options: OptimizerOptions,
    state: Mutex<State>,
}

impl Default for ChangeOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeOptimizer {
    pub fn new() -> Self {
        Self::with_options(OptimizerOptions::default())
    }

    pub fn with_options(options: OptimizerOptions) -> Self {
        Self::with_name_generator(options, Box::new(UuidNameGenerator))
    }

    /// Create an optimizer with an injected intermediate-name source, so
    /// synthetic paths can be deterministic under test.
    pub fn with_name_generator(
        options: OptimizerOptions,
        names: Box<dyn IntermediateNameGenerator>,
    ) -> Self {
        Self {
            options,
            state: Mutex::new(State {
                entries: Vec::new(),
                unresolved_changes: Vec::new(),
                unresolved_renames: Vec::new(),
                unresolved_additive: Vec::new(),
                resolved: Vec::new(),
                implicit_renames: PathSet::new(options.case_mode),
                implicit_adds: PathSet::new(options.case_mode),
                implicit_rename_parents: PathMap::new(options.case_mode),
                rename_pairs: HashMap::new(),
                merge_associated: PathMap::new(options.case_mode),
                accepting: true,
                names,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("optimizer state lock poisoned")
    }

    // -----------------------------------------------------------------------
    // Intake
    // -----------------------------------------------------------------------

    /// Queue one change action for ordering.
    ///
    /// # Panics
    ///
    /// Panics if called after [`resolve`](Self::resolve) has begun; feeding
    /// a closed batch is a contract violation by the analysis layer.
    pub fn add(&self, item: BatchedItem) -> ItemId {
        let mut st = self.state();
        assert!(st.accepting, "ChangeOptimizer is not accepting new changes");

        let action = item.action();
        let target = item.target().to_string();
        let priority = if action == ChangeAction::Merge { 0 } else { 1 };

        if action == ChangeAction::Rename {
            let mode = self.options.case_mode;
            let parent = st
                .unresolved_renames
                .iter()
                .copied()
                .find(|rid| is_induced_by(mode, &item, &st.entries[rid.0].item));

            if let Some(source) = item.source() {
                if !st.rename_pairs.contains_key(&target) {
                    st.rename_pairs.insert(target.clone(), source.to_string());
                }
            }

            let id = alloc(&mut st, item, priority);
            match parent {
                Some(pid) => {
                    // The parent folder rename already moves this item;
                    // replaying it separately would double-apply.
                    let parent_target = st.entries[pid.0].item.target().to_string();
                    debug!(path = %target, parent = %parent_target, "rename absorbed as implicit side effect");
                    st.implicit_renames.insert(&target);
                    st.implicit_rename_parents.insert(&target, parent_target);
                }
                None => {
                    debug!(path = %target, "queued rename");
                    st.unresolved_renames.push(id);
                }
            }
            return id;
        }

        let id = alloc(&mut st, item, priority);
        if action.is_additive() {
            st.unresolved_additive.push(id);
        } else {
            // merges, deletes, edits, encoding changes
            st.unresolved_changes.push(id);
        }
        debug!(action = %action, path = %target, "queued change action");
        id
    }

    /// Exclude an item from execution without removing it from the plan.
    pub fn set_skip(&self, id: ItemId, skip: bool) {
        self.state().entries[id.0].item.set_skip(skip);
    }

    // -----------------------------------------------------------------------
    // Pre-resolution passes
    // -----------------------------------------------------------------------

    /// Rewrite the paths of edits, deletes, and merges whose target slot was
    /// renamed in the same change group: the logical content still lives at
    /// the pre-rename path.
    ///
    /// Must run before [`resolve`](Self::resolve). Only exact target matches
    /// are rewritten, never descendants of a renamed folder. Idempotent: the
    /// pair map is consumed on first application.
    pub fn revise_previous_names(&self) {
        let mut st = self.state();
        if st.rename_pairs.is_empty() {
            return;
        }

        let State {
            entries,
            unresolved_changes,
            rename_pairs,
            ..
        } = &mut *st;

        let mut revised = 0usize;
        for &cid in unresolved_changes.iter() {
            let entry = &mut entries[cid.0];
            match entry.item.action() {
                ChangeAction::Edit | ChangeAction::Delete => {
                    if let Some(old) = rename_pairs.get(entry.item.target()) {
                        entry.item.set_source(old.clone());
                        revised += 1;
                    }
                }
                ChangeAction::Merge => {
                    if let Some(old) = rename_pairs.get(entry.item.target()) {
                        entry.item.set_target(old.clone());
                        revised += 1;
                    }
                }
                _ => {}
            }
        }
        rename_pairs.clear();
        debug!(revised, "revised previous names against batch renames");
    }

    /// Group every item in the batch by merge target path and demote merges
    /// that share a path with an edit, delete, or undelete from discard
    /// merges to regular merges.
    ///
    /// The resulting association map is exposed through
    /// [`merge_associated_changes`](Self::merge_associated_changes) so the
    /// replay engine can reconcile implicitly pended change types.
    pub fn preprocess_merges(&self) {
        let mut st = self.state();
        let State {
            entries,
            unresolved_changes,
            unresolved_renames,
            unresolved_additive,
            merge_associated,
            ..
        } = &mut *st;

        merge_associated.clear();

        for &cid in unresolved_changes.iter() {
            let item = &entries[cid.0].item;
            if item.action() == ChangeAction::Merge && !merge_associated.contains_key(item.target())
            {
                merge_associated.insert(item.target(), vec![cid]);
            }
        }

        if merge_associated.is_empty() {
            return;
        }

        let mut non_discard = 0usize;
        for list in [
            &*unresolved_changes,
            &*unresolved_additive,
            &*unresolved_renames,
        ] {
            for &bid in list.iter() {
                let action = entries[bid.0].item.action();
                if action == ChangeAction::Merge {
                    continue;
                }
                let item_path = {
                    let item = &entries[bid.0].item;
                    item.source().unwrap_or(item.target()).to_string()
                };
                if let Some(associated) = merge_associated.get_mut(&item_path) {
                    if matches!(
                        action,
                        ChangeAction::Delete | ChangeAction::Edit | ChangeAction::Undelete
                    ) {
                        let merge_id = associated[0];
                        entries[merge_id.0].item.merge_options_mut().always_accept_mine = false;
                        non_discard += 1;
                    }
                    associated.push(bid);
                }
            }
        }

        info!(
            merges = merge_associated.len(),
            discard_merges = merge_associated.len().saturating_sub(non_discard),
            "pre-processed merge actions"
        );
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    /// Order the batch into a conflict-free execution plan.
    ///
    /// Returns the resolved changes sorted by ascending priority. Callers
    /// must also consult [`implicit_renames`](Self::implicit_renames) and
    /// [`implicit_adds`](Self::implicit_adds) to suppress actions absorbed
    /// as side effects of scheduled operations.
    ///
    /// # Panics
    ///
    /// Panics if called twice on the same batch.
    pub fn resolve(&self) -> Result<Vec<ResolvedChange>, ResolveError> {
        let mut st = self.state();
        assert!(st.accepting, "resolve may only be called once per batch");
        st.accepting = false;

        self.process_recursive_changes(&mut st);
        self.detect_conflicts(&mut st)?;

        // Anything without a dependency is already ordered. Walk backwards
        // so removal does not disturb indexing.
        for i in (0..st.unresolved_changes.len()).rev() {
            let cid = st.unresolved_changes[i];
            if st.entries[cid.0].conflict.is_none() {
                st.entries[cid.0].resolved = true;
                st.resolved.push(cid);
                st.unresolved_changes.remove(i);
            }
        }

        let mut passes = 0usize;
        if !st.unresolved_changes.is_empty() {
            let mut current = st.unresolved_changes.len();
            let mut prev = usize::MAX;

            while current > 0 && prev != current {
                passes += 1;
                self.resolve_chain_ends(&mut st);
                self.break_detected_cycles(&mut st)?;
                prev = current;
                current = st.unresolved_changes.len();
            }
        }

        if !st.unresolved_changes.is_empty() {
            return Err(ResolveError::UnresolvableBatch {
                unresolved: st.unresolved_changes.len(),
                passes,
            });
        }

        // Content changes replay strictly after every namespace operation
        // from the same batch.
        let highest = st
            .resolved
            .iter()
            .map(|rid| st.entries[rid.0].priority)
            .max()
            .unwrap_or(0);
        for i in 0..st.resolved.len() {
            let rid = st.resolved[i];
            if st.entries[rid.0].item.action().is_content_change() {
                st.entries[rid.0].priority += highest + 1;
            }
        }

        let State {
            entries, resolved, ..
        } = &mut *st;
        resolved.sort_by_key(|rid| entries[rid.0].priority);

        let plan: Vec<ResolvedChange> = resolved
            .iter()
            .map(|rid| ResolvedChange::snapshot(&entries[rid.0].item, entries[rid.0].priority))
            .collect();

        info!(total = plan.len(), passes, "batch resolved into execution plan");
        Ok(plan)
    }

    /// Reset the instance so it can order the next batch.
    pub fn clear(&self) {
        let mut st = self.state();
        st.entries.clear();
        st.unresolved_changes.clear();
        st.unresolved_renames.clear();
        st.unresolved_additive.clear();
        st.resolved.clear();
        st.implicit_renames.clear();
        st.implicit_adds.clear();
        st.implicit_rename_parents.clear();
        st.rename_pairs.clear();
        st.merge_associated.clear();
        st.accepting = true;
    }

    // -----------------------------------------------------------------------
    // Side-channel outputs
    // -----------------------------------------------------------------------

    /// Targets of renames absorbed as side effects of a parent folder
    /// rename. Must not be executed or reported separately.
    pub fn implicit_renames(&self) -> Vec<String> {
        self.state()
            .implicit_renames
            .iter()
            .map(str::to_string)
            .collect()
    }

    pub fn is_implicit_rename(&self, target: &str) -> bool {
        self.state().implicit_renames.contains(target)
    }

    /// Targets of adds created implicitly by renaming a folder to below
    /// itself. Older servers surface these as explicit adds in the change
    /// set; newer ones do not.
    pub fn implicit_adds(&self) -> Vec<String> {
        self.state()
            .implicit_adds
            .iter()
            .map(str::to_string)
            .collect()
    }

    pub fn is_implicit_add(&self, target: &str) -> bool {
        self.state().implicit_adds.contains(target)
    }

    /// Pairs of (implicit rename target, parent rename target).
    pub fn implicit_rename_parents(&self) -> Vec<(String, String)> {
        self.state()
            .implicit_rename_parents
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    /// Merge target path -> handles of every batch item on that path, as
    /// built by [`preprocess_merges`](Self::preprocess_merges).
    pub fn merge_associated_changes(&self) -> Vec<(String, Vec<ItemId>)> {
        self.state()
            .merge_associated
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Conflict detection
    // -----------------------------------------------------------------------

    /// Hook for recursive branch/merge conflict handling. No current backend
    /// produces recursive conflicts, so this is empty.
    fn process_recursive_changes(&self, _st: &mut State) {}

    fn detect_conflicts(&self, st: &mut State) -> Result<(), ResolveError> {
        let mode = self.options.case_mode;
        let policy = self.options.ambiguous_ancestry;
        let State {
            entries,
            unresolved_changes,
            unresolved_renames,
            unresolved_additive,
            implicit_adds,
            ..
        } = st;

        info!(
            renames = unresolved_renames.len(),
            additive = unresolved_additive.len(),
            changes = unresolved_changes.len(),
            "detecting conflicts"
        );

        // Shorter paths first: ancestors sort before their descendants, so
        // the linear scans below meet parent relationships before child
        // ones. Stable, so equal lengths keep insertion order.
        unresolved_renames
            .sort_by_key(|rid| entries[rid.0].item.source().map_or(0, str::len));
        unresolved_additive.sort_by_key(|aid| entries[aid.0].item.target().len());

        // Additive actions against renames. Reverse order so removal of
        // absorbed adds does not disturb indexing.
        for idx in (0..unresolved_additive.len()).rev() {
            let aid = unresolved_additive[idx];
            let mut absorb = false;
            let mut conflict = None;
            for &rid in unresolved_renames.iter() {
                let additive = &entries[aid.0].item;
                let rename = &entries[rid.0].item;
                let rename_source = rename.source().unwrap_or("");
                if !path::is_sub_item(mode, additive.target(), rename_source) {
                    continue;
                }
                if additive.action() == ChangeAction::Add
                    && path::equals(mode, rename_source, additive.target())
                    && path::is_sub_item(mode, rename.target(), rename_source)
                    && !path::equals(mode, rename.target(), rename_source)
                {
                    // Renaming a folder to below itself re-creates the
                    // original slot; the server reports a matching add that
                    // must not be replayed separately.
                    absorb = true;
                } else if !path::equals(mode, rename_source, rename.target()) {
                    // Scheduled after the rename vacates the namespace,
                    // unless it is a case-only rename that keeps the slot.
                    conflict = Some(rid);
                }
                break;
            }
            if absorb {
                let target = entries[aid.0].item.target().to_string();
                debug!(path = %target, "add absorbed as side effect of rename-below-itself");
                implicit_adds.insert(&target);
                unresolved_additive.remove(idx);
            } else if let Some(rid) = conflict {
                entries[aid.0].conflict = Some(rid);
            }
        }

        // Parent-before-child creation order among the additive actions
        // themselves: an add below a branched or undeleted folder must wait
        // for the folder to exist.
        for i in 0..unresolved_additive.len() {
            for j in 0..unresolved_additive.len() {
                if i == j {
                    continue;
                }
                let (aid, ancestor_id) = (unresolved_additive[i], unresolved_additive[j]);
                let is_descendant = {
                    let child = entries[aid.0].item.target();
                    let parent = entries[ancestor_id.0].item.target();
                    path::is_sub_item(mode, child, parent) && !path::equals(mode, child, parent)
                };
                if is_descendant {
                    set_nearest_ancestor(entries, aid, ancestor_id, mode, policy)?;
                }
            }
        }

        // Rename-to-rename and rename-to-additive dependencies.
        for oi in 0..unresolved_renames.len() {
            let pid = unresolved_renames[oi];

            // A rename whose target lands inside another rename's source
            // subtree runs after that parent rename.
            for ii in 0..unresolved_renames.len() {
                if oi == ii {
                    continue;
                }
                let rid = unresolved_renames[ii];
                let depends = {
                    let processed = &entries[pid.0].item;
                    let other = &entries[rid.0].item;
                    path::is_sub_item(mode, processed.target(), other.source().unwrap_or(""))
                };
                if depends {
                    entries[pid.0].conflict = Some(rid);
                    break;
                }
            }

            for &aid in unresolved_additive.iter() {
                if entries[aid.0].item.action() == ChangeAction::Undelete {
                    // The rename target moves into a subtree that only
                    // exists once the undelete restores it.
                    let depends = {
                        let processed = &entries[pid.0].item;
                        let additive = &entries[aid.0].item;
                        path::is_sub_item(mode, processed.target(), additive.source().unwrap_or(""))
                    };
                    if depends {
                        debug_assert!(entries[pid.0].conflict.is_none());
                        entries[pid.0].conflict = Some(aid);
                        continue;
                    }
                } else {
                    // Add fld2, rename fld1/1.txt -> fld2/1.txt: add first.
                    let rename_under_additive = {
                        let processed = &entries[pid.0].item;
                        let additive = &entries[aid.0].item;
                        path::is_sub_item(mode, processed.target(), additive.target())
                    };
                    if rename_under_additive {
                        set_nearest_ancestor(entries, pid, aid, mode, policy)?;
                        continue;
                    }
                    // Add fld1/file1.txt, rename fld -> fld1: rename first.
                    let additive_under_rename = {
                        let processed = &entries[pid.0].item;
                        let additive = &entries[aid.0].item;
                        path::is_sub_item(mode, additive.target(), processed.target())
                    };
                    if additive_under_rename {
                        set_nearest_ancestor(entries, aid, pid, mode, policy)?;
                        continue;
                    }
                }
            }
        }

        unresolved_changes.append(unresolved_additive);
        unresolved_changes.append(unresolved_renames);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Fixed-point resolution
    // -----------------------------------------------------------------------

    /// Resolve every item whose dependency chain ends in an item that is
    /// itself dependency-free or already resolved, by taking a priority one
    /// past its dependency's.
    fn resolve_chain_ends(&self, st: &mut State) {
        let mode = self.options.case_mode;
        for i in (0..st.unresolved_changes.len()).rev() {
            let cid = st.unresolved_changes[i];
            let Some(conflict_id) = st.entries[cid.0].conflict else {
                continue;
            };
            let chain_ends = st.entries[conflict_id.0].conflict.is_none()
                || st.entries[conflict_id.0].resolved;
            if !chain_ends {
                continue;
            }

            let add_into_renamed_slot = st.entries[cid.0].item.action() == ChangeAction::Add
                && st.entries[conflict_id.0].item.action() == ChangeAction::Rename
                && path::is_sub_item(
                    mode,
                    st.entries[conflict_id.0].item.target(),
                    st.entries[cid.0].item.target(),
                );
            if add_into_renamed_slot {
                // Replaying "add X" while "rename X -> X/..." still holds
                // the slot collides. Detour: rename to an intermediate name,
                // add the original slot, rename the intermediate into place.
                let rename_source = st.entries[conflict_id.0]
                    .item
                    .source()
                    .unwrap_or_default()
                    .to_string();
                let rename_target = st.entries[conflict_id.0].item.target().to_string();
                let intermediate = st.names.intermediate_name(&rename_source);
                let restore_priority = st.entries[conflict_id.0].priority + 2;
                debug!(
                    rename_target = %rename_target,
                    intermediate = %intermediate,
                    "detouring rename through intermediate path"
                );
                let restore = BatchedItem::synthetic_rename(intermediate.clone(), rename_target);
                alloc_resolved(st, restore, restore_priority);
                st.entries[conflict_id.0].item.set_target(intermediate);
            }

            st.entries[cid.0].resolved = true;
            st.entries[cid.0].priority = st.entries[conflict_id.0].priority + 1;
            st.resolved.push(cid);
            st.unresolved_changes.remove(i);
        }
    }

    /// Walk each remaining item's conflict chain; a chain that returns to
    /// its origin is a cycle to break.
    fn break_detected_cycles(&self, st: &mut State) -> Result<(), ResolveError> {
        let snapshot: Vec<ItemId> = st.unresolved_changes.clone();
        for cid in snapshot {
            if st.entries[cid.0].resolved {
                continue;
            }
            let mut next = st.entries[cid.0].conflict;
            // A chain that enters a cycle not passing through `cid` never
            // terminates; bound the walk by the arena size.
            let mut steps = 0;
            while let Some(nid) = next {
                if steps >= st.entries.len() {
                    break;
                }
                steps += 1;
                if st.entries[nid.0].conflict == Some(cid) {
                    self.break_cycle(st, cid)?;
                    break;
                }
                next = st.entries[nid.0].conflict;
            }
        }
        Ok(())
    }

    /// Linearize a rename cycle by detouring this item's rename through a
    /// synthetic intermediate path:
    ///
    /// ```text
    /// rename A -> B          rename A -> <intermediate>
    /// rename B -> A   ==>    rename B -> A
    ///                        rename <intermediate> -> B
    /// ```
    ///
    /// Longer cycles unwind recursively; the closing rename of each link
    /// takes the priority computed for the rest of the cycle.
    fn break_cycle(&self, st: &mut State, item_id: ItemId) -> Result<i32, ResolveError> {
        if st.entries[item_id.0].item.action() != ChangeAction::Rename {
            return Err(ResolveError::NonRenameCycle {
                action: st.entries[item_id.0].item.action().to_string(),
                target: st.entries[item_id.0].item.target().to_string(),
            });
        }
        if st.entries[item_id.0].resolved {
            return Ok(st.entries[item_id.0].priority);
        }
        let Some(conflict_id) = st.entries[item_id.0].conflict else {
            return Ok(st.entries[item_id.0].priority);
        };

        let source = st.entries[item_id.0]
            .item
            .source()
            .unwrap_or_default()
            .to_string();
        let target = st.entries[item_id.0].item.target().to_string();
        let intermediate = st.names.intermediate_name(&target);
        debug!(source = %source, path = %target, intermediate = %intermediate, "breaking rename cycle");

        let vacate_priority = st.entries[conflict_id.0].priority;
        let vacate = BatchedItem::synthetic_rename(source, intermediate.clone());
        alloc_resolved(st, vacate, vacate_priority);

        st.entries[conflict_id.0].priority += 1;

        let restore_priority = st.entries[conflict_id.0].priority + 1;
        let restore = BatchedItem::synthetic_rename(intermediate, target);
        let restore_id = alloc_resolved(st, restore, restore_priority);

        st.entries[item_id.0].resolved = true;
        remove_handle(&mut st.unresolved_changes, item_id);

        if st.entries[conflict_id.0].conflict == Some(item_id) {
            // A two-rename cycle: the partner is free to run between the
            // vacate and restore steps.
            st.entries[conflict_id.0].resolved = true;
            remove_handle(&mut st.unresolved_changes, conflict_id);
            st.resolved.push(conflict_id);
        } else {
            let unwound_priority = self.break_cycle(st, conflict_id)?;
            st.entries[restore_id.0].priority = unwound_priority;
        }

        Ok(st.entries[conflict_id.0].priority)
    }
}

// ---------------------------------------------------------------------------
// Arena helpers
// ---------------------------------------------------------------------------

fn alloc(st: &mut State, item: BatchedItem, priority: i32) -> ItemId {
    let id = ItemId(st.entries.len());
    st.entries.push(Entry {
        item,
        priority,
        resolved: false,
        conflict: None,
    });
    id
}

fn alloc_resolved(st: &mut State, item: BatchedItem, priority: i32) -> ItemId {
    let id = ItemId(st.entries.len());
    st.entries.push(Entry {
        item,
        priority,
        resolved: true,
        conflict: None,
    });
    st.resolved.push(id);
    id
}

fn remove_handle(list: &mut Vec<ItemId>, id: ItemId) {
    if let Some(pos) = list.iter().position(|&x| x == id) {
        list.remove(pos);
    }
}

/// Record `ancestor` as what `dependent` waits for, keeping the nearer
/// ancestor when one is already recorded. Two unrelated claimants mean the
/// conflict graph is contradictory; the configured policy decides.
fn set_nearest_ancestor(
    entries: &mut [Entry],
    dependent: ItemId,
    ancestor: ItemId,
    mode: CaseMode,
    policy: AmbiguousAncestryPolicy,
) -> Result<(), ResolveError> {
    let Some(existing) = entries[dependent.0].conflict else {
        entries[dependent.0].conflict = Some(ancestor);
        return Ok(());
    };
    if existing == ancestor {
        return Ok(());
    }
    let candidate_is_nearer = path::is_sub_item(
        mode,
        entries[ancestor.0].item.target(),
        entries[existing.0].item.target(),
    );
    if candidate_is_nearer {
        entries[dependent.0].conflict = Some(ancestor);
        return Ok(());
    }
    let existing_is_nearer = path::is_sub_item(
        mode,
        entries[existing.0].item.target(),
        entries[ancestor.0].item.target(),
    );
    if existing_is_nearer {
        return Ok(());
    }
    match policy {
        AmbiguousAncestryPolicy::Reject => Err(ResolveError::AmbiguousAncestry {
            item: entries[dependent.0].item.target().to_string(),
            first: entries[existing.0].item.target().to_string(),
            second: entries[ancestor.0].item.target().to_string(),
        }),
        AmbiguousAncestryPolicy::KeepFirst => {
            warn!(
                item = %entries[dependent.0].item.target(),
                first = %entries[existing.0].item.target(),
                second = %entries[ancestor.0].item.target(),
                "ambiguous ancestry; keeping first recorded dependency"
            );
            Ok(())
        }
    }
}

/// Whether `child` is exactly the rename induced by `parent` renaming an
/// ancestor folder: both of its paths nest under the parent's, and its
/// target equals the parent's target joined with its source suffix.
fn is_induced_by(mode: CaseMode, child: &BatchedItem, parent: &BatchedItem) -> bool {
    let (Some(child_source), Some(parent_source)) = (child.source(), parent.source()) else {
        return false;
    };
    if !path::is_sub_item(mode, child.target(), parent.target())
        || !path::is_sub_item(mode, child_source, parent_source)
    {
        return false;
    }
    let Some(suffix) = child_source.get(parent_source.len()..) else {
        return false;
    };
    child.target() == path::concat(parent.target(), suffix)
}
