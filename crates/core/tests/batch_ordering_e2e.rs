//! End-to-end tests for change-action batching and ordering.
//!
//! These tests feed a realistic changeset's worth of actions through the
//! real `ChangeOptimizer` -- including concurrent producers, the merge
//! pre-processing pass, and path revision -- and verify the invariants the
//! replay engine depends on:
//!
//! - every dependency executes before its dependent
//! - content changes execute after all namespace operations
//! - implicit side-effect actions are absorbed, not emitted
//! - rename cycles are linearized through synthetic intermediate paths

use std::sync::Arc;

use vcreplay_core::batch::{BatchedItem, ChangeOptimizer, ResolvedChange};
use vcreplay_core::models::{ChangeAction, RecursionKind};

// ===========================================================================
// Helpers
// ===========================================================================

fn find<'a>(plan: &'a [ResolvedChange], action: ChangeAction, target: &str) -> &'a ResolvedChange {
    plan.iter()
        .find(|c| c.action == action && c.target == target)
        .unwrap_or_else(|| panic!("no {action:?} on '{target}' in plan"))
}

fn build_changeset(opt: &Arc<ChangeOptimizer>) {
    let producer_a = Arc::clone(opt);
    let producer_b = Arc::clone(opt);

    let thread_a = std::thread::spawn(move || {
        // Folder rename with a child rename that is pure side effect, plus
        // a new file inside the renamed folder.
        producer_a.add(
            BatchedItem::with_source("$/proj/src", "$/proj/lib", ChangeAction::Rename).unwrap(),
        );
        producer_a.add(
            BatchedItem::with_source(
                "$/proj/src/main.rs",
                "$/proj/lib/main.rs",
                ChangeAction::Rename,
            )
            .unwrap(),
        );
        producer_a.add(BatchedItem::new("$/proj/lib/util.rs", ChangeAction::Add).unwrap());
    });

    let thread_b = std::thread::spawn(move || {
        producer_b.add(
            BatchedItem::branch("$/ext/vendor", "$/proj/vendor", RecursionKind::Full, "500")
                .unwrap(),
        );
        producer_b
            .add(BatchedItem::new("$/proj/vendor/patch.diff", ChangeAction::Add).unwrap());
        producer_b.add(
            BatchedItem::merge(
                "$/proj/feature",
                "$/proj/main",
                RecursionKind::Full,
                "100",
                "200",
            )
            .unwrap(),
        );
        producer_b.add(BatchedItem::new("$/proj/main", ChangeAction::Edit).unwrap());
        producer_b.add(BatchedItem::new("$/proj/docs/old.md", ChangeAction::Delete).unwrap());
        producer_b.add(BatchedItem::new("$/proj/README.md", ChangeAction::Edit).unwrap());
    });

    thread_a.join().unwrap();
    thread_b.join().unwrap();

    // A rename swap discovered late in analysis.
    opt.add(BatchedItem::with_source("$/proj/a.txt", "$/proj/b.txt", ChangeAction::Rename).unwrap());
    opt.add(BatchedItem::with_source("$/proj/b.txt", "$/proj/a.txt", ChangeAction::Rename).unwrap());
}

// ===========================================================================
// Tests
// ===========================================================================

#[test]
fn test_full_changeset_ordering() {
    let opt = Arc::new(ChangeOptimizer::new());
    build_changeset(&opt);

    opt.revise_previous_names();
    opt.preprocess_merges();
    let plan = opt.resolve().unwrap();

    // 11 actions added, one absorbed as an implicit child rename; the
    // rename swap replaces one of its two renames with two synthetics.
    assert_eq!(plan.len(), 11);

    // The merge carries the highest urgency in the batch.
    assert_eq!(plan[0].action, ChangeAction::Merge);
    assert_eq!(plan[0].priority, 0);

    // Content changes execute strictly after all namespace operations.
    let namespace_max = plan
        .iter()
        .filter(|c| !c.action.is_content_change())
        .map(|c| c.priority)
        .max()
        .unwrap();
    let content_min = plan
        .iter()
        .filter(|c| c.action.is_content_change())
        .map(|c| c.priority)
        .min()
        .unwrap();
    assert!(content_min > namespace_max);
    assert_eq!(plan.iter().filter(|c| c.action.is_content_change()).count(), 3);

    // Parent-before-child: the branched folder exists before the add into
    // it, and the folder rename lands before the add into its target.
    let branch = find(&plan, ChangeAction::Branch, "$/proj/vendor");
    let patch = find(&plan, ChangeAction::Add, "$/proj/vendor/patch.diff");
    assert_eq!(patch.priority, branch.priority + 1);

    let lib_rename = find(&plan, ChangeAction::Rename, "$/proj/lib");
    let util = find(&plan, ChangeAction::Add, "$/proj/lib/util.rs");
    assert_eq!(util.priority, lib_rename.priority + 1);
}

#[test]
fn test_implicit_child_rename_is_absorbed() {
    let opt = Arc::new(ChangeOptimizer::new());
    build_changeset(&opt);

    opt.revise_previous_names();
    opt.preprocess_merges();
    let plan = opt.resolve().unwrap();

    assert!(opt.is_implicit_rename("$/proj/lib/main.rs"));
    assert!(plan.iter().all(|c| c.target != "$/proj/lib/main.rs"));
    assert_eq!(
        opt.implicit_rename_parents(),
        vec![("$/proj/lib/main.rs".to_string(), "$/proj/lib".to_string())]
    );
}

#[test]
fn test_rename_swap_is_linearized() {
    let opt = Arc::new(ChangeOptimizer::new());
    build_changeset(&opt);

    opt.revise_previous_names();
    opt.preprocess_merges();
    let plan = opt.resolve().unwrap();

    // rename a -> b / rename b -> a becomes three renames through a
    // fabricated intermediate path.
    let vacate = plan
        .iter()
        .find(|c| c.source.as_deref() == Some("$/proj/a.txt"))
        .unwrap();
    assert!(vacate.target.starts_with("$/proj/b.txt"));
    assert_ne!(vacate.target, "$/proj/b.txt");

    let partner = find(&plan, ChangeAction::Rename, "$/proj/a.txt");
    assert_eq!(partner.source.as_deref(), Some("$/proj/b.txt"));

    let restore = find(&plan, ChangeAction::Rename, "$/proj/b.txt");
    assert_eq!(restore.source.as_deref(), Some(vacate.target.as_str()));

    assert!(vacate.priority < partner.priority);
    assert!(partner.priority < restore.priority);
}

#[test]
fn test_merge_demoted_when_target_also_edited() {
    let opt = Arc::new(ChangeOptimizer::new());
    build_changeset(&opt);

    opt.revise_previous_names();
    opt.preprocess_merges();

    let associated = opt.merge_associated_changes();
    assert_eq!(associated.len(), 1);
    assert_eq!(associated[0].0, "$/proj/main");
    assert_eq!(associated[0].1.len(), 2);

    let plan = opt.resolve().unwrap();
    let merge = find(&plan, ChangeAction::Merge, "$/proj/main");
    assert!(!merge.merge_options.always_accept_mine);
    assert!(merge.merge_options.force_merge);
}

#[test]
fn test_plan_serializes_for_audit_logging() {
    let opt = Arc::new(ChangeOptimizer::new());
    build_changeset(&opt);

    opt.revise_previous_names();
    opt.preprocess_merges();
    let plan = opt.resolve().unwrap();

    let json = serde_json::to_string(&plan).unwrap();
    assert!(json.contains("\"merge\""));
    assert!(json.contains("\"priority\""));
    assert!(json.contains("$/proj/vendor/patch.diff"));
}

#[test]
fn test_every_dependency_precedes_its_dependent() {
    let opt = Arc::new(ChangeOptimizer::new());
    build_changeset(&opt);

    opt.revise_previous_names();
    opt.preprocess_merges();
    let plan = opt.resolve().unwrap();

    // The plan is sorted ascending by priority.
    for window in plan.windows(2) {
        assert!(window[0].priority <= window[1].priority);
    }
}
