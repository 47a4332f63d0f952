//! VcReplay core library.
//!
//! This crate provides the change-action batching and ordering engine used
//! when replaying version-control history against a target system: change
//! classification, namespace conflict detection, rename-cycle breaking, and
//! the ordered execution plan handed to the replay layer.

pub mod batch;
pub mod errors;
pub mod models;
pub mod path;

// Re-exports for convenience.
pub use batch::{BatchedItem, ChangeOptimizer, ResolvedChange};
pub use errors::{BatchError, CoreError, ResolveError};
pub use models::{ChangeAction, MergeOptions, OptimizerOptions, RecursionKind};
pub use path::CaseMode;
