//! Stack management module
//!
//! This module implements the core stacked branch functionality:
//! - The branch-parent forest and its invariants
//! - Durable storage of the forest and of suspended syncs
//! - Up/down navigation through a stack
//! - Cascading rebases with conflict suspend/resume

pub mod cascade;
pub mod graph;
pub mod navigator;
pub mod store;

pub use cascade::{
    CascadeOptions, CascadeOutcome, CascadeReport, CascadeState, RebaseEngine, RebasedBranch,
    StepApproval, StepPreview,
};
pub use graph::{BranchGraph, BranchNode, Parent};
pub use store::{BranchRecord, StackState, StackStore};
