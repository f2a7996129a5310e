//! Authorization module - task access policy
//!
//! Decides what an authenticated caller may see and change:
//! - Identity matching of free-form assignee references (id, email, username)
//! - Per-operation policy decisions for tasks
//! - Visibility filtering of task collections
//!
//! Everything here is synchronous and works on records already fetched from the store.

mod evaluator;
pub mod identity;
mod principal;
mod visibility;

pub use evaluator::{DefaultPolicyEvaluator, PolicyEvaluator, UpdateDecision};
pub use principal::Principal;
pub use visibility::visible_tasks;

/// Why a write operation was refused.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDenied {
    #[error("admin role required")]
    NotAdmin,
    #[error("not authorized for this task")]
    NotAssignee,
    #[error("status-only update permitted")]
    StatusOnlyViolation,
}
