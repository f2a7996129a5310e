use std::collections::BTreeSet;

use super::identity;
use super::principal::Principal;
use super::PolicyDenied;
use crate::models::task::{Task, TaskField};
use crate::models::user::User;

/// Outcome of an update check. A denial is an ordinary value, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateDecision {
    Allowed(BTreeSet<TaskField>),
    Denied(PolicyDenied),
}

impl UpdateDecision {
    pub fn into_result(self) -> Result<BTreeSet<TaskField>, PolicyDenied> {
        match self {
            UpdateDecision::Allowed(fields) => Ok(fields),
            UpdateDecision::Denied(reason) => Err(reason),
        }
    }
}

/// Policy evaluator trait for pluggable task authorization.
///
/// `caller` is the principal's own user record when it could be loaded. Without it only the
/// principal id can establish assignment.
pub trait PolicyEvaluator: Send + Sync {
    fn can_create(&self, principal: &Principal) -> bool;

    fn can_delete(&self, principal: &Principal) -> bool;

    fn can_read(&self, principal: &Principal, caller: Option<&User>, task: &Task) -> bool;

    fn can_update(
        &self,
        principal: &Principal,
        caller: Option<&User>,
        task: &Task,
        requested: &BTreeSet<TaskField>,
    ) -> UpdateDecision;
}

/// Default two-role policy
///
/// Evaluation order:
/// 1. Admin -> allow everything, all requested fields
/// 2. assignee (id, then email, then username) -> read, and update of `status` alone
/// 3. deny
#[derive(Debug, Clone, Default)]
pub struct DefaultPolicyEvaluator;

impl DefaultPolicyEvaluator {
    pub fn new() -> Self {
        Self
    }

    fn admin_only(principal: &Principal) -> bool {
        principal.is_admin()
    }
}

impl PolicyEvaluator for DefaultPolicyEvaluator {
    fn can_create(&self, principal: &Principal) -> bool {
        Self::admin_only(principal)
    }

    fn can_delete(&self, principal: &Principal) -> bool {
        Self::admin_only(principal)
    }

    fn can_read(&self, principal: &Principal, caller: Option<&User>, task: &Task) -> bool {
        if principal.is_admin() {
            return true;
        }

        let allowed = identity::is_assignee(&task.assigned_to, &principal.id, caller);
        tracing::debug!(
            principal_id = %principal.id,
            task_id = %task.id,
            decision = allowed,
            "task read check"
        );
        allowed
    }

    fn can_update(
        &self,
        principal: &Principal,
        caller: Option<&User>,
        task: &Task,
        requested: &BTreeSet<TaskField>,
    ) -> UpdateDecision {
        // 1. Admin may change any field it sends
        if principal.is_admin() {
            return UpdateDecision::Allowed(requested.clone());
        }

        // 2. Must be the assignee
        if !identity::is_assignee(&task.assigned_to, &principal.id, caller) {
            tracing::debug!(
                principal_id = %principal.id,
                task_id = %task.id,
                "update denied: not assignee"
            );
            return UpdateDecision::Denied(PolicyDenied::NotAssignee);
        }

        // 3. Status and nothing else; mixed requests are refused whole
        let status_only = BTreeSet::from([TaskField::Status]);
        if *requested != status_only {
            tracing::debug!(
                principal_id = %principal.id,
                task_id = %task.id,
                requested = ?requested,
                "update denied: status-only"
            );
            return UpdateDecision::Denied(PolicyDenied::StatusOnlyViolation);
        }

        UpdateDecision::Allowed(status_only)
    }
}

#[cfg(test)]
impl UpdateDecision {
    fn is_allowed(&self) -> bool {
        matches!(self, UpdateDecision::Allowed(_))
    }

    fn allowed_fields(&self) -> BTreeSet<TaskField> {
        match self {
            UpdateDecision::Allowed(fields) => fields.clone(),
            UpdateDecision::Denied(_) => BTreeSet::new(),
        }
    }
}
