//! Matching of assignee references against user records.
//!
//! A task's `assigned_to` may hold a user id, an email, or a username. Comparison is
//! exact and case-sensitive; nothing is normalized.

use crate::models::user::User;

/// Returns true when `assigned_to` names `user` by id, email or username.
///
/// An empty or missing username counts as "no username set" and never matches.
pub fn matches(assigned_to: &str, user: &User) -> bool {
    if assigned_to == user.id || assigned_to == user.email {
        return true;
    }

    match user.username.as_deref() {
        Some(username) if !username.is_empty() => assigned_to == username,
        _ => false,
    }
}

/// Ordered fallback keys for a user: email, then username. Absent or empty values are skipped.
pub fn fallback_keys(user: &User) -> Vec<&str> {
    [Some(user.email.as_str()), user.username.as_deref()]
        .into_iter()
        .flatten()
        .filter(|key| !key.is_empty())
        .collect()
}

/// Whether the caller is the assignee: principal id first, then the caller's own record.
pub fn is_assignee(assigned_to: &str, principal_id: &str, caller: Option<&User>) -> bool {
    assigned_to == principal_id || caller.is_some_and(|user| matches(assigned_to, user))
}
