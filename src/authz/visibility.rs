use super::identity;
use super::principal::Principal;
use crate::models::task::Task;
use crate::models::user::User;

/// Tasks the caller is allowed to see, in their original order.
///
/// Admins see everything. Other callers see the tasks assigned to their id; when there are
/// none, the caller's record is looked up and its fallback keys (email, then username) are
/// tried in turn. The first key that selects anything wins; keys are never merged.
pub fn visible_tasks<F>(principal: &Principal, all_tasks: &[Task], lookup_user_by_id: F) -> Vec<Task>
where
    F: FnOnce(&str) -> Option<User>,
{
    if principal.is_admin() {
        return all_tasks.to_vec();
    }

    let by_id = assigned_to(all_tasks, &principal.id);
    if !by_id.is_empty() {
        return by_id;
    }

    let Some(caller) = lookup_user_by_id(&principal.id) else {
        tracing::debug!(principal_id = %principal.id, "no user record for fallback lookup");
        return Vec::new();
    };

    for key in identity::fallback_keys(&caller) {
        let selected = assigned_to(all_tasks, key);
        if !selected.is_empty() {
            tracing::debug!(
                principal_id = %principal.id,
                count = selected.len(),
                "tasks matched by fallback key"
            );
            return selected;
        }
    }

    Vec::new()
}

fn assigned_to(tasks: &[Task], key: &str) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| task.assigned_to == key)
        .cloned()
        .collect()
}
