use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum TaskStatus {
    #[default]
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(TaskStatus::Pending),
            "In Progress" | "InProgress" => Ok(TaskStatus::InProgress),
            "Completed" => Ok(TaskStatus::Completed),
            other => Err(AppError::internal(format!("unknown task status: {other}"))),
        }
    }
}

/// Task fields a caller may ask to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskField {
    Title,
    Description,
    Status,
    AssignedTo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    /// User id, email or username of the assignee, exactly as entered.
    #[schema(example = "bob@example.com")]
    pub assigned_to: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbTask {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub assigned_to: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbTask> for Task {
    type Error = AppError;

    fn try_from(value: DbTask) -> Result<Self, Self::Error> {
        Ok(Task {
            id: value.id,
            title: value.title,
            description: value.description,
            status: value.status.parse()?,
            assigned_to: value.assigned_to,
            created_by: value.created_by,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreateRequest {
    #[schema(example = "Prepare release notes")]
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    #[schema(example = "bob@example.com")]
    pub assigned_to: Option<String>,
}

/// Partial update. Unknown keys are rejected and an explicit `null` still counts as sent, so the
/// requested field set is exactly the set of keys in the body.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskUpdateRequest {
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<TaskStatus>)]
    pub status: Option<Option<TaskStatus>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub assigned_to: Option<Option<String>>,
}

/// Outer `Some` marks the key as present; the inner option carries a possible `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl TaskUpdateRequest {
    pub fn requested_fields(&self) -> BTreeSet<TaskField> {
        let mut fields = BTreeSet::new();
        if self.title.is_some() {
            fields.insert(TaskField::Title);
        }
        if self.description.is_some() {
            fields.insert(TaskField::Description);
        }
        if self.status.is_some() {
            fields.insert(TaskField::Status);
        }
        if self.assigned_to.is_some() {
            fields.insert(TaskField::AssignedTo);
        }
        fields
    }

    /// Copy the permitted fields onto `task`; everything else is left untouched.
    /// A `null` description clears it, `null` on any other field is rejected.
    pub fn apply_to(self, task: &mut Task, allowed: &BTreeSet<TaskField>) -> AppResult<()> {
        if allowed.contains(&TaskField::Title) {
            if let Some(title) = self.title {
                task.title = title.ok_or_else(|| AppError::bad_request("title must not be null"))?;
            }
        }
        if allowed.contains(&TaskField::Description) {
            if let Some(description) = self.description {
                task.description = description.unwrap_or_default();
            }
        }
        if allowed.contains(&TaskField::Status) {
            if let Some(status) = self.status {
                task.status = status.ok_or_else(|| AppError::bad_request("status must not be null"))?;
            }
        }
        if allowed.contains(&TaskField::AssignedTo) {
            if let Some(assigned_to) = self.assigned_to {
                task.assigned_to =
                    assigned_to.ok_or_else(|| AppError::bad_request("assignedTo must not be null"))?;
            }
        }
        Ok(())
    }
}
