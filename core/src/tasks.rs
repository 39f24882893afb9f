use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A single task owned by one user.
///
/// Field names are camelCase on the wire; the agent and the skillset caller
/// both speak that shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Server-generated identifier (UUID string)
    pub id: String,
    /// Login of the owning user
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: Option<bool>,
}

/// Request body for creating a task. The owner is taken from the caller's
/// identity, never from the body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl NewTask {
    pub fn into_task(self, id: String, user_id: String) -> Task {
        Task {
            id,
            user_id,
            title: self.title,
            description: self.description.unwrap_or_default(),
            due_date: self.due_date,
            completed: Some(self.completed.unwrap_or(false)),
        }
    }
}

/// Partial update: provided fields replace the stored value, absent fields
/// keep it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.completed.is_none()
    }

    /// Merge this patch over `existing`. Identity fields (`id`, `user_id`)
    /// are never touched.
    pub fn apply(&self, existing: &Task) -> Task {
        Task {
            id: existing.id.clone(),
            user_id: existing.user_id.clone(),
            title: self.title.clone().unwrap_or_else(|| existing.title.clone()),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| existing.description.clone()),
            due_date: self.due_date.or(existing.due_date),
            completed: self.completed.or(existing.completed),
        }
    }
}

/// Skillset update body: the target id plus the patch fields inline.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub id: String,
    #[serde(flatten)]
    pub patch: TaskPatch,
}
