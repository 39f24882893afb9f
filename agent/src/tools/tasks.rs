use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use taskpilot_core::tasks::{NewTask, Task, TaskUpdate};

use super::{ToolContext, ToolDefinition, ToolError, ToolExecutor, typed_args};
use crate::backend::BackendError;
use crate::chat::ChatMessage;

const TASK_NOT_FOUND: &str = "Error, Task not found.";

pub fn list_tasks() -> ToolDefinition {
    ToolDefinition {
        name: "list_tasks",
        description: "This function lists the tasks for the current user.",
        input_schema: json!({
            "type": "object",
            "properties": {},
            "description": "This function does not require any input parameters. It simply returns a list of tasks."
        }),
        executor: Arc::new(ListTasks),
    }
}

pub fn get_task() -> ToolDefinition {
    ToolDefinition {
        name: "get_task",
        description: "This function fetches a single task for the current user.",
        input_schema: json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "The id of the task." }
            },
            "required": ["id"]
        }),
        executor: Arc::new(GetTask),
    }
}

pub fn add_task() -> ToolDefinition {
    ToolDefinition {
        name: "add_task",
        description: "This function creates a new task for the current user.",
        input_schema: json!({
            "type": "object",
            "properties": {
                "title": { "type": "string", "description": "The title of the task." },
                "description": { "type": "string", "description": "The description of the task." },
                "dueDate": { "type": "string", "format": "date-time", "description": "The due date of the task." },
                "completed": { "type": "boolean", "description": "The completion status of the task." }
            },
            "required": ["title"]
        }),
        executor: Arc::new(AddTask),
    }
}

pub fn update_task() -> ToolDefinition {
    ToolDefinition {
        name: "update_task",
        description: "This function updates a task for the current user. Only the fields provided are changed.",
        input_schema: json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "The id of the task." },
                "title": { "type": "string", "description": "The title of the task." },
                "description": { "type": "string", "description": "The description of the task." },
                "dueDate": { "type": "string", "format": "date-time", "description": "The due date of the task." },
                "completed": { "type": "boolean", "description": "The completion status of the task." }
            },
            "required": ["id"]
        }),
        executor: Arc::new(UpdateTask),
    }
}

pub fn delete_task() -> ToolDefinition {
    ToolDefinition {
        name: "delete_task",
        description: "This function deletes a task for the current user.",
        input_schema: json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "The id of the task." }
            },
            "required": ["id"]
        }),
        executor: Arc::new(DeleteTask),
    }
}

#[derive(Deserialize)]
struct TaskId {
    id: String,
}

/// Task fields as listed back to the model.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskSummary<'a> {
    id: &'a str,
    title: &'a str,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed: Option<bool>,
}

impl<'a> From<&'a Task> for TaskSummary<'a> {
    fn from(task: &'a Task) -> Self {
        Self {
            id: &task.id,
            title: &task.title,
            description: &task.description,
            due_date: task.due_date,
            completed: task.completed,
        }
    }
}

fn task_lines(heading: &str, task: &Task) -> String {
    let due = task
        .due_date
        .map(|d| d.to_rfc3339())
        .unwrap_or_else(|| "not set".to_string());
    [
        heading.to_string(),
        format!("Id: {}", task.id),
        format!("Title: {}", task.title),
        format!("Description: {}", task.description),
        format!("Due Date: {due}"),
        format!("Completed: {}", task.completed.unwrap_or(false)),
    ]
    .join("\n")
}

struct ListTasks;

#[async_trait]
impl ToolExecutor for ListTasks {
    async fn execute(
        &self,
        ctx: &ToolContext,
        _args: Value,
        _conversation: &[ChatMessage],
    ) -> Result<String, ToolError> {
        let tasks = ctx.tasks.list().await?;
        let summaries: Vec<TaskSummary<'_>> = tasks.iter().map(TaskSummary::from).collect();
        let listing = serde_json::to_string(&summaries)
            .map_err(|e| ToolError::Backend(BackendError::Malformed(e.to_string())))?;
        tracing::debug!(count = tasks.len(), "listed tasks for tool call");

        Ok([
            "The user is asking for a list of tasks.",
            "Respond with a concise and readable list of the tasks, with a short description for each one.",
            "Use markdown formatting to make each description more readable.",
            "Begin each task's description with a header consisting of the task Title and id",
            "That list of tasks is as follows:",
            listing.as_str(),
        ]
        .join("\n"))
    }
}

struct GetTask;

#[async_trait]
impl ToolExecutor for GetTask {
    async fn execute(
        &self,
        ctx: &ToolContext,
        args: Value,
        _conversation: &[ChatMessage],
    ) -> Result<String, ToolError> {
        let TaskId { id } = typed_args(args)?;
        Ok(match ctx.tasks.get(&id).await? {
            Some(task) => task_lines("Task details:", &task),
            None => TASK_NOT_FOUND.to_string(),
        })
    }
}

struct AddTask;

#[async_trait]
impl ToolExecutor for AddTask {
    async fn execute(
        &self,
        ctx: &ToolContext,
        args: Value,
        _conversation: &[ChatMessage],
    ) -> Result<String, ToolError> {
        let new_task: NewTask = typed_args(args)?;
        let created = ctx.tasks.create(new_task).await?;
        tracing::info!(task_id = %created.id, "task created by tool call");
        Ok(task_lines("A new task has been created successfully.", &created))
    }
}

struct UpdateTask;

#[async_trait]
impl ToolExecutor for UpdateTask {
    async fn execute(
        &self,
        ctx: &ToolContext,
        args: Value,
        _conversation: &[ChatMessage],
    ) -> Result<String, ToolError> {
        let update: TaskUpdate = typed_args(args)?;
        if update.patch.is_empty() {
            tracing::debug!(task_id = %update.id, "update_task called without changes");
        }
        Ok(match ctx.tasks.update(update).await? {
            Some(task) => task_lines("Task updated successfully.", &task),
            None => TASK_NOT_FOUND.to_string(),
        })
    }
}

struct DeleteTask;

#[async_trait]
impl ToolExecutor for DeleteTask {
    async fn execute(
        &self,
        ctx: &ToolContext,
        args: Value,
        _conversation: &[ChatMessage],
    ) -> Result<String, ToolError> {
        let TaskId { id } = typed_args(args)?;
        let deleted = ctx.tasks.delete(&id).await?;
        Ok(if deleted {
            "Task deleted successfully.".to_string()
        } else {
            "Error, Task not deleted.".to_string()
        })
    }
}
