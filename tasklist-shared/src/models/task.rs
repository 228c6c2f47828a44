/// Task model and database operations
///
/// A task is a to-do item owned by exactly one user. Ownership is fixed at
/// creation; every read, update and delete goes through
/// [`crate::auth::authorization`] before it reaches these functions.
///
/// # Status
///
/// ```text
/// pending | in-progress | failed | completed
/// ```
///
/// Any status may follow any other; there is no transition table.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('pending', 'in-progress', 'failed', 'completed');
///
/// CREATE TABLE tasks (
///     id BIGSERIAL PRIMARY KEY,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(30) NOT NULL,
///     description VARCHAR(150) NOT NULL DEFAULT '',
///     deadline TIMESTAMPTZ NOT NULL,
///     status task_status NOT NULL DEFAULT 'pending',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Longest allowed task name
pub const MAX_NAME_LENGTH: u64 = 30;

/// Longest allowed task description
pub const MAX_DESCRIPTION_LENGTH: u64 = 150;

/// Task progress status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status")]
pub enum TaskStatus {
    /// Not started
    #[default]
    #[sqlx(rename = "pending")]
    #[serde(rename = "pending")]
    Pending,

    /// Being worked on
    #[sqlx(rename = "in-progress")]
    #[serde(rename = "in-progress", alias = "in progress", alias = "in_progress")]
    InProgress,

    /// Abandoned or missed
    #[sqlx(rename = "failed")]
    #[serde(rename = "failed")]
    Failed,

    /// Done
    #[sqlx(rename = "completed")]
    #[serde(rename = "completed")]
    Completed,
}

impl TaskStatus {
    /// Wire and database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Failed => "failed",
            TaskStatus::Completed => "completed",
        }
    }
}

/// Task owned by a single user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: i64,

    /// Owning user, immutable after creation
    #[sqlx(rename = "user_id")]
    pub owner_id: i64,

    /// Short name
    pub name: String,

    /// Free-form description, may be empty
    pub description: String,

    /// Due date
    pub deadline: DateTime<Utc>,

    /// Current status
    pub status: TaskStatus,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last modified
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    /// Owner, always the authenticated caller
    pub owner_id: i64,
    pub name: String,
    pub description: String,
    pub deadline: DateTime<Utc>,
}

/// Partial update; only `Some` fields change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateTask {
    pub name: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub status: Option<TaskStatus>,
}

impl UpdateTask {
    /// True when no field would change
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.deadline.is_none()
            && self.status.is_none()
    }
}

/// Checks that `deadline` lies strictly after `now`
pub fn validate_deadline(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), String> {
    if deadline <= now {
        return Err("Deadline must be in the future".to_string());
    }

    Ok(())
}

const TASK_COLUMNS: &str =
    "id, user_id, name, description, deadline, status, created_at, updated_at";

impl Task {
    /// Inserts a new task with status `pending`
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks (user_id, name, description, deadline, status) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(data.owner_id)
            .bind(data.name)
            .bind(data.description)
            .bind(data.deadline)
            .bind(TaskStatus::Pending)
            .fetch_one(pool)
            .await
    }

    /// Finds a task by ID regardless of owner
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists one owner's tasks, newest first
    pub async fn list_by_owner(
        pool: &PgPool,
        owner_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM tasks WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(owner_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Applies a partial update and bumps `updated_at`
    ///
    /// Returns `None` if the task doesn't exist.
    pub async fn update(
        pool: &PgPool,
        id: i64,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks SET \
                name = COALESCE($2, name), \
                description = COALESCE($3, description), \
                deadline = COALESCE($4, deadline), \
                status = COALESCE($5, status), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(data.name)
            .bind(data.description)
            .bind(data.deadline)
            .bind(data.status)
            .fetch_optional(pool)
            .await
    }

    /// Deletes a task; returns false if it didn't exist
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_status_wire_format() {
        assert_eq!(serde_json::to_string(&TaskStatus::InProgress).unwrap(), "\"in-progress\"");
        assert_eq!(serde_json::to_string(&TaskStatus::Pending).unwrap(), "\"pending\"");

        for raw in ["\"in-progress\"", "\"in progress\"", "\"in_progress\""] {
            let status: TaskStatus = serde_json::from_str(raw).unwrap();
            assert_eq!(status, TaskStatus::InProgress);
        }

        assert!(serde_json::from_str::<TaskStatus>("\"archived\"").is_err());
    }

    #[test]
    fn test_status_as_str_matches_serde() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Failed,
            TaskStatus::Completed,
        ] {
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                serde_json::Value::String(status.as_str().to_string())
            );
        }
    }

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(TaskStatus::default(), TaskStatus::Pending);
    }

    #[test]
    fn test_validate_deadline() {
        let now = Utc::now();

        assert!(validate_deadline(now + Duration::hours(1), now).is_ok());
        assert!(validate_deadline(now, now).is_err());
        assert!(validate_deadline(now - Duration::seconds(1), now).is_err());
    }

    #[test]
    fn test_update_task_is_empty() {
        assert!(UpdateTask::default().is_empty());

        let update = UpdateTask {
            status: Some(TaskStatus::Completed),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_task_serializes_owner_id() {
        let now = Utc::now();
        let task = Task {
            id: 1,
            owner_id: 9,
            name: "X".to_string(),
            description: String::new(),
            deadline: now,
            status: TaskStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["owner_id"], 9);
        assert_eq!(json["status"], "pending");
    }
}
