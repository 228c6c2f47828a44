/// Credential and task store contracts
///
/// The auth core never talks to SQL directly. It consumes two narrow traits:
///
/// - [`CredentialStore`]: create a user, find a user by email
/// - [`TaskStore`]: fetch a task (to read its owner) and mutate tasks by id
///
/// [`PgStore`] implements both on top of the sqlx models. An in-memory
/// implementation for tests lives in `crate::testing` behind the `test-utils`
/// feature.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tasklist_shared::store::{PgStore, Store};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
/// store.ping().await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::{
    task::{CreateTask, Task, UpdateTask},
    user::{CreateUser, User},
};

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique field is already taken
    #[error("{field} already exists")]
    Conflict {
        /// Which field collided ("username", "email", ...)
        field: String,
    },

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Store-specific failure with no database behind it
    #[error("Store error: {0}")]
    Other(String),
}

/// Users, as seen by the issuance flow
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Persists a new user
    ///
    /// Returns `StoreError::Conflict` if the username or email is taken.
    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError>;

    /// Looks a user up by (normalized) email
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}

/// Tasks, as seen by the task handlers
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Inserts a task; status starts as pending
    async fn create_task(&self, data: CreateTask) -> Result<Task, StoreError>;

    /// Fetches a task by id, whoever owns it
    async fn find_task_by_id(&self, id: i64) -> Result<Option<Task>, StoreError>;

    /// Lists an owner's tasks, newest first
    async fn list_tasks_by_owner(
        &self,
        owner_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Task>, StoreError>;

    /// Applies a partial update; `None` if the task is gone
    async fn update_task(&self, id: i64, changes: UpdateTask) -> Result<Option<Task>, StoreError>;

    /// Deletes a task; false if it was already gone
    async fn delete_task(&self, id: i64) -> Result<bool, StoreError>;
}

/// Everything the API server needs from persistence
#[async_trait]
pub trait Store: CredentialStore + TaskStore {
    /// Cheap liveness probe for health checks
    async fn ping(&self) -> Result<(), StoreError>;
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps a unique violation on `users` to the field that collided
fn map_user_insert_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let field = match db_err.constraint() {
                Some(constraint) if constraint.contains("username") => "username",
                Some(constraint) if constraint.contains("email") => "email",
                _ => "user",
            };
            return StoreError::Conflict {
                field: field.to_string(),
            };
        }
    }

    StoreError::Database(err)
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError> {
        User::create(&self.pool, data)
            .await
            .map_err(map_user_insert_error)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn create_task(&self, data: CreateTask) -> Result<Task, StoreError> {
        Ok(Task::create(&self.pool, data).await?)
    }

    async fn find_task_by_id(&self, id: i64) -> Result<Option<Task>, StoreError> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn list_tasks_by_owner(
        &self,
        owner_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Task>, StoreError> {
        Ok(Task::list_by_owner(&self.pool, owner_id, limit, offset).await?)
    }

    async fn update_task(&self, id: i64, changes: UpdateTask) -> Result<Option<Task>, StoreError> {
        Ok(Task::update(&self.pool, id, changes).await?)
    }

    async fn delete_task(&self, id: i64) -> Result<bool, StoreError> {
        Ok(Task::delete(&self.pool, id).await?)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(crate::db::pool::health_check(&self.pool).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_pass_through() {
        let err = map_user_insert_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(sqlx::Error::RowNotFound)));
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Conflict {
            field: "email".to_string(),
        };
        assert_eq!(err.to_string(), "email already exists");
    }
}
