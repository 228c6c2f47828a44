/// In-memory store for tests
///
/// Implements [`Store`] with the same observable behavior as [`PgStore`]
/// (unique usernames and emails, newest-first listing, partial updates) so the
/// HTTP layer can be exercised without PostgreSQL. Enabled for other crates by
/// the `test-utils` feature.
///
/// Every trait call is counted, which lets tests assert that a rejected
/// request never reached the store.
///
/// [`PgStore`]: crate::store::PgStore

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex, MutexGuard,
};

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    models::{
        task::{CreateTask, Task, TaskStatus, UpdateTask},
        user::{CreateUser, User},
    },
    store::{CredentialStore, Store, StoreError, TaskStore},
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    tasks: Vec<Task>,
    next_user_id: i64,
    next_task_id: i64,
    fail_next: Option<String>,
}

/// Thread-safe in-memory [`Store`]
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    user_calls: AtomicUsize,
    task_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next store call fail with `StoreError::Other`
    pub fn fail_next(&self, message: &str) {
        self.lock().fail_next = Some(message.to_string());
    }

    /// Number of `CredentialStore` calls so far
    pub fn user_calls(&self) -> usize {
        self.user_calls.load(Ordering::SeqCst)
    }

    /// Number of `TaskStore` calls so far
    pub fn task_calls(&self) -> usize {
        self.task_calls.load(Ordering::SeqCst)
    }

    pub fn user_count(&self) -> usize {
        self.lock().users.len()
    }

    pub fn task_count(&self) -> usize {
        self.lock().tasks.len()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // A panicking test thread must not wedge every other test
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn enter(&self, counter: &AtomicUsize) -> Result<MutexGuard<'_, Tables>, StoreError> {
        counter.fetch_add(1, Ordering::SeqCst);

        let mut tables = self.lock();
        match tables.fail_next.take() {
            Some(message) => Err(StoreError::Other(message)),
            None => Ok(tables),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError> {
        let mut tables = self.enter(&self.user_calls)?;

        if tables.users.iter().any(|u| u.username == data.username) {
            return Err(StoreError::Conflict {
                field: "username".to_string(),
            });
        }
        if tables.users.iter().any(|u| u.email == data.email) {
            return Err(StoreError::Conflict {
                field: "email".to_string(),
            });
        }

        tables.next_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: tables.next_user_id,
            username: data.username,
            email: data.email,
            password_hash: data.password_hash,
            created_at: now,
            updated_at: now,
        };

        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.enter(&self.user_calls)?;

        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn create_task(&self, data: CreateTask) -> Result<Task, StoreError> {
        let mut tables = self.enter(&self.task_calls)?;

        tables.next_task_id += 1;
        let now = Utc::now();
        let task = Task {
            id: tables.next_task_id,
            owner_id: data.owner_id,
            name: data.name,
            description: data.description,
            deadline: data.deadline,
            status: TaskStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        tables.tasks.push(task.clone());
        Ok(task)
    }

    async fn find_task_by_id(&self, id: i64) -> Result<Option<Task>, StoreError> {
        let tables = self.enter(&self.task_calls)?;

        Ok(tables.tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn list_tasks_by_owner(
        &self,
        owner_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Task>, StoreError> {
        let tables = self.enter(&self.task_calls)?;

        let mut owned: Vec<Task> = tables
            .tasks
            .iter()
            .filter(|t| t.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(owned
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn update_task(&self, id: i64, changes: UpdateTask) -> Result<Option<Task>, StoreError> {
        let mut tables = self.enter(&self.task_calls)?;

        let Some(task) = tables.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };

        if let Some(name) = changes.name {
            task.name = name;
        }
        if let Some(description) = changes.description {
            task.description = description;
        }
        if let Some(deadline) = changes.deadline {
            task.deadline = deadline;
        }
        if let Some(status) = changes.status {
            task.status = status;
        }
        task.updated_at = Utc::now();

        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, id: i64) -> Result<bool, StoreError> {
        let mut tables = self.enter(&self.task_calls)?;

        let before = tables.tasks.len();
        tables.tasks.retain(|t| t.id != id);
        Ok(tables.tasks.len() < before)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        match self.lock().fail_next.take() {
            Some(message) => Err(StoreError::Other(message)),
            None => Ok(()),
        }
    }
}
