pub mod anthropic;
pub mod api;
pub mod keyring;
pub mod report;

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::core::list::{ListId, TodoList};
use crate::core::report::{Report, ReportKind};
use crate::core::store::{Store, StoreError};
use crate::core::task::{Task, TaskId};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to {operation}: {source}")]
    Request {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to {operation}: server returned {status}")]
    Status { operation: &'static str, status: u16 },
    #[error("failed to {operation}: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },
    #[error("report generation failed: {0}")]
    Generator(String),
    #[error("keyring error: {0}")]
    Keyring(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type SyncResult<T> = Result<T, SyncError>;

/// Partial update body for the todos resource. Absent fields are left alone
/// by the server; `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_id: Option<ListId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<NaiveDate>>,
}

impl TaskUpdate {
    /// Only the completion fields of `task`.
    pub fn completion(task: &Task) -> Self {
        Self {
            completed: Some(task.completed),
            completed_at: Some(task.completed_at),
            ..Self::default()
        }
    }

    /// Every editable field of `task`.
    pub fn full(task: &Task) -> Self {
        Self {
            list_id: Some(task.list_id.clone()),
            text: Some(task.text.clone()),
            description: Some(task.description.clone()),
            completed: Some(task.completed),
            completed_at: Some(task.completed_at),
            due_date: Some(task.due_date),
        }
    }
}

/// CRUD surface of the remote todos/lists/reports API.
pub trait TodoBackend {
    fn get_todos(
        &self,
        list_id: Option<&ListId>,
    ) -> impl Future<Output = SyncResult<Vec<Task>>> + Send;

    fn create_todo(
        &self,
        list_id: &ListId,
        text: &str,
    ) -> impl Future<Output = SyncResult<Task>> + Send;

    fn update_todo(
        &self,
        id: &TaskId,
        update: &TaskUpdate,
    ) -> impl Future<Output = SyncResult<Task>> + Send;

    fn delete_todo(&self, id: &TaskId) -> impl Future<Output = SyncResult<()>> + Send;

    fn get_lists(&self) -> impl Future<Output = SyncResult<Vec<TodoList>>> + Send;

    fn create_list(&self, name: &str) -> impl Future<Output = SyncResult<TodoList>> + Send;

    fn update_list(
        &self,
        id: &ListId,
        name: &str,
    ) -> impl Future<Output = SyncResult<TodoList>> + Send;

    fn delete_list(&self, id: &ListId) -> impl Future<Output = SyncResult<()>> + Send;

    fn get_report(
        &self,
        date: NaiveDate,
        kind: ReportKind,
    ) -> impl Future<Output = SyncResult<Report>> + Send;
}

/// A [`Store`] kept in step with a remote backend.
///
/// Every mutation is checked against the local store, sent to the backend,
/// and applied locally only once the backend has accepted it. A failed
/// round-trip leaves the local store exactly as it was.
pub struct RemoteStore<B> {
    backend: B,
    store: Store,
}

impl<B: TodoBackend> RemoteStore<B> {
    pub fn new(backend: B) -> Self {
        Self::with_store(backend, Store::new())
    }

    /// Start from a cached store, e.g. one loaded from a snapshot.
    pub fn with_store(backend: B, store: Store) -> Self {
        Self { backend, store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Replace the local store with the backend's lists and todos. The active
    /// list survives the reload if it still exists.
    pub async fn load(&mut self) -> SyncResult<()> {
        let (lists, todos) =
            futures::try_join!(self.backend.get_lists(), self.backend.get_todos(None))?;
        log::info!("Loaded {} list(s) and {} todo(s)", lists.len(), todos.len());

        let mut store = Store::assemble(lists, todos);
        if let Some(active) = self.store.active_list_id() {
            if store.set_active_list(active).is_err() {
                log::debug!("Active list {} is gone after reload", active);
            }
        }
        self.store = store;
        Ok(())
    }

    pub fn set_active_list(&mut self, id: &ListId) -> SyncResult<()> {
        Ok(self.store.set_active_list(id)?)
    }

    pub async fn create_list(&mut self, name: &str) -> SyncResult<ListId> {
        let mut list = self.backend.create_list(name).await?;
        list.tasks.clear();
        let id = list.id.clone();
        self.store.insert_list(list)?;
        log::info!("Created list {}", id);
        Ok(id)
    }

    pub async fn rename_list(&mut self, id: &ListId, name: &str) -> SyncResult<()> {
        self.require_list(id)?;
        let confirmed = self.backend.update_list(id, name).await?;
        self.store.rename_list(id, confirmed.name)?;
        Ok(())
    }

    pub async fn delete_list(&mut self, id: &ListId) -> SyncResult<()> {
        self.require_list(id)?;
        self.backend.delete_list(id).await?;
        let removed = self.store.delete_list(id)?;
        log::info!("Deleted list {} ({} task(s))", id, removed.tasks.len());
        Ok(())
    }

    pub async fn add_task(&mut self, list_id: &ListId, text: &str) -> SyncResult<TaskId> {
        self.require_list(list_id)?;
        let task = self.backend.create_todo(list_id, text).await?;
        let id = task.id.clone();
        self.store.insert_task(task)?;
        Ok(id)
    }

    /// Flip a task's completion flag and return the confirmed value.
    pub async fn toggle_task(&mut self, id: &TaskId) -> SyncResult<bool> {
        let mut task = self.require_task(id)?;
        task.toggle(Utc::now());
        let confirmed = self
            .backend
            .update_todo(id, &TaskUpdate::completion(&task))
            .await?;
        let completed = confirmed.completed;
        self.store.update_task(confirmed)?;
        Ok(completed)
    }

    /// Send every editable field of `task`; a changed `list_id` moves it.
    pub async fn update_task(&mut self, task: Task) -> SyncResult<()> {
        self.require_task(&task.id)?;
        self.require_list(&task.list_id)?;
        let confirmed = self
            .backend
            .update_todo(&task.id, &TaskUpdate::full(&task))
            .await?;
        self.store.update_task(confirmed)?;
        Ok(())
    }

    pub async fn move_task(&mut self, id: &TaskId, to: &ListId) -> SyncResult<()> {
        let mut task = self.require_task(id)?;
        task.list_id = to.clone();
        self.update_task(task).await
    }

    pub async fn delete_task(&mut self, id: &TaskId) -> SyncResult<()> {
        self.require_task(id)?;
        self.backend.delete_todo(id).await?;
        self.store.delete_task(id)?;
        Ok(())
    }

    pub async fn fetch_report(&self, date: NaiveDate, kind: ReportKind) -> SyncResult<Report> {
        self.backend.get_report(date, kind).await
    }

    fn require_list(&self, id: &ListId) -> SyncResult<()> {
        if self.store.contains_list(id) {
            Ok(())
        } else {
            Err(StoreError::ListNotFound(id.clone()).into())
        }
    }

    fn require_task(&self, id: &TaskId) -> SyncResult<Task> {
        self.store
            .find_task(id)
            .cloned()
            .ok_or_else(|| StoreError::TaskNotFound(id.clone()).into())
    }
}
