//! In-memory owner of every list and task.
//!
//! All writes go through the methods on [`Store`], which keep these invariants:
//! - list ids are unique, task ids are unique across all lists;
//! - every task's `list_id` names the list that holds it;
//! - the active selection is either `None` or the id of a list in the store.
//!
//! A mutation that fails leaves the store untouched.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::list::{ListId, TodoList};
use super::report::{self, ReportRange};
use super::task::{Task, TaskId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("list {0} not found")]
    ListNotFound(ListId),
    #[error("task {0} not found")]
    TaskNotFound(TaskId),
    #[error("list {0} already exists")]
    DuplicateList(ListId),
    #[error("task {0} already exists")]
    DuplicateTask(TaskId),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoreSnapshot")]
pub struct Store {
    lists: Vec<TodoList>,
    active: Option<ListId>,
}

/// Serialized form of a [`Store`]. Deserializing goes through
/// [`Store::from_lists`] so a hand-edited or stale snapshot is repaired.
#[derive(Deserialize)]
struct StoreSnapshot {
    #[serde(default)]
    lists: Vec<TodoList>,
    #[serde(default)]
    active: Option<ListId>,
}

impl From<StoreSnapshot> for Store {
    fn from(snapshot: StoreSnapshot) -> Self {
        let mut store = Self::from_lists(snapshot.lists);
        store.active = match snapshot.active {
            Some(id) if store.contains_list(&id) => Some(id),
            Some(id) => {
                log::warn!("Dropping stale active list {}", id);
                None
            }
            None => None,
        };
        store
    }
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a snapshot, repairing it so the invariants hold.
    /// The first list becomes active.
    pub fn from_lists(lists: Vec<TodoList>) -> Self {
        let mut seen_lists = HashSet::new();
        let mut seen_tasks = HashSet::new();
        let mut kept = Vec::with_capacity(lists.len());

        for mut list in lists {
            if !seen_lists.insert(list.id.clone()) {
                log::warn!("Dropping duplicate list {}", list.id);
                continue;
            }
            list.tasks.retain(|t| {
                let fresh = seen_tasks.insert(t.id.clone());
                if !fresh {
                    log::warn!("Dropping duplicate task {}", t.id);
                }
                fresh
            });
            for task in &mut list.tasks {
                task.list_id = list.id.clone();
            }
            kept.push(list);
        }

        let active = kept.first().map(|l| l.id.clone());
        Self {
            lists: kept,
            active,
        }
    }

    /// Group a flat task set under its lists, as returned by the lists and
    /// todos resources. Tasks naming an unknown list are dropped.
    pub fn assemble(lists: Vec<TodoList>, tasks: Vec<Task>) -> Self {
        let mut store = Self::from_lists(lists);
        for task in tasks {
            if let Err(e) = store.insert_task(task) {
                log::warn!("Skipping task while assembling store: {}", e);
            }
        }
        store
    }

    pub fn lists(&self) -> &[TodoList] {
        &self.lists
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    pub fn find_list(&self, id: &ListId) -> Option<&TodoList> {
        self.lists.iter().find(|l| &l.id == id)
    }

    fn list_mut(&mut self, id: &ListId) -> Option<&mut TodoList> {
        self.lists.iter_mut().find(|l| &l.id == id)
    }

    pub fn contains_list(&self, id: &ListId) -> bool {
        self.find_list(id).is_some()
    }

    pub fn find_task(&self, id: &TaskId) -> Option<&Task> {
        self.lists.iter().find_map(|l| l.task(id))
    }

    fn task_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.lists.iter_mut().find_map(|l| l.task_mut(id))
    }

    /// Every task, in list order and then task order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.lists.iter().flat_map(|l| l.tasks.iter())
    }

    pub fn task_count(&self) -> usize {
        self.lists.iter().map(|l| l.tasks.len()).sum()
    }

    pub fn active_list_id(&self) -> Option<&ListId> {
        self.active.as_ref()
    }

    pub fn active_list(&self) -> Option<&TodoList> {
        self.active.as_ref().and_then(|id| self.find_list(id))
    }

    pub fn set_active_list(&mut self, id: &ListId) -> StoreResult<()> {
        if !self.contains_list(id) {
            return Err(StoreError::ListNotFound(id.clone()));
        }
        self.active = Some(id.clone());
        Ok(())
    }

    pub fn clear_active_list(&mut self) {
        self.active = None;
    }

    /// Append a new empty list. The caller is expected to have trimmed and
    /// checked `name`.
    pub fn create_list(&mut self, name: impl Into<String>) -> ListId {
        let mut id = ListId::generate();
        while self.contains_list(&id) {
            id = ListId::generate();
        }
        let list = TodoList::with_id(id.clone(), name);
        log::debug!("Created list {}", id);
        self.push_list(list);
        id
    }

    /// Insert a list whose id was assigned elsewhere (e.g. by the remote API).
    pub fn insert_list(&mut self, list: TodoList) -> StoreResult<()> {
        if self.contains_list(&list.id) {
            return Err(StoreError::DuplicateList(list.id));
        }
        let mut seen = HashSet::new();
        if let Some(task) = list
            .tasks
            .iter()
            .find(|t| !seen.insert(&t.id) || self.find_task(&t.id).is_some())
        {
            return Err(StoreError::DuplicateTask(task.id.clone()));
        }
        let mut list = list;
        for task in &mut list.tasks {
            task.list_id = list.id.clone();
        }
        self.push_list(list);
        Ok(())
    }

    fn push_list(&mut self, list: TodoList) {
        if self.active.is_none() {
            self.active = Some(list.id.clone());
        }
        self.lists.push(list);
    }

    pub fn rename_list(&mut self, id: &ListId, name: impl Into<String>) -> StoreResult<()> {
        let list = self
            .list_mut(id)
            .ok_or_else(|| StoreError::ListNotFound(id.clone()))?;
        list.name = name.into();
        log::debug!("Renamed list {}", id);
        Ok(())
    }

    /// Remove a list and every task in it. If it was active, the first
    /// remaining list becomes active, or nothing when none remain.
    pub fn delete_list(&mut self, id: &ListId) -> StoreResult<TodoList> {
        let pos = self
            .lists
            .iter()
            .position(|l| &l.id == id)
            .ok_or_else(|| StoreError::ListNotFound(id.clone()))?;
        let removed = self.lists.remove(pos);

        if self.active.as_ref() == Some(id) {
            self.active = self.lists.first().map(|l| l.id.clone());
        }
        log::debug!(
            "Deleted list {} with {} task(s)",
            id,
            removed.tasks.len()
        );
        Ok(removed)
    }

    /// Append a new pending task to a list.
    pub fn add_task(&mut self, list_id: &ListId, text: impl Into<String>) -> StoreResult<TaskId> {
        if !self.contains_list(list_id) {
            return Err(StoreError::ListNotFound(list_id.clone()));
        }
        let mut task = Task::new(list_id.clone(), text);
        while self.find_task(&task.id).is_some() {
            task.id = TaskId::generate();
        }
        let id = task.id.clone();
        self.insert_task(task)?;
        Ok(id)
    }

    /// Append a task whose id was assigned elsewhere to the list named by its
    /// `list_id`.
    pub fn insert_task(&mut self, task: Task) -> StoreResult<()> {
        if self.find_task(&task.id).is_some() {
            return Err(StoreError::DuplicateTask(task.id));
        }
        let list = self
            .list_mut(&task.list_id)
            .ok_or_else(|| StoreError::ListNotFound(task.list_id.clone()))?;
        log::debug!("Added task {} to list {}", task.id, list.id);
        list.tasks.push(task);
        Ok(())
    }

    pub fn toggle_task(&mut self, id: &TaskId) -> StoreResult<bool> {
        self.toggle_task_at(id, Utc::now())
    }

    /// Invert a task's completion flag and return the new value.
    pub fn toggle_task_at(&mut self, id: &TaskId, now: DateTime<Utc>) -> StoreResult<bool> {
        let task = self
            .task_mut(id)
            .ok_or_else(|| StoreError::TaskNotFound(id.clone()))?;
        task.toggle(now);
        Ok(task.completed)
    }

    pub fn update_task(&mut self, task: Task) -> StoreResult<()> {
        self.update_task_at(task, Utc::now())
    }

    /// Replace a task with `task`. When `task.list_id` names a different list
    /// the task moves there and is appended to the end; otherwise it keeps its
    /// position.
    pub fn update_task_at(&mut self, mut task: Task, now: DateTime<Utc>) -> StoreResult<()> {
        let (from, pos) = self
            .lists
            .iter()
            .enumerate()
            .find_map(|(i, l)| l.position(&task.id).map(|p| (i, p)))
            .ok_or_else(|| StoreError::TaskNotFound(task.id.clone()))?;
        let to = self
            .lists
            .iter()
            .position(|l| l.id == task.list_id)
            .ok_or_else(|| StoreError::ListNotFound(task.list_id.clone()))?;

        let previous = &self.lists[from].tasks[pos];
        if task.completed && !previous.completed {
            task.completed_at = task.completed_at.or(Some(now));
        } else if task.completed && previous.completed {
            task.completed_at = task.completed_at.or(previous.completed_at);
        } else if !task.completed {
            task.completed_at = None;
        }

        if from == to {
            self.lists[from].tasks[pos] = task;
        } else {
            log::debug!(
                "Moving task {} from list {} to {}",
                task.id,
                self.lists[from].id,
                self.lists[to].id
            );
            self.lists[from].tasks.remove(pos);
            self.lists[to].tasks.push(task);
        }
        Ok(())
    }

    /// Move a task to the end of another list, leaving its other fields alone.
    pub fn move_task(&mut self, id: &TaskId, to: &ListId) -> StoreResult<()> {
        let mut task = self
            .find_task(id)
            .cloned()
            .ok_or_else(|| StoreError::TaskNotFound(id.clone()))?;
        task.list_id = to.clone();
        self.update_task(task)
    }

    /// Remove a task from whichever list holds it.
    pub fn delete_task(&mut self, id: &TaskId) -> StoreResult<Task> {
        for list in &mut self.lists {
            if let Some(pos) = list.position(id) {
                log::debug!("Deleted task {} from list {}", id, list.id);
                return Ok(list.tasks.remove(pos));
            }
        }
        Err(StoreError::TaskNotFound(id.clone()))
    }

    /// Tasks whose completion day falls inside `[start, end]`.
    pub fn tasks_completed_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<Task> {
        report::tasks_completed_in_range(self.tasks(), ReportRange { start, end })
    }
}
