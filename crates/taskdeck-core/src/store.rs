use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::datetime;
use crate::notify::Notifier;
use crate::query::{self, Filters, GroupedTasks, ListScope, MarkerColor, SortSpec, TaskQuery};
use crate::stats::TaskStats;
use crate::storage::{self, Storage, TASKS_KEY};
use crate::task::{Comment, Subtask, Task, TaskDraft, TaskPatch};

/// Category seed used when no configuration supplies one.
pub const DEFAULT_CATEGORIES: [&str; 5] = ["Personal", "Work", "Study", "Health", "Shopping"];

/// Sole owner of the task collection, the category set, and the transient
/// query state behind the list screens. Every mutation leaves the
/// collection consistent, mirrors it to storage, and keeps reminder
/// scheduling in sync with due date, reminder, and completion state.
///
/// Missing ids are absorbed as no-ops: the UI only hands back tasks it got
/// from here, so there is no error path to surface.
pub struct TaskStore {
    tasks: Vec<Task>,
    categories: Vec<String>,
    search_query: String,
    sort: SortSpec,
    filters: Filters,
    storage: Box<dyn Storage>,
    notifier: Box<dyn Notifier>,
}

impl TaskStore {
    /// Loads the persisted collection once. An unreadable payload is
    /// logged and replaced with an empty list; the store must always come
    /// up.
    #[instrument(skip_all)]
    pub fn open(storage: Box<dyn Storage>, notifier: Box<dyn Notifier>) -> Self {
        let categories = DEFAULT_CATEGORIES.map(String::from).to_vec();
        Self::open_with_categories(storage, notifier, categories)
    }

    #[instrument(skip_all)]
    pub fn open_with_categories(
        storage: Box<dyn Storage>,
        notifier: Box<dyn Notifier>,
        categories: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        let tasks = match storage.load(TASKS_KEY) {
            Ok(Some(payload)) => match storage::decode_tasks(&payload, now) {
                Ok(tasks) => tasks,
                Err(err) => {
                    warn!(error = %err, "stored tasks unreadable; starting empty");
                    vec![]
                }
            },
            Ok(None) => vec![],
            Err(err) => {
                warn!(error = %err, "failed to load tasks; starting empty");
                vec![]
            }
        };

        info!(count = tasks.len(), "opened task store");
        Self {
            tasks,
            categories,
            search_query: String::new(),
            sort: SortSpec::default(),
            filters: Filters::default(),
            storage,
            notifier,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn sort(&self) -> SortSpec {
        self.sort
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    /// Creates a task from the draft and inserts it at the front of the
    /// collection; display order is the query engine's concern. Caller-
    /// supplied subtasks are kept as-is.
    #[instrument(skip(self, draft))]
    pub fn add_task(&mut self, draft: TaskDraft) -> Task {
        let task = Task::new(draft, Utc::now());
        info!(id = %task.id, title = %task.title, "adding task");
        self.tasks.insert(0, task.clone());
        self.persist();
        task
    }

    /// Merges the patch into the task and refreshes `updated_at`. Any
    /// previously scheduled reminder is cancelled and its handle cleared;
    /// a new one is requested when the merged record still wants one.
    #[instrument(skip(self, patch))]
    pub fn update_task(&mut self, id: Uuid, patch: TaskPatch) {
        let Some(idx) = self.tasks.iter().position(|t| t.id == id) else {
            debug!(%id, "update for unknown task ignored");
            return;
        };

        if let Some(handle) = self.tasks[idx].notification_id.take() {
            self.cancel_reminder(id, &handle);
        }

        let task = &mut self.tasks[idx];
        patch.apply_to(task);
        task.updated_at = Utc::now();

        if self.tasks[idx].wants_reminder() {
            self.schedule_reminder(idx);
        }

        self.persist();
    }

    /// Removes the task. A live reminder is cancelled while the record
    /// still exists, so the notifier sees the id before it is forgotten.
    #[instrument(skip(self))]
    pub fn delete_task(&mut self, id: Uuid) {
        let Some(idx) = self.tasks.iter().position(|t| t.id == id) else {
            debug!(%id, "delete for unknown task ignored");
            return;
        };

        if let Some(handle) = self.tasks[idx].notification_id.clone() {
            self.cancel_reminder(id, &handle);
        }

        let removed = self.tasks.remove(idx);
        info!(id = %removed.id, title = %removed.title, "deleted task");
        self.persist();
    }

    /// Flips completion. Completing cancels any pending reminder;
    /// reopening re-schedules one when the due date is still ahead and the
    /// reminder is enabled.
    #[instrument(skip(self))]
    pub fn toggle_complete(&mut self, id: Uuid) {
        let Some(idx) = self.tasks.iter().position(|t| t.id == id) else {
            debug!(%id, "toggle for unknown task ignored");
            return;
        };

        let now = Utc::now();
        self.tasks[idx].completed = !self.tasks[idx].completed;
        self.tasks[idx].updated_at = now;

        if self.tasks[idx].completed {
            if let Some(handle) = self.tasks[idx].notification_id.take() {
                self.cancel_reminder(id, &handle);
            }
        } else {
            let task = &self.tasks[idx];
            let due_ahead = task.due_date.is_some_and(|due| due > now);
            let reminder_on = task.reminder.as_ref().is_some_and(|r| r.enabled);
            if due_ahead && reminder_on {
                self.schedule_reminder(idx);
            }
        }

        self.persist();
    }

    #[instrument(skip(self, title))]
    pub fn add_subtask(&mut self, task_id: Uuid, title: String) {
        let now = Utc::now();
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) else {
            debug!(%task_id, "subtask add for unknown task ignored");
            return;
        };

        task.subtasks.push(Subtask::new(title, now));
        task.updated_at = now;
        self.persist();
    }

    #[instrument(skip(self))]
    pub fn toggle_subtask(&mut self, task_id: Uuid, subtask_id: Uuid) {
        let now = Utc::now();
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) else {
            debug!(%task_id, "subtask toggle for unknown task ignored");
            return;
        };
        let Some(subtask) = task.subtasks.iter_mut().find(|s| s.id == subtask_id) else {
            debug!(%task_id, %subtask_id, "toggle for unknown subtask ignored");
            return;
        };

        subtask.completed = !subtask.completed;
        task.updated_at = now;
        self.persist();
    }

    #[instrument(skip(self, text, author))]
    pub fn add_comment(&mut self, task_id: Uuid, text: String, author: String) {
        let now = Utc::now();
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) else {
            debug!(%task_id, "comment for unknown task ignored");
            return;
        };

        task.comments.push(Comment::new(text, author, now));
        task.updated_at = now;
        self.persist();
    }

    /// Appends a category unless an identical label already exists.
    #[instrument(skip(self))]
    pub fn add_category(&mut self, name: String) {
        if self.categories.contains(&name) {
            debug!(category = %name, "category already present");
            return;
        }
        self.categories.push(name);
    }

    /// Moves a task to a new position in the collection (drag-and-drop
    /// reordering). Out-of-range indices are ignored.
    #[instrument(skip(self))]
    pub fn reorder_tasks(&mut self, from: usize, to: usize) {
        if from >= self.tasks.len() || to >= self.tasks.len() {
            debug!(from, to, len = self.tasks.len(), "reorder out of range ignored");
            return;
        }

        let task = self.tasks.remove(from);
        self.tasks.insert(to, task);
        self.persist();
    }

    /// Applies a handle that resolved after the triggering mutation
    /// returned. The task may have been deleted in the meantime; the
    /// handle is then dropped.
    #[instrument(skip(self))]
    pub fn apply_reminder_handle(&mut self, task_id: Uuid, handle: String) {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) else {
            debug!(%task_id, handle = %handle, "reminder resolved for a task that no longer exists");
            return;
        };

        task.notification_id = Some(handle);
        self.persist();
    }

    pub fn set_search_query(&mut self, query: String) {
        self.search_query = query;
    }

    pub fn set_sort(&mut self, sort: SortSpec) {
        self.sort = sort;
    }

    pub fn set_filters(&mut self, filters: Filters) {
        self.filters = filters;
    }

    /// Home-screen view for the given list chip, grouped by due date.
    pub fn home_view(&self, scope: ListScope) -> GroupedTasks<'_> {
        let query = TaskQuery {
            scope,
            search: self.search_query.clone(),
            filters: self.filters.clone(),
            sort: self.sort,
        };
        query::grouped(&self.tasks, &query, datetime::today(Utc::now()))
    }

    /// Calendar-screen selection for one date.
    pub fn calendar_view(&self, date: NaiveDate) -> Vec<&Task> {
        query::due_on(&self.tasks, date)
    }

    pub fn calendar_markers(&self) -> BTreeMap<NaiveDate, Vec<MarkerColor>> {
        query::calendar_markers(&self.tasks)
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats::collect(&self.tasks)
    }

    fn schedule_reminder(&mut self, idx: usize) {
        let task = &self.tasks[idx];
        let Some(due) = task.due_date else {
            return;
        };
        let task_id = task.id;
        let title = task.title.clone();
        let body = task
            .description
            .clone()
            .unwrap_or_else(|| "Task due soon!".to_string());

        match self.notifier.schedule(task_id, &title, &body, due) {
            Ok(Some(handle)) => {
                debug!(id = %task_id, handle = %handle, "reminder scheduled");
                self.tasks[idx].notification_id = Some(handle);
            }
            Ok(None) => debug!(id = %task_id, "notifier declined reminder"),
            Err(err) => warn!(id = %task_id, error = %err, "failed to schedule reminder"),
        }
    }

    fn cancel_reminder(&self, id: Uuid, handle: &str) {
        debug!(%id, handle, "cancelling reminder");
        if let Err(err) = self.notifier.cancel(id) {
            warn!(%id, error = %err, "failed to cancel reminder");
        }
    }

    /// Mirrors the collection to storage. In-memory state stays
    /// authoritative; a failed save is logged, never propagated.
    fn persist(&self) {
        let payload = match storage::encode_tasks(&self.tasks) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "failed to encode tasks");
                return;
            }
        };
        if let Err(err) = self.storage.save(TASKS_KEY, &payload) {
            warn!(error = %err, "failed to save tasks");
        }
    }
}
