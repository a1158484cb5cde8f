use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// Total order used by sorting and calendar markers: urgent > high > medium > low.
    pub fn weight(self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
            Priority::Urgent => 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Subtask {
    pub fn new(title: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            completed: false,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub text: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(text: String, author: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            author,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub enabled: bool,

    /// Time-of-day the form screen collects; scheduling itself keys off the
    /// task's due date.
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,

    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Label from the store's category set. Soft reference; nothing at this
    /// layer rejects a label the set does not contain.
    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub completed: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub subtasks: Vec<Subtask>,

    #[serde(default)]
    pub comments: Vec<Comment>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub reminder: Option<Reminder>,

    /// Handle of the reminder currently scheduled with the notifier.
    /// Bookkeeping owned by the store: non-`None` only while a reminder is
    /// actually live.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<String>,
}

impl Task {
    pub fn new(draft: TaskDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: draft.title,
            description: draft.description,
            category: draft.category,
            priority: draft.priority,
            due_date: draft.due_date,
            completed: false,
            created_at: now,
            updated_at: now,
            subtasks: draft.subtasks,
            comments: vec![],
            tags: draft.tags,
            reminder: draft.reminder,
            notification_id: None,
        }
    }

    /// Upgrade for the oldest stored format, a bare title string.
    pub fn from_legacy_title(title: String, now: DateTime<Utc>) -> Self {
        Self::new(
            TaskDraft {
                title,
                ..TaskDraft::default()
            },
            now,
        )
    }

    /// True when a reminder should be live for this task.
    pub fn wants_reminder(&self) -> bool {
        !self.completed
            && self.due_date.is_some()
            && self.reminder.as_ref().is_some_and(|r| r.enabled)
    }
}

/// Creation input for `TaskStore::add_task`. The store takes the title as
/// given; validating it is the caller's job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub reminder: Option<Reminder>,
    pub subtasks: Vec<Subtask>,
}

/// Partial update for `TaskStore::update_task`. `None` leaves a field
/// unchanged; for fields that are themselves optional, the inner option
/// distinguishes "set" from "clear".
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub completed: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub reminder: Option<Option<Reminder>>,
}

impl TaskPatch {
    pub(crate) fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(category) = &self.category {
            task.category = category.clone();
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(tags) = &self.tags {
            task.tags = tags.clone();
        }
        if let Some(reminder) = &self.reminder {
            task.reminder = reminder.clone();
        }
    }
}
