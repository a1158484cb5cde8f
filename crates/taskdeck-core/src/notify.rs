use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

/// Reminders fire this many minutes before the task's due date.
pub const REMINDER_LEAD_MINUTES: i64 = 30;

/// The external reminder service, seen from the store. Calls are
/// fire-and-forget: the store logs failures and never blocks a mutation on
/// them.
pub trait Notifier {
    /// Requests a reminder for a task due at `due`. Returns the scheduled
    /// handle, or `None` when the fire time (lead subtracted) is not
    /// strictly in the future.
    fn schedule(
        &self,
        task_id: Uuid,
        title: &str,
        body: &str,
        due: DateTime<Utc>,
    ) -> anyhow::Result<Option<String>>;

    /// Cancels whatever reminder is pending for the task, if any.
    fn cancel(&self, task_id: Uuid) -> anyhow::Result<()>;
}

impl<N: Notifier + ?Sized> Notifier for Rc<N> {
    fn schedule(
        &self,
        task_id: Uuid,
        title: &str,
        body: &str,
        due: DateTime<Utc>,
    ) -> anyhow::Result<Option<String>> {
        (**self).schedule(task_id, title, body, due)
    }

    fn cancel(&self, task_id: Uuid) -> anyhow::Result<()> {
        (**self).cancel(task_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledReminder {
    pub handle: String,
    pub title: String,
    pub body: String,
    pub fire_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderEvent {
    Scheduled { task_id: Uuid, handle: String },
    Declined { task_id: Uuid },
    Cancelled { task_id: Uuid },
}

/// In-memory notifier: the scheduling contract without a platform behind
/// it. Embedding shells swap in the real notification service; tests and
/// previews inspect the pending set and the event log.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    scheduled: RefCell<BTreeMap<Uuid, ScheduledReminder>>,
    events: RefCell<Vec<ReminderEvent>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheduled_for(&self, task_id: Uuid) -> Option<ScheduledReminder> {
        self.scheduled.borrow().get(&task_id).cloned()
    }

    pub fn scheduled_count(&self) -> usize {
        self.scheduled.borrow().len()
    }

    pub fn events(&self) -> Vec<ReminderEvent> {
        self.events.borrow().clone()
    }
}

impl Notifier for MemoryNotifier {
    fn schedule(
        &self,
        task_id: Uuid,
        title: &str,
        body: &str,
        due: DateTime<Utc>,
    ) -> anyhow::Result<Option<String>> {
        let fire_at = due - Duration::minutes(REMINDER_LEAD_MINUTES);
        if fire_at <= Utc::now() {
            info!(%task_id, fire_at = %fire_at, "declining reminder with past fire time");
            self.events
                .borrow_mut()
                .push(ReminderEvent::Declined { task_id });
            return Ok(None);
        }

        let handle = format!("task-{task_id}");
        self.scheduled.borrow_mut().insert(
            task_id,
            ScheduledReminder {
                handle: handle.clone(),
                title: format!("Task Due Soon: {title}"),
                body: body.to_string(),
                fire_at,
            },
        );
        self.events.borrow_mut().push(ReminderEvent::Scheduled {
            task_id,
            handle: handle.clone(),
        });
        debug!(%task_id, handle = %handle, fire_at = %fire_at, "scheduled reminder");
        Ok(Some(handle))
    }

    fn cancel(&self, task_id: Uuid) -> anyhow::Result<()> {
        let removed = self.scheduled.borrow_mut().remove(&task_id);
        debug!(%task_id, was_pending = removed.is_some(), "cancelled reminder");
        self.events
            .borrow_mut()
            .push(ReminderEvent::Cancelled { task_id });
        Ok(())
    }
}
