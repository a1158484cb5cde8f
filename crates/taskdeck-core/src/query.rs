use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::datetime::{day_after, to_app_date};
use crate::task::{Priority, Task};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    CreatedAt,
    DueDate,
    Priority,
    Title,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub order: SortOrder,
}

/// Which list chip is active on the home screen. `List` ids are the
/// normalized form: lowercase, whitespace removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ListScope {
    #[default]
    All,
    Finished,
    List(String),
}

impl ListScope {
    fn keeps(&self, task: &Task) -> bool {
        match self {
            ListScope::All => true,
            ListScope::Finished => task.completed,
            ListScope::List(id) => normalized_category(task) == *id,
        }
    }
}

fn normalized_category(task: &Task) -> String {
    match &task.category {
        Some(category) => category.to_lowercase().split_whitespace().collect(),
        None => "default".to_string(),
    }
}

/// Structured home-screen filters; active fields AND-combine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub completed: Option<bool>,
    pub due_today: bool,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.priority.is_none()
            && self.completed.is_none()
            && !self.due_today
    }

    fn keeps(&self, task: &Task, today: NaiveDate) -> bool {
        if let Some(category) = &self.category
            && task.category.as_deref() != Some(category.as_str())
        {
            return false;
        }
        if let Some(priority) = self.priority
            && task.priority != priority
        {
            return false;
        }
        if let Some(completed) = self.completed
            && task.completed != completed
        {
            return false;
        }
        if self.due_today && task.due_date.map(to_app_date) != Some(today) {
            return false;
        }
        true
    }
}

/// Everything that drives what subset of tasks a list screen shows, and in
/// what order.
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub scope: ListScope,
    pub search: String,
    pub filters: Filters,
    pub sort: SortSpec,
}

/// Applies scope, search, and structured filters, then sorts. Pure; the
/// store's collection order is never touched.
pub fn select<'a>(tasks: &'a [Task], query: &TaskQuery, today: NaiveDate) -> Vec<&'a Task> {
    let mut picked: Vec<&Task> = tasks
        .iter()
        .filter(|task| query.scope.keeps(task))
        .filter(|task| matches_search(task, &query.search))
        .filter(|task| query.filters.keeps(task, today))
        .collect();

    picked.sort_by(|a, b| compare(a, b, query.sort));

    trace!(total = tasks.len(), kept = picked.len(), "selected tasks");
    picked
}

fn matches_search(task: &Task, search: &str) -> bool {
    if search.is_empty() {
        return true;
    }
    task.title.to_lowercase().contains(&search.to_lowercase())
}

/// Comparator behind every task listing. Tasks without a due date sink to
/// the end under either order; the order flag only flips the rest.
pub fn compare(a: &Task, b: &Task, sort: SortSpec) -> Ordering {
    if sort.key == SortKey::DueDate {
        match (a.due_date, b.due_date) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Greater,
            (Some(_), None) => return Ordering::Less,
            (Some(_), Some(_)) => {}
        }
    }

    let ascending = match sort.key {
        SortKey::Title => a.title.cmp(&b.title),
        SortKey::DueDate => a.due_date.cmp(&b.due_date),
        SortKey::Priority => a.priority.weight().cmp(&b.priority.weight()),
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
    };

    match sort.order {
        SortOrder::Asc => ascending,
        SortOrder::Desc => ascending.reverse(),
    }
}

/// Due-date relationship of a task to "today", date-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueBucket {
    Overdue,
    Today,
    Tomorrow,
    Upcoming,
    NoDueDate,
}

impl DueBucket {
    /// Fixed display order for the home screen.
    pub const ORDER: [DueBucket; 5] = [
        DueBucket::Overdue,
        DueBucket::Today,
        DueBucket::Tomorrow,
        DueBucket::Upcoming,
        DueBucket::NoDueDate,
    ];

    pub fn of(task: &Task, today: NaiveDate) -> Self {
        let Some(due) = task.due_date else {
            return DueBucket::NoDueDate;
        };

        let due = to_app_date(due);
        if due < today && !task.completed {
            DueBucket::Overdue
        } else if due == today {
            DueBucket::Today
        } else if due == day_after(today) {
            DueBucket::Tomorrow
        } else {
            // Also catches completed tasks whose due date already passed.
            DueBucket::Upcoming
        }
    }
}

/// The home-screen view: every selected task in exactly one bucket, each
/// bucket keeping the sort order.
#[derive(Debug, Default)]
pub struct GroupedTasks<'a> {
    pub overdue: Vec<&'a Task>,
    pub today: Vec<&'a Task>,
    pub tomorrow: Vec<&'a Task>,
    pub upcoming: Vec<&'a Task>,
    pub no_due_date: Vec<&'a Task>,
}

impl<'a> GroupedTasks<'a> {
    pub fn bucket(&self, bucket: DueBucket) -> &[&'a Task] {
        match bucket {
            DueBucket::Overdue => &self.overdue,
            DueBucket::Today => &self.today,
            DueBucket::Tomorrow => &self.tomorrow,
            DueBucket::Upcoming => &self.upcoming,
            DueBucket::NoDueDate => &self.no_due_date,
        }
    }

    pub fn len(&self) -> usize {
        DueBucket::ORDER
            .iter()
            .map(|bucket| self.bucket(*bucket).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Filter, sort, then partition by due date.
pub fn grouped<'a>(tasks: &'a [Task], query: &TaskQuery, today: NaiveDate) -> GroupedTasks<'a> {
    let mut view = GroupedTasks::default();
    for task in select(tasks, query, today) {
        match DueBucket::of(task, today) {
            DueBucket::Overdue => view.overdue.push(task),
            DueBucket::Today => view.today.push(task),
            DueBucket::Tomorrow => view.tomorrow.push(task),
            DueBucket::Upcoming => view.upcoming.push(task),
            DueBucket::NoDueDate => view.no_due_date.push(task),
        }
    }
    view
}

/// Calendar-screen selection: tasks whose due date falls on `date`.
pub fn due_on<'a>(tasks: &'a [Task], date: NaiveDate) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|task| task.due_date.map(to_app_date) == Some(date))
        .collect()
}

/// Dot color for one task on the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerColor {
    Green,
    Red,
    Orange,
    Yellow,
    Blue,
}

impl MarkerColor {
    pub fn of(task: &Task) -> Self {
        if task.completed {
            return MarkerColor::Green;
        }
        match task.priority {
            Priority::Urgent => MarkerColor::Red,
            Priority::High => MarkerColor::Orange,
            Priority::Medium => MarkerColor::Yellow,
            Priority::Low => MarkerColor::Blue,
        }
    }

    /// Hex values the mobile screens render.
    pub fn hex(self) -> &'static str {
        match self {
            MarkerColor::Green => "#34C759",
            MarkerColor::Red => "#FF3B30",
            MarkerColor::Orange => "#FF9500",
            MarkerColor::Yellow => "#FFCC02",
            MarkerColor::Blue => "#007AFF",
        }
    }
}

/// One dot per task for every date that has at least one due task. Display
/// annotation only.
pub fn calendar_markers(tasks: &[Task]) -> BTreeMap<NaiveDate, Vec<MarkerColor>> {
    let mut markers: BTreeMap<NaiveDate, Vec<MarkerColor>> = BTreeMap::new();
    for task in tasks {
        if let Some(due) = task.due_date {
            markers
                .entry(to_app_date(due))
                .or_default()
                .push(MarkerColor::of(task));
        }
    }
    markers
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

    use super::{
        DueBucket, Filters, ListScope, MarkerColor, SortKey, SortOrder, SortSpec, TaskQuery,
        calendar_markers, due_on, grouped, select,
    };
    use crate::task::{Priority, Task, TaskDraft};

    fn noon(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    fn task(title: &str) -> Task {
        Task::new(
            TaskDraft {
                title: title.to_string(),
                ..TaskDraft::default()
            },
            noon(2026, 8, 1),
        )
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 4).unwrap()
    }

    fn titles(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|t| t.title.clone()).collect()
    }

    #[test]
    fn priority_sort_puts_urgent_first_under_desc() {
        let mut tasks = vec![task("a"), task("b"), task("c"), task("d")];
        tasks[0].priority = Priority::Urgent;
        tasks[1].priority = Priority::Low;
        tasks[2].priority = Priority::High;
        tasks[3].priority = Priority::Medium;

        let query = TaskQuery {
            sort: SortSpec {
                key: SortKey::Priority,
                order: SortOrder::Desc,
            },
            ..TaskQuery::default()
        };
        let picked = select(&tasks, &query, today());
        assert_eq!(titles(&picked), vec!["a", "c", "d", "b"]);

        let query = TaskQuery {
            sort: SortSpec {
                key: SortKey::Priority,
                order: SortOrder::Asc,
            },
            ..TaskQuery::default()
        };
        let picked = select(&tasks, &query, today());
        assert_eq!(titles(&picked), vec!["b", "d", "c", "a"]);
    }

    #[test]
    fn equal_sort_keys_keep_collection_order() {
        let mut tasks = vec![task("first"), task("second"), task("third")];
        for t in &mut tasks {
            t.priority = Priority::Medium;
        }

        let query = TaskQuery {
            sort: SortSpec {
                key: SortKey::Priority,
                order: SortOrder::Desc,
            },
            ..TaskQuery::default()
        };
        assert_eq!(
            titles(&select(&tasks, &query, today())),
            vec!["first", "second", "third"]
        );
    }

    #[test]
    fn missing_due_date_sorts_last_in_either_order() {
        let mut with_due = task("A");
        with_due.priority = Priority::Low;
        with_due.due_date = Some(noon(2026, 8, 5));
        let mut without_due = task("B");
        without_due.priority = Priority::Urgent;

        let tasks = vec![without_due, with_due];
        for order in [SortOrder::Desc, SortOrder::Asc] {
            let query = TaskQuery {
                sort: SortSpec {
                    key: SortKey::DueDate,
                    order,
                },
                ..TaskQuery::default()
            };
            assert_eq!(titles(&select(&tasks, &query, today())), vec!["A", "B"]);
        }
    }

    #[test]
    fn created_at_defaults_to_newest_first() {
        let mut older = task("older");
        older.created_at = noon(2026, 8, 1);
        let mut newer = task("newer");
        newer.created_at = noon(2026, 8, 3);

        let tasks = vec![older, newer];
        let picked = select(&tasks, &TaskQuery::default(), today());
        assert_eq!(titles(&picked), vec!["newer", "older"]);
    }

    #[test]
    fn search_and_completion_filter_combine() {
        let mut a = task("Call mom");
        a.completed = false;
        let mut b = task("Call mom");
        b.completed = true;
        let mut c = task("Buy milk");
        c.completed = false;

        let query = TaskQuery {
            search: "mom".to_string(),
            filters: Filters {
                completed: Some(false),
                ..Filters::default()
            },
            ..TaskQuery::default()
        };
        let tasks = [a, b, c];
        let picked = select(&tasks, &query, today());
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].title, "Call mom");
        assert!(!picked[0].completed);
    }

    #[test]
    fn due_today_filter_compares_dates_only() {
        let mut due_today = task("due today");
        due_today.due_date = Some(Utc.with_ymd_and_hms(2026, 8, 4, 23, 30, 0).unwrap());
        let mut due_tomorrow = task("due tomorrow");
        due_tomorrow.due_date = Some(noon(2026, 8, 5));
        let undated = task("undated");

        let query = TaskQuery {
            filters: Filters {
                due_today: true,
                ..Filters::default()
            },
            ..TaskQuery::default()
        };
        let tasks = [due_today, due_tomorrow, undated];
        let picked = select(&tasks, &query, today());
        assert_eq!(titles(&picked), vec!["due today"]);
    }

    #[test]
    fn list_scope_normalizes_categories() {
        let mut homework = task("essay");
        homework.category = Some("Home Work".to_string());
        let uncategorized = task("loose end");
        let mut done = task("shipped");
        done.completed = true;

        let tasks = vec![homework, uncategorized, done];

        let query = TaskQuery {
            scope: ListScope::List("homework".to_string()),
            ..TaskQuery::default()
        };
        assert_eq!(titles(&select(&tasks, &query, today())), vec!["essay"]);

        let query = TaskQuery {
            scope: ListScope::List("default".to_string()),
            ..TaskQuery::default()
        };
        assert_eq!(titles(&select(&tasks, &query, today())), vec!["loose end"]);

        let query = TaskQuery {
            scope: ListScope::Finished,
            ..TaskQuery::default()
        };
        assert_eq!(titles(&select(&tasks, &query, today())), vec!["shipped"]);
    }

    #[test]
    fn grouping_covers_every_task_exactly_once() {
        let mut overdue = task("overdue");
        overdue.due_date = Some(noon(2026, 8, 2));
        let mut done_past_due = task("done past due");
        done_past_due.due_date = Some(noon(2026, 8, 2));
        done_past_due.completed = true;
        let mut due_today = task("today");
        due_today.due_date = Some(noon(2026, 8, 4));
        let mut due_tomorrow = task("tomorrow");
        due_tomorrow.due_date = Some(noon(2026, 8, 5));
        let mut later = task("later");
        later.due_date = Some(noon(2026, 8, 20));
        let undated = task("undated");

        let tasks = vec![
            overdue,
            done_past_due,
            due_today,
            due_tomorrow,
            later,
            undated,
        ];
        let view = grouped(&tasks, &TaskQuery::default(), today());

        assert_eq!(titles(&view.overdue), vec!["overdue"]);
        assert_eq!(titles(&view.today), vec!["today"]);
        assert_eq!(titles(&view.tomorrow), vec!["tomorrow"]);
        // A completed task with a past due date falls through to upcoming.
        assert_eq!(titles(&view.upcoming), vec!["done past due", "later"]);
        assert_eq!(titles(&view.no_due_date), vec!["undated"]);
        assert_eq!(view.len(), tasks.len());
    }

    #[test]
    fn midnight_due_today_is_never_overdue() {
        let mut t = task("midnight");
        t.due_date = Some(Utc.with_ymd_and_hms(2026, 8, 4, 0, 0, 0).unwrap());
        assert_eq!(DueBucket::of(&t, today()), DueBucket::Today);
    }

    #[test]
    fn calendar_selection_and_markers() {
        let mut urgent = task("urgent errand");
        urgent.priority = Priority::Urgent;
        urgent.due_date = Some(noon(2026, 8, 4));
        let mut done = task("done errand");
        done.completed = true;
        done.due_date = Some(Utc.with_ymd_and_hms(2026, 8, 4, 18, 0, 0).unwrap());
        let mut other_day = task("other day");
        other_day.due_date = Some(noon(2026, 8, 9));
        let undated = task("undated");

        let tasks = vec![urgent, done, other_day, undated];

        let on_fourth = due_on(&tasks, today());
        assert_eq!(titles(&on_fourth), vec!["urgent errand", "done errand"]);

        let markers = calendar_markers(&tasks);
        assert_eq!(markers.len(), 2);
        assert_eq!(
            markers[&today()],
            vec![MarkerColor::Red, MarkerColor::Green]
        );
        assert_eq!(MarkerColor::Red.hex(), "#FF3B30");

        // Tasks due after the window still mark their own date, and only
        // dated tasks mark anything.
        let ninth = NaiveDate::from_ymd_opt(2026, 8, 9).unwrap();
        assert_eq!(markers[&ninth], vec![MarkerColor::Yellow]);
    }

    #[test]
    fn overdue_wins_over_calendar_proximity() {
        let mut t = task("yesterday");
        t.due_date = Some(noon(2026, 8, 3) - Duration::hours(1));
        assert_eq!(DueBucket::of(&t, today()), DueBucket::Overdue);
    }
}
