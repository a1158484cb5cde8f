use std::collections::BTreeMap;

use serde::Serialize;

use crate::task::{Priority, Task};

/// Aggregates the stats screen reads off the full collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    /// Percentage, 0 for an empty collection.
    pub completion_rate: f64,
    pub by_priority: BTreeMap<Priority, usize>,
    pub by_category: BTreeMap<String, usize>,
}

impl TaskStats {
    pub fn collect(tasks: &[Task]) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|t| t.completed).count();
        let active = total - completed;
        let completion_rate = if total > 0 {
            completed as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        let mut by_priority = BTreeMap::new();
        let mut by_category = BTreeMap::new();
        for task in tasks {
            *by_priority.entry(task.priority).or_insert(0) += 1;
            let category = task
                .category
                .clone()
                .unwrap_or_else(|| "default".to_string());
            *by_category.entry(category).or_insert(0) += 1;
        }

        Self {
            total,
            completed,
            active,
            completion_rate,
            by_priority,
            by_category,
        }
    }
}
