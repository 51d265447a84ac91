// Aggregate statistics derived from the full task collection

use crate::models::{Priority, Task};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Task counts per priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriorityBreakdown {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl PriorityBreakdown {
    pub fn count(&self, priority: Priority) -> usize {
        match priority {
            Priority::Low => self.low,
            Priority::Medium => self.medium,
            Priority::High => self.high,
        }
    }

    /// Whole-percentage share of `total`, 0 for an empty collection
    pub fn share(&self, priority: Priority, total: usize) -> u32 {
        percentage(self.count(priority), total)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    pub overdue: usize,
    pub high_priority: usize,
    /// Completed share as a whole percentage, rounded half up; 0 for an empty collection
    pub completion_rate: u32,
    pub by_priority: PriorityBreakdown,
}

impl Stats {
    pub fn compute(tasks: &[Task], now: DateTime<Utc>) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|t| t.completed).count();
        let overdue = tasks.iter().filter(|t| t.is_overdue(now)).count();

        let mut by_priority = PriorityBreakdown::default();
        for task in tasks {
            match task.priority {
                Priority::Low => by_priority.low += 1,
                Priority::Medium => by_priority.medium += 1,
                Priority::High => by_priority.high += 1,
            }
        }

        Self {
            total,
            completed,
            active: total - completed,
            overdue,
            high_priority: by_priority.high,
            completion_rate: percentage(completed, total),
            by_priority,
        }
    }
}

fn percentage(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    // round(100 * part / total) in integer arithmetic
    ((200 * part + total) / (2 * total)) as u32
}
