// View filtering for tasks

use crate::models::{Priority, Task};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Completion status criterion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    Active,
    Completed,
    /// Also absorbs any unrecognized value
    #[default]
    #[serde(other)]
    All,
}

impl StatusFilter {
    pub fn matches(self, completed: bool) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => !completed,
            StatusFilter::Completed => completed,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "active" => StatusFilter::Active,
            "completed" => StatusFilter::Completed,
            _ => StatusFilter::All,
        })
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::Active => write!(f, "active"),
            StatusFilter::Completed => write!(f, "completed"),
            StatusFilter::All => write!(f, "all"),
        }
    }
}

/// Priority criterion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityFilter {
    Low,
    Medium,
    High,
    /// Also absorbs any unrecognized value
    #[default]
    #[serde(other)]
    All,
}

impl PriorityFilter {
    pub fn matches(self, priority: Priority) -> bool {
        match self {
            PriorityFilter::All => true,
            PriorityFilter::Low => priority == Priority::Low,
            PriorityFilter::Medium => priority == Priority::Medium,
            PriorityFilter::High => priority == Priority::High,
        }
    }
}

impl From<Priority> for PriorityFilter {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Low => PriorityFilter::Low,
            Priority::Medium => PriorityFilter::Medium,
            Priority::High => PriorityFilter::High,
        }
    }
}

impl FromStr for PriorityFilter {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse::<Priority>().map(PriorityFilter::from).unwrap_or_default())
    }
}

impl fmt::Display for PriorityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriorityFilter::Low => write!(f, "low"),
            PriorityFilter::Medium => write!(f, "medium"),
            PriorityFilter::High => write!(f, "high"),
            PriorityFilter::All => write!(f, "all"),
        }
    }
}

/// Active view criteria. All criteria must hold for a task to be shown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskFilter {
    pub status: StatusFilter,
    pub priority: PriorityFilter,
    /// Empty means no tag criterion; otherwise the task needs at least one of these
    pub selected_tags: Vec<String>,
    /// Empty means no text criterion; matched case-insensitively against title or description
    pub search_term: String,
}

impl TaskFilter {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, task: &Task) -> bool {
        if !self.status.matches(task.completed) {
            return false;
        }

        if !self.priority.matches(task.priority) {
            return false;
        }

        if !self.selected_tags.is_empty() && !self.selected_tags.iter().any(|tag| task.has_tag(tag)) {
            return false;
        }

        if !self.search_term.is_empty() {
            let needle = self.search_term.to_lowercase();
            if !task.title.to_lowercase().contains(&needle) && !task.description.to_lowercase().contains(&needle) {
                return false;
            }
        }

        true
    }

    /// Select the matching tasks, preserving order. Never mutates the input.
    pub fn apply<'a, I>(&self, tasks: I) -> Vec<&'a Task>
    where
        I: IntoIterator<Item = &'a Task>,
    {
        tasks.into_iter().filter(|task| self.matches(task)).collect()
    }

    /// Merge the provided fields, keeping the rest
    pub fn merge(&mut self, update: FilterUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(selected_tags) = update.selected_tags {
            self.selected_tags = selected_tags;
        }
        if let Some(search_term) = update.search_term {
            self.search_term = search_term;
        }
    }
}

/// Partial filter update. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterUpdate {
    pub status: Option<StatusFilter>,
    pub priority: Option<PriorityFilter>,
    pub selected_tags: Option<Vec<String>>,
    pub search_term: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewTask;
    use chrono::Utc;

    fn task(id: &str, title: &str, description: &str, priority: Priority, completed: bool, tags: &[&str]) -> Task {
        NewTask {
            title: title.to_string(),
            description: description.to_string(),
            completed,
            priority,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
        .into_task(id.to_string(), Utc::now())
    }

    fn sample() -> Vec<Task> {
        vec![
            task("a", "Buy milk", "from the corner shop", Priority::Low, false, &["2"]),
            task("b", "Pay rent", "", Priority::High, false, &["1", "3"]),
            task("c", "Read book", "Rust in Action", Priority::Medium, true, &["4"]),
            task("d", "Gym", "leg day", Priority::High, true, &[]),
        ]
    }

    fn ids(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn test_default_filter_passes_everything() {
        let tasks = sample();
        let filter = TaskFilter::default();
        assert!(filter.is_default());
        assert_eq!(filter.apply(&tasks).len(), 4);
    }

    #[test]
    fn test_status_filter() {
        let tasks = sample();
        let mut filter = TaskFilter {
            status: StatusFilter::Active,
            ..Default::default()
        };
        assert_eq!(ids(&filter.apply(&tasks)), vec!["a", "b"]);

        filter.status = StatusFilter::Completed;
        assert_eq!(ids(&filter.apply(&tasks)), vec!["c", "d"]);
    }

    #[test]
    fn test_priority_filter() {
        let tasks = sample();
        let filter = TaskFilter {
            priority: PriorityFilter::High,
            ..Default::default()
        };
        assert_eq!(ids(&filter.apply(&tasks)), vec!["b", "d"]);
    }

    #[test]
    fn test_tag_filter_is_intersection() {
        let tasks = sample();
        let filter = TaskFilter {
            selected_tags: vec!["3".to_string(), "4".to_string()],
            ..Default::default()
        };
        assert_eq!(ids(&filter.apply(&tasks)), vec!["b", "c"]);
    }

    #[test]
    fn test_search_is_case_insensitive_on_title_or_description() {
        let tasks = sample();
        let mut filter = TaskFilter {
            search_term: "MILK".to_string(),
            ..Default::default()
        };
        assert_eq!(ids(&filter.apply(&tasks)), vec!["a"]);

        filter.search_term = "rust".to_string();
        assert_eq!(ids(&filter.apply(&tasks)), vec!["c"]);

        filter.search_term = "nothing matches".to_string();
        assert!(filter.apply(&tasks).is_empty());
    }

    #[test]
    fn test_criteria_are_conjunctive() {
        let tasks = sample();
        let filter = TaskFilter {
            status: StatusFilter::Completed,
            priority: PriorityFilter::High,
            selected_tags: vec![],
            search_term: "gym".to_string(),
        };
        assert_eq!(ids(&filter.apply(&tasks)), vec!["d"]);

        let filter = TaskFilter {
            status: StatusFilter::Active,
            priority: PriorityFilter::High,
            selected_tags: vec!["4".to_string()],
            search_term: String::new(),
        };
        assert!(filter.apply(&tasks).is_empty());
    }

    #[test]
    fn test_filtering_is_idempotent() {
        let tasks = sample();
        let filter = TaskFilter {
            status: StatusFilter::Active,
            search_term: "a".to_string(),
            ..Default::default()
        };

        let once = filter.apply(&tasks);
        let twice = filter.apply(once.iter().copied());
        assert_eq!(ids(&once), ids(&twice));
    }

    #[test]
    fn test_merge_keeps_unspecified_fields() {
        let mut filter = TaskFilter {
            status: StatusFilter::Active,
            priority: PriorityFilter::Low,
            selected_tags: vec!["1".to_string()],
            search_term: "milk".to_string(),
        };

        filter.merge(FilterUpdate {
            priority: Some(PriorityFilter::All),
            ..Default::default()
        });

        assert_eq!(filter.status, StatusFilter::Active);
        assert_eq!(filter.priority, PriorityFilter::All);
        assert_eq!(filter.selected_tags, vec!["1"]);
        assert_eq!(filter.search_term, "milk");
    }

    #[test]
    fn test_unrecognized_values_become_all() {
        assert_eq!("archived".parse::<StatusFilter>().unwrap(), StatusFilter::All);
        assert_eq!("Completed".parse::<StatusFilter>().unwrap(), StatusFilter::Completed);
        assert_eq!("urgent".parse::<PriorityFilter>().unwrap(), PriorityFilter::All);
        assert_eq!("high".parse::<PriorityFilter>().unwrap(), PriorityFilter::High);

        let filter: TaskFilter = serde_json::from_str(r#"{"status":"archived","priority":"urgent"}"#).unwrap();
        assert_eq!(filter.status, StatusFilter::All);
        assert_eq!(filter.priority, PriorityFilter::All);
        assert!(filter.selected_tags.is_empty());
    }

    #[test]
    fn test_filter_display() {
        assert_eq!(StatusFilter::Active.to_string(), "active");
        assert_eq!(PriorityFilter::All.to_string(), "all");
    }
}
