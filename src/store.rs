// Task store: authoritative task/tag/filter state persisted to a key-value backend

use crate::filter::{FilterUpdate, TaskFilter};
use crate::kv::KeyValueStore;
use crate::models::{NewTag, NewTask, Tag, Task, TaskUpdate, default_tags, new_id};
use crate::persist::{load_or_default, write_collection};
use crate::stats::Stats;
use chrono::{DateTime, Utc};
use eyre::Result;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Point-in-time view of the store for display
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Filtered tasks
    pub tasks: Vec<Task>,
    pub tags: Vec<Tag>,
    pub filter: TaskFilter,
    pub stats: Stats,
}

/// In-memory task and tag collections with write-through persistence
///
/// Every mutation that changes tasks or tags rewrites both collections to the backend.
/// Write failures are logged and never returned from the mutating call; use
/// [`TaskStore::save`] to observe them. The filter lives in memory only.
///
/// Operations naming an unknown id leave the state unchanged and return `false`.
pub struct TaskStore<K: KeyValueStore> {
    kv: K,
    tasks: Vec<Task>,
    tags: Vec<Tag>,
    filter: TaskFilter,
}

impl<K: KeyValueStore> TaskStore<K> {
    /// Rehydrate from the backend
    ///
    /// A missing or unparseable collection falls back to its default: no tasks, the
    /// built-in tag set.
    pub fn open(kv: K) -> Self {
        let tasks = load_or_default(&kv, Vec::new);
        let tags = load_or_default(&kv, default_tags);

        info!(tasks = tasks.len(), tags = tags.len(), "Opened task store");

        Self {
            kv,
            tasks,
            tags,
            filter: TaskFilter::default(),
        }
    }

    /// Get a reference to the backend
    pub fn backend(&self) -> &K {
        &self.kv
    }

    pub fn into_backend(self) -> K {
        self.kv
    }

    /// Write both collections to the backend
    pub fn save(&mut self) -> Result<()> {
        write_collection(&mut self.kv, &self.tasks)?;
        write_collection(&mut self.kv, &self.tags)?;
        Ok(())
    }

    fn persist(&mut self) {
        if let Err(e) = self.save() {
            warn!(error = ?e, "Failed to persist task store");
        }
    }

    // ========================================================================
    // Tasks
    // ========================================================================

    /// Create a task and return its id
    ///
    /// The title is not validated here; callers reject empty titles.
    pub fn add_task(&mut self, fields: NewTask) -> String {
        let id = new_id();
        let task = fields.into_task(id.clone(), Utc::now());
        debug!(id = %task.id, title = %task.title, "add_task");

        self.tasks.push(task);
        self.persist();
        id
    }

    /// Apply a partial update to the task with `id`
    pub fn update_task(&mut self, id: &str, update: TaskUpdate) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!(id, "update_task: no such task");
            return false;
        };

        update.apply(task);
        self.persist();
        true
    }

    pub fn delete_task(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            debug!(id, "delete_task: no such task");
            return false;
        }

        self.persist();
        true
    }

    /// Flip the completed flag
    pub fn toggle_task_completion(&mut self, id: &str) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!(id, "toggle_task_completion: no such task");
            return false;
        };

        task.completed = !task.completed;
        self.persist();
        true
    }

    /// Reorder tasks by position in `ordered_ids`
    ///
    /// Listed tasks come first in list order (first occurrence wins for repeated ids).
    /// Tasks not listed keep their relative order and follow the listed ones. Unknown
    /// ids are ignored.
    pub fn reorder_tasks<S: AsRef<str>>(&mut self, ordered_ids: &[S]) {
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for (i, id) in ordered_ids.iter().enumerate() {
            positions.entry(id.as_ref()).or_insert(i);
        }

        let before: Vec<String> = self.tasks.iter().map(|t| t.id.clone()).collect();
        self.tasks
            .sort_by_key(|t| positions.get(t.id.as_str()).copied().unwrap_or(usize::MAX));

        if self.tasks.iter().map(|t| &t.id).ne(before.iter()) {
            self.persist();
        }
    }

    // ========================================================================
    // Tags
    // ========================================================================

    /// Create a tag and return its id
    pub fn add_tag(&mut self, fields: NewTag) -> String {
        let id = new_id();
        let tag = fields.into_tag(id.clone());
        debug!(id = %tag.id, name = %tag.name, "add_tag");

        self.tags.push(tag);
        self.persist();
        id
    }

    /// Remove a tag and every reference to it
    ///
    /// Returns whether the tag itself existed. References held by tasks or the
    /// current filter are stripped either way.
    pub fn delete_tag(&mut self, id: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t.id != id);
        let removed = self.tags.len() != before;

        let mut stripped = 0;
        for task in &mut self.tasks {
            let count = task.tags.len();
            task.tags.retain(|t| t != id);
            stripped += count - task.tags.len();
        }
        self.filter.selected_tags.retain(|t| t != id);

        debug!(id, removed, stripped, "delete_tag");
        if removed || stripped > 0 {
            self.persist();
        }
        removed
    }

    // ========================================================================
    // Filter
    // ========================================================================

    pub fn update_filter(&mut self, update: FilterUpdate) {
        self.filter.merge(update);
        debug!(filter = ?self.filter, "update_filter");
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Tasks passing the current filter, in collection order
    pub fn tasks(&self) -> Vec<Task> {
        self.filter.apply(&self.tasks).into_iter().cloned().collect()
    }

    /// Up to `limit` tasks from the filtered view, newest `created_at` first
    pub fn recent_tasks(&self, limit: usize) -> Vec<Task> {
        let mut recent = self.filter.apply(&self.tasks);
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent.into_iter().take(limit).cloned().collect()
    }

    /// Every task, ignoring the filter
    pub fn all_tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn tag(&self, id: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.id == id)
    }

    pub fn filter(&self) -> &TaskFilter {
        &self.filter
    }

    /// Statistics over all tasks as of now
    pub fn stats(&self) -> Stats {
        self.stats_at(Utc::now())
    }

    pub fn stats_at(&self, now: DateTime<Utc>) -> Stats {
        Stats::compute(&self.tasks, now)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tasks: self.tasks(),
            tags: self.tags.clone(),
            filter: self.filter.clone(),
            stats: self.stats(),
        }
    }
}
