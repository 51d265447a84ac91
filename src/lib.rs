// tasktrack - Personal task tracker with tags, filters and key-value persistence

pub mod config;
pub mod filter;
pub mod kv;
pub mod models;
pub mod persist;
pub mod record;
pub mod stats;
pub mod store;

// Re-export main types for convenience
pub use config::{Backend, Config};
pub use filter::{FilterUpdate, PriorityFilter, StatusFilter, TaskFilter};
pub use kv::{FileKv, KeyValueStore, MemoryKv, SqliteKv};
pub use models::{NewTag, NewTask, Priority, Tag, Task, TaskUpdate, default_tags};
pub use record::Record;
pub use stats::{PriorityBreakdown, Stats};
pub use store::{Snapshot, TaskStore};
