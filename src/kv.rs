// Flat key-value backends for persisted collections

use eyre::{Context, Result, eyre};
use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// String-valued key-value storage
pub trait KeyValueStore {
    /// Read the value stored under `key`, `None` if absent
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`; absent keys are not an error
    fn remove(&mut self, key: &str) -> Result<()>;
}

impl<K: KeyValueStore + ?Sized> KeyValueStore for Box<K> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// Validate a key so it is safe to use as a file stem
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(eyre!("Key cannot be empty"));
    }
    if key.len() > 64 {
        return Err(eyre!("Key too long: {} (max 64 chars)", key));
    }
    if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(eyre!("Invalid key: {} (must be alphanumeric with _/-)", key));
    }
    Ok(())
}

/// In-memory backend
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    entries: HashMap<String, String>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Directory backend: each key is a `{key}.json` file
#[derive(Debug, Clone)]
pub struct FileKv {
    base_path: PathBuf,
}

impl FileKv {
    /// Open or create a backend rooted at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).context("Failed to create data directory")?;
        debug!(path = ?base_path, "Opened file key-value store");
        Ok(Self { base_path })
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.base_path.join(format!("{}.json", key)))
    }

    /// Take the exclusive per-key writer lock on `{key}.lock`
    ///
    /// The lock is released when the returned file is dropped.
    fn lock_key(&self, key: &str) -> Result<fs::File> {
        validate_key(key)?;
        let lock_path = self.base_path.join(format!("{}.lock", key));
        let lock = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file {}", lock_path.display()))?;
        lock.lock_exclusive().context("Failed to acquire file lock")?;
        Ok(lock)
    }
}

impl KeyValueStore for FileKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(content))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;
        let tmp_path = path.with_extension("json.tmp");

        // Held until the rename is done; only the lock holder touches the temp file
        let _lock = self.lock_key(key)?;

        {
            let mut file = fs::OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)
                .context("Failed to open temp file for writing")?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }

        fs::rename(&tmp_path, &path).with_context(|| format!("Failed to replace {}", path.display()))?;
        debug!(key, bytes = value.len(), "Wrote key");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        let _lock = self.lock_key(key)?;
        if path.exists() {
            fs::remove_file(&path).with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Ok(())
    }
}

/// SQLite backend: a single `kv` table
pub struct SqliteKv {
    db: Connection,
}

impl SqliteKv {
    /// Open or create a database file at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create data directory")?;
        }
        let db = Connection::open(path).context("Failed to open SQLite database")?;
        Self::with_connection(db)
    }

    /// Non-persistent database, mostly for tests
    pub fn in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        Self::with_connection(db)
    }

    fn with_connection(db: Connection) -> Result<Self> {
        debug!("Creating kv schema");
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self { db })
    }

}

impl KeyValueStore for SqliteKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let value: Option<String> = self
            .db
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .context("Failed to read key from database")?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        self.db
            .execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                rusqlite::params![key, value],
            )
            .context("Failed to write key to database")?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.db.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn exercise(kv: &mut dyn KeyValueStore) {
        assert_eq!(kv.get("tasks").unwrap(), None);

        kv.set("tasks", "[]").unwrap();
        assert_eq!(kv.get("tasks").unwrap().as_deref(), Some("[]"));

        kv.set("tasks", r#"[{"id":"1"}]"#).unwrap();
        assert_eq!(kv.get("tasks").unwrap().as_deref(), Some(r#"[{"id":"1"}]"#));

        kv.remove("tasks").unwrap();
        assert_eq!(kv.get("tasks").unwrap(), None);

        // Removing twice is fine
        kv.remove("tasks").unwrap();
    }

    #[test]
    fn test_memory_kv() {
        let mut kv = MemoryKv::new();
        exercise(&mut kv);
        assert!(kv.is_empty());
    }

    #[test]
    fn test_file_kv() {
        let temp = TempDir::new().unwrap();
        let mut kv = FileKv::open(temp.path().join("data")).unwrap();
        exercise(&mut kv);
        assert!(temp.path().join("data").exists());
    }

    #[test]
    fn test_file_kv_persists_across_instances() {
        let temp = TempDir::new().unwrap();
        {
            let mut kv = FileKv::open(temp.path()).unwrap();
            kv.set("tags", "[1,2,3]").unwrap();
        }

        let kv = FileKv::open(temp.path()).unwrap();
        assert_eq!(kv.get("tags").unwrap().as_deref(), Some("[1,2,3]"));
        assert!(temp.path().join("tags.json").exists());
        assert!(!temp.path().join("tags.json.tmp").exists());
    }

    #[test]
    fn test_file_kv_rejects_bad_keys() {
        let temp = TempDir::new().unwrap();
        let mut kv = FileKv::open(temp.path()).unwrap();
        assert!(kv.set("../escape", "x").is_err());
        assert!(kv.get("").is_err());
    }

    #[test]
    fn test_sqlite_kv() {
        let mut kv = SqliteKv::in_memory().unwrap();
        exercise(&mut kv);
    }

    #[test]
    fn test_file_kv_set_waits_for_writer_lock() {
        let temp = TempDir::new().unwrap();
        let tmp_path = temp.path().join("tasks.json.tmp");

        // Another writer holds the key lock with its temp file half written
        let lock = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(temp.path().join("tasks.lock"))
            .unwrap();
        lock.lock_exclusive().unwrap();
        fs::write(&tmp_path, "writer A in progress").unwrap();

        let mut kv = FileKv::open(temp.path()).unwrap();
        let handle = thread::spawn(move || kv.set("tasks", "B"));

        thread::sleep(Duration::from_millis(200));
        assert_eq!(fs::read_to_string(&tmp_path).unwrap(), "writer A in progress");
        assert!(!temp.path().join("tasks.json").exists());

        drop(lock);
        handle.join().unwrap().unwrap();

        let kv = FileKv::open(temp.path()).unwrap();
        assert_eq!(kv.get("tasks").unwrap().as_deref(), Some("B"));
        assert!(!tmp_path.exists());
    }

    #[test]
    fn test_sqlite_kv_rejects_bad_keys() {
        let mut kv = SqliteKv::in_memory().unwrap();
        assert!(kv.set("a b", "x").is_err());
        assert!(kv.get("").is_err());
        assert!(kv.get("../tasks").is_err());
        assert!(kv.remove("a/b").is_err());
        assert!(kv.remove("tasks").is_ok());
    }

    #[test]
    fn test_sqlite_kv_persists_across_instances() {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("nested").join("tasktrack.db");
        {
            let mut kv = SqliteKv::open(&db_path).unwrap();
            kv.set("tasks", "[]").unwrap();
        }

        let kv = SqliteKv::open(&db_path).unwrap();
        assert_eq!(kv.get("tasks").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_boxed_kv() {
        let mut kv: Box<dyn KeyValueStore> = Box::new(MemoryKv::new());
        exercise(&mut kv);
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("tasks").is_ok());
        assert!(validate_key("task-list_2").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key(&"a".repeat(65)).is_err());
    }
}
