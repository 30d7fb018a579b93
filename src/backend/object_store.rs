// Structured object-store backend on SQLite

use super::{Backend, RawRecord, SETTINGS_KEY, TASKS_KEY, decode_settings, decode_tasks, encode_settings, encode_tasks};
use crate::error::StorageError;
use crate::settings::Settings;
use crate::task::Task;
use rusqlite::{Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Object store holding the task array
pub const TASKS_STORE: &str = "tasks-store";

/// Object store holding the settings record
pub const SETTINGS_STORE: &str = "settings-store";

const DB_FILE: &str = "taskflow.db";

/// Key/value object store: each named store maps constant record names to JSON values
pub struct ObjectStoreBackend {
    location: Option<PathBuf>,
    db: Connection,
}

impl ObjectStoreBackend {
    /// Open or create `{dir}/taskflow.db`
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StorageError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;

        let db_path = dir.join(DB_FILE);
        let db = Connection::open(&db_path)?;

        let backend = Self {
            location: Some(db_path),
            db,
        };
        backend.create_schema()?;
        Ok(backend)
    }

    /// Database that lives only as long as this value
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let backend = Self {
            location: None,
            db: Connection::open_in_memory()?,
        };
        backend.create_schema()?;
        Ok(backend)
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    fn create_schema(&self) -> Result<(), StorageError> {
        debug!("Creating object store schema");

        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS objects (
                store TEXT NOT NULL,
                key TEXT NOT NULL,
                value_json TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (store, key)
            );
            "#,
        )?;

        Ok(())
    }

    fn put(&mut self, store: &str, key: &str, value_json: &str) -> Result<(), StorageError> {
        let tx = self.db.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO objects (store, key, value_json, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![store, key, value_json, chrono::Utc::now().timestamp_millis()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn get(&self, store: &str, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .db
            .query_row(
                "SELECT value_json FROM objects WHERE store = ?1 AND key = ?2",
                rusqlite::params![store, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }
}

impl Backend for ObjectStoreBackend {
    fn persist(&mut self, tasks: &[Task]) -> Result<(), StorageError> {
        let data = encode_tasks(tasks)?;
        self.put(TASKS_STORE, TASKS_KEY, &data)?;
        debug!(count = tasks.len(), "Wrote tasks record");
        Ok(())
    }

    fn restore(&self) -> Result<Vec<RawRecord>, StorageError> {
        match self.get(TASKS_STORE, TASKS_KEY)? {
            Some(data) => decode_tasks(&data),
            None => Ok(Vec::new()),
        }
    }

    fn persist_settings(&mut self, settings: &Settings) -> Result<(), StorageError> {
        let data = encode_settings(settings)?;
        self.put(SETTINGS_STORE, SETTINGS_KEY, &data)
    }

    fn restore_settings(&self) -> Result<Option<RawRecord>, StorageError> {
        match self.get(SETTINGS_STORE, SETTINGS_KEY)? {
            Some(data) => decode_settings(&data),
            None => Ok(None),
        }
    }

    fn describe(&self) -> String {
        match &self.location {
            Some(path) => format!("object-store:{}", path.display()),
            None => "object-store:memory".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SortDirection;
    use crate::task::{Priority, now};
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_database() {
        let temp = TempDir::new().unwrap();
        let backend = ObjectStoreBackend::open(temp.path()).unwrap();

        assert!(temp.path().join("taskflow.db").exists());
        assert_eq!(backend.db_path(), Some(temp.path().join("taskflow.db").as_path()));
    }

    #[test]
    fn test_empty_store_restores_nothing() {
        let backend = ObjectStoreBackend::open_in_memory().unwrap();
        assert!(backend.restore().unwrap().is_empty());
        assert!(backend.restore_settings().unwrap().is_none());
    }

    #[test]
    fn test_single_record_under_constant_key() {
        let mut backend = ObjectStoreBackend::open_in_memory().unwrap();
        let tasks = vec![
            Task::new("a".to_string(), "Alpha".to_string(), Priority::Low, now()),
            Task::new("b".to_string(), "Beta".to_string(), Priority::Medium, now()),
        ];

        backend.persist(&tasks).unwrap();
        backend.persist(&tasks).unwrap();

        let rows: i64 = backend
            .db
            .query_row("SELECT COUNT(*) FROM objects WHERE store = ?1", [TASKS_STORE], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);

        let restored = backend.restore().unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored[1]["text"], "Beta");
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp = TempDir::new().unwrap();
        let task = Task::new("a".to_string(), "Durable".to_string(), Priority::High, now());

        {
            let mut backend = ObjectStoreBackend::open(temp.path()).unwrap();
            backend.persist(std::slice::from_ref(&task)).unwrap();
        }

        let backend = ObjectStoreBackend::open(temp.path()).unwrap();
        let restored: Task = serde_json::from_value(backend.restore().unwrap().remove(0)).unwrap();
        assert_eq!(restored, task);
    }

    #[test]
    fn test_settings_are_independent() {
        let mut backend = ObjectStoreBackend::open_in_memory().unwrap();
        let settings = Settings {
            sort_direction: SortDirection::Asc,
            ..Settings::default()
        };

        backend.persist_settings(&settings).unwrap();
        assert!(backend.restore().unwrap().is_empty());
        assert_eq!(Settings::from_raw(backend.restore_settings().unwrap()), settings);
    }
}
