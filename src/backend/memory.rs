// In-process backend, used by tests and demos

use super::{Backend, RawRecord, decode_settings, decode_tasks, encode_settings, encode_tasks};
use crate::error::StorageError;
use crate::settings::Settings;
use crate::task::Task;

/// Keeps the encoded blobs in memory so the full codec path is exercised
///
/// Writes can be made to fail with `set_fail_writes` to simulate an unavailable
/// storage medium.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    tasks: Option<String>,
    settings: Option<String>,
    fail_writes: bool,
    writes: usize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with raw records, as if a previous session had written them
    pub fn with_records(records: Vec<RawRecord>) -> Self {
        Self {
            tasks: Some(serde_json::Value::Array(records).to_string()),
            ..Self::default()
        }
    }

    /// Seed with a raw stored blob, which need not be valid JSON
    pub fn with_raw_blob(blob: impl Into<String>) -> Self {
        Self {
            tasks: Some(blob.into()),
            ..Self::default()
        }
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Number of successful task writes
    pub fn write_count(&self) -> usize {
        self.writes
    }

    pub fn raw_tasks(&self) -> Option<&str> {
        self.tasks.as_deref()
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Unavailable("memory backend is read-only".to_string()));
        }
        Ok(())
    }
}

impl Backend for MemoryBackend {
    fn persist(&mut self, tasks: &[Task]) -> Result<(), StorageError> {
        self.check_writable()?;
        self.tasks = Some(encode_tasks(tasks)?);
        self.writes += 1;
        Ok(())
    }

    fn restore(&self) -> Result<Vec<RawRecord>, StorageError> {
        match &self.tasks {
            Some(data) => decode_tasks(data),
            None => Ok(Vec::new()),
        }
    }

    fn persist_settings(&mut self, settings: &Settings) -> Result<(), StorageError> {
        self.check_writable()?;
        self.settings = Some(encode_settings(settings)?);
        Ok(())
    }

    fn restore_settings(&self) -> Result<Option<RawRecord>, StorageError> {
        match &self.settings {
            Some(data) => decode_settings(data),
            None => Ok(None),
        }
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
