// Persistence backends behind a single persist/restore contract

pub mod blob;
pub mod memory;
pub mod object_store;

pub use blob::BlobBackend;
pub use memory::MemoryBackend;
pub use object_store::ObjectStoreBackend;

use crate::error::StorageError;
use crate::settings::Settings;
use crate::task::Task;

/// An undecoded persisted task record
pub type RawRecord = serde_json::Value;

/// Well-known key holding the task collection
pub const TASKS_KEY: &str = "tasks";

/// Independent key holding application settings
pub const SETTINGS_KEY: &str = "settings";

/// Durable home for the task collection and the settings
///
/// The whole collection is written on every call to `persist`; implementations
/// never see deltas. Absent data restores as empty (`Vec::new()` / `None`).
pub trait Backend: Send {
    /// Replace the persisted collection with `tasks`
    fn persist(&mut self, tasks: &[Task]) -> Result<(), StorageError>;

    /// Read back every persisted record without validating it
    fn restore(&self) -> Result<Vec<RawRecord>, StorageError>;

    fn persist_settings(&mut self, settings: &Settings) -> Result<(), StorageError>;

    fn restore_settings(&self) -> Result<Option<RawRecord>, StorageError>;

    /// Short human-readable location, used in logs
    fn describe(&self) -> String;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn persist(&mut self, tasks: &[Task]) -> Result<(), StorageError> {
        (**self).persist(tasks)
    }

    fn restore(&self) -> Result<Vec<RawRecord>, StorageError> {
        (**self).restore()
    }

    fn persist_settings(&mut self, settings: &Settings) -> Result<(), StorageError> {
        (**self).persist_settings(settings)
    }

    fn restore_settings(&self) -> Result<Option<RawRecord>, StorageError> {
        (**self).restore_settings()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

pub(crate) fn encode_tasks(tasks: &[Task]) -> Result<String, StorageError> {
    serde_json::to_string(tasks).map_err(|source| StorageError::Codec { what: "tasks", source })
}

/// Decode the stored array; individual records stay raw for per-record validation
pub(crate) fn decode_tasks(data: &str) -> Result<Vec<RawRecord>, StorageError> {
    if data.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(data).map_err(|source| StorageError::Codec { what: "tasks", source })
}

pub(crate) fn encode_settings(settings: &Settings) -> Result<String, StorageError> {
    serde_json::to_string(settings).map_err(|source| StorageError::Codec {
        what: "settings",
        source,
    })
}

pub(crate) fn decode_settings(data: &str) -> Result<Option<RawRecord>, StorageError> {
    if data.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(data)
        .map(Some)
        .map_err(|source| StorageError::Codec {
            what: "settings",
            source,
        })
}
