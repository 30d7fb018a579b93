// Taskflow - to-do task store with pluggable JSON-blob and SQLite persistence

pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod filter;
pub mod settings;
pub mod store;
pub mod task;
pub mod validate;

// Re-export main types for convenience
pub use backend::{Backend, BlobBackend, MemoryBackend, ObjectStoreBackend, RawRecord};
pub use config::{BackendKind, Config, StoreConfig, Strictness};
pub use error::{StorageError, StoreError, ValidationError};
pub use events::StoreEvent;
pub use filter::{TaskFilter, TaskQuery, TaskStats, sort_tasks};
pub use settings::{Settings, SortBy, SortDirection, Theme};
pub use store::TaskStore;
pub use task::{Priority, TagInput, Task, TaskDraft, TaskPatch, Timestamp};
pub use validate::validate_record;
