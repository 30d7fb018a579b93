// Task store: the authoritative in-memory collection and its persistence round-trip

use crate::backend::{Backend, RawRecord};
use crate::config::{StoreConfig, Strictness};
use crate::error::{Result, StoreError, ValidationError};
use crate::events::{EventBus, StoreEvent};
use crate::filter::{TaskFilter, TaskQuery, TaskStats};
use crate::settings::Settings;
use crate::task::{Task, TaskDraft, TaskPatch, new_id, next_stamp, now};
use crate::validate::{CheckedRecord, check_record, validate_draft, validate_patch};
use std::collections::HashMap;
use std::sync::mpsc::Receiver;
use tracing::{debug, error, info, warn};

/// Owns the task collection and synchronizes it with a backend
///
/// Lifecycle: construct at application start (`open`, or `new` then `load`), then
/// accept operations. Every mutation is applied in memory first, then the full
/// collection is persisted, then subscribers are notified. A failed persist is
/// returned as `StoreError::Storage` but the in-memory change is kept; `flush`
/// retries it.
///
/// Mutating operations take `&mut self`, so one mutation is in flight per
/// instance. Share across threads with `Arc<Mutex<TaskStore<_>>>`.
pub struct TaskStore<B: Backend> {
    backend: B,
    config: StoreConfig,
    tasks: Vec<Task>,
    settings: Settings,
    events: EventBus,
    dirty: bool,
}

impl<B: Backend> TaskStore<B> {
    /// Create an empty, unloaded store
    pub fn new(backend: B, config: StoreConfig) -> Self {
        Self {
            backend,
            config,
            tasks: Vec::new(),
            settings: Settings::default(),
            events: EventBus::default(),
            dirty: false,
        }
    }

    /// Create a store and load its persisted state
    pub fn open(backend: B, config: StoreConfig) -> Result<Self> {
        let mut store = Self::new(backend, config);
        store.load()?;
        Ok(store)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Current collection, most recent first
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// True when the in-memory collection has changes the backend has not accepted
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats::from_tasks(&self.tasks)
    }

    /// Receive an event for every subsequent mutation
    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        self.events.subscribe()
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Replace the in-memory state with what the backend holds
    ///
    /// Records are validated one by one; a bad record never fails the whole
    /// load. What happens to it depends on `StoreConfig::strictness`. When two
    /// records share an id, the one with the newest `updatedAt` is kept at the
    /// position of the first. On a storage error nothing is replaced.
    ///
    /// Records that needed a generated id, a default timestamp, or a fixed
    /// `completedAt` are written back right away, so the next load sees the same
    /// tasks. If that write fails the store stays dirty and `flush` retries it.
    pub fn load(&mut self) -> Result<&[Task]> {
        let records = self.backend.restore()?;
        let settings = self.backend.restore_settings()?;

        let total = records.len();
        let mut tasks: Vec<Task> = Vec::with_capacity(total);
        let mut positions: HashMap<String, usize> = HashMap::with_capacity(total);
        let mut repaired = 0;

        for (index, record) in records.into_iter().enumerate() {
            let Some(CheckedRecord { task, repaired: fixed }) = self.admit(index, record) else {
                continue;
            };
            if fixed {
                repaired += 1;
            }

            match positions.get(&task.id) {
                Some(&pos) => {
                    warn!(index, id = %task.id, "Duplicate task id, keeping the most recently updated");
                    if task.updated_at > tasks[pos].updated_at {
                        tasks[pos] = task;
                    }
                }
                None => {
                    positions.insert(task.id.clone(), tasks.len());
                    tasks.push(task);
                }
            }
        }

        info!(
            backend = %self.backend.describe(),
            loaded = tasks.len(),
            skipped = total - tasks.len(),
            repaired,
            "Loaded tasks"
        );

        self.tasks = tasks;
        self.settings = Settings::from_raw(settings);
        self.dirty = false;

        if repaired > 0 {
            info!(repaired, "Writing back repaired task records");
            // Failure is kept in `dirty`; the loaded state is still usable
            let _ = self.persist();
        }
        Ok(&self.tasks)
    }

    fn admit(&self, index: usize, record: RawRecord) -> Option<CheckedRecord> {
        let reason = match check_record(&record) {
            Ok(checked) => return Some(checked),
            Err(e) => e,
        };

        match self.config.strictness {
            Strictness::Strict => {
                error!(index, error = %reason, "Dropping invalid task record");
                None
            }
            Strictness::Lenient => match serde_json::from_value::<Task>(record) {
                Ok(task) => {
                    warn!(index, id = %task.id, error = %reason, "Keeping task record that failed validation");
                    Some(CheckedRecord { task, repaired: false })
                }
                Err(decode) => {
                    error!(index, error = %reason, decode_error = %decode, "Dropping undecodable task record");
                    None
                }
            },
        }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Create a task from `draft` and prepend it to the collection
    pub fn add(&mut self, draft: TaskDraft) -> Result<Task> {
        let draft = validate_draft(draft)?;

        let id = self.fresh_id();
        let priority = draft.priority.unwrap_or(self.settings.default_priority);
        let mut task = Task::new(id, draft.text, priority, now());
        task.due_date = draft.due_date;
        task.notes = draft.notes;
        task.subtasks = draft.subtasks;
        task.estimated_time = draft.estimated_time;

        if self.config.tags_enabled {
            task.tags = draft.tags.normalize();
        } else if !draft.tags.is_empty() {
            debug!("Tags are disabled, ignoring draft tags");
        }

        debug!(id = %task.id, priority = %task.priority, "Adding task");
        self.tasks.insert(0, task.clone());
        self.commit([StoreEvent::created(&task)])?;
        Ok(task)
    }

    /// Merge `patch` onto the task with `id`
    pub fn update(&mut self, id: &str, patch: TaskPatch) -> Result<Task> {
        let pos = self.position(id)?;
        let mut patch = validate_patch(patch)?;

        if patch.is_important.is_some() && !self.config.importance_enabled {
            return Err(ValidationError::new("Importance is disabled").into());
        }
        if patch.tags.is_some() && !self.config.tags_enabled {
            debug!(id, "Tags are disabled, ignoring patch tags");
            patch.tags = None;
        }

        self.replace_with(pos, |task, at| task.apply(patch, at))
    }

    /// Flip `completed`, stamping or clearing `completedAt`
    pub fn toggle_completion(&mut self, id: &str) -> Result<Task> {
        let pos = self.position(id)?;
        self.replace_with(pos, |task, at| {
            let completed = !task.completed;
            task.set_completed(completed, at);
        })
    }

    /// Flip `isImportant`
    pub fn toggle_importance(&mut self, id: &str) -> Result<Task> {
        let pos = self.position(id)?;
        if !self.config.importance_enabled {
            return Err(ValidationError::new("Importance is disabled").into());
        }
        self.replace_with(pos, |task, _| task.is_important = !task.is_important)
    }

    /// Remove the task with `id`; an absent id is not an error
    pub fn remove(&mut self, id: &str) -> Result<()> {
        let Some(pos) = self.tasks.iter().position(|t| t.id == id) else {
            debug!(id, "Remove of absent task, nothing to do");
            return Ok(());
        };

        self.tasks.remove(pos);
        self.commit([StoreEvent::deleted(id)])
    }

    /// Remove every completed task, returning how many were removed
    pub fn clear_completed(&mut self) -> Result<usize> {
        let removed: Vec<String> = self
            .tasks
            .iter()
            .filter(|t| t.completed)
            .map(|t| t.id.clone())
            .collect();

        if removed.is_empty() {
            return Ok(0);
        }

        self.tasks.retain(|t| !t.completed);
        let count = removed.len();
        info!(count, "Cleared completed tasks");
        self.commit(removed.into_iter().map(StoreEvent::deleted))?;
        Ok(count)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Lazy view of the tasks matching `filter`; never mutates
    pub fn query(&self, filter: TaskFilter) -> Result<TaskQuery<'_>> {
        if filter == TaskFilter::Important && !self.config.importance_enabled {
            return Err(ValidationError::new("Importance is disabled").into());
        }
        Ok(TaskQuery::new(&self.tasks, filter))
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Persist the full collection again, e.g. after a failed write
    pub fn flush(&mut self) -> Result<()> {
        self.persist()
    }

    /// Replace the settings in memory, then persist them
    pub fn save_settings(&mut self, settings: Settings) -> Result<()> {
        self.settings = settings;
        self.backend.persist_settings(&self.settings)?;
        debug!(settings = ?self.settings, "Saved settings");
        Ok(())
    }

    fn persist(&mut self) -> Result<()> {
        match self.backend.persist(&self.tasks) {
            Ok(()) => {
                self.dirty = false;
                debug!(count = self.tasks.len(), "Persisted tasks");
                Ok(())
            }
            Err(e) => {
                self.dirty = true;
                warn!(error = %e, "Failed to persist tasks, in-memory state kept");
                Err(StoreError::Storage(e))
            }
        }
    }

    /// Persist, then notify; the persist outcome is returned after notifying
    fn commit<I>(&mut self, events: I) -> Result<()>
    where
        I: IntoIterator<Item = StoreEvent>,
    {
        let persisted = self.persist();
        for event in events {
            self.events.emit(event);
        }
        persisted
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn position(&self, id: &str) -> Result<usize> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    /// Build a new value for the task at `pos`, stamp it, and swap it in
    fn replace_with<F>(&mut self, pos: usize, change: F) -> Result<Task>
    where
        F: FnOnce(&mut Task, crate::task::Timestamp),
    {
        let mut task = self.tasks[pos].clone();
        let at = next_stamp(task.updated_at);
        change(&mut task, at);
        task.updated_at = at;

        debug!(id = %task.id, "Updating task");
        self.tasks[pos] = task.clone();
        self.commit([StoreEvent::updated(&task)])?;
        Ok(task)
    }

    fn fresh_id(&self) -> String {
        loop {
            let id = new_id();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BlobBackend, MemoryBackend, ObjectStoreBackend};
    use crate::settings::Theme;
    use crate::task::Priority;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use tempfile::TempDir;

    fn memory_store() -> TaskStore<MemoryBackend> {
        TaskStore::open(MemoryBackend::new(), StoreConfig::default()).unwrap()
    }

    fn ids(store: &TaskStore<impl Backend>) -> Vec<String> {
        store.tasks().iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn test_add_assigns_defaults() {
        let mut store = memory_store();

        let task = store.add(TaskDraft::new("  Buy milk ").with_priority(Priority::Low)).unwrap();

        assert_eq!(task.text, "Buy milk");
        assert_eq!(task.priority, Priority::Low);
        assert!(!task.completed);
        assert!(!task.is_important);
        assert!(task.completed_at.is_none());
        assert_eq!(task.created_at, task.updated_at);
        assert_eq!(store.len(), 1);
        assert_eq!(store.backend().write_count(), 1);
    }

    #[test]
    fn test_add_prepends_and_ids_are_unique() {
        let mut store = memory_store();

        for i in 0..20 {
            store.add(TaskDraft::new(format!("Task {}", i))).unwrap();
        }

        assert_eq!(store.tasks()[0].text, "Task 19");
        assert_eq!(store.tasks()[19].text, "Task 0");
        let unique: HashSet<String> = ids(&store).into_iter().collect();
        assert_eq!(unique.len(), 20);
    }

    #[test]
    fn test_add_uses_settings_default_priority() {
        let mut store = memory_store();
        store
            .save_settings(Settings {
                default_priority: Priority::High,
                ..Settings::default()
            })
            .unwrap();

        let task = store.add(TaskDraft::new("Inherit priority")).unwrap();
        assert_eq!(task.priority, Priority::High);
    }

    #[test]
    fn test_add_normalizes_tags() {
        let mut store = memory_store();

        let task = store.add(TaskDraft::new("Tagged").with_tags("work, urgent ,, work")).unwrap();
        assert_eq!(task.tags, vec!["work", "urgent", "work"]);

        let task = store.add(TaskDraft::new("Listed").with_tags(vec!["b", "a"])).unwrap();
        assert_eq!(task.tags, vec!["b", "a"]);
    }

    #[test]
    fn test_add_blank_text_is_rejected_without_mutation() {
        let mut store = memory_store();
        store.add(TaskDraft::new("Existing")).unwrap();

        let err = store.add(TaskDraft::new("   ")).unwrap_err();

        assert!(err.is_validation());
        assert_eq!(store.len(), 1);
        assert_eq!(store.backend().write_count(), 1);
    }

    #[test]
    fn test_update_merges_patch() {
        let mut store = memory_store();
        let original = store
            .add(TaskDraft::new("Draft report").with_notes("first pass"))
            .unwrap();

        let updated = store
            .update(
                &original.id,
                TaskPatch::new().text("Final report").priority(Priority::Urgent),
            )
            .unwrap();

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.text, "Final report");
        assert_eq!(updated.priority, Priority::Urgent);
        assert_eq!(updated.notes.as_deref(), Some("first pass"));
        assert_eq!(updated.created_at, original.created_at);
        assert!(updated.updated_at > original.updated_at);
        assert_eq!(store.get(&original.id), Some(&updated));
    }

    #[test]
    fn test_empty_patch_still_refreshes_updated_at() {
        let mut store = memory_store();
        let original = store.add(TaskDraft::new("Untouched")).unwrap();

        let updated = store.update(&original.id, TaskPatch::new()).unwrap();

        assert_eq!(updated.text, original.text);
        assert!(updated.updated_at > original.updated_at);
    }

    #[test]
    fn test_update_completed_maintains_completed_at() {
        let mut store = memory_store();
        let task = store.add(TaskDraft::new("Patch complete")).unwrap();

        let done = store.update(&task.id, TaskPatch::new().completed(true)).unwrap();
        assert!(done.completed);
        assert_eq!(done.completed_at, Some(done.updated_at));

        let undone = store.update(&task.id, TaskPatch::new().completed(false)).unwrap();
        assert!(undone.completed_at.is_none());
    }

    #[test]
    fn test_update_nonexistent_is_not_found() {
        let mut store = memory_store();
        store.add(TaskDraft::new("Only one")).unwrap();
        let before = store.tasks().to_vec();

        let err = store.update("nonexistent-id", TaskPatch::new().text("x")).unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(store.tasks(), before.as_slice());
    }

    #[test]
    fn test_update_invalid_patch_is_rejected() {
        let mut store = memory_store();
        let task = store.add(TaskDraft::new("Keep text")).unwrap();

        let err = store.update(&task.id, TaskPatch::new().text("  ")).unwrap_err();

        assert!(err.is_validation());
        assert_eq!(store.get(&task.id).unwrap().text, "Keep text");
    }

    #[test]
    fn test_toggle_completion_twice_restores() {
        let mut store = memory_store();
        let task = store.add(TaskDraft::new("Flip me")).unwrap();

        let done = store.toggle_completion(&task.id).unwrap();
        assert!(done.completed);
        assert!(done.completed_at.is_some());

        let undone = store.toggle_completion(&task.id).unwrap();
        assert!(!undone.completed);
        assert!(undone.completed_at.is_none());
        assert!(undone.updated_at > done.updated_at);
    }

    #[test]
    fn test_toggle_missing_is_not_found() {
        let mut store = memory_store();
        assert!(store.toggle_completion("ghost").unwrap_err().is_not_found());
        assert!(store.toggle_importance("ghost").unwrap_err().is_not_found());
    }

    #[test]
    fn test_buy_milk_scenario() {
        let mut store = memory_store();

        let task = store.add(TaskDraft::new("Buy milk").with_priority(Priority::Low)).unwrap();
        assert_eq!(store.len(), 1);
        assert!(!task.completed);
        assert!(!task.is_important);

        let starred = store.toggle_importance(&task.id).unwrap();
        assert!(starred.is_important);
        assert_ne!(starred.updated_at, task.updated_at);

        let done = store.toggle_completion(&task.id).unwrap();
        assert!(done.completed);
        assert!(done.completed_at.is_some());

        assert_eq!(store.query(TaskFilter::Active).unwrap().count(), 0);
        let completed: Vec<&Task> = store.query(TaskFilter::Completed).unwrap().collect();
        assert_eq!(completed, vec![&done]);
        let important: Vec<&Task> = store.query(TaskFilter::Important).unwrap().collect();
        assert_eq!(important.len(), 1);
        assert_eq!(important[0].id, task.id);
    }

    #[test]
    fn test_remove_keeps_relative_order() {
        let mut store = memory_store();
        let first = store.add(TaskDraft::new("First")).unwrap();
        let second = store.add(TaskDraft::new("Second")).unwrap();

        store.remove(&first.id).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.tasks()[0].id, second.id);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut store = memory_store();
        let task = store.add(TaskDraft::new("Delete twice")).unwrap();

        store.remove(&task.id).unwrap();
        let writes = store.backend().write_count();
        store.remove(&task.id).unwrap();
        store.remove("never-existed").unwrap();

        assert!(store.is_empty());
        assert_eq!(store.backend().write_count(), writes);
    }

    #[test]
    fn test_clear_completed_preserves_order() {
        let mut store = memory_store();
        let mut added = Vec::new();
        for i in 0..6 {
            added.push(store.add(TaskDraft::new(format!("Task {}", i))).unwrap());
        }
        for task in added.iter().filter(|t| t.text.ends_with(['1', '3', '4'])) {
            store.toggle_completion(&task.id).unwrap();
        }
        let expected: Vec<String> = store
            .tasks()
            .iter()
            .filter(|t| !t.completed)
            .map(|t| t.id.clone())
            .collect();

        let removed = store.clear_completed().unwrap();

        assert_eq!(removed, 3);
        assert_eq!(ids(&store), expected);
        assert!(store.tasks().iter().all(|t| !t.completed));
        assert_eq!(store.clear_completed().unwrap(), 0);
    }

    #[test]
    fn test_query_does_not_mutate() {
        let mut store = memory_store();
        store.add(TaskDraft::new("a")).unwrap();
        store.add(TaskDraft::new("b")).unwrap();
        let writes = store.backend().write_count();

        let query = store.query(TaskFilter::All).unwrap();
        assert_eq!(query.clone().count(), 2);
        assert_eq!(query.count(), 2);

        assert_eq!(store.backend().write_count(), writes);
    }

    #[test]
    fn test_importance_disabled() {
        let config = StoreConfig {
            importance_enabled: false,
            ..StoreConfig::default()
        };
        let mut store = TaskStore::open(MemoryBackend::new(), config).unwrap();
        assert!(!store.config().importance_enabled);
        let task = store.add(TaskDraft::new("Plain")).unwrap();

        assert!(store.toggle_importance(&task.id).unwrap_err().is_validation());
        assert!(store.update(&task.id, TaskPatch::new().important(true)).unwrap_err().is_validation());
        assert!(store.query(TaskFilter::Important).is_err());
        assert!(!store.get(&task.id).unwrap().is_important);
    }

    #[test]
    fn test_tags_disabled() {
        let config = StoreConfig {
            tags_enabled: false,
            ..StoreConfig::default()
        };
        let mut store = TaskStore::open(MemoryBackend::new(), config).unwrap();

        let task = store.add(TaskDraft::new("No tags").with_tags("a, b")).unwrap();
        assert!(task.tags.is_empty());

        let task = store.update(&task.id, TaskPatch::new().tags("c")).unwrap();
        assert!(task.tags.is_empty());
    }

    #[test]
    fn test_storage_failure_keeps_mutation() {
        let mut store = memory_store();
        let kept = store.add(TaskDraft::new("Persisted")).unwrap();
        store.backend_mut().set_fail_writes(true);

        let err = store.add(TaskDraft::new("Only in memory")).unwrap_err();

        assert!(err.is_storage());
        assert_eq!(store.len(), 2);
        assert_eq!(store.tasks()[0].text, "Only in memory");
        assert_eq!(store.tasks()[1].id, kept.id);
        assert!(store.is_dirty());

        store.backend_mut().set_fail_writes(false);
        store.flush().unwrap();
        assert!(!store.is_dirty());
        assert_eq!(store.backend().restore().unwrap().len(), 2);
    }

    #[test]
    fn test_storage_failure_keeps_every_mutation_kind() {
        let mut store = memory_store();
        let edit = store.add(TaskDraft::new("Edit me")).unwrap();
        let finish = store.add(TaskDraft::new("Finish me")).unwrap();
        let drop_me = store.add(TaskDraft::new("Remove me")).unwrap();
        store.toggle_completion(&edit.id).unwrap();
        store.backend_mut().set_fail_writes(true);

        let err = store.update(&edit.id, TaskPatch::new().text("Edited")).unwrap_err();
        assert!(err.is_storage());
        assert_eq!(store.get(&edit.id).unwrap().text, "Edited");
        assert!(store.is_dirty());

        let err = store.toggle_completion(&finish.id).unwrap_err();
        assert!(err.is_storage());
        assert!(store.get(&finish.id).unwrap().completed);

        let err = store.remove(&drop_me.id).unwrap_err();
        assert!(err.is_storage());
        assert!(store.get(&drop_me.id).is_none());

        let err = store.clear_completed().unwrap_err();
        assert!(err.is_storage());
        assert!(store.is_empty());
        assert!(store.is_dirty());

        // Storage still holds the last good write
        assert_eq!(store.backend().restore().unwrap().len(), 3);

        store.backend_mut().set_fail_writes(false);
        store.flush().unwrap();
        assert!(!store.is_dirty());
        assert!(store.backend().restore().unwrap().is_empty());
    }

    #[test]
    fn test_load_writes_back_generated_ids() {
        let backend = MemoryBackend::with_records(vec![json!({"text": "legacy", "completed": true})]);

        let mut store = TaskStore::open(backend, StoreConfig::default()).unwrap();
        let first = store.tasks()[0].clone();

        assert_eq!(store.backend().write_count(), 1);
        assert!(store.backend().raw_tasks().unwrap().contains(&first.id));
        assert!(!store.is_dirty());

        store.load().unwrap();
        assert_eq!(store.tasks(), std::slice::from_ref(&first));
        assert_eq!(store.backend().write_count(), 1);
    }

    #[test]
    fn test_ids_are_stable_across_reopen() {
        let temp = TempDir::new().unwrap();
        let backend = BlobBackend::open(temp.path()).unwrap();
        std::fs::write(backend.tasks_path(), r#"[{"text":"legacy"}]"#).unwrap();

        let first = TaskStore::open(backend, StoreConfig::default()).unwrap();
        let id = first.tasks()[0].id.clone();
        drop(first);

        let mut second = TaskStore::open(BlobBackend::open(temp.path()).unwrap(), StoreConfig::default()).unwrap();
        assert_eq!(ids(&second), vec![id.clone()]);

        let updated = second.update(&id, TaskPatch::new().text("renamed")).unwrap();
        assert_eq!(updated.text, "renamed");
    }

    #[test]
    fn test_failed_write_back_leaves_store_dirty() {
        let mut backend = MemoryBackend::with_records(vec![json!({"text": "legacy"})]);
        backend.set_fail_writes(true);

        let mut store = TaskStore::open(backend, StoreConfig::default()).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.is_dirty());

        store.backend_mut().set_fail_writes(false);
        store.flush().unwrap();
        let id = store.tasks()[0].id.clone();
        store.load().unwrap();
        assert_eq!(ids(&store), vec![id]);
    }

    #[test]
    fn test_events_follow_mutations() {
        let mut store = memory_store();
        let events = store.subscribe();

        let task = store.add(TaskDraft::new("Observed")).unwrap();
        store.toggle_completion(&task.id).unwrap();
        store.clear_completed().unwrap();
        store.remove(&task.id).unwrap();

        let received: Vec<StoreEvent> = events.try_iter().collect();
        assert_eq!(received.len(), 3);
        assert!(matches!(&received[0], StoreEvent::TaskCreated { id, .. } if *id == task.id));
        assert!(matches!(&received[1], StoreEvent::TaskUpdated { task: t, .. } if t.completed));
        assert_eq!(received[2], StoreEvent::TaskDeleted { id: task.id.clone() });
    }

    #[test]
    fn test_events_emitted_even_when_persist_fails() {
        let mut store = memory_store();
        let events = store.subscribe();
        store.backend_mut().set_fail_writes(true);

        assert!(store.add(TaskDraft::new("Unsaved")).is_err());
        assert!(matches!(events.try_recv().unwrap(), StoreEvent::TaskCreated { .. }));
    }

    #[test]
    fn test_load_strict_drops_bad_records() {
        let backend = MemoryBackend::with_records(vec![
            json!({"id": "good", "text": "Valid", "priority": "high"}),
            json!({"id": "empty", "text": ""}),
            json!({"id": "weird", "text": "Odd priority", "priority": "someday"}),
            json!("not even an object"),
            json!({"id": "also-good", "text": "Valid too"}),
        ]);

        let store = TaskStore::open(backend, StoreConfig::default()).unwrap();

        assert_eq!(ids(&store), vec!["good", "also-good"]);
    }

    #[test]
    fn test_load_lenient_keeps_decodable_records() {
        let backend = MemoryBackend::with_records(vec![
            json!({
                "id": "empty-text",
                "text": "",
                "createdAt": "2026-01-01T00:00:00Z",
                "updatedAt": "2026-01-01T00:00:00Z"
            }),
            json!({"id": "bad-priority", "text": "x", "priority": "someday",
                   "createdAt": "2026-01-01T00:00:00Z", "updatedAt": "2026-01-01T00:00:00Z"}),
            json!({"id": "good", "text": "Valid"}),
        ]);
        let config = StoreConfig {
            strictness: Strictness::Lenient,
            ..StoreConfig::default()
        };

        let store = TaskStore::open(backend, config).unwrap();

        // Unknown priority still cannot be decoded, so it is dropped in both modes
        assert_eq!(ids(&store), vec!["empty-text", "good"]);
        assert_eq!(store.get("empty-text").unwrap().text, "");
    }

    #[test]
    fn test_load_duplicate_ids_keep_newest() {
        let backend = MemoryBackend::with_records(vec![
            json!({"id": "dup", "text": "Old", "updatedAt": "2026-01-01T00:00:00Z"}),
            json!({"id": "other", "text": "Other"}),
            json!({"id": "dup", "text": "New", "updatedAt": "2026-03-01T00:00:00Z"}),
        ]);

        let store = TaskStore::open(backend, StoreConfig::default()).unwrap();

        assert_eq!(ids(&store), vec!["dup", "other"]);
        assert_eq!(store.get("dup").unwrap().text, "New");
    }

    #[test]
    fn test_load_corrupt_blob_keeps_state() {
        let mut store = TaskStore::new(MemoryBackend::with_raw_blob("{{{"), StoreConfig::default());

        let err = store.load().unwrap_err();

        assert!(err.is_storage());
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_replaces_collection() {
        let mut store = memory_store();
        let task = store.add(TaskDraft::new("Saved")).unwrap();
        store.backend_mut().set_fail_writes(true);
        let _ = store.add(TaskDraft::new("Lost on reload"));

        store.load().unwrap();

        assert_eq!(ids(&store), vec![task.id]);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_settings_round_trip() {
        let mut store = memory_store();
        assert_eq!(store.settings(), &Settings::default());

        let settings = Settings {
            theme: Theme::Light,
            show_completed_tasks: false,
            ..Settings::default()
        };
        store.save_settings(settings.clone()).unwrap();
        store.load().unwrap();

        assert_eq!(store.settings(), &settings);
    }

    #[test]
    fn test_stats() {
        let mut store = memory_store();
        let a = store.add(TaskDraft::new("a")).unwrap();
        store.add(TaskDraft::new("b")).unwrap();
        store.toggle_completion(&a.id).unwrap();
        store.toggle_importance(&a.id).unwrap();

        let stats = store.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.important, 1);
    }

    #[test]
    fn test_round_trip_through_blob_backend() {
        let temp = TempDir::new().unwrap();
        let mut store = TaskStore::open(BlobBackend::open(temp.path()).unwrap(), StoreConfig::default()).unwrap();
        let task = store
            .add(
                TaskDraft::new("Round trip")
                    .with_priority(Priority::Urgent)
                    .with_due_date("2026-12-31")
                    .with_tags("a, b, a")
                    .with_notes("notes")
                    .with_subtasks(vec!["step one".to_string()])
                    .with_estimated_time(30.0),
            )
            .unwrap();
        store.toggle_completion(&task.id).unwrap();
        let before = store.tasks().to_vec();

        let reopened = TaskStore::open(BlobBackend::open(temp.path()).unwrap(), StoreConfig::default()).unwrap();

        assert_eq!(reopened.tasks(), before.as_slice());
    }

    #[test]
    fn test_round_trip_through_object_store() {
        let temp = TempDir::new().unwrap();
        let mut store =
            TaskStore::open(ObjectStoreBackend::open(temp.path()).unwrap(), StoreConfig::default()).unwrap();
        store.add(TaskDraft::new("One")).unwrap();
        let two = store.add(TaskDraft::new("Two")).unwrap();
        store.toggle_importance(&two.id).unwrap();
        let before = store.tasks().to_vec();

        let reopened =
            TaskStore::open(ObjectStoreBackend::open(temp.path()).unwrap(), StoreConfig::default()).unwrap();

        assert_eq!(reopened.tasks(), before.as_slice());
    }

    #[test]
    fn test_independent_instances() {
        let mut a = memory_store();
        let b = memory_store();

        a.add(TaskDraft::new("Only in a")).unwrap();

        assert_eq!(a.len(), 1);
        assert!(b.is_empty());
    }

    #[test]
    fn test_shared_store_serializes_mutations() {
        let store = Arc::new(Mutex::new(memory_store()));

        let handles: Vec<_> = (0..8)
            .map(|thread_id| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..10 {
                        let mut guard = store.lock().unwrap();
                        guard.add(TaskDraft::new(format!("t{}-{}", thread_id, i))).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let store = store.lock().unwrap();
        assert_eq!(store.len(), 80);
        assert_eq!(store.backend().restore().unwrap().len(), 80);
        let unique: HashSet<String> = ids(&store).into_iter().collect();
        assert_eq!(unique.len(), 80);
    }
}
