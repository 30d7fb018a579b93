//! Demo 02: Interchangeable Backends
//!
//! Runs the same operations against the JSON blob backend and the SQLite
//! object-store backend, shows events, settings, a simulated write failure
//! and a lenient load of damaged data.
//!
//! Run with: cargo run --example 02_backends

use eyre::Result;
use serde_json::json;
use taskflow::{
    Backend, BlobBackend, MemoryBackend, ObjectStoreBackend, Settings, SortBy, StoreConfig, StoreEvent, Strictness,
    TaskDraft, TaskStore, Theme,
};

fn exercise<B: Backend>(label: &str, backend: B) -> Result<()> {
    println!("== {} ==", label);

    let mut store = TaskStore::open(backend, StoreConfig::default())?;
    let events = store.subscribe();

    let task = store.add(TaskDraft::new("Water plants"))?;
    store.toggle_completion(&task.id)?;
    store.remove(&task.id)?;

    for event in events.try_iter() {
        match event {
            StoreEvent::TaskCreated { id, .. } => println!("   created {}", id),
            StoreEvent::TaskUpdated { id, task } => println!("   updated {} (completed={})", id, task.completed),
            StoreEvent::TaskDeleted { id } => println!("   deleted {}", id),
        }
    }

    store.save_settings(Settings {
        theme: Theme::Dark,
        sort_by: SortBy::Priority,
        ..Settings::default()
    })?;
    store.load()?;
    println!("   settings after reload: {:?}\n", store.settings());
    Ok(())
}

fn main() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;

    println!("Taskflow Backends Demo");
    println!("======================\n");

    exercise("blob", BlobBackend::open(temp_dir.path().join("blob"))?)?;
    exercise("object-store", ObjectStoreBackend::open(temp_dir.path().join("sqlite"))?)?;

    // Storage failures keep the in-memory change
    println!("== write failure ==");
    let mut store = TaskStore::open(MemoryBackend::new(), StoreConfig::default())?;
    store.backend_mut().set_fail_writes(true);
    if let Err(e) = store.add(TaskDraft::new("Survives in memory")) {
        println!("   add failed: {}", e);
    }
    println!("   in memory: {} task(s), dirty={}", store.len(), store.is_dirty());
    store.backend_mut().set_fail_writes(false);
    store.flush()?;
    println!("   after flush: dirty={}\n", store.is_dirty());

    // Strict vs lenient loading of damaged records
    println!("== damaged records ==");
    let records = vec![
        json!({"id": "ok", "text": "Fine"}),
        json!({"id": "blank", "text": "", "createdAt": "2026-01-01T00:00:00Z", "updatedAt": "2026-01-01T00:00:00Z"}),
        json!({"id": "bad", "text": "Odd", "priority": "someday"}),
    ];
    for strictness in [Strictness::Strict, Strictness::Lenient] {
        let config = StoreConfig {
            strictness,
            ..StoreConfig::default()
        };
        let store = TaskStore::open(MemoryBackend::with_records(records.clone()), config)?;
        let ids: Vec<&str> = store.tasks().iter().map(|t| t.id.as_str()).collect();
        println!("   {:?}: kept {:?}", strictness, ids);
    }

    println!("\nDemo complete!");
    Ok(())
}
