//! Demo 01: Basic Usage
//!
//! Adds, stars, completes, filters and deletes tasks with a blob-backed store,
//! then reopens the store to show the state survived.
//!
//! Run with: cargo run --example 01_basic_usage

use eyre::Result;
use taskflow::{BlobBackend, Priority, StoreConfig, TaskDraft, TaskFilter, TaskPatch, TaskStore};

fn main() -> Result<()> {
    // Create a temporary directory for this demo
    let temp_dir = tempfile::tempdir()?;
    let store_path = temp_dir.path().to_path_buf();

    println!("Taskflow Basic Usage Demo");
    println!("=========================\n");
    println!("Store path: {}\n", store_path.display());

    let mut store = TaskStore::open(BlobBackend::open(&store_path)?, StoreConfig::default())?;

    // ADD
    println!("1. ADD - Creating tasks...");
    let milk = store.add(TaskDraft::new("Buy milk").with_priority(Priority::Low))?;
    let report = store.add(
        TaskDraft::new("Write quarterly report")
            .with_priority(Priority::High)
            .with_due_date("2026-12-15")
            .with_tags("work, writing"),
    )?;
    let dentist = store.add(TaskDraft::new("Book dentist").with_tags(vec!["health"]))?;
    println!("   Created {} tasks (newest first):", store.len());
    for task in store.tasks() {
        println!("   - {} [{}] {:?}", task.text, task.priority, task.tags);
    }
    println!();

    // Blank text is a validation error, not a panic
    match store.add(TaskDraft::new("   ")) {
        Ok(_) => println!("   Unexpectedly accepted a blank task"),
        Err(e) => println!("   Blank task rejected: {}\n", e),
    }

    // STAR and COMPLETE
    println!("2. STAR and COMPLETE...");
    store.toggle_importance(&milk.id)?;
    let done = store.toggle_completion(&milk.id)?;
    println!("   '{}' important={} completed={}", done.text, done.is_important, done.completed);
    println!("   completed at: {:?}\n", done.completed_at);

    // UPDATE
    println!("3. UPDATE - Editing a task...");
    let edited = store.update(
        &report.id,
        TaskPatch::new()
            .text("Write Q4 report")
            .notes(Some("include revenue chart".to_string())),
    )?;
    println!("   Now: '{}' (notes: {:?})\n", edited.text, edited.notes);

    // FILTER
    println!("4. FILTER - Querying...");
    for filter in TaskFilter::ALL {
        let names: Vec<&str> = store.query(filter)?.map(|t| t.text.as_str()).collect();
        println!("   {:<10} {:?}", filter.to_string(), names);
    }
    println!();

    // DELETE
    println!("5. DELETE - Removing and clearing...");
    store.remove(&dentist.id)?;
    store.remove(&dentist.id)?; // second delete is a no-op
    let cleared = store.clear_completed()?;
    println!("   Cleared {} completed task(s), {} left\n", cleared, store.len());

    // REOPEN
    println!("6. REOPEN - Loading from disk...");
    let reopened = TaskStore::open(BlobBackend::open(&store_path)?, StoreConfig::default())?;
    for task in reopened.tasks() {
        println!("   - {} (updated {})", task.text, task.updated_at);
    }
    let stats = reopened.stats();
    println!(
        "   {} total, {} completed, {} pending, {} important\n",
        stats.total, stats.completed, stats.pending, stats.important
    );

    println!("Demo complete!");
    Ok(())
}
