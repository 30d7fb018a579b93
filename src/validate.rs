// Validation rules for persisted records, drafts and patches
//
// Every check collects its reasons instead of failing on the first one, so a
// rejected record reports everything that is wrong with it.

use crate::backend::RawRecord;
use crate::error::ValidationError;
use crate::task::{Priority, TagInput, Task, TaskDraft, TaskPatch, Timestamp, new_id, now};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;

/// Validate a raw persisted record against the task schema
///
/// Missing optional fields take their declared defaults (`completed=false`,
/// `priority=medium`, empty `tags`/`subtasks`, timestamps of now, a fresh id).
/// Present fields of the wrong type and unknown priorities are rejected. A
/// completed record without `completedAt` takes its `updatedAt`; an incomplete
/// record with a `completedAt` has it cleared.
pub fn validate_record(raw: &RawRecord) -> Result<Task, ValidationError> {
    check_record(raw).map(|checked| checked.task)
}

/// A record that passed validation
#[derive(Debug, Clone)]
pub(crate) struct CheckedRecord {
    pub(crate) task: Task,
    /// Set when an id or timestamp was generated or `completedAt` was fixed up,
    /// so the task no longer matches what is stored
    pub(crate) repaired: bool,
}

pub(crate) fn check_record(raw: &RawRecord) -> Result<CheckedRecord, ValidationError> {
    let Some(obj) = raw.as_object() else {
        return Err(ValidationError::new("Record is not an object"));
    };

    let mut reasons = Vec::new();
    let mut repaired = false;
    let stamp = now();

    let id = match obj.get("id") {
        None | Some(Value::Null) => {
            repaired = true;
            new_id()
        }
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(_) => {
            reasons.push("id must be a non-empty string".to_string());
            String::new()
        }
    };

    let text = match obj.get("text") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::String(_)) => {
            reasons.push("text is required".to_string());
            String::new()
        }
        None | Some(Value::Null) => {
            reasons.push("text is required".to_string());
            String::new()
        }
        Some(_) => {
            reasons.push("text must be a string".to_string());
            String::new()
        }
    };

    let priority = match obj.get("priority") {
        None | Some(Value::Null) => Priority::default(),
        Some(Value::String(s)) => match s.parse::<Priority>() {
            Ok(p) => p,
            Err(e) => {
                reasons.extend(e.reasons);
                Priority::default()
            }
        },
        Some(_) => {
            reasons.push("priority must be a string".to_string());
            Priority::default()
        }
    };

    let completed = bool_field(obj, "completed", &mut reasons);
    let is_important = bool_field(obj, "isImportant", &mut reasons);
    let due_date = optional_string(obj, "dueDate", &mut reasons).filter(|d| !d.trim().is_empty());
    let notes = optional_string(obj, "notes", &mut reasons);
    let tags = string_list(obj, "tags", &mut reasons);
    let subtasks = string_list(obj, "subtasks", &mut reasons);
    let created_at = timestamp_field(obj, "createdAt", &mut reasons);
    let updated_at = timestamp_field(obj, "updatedAt", &mut reasons);
    let completed_at = timestamp_field(obj, "completedAt", &mut reasons);

    let estimated_time = match obj.get("estimatedTime") {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => match n.as_f64() {
            Some(minutes) if minutes.is_finite() && minutes >= 0.0 => Some(minutes),
            _ => {
                reasons.push("estimatedTime must be a non-negative number".to_string());
                None
            }
        },
        Some(_) => {
            reasons.push("estimatedTime must be a number".to_string());
            None
        }
    };

    if !reasons.is_empty() {
        return Err(ValidationError::from_reasons(reasons));
    }

    if created_at.is_none() || updated_at.is_none() {
        repaired = true;
    }
    let created_at = created_at.unwrap_or(stamp);
    let updated_at = updated_at.unwrap_or(stamp);

    let completed_at = match (completed, completed_at) {
        (true, None) => {
            debug!(id = %id, "Completed record without completedAt, using updatedAt");
            repaired = true;
            Some(updated_at)
        }
        (false, Some(_)) => {
            debug!(id = %id, "Incomplete record with completedAt, clearing it");
            repaired = true;
            None
        }
        (_, at) => at,
    };

    let task = Task {
        id,
        text,
        completed,
        priority,
        due_date,
        tags,
        created_at,
        updated_at,
        completed_at,
        is_important,
        notes,
        subtasks,
        estimated_time,
    };
    Ok(CheckedRecord { task, repaired })
}

/// Check a draft and return it normalized: trimmed text, blank due date
/// removed, tags split into a list
pub fn validate_draft(draft: TaskDraft) -> Result<TaskDraft, ValidationError> {
    let mut reasons = Vec::new();

    let text = draft.text.trim().to_string();
    if text.is_empty() {
        reasons.push("text is required".to_string());
    }
    if let Some(minutes) = draft.estimated_time {
        check_estimate(minutes, &mut reasons);
    }

    if !reasons.is_empty() {
        return Err(ValidationError::from_reasons(reasons));
    }

    Ok(TaskDraft {
        text,
        priority: draft.priority,
        due_date: normalize_due_date(draft.due_date),
        tags: TagInput::List(draft.tags.normalize()),
        notes: draft.notes,
        subtasks: draft.subtasks,
        estimated_time: draft.estimated_time,
    })
}

/// Check a patch and return it normalized the same way as a draft
pub fn validate_patch(patch: TaskPatch) -> Result<TaskPatch, ValidationError> {
    let mut reasons = Vec::new();

    let text = patch.text.map(|t| t.trim().to_string());
    if text.as_deref().is_some_and(str::is_empty) {
        reasons.push("text cannot be empty".to_string());
    }
    if let Some(Some(minutes)) = patch.estimated_time {
        check_estimate(minutes, &mut reasons);
    }

    if !reasons.is_empty() {
        return Err(ValidationError::from_reasons(reasons));
    }

    Ok(TaskPatch {
        text,
        due_date: patch.due_date.map(normalize_due_date),
        tags: patch.tags.map(|tags| TagInput::List(tags.normalize())),
        ..patch
    })
}

fn check_estimate(minutes: f64, reasons: &mut Vec<String>) {
    if !minutes.is_finite() || minutes < 0.0 {
        reasons.push(format!("estimatedTime must be a non-negative number, got {}", minutes));
    }
}

fn normalize_due_date(due_date: Option<String>) -> Option<String> {
    due_date.map(|d| d.trim().to_string()).filter(|d| !d.is_empty())
}

fn bool_field(obj: &Map<String, Value>, key: &str, reasons: &mut Vec<String>) -> bool {
    match obj.get(key) {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            reasons.push(format!("{} must be a boolean", key));
            false
        }
    }
}

fn optional_string(obj: &Map<String, Value>, key: &str, reasons: &mut Vec<String>) -> Option<String> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            reasons.push(format!("{} must be a string", key));
            None
        }
    }
}

fn string_list(obj: &Map<String, Value>, key: &str, reasons: &mut Vec<String>) -> Vec<String> {
    match obj.get(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => out.push(s.clone()),
                    _ => {
                        reasons.push(format!("{} must contain only strings", key));
                        return Vec::new();
                    }
                }
            }
            out
        }
        Some(_) => {
            reasons.push(format!("{} must be an array of strings", key));
            Vec::new()
        }
    }
}

fn timestamp_field(obj: &Map<String, Value>, key: &str, reasons: &mut Vec<String>) -> Option<Timestamp> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => match DateTime::parse_from_rfc3339(s) {
            Ok(dt) => Some(dt.with_timezone(&Utc)),
            Err(_) => {
                reasons.push(format!("{} is not an RFC 3339 timestamp: {:?}", key, s));
                None
            }
        },
        Some(_) => {
            reasons.push(format!("{} must be a timestamp string", key));
            None
        }
    }
}
