// Task data model: the record, its priority scale, drafts and patches

use crate::error::ValidationError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Timestamps are stored as RFC 3339 strings in UTC
pub type Timestamp = DateTime<Utc>;

/// Closed, ordered priority scale (`low < medium < high < urgent`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Priority::Low, Priority::Medium, Priority::High, Priority::Urgent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ValidationError::new(format!("Unknown priority: {:?} (expected low|medium|high|urgent)", s)))
    }
}

/// A single to-do item, serialized with the camelCase keys of the persisted layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
    #[serde(default)]
    pub is_important: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub subtasks: Vec<String>,
    /// Estimated duration in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<f64>,
}

impl Task {
    /// Fresh, incomplete, unstarred task stamped with `at`
    pub(crate) fn new(id: String, text: String, priority: Priority, at: Timestamp) -> Self {
        Self {
            id,
            text,
            completed: false,
            priority,
            due_date: None,
            tags: Vec::new(),
            created_at: at,
            updated_at: at,
            completed_at: None,
            is_important: false,
            notes: None,
            subtasks: Vec::new(),
            estimated_time: None,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.completed
    }

    /// Keeps `completed_at` present exactly when `completed` is true
    pub(crate) fn set_completed(&mut self, completed: bool, at: Timestamp) {
        if self.completed == completed {
            return;
        }
        self.completed = completed;
        self.completed_at = completed.then_some(at);
    }

    /// Merge a validated patch; absent fields are left untouched
    pub(crate) fn apply(&mut self, patch: TaskPatch, at: Timestamp) {
        if let Some(text) = patch.text {
            self.text = text;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags.normalize();
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        if let Some(subtasks) = patch.subtasks {
            self.subtasks = subtasks;
        }
        if let Some(estimated_time) = patch.estimated_time {
            self.estimated_time = estimated_time;
        }
        if let Some(is_important) = patch.is_important {
            self.is_important = is_important;
        }
        if let Some(completed) = patch.completed {
            self.set_completed(completed, at);
        }
        self.updated_at = at;
    }
}

/// Tags as typed by a user (comma separated) or as an already-split list
#[derive(Debug, Clone, PartialEq)]
pub enum TagInput {
    Text(String),
    List(Vec<String>),
}

impl TagInput {
    /// Free text is split on commas, trimmed and emptied of blanks; lists pass through
    pub fn normalize(self) -> Vec<String> {
        match self {
            TagInput::Text(text) => text
                .split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect(),
            TagInput::List(tags) => tags,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            TagInput::Text(text) => text.trim().is_empty(),
            TagInput::List(tags) => tags.is_empty(),
        }
    }
}

impl Default for TagInput {
    fn default() -> Self {
        TagInput::List(Vec::new())
    }
}

impl From<&str> for TagInput {
    fn from(text: &str) -> Self {
        TagInput::Text(text.to_string())
    }
}

impl From<String> for TagInput {
    fn from(text: String) -> Self {
        TagInput::Text(text)
    }
}

impl From<Vec<String>> for TagInput {
    fn from(tags: Vec<String>) -> Self {
        TagInput::List(tags)
    }
}

impl From<Vec<&str>> for TagInput {
    fn from(tags: Vec<&str>) -> Self {
        TagInput::List(tags.into_iter().map(str::to_string).collect())
    }
}

/// Input to `TaskStore::add`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub text: String,
    /// Falls back to the settings' default priority
    pub priority: Option<Priority>,
    pub due_date: Option<String>,
    pub tags: TagInput,
    pub notes: Option<String>,
    pub subtasks: Vec<String>,
    pub estimated_time: Option<f64>,
}

impl TaskDraft {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_due_date(mut self, due_date: impl Into<String>) -> Self {
        self.due_date = Some(due_date.into());
        self
    }

    pub fn with_tags(mut self, tags: impl Into<TagInput>) -> Self {
        self.tags = tags.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_subtasks(mut self, subtasks: Vec<String>) -> Self {
        self.subtasks = subtasks;
        self
    }

    pub fn with_estimated_time(mut self, minutes: f64) -> Self {
        self.estimated_time = Some(minutes);
        self
    }
}

/// Partial update for `TaskStore::update`
///
/// `None` leaves a field unchanged. Clearable fields use `Some(None)` to remove
/// the current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub text: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<String>>,
    pub tags: Option<TagInput>,
    pub notes: Option<Option<String>>,
    pub subtasks: Option<Vec<String>>,
    pub estimated_time: Option<Option<f64>>,
    pub completed: Option<bool>,
    pub is_important: Option<bool>,
}

impl TaskPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn due_date(mut self, due_date: Option<String>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn tags(mut self, tags: impl Into<TagInput>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    pub fn notes(mut self, notes: Option<String>) -> Self {
        self.notes = Some(notes);
        self
    }

    pub fn subtasks(mut self, subtasks: Vec<String>) -> Self {
        self.subtasks = Some(subtasks);
        self
    }

    pub fn estimated_time(mut self, minutes: Option<f64>) -> Self {
        self.estimated_time = Some(minutes);
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    pub fn important(mut self, is_important: bool) -> Self {
        self.is_important = Some(is_important);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Current time in UTC
pub fn now() -> Timestamp {
    Utc::now()
}

/// Next mutation stamp; strictly later than `prev` even when the clock has not advanced
pub(crate) fn next_stamp(prev: Timestamp) -> Timestamp {
    let now = Utc::now();
    if now > prev { now } else { prev + Duration::milliseconds(1) }
}

/// Fresh opaque task identifier
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}
