// Named filters, lazy queries, view-level sorting and counters over tasks

use crate::error::ValidationError;
use crate::settings::{SortBy, SortDirection};
use crate::task::Task;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Named predicate used to derive a subset of the collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TaskFilter {
    #[default]
    All,
    Active,
    Completed,
    Important,
}

impl TaskFilter {
    pub const ALL: [TaskFilter; 4] = [
        TaskFilter::All,
        TaskFilter::Active,
        TaskFilter::Completed,
        TaskFilter::Important,
    ];

    pub fn matches(self, task: &Task) -> bool {
        match self {
            TaskFilter::All => true,
            TaskFilter::Active => task.is_active(),
            TaskFilter::Completed => task.completed,
            TaskFilter::Important => task.is_important,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskFilter::All => "all",
            TaskFilter::Active => "active",
            TaskFilter::Completed => "completed",
            TaskFilter::Important => "important",
        }
    }
}

impl fmt::Display for TaskFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskFilter::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| {
                ValidationError::new(format!(
                    "Unknown filter: {:?} (expected all|active|completed|important)",
                    s
                ))
            })
    }
}

/// Lazy, finite view over a task slice
///
/// Cloning yields an independent cursor; `rewind` restarts this one.
#[derive(Debug, Clone)]
pub struct TaskQuery<'a> {
    tasks: &'a [Task],
    filter: TaskFilter,
    cursor: std::slice::Iter<'a, Task>,
}

impl<'a> TaskQuery<'a> {
    pub fn new(tasks: &'a [Task], filter: TaskFilter) -> Self {
        Self {
            tasks,
            filter,
            cursor: tasks.iter(),
        }
    }

    pub fn applied_filter(&self) -> TaskFilter {
        self.filter
    }

    pub fn rewind(&mut self) {
        self.cursor = self.tasks.iter();
    }
}

impl<'a> Iterator for TaskQuery<'a> {
    type Item = &'a Task;

    fn next(&mut self) -> Option<Self::Item> {
        let filter = self.filter;
        self.cursor.by_ref().find(|task| filter.matches(task))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.cursor.size_hint().1)
    }
}

impl std::iter::FusedIterator for TaskQuery<'_> {}

/// Stable sort applied downstream of the store; tasks without a due date sort last
pub fn sort_tasks(tasks: &mut [Task], sort_by: SortBy, direction: SortDirection) {
    tasks.sort_by(|a, b| {
        let ordering = match sort_by {
            SortBy::Priority => a.priority.cmp(&b.priority),
            SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
            SortBy::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortBy::DueDate => match (&a.due_date, &b.due_date) {
                (Some(x), Some(y)) => x.cmp(y),
                (Some(_), None) => return Ordering::Less,
                (None, Some(_)) => return Ordering::Greater,
                (None, None) => return Ordering::Equal,
            },
        };
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

/// Counters shown alongside the list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub important: usize,
}

impl TaskStats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let completed = tasks.iter().filter(|t| t.completed).count();
        Self {
            total: tasks.len(),
            completed,
            pending: tasks.len() - completed,
            important: tasks.iter().filter(|t| t.is_important).count(),
        }
    }
}
