// Change notifications for views

use crate::task::Task;
use std::sync::mpsc::{self, Receiver, Sender};

/// Emitted after every in-memory mutation, whether or not persisting it succeeded
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    TaskCreated { id: String, task: Task },
    TaskUpdated { id: String, task: Task },
    TaskDeleted { id: String },
}

impl StoreEvent {
    pub fn id(&self) -> &str {
        match self {
            StoreEvent::TaskCreated { id, .. } | StoreEvent::TaskUpdated { id, .. } | StoreEvent::TaskDeleted { id } => {
                id.as_str()
            }
        }
    }

    pub(crate) fn created(task: &Task) -> Self {
        StoreEvent::TaskCreated {
            id: task.id.clone(),
            task: task.clone(),
        }
    }

    pub(crate) fn updated(task: &Task) -> Self {
        StoreEvent::TaskUpdated {
            id: task.id.clone(),
            task: task.clone(),
        }
    }

    pub(crate) fn deleted(id: impl Into<String>) -> Self {
        StoreEvent::TaskDeleted { id: id.into() }
    }
}

/// Fan-out of events to every live subscriber
#[derive(Debug, Default)]
pub(crate) struct EventBus {
    subscribers: Vec<Sender<StoreEvent>>,
}

impl EventBus {
    pub(crate) fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Subscribers whose receiver was dropped are pruned
    pub(crate) fn emit(&mut self, event: StoreEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
