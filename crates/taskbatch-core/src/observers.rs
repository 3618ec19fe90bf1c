//! Concrete observer implementations.

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::Sender;
use tracing::{debug, info, warn};

use crate::observer::TaskObserver;
use crate::task::{TaskEvent, TaskEventKind};

/// Observer that sends events through a channel (non-blocking).
///
/// Events are dropped when the channel is full or disconnected; the number
/// dropped is available from [`ChannelObserver::dropped`].
pub struct ChannelObserver {
    sender: Sender<TaskEvent>,
    dropped: AtomicUsize,
}

impl ChannelObserver {
    /// Create a new channel observer.
    #[must_use]
    pub fn new(sender: Sender<TaskEvent>) -> Self {
        Self {
            sender,
            dropped: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl TaskObserver for ChannelObserver {
    fn on_event(&self, event: &TaskEvent) {
        if self.sender.try_send(event.clone()).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Observer that logs every event through `tracing`.
pub struct LoggingObserver;

impl LoggingObserver {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskObserver for LoggingObserver {
    fn on_event(&self, event: &TaskEvent) {
        match &event.kind {
            TaskEventKind::Started => {
                debug!(task = event.task_id, label = %event.label, "Task started");
            }
            TaskEventKind::Completed(value) => {
                info!(task = event.task_id, label = %event.label, value, "Task completed");
            }
            TaskEventKind::Failed(error) => {
                warn!(task = event.task_id, label = %event.label, %error, "Task failed");
            }
        }
    }
}

/// Null object pattern — ignores every event.
pub struct NoOpObserver;

impl NoOpObserver {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoOpObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskObserver for NoOpObserver {
    fn on_event(&self, _event: &TaskEvent) {}
}
