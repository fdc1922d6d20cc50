//! Job status notification bridge
//!
//! Separates user-facing notification concerns from queue logic. The queue
//! publishes a [`JobEvent`] on every status transition; frontends decide how
//! to surface it (in-app toast, push, log line). Notifiers must be fast and
//! must not call back into the queue.

use crate::queue::job::{JobId, JobStatus};
use serde::{Deserialize, Serialize};

/// A job status transition delivered to notifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEvent {
    /// Job that changed state
    pub job_id: JobId,
    /// State the job moved into
    pub status: JobStatus,
    /// Human-readable outfit name
    pub display_name: String,
    /// Failure description, present only for failed jobs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Trait for delivering job status notifications
pub trait JobNotifier: Send + Sync {
    /// Deliver one status transition
    fn notify(&self, event: JobEvent);
}

/// No-op notifier that discards all events
pub struct NoOpNotifier;

impl JobNotifier for NoOpNotifier {
    fn notify(&self, _event: JobEvent) {
        // Intentionally empty - discards notifications
    }
}

/// Console notifier that logs transitions
pub struct ConsoleNotifier {
    verbose: bool,
}

impl ConsoleNotifier {
    /// Create a new console notifier
    ///
    /// # Arguments
    /// * `verbose` - Whether to log intermediate (non-terminal) transitions
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl JobNotifier for ConsoleNotifier {
    fn notify(&self, event: JobEvent) {
        match event.status {
            JobStatus::Completed => {
                log::info!("✅ Outfit '{}' is ready ({})", event.display_name, event.job_id);
            }
            JobStatus::Failed => {
                log::error!(
                    "❌ Outfit '{}' failed: {}",
                    event.display_name,
                    event.error_message.as_deref().unwrap_or("unknown error")
                );
            }
            JobStatus::Pending | JobStatus::Processing => {
                if self.verbose {
                    log::info!("Outfit '{}' is now {}", event.display_name, event.status);
                }
            }
        }
    }
}

/// Notifier that records every event for verification in tests
#[derive(Debug, Clone, Default)]
pub struct CollectingNotifier {
    events: std::sync::Arc<std::sync::Mutex<Vec<JobEvent>>>,
}

impl CollectingNotifier {
    /// Create an empty collecting notifier
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far, in delivery order
    pub fn events(&self) -> Vec<JobEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Statuses received so far, in delivery order
    pub fn statuses(&self) -> Vec<JobStatus> {
        self.events.lock().unwrap().iter().map(|e| e.status).collect()
    }
}

impl JobNotifier for CollectingNotifier {
    fn notify(&self, event: JobEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
