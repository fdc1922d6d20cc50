//! Job records for outfit generation
//!
//! A job is submitted for a pet with a list of outfit items, moves through
//! the queue worker, and ends in a terminal state. Records are serializable
//! so the queue journal can persist them across restarts.

use crate::{
    error::{PawdrobeError, Result},
    types::{AssetBundle, ItemDescriptor},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle state of a generation job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting in the queue
    Pending,
    /// Being worked on by the queue worker
    Processing,
    /// Finished successfully; result is ready to acknowledge
    Completed,
    /// Finished unsuccessfully; the error message says why
    Failed,
}

impl JobStatus {
    /// Stable lowercase name used in logs and journals
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether the job has finished, successfully or not
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique identifier of a generation job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generate a fresh random identifier
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for JobId {
    type Err = PawdrobeError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| PawdrobeError::invalid_config(format!("Invalid job id '{s}': {e}")))
    }
}

/// Derive the human-readable outfit name shown in notifications.
///
/// Single item: its display name, falling back to the item id when the name
/// is empty. Several items: the first item's name plus a count.
#[must_use]
pub fn derive_display_name(items: &[ItemDescriptor]) -> String {
    let Some(first) = items.first() else {
        return "Outfit".to_string();
    };

    let first_name = if first.name.is_empty() {
        first.item_id.clone()
    } else {
        first.name.clone()
    };

    if items.len() == 1 {
        first_name
    } else {
        format!("{first_name} + {} more", items.len() - 1)
    }
}

/// A queued outfit generation job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationJob {
    /// Unique job identifier
    pub id: JobId,
    /// Pet the outfit is generated for
    pub pet_id: String,
    /// Human-readable outfit name for notifications
    pub display_name: String,
    /// Items to render and later equip
    pub items: Vec<ItemDescriptor>,
    /// Current lifecycle state
    pub status: JobStatus,
    /// When the job was submitted
    pub created_at: DateTime<Utc>,
    /// When the job reached a terminal state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Failure description for failed jobs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Content-addressed result of a completed job
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AssetBundle>,
}

impl GenerationJob {
    /// Create a pending job for a pet and item list
    ///
    /// An empty `display_name` falls back to one derived from the items.
    #[must_use]
    pub fn new(
        pet_id: impl Into<String>,
        display_name: impl Into<String>,
        items: Vec<ItemDescriptor>,
    ) -> Self {
        let display_name = display_name.into();
        let display_name = if display_name.is_empty() {
            derive_display_name(&items)
        } else {
            display_name
        };
        Self {
            id: JobId::new(),
            pet_id: pet_id.into(),
            display_name,
            items,
            status: JobStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            error_message: None,
            result: None,
        }
    }

    /// Move the job into the processing state
    pub fn mark_processing(&mut self) {
        self.status = JobStatus::Processing;
    }

    /// Finish the job successfully with its result bundle
    pub fn mark_completed(&mut self, result: AssetBundle) {
        self.status = JobStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.error_message = None;
        self.result = Some(result);
    }

    /// Finish the job unsuccessfully with a failure description
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.error_message = Some(error.into());
        self.result = None;
    }

    /// Whether the job has finished, successfully or not
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
