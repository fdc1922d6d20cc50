//! Crash-safe persistence for the live job set
//!
//! The queue itself is in-memory; the journal exists so an app restart does
//! not silently drop outfits a user is still waiting for. One JSON document
//! per line, full snapshot per write.

use crate::error::{PawdrobeError, Result};
use crate::queue::job::{GenerationJob, JobStatus};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// On-disk journal of the live job set
///
/// Every write replaces the whole file through a temporary sibling plus
/// rename, so a crash leaves either the previous or the next snapshot on
/// disk, never a torn one.
#[derive(Debug)]
pub struct JobJournal {
    path: PathBuf,
}

impl JobJournal {
    /// Create a journal backed by the given file
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Journal file location
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the full job set, replacing the previous snapshot
    ///
    /// Inline frame bytes are never journaled; jobs carry only metadata and
    /// content addresses, so snapshots stay small.
    ///
    /// # Errors
    /// - Failed to create the journal directory
    /// - Failed to write or rename the snapshot file
    pub fn write(&self, jobs: &[GenerationJob]) -> Result<()> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .map_err(|e| PawdrobeError::file_io_error("create journal directory", parent, e))?;
        }

        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| PawdrobeError::file_io_error("create journal temp file", parent, e))?;

        for job in jobs {
            serde_json::to_writer(&mut tmp, job).map_err(|e| {
                PawdrobeError::storage(format!("Failed to serialize job {}: {e}", job.id))
            })?;
            tmp.write_all(b"\n")
                .map_err(|e| PawdrobeError::file_io_error("write journal", &self.path, e))?;
        }

        tmp.persist(&self.path)
            .map_err(|e| PawdrobeError::file_io_error("replace journal", &self.path, e.error))?;

        log::debug!("Journaled {} job(s) to {}", jobs.len(), self.path.display());
        Ok(())
    }

    /// Load the journaled job set
    ///
    /// Jobs that were mid-processing when the process died are reset to
    /// pending so the worker picks them up again. A missing file is an empty
    /// queue; unreadable lines are skipped with a warning rather than
    /// poisoning the whole restore.
    ///
    /// # Errors
    /// - Failed to read an existing journal file
    pub fn load(&self) -> Result<Vec<GenerationJob>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PawdrobeError::file_io_error("read journal", &self.path, e)),
        };

        let mut jobs = Vec::new();
        for (line_number, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<GenerationJob>(line) {
                Ok(mut job) => {
                    if job.status == JobStatus::Processing {
                        // The frame work was lost with the process
                        job.status = JobStatus::Pending;
                    }
                    jobs.push(job);
                },
                Err(e) => {
                    log::warn!(
                        "Skipping unreadable journal line {} in {}: {}",
                        line_number + 1,
                        self.path.display(),
                        e
                    );
                },
            }
        }

        log::debug!("Restored {} job(s) from {}", jobs.len(), self.path.display());
        Ok(jobs)
    }
}

/// Default journal location under the platform data directory
///
/// # Errors
/// - Failed to determine the user data directory
pub fn default_journal_path() -> Result<PathBuf> {
    // Try environment variable override first
    if let Ok(data_override) = std::env::var("PAWDROBE_DATA_DIR") {
        return Ok(PathBuf::from(data_override).join("jobs.jsonl"));
    }

    Ok(dirs::data_dir()
        .ok_or_else(|| {
            PawdrobeError::invalid_config(
                "Failed to determine data directory. Set PAWDROBE_DATA_DIR environment variable."
                    .to_string(),
            )
        })?
        .join("pawdrobe")
        .join("jobs.jsonl"))
}
