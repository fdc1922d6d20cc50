//! Configuration types for the outfit job queue

use crate::retry::RetryPolicy;
use crate::types::FrameKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the outfit job queue
///
/// Pacing values are product defaults rather than hard limits: the minimum
/// latency keeps the processing indicator on screen long enough to register,
/// and the inter-job delay spaces out calls to the upstream generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Minimum wall-clock time a job spends in the processing state
    pub min_job_latency: Duration,

    /// Pause between finishing one job and starting the next
    pub inter_job_delay: Duration,

    /// Retry policy for transient generator failures
    pub retry: RetryPolicy,

    /// Animation frames generated after the base pose, in order
    pub animation_frames: Vec<FrameKind>,

    /// Journal file for crash-safe job persistence (None = no journaling)
    pub journal_path: Option<PathBuf>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            min_job_latency: Duration::from_millis(3000),
            inter_job_delay: Duration::from_millis(1000),
            retry: RetryPolicy::default(),
            animation_frames: vec![FrameKind::Blink, FrameKind::Smile, FrameKind::Wave],
            journal_path: None, // Default: jobs live in memory only
        }
    }
}

impl QueueConfig {
    /// Create a new configuration builder for fluent API construction
    ///
    /// # Examples
    ///
    /// ## Basic configuration
    /// ```rust
    /// use pawdrobe::QueueConfig;
    ///
    /// let config = QueueConfig::builder()
    ///     .build()
    ///     .unwrap();
    /// ```
    ///
    /// ## Advanced configuration
    /// ```rust
    /// use pawdrobe::{QueueConfig, RetryPolicy};
    /// use std::time::Duration;
    ///
    /// let config = QueueConfig::builder()
    ///     .min_job_latency(Duration::from_millis(500))
    ///     .inter_job_delay(Duration::ZERO)
    ///     .retry(RetryPolicy::new(5, Duration::from_millis(250)))
    ///     .build()
    ///     .unwrap();
    /// ```
    #[must_use]
    pub fn builder() -> QueueConfigBuilder {
        QueueConfigBuilder::default()
    }

    /// Configuration with all pacing disabled, for tests and batch tools
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            min_job_latency: Duration::ZERO,
            inter_job_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - The base pose listed as an animation frame (it is always generated)
    /// - The same animation frame listed more than once
    pub fn validate(&self) -> crate::Result<()> {
        if self.animation_frames.iter().any(FrameKind::is_base) {
            return Err(crate::error::PawdrobeError::invalid_config(
                "the base pose is always generated and cannot be listed as an animation frame",
            ));
        }

        for (i, frame) in self.animation_frames.iter().enumerate() {
            if self.animation_frames[..i].contains(frame) {
                return Err(crate::error::PawdrobeError::invalid_config(format!(
                    "animation frame '{frame}' listed more than once"
                )));
            }
        }

        Ok(())
    }
}

/// Builder for `QueueConfig`
#[derive(Debug, Default)]
pub struct QueueConfigBuilder {
    config: QueueConfig,
}

impl QueueConfigBuilder {
    /// Set the minimum wall-clock time a job spends processing
    #[must_use]
    pub fn min_job_latency(mut self, latency: Duration) -> Self {
        self.config.min_job_latency = latency;
        self
    }

    /// Set the pause between consecutive jobs
    #[must_use]
    pub fn inter_job_delay(mut self, delay: Duration) -> Self {
        self.config.inter_job_delay = delay;
        self
    }

    /// Set the retry policy for transient generator failures
    #[must_use]
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    /// Set the animation frames generated after the base pose
    #[must_use]
    pub fn animation_frames(mut self, frames: Vec<FrameKind>) -> Self {
        self.config.animation_frames = frames;
        self
    }

    /// Enable journaling to the given file
    #[must_use]
    pub fn journal_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.journal_path = Some(path.into());
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    /// - The base pose listed as an animation frame
    /// - Duplicate animation frames
    pub fn build(self) -> crate::Result<QueueConfig> {
        let config = self.config;
        config.validate()?;
        Ok(config)
    }
}
