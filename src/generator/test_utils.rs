//! Mock frame generator for testing
//!
//! Provides a scripted [`FrameGenerator`] implementation so queue and
//! pipeline behavior can be tested without a real image model. The mock
//! renders deterministic frames (a white backdrop ring around a colored
//! subject) so the segmentation stage has real work to do.

use crate::{
    error::{PawdrobeError, Result},
    generator::FrameGenerator,
    types::{FrameKind, ImageRef, ItemDescriptor},
};
use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use std::sync::{Arc, Mutex};

/// Failure behavior of a [`MockFrameGenerator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureMode {
    /// Every call succeeds
    None,
    /// Every call fails with a permanent error
    Permanent,
    /// The first N calls fail with a retryable 429, later calls succeed
    Transient(u32),
    /// Calls for one frame kind fail permanently, the rest succeed
    Kind(FrameKind),
    /// Every call returns bytes that do not decode as an image
    Garbage,
}

/// Mock frame generator with scripted failures and a call history
#[derive(Debug, Clone)]
pub struct MockFrameGenerator {
    /// Rendered frame dimensions (width, height)
    frame_size: (u32, u32),
    /// Scripted failure behavior
    failure_mode: FailureMode,
    /// Remaining transient failures, shared across clones
    transient_left: Arc<Mutex<u32>>,
    /// Call history for verification in tests
    call_history: Arc<Mutex<Vec<String>>>,
}

impl MockFrameGenerator {
    /// Create a mock generator that always succeeds
    #[must_use]
    pub fn new() -> Self {
        Self {
            frame_size: (16, 16),
            failure_mode: FailureMode::None,
            transient_left: Arc::new(Mutex::new(0)),
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock generator that always fails with a permanent error
    #[must_use]
    pub fn new_failing() -> Self {
        let mut generator = Self::new();
        generator.failure_mode = FailureMode::Permanent;
        generator
    }

    /// Create a mock generator whose first `failures` calls fail with a
    /// retryable rate limit error
    #[must_use]
    pub fn new_transient(failures: u32) -> Self {
        let mut generator = Self::new();
        generator.failure_mode = FailureMode::Transient(failures);
        generator.transient_left = Arc::new(Mutex::new(failures));
        generator
    }

    /// Create a mock generator that fails permanently for one frame kind
    #[must_use]
    pub fn new_failing_kind(kind: FrameKind) -> Self {
        let mut generator = Self::new();
        generator.failure_mode = FailureMode::Kind(kind);
        generator
    }

    /// Create a mock generator that returns undecodable bytes
    #[must_use]
    pub fn new_returning_garbage() -> Self {
        let mut generator = Self::new();
        generator.failure_mode = FailureMode::Garbage;
        generator
    }

    /// Set the dimensions of rendered frames
    #[must_use]
    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_size = (width, height);
        self
    }

    /// Get the call history for verification in tests.
    ///
    /// Entries have the form `"<kind> from <base>"`, where `<base>` is
    /// `entity:<id>`, `asset:<id>`, or `inline`.
    pub fn get_call_history(&self) -> Vec<String> {
        self.call_history.lock().unwrap().clone()
    }

    /// Clear the call history
    pub fn clear_call_history(&self) {
        self.call_history.lock().unwrap().clear();
    }

    /// Record a generate call for testing verification
    fn record_call(&self, kind: FrameKind, base: &ImageRef) {
        let base_tag = match base {
            ImageRef::Entity(id) => format!("entity:{id}"),
            ImageRef::Asset(id) => format!("asset:{id}"),
            ImageRef::Inline(_) => "inline".to_string(),
        };
        if let Ok(mut history) = self.call_history.lock() {
            history.push(format!("{kind} from {base_tag}"));
        }
    }

    /// Render the deterministic test frame for a kind.
    ///
    /// The outer quarter of the frame is white backdrop; the core is a
    /// solid color that differs per kind so every frame gets a distinct
    /// content address.
    #[must_use]
    pub fn render_frame(&self, kind: FrameKind) -> RgbaImage {
        let (width, height) = self.frame_size;
        let margin_x = width / 4;
        let margin_y = height / 4;
        let subject = match kind {
            FrameKind::Normal => Rgba([200, 60, 60, 255]),
            FrameKind::Blink => Rgba([60, 200, 60, 255]),
            FrameKind::Smile => Rgba([60, 60, 200, 255]),
            FrameKind::Wave => Rgba([200, 160, 60, 255]),
        };

        RgbaImage::from_fn(width, height, |x, y| {
            let on_backdrop = x < margin_x
                || y < margin_y
                || x >= width.saturating_sub(margin_x)
                || y >= height.saturating_sub(margin_y);
            if on_backdrop {
                Rgba([255, 255, 255, 255])
            } else {
                subject
            }
        })
    }

    fn encode_frame(&self, kind: FrameKind) -> Result<Vec<u8>> {
        let image = self.render_frame(kind);
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        image.write_to(&mut cursor, image::ImageFormat::Png)?;
        Ok(buffer)
    }
}

impl Default for MockFrameGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameGenerator for MockFrameGenerator {
    async fn generate_frame(
        &self,
        _items: &[ItemDescriptor],
        base: &ImageRef,
        kind: FrameKind,
    ) -> Result<Vec<u8>> {
        self.record_call(kind, base);

        match self.failure_mode {
            FailureMode::None => self.encode_frame(kind),
            FailureMode::Permanent => Err(PawdrobeError::generator_with_status(
                "mock generator rejected the request",
                400,
            )),
            FailureMode::Transient(_) => {
                let mut left = self
                    .transient_left
                    .lock()
                    .map_err(|_| PawdrobeError::internal("mock counter poisoned"))?;
                if *left > 0 {
                    *left -= 1;
                    Err(PawdrobeError::generator_with_status(
                        "mock rate limit exceeded",
                        429,
                    ))
                } else {
                    drop(left);
                    self.encode_frame(kind)
                }
            }
            FailureMode::Kind(failing) if failing == kind => Err(
                PawdrobeError::generator(format!("mock cannot draw '{kind}' frames")),
            ),
            FailureMode::Kind(_) => self.encode_frame(kind),
            FailureMode::Garbage => Ok(b"definitely not a png".to_vec()),
        }
    }
}
