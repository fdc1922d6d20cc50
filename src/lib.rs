#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Pawdrobe
//!
//! A Rust library for finishing AI-generated outfit frames and running the
//! generation job queue behind a virtual-pet wardrobe.
//!
//! Image models paint outfits onto pets convincingly, but they return frames
//! on flat studio backdrops instead of transparent sprites. This library
//! detects that backdrop, removes the border-connected portion of it, and
//! manages the whole generate-finish-deliver cycle as asynchronous jobs with
//! retry, pacing, and subscriber notifications.
//!
//! ## Features
//!
//! - **Backdrop Segmentation**: Border flood fill that removes studio
//!   backdrops while preserving backdrop-colored pixels inside the subject
//! - **Background Analysis**: Per-frame reports on residual backdrop
//!   coverage, with confidence scores and a white/gray classification
//! - **Job Queue**: FIFO single-worker queue with pending/processing
//!   /completed/failed lifecycle and full-snapshot subscriber updates
//! - **Retry with Backoff**: Exponential backoff for transient generator
//!   failures (rate limits, quota, 5xx)
//! - **Wardrobe Delivery**: Completed outfits equip atomically through a
//!   pluggable [`WardrobeStore`]
//! - **Job Journal**: Optional JSONL persistence so queued work survives
//!   restarts
//! - **CLI Integration**: Optional command-line interface (enable with the
//!   `cli` feature)
//!
//! ## Quick Start
//!
//! ### Running the job queue
//!
//! ```rust,no_run
//! use pawdrobe::{
//!     FrameGenerator, ItemDescriptor, MemoryWardrobe, OutfitJobQueue, QueueConfig,
//! };
//! use std::sync::Arc;
//!
//! # async fn example(generator: Arc<dyn FrameGenerator>) -> anyhow::Result<()> {
//! // Wire the queue to a frame generator and a wardrobe store
//! let store = Arc::new(MemoryWardrobe::new());
//! let queue = OutfitJobQueue::new(generator, store, QueueConfig::default())?;
//!
//! // Watch every job transition as a newest-first snapshot
//! let subscription = queue.subscribe(|jobs| {
//!     for job in jobs {
//!         println!("{}: {}", job.display_name, job.status);
//!     }
//! });
//!
//! // Submit an outfit; the worker generates, finishes, and reports back
//! let items = vec![ItemDescriptor::new("item-7", "hat", "asset://hats/7", "Top Hat")];
//! let job_id = queue.submit("pet-1", "Birthday Look", items);
//! # drop(subscription);
//! # let _ = job_id;
//! # Ok(())
//! # }
//! ```
//!
//! ### Finishing a single frame
//!
//! ```rust,no_run
//! use pawdrobe::{finish_frame_from_bytes, FrameKind};
//!
//! # fn example(frame_bytes: Vec<u8>) -> anyhow::Result<()> {
//! let finished = finish_frame_from_bytes(&frame_bytes, FrameKind::Normal)?;
//! std::fs::write("normal.png", &finished.png)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Library vs CLI Usage
//!
//! This crate is designed to work seamlessly both as a library and as a CLI
//! application:
//!
//! - **Library Usage**: The segmentation pipeline and the job queue are
//!   available by default
//! - **CLI Usage**: Enable the `cli` feature for the `pawdrobe` binary and
//!   progress reporting
//!
//! ### Feature Flags
//!
//! - `cli` (default): Command-line interface and progress reporting
//! - `webp-support` (default): WebP image format support
//!
//! ### Library-Only Usage
//!
//! To use only as a library without CLI dependencies:
//!
//! ```toml
//! [dependencies]
//! pawdrobe = { version = "0.1", default-features = false }
//! ```

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod notify;
pub mod queue;
pub mod retry;
pub mod segmentation;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod wardrobe;

// Internal imports for lib functions
use tokio::io::AsyncRead;

// Public API exports
pub use config::{QueueConfig, QueueConfigBuilder};
pub use error::{PawdrobeError, Result};
pub use generator::{test_utils::MockFrameGenerator, FrameGenerator};
pub use notify::{CollectingNotifier, ConsoleNotifier, JobEvent, JobNotifier, NoOpNotifier};
pub use queue::{
    default_journal_path, derive_display_name, GenerationJob, JobId, JobJournal, JobStatus,
    OutfitJobQueue, Subscription,
};
pub use retry::{invoke_with_retry, RetryPolicy};
pub use segmentation::{
    analyze_background, analyze_frame_set, is_removable_background, remove_border_background,
    segment_background, shade_of, BackgroundAssessment, BackgroundClassification, Shade,
};
pub use services::FrameIOService;
pub use types::{
    AssetBundle, AssetRef, BackgroundMask, FinishedFrame, FrameKind, FrameSet, ImageRef,
    ItemDescriptor,
};
pub use wardrobe::{MemoryWardrobe, WardrobeStore};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, init_library_tracing, TracingConfig, TracingFormat};

/// Assess the backdrop of a frame provided as bytes
///
/// Decodes the image and reports how much removable backdrop remains, both
/// along the border and across the full frame. Pixels are only counted, never
/// modified, so this is safe to run on frames that are already finished.
///
/// # Arguments
///
/// * `image_bytes` - Raw image data as bytes (JPEG, PNG, WebP, BMP, TIFF)
///
/// # Returns
///
/// A [`BackgroundAssessment`] with coverage percentages, a confidence score,
/// and the dominant backdrop shade
///
/// # Examples
///
/// ```rust,no_run
/// use pawdrobe::assess_background_from_bytes;
///
/// # fn example(frame_bytes: Vec<u8>) -> anyhow::Result<()> {
/// let assessment = assess_background_from_bytes(&frame_bytes)?;
/// if assessment.has_issue {
///     println!(
///         "{:.1}% of the frame is backdrop",
///         assessment.background_percentage
///     );
/// }
/// # Ok(())
/// # }
/// ```
pub fn assess_background_from_bytes(image_bytes: &[u8]) -> Result<BackgroundAssessment> {
    let image = image::load_from_memory(image_bytes)
        .map_err(|e| PawdrobeError::decode(format!("Failed to decode image from bytes: {}", e)))?;
    Ok(analyze_background(&image.to_rgba8()))
}

/// Finish an outfit frame provided as bytes
///
/// This is a stream-based API that accepts image data as bytes, making it
/// suitable for web servers, memory-based processing, and scenarios where
/// files aren't available. The border-connected backdrop becomes transparent
/// and every remaining pixel is forced fully opaque, then the frame is
/// re-encoded as PNG and content-addressed.
///
/// # Arguments
///
/// * `image_bytes` - Raw image data as bytes (JPEG, PNG, WebP, BMP, TIFF)
/// * `kind` - Which outfit frame these bytes represent
///
/// # Returns
///
/// A [`FinishedFrame`] containing the cleaned PNG, its asset id, and its
/// dimensions
///
/// # Examples
///
/// ```rust,no_run
/// use pawdrobe::{finish_frame_from_bytes, FrameKind};
///
/// # fn example(upload_bytes: Vec<u8>) -> anyhow::Result<()> {
/// let finished = finish_frame_from_bytes(&upload_bytes, FrameKind::Blink)?;
/// println!("{} -> {}", finished.kind, finished.asset_id);
/// # Ok(())
/// # }
/// ```
pub fn finish_frame_from_bytes(image_bytes: &[u8], kind: FrameKind) -> Result<FinishedFrame> {
    let image = image::load_from_memory(image_bytes)
        .map_err(|e| PawdrobeError::decode(format!("Failed to decode image from bytes: {}", e)))?;
    finish_frame_from_image(image, kind)
}

/// Finish an outfit frame from a `DynamicImage` directly
///
/// This is the most flexible API for in-memory finishing. It accepts a
/// pre-loaded `DynamicImage` and processes it without any decoding or file
/// I/O of its own.
///
/// # Arguments
///
/// * `image` - A `DynamicImage` to finish (from the image crate)
/// * `kind` - Which outfit frame the image represents
///
/// # Returns
///
/// A [`FinishedFrame`] containing the cleaned PNG, its asset id, and its
/// dimensions
pub fn finish_frame_from_image(
    image: image::DynamicImage,
    kind: FrameKind,
) -> Result<FinishedFrame> {
    let cleaned = remove_border_background(&image.to_rgba8())?;
    FinishedFrame::from_image(kind, &cleaned)
}

/// Finish an outfit frame only when its assessment flags an issue
///
/// Runs the analyzer first and skips segmentation entirely for frames that
/// are already clean, returning `None` so callers can keep the original
/// bytes and any asset references pointing at them.
///
/// # Arguments
///
/// * `image_bytes` - Raw image data as bytes (JPEG, PNG, WebP, BMP, TIFF)
/// * `kind` - Which outfit frame these bytes represent
///
/// # Returns
///
/// `Some(FinishedFrame)` when the frame needed cleaning, `None` when it was
/// already clean
///
/// # Examples
///
/// ```rust,no_run
/// use pawdrobe::{finish_frame_if_needed, FrameKind};
///
/// # fn example(frame_bytes: Vec<u8>) -> anyhow::Result<()> {
/// match finish_frame_if_needed(&frame_bytes, FrameKind::Normal)? {
///     Some(finished) => std::fs::write("normal.png", &finished.png)?,
///     None => println!("frame already clean, keeping the original"),
/// }
/// # Ok(())
/// # }
/// ```
pub fn finish_frame_if_needed(
    image_bytes: &[u8],
    kind: FrameKind,
) -> Result<Option<FinishedFrame>> {
    let image = image::load_from_memory(image_bytes)
        .map_err(|e| PawdrobeError::decode(format!("Failed to decode image from bytes: {}", e)))?;
    let rgba = image.to_rgba8();

    if !analyze_background(&rgba).has_issue {
        return Ok(None);
    }

    let cleaned = remove_border_background(&rgba)?;
    FinishedFrame::from_image(kind, &cleaned).map(Some)
}

/// Finish an outfit frame from an async reader stream
///
/// Accepts any async readable stream, making it suitable for frames arriving
/// from network responses, large files, or any other async data source.
///
/// # Arguments
///
/// * `reader` - Any type implementing `AsyncRead + Unpin`
/// * `kind` - Which outfit frame the stream carries
///
/// # Returns
///
/// A [`FinishedFrame`] containing the cleaned PNG, its asset id, and its
/// dimensions
///
/// # Examples
///
/// ```rust,no_run
/// use pawdrobe::{finish_frame_from_reader, FrameKind};
/// use tokio::fs::File;
///
/// # async fn example() -> anyhow::Result<()> {
/// let file = File::open("raw_frame.png").await?;
/// let finished = finish_frame_from_reader(file, FrameKind::Normal).await?;
/// std::fs::write("normal.png", &finished.png)?;
/// # Ok(())
/// # }
/// ```
pub async fn finish_frame_from_reader<R: AsyncRead + Unpin>(
    mut reader: R,
    kind: FrameKind,
) -> Result<FinishedFrame> {
    let mut buffer = Vec::new();
    tokio::io::AsyncReadExt::read_to_end(&mut reader, &mut buffer)
        .await
        .map_err(|e| PawdrobeError::decode(format!("Failed to read from stream: {}", e)))?;

    finish_frame_from_bytes(&buffer, kind)
}
