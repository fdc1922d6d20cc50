//! Frame generator abstraction
//!
//! The image model that paints outfits onto pets is an external service and
//! lives behind this trait. The queue only ever sees encoded bytes coming
//! back; decoding, background cleanup, and delivery are handled on this side
//! of the seam.

pub mod test_utils;

use crate::{
    error::Result,
    types::{FrameKind, ImageRef, ItemDescriptor},
};
use async_trait::async_trait;

/// Trait for outfit frame generators
#[async_trait]
pub trait FrameGenerator: Send + Sync {
    /// Generate one outfit frame and return its encoded image bytes.
    ///
    /// `base` is the image the frame derives from: the pet's current
    /// portrait for the base pose, or the finished base frame when an
    /// animation frame is requested. The bytes come back exactly as the
    /// model produced them.
    ///
    /// # Errors
    /// - Transient provider failures (rate limits, overload, 5xx), which
    ///   callers may retry
    /// - Permanent request failures (rejected prompts, invalid references)
    async fn generate_frame(
        &self,
        items: &[ItemDescriptor],
        base: &ImageRef,
        kind: FrameKind,
    ) -> Result<Vec<u8>>;
}
