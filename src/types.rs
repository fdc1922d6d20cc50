//! Core types for outfit frame finishing

use crate::error::{PawdrobeError, Result};
use image::RgbaImage;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Identifier for one frame of a generated outfit
///
/// Every job produces a base [`Normal`](FrameKind::Normal) frame first; the
/// animation frames are generated afterwards from that base so the outfit
/// stays visually consistent across the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    /// The neutral base pose
    Normal,
    /// Eyes-closed blink frame
    Blink,
    /// Smiling frame
    Smile,
    /// Waving frame
    Wave,
}

impl FrameKind {
    /// All frame kinds, base pose first
    pub const ALL: [Self; 4] = [Self::Normal, Self::Blink, Self::Smile, Self::Wave];

    /// Stable lowercase name used in logs, journals, and file names
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Blink => "blink",
            Self::Smile => "smile",
            Self::Wave => "wave",
        }
    }

    /// Whether this is the base pose the animation frames derive from
    #[must_use]
    pub const fn is_base(&self) -> bool {
        matches!(self, Self::Normal)
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FrameKind {
    type Err = PawdrobeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "normal" => Ok(Self::Normal),
            "blink" => Ok(Self::Blink),
            "smile" => Ok(Self::Smile),
            "wave" => Ok(Self::Wave),
            other => Err(PawdrobeError::invalid_config(format!(
                "Unknown frame kind: {other}"
            ))),
        }
    }
}

/// Reference to the source image a frame is generated from
///
/// The generator resolves entity references itself; inline bytes are handed
/// over verbatim, which is how animation frames are derived from the finished
/// base frame without another round trip through storage.
#[derive(Clone)]
pub enum ImageRef {
    /// Stable identifier of an entity whose current portrait the generator resolves
    Entity(String),
    /// Content address of a previously finished frame
    Asset(String),
    /// Raw encoded image bytes
    Inline(Vec<u8>),
}

impl fmt::Debug for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(id) => f.debug_tuple("Entity").field(id).finish(),
            Self::Asset(id) => f.debug_tuple("Asset").field(id).finish(),
            Self::Inline(bytes) => f
                .debug_tuple("Inline")
                .field(&format!("{} bytes", bytes.len()))
                .finish(),
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(id) => write!(f, "entity:{id}"),
            Self::Asset(id) => write!(f, "asset:{id}"),
            Self::Inline(bytes) => write!(f, "inline:{} bytes", bytes.len()),
        }
    }
}

/// A single outfit item included in a generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDescriptor {
    /// Catalog identifier of the item
    pub item_id: String,
    /// Wardrobe slot the item occupies (e.g. "hat", "shirt")
    pub slot: String,
    /// Reference to the item's own product image
    pub image_ref: String,
    /// Human-readable item name for notifications and logs
    pub name: String,
}

impl ItemDescriptor {
    /// Create a new item descriptor
    #[must_use]
    pub fn new(
        item_id: impl Into<String>,
        slot: impl Into<String>,
        image_ref: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            slot: slot.into(),
            image_ref: image_ref.into(),
            name: name.into(),
        }
    }

    /// Check that the fields the generator and wardrobe need are present.
    ///
    /// The display name may be empty; identifiers and the image reference
    /// may not.
    pub fn validate(&self) -> Result<()> {
        if self.item_id.is_empty() {
            return Err(PawdrobeError::invalid_items("item_id must not be empty"));
        }
        if self.slot.is_empty() {
            return Err(PawdrobeError::invalid_items(format!(
                "item '{}' has an empty slot",
                self.item_id
            )));
        }
        if self.image_ref.is_empty() {
            return Err(PawdrobeError::invalid_items(format!(
                "item '{}' has an empty image reference",
                self.item_id
            )));
        }
        Ok(())
    }
}

/// Binary background mask produced by the border flood fill
///
/// `true` marks a pixel as background to hide. The grid is stored in
/// (row, column) order, matching the scanline layout of the source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundMask {
    mask: Array2<bool>,
}

impl BackgroundMask {
    /// Wrap a background flag grid in (row, column) order
    #[must_use]
    pub fn new(mask: Array2<bool>) -> Self {
        Self { mask }
    }

    /// Mask dimensions as (width, height)
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        let (rows, cols) = self.mask.dim();
        (cols as u32, rows as u32)
    }

    /// Whether the pixel at (x, y) was classified as background.
    ///
    /// Out-of-range coordinates report `false`.
    #[must_use]
    pub fn is_background(&self, x: u32, y: u32) -> bool {
        self.mask
            .get((y as usize, x as usize))
            .copied()
            .unwrap_or(false)
    }

    /// Number of pixels flagged as background
    #[must_use]
    pub fn background_pixels(&self) -> usize {
        self.mask.iter().filter(|&&b| b).count()
    }

    /// Borrow the underlying flag grid
    #[must_use]
    pub fn as_array(&self) -> &Array2<bool> {
        &self.mask
    }

    /// Apply the mask to an RGBA image.
    ///
    /// Background pixels get alpha 0; every other pixel is forced fully
    /// opaque, so stray semi-transparency from the generator does not
    /// survive into the finished frame.
    pub fn apply_to_image(&self, image: &mut RgbaImage) -> Result<()> {
        let (img_width, img_height) = image.dimensions();
        let (mask_width, mask_height) = self.dimensions();

        if img_width != mask_width || img_height != mask_height {
            return Err(PawdrobeError::internal(format!(
                "Image ({img_width}x{img_height}) and mask ({mask_width}x{mask_height}) dimensions do not match"
            )));
        }

        for (x, y, pixel) in image.enumerate_pixels_mut() {
            let background = self
                .mask
                .get((y as usize, x as usize))
                .copied()
                .unwrap_or(false);
            pixel[3] = if background { 0 } else { 255 };
        }

        Ok(())
    }
}

/// A finished outfit frame: encoded bytes plus content address
#[derive(Clone, PartialEq, Eq)]
pub struct FinishedFrame {
    /// Which frame of the outfit this is
    pub kind: FrameKind,
    /// PNG-encoded image with the background alpha applied
    pub png: Vec<u8>,
    /// SHA-256 hex digest of the PNG bytes
    pub asset_id: String,
    /// Frame dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl FinishedFrame {
    /// Encode an RGBA image as PNG and derive its content address
    pub fn from_image(kind: FrameKind, image: &RgbaImage) -> Result<Self> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        image.write_to(&mut cursor, image::ImageFormat::Png)?;

        let asset_id = format!("{:x}", Sha256::digest(&buffer));

        Ok(Self {
            kind,
            png: buffer,
            asset_id,
            dimensions: image.dimensions(),
        })
    }

    /// Lightweight reference suitable for job records and notifications
    #[must_use]
    pub fn asset_ref(&self) -> AssetRef {
        AssetRef {
            kind: self.kind,
            asset_id: self.asset_id.clone(),
            width: self.dimensions.0,
            height: self.dimensions.1,
        }
    }
}

impl fmt::Debug for FinishedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinishedFrame")
            .field("kind", &self.kind)
            .field("png", &format!("{} bytes", self.png.len()))
            .field("asset_id", &self.asset_id)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

/// The complete set of finished frames for one generation job
#[derive(Debug, Clone, Default)]
pub struct FrameSet {
    frames: Vec<FinishedFrame>,
}

impl FrameSet {
    /// Create an empty frame set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a frame, replacing any existing frame of the same kind
    pub fn push(&mut self, frame: FinishedFrame) {
        self.frames.retain(|f| f.kind != frame.kind);
        self.frames.push(frame);
    }

    /// Look up a frame by kind
    #[must_use]
    pub fn get(&self, kind: FrameKind) -> Option<&FinishedFrame> {
        self.frames.iter().find(|f| f.kind == kind)
    }

    /// Number of frames in the set
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the set holds no frames
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Iterate over the frames in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &FinishedFrame> {
        self.frames.iter()
    }

    /// Content-addressed references for every frame in the set
    #[must_use]
    pub fn bundle(&self) -> AssetBundle {
        AssetBundle {
            assets: self.frames.iter().map(FinishedFrame::asset_ref).collect(),
        }
    }
}

/// Lightweight content-addressed reference to one finished frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    /// Which frame this reference points at
    pub kind: FrameKind,
    /// SHA-256 hex digest of the frame's PNG bytes
    pub asset_id: String,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
}

/// References for every frame of a completed job, carried on the job record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetBundle {
    /// One reference per finished frame, base pose first
    pub assets: Vec<AssetRef>,
}

impl AssetBundle {
    /// Look up the reference for a frame kind
    #[must_use]
    pub fn get(&self, kind: FrameKind) -> Option<&AssetRef> {
        self.assets.iter().find(|a| a.kind == kind)
    }

    /// Number of frames in the bundle
    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether the bundle holds no frames
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
