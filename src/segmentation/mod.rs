//! Background segmentation, classification, and analysis
//!
//! Three layers, from pixel to frame set: [`classify`] holds the per-pixel
//! backdrop rules, [`segmenter`] turns border-connected backdrop into a
//! transparency mask, and [`analyzer`] reports residual backdrop coverage
//! without touching pixels.

pub mod analyzer;
pub mod classify;
pub mod segmenter;

pub use analyzer::{
    analyze_background, analyze_frame_set, BackgroundAssessment, BackgroundClassification,
};
pub use classify::{is_removable_background, shade_of, Shade};
pub use segmenter::{remove_border_background, segment_background};
