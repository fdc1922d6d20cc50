//! Background coverage analysis for finished frames
//!
//! Analysis never modifies pixels; it reports how much removable backdrop a
//! frame still carries so callers can decide whether to re-clean, flag, or
//! ship it. Fully transparent pixels are treated as already removed and are
//! skipped from every tally.

use crate::{
    segmentation::classify::{self, Shade},
    types::{FrameKind, FrameSet},
};
use image::RgbaImage;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Alpha value below which a pixel counts as already transparent
pub const VISIBLE_ALPHA_MIN: u8 = 128;

/// Edge coverage above which a frame is flagged (exclusive, percent)
pub const EDGE_ISSUE_THRESHOLD: f32 = 20.0;

/// Overall backdrop coverage above which a frame is flagged (exclusive, percent)
pub const BACKGROUND_ISSUE_THRESHOLD: f32 = 30.0;

/// Edge coverage (percent) at which confidence saturates at 1.0
pub const EDGE_CONFIDENCE_CEILING: f32 = 50.0;

/// Backdrop coverage (percent) at which confidence saturates at 1.0
pub const BACKGROUND_CONFIDENCE_CEILING: f32 = 60.0;

/// Dominant shade of the residual backdrop in a flagged frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundClassification {
    /// No issue detected
    Clean,
    /// Residual backdrop is predominantly white
    White,
    /// Residual backdrop is predominantly gray
    Gray,
}

impl fmt::Display for BackgroundClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Clean => "clean",
            Self::White => "white",
            Self::Gray => "gray",
        };
        f.write_str(name)
    }
}

/// Assessment of how much removable backdrop a frame still shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundAssessment {
    /// Whether the frame should be flagged for cleanup
    pub has_issue: bool,
    /// Dominant residual shade, [`Clean`](BackgroundClassification::Clean)
    /// when nothing is flagged
    pub classification: BackgroundClassification,
    /// Confidence in the flag, 0.0 when the frame is clean
    pub confidence: f32,
    /// Visible pixels examined (alpha at or above [`VISIBLE_ALPHA_MIN`])
    pub total_pixels: u64,
    /// Visible pixels inside the white or gray reporting band
    pub background_pixels: u64,
    /// Banded pixels as a percentage of visible pixels
    pub background_percentage: f32,
    /// Banded pixels sitting on the image border
    pub edge_background_pixels: u64,
    /// Banded border pixels as a percentage of the perimeter
    pub edge_background_percentage: f32,
}

impl BackgroundAssessment {
    /// Assessment for a frame with nothing to flag
    #[must_use]
    pub fn clean() -> Self {
        Self {
            has_issue: false,
            classification: BackgroundClassification::Clean,
            confidence: 0.0,
            total_pixels: 0,
            background_pixels: 0,
            background_percentage: 0.0,
            edge_background_pixels: 0,
            edge_background_percentage: 0.0,
        }
    }
}

impl Default for BackgroundAssessment {
    fn default() -> Self {
        Self::clean()
    }
}

/// Analyze how much removable backdrop a frame still carries.
///
/// Only pixels inside the white or gray reporting band count as backdrop
/// here; the looser rule the flood fill uses does not apply. Pixels with
/// alpha below [`VISIBLE_ALPHA_MIN`] are skipped entirely: they appear in no
/// tally, including the visible-pixel total the percentages are relative to.
/// Edge coverage is measured against the full perimeter pixel count
/// `2w + 2h - 4`, which collapses to zero for one-pixel-wide strips; both
/// ratios fall back to zero when their denominator does.
#[must_use]
pub fn analyze_background(image: &RgbaImage) -> BackgroundAssessment {
    let (width, height) = image.dimensions();

    let mut total_pixels: u64 = 0;
    let mut edge_background_pixels: u64 = 0;
    let mut white_count: u64 = 0;
    let mut gray_count: u64 = 0;

    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] < VISIBLE_ALPHA_MIN {
            continue;
        }
        total_pixels += 1;

        let shade = classify::shade_of(*pixel);
        match shade {
            Some(Shade::White) => white_count += 1,
            Some(Shade::Gray) => gray_count += 1,
            None => continue,
        }

        let on_edge = x == 0 || y == 0 || x + 1 == width || y + 1 == height;
        if on_edge {
            edge_background_pixels += 1;
        }
    }

    let background_pixels = white_count + gray_count;
    let background_percentage = if total_pixels == 0 {
        0.0
    } else {
        background_pixels as f32 / total_pixels as f32 * 100.0
    };

    // Perimeter pixel count; the -4 removes the double-counted corners
    let perimeter = 2 * u64::from(width) + 2 * u64::from(height);
    let perimeter = perimeter.saturating_sub(4);
    let edge_background_percentage = if perimeter == 0 {
        0.0
    } else {
        edge_background_pixels as f32 / perimeter as f32 * 100.0
    };

    let edge_issue = edge_background_percentage > EDGE_ISSUE_THRESHOLD;
    let background_issue = background_percentage > BACKGROUND_ISSUE_THRESHOLD;
    let has_issue = edge_issue || background_issue;

    let mut confidence: f32 = 0.0;
    if edge_issue {
        confidence =
            confidence.max((edge_background_percentage / EDGE_CONFIDENCE_CEILING).min(1.0));
    }
    if background_issue {
        confidence =
            confidence.max((background_percentage / BACKGROUND_CONFIDENCE_CEILING).min(1.0));
    }

    let classification = if has_issue {
        if white_count > gray_count {
            BackgroundClassification::White
        } else {
            BackgroundClassification::Gray
        }
    } else {
        BackgroundClassification::Clean
    };

    let assessment = BackgroundAssessment {
        has_issue,
        classification,
        confidence,
        total_pixels,
        background_pixels,
        background_percentage,
        edge_background_pixels,
        edge_background_percentage,
    };

    debug!(
        "Background analysis ({}x{}): {:.1}% backdrop, {:.1}% edge, issue={}, classification={}",
        width,
        height,
        assessment.background_percentage,
        assessment.edge_background_percentage,
        assessment.has_issue,
        assessment.classification
    );

    assessment
}

/// Analyze every standard frame of a finished set.
///
/// Each kind in [`FrameKind::ALL`] gets an entry. Frames that are missing
/// from the set, or whose bytes no longer decode, are reported as clean
/// rather than failing the whole batch.
#[must_use]
pub fn analyze_frame_set(frames: &FrameSet) -> HashMap<FrameKind, BackgroundAssessment> {
    let mut assessments = HashMap::with_capacity(FrameKind::ALL.len());

    for kind in FrameKind::ALL {
        let assessment = match frames.get(kind) {
            Some(frame) => match image::load_from_memory(&frame.png) {
                Ok(decoded) => analyze_background(&decoded.to_rgba8()),
                Err(err) => {
                    warn!("Frame '{kind}' no longer decodes, reporting it clean: {err}");
                    BackgroundAssessment::clean()
                }
            },
            None => BackgroundAssessment::clean(),
        };
        assessments.insert(kind, assessment);
    }

    assessments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FinishedFrame;
    use image::Rgba;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const GRAY: Rgba<u8> = Rgba([210, 210, 210, 255]);
    const DARK: Rgba<u8> = Rgba([40, 40, 40, 255]);
    const CLEAR: Rgba<u8> = Rgba([255, 255, 255, 0]);

    #[test]
    fn test_fully_white_frame_is_flagged_white() {
        let image = RgbaImage::from_pixel(10, 10, WHITE);
        let assessment = analyze_background(&image);

        assert!(assessment.has_issue);
        assert_eq!(assessment.total_pixels, 100);
        assert_eq!(assessment.background_pixels, 100);
        assert_eq!(assessment.background_percentage, 100.0);
        assert_eq!(assessment.edge_background_pixels, 36);
        assert_eq!(assessment.edge_background_percentage, 100.0);
        assert_eq!(assessment.confidence, 1.0);
        assert_eq!(assessment.classification, BackgroundClassification::White);
    }

    #[test]
    fn test_dark_frame_is_clean() {
        let image = RgbaImage::from_pixel(10, 10, DARK);
        let assessment = analyze_background(&image);

        assert!(!assessment.has_issue);
        assert_eq!(assessment.background_percentage, 0.0);
        assert_eq!(assessment.confidence, 0.0);
        assert_eq!(assessment.classification, BackgroundClassification::Clean);
    }

    #[test]
    fn test_gray_majority_classifies_gray() {
        let image = RgbaImage::from_pixel(10, 10, GRAY);
        let assessment = analyze_background(&image);

        assert!(assessment.has_issue);
        assert_eq!(assessment.classification, BackgroundClassification::Gray);
    }

    #[test]
    fn test_transparent_pixels_are_skipped() {
        // Backdrop-colored but fully transparent: nothing left to flag
        let image = RgbaImage::from_pixel(10, 10, CLEAR);
        let assessment = analyze_background(&image);

        assert!(!assessment.has_issue);
        assert_eq!(assessment.total_pixels, 0);
        assert_eq!(assessment.background_percentage, 0.0);
        assert_eq!(assessment.edge_background_percentage, 0.0);
    }

    #[test]
    fn test_dim_neutral_pixels_are_not_counted() {
        // Bright enough for the flood fill to remove, but below the gray
        // reporting band, so the analyzer sees no backdrop at all
        let dim = Rgba([170, 170, 170, 255]);
        assert!(classify::is_removable_background(dim));

        let image = RgbaImage::from_pixel(10, 10, dim);
        let assessment = analyze_background(&image);

        assert!(!assessment.has_issue);
        assert_eq!(assessment.background_pixels, 0);
        assert_eq!(assessment.edge_background_pixels, 0);
    }

    #[test]
    fn test_edge_threshold_is_strict() {
        // A 26x26 frame has a perimeter of exactly 100 pixels, so each
        // removable edge pixel is worth exactly one percent
        let mut image = RgbaImage::from_pixel(26, 26, DARK);
        for x in 0..20 {
            image.put_pixel(x, 0, WHITE);
        }
        let at_threshold = analyze_background(&image);
        assert_eq!(at_threshold.edge_background_pixels, 20);
        assert_eq!(at_threshold.edge_background_percentage, 20.0);
        assert!(!at_threshold.has_issue);

        image.put_pixel(20, 0, WHITE);
        let over_threshold = analyze_background(&image);
        assert_eq!(over_threshold.edge_background_percentage, 21.0);
        assert!(over_threshold.has_issue);
        assert_eq!(over_threshold.confidence, 21.0 / EDGE_CONFIDENCE_CEILING);
    }

    #[test]
    fn test_whitening_edge_pixels_never_lowers_the_signal() {
        let mut image = RgbaImage::from_pixel(26, 26, DARK);
        let mut previous = analyze_background(&image);

        for x in 0..26 {
            image.put_pixel(x, 0, WHITE);
            let current = analyze_background(&image);
            assert!(
                current.edge_background_percentage >= previous.edge_background_percentage,
                "edge percentage dropped after whitening pixel {x}"
            );
            assert!(
                current.confidence >= previous.confidence,
                "confidence dropped after whitening pixel {x}"
            );
            previous = current;
        }
    }

    #[test]
    fn test_interior_backdrop_triggers_coverage_issue() {
        // Dark border, white interior: no edge signal, strong coverage signal
        let mut image = RgbaImage::from_pixel(10, 10, WHITE);
        for x in 0..10 {
            image.put_pixel(x, 0, DARK);
            image.put_pixel(x, 9, DARK);
        }
        for y in 0..10 {
            image.put_pixel(0, y, DARK);
            image.put_pixel(9, y, DARK);
        }

        let assessment = analyze_background(&image);
        assert_eq!(assessment.edge_background_percentage, 0.0);
        assert_eq!(assessment.background_pixels, 64);
        assert_eq!(assessment.background_percentage, 64.0);
        assert!(assessment.has_issue);
        assert_eq!(
            assessment.confidence,
            (64.0_f32 / BACKGROUND_CONFIDENCE_CEILING).min(1.0)
        );
    }

    #[test]
    fn test_degenerate_strip_reports_zero_edge() {
        // 2w + 2h - 4 is zero for a 1x1 image, so the lone border pixel is
        // counted but contributes no edge percentage
        let image = RgbaImage::from_pixel(1, 1, WHITE);
        let assessment = analyze_background(&image);
        assert_eq!(assessment.edge_background_pixels, 1);
        assert_eq!(assessment.edge_background_percentage, 0.0);
        assert!(assessment.background_percentage > 0.0);
    }

    #[test]
    fn test_empty_image_is_clean() {
        let image = RgbaImage::new(0, 0);
        assert_eq!(analyze_background(&image), BackgroundAssessment::clean());
    }

    #[test]
    fn test_frame_set_analysis_covers_all_kinds() {
        let mut frames = FrameSet::new();
        let white = RgbaImage::from_pixel(8, 8, WHITE);
        frames.push(FinishedFrame::from_image(FrameKind::Normal, &white).unwrap());

        let assessments = analyze_frame_set(&frames);

        assert_eq!(assessments.len(), FrameKind::ALL.len());
        assert!(assessments[&FrameKind::Normal].has_issue);
        // Missing frames are reported clean, not errors
        assert!(!assessments[&FrameKind::Blink].has_issue);
        assert!(!assessments[&FrameKind::Wave].has_issue);
    }
}
