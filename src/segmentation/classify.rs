//! Pixel classification rules for outfit backgrounds
//!
//! Generated outfit frames arrive on a light, near-neutral backdrop. These
//! rules decide which pixels belong to that backdrop and which reporting band
//! (white or gray) a backdrop pixel falls into. All rules look at the color
//! channels only; alpha is handled by the callers.

use image::Rgba;

/// Maximum absolute difference between any two color channels for a pixel
/// to count as near-neutral (exclusive bound)
pub const CHANNEL_CLOSENESS_MAX: u8 = 30;

/// Minimum per-channel mean brightness for a near-neutral pixel to count as
/// removable backdrop
pub const REMOVABLE_BRIGHTNESS_MIN: u16 = 150;

/// Minimum channel value for the white reporting band
pub const WHITE_CHANNEL_MIN: u8 = 240;

/// Minimum channel value for the gray reporting band (upper bound is
/// [`WHITE_CHANNEL_MIN`], exclusive)
pub const GRAY_CHANNEL_MIN: u8 = 200;

/// Reporting band for a backdrop-colored pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shade {
    /// All channels at or above [`WHITE_CHANNEL_MIN`]
    White,
    /// All channels within the gray band
    Gray,
}

/// Whether a pixel is removable backdrop: near-neutral and bright.
///
/// Near-neutral means every pair of color channels differs by less than
/// [`CHANNEL_CLOSENESS_MAX`]; bright means the channel mean is at least
/// [`REMOVABLE_BRIGHTNESS_MIN`]. The mean comparison is exact, done on the
/// channel sum rather than a rounded average.
#[must_use]
pub fn is_removable_background(pixel: Rgba<u8>) -> bool {
    let [r, g, b, _] = pixel.0;

    let near_neutral = r.abs_diff(g) < CHANNEL_CLOSENESS_MAX
        && g.abs_diff(b) < CHANNEL_CLOSENESS_MAX
        && r.abs_diff(b) < CHANNEL_CLOSENESS_MAX;
    if !near_neutral {
        return false;
    }

    let channel_sum = u16::from(r) + u16::from(g) + u16::from(b);
    channel_sum >= REMOVABLE_BRIGHTNESS_MIN * 3
}

/// Reporting band of a pixel, if it sits in one.
///
/// White takes precedence; a pixel qualifies for gray only when every
/// channel is inside `[GRAY_CHANNEL_MIN, WHITE_CHANNEL_MIN)`. Pixels with
/// channels straddling the bands belong to neither.
#[must_use]
pub fn shade_of(pixel: Rgba<u8>) -> Option<Shade> {
    let [r, g, b, _] = pixel.0;

    if r >= WHITE_CHANNEL_MIN && g >= WHITE_CHANNEL_MIN && b >= WHITE_CHANNEL_MIN {
        return Some(Shade::White);
    }

    let in_gray_band = |c: u8| (GRAY_CHANNEL_MIN..WHITE_CHANNEL_MIN).contains(&c);
    if in_gray_band(r) && in_gray_band(g) && in_gray_band(b) {
        return Some(Shade::Gray);
    }

    None
}
