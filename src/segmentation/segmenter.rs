//! Border-seeded background segmentation
//!
//! The generator paints outfits on a light neutral backdrop. Segmentation
//! walks inward from the image border and claims every connected
//! backdrop-colored pixel, producing a mask the finishing step turns into
//! transparency. Backdrop-colored regions fully enclosed by the subject
//! (white eyes, light fur) are never border-connected and survive untouched.

use crate::{error::Result, segmentation::classify, types::BackgroundMask};
use image::RgbaImage;
use log::debug;
use ndarray::Array2;

/// Segment the removable backdrop connected to the image border.
///
/// Every border pixel seeds an iterative 4-connected flood fill. A pixel
/// joins the mask only when its color passes
/// [`classify::is_removable_background`]; the fill does not cross pixels
/// that fail it.
#[must_use]
pub fn segment_background(image: &RgbaImage) -> BackgroundMask {
    let (width, height) = image.dimensions();
    let mut mask = Array2::from_elem((height as usize, width as usize), false);

    if width == 0 || height == 0 {
        return BackgroundMask::new(mask);
    }

    let mut visited = Array2::from_elem((height as usize, width as usize), false);
    let mut stack: Vec<(u32, u32)> = Vec::with_capacity(2 * (width + height) as usize);

    for x in 0..width {
        stack.push((x, 0));
        stack.push((x, height - 1));
    }
    for y in 0..height {
        stack.push((0, y));
        stack.push((width - 1, y));
    }

    while let Some((x, y)) = stack.pop() {
        let idx = (y as usize, x as usize);
        if visited[idx] {
            continue;
        }
        visited[idx] = true;

        if !classify::is_removable_background(*image.get_pixel(x, y)) {
            continue;
        }
        mask[idx] = true;

        if x > 0 {
            stack.push((x - 1, y));
        }
        if x + 1 < width {
            stack.push((x + 1, y));
        }
        if y > 0 {
            stack.push((x, y - 1));
        }
        if y + 1 < height {
            stack.push((x, y + 1));
        }
    }

    let mask = BackgroundMask::new(mask);
    debug!(
        "Segmented {} of {} pixels as border-connected backdrop ({}x{})",
        mask.background_pixels(),
        (width as usize) * (height as usize),
        width,
        height
    );
    mask
}

/// Remove the border-connected backdrop from a frame.
///
/// Returns a copy of the image with alpha 0 on masked pixels and full
/// opacity everywhere else; color channels are preserved.
pub fn remove_border_background(image: &RgbaImage) -> Result<RgbaImage> {
    let mask = segment_background(image);
    let mut cleaned = image.clone();
    mask.apply_to_image(&mut cleaned)?;
    Ok(cleaned)
}
