//! Image preparation ahead of recognition: grayscale, then auto-contrast.

use image::{DynamicImage, GenericImageView, GrayImage};
use tracing::debug;

use crate::error::ExtractionError;

/// Decode bytes and normalise them for Tesseract.
pub fn prepare(data: &[u8]) -> Result<GrayImage, ExtractionError> {
    let image = image::load_from_memory(data)
        .map_err(|e| ExtractionError::UnreadableImage(e.to_string()))?;
    let (width, height) = image.dimensions();
    debug!("Preprocessing {}x{} image", width, height);
    Ok(autocontrast(to_grayscale(&image)))
}

pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}

/// Stretch the intensity histogram so the darkest pixel is 0 and the
/// brightest is 255. Flat images are returned unchanged.
pub fn autocontrast(mut gray: GrayImage) -> GrayImage {
    let (lo, hi) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));

    if hi <= lo {
        return gray;
    }

    let range = (hi - lo) as u32;
    let lut: Vec<u8> = (0..=255u32)
        .map(|v| {
            let v = v.clamp(lo as u32, hi as u32);
            (((v - lo as u32) * 255 + range / 2) / range) as u8
        })
        .collect();

    for p in gray.pixels_mut() {
        p[0] = lut[p[0] as usize];
    }
    gray
}
