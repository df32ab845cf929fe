//! JPEG encoding.

use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage, RgbaImage};

use crate::config::Color;
use crate::error::TransformError;

/// Composite `rgba` over an opaque `background`, dropping the alpha channel.
pub fn flatten(rgba: &RgbaImage, background: Color) -> RgbImage {
    let bg = [background.r, background.g, background.b];
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let p = rgba.get_pixel(x, y);
        let a = u32::from(p[3]);
        let mix = |fg: u8, bg: u8| -> u8 {
            ((u32::from(fg) * a + u32::from(bg) * (255 - a) + 127) / 255) as u8
        };
        Rgb([mix(p[0], bg[0]), mix(p[1], bg[1]), mix(p[2], bg[2])])
    })
}

/// Flatten and encode as baseline JPEG at `quality`.
pub fn encode_jpeg(
    rgba: &RgbaImage,
    background: Color,
    quality: u8,
) -> Result<Vec<u8>, TransformError> {
    let rgb = flatten(rgba, background);
    let mut out = Vec::with_capacity(rgb.as_raw().len() / 8);
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode_image(&rgb)
        .map_err(|e| TransformError::EncodeFailure(e.to_string()))?;
    Ok(out)
}
