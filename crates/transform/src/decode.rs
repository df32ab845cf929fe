//! Decoding of sniffed input into an RGBA buffer.
//!
//! Dimensions are checked from the header before any pixel data is
//! allocated, so oversized images are rejected cheaply. JPEG input must
//! also carry its end-of-image marker; the decoder would otherwise pad a
//! cut-off scan with grey and report success.

use std::io::Cursor;

use image::error::ImageError;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader, RgbaImage};
use tracing::debug;

use crate::config::TransformConfig;
use crate::error::TransformError;
use crate::format::SourceFormat;

/// Decode `data` as `format` into 8-bit RGBA.
///
/// Animated GIFs yield their first frame. When
/// [`TransformConfig::apply_exif_orientation`] is set, the EXIF orientation
/// is applied, which swaps width and height for 90 and 270 degree rotations.
pub fn decode_rgba(
    data: &[u8],
    format: SourceFormat,
    config: &TransformConfig,
) -> Result<RgbaImage, TransformError> {
    if format == SourceFormat::Jpeg && !jpeg_is_complete(data) {
        return Err(TransformError::DecodeFailure("truncated JPEG".to_string()));
    }

    let reader = ImageReader::with_format(Cursor::new(data), format.into());
    let mut decoder = reader.into_decoder().map_err(decode_error)?;

    let (width, height) = decoder.dimensions();
    check_dimensions(width, height, config)?;

    let orientation = if config.apply_exif_orientation {
        // A broken EXIF block is not worth failing the request over.
        decoder.orientation().unwrap_or(Orientation::NoTransforms)
    } else {
        Orientation::NoTransforms
    };

    let mut image = DynamicImage::from_decoder(decoder).map_err(|e| match e {
        ImageError::Limits(limit) => TransformError::DimensionsExceeded {
            width,
            height,
            limit: limit.to_string(),
        },
        other => decode_error(other),
    })?;

    if orientation != Orientation::NoTransforms {
        debug!(?orientation, "applying exif orientation");
        image.apply_orientation(orientation);
    }

    Ok(image.into_rgba8())
}

fn check_dimensions(width: u32, height: u32, config: &TransformConfig) -> Result<(), TransformError> {
    if width == 0 || height == 0 {
        return Err(TransformError::DecodeFailure(format!(
            "image has zero-sized dimensions {width}x{height}"
        )));
    }
    if width > config.max_dimension || height > config.max_dimension {
        return Err(TransformError::DimensionsExceeded {
            width,
            height,
            limit: format!("max dimension {}", config.max_dimension),
        });
    }
    let pixels = u64::from(width) * u64::from(height);
    if pixels > config.max_pixels {
        return Err(TransformError::DimensionsExceeded {
            width,
            height,
            limit: format!("max pixels {}", config.max_pixels),
        });
    }
    Ok(())
}

/// Whether the entropy-coded data after the first start-of-scan is
/// followed by an `FF D9` end-of-image marker.
///
/// Marker segments before the scan are skipped by length, so an EOI inside
/// an embedded EXIF thumbnail does not count. Trailing bytes after the
/// marker are allowed.
fn jpeg_is_complete(data: &[u8]) -> bool {
    const SOS: u8 = 0xDA;
    const EOI: u8 = 0xD9;

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            return false;
        }
        let marker = data[pos + 1];
        match marker {
            // Fill bytes before a marker.
            0xFF => pos += 1,
            EOI => return true,
            0x01 | 0xD0..=0xD7 => pos += 2,
            _ => {
                let Some(len) = data
                    .get(pos + 2..pos + 4)
                    .map(|b| usize::from(u16::from_be_bytes([b[0], b[1]])))
                else {
                    return false;
                };
                let segment_end = pos + 2 + len;
                if marker == SOS {
                    return data
                        .get(segment_end..)
                        .is_some_and(|scan| scan.windows(2).any(|w| w == [0xFF, EOI]));
                }
                pos = segment_end;
            }
        }
    }
    false
}

fn decode_error(err: ImageError) -> TransformError {
    TransformError::DecodeFailure(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 128]));
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn decodes_png_preserving_alpha() {
        let data = png(7, 5);
        let image = decode_rgba(&data, SourceFormat::Png, &TransformConfig::default()).unwrap();
        assert_eq!(image.dimensions(), (7, 5));
        assert_eq!(*image.get_pixel(3, 3), Rgba([10, 20, 30, 128]));
    }

    #[test]
    fn rejects_oversized_dimensions_before_decoding() {
        let data = png(40, 10);
        let config = TransformConfig {
            max_dimension: 32,
            ..Default::default()
        };
        let err = decode_rgba(&data, SourceFormat::Png, &config).unwrap_err();
        assert!(matches!(
            err,
            TransformError::DimensionsExceeded {
                width: 40,
                height: 10,
                ..
            }
        ));

        let config = TransformConfig {
            max_pixels: 399,
            ..Default::default()
        };
        let err = decode_rgba(&data, SourceFormat::Png, &config).unwrap_err();
        assert!(matches!(err, TransformError::DimensionsExceeded { .. }));
    }

    fn noisy_jpeg(width: u32, height: u32) -> Vec<u8> {
        let image = image::RgbImage::from_fn(width, height, |x, y| {
            let v = x.wrapping_mul(2_654_435_761) ^ y.wrapping_mul(40_503);
            image::Rgb([v as u8, (v >> 8) as u8, (v >> 16) as u8])
        });
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Jpeg).unwrap();
        out.into_inner()
    }

    #[test]
    fn complete_jpeg_passes_the_eoi_check() {
        let data = noisy_jpeg(64, 48);
        assert!(jpeg_is_complete(&data));

        let mut padded = data.clone();
        padded.extend_from_slice(&[0, 0, 0, 0]);
        assert!(jpeg_is_complete(&padded));
    }

    #[test]
    fn jpeg_cut_inside_the_scan_is_a_decode_failure() {
        let data = noisy_jpeg(256, 256);
        let config = TransformConfig::default();

        for cut in [data.len() * 3 / 10, data.len() / 2, data.len() * 9 / 10, data.len() - 2] {
            let err = decode_rgba(&data[..cut], SourceFormat::Jpeg, &config).unwrap_err();
            assert_eq!(err, TransformError::DecodeFailure("truncated JPEG".to_string()));
        }
    }

    #[test]
    fn eoi_in_an_app_segment_does_not_count() {
        let data = noisy_jpeg(32, 32);
        // APP1 segment whose payload contains FF D9, inserted after SOI.
        let mut with_app = vec![0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x06, 0xFF, 0xD9, 0x00, 0x00];
        with_app.extend_from_slice(&data[2..]);
        assert!(jpeg_is_complete(&with_app));

        let cut = with_app.len() / 2;
        assert!(!jpeg_is_complete(&with_app[..cut]));
    }

    #[test]
    fn truncated_header_is_a_decode_failure() {
        let data = png(16, 16);
        let err = decode_rgba(&data[..20], SourceFormat::Png, &TransformConfig::default())
            .unwrap_err();
        assert!(matches!(err, TransformError::DecodeFailure(_)));
    }
}
