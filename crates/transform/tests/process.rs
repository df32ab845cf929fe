use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use transform::{
    Anchor, Layout, SourceFormat, TransformConfig, TransformError, Transformer, WatermarkSpec,
};

const GRAY: [u8; 3] = [120, 120, 120];

fn gray_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(GRAY)))
}

fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, format).expect("encode fixture");
    out.into_inner()
}

fn noisy_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        let v = x.wrapping_mul(2_654_435_761) ^ y.wrapping_mul(40_503);
        Rgb([v as u8, (v >> 8) as u8, (v >> 16) as u8])
    }))
}

/// Insert an APP1 Exif segment carrying `orientation` right after SOI.
fn with_exif_orientation(jpeg: &[u8], orientation: u8) -> Vec<u8> {
    let mut app1 = vec![0xFF, 0xE1, 0x00, 0x22];
    app1.extend_from_slice(b"Exif\0\0");
    app1.extend_from_slice(b"MM\0\x2A\0\0\0\x08");
    app1.extend_from_slice(&[0x00, 0x01]);
    app1.extend_from_slice(&[0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01]);
    app1.extend_from_slice(&[0x00, orientation, 0x00, 0x00]);
    app1.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&app1);
    out.extend_from_slice(&jpeg[2..]);
    out
}

fn transformer() -> Transformer {
    Transformer::new(TransformConfig::default()).expect("default config")
}

fn decode_output(data: &[u8]) -> RgbImage {
    let image = image::load_from_memory_with_format(data, ImageFormat::Jpeg).expect("valid jpeg");
    image.to_rgb8()
}

fn max_channel_diff(image: &RgbImage, x0: u32, y0: u32, x1: u32, y1: u32) -> u8 {
    let mut max = 0;
    for y in y0..y1 {
        for x in x0..x1 {
            let p = image.get_pixel(x, y);
            for c in 0..3 {
                max = max.max(p[c].abs_diff(GRAY[c]));
            }
        }
    }
    max
}

#[test]
fn every_supported_format_round_trips_to_jpeg() {
    let transformer = transformer();
    let cases = [
        (ImageFormat::Jpeg, SourceFormat::Jpeg, "image/jpeg"),
        (ImageFormat::Png, SourceFormat::Png, "image/png"),
        (ImageFormat::Gif, SourceFormat::Gif, "image/gif"),
        (ImageFormat::Bmp, SourceFormat::Bmp, "image/bmp"),
    ];

    for (format, expected, mime) in cases {
        let input = encode(&gray_image(300, 200), format);
        let output = transformer
            .process(&input, Some(mime))
            .unwrap_or_else(|e| panic!("{format:?} failed: {e}"));

        assert_eq!(output.source_format, expected);
        assert_eq!(output.content_type(), "image/jpeg");
        assert_eq!((output.width, output.height), (300, 200));
        assert_eq!(&output.data[..3], &[0xFF, 0xD8, 0xFF]);

        let decoded = decode_output(&output.data);
        assert_eq!(decoded.dimensions(), (300, 200), "{format:?}");
    }
}

#[test]
fn odd_and_tiny_dimensions_are_preserved() {
    let transformer = transformer();
    for (w, h) in [(1, 1), (3, 7), (17, 5), (641, 479)] {
        let input = encode(&gray_image(w, h), ImageFormat::Png);
        let output = transformer.process(&input, None).expect("process");
        assert_eq!(decode_output(&output.data).dimensions(), (w, h));
    }
}

#[test]
fn non_images_are_unsupported() {
    let transformer = transformer();

    let err = transformer
        .process(b"this is definitely not an image", Some("text/plain"))
        .unwrap_err();
    assert_eq!(
        err,
        TransformError::UnsupportedFormat {
            format: "unknown".into()
        }
    );
    assert_eq!(err.http_status_code(), 415);

    let webp = b"RIFF\x24\x00\x00\x00WEBPVP8 \x18\x00\x00\x00\x30\x01\x00\x9d\x01\x2a";
    let err = transformer.process(webp, Some("image/webp")).unwrap_err();
    assert_eq!(
        err,
        TransformError::UnsupportedFormat {
            format: "webp".into()
        }
    );

    let err = transformer
        .process(b"BMW is a car brand", Some("text/plain"))
        .unwrap_err();
    assert_eq!(
        err,
        TransformError::UnsupportedFormat {
            format: "unknown".into()
        }
    );
}

#[test]
fn truncated_images_fail_to_decode() {
    let transformer = transformer();

    let jpeg = encode(&gray_image(64, 64), ImageFormat::Jpeg);
    let err = transformer.process(&jpeg[..20], Some("image/jpeg")).unwrap_err();
    assert!(matches!(err, TransformError::DecodeFailure(_)), "{err:?}");
    assert_eq!(err.http_status_code(), 422);

    let png = encode(&gray_image(64, 64), ImageFormat::Png);
    let err = transformer.process(&png[..24], Some("image/png")).unwrap_err();
    assert!(matches!(err, TransformError::DecodeFailure(_)), "{err:?}");
}

#[test]
fn jpeg_cut_mid_scan_fails_to_decode() {
    let transformer = transformer();
    let jpeg = encode(&noisy_image(256, 256), ImageFormat::Jpeg);
    assert!(transformer.process(&jpeg, Some("image/jpeg")).is_ok());

    for cut in [jpeg.len() * 3 / 10, jpeg.len() / 2, jpeg.len() * 7 / 10, jpeg.len() - 2] {
        let err = transformer
            .process(&jpeg[..cut], Some("image/jpeg"))
            .unwrap_err();
        assert_eq!(err, TransformError::DecodeFailure("truncated JPEG".into()), "cut at {cut}");
        assert_eq!(err.http_status_code(), 422);
    }
}

#[test]
fn exif_orientation_rotates_the_output() {
    let jpeg = with_exif_orientation(&encode(&gray_image(300, 200), ImageFormat::Jpeg), 6);

    let output = transformer().process(&jpeg, Some("image/jpeg")).expect("oriented");
    assert_eq!((output.width, output.height), (200, 300));
    let decoded = decode_output(&output.data);
    assert_eq!(decoded.dimensions(), (200, 300));

    let config = TransformConfig {
        apply_exif_orientation: false,
        ..Default::default()
    };
    let output = Transformer::new(config)
        .expect("config")
        .process(&jpeg, Some("image/jpeg"))
        .expect("unoriented");
    assert_eq!((output.width, output.height), (300, 200));
}

#[test]
fn output_is_deterministic() {
    let transformer = transformer();
    let input = encode(&gray_image(400, 300), ImageFormat::Png);

    let first = transformer.process(&input, None).expect("first");
    let second = transformer.process(&input, None).expect("second");
    assert_eq!(first.data, second.data);

    let fresh = Transformer::new(TransformConfig::default()).expect("config");
    assert_eq!(fresh.process(&input, None).expect("third").data, first.data);
}

#[test]
fn watermark_is_visible_at_the_anchor() {
    let input = encode(&gray_image(640, 480), ImageFormat::Png);
    let output = transformer().process(&input, None).expect("process");
    let decoded = decode_output(&output.data);

    // Bottom-right quadrant carries the text.
    assert!(max_channel_diff(&decoded, 320, 240, 640, 480) > 60);
    // Top-left quadrant stays close to the input.
    assert!(max_channel_diff(&decoded, 0, 0, 320, 240) < 12);
}

#[test]
fn transparency_is_flattened_against_the_background() {
    let clear = DynamicImage::ImageRgba8(RgbaImage::from_pixel(200, 200, Rgba([0, 0, 0, 0])));
    let input = encode(&clear, ImageFormat::Png);

    let output = transformer().process(&input, None).expect("process");
    let decoded = decode_output(&output.data);
    let corner = decoded.get_pixel(5, 5);
    assert!(corner.0.iter().all(|&c| c >= 245), "{corner:?}");

    let red = TransformConfig::default().with_background(transform::Color::new(255, 0, 0));
    let output = Transformer::new(red)
        .expect("config")
        .process(&input, None)
        .expect("process");
    let corner = *decode_output(&output.data).get_pixel(5, 5);
    assert!(corner[0] >= 240 && corner[1] <= 15 && corner[2] <= 15, "{corner:?}");
}

#[test]
fn allowlist_and_size_limits_are_enforced() {
    let png = encode(&gray_image(64, 64), ImageFormat::Png);

    let jpeg_only = TransformConfig::default().with_allowed_formats(vec![SourceFormat::Jpeg]);
    let err = Transformer::new(jpeg_only)
        .expect("config")
        .process(&png, None)
        .unwrap_err();
    assert_eq!(
        err,
        TransformError::UnsupportedFormat {
            format: "png".into()
        }
    );

    let tiny_limit = TransformConfig::default().with_max_input_bytes(Some(16));
    let err = Transformer::new(tiny_limit)
        .expect("config")
        .process(&png, None)
        .unwrap_err();
    assert_eq!(
        err,
        TransformError::PayloadTooLarge {
            size: png.len(),
            limit: 16
        }
    );
    assert_eq!(err.http_status_code(), 413);
}

#[test]
fn pixel_budget_rejects_large_images() {
    let config = TransformConfig {
        max_pixels: 1_000,
        ..Default::default()
    };
    let input = encode(&gray_image(64, 64), ImageFormat::Bmp);
    let err = Transformer::new(config)
        .expect("config")
        .process(&input, None)
        .unwrap_err();
    assert!(matches!(
        err,
        TransformError::DimensionsExceeded {
            width: 64,
            height: 64,
            ..
        }
    ));
    assert!(err.is_client_error());
}

#[test]
fn per_request_text_overrides_the_default() {
    let transformer = transformer();
    let input = encode(&gray_image(500, 400), ImageFormat::Png);

    let default = transformer.process(&input, None).expect("default");
    let blank = transformer
        .process_with_text(&input, None, Some("  "))
        .expect("blank");
    let custom = transformer
        .process_with_text(&input, None, Some("CONFIDENTIAL"))
        .expect("custom");

    assert_eq!(default.data, blank.data);
    assert_ne!(default.data, custom.data);

    let err = transformer
        .process_with_text(&input, None, Some("line\nbreak"))
        .unwrap_err();
    assert!(matches!(err, TransformError::InvalidWatermarkText(_)));
}

#[test]
fn tiled_layout_covers_the_whole_image() {
    let config = TransformConfig::default().with_watermark(WatermarkSpec {
        layout: Layout::Tiled {
            spacing_x: 280,
            spacing_y: 200,
            stagger: true,
        },
        rotation_degrees: 30.0,
        ..Default::default()
    });
    let input = encode(&gray_image(800, 800), ImageFormat::Png);
    let output = Transformer::new(config)
        .expect("config")
        .process(&input, None)
        .expect("process");
    let decoded = decode_output(&output.data);

    for (x0, y0) in [(0, 0), (400, 0), (0, 400), (400, 400)] {
        assert!(
            max_channel_diff(&decoded, x0, y0, x0 + 400, y0 + 400) > 60,
            "quadrant at ({x0}, {y0}) has no watermark"
        );
    }
}

#[test]
fn anchor_moves_the_overlay() {
    let config = TransformConfig::default().with_watermark(WatermarkSpec {
        layout: Layout::Anchored {
            anchor: Anchor::TopLeft,
            margin: 8,
        },
        ..Default::default()
    });
    let input = encode(&gray_image(640, 480), ImageFormat::Png);
    let output = Transformer::new(config)
        .expect("config")
        .process(&input, None)
        .expect("process");
    let decoded = decode_output(&output.data);

    assert!(max_channel_diff(&decoded, 0, 0, 320, 240) > 60);
    assert!(max_channel_diff(&decoded, 320, 240, 640, 480) < 12);
}
