use std::hint::black_box;
use std::io::Cursor;

use criterion::{Criterion, criterion_group, criterion_main};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use watermark_processor::{
    Layout, TransformConfig, Transformer, WatermarkSpec, process_image,
};

fn photo(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut out, format)
        .expect("encode bench fixture");
    out.into_inner()
}

fn anchored_bench(c: &mut Criterion) {
    let transformer = Transformer::new(TransformConfig::default()).expect("default config");
    let jpeg = photo(1920, 1080, ImageFormat::Jpeg);

    c.bench_function("process_jpeg_1080p_anchored", |b| {
        b.iter(|| {
            let out = process_image(&transformer, black_box(&jpeg), Some("image/jpeg"), None)
                .expect("bench process");
            black_box(out);
        });
    });
}

fn tiled_bench(c: &mut Criterion) {
    let config = TransformConfig::default().with_watermark(WatermarkSpec {
        layout: Layout::Tiled {
            spacing_x: 280,
            spacing_y: 200,
            stagger: true,
        },
        rotation_degrees: 30.0,
        ..Default::default()
    });
    let transformer = Transformer::new(config).expect("tiled config");
    let png = photo(1920, 1080, ImageFormat::Png);

    c.bench_function("process_png_1080p_tiled", |b| {
        b.iter(|| {
            let out = process_image(&transformer, black_box(&png), Some("image/png"), None)
                .expect("bench process");
            black_box(out);
        });
    });
}

criterion_group!(benches, anchored_bench, tiled_bench);
criterion_main!(benches);
