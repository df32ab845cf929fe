//! Text overlay rendering.
//!
//! Renders a line of text into a transparent RGBA image: an outline stroke
//! underneath, the fill on top, optionally rotated. The result already has
//! the configured opacities baked into its alpha channel, so the compositor
//! only has to blend it.

use std::path::Path;

use ab_glyph::{point, Font, FontArc, GlyphId, PxScale, ScaleFont};
use image::{imageops, Rgba, RgbaImage};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};

use crate::config::{Color, ConfigError};

/// DejaVu Sans, used when no font file is configured.
/// License: see `fonts/LICENSE-DejaVu.txt`.
const EMBEDDED_FONT: &[u8] = include_bytes!("fonts/DejaVuSans.ttf");

/// Visual parameters for a single render.
#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    pub font_px: f32,
    pub fill: Color,
    pub fill_opacity: f32,
    pub stroke: Color,
    pub stroke_opacity: f32,
    /// Outline radius in pixels; 0 disables the outline.
    pub stroke_px: u32,
    /// Clockwise rotation.
    pub rotation_degrees: f32,
}

/// Glyph rasterizer bound to one font.
#[derive(Clone)]
pub struct TextRenderer {
    font: FontArc,
}

impl std::fmt::Debug for TextRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRenderer")
            .field("glyphs", &self.font.glyph_count())
            .finish()
    }
}

impl TextRenderer {
    /// Renderer using the embedded DejaVu Sans.
    pub fn embedded() -> Result<Self, ConfigError> {
        let font = FontArc::try_from_slice(EMBEDDED_FONT)
            .map_err(|e| ConfigError::Font(format!("embedded font: {e}")))?;
        Ok(Self { font })
    }

    /// Renderer using a font file read from disk.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read(path)
            .map_err(|e| ConfigError::Font(format!("{}: {e}", path.display())))?;
        let font = FontArc::try_from_vec(data)
            .map_err(|e| ConfigError::Font(format!("{}: {e}", path.display())))?;
        Ok(Self { font })
    }

    /// Font file when given, embedded font otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::embedded(),
        }
    }

    /// Width and height in pixels of `text` set at `font_px`, without outline.
    pub fn measure(&self, text: &str, font_px: f32) -> (u32, u32) {
        let scaled = self.font.as_scaled(PxScale::from(font_px));
        let width: f32 = advances(&scaled, text).last().map_or(0.0, |(_, x, adv)| x + adv);
        let height = scaled.ascent() - scaled.descent();
        (width.ceil() as u32, height.ceil() as u32)
    }

    /// Render `text` into a transparent image.
    ///
    /// The canvas is padded by the stroke radius so the outline is never cut
    /// off. Rotated renders are trimmed to their visible bounds.
    pub fn render(&self, text: &str, style: &TextStyle) -> RgbaImage {
        let scale = PxScale::from(style.font_px);
        let scaled = self.font.as_scaled(scale);
        let (text_w, text_h) = self.measure(text, style.font_px);

        let pad = style.stroke_px + 1;
        let width = (text_w + 2 * pad).max(1);
        let height = (text_h + 2 * pad).max(1);

        let mut fill = Coverage::new(width, height);
        let baseline = pad as f32 + scaled.ascent();
        for (glyph_id, x, _) in advances(&scaled, text) {
            let glyph =
                glyph_id.with_scale_and_position(scale, point(pad as f32 + x, baseline));
            if let Some(outlined) = self.font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, coverage| {
                    let x = bounds.min.x as i64 + i64::from(gx);
                    let y = bounds.min.y as i64 + i64::from(gy);
                    fill.raise(x, y, coverage);
                });
            }
        }

        let stroke = (style.stroke_px > 0).then(|| fill.dilate(style.stroke_px));

        let mut image = RgbaImage::new(width, height);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            let fill_alpha = fill.get(x, y) * style.fill_opacity;
            let stroke_alpha = stroke
                .as_ref()
                .map_or(0.0, |s| s.get(x, y) * style.stroke_opacity);
            *pixel = fill_over_stroke(style, fill_alpha, stroke_alpha);
        }

        if style.rotation_degrees.rem_euclid(360.0) == 0.0 {
            return image;
        }
        rotate(&image, style.rotation_degrees)
    }
}

/// Glyph ids with their pen x-offset and advance, kerning applied.
fn advances<F: Font, SF: ScaleFont<F>>(scaled: &SF, text: &str) -> Vec<(GlyphId, f32, f32)> {
    let mut out = Vec::with_capacity(text.len());
    let mut cursor = 0.0f32;
    let mut prev: Option<GlyphId> = None;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = prev {
            cursor += scaled.kern(prev, id);
        }
        let advance = scaled.h_advance(id);
        out.push((id, cursor, advance));
        cursor += advance;
        prev = Some(id);
    }
    out
}

/// Porter-Duff "over" of the fill color onto the stroke color.
fn fill_over_stroke(style: &TextStyle, fill_alpha: f32, stroke_alpha: f32) -> Rgba<u8> {
    let out_alpha = fill_alpha + stroke_alpha * (1.0 - fill_alpha);
    if out_alpha <= f32::EPSILON {
        return Rgba([0, 0, 0, 0]);
    }
    let channel = |f: u8, s: u8| -> u8 {
        let v = (f32::from(f) * fill_alpha + f32::from(s) * stroke_alpha * (1.0 - fill_alpha))
            / out_alpha;
        v.round().clamp(0.0, 255.0) as u8
    };
    Rgba([
        channel(style.fill.r, style.stroke.r),
        channel(style.fill.g, style.stroke.g),
        channel(style.fill.b, style.stroke.b),
        (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

/// Rotate clockwise on a square canvas large enough for any angle, then trim.
fn rotate(image: &RgbaImage, degrees: f32) -> RgbaImage {
    let (w, h) = image.dimensions();
    let side = (f64::from(w).hypot(f64::from(h))).ceil() as u32 + 2;

    let mut canvas = RgbaImage::new(side, side);
    imageops::replace(
        &mut canvas,
        image,
        i64::from((side - w) / 2),
        i64::from((side - h) / 2),
    );

    let rotated = rotate_about_center(
        &canvas,
        degrees.to_radians(),
        Interpolation::Bicubic,
        Rgba([0, 0, 0, 0]),
    );
    trim_transparent(&rotated)
}

/// Crop to the bounding box of pixels with non-zero alpha.
fn trim_transparent(image: &RgbaImage) -> RgbaImage {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] > 0 {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }
    if min_x > max_x || min_y > max_y {
        return RgbaImage::new(1, 1);
    }
    imageops::crop_imm(image, min_x, min_y, max_x - min_x + 1, max_y - min_y + 1).to_image()
}

/// Single-channel coverage mask in `0.0..=1.0`.
struct Coverage {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl Coverage {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            values: vec![0.0; width as usize * height as usize],
        }
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    fn get(&self, x: u32, y: u32) -> f32 {
        self.values[y as usize * self.width as usize + x as usize]
    }

    /// Keep the maximum coverage seen at a pixel; overlapping glyph edges
    /// must not accumulate past fully covered.
    fn raise(&mut self, x: i64, y: i64, coverage: f32) {
        if let Some(i) = self.index(x, y) {
            let v = &mut self.values[i];
            *v = v.max(coverage.clamp(0.0, 1.0));
        }
    }

    /// Morphological dilation with a disc of `radius` pixels.
    fn dilate(&self, radius: u32) -> Coverage {
        let r = i64::from(radius);
        let offsets: Vec<(i64, i64)> = (-r..=r)
            .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
            .filter(|(dx, dy)| dx * dx + dy * dy <= r * r)
            .collect();

        let mut out = Coverage::new(self.width, self.height);
        for y in 0..i64::from(self.height) {
            for x in 0..i64::from(self.width) {
                let c = self.values[y as usize * self.width as usize + x as usize];
                if c <= 0.0 {
                    continue;
                }
                for (dx, dy) in &offsets {
                    out.raise(x + dx, y + dy, c);
                }
            }
        }
        out
    }
}
