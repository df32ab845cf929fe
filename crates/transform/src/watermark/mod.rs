//! Text watermark rendering and placement.
//!
//! [`apply`] renders the configured text once at a size derived from the
//! base image, computes where it goes (a single anchored copy or a tiled
//! grid), and blends every copy onto the base buffer in place.
//!
//! - [`text`]: glyph rasterization with outline stroke and rotation
//! - [`placement`]: nine-grid anchoring and tiling
//! - [`composite`]: Porter-Duff blending with clipping

pub mod composite;
pub mod placement;
pub mod text;

use image::RgbaImage;
use tracing::debug;

use crate::config::{Layout, WatermarkSpec};
use placement::Placement;
use text::{TextRenderer, TextStyle};

/// What [`apply`] drew, for logging and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedWatermark {
    pub font_px: f32,
    pub overlay_width: u32,
    pub overlay_height: u32,
    pub placements: Vec<Placement>,
}

/// Render `text` per `spec` and composite it onto `base`.
pub fn apply(
    base: &mut RgbaImage,
    spec: &WatermarkSpec,
    renderer: &TextRenderer,
    text: &str,
) -> AppliedWatermark {
    let (width, height) = base.dimensions();
    let font_px = spec.font_size.size_for(width, height);
    let scale = font_px / spec.font_size.reference_px();

    let stroke_px = if spec.stroke_width == 0 {
        0
    } else {
        ((spec.stroke_width as f32 * scale) as u32).max(1)
    };

    let style = TextStyle {
        font_px,
        fill: spec.fill_color,
        fill_opacity: spec.fill_opacity,
        stroke: spec.stroke_color,
        stroke_opacity: spec.stroke_opacity,
        stroke_px,
        rotation_degrees: spec.rotation_degrees,
    };
    let overlay = renderer.render(text, &style);
    let overlay_size = overlay.dimensions();

    let placements = match spec.layout {
        Layout::Anchored { anchor, margin } => vec![placement::anchored(
            anchor,
            margin,
            (width, height),
            overlay_size,
        )],
        Layout::Tiled {
            spacing_x,
            spacing_y,
            stagger,
        } => {
            let step = (
                ((spacing_x as f32 * scale) as u32).max(1),
                ((spacing_y as f32 * scale) as u32).max(1),
            );
            placement::tiled((width, height), overlay_size, step, stagger)
        }
    };

    for at in &placements {
        composite::blend(base, &overlay, *at);
    }

    debug!(
        font_px,
        stroke_px,
        overlay_width = overlay_size.0,
        overlay_height = overlay_size.1,
        copies = placements.len(),
        "watermark composited"
    );

    AppliedWatermark {
        font_px,
        overlay_width: overlay_size.0,
        overlay_height: overlay_size.1,
        placements,
    }
}
