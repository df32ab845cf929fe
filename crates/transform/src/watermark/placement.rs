//! Overlay placement.
//!
//! Computes the top-left corner(s) at which the rendered overlay is blended.
//! Coordinates are signed: tiles may start left of or above the image and
//! are clipped by the compositor.

use crate::config::Anchor;

/// Top-left corner of one overlay copy, in base-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
}

impl Placement {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Width and height pair.
pub type Size = (u32, u32);

/// Position of a single overlay at `anchor`, `margin` pixels from the edges.
///
/// When the overlay does not fit, the origin is pinned to the top/left edge
/// and the far side is clipped, so the start of the text stays visible.
///
/// ```rust
/// use transform::watermark::placement::{anchored, Placement};
/// use transform::Anchor;
///
/// let p = anchored(Anchor::BottomRight, 10, (800, 600), (100, 50));
/// assert_eq!(p, Placement::new(690, 540));
///
/// // Overlay wider than the image.
/// let p = anchored(Anchor::BottomRight, 10, (80, 600), (100, 50));
/// assert_eq!(p, Placement::new(0, 540));
/// ```
pub fn anchored(anchor: Anchor, margin: u32, base: Size, overlay: Size) -> Placement {
    let (img_w, img_h) = (base.0 as i32, base.1 as i32);
    let (wm_w, wm_h) = (overlay.0 as i32, overlay.1 as i32);
    let m = margin as i32;

    let left = m;
    let h_center = (img_w - wm_w) / 2;
    let right = img_w - wm_w - m;
    let top = m;
    let v_center = (img_h - wm_h) / 2;
    let bottom = img_h - wm_h - m;

    let (x, y) = match anchor {
        Anchor::TopLeft => (left, top),
        Anchor::TopCenter => (h_center, top),
        Anchor::TopRight => (right, top),
        Anchor::CenterLeft => (left, v_center),
        Anchor::Center => (h_center, v_center),
        Anchor::CenterRight => (right, v_center),
        Anchor::BottomLeft => (left, bottom),
        Anchor::BottomCenter => (h_center, bottom),
        Anchor::BottomRight => (right, bottom),
    };

    Placement::new(x.max(0), y.max(0))
}

/// Positions for a repeating grid that covers the whole image.
///
/// Tiles start one overlay-size before the top-left corner and continue one
/// overlay-size past the far edges so partially visible copies fill the
/// borders. With `stagger`, odd rows shift right by half a step.
pub fn tiled(base: Size, overlay: Size, step: Size, stagger: bool) -> Vec<Placement> {
    let (img_w, img_h) = (base.0 as i64, base.1 as i64);
    let (wm_w, wm_h) = (overlay.0 as i64, overlay.1 as i64);
    let step_x = i64::from(step.0.max(1));
    let step_y = i64::from(step.1.max(1));

    let mut positions = Vec::new();
    let mut y = -wm_h;
    let mut row = 0i64;
    while y < img_h + wm_h {
        let offset = if stagger { (row % 2) * (step_x / 2) } else { 0 };
        let mut x = -wm_w + offset;
        while x < img_w + wm_w {
            if intersects(x, y, wm_w, wm_h, img_w, img_h) {
                positions.push(Placement::new(x as i32, y as i32));
            }
            x += step_x;
        }
        y += step_y;
        row += 1;
    }
    positions
}

fn intersects(x: i64, y: i64, w: i64, h: i64, img_w: i64, img_h: i64) -> bool {
    x + w > 0 && y + h > 0 && x < img_w && y < img_h
}
