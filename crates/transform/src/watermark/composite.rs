//! Alpha blending of the overlay onto the base image.

use image::{Rgba, RgbaImage};

use super::placement::Placement;

/// Blend `overlay` onto `target` with its top-left corner at `at`.
///
/// Only the part of the overlay that falls inside `target` is touched; the
/// base image is never resized.
pub fn blend(target: &mut RgbaImage, overlay: &RgbaImage, at: Placement) {
    let (target_w, target_h) = (i64::from(target.width()), i64::from(target.height()));
    let (ox, oy) = (i64::from(at.x), i64::from(at.y));

    let x_start = ox.max(0);
    let y_start = oy.max(0);
    let x_end = (ox + i64::from(overlay.width())).min(target_w);
    let y_end = (oy + i64::from(overlay.height())).min(target_h);

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let fg = *overlay.get_pixel((tx - ox) as u32, (ty - oy) as u32);
            if fg[3] == 0 {
                continue;
            }
            let pixel = target.get_pixel_mut(tx as u32, ty as u32);
            *pixel = over(*pixel, fg);
        }
    }
}

/// Porter-Duff "over": `fg + bg * (1 - fg.alpha)`.
///
/// A fully opaque foreground replaces the background.
pub fn over(bg: Rgba<u8>, fg: Rgba<u8>) -> Rgba<u8> {
    if fg[3] == 255 {
        return fg;
    }
    let fg_alpha = f32::from(fg[3]) / 255.0;
    let bg_alpha = f32::from(bg[3]) / 255.0;
    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);
    if out_alpha <= f32::EPSILON {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |f: u8, b: u8| -> u8 {
        let v = (f32::from(f) * fg_alpha + f32::from(b) * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        v.round().clamp(0.0, 255.0) as u8
    };
    Rgba([
        channel(fg[0], bg[0]),
        channel(fg[1], bg[1]),
        channel(fg[2], bg[2]),
        (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}
