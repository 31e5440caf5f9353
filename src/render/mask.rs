//! Slot mask coverage.

use image::RgbaImage;

use crate::template::model::Rect;

/// A slot mask with its image (if any) already loaded.
#[derive(Debug, Clone, Copy)]
pub enum MaskShape<'a> {
    Rect,
    RoundedRect { radius: f64 },
    Ellipse,
    /// Alpha channel of the image, stretched over the slot.
    Image(&'a RgbaImage),
}

impl MaskShape<'_> {
    /// Coverage in 0.0..=1.0 of the canvas point `(px, py)` for a slot
    /// occupying `bounds`. Points outside the bounds are never covered.
    pub fn coverage(&self, bounds: &Rect, px: f64, py: f64) -> f32 {
        if !bounds.contains(px, py) {
            return 0.0;
        }

        match self {
            MaskShape::Rect => 1.0,
            MaskShape::RoundedRect { radius } => {
                let r = radius.min(bounds.width / 2.0).min(bounds.height / 2.0).max(0.0);
                // Distance past the inner rectangle whose corners are the arc centres.
                let dx = (bounds.x + r - px).max(px - (bounds.right() - r)).max(0.0);
                let dy = (bounds.y + r - py).max(py - (bounds.bottom() - r)).max(0.0);
                if dx * dx + dy * dy <= r * r {
                    1.0
                } else {
                    0.0
                }
            }
            MaskShape::Ellipse => {
                let (cx, cy) = bounds.center();
                let nx = (px - cx) / (bounds.width / 2.0);
                let ny = (py - cy) / (bounds.height / 2.0);
                if nx * nx + ny * ny <= 1.0 {
                    1.0
                } else {
                    0.0
                }
            }
            MaskShape::Image(img) => {
                let (w, h) = img.dimensions();
                if w == 0 || h == 0 {
                    return 0.0;
                }
                let u = ((px - bounds.x) / bounds.width * w as f64) as u32;
                let v = ((py - bounds.y) / bounds.height * h as f64) as u32;
                f32::from(img.get_pixel(u.min(w - 1), v.min(h - 1)).0[3]) / 255.0
            }
        }
    }
}
