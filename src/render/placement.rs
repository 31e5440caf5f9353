//! Mapping canvas pixels back into a placed source image.

use crate::state::snapshot::Transform;
use crate::template::model::Rect;

/// A source image of `src_w x src_h` drawn centred at `(cx, cy)`, scaled by
/// `(scale_x, scale_y)`, then flipped and rotated clockwise about its centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub src_w: u32,
    pub src_h: u32,
    pub cx: f64,
    pub cy: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Radians, clockwise on a y-down canvas.
    pub rotation: f64,
    pub flip_x: bool,
    pub flip_y: bool,
}

impl Placement {
    /// Scale the image uniformly so it covers `bounds`, then apply `t`.
    pub fn cover(src_w: u32, src_h: u32, bounds: &Rect, t: &Transform) -> Self {
        let base = (bounds.width / src_w.max(1) as f64).max(bounds.height / src_h.max(1) as f64);
        Self::centred(src_w, src_h, bounds, base, base, t)
    }

    /// Stretch the image to exactly fill `bounds`, then apply `t`.
    pub fn stretch(src_w: u32, src_h: u32, bounds: &Rect, t: &Transform) -> Self {
        let sx = bounds.width / src_w.max(1) as f64;
        let sy = bounds.height / src_h.max(1) as f64;
        Self::centred(src_w, src_h, bounds, sx, sy, t)
    }

    fn centred(src_w: u32, src_h: u32, bounds: &Rect, sx: f64, sy: f64, t: &Transform) -> Self {
        let (cx, cy) = bounds.center();
        Self {
            src_w,
            src_h,
            cx: cx + t.x,
            cy: cy + t.y,
            scale_x: sx * t.scale,
            scale_y: sy * t.scale,
            rotation: t.rotation.to_radians(),
            flip_x: t.flip_x,
            flip_y: t.flip_y,
        }
    }

    /// Source pixel under the canvas point `(px, py)`, if any.
    pub fn source_pixel(&self, px: f64, py: f64) -> Option<(u32, u32)> {
        if self.scale_x <= 0.0 || self.scale_y <= 0.0 {
            return None;
        }

        let dx = px - self.cx;
        let dy = py - self.cy;
        let (sin, cos) = self.rotation.sin_cos();
        let mut u = dx * cos + dy * sin;
        let mut v = -dx * sin + dy * cos;
        if self.flip_x {
            u = -u;
        }
        if self.flip_y {
            v = -v;
        }

        let sx = u / self.scale_x + self.src_w as f64 / 2.0;
        let sy = v / self.scale_y + self.src_h as f64 / 2.0;
        if sx < 0.0 || sy < 0.0 || sx >= self.src_w as f64 || sy >= self.src_h as f64 {
            return None;
        }
        Some((sx as u32, sy as u32))
    }

    /// Axis-aligned canvas rectangle the placed image can touch.
    pub fn extent(&self) -> Rect {
        let hw = self.src_w as f64 * self.scale_x / 2.0;
        let hh = self.src_h as f64 * self.scale_y / 2.0;
        let (sin, cos) = self.rotation.sin_cos();
        let ex = (hw * cos).abs() + (hh * sin).abs();
        let ey = (hw * sin).abs() + (hh * cos).abs();
        Rect::new(self.cx - ex, self.cy - ey, ex * 2.0, ey * 2.0)
    }
}
