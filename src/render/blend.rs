//! Pixel blending on premultiplied RGBA8.

pub type PremulRgba8 = [u8; 4];

/// Source-over of `src` onto `dst`, with `src` first weighted by `weight`
/// (mask coverage times layer opacity, 0.0..=1.0).
pub fn over(dst: PremulRgba8, src: PremulRgba8, weight: f32) -> PremulRgba8 {
    let w = unit_to_u8(weight);
    let src_alpha = scale(src[3], w);
    if src_alpha == 0 {
        return dst;
    }

    let keep = 255 - src_alpha;
    std::array::from_fn(|i| {
        let s = if i == 3 { src_alpha } else { scale(src[i], w) };
        s.saturating_add(scale(dst[i], keep))
    })
}

/// Straight to premultiplied.
pub fn premultiply(px: [u8; 4]) -> PremulRgba8 {
    let a = px[3];
    [scale(px[0], a), scale(px[1], a), scale(px[2], a), a]
}

/// Premultiplied to straight.
pub fn unpremultiply(px: PremulRgba8) -> [u8; 4] {
    let a = u32::from(px[3]);
    if a == 0 {
        return [0, 0, 0, 0];
    }
    let un = |c: u8| ((u32::from(c) * 255 + a / 2) / a).min(255) as u8;
    [un(px[0]), un(px[1]), un(px[2]), px[3]]
}

/// Multiply a premultiplied pixel by a straight tint color.
pub fn tint(px: PremulRgba8, color: [u8; 4]) -> PremulRgba8 {
    let a = color[3];
    std::array::from_fn(|i| {
        if i == 3 {
            scale(px[3], a)
        } else {
            scale(scale(px[i], color[i]), a)
        }
    })
}

pub fn premultiply_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let out = premultiply([px[0], px[1], px[2], px[3]]);
        px.copy_from_slice(&out);
    }
}

pub fn unpremultiply_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let out = unpremultiply([px[0], px[1], px[2], px[3]]);
        px.copy_from_slice(&out);
    }
}

fn unit_to_u8(v: f32) -> u8 {
    if v.is_nan() {
        return 0;
    }
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// `a * b / 255`, rounded to nearest.
fn scale(a: u8, b: u8) -> u8 {
    let p = u32::from(a) * u32::from(b) + 128;
    ((p + (p >> 8)) >> 8) as u8
}
