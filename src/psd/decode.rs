//! Decoder adapter
//!
//! Wraps the `psd` crate and turns its layer list into `ExtractedLayer`s:
//! canvas-clamped bounds, group paths, and pixels cropped to the layer.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use image::RgbaImage;
use ::psd::Psd;

use crate::error::{PhotocardError, Result};
use crate::template::model::Rect;

use super::header::PsdHeader;

/// A layer pulled out of a PSD, before mapping.
#[derive(Debug, Clone)]
pub struct ExtractedLayer {
    pub name: String,
    /// Names of enclosing groups, outermost first.
    pub group_path: Vec<String>,
    /// Bounds clamped to the canvas.
    pub bounds: Rect,
    pub visible: bool,
    /// 0.0..=1.0
    pub opacity: f32,
    /// Position in the stack, 0 at the bottom.
    pub z_index: usize,
    /// Pixels within `bounds`, or `None` when the layer has no visible pixels.
    pub pixels: Option<RgbaImage>,
}

impl ExtractedLayer {
    pub fn has_pixels(&self) -> bool {
        self.pixels.is_some()
    }
}

/// A decoded document.
#[derive(Debug, Clone)]
pub struct PsdDocument {
    pub width: u32,
    pub height: u32,
    /// Bottom to top.
    pub layers: Vec<ExtractedLayer>,
}

/// Decode a document whose header has already been validated.
///
/// The decoder may panic on malformed layer data; a panic is reported as a
/// parse error like any other decoder failure.
pub fn decode_psd(bytes: &[u8], header: &PsdHeader) -> Result<PsdDocument> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| decode_unchecked(bytes, header)));
    match outcome {
        Ok(result) => result,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "decoder panicked".to_string());
            tracing::warn!(%reason, "psd decoder panicked");
            Err(PhotocardError::PsdParse {
                reason: format!("malformed layer data: {}", reason),
            })
        }
    }
}

fn decode_unchecked(bytes: &[u8], header: &PsdHeader) -> Result<PsdDocument> {
    let psd = Psd::from_bytes(bytes).map_err(|e| PhotocardError::PsdParse {
        reason: e.to_string(),
    })?;

    let width = psd.width();
    let height = psd.height();
    if width != header.width || height != header.height {
        return Err(PhotocardError::PsdParse {
            reason: format!(
                "decoded size {}x{} does not match header {}x{}",
                width, height, header.width, header.height
            ),
        });
    }

    let groups: HashMap<u32, (String, Option<u32>)> = psd
        .groups()
        .iter()
        .map(|(id, g)| (*id, (g.name().to_string(), g.parent_id())))
        .collect();

    let canvas = Rect::new(0.0, 0.0, width as f64, height as f64);
    let mut layers = Vec::with_capacity(psd.layers().len());

    // The decoder lists layers top first.
    for (z_index, layer) in psd.layers().iter().rev().enumerate() {
        // Right and bottom edges are inclusive.
        let raw = Rect::new(
            layer.layer_left() as f64,
            layer.layer_top() as f64,
            (layer.layer_right() - layer.layer_left() + 1) as f64,
            (layer.layer_bottom() - layer.layer_top() + 1) as f64,
        );
        let bounds = raw.intersection(&canvas);

        let pixels = match bounds {
            Some(b) => crop_canvas(&layer.rgba(), width, height, &b),
            None => None,
        };

        layers.push(ExtractedLayer {
            name: layer.name().to_string(),
            group_path: group_path(layer.parent_id(), &groups),
            bounds: bounds.unwrap_or(Rect::new(raw.x, raw.y, 0.0, 0.0)),
            // The record flag is set for hidden layers.
            visible: !layer.visible(),
            opacity: layer.opacity() as f32 / 255.0,
            z_index,
            pixels,
        });
    }

    tracing::debug!(width, height, layers = layers.len(), "decoded psd");
    Ok(PsdDocument {
        width,
        height,
        layers,
    })
}

fn group_path(parent: Option<u32>, groups: &HashMap<u32, (String, Option<u32>)>) -> Vec<String> {
    let mut path = Vec::new();
    let mut next = parent;
    // Bounded by the group count so a cyclic parent chain cannot loop forever.
    while let Some(id) = next {
        if path.len() > groups.len() {
            break;
        }
        match groups.get(&id) {
            Some((name, parent)) => {
                path.push(name.clone());
                next = *parent;
            }
            None => break,
        }
    }
    path.reverse();
    path
}

/// Copy the region `bounds` out of a full-canvas RGBA buffer.
///
/// Returns `None` when the region is fully transparent.
pub(crate) fn crop_canvas(rgba: &[u8], width: u32, height: u32, bounds: &Rect) -> Option<RgbaImage> {
    let x0 = bounds.x.max(0.0) as u32;
    let y0 = bounds.y.max(0.0) as u32;
    let x1 = (bounds.right().min(width as f64)) as u32;
    let y1 = (bounds.bottom().min(height as f64)) as u32;
    if x1 <= x0 || y1 <= y0 || rgba.len() < (width as usize) * (height as usize) * 4 {
        return None;
    }

    let mut out = RgbaImage::new(x1 - x0, y1 - y0);
    let mut any_visible = false;
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let idx = (((y0 + y) * width + (x0 + x)) * 4) as usize;
        pixel.0.copy_from_slice(&rgba[idx..idx + 4]);
        any_visible |= pixel.0[3] > 0;
    }

    any_visible.then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::psd::header::header_bytes;

    #[test]
    fn test_crop_canvas() {
        // 3x2 canvas, only pixel (1, 1) is opaque.
        let mut rgba = vec![0u8; 3 * 2 * 4];
        // Row 1, column 1.
        let idx = (3 + 1) * 4;
        rgba[idx..idx + 4].copy_from_slice(&[9, 8, 7, 255]);

        let crop = crop_canvas(&rgba, 3, 2, &Rect::new(1.0, 0.0, 2.0, 2.0)).unwrap();
        assert_eq!(crop.dimensions(), (2, 2));
        assert_eq!(crop.get_pixel(0, 1).0, [9, 8, 7, 255]);
        assert_eq!(crop.get_pixel(1, 0).0[3], 0);
    }

    #[test]
    fn test_crop_transparent_region_is_none() {
        let rgba = vec![0u8; 4 * 4 * 4];
        assert!(crop_canvas(&rgba, 4, 4, &Rect::new(0.0, 0.0, 4.0, 4.0)).is_none());
    }

    #[test]
    fn test_crop_short_buffer_is_none() {
        let rgba = vec![255u8; 8];
        assert!(crop_canvas(&rgba, 4, 4, &Rect::new(0.0, 0.0, 2.0, 2.0)).is_none());
    }

    #[test]
    fn test_group_path_outermost_first() {
        let mut groups = HashMap::new();
        groups.insert(1, ("Card".to_string(), None));
        groups.insert(2, ("Photos".to_string(), Some(1)));
        assert_eq!(group_path(Some(2), &groups), vec!["Card", "Photos"]);
        assert!(group_path(None, &groups).is_empty());
    }

    #[test]
    fn test_group_path_cycle_terminates() {
        let mut groups = HashMap::new();
        groups.insert(1, ("A".to_string(), Some(2)));
        groups.insert(2, ("B".to_string(), Some(1)));
        assert!(group_path(Some(1), &groups).len() <= 3);
    }

    #[test]
    fn test_truncated_body_is_parse_error() {
        let bytes = header_bytes(1, 3, 4, 4, 8, 3);
        let header = PsdHeader::parse(&bytes, &EditorConfig::default()).unwrap();
        let err = decode_psd(&bytes, &header).unwrap_err();
        assert_eq!(err.error_code(), "PSD_PARSE_ERROR");
    }
}
