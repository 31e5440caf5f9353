//! Card compositor
//!
//! Draws a template and its editable state into an RGBA raster at canvas
//! size. Layers are drawn bottom to top: background, slots, overlays.
//! Compositing happens on premultiplied pixels; the returned image is
//! straight alpha.
//!
//! Text fields are not rasterized. Their resolved text and styling are
//! returned in the `RenderReport` so a caller with a font stack can draw
//! them.

pub mod blend;
pub mod mask;
pub mod placement;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};
use serde::Serialize;

use crate::error::{PhotocardError, Result};
use crate::state::snapshot::{ColorData, EditableState, Transform};
use crate::template::model::{Background, Rect, SlotMask, TemplateConfig, TextAlign, BACKGROUND_ID};

use self::blend::{over, premultiply, tint, unpremultiply_in_place, PremulRgba8};
use self::mask::MaskShape;
use self::placement::Placement;

/// A text field as it would be drawn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextPlacement {
    pub id: String,
    pub text: String,
    pub bounds: Rect,
    pub font_size: f64,
    pub color: ColorData,
    pub align: TextAlign,
    pub transform: Transform,
}

/// What a render drew.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderReport {
    pub width: u32,
    pub height: u32,
    /// Layer ids that contributed pixels, in draw order.
    pub drawn: Vec<String>,
    /// Slots with neither an image nor a color.
    pub empty_slots: Vec<String>,
    pub text_fields: Vec<TextPlacement>,
}

/// Decoded images keyed by resolved path, stored premultiplied.
#[derive(Debug, Default)]
pub struct ImageCache {
    images: HashMap<PathBuf, RgbaImage>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Decode `path` once and keep it.
    pub fn get(&mut self, path: &Path) -> Result<&RgbaImage> {
        if !self.images.contains_key(path) {
            if !path.exists() {
                return Err(PhotocardError::FileNotFound {
                    path: path.to_path_buf(),
                });
            }
            let mut img = image::open(path)?.to_rgba8();
            blend::premultiply_in_place(&mut img);
            tracing::debug!(path = %path.display(), w = img.width(), h = img.height(), "decoded image");
            self.images.insert(path.to_path_buf(), img);
        }
        self.images
            .get(path)
            .ok_or_else(|| PhotocardError::RenderError {
                reason: format!("image cache lost {}", path.display()),
            })
    }
}

/// Resolve a template or state path against the asset root.
fn resolve(asset_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        asset_root.join(path)
    }
}

/// Render with a fresh image cache.
pub fn render_card(
    template: &TemplateConfig,
    state: &EditableState,
    asset_root: &Path,
) -> Result<(RgbaImage, RenderReport)> {
    render_card_with(template, state, asset_root, &mut ImageCache::new())
}

/// Render, reusing decoded images from `cache`.
pub fn render_card_with(
    template: &TemplateConfig,
    state: &EditableState,
    asset_root: &Path,
    cache: &mut ImageCache,
) -> Result<(RgbaImage, RenderReport)> {
    let CanvasDims { width, height } = CanvasDims::of(template)?;
    let mut canvas = RgbaImage::new(width, height);
    let mut report = RenderReport {
        width,
        height,
        ..RenderReport::default()
    };

    // Background
    let canvas_rect = template.canvas.as_rect();
    match &template.background {
        Background::Color { color } => {
            let color = state.colors.get(BACKGROUND_ID).copied().unwrap_or(*color);
            fill(&mut canvas, &canvas_rect, MaskShape::Rect, color);
        }
        Background::Image { src } => {
            if let Some(color) = state.colors.get(BACKGROUND_ID) {
                fill(&mut canvas, &canvas_rect, MaskShape::Rect, *color);
            }
            let img = cache.get(&resolve(asset_root, src))?;
            let placement = Placement::cover(img.width(), img.height(), &canvas_rect, &Transform::IDENTITY);
            draw_image(&mut canvas, img, &placement, &canvas_rect, MaskShape::Rect, 1.0, None);
        }
    }
    report.drawn.push(BACKGROUND_ID.to_string());

    // Slots
    for slot in &template.slots {
        let mask_img = match &slot.mask {
            SlotMask::Image { src } => Some(cache.get(&resolve(asset_root, src))?.clone()),
            _ => None,
        };
        let shape = match (&slot.mask, &mask_img) {
            (SlotMask::RoundedRect { radius }, _) => MaskShape::RoundedRect { radius: *radius },
            (SlotMask::Ellipse, _) => MaskShape::Ellipse,
            (SlotMask::Image { .. }, Some(img)) => MaskShape::Image(img),
            _ => MaskShape::Rect,
        };

        let color = state.colors.get(&slot.id).copied();
        let image = state.images.get(&slot.id);
        if image.is_none() && color.is_none() {
            report.empty_slots.push(slot.id.clone());
            continue;
        }

        if let Some(color) = color {
            fill(&mut canvas, &slot.bounds, shape, color);
        }
        if let Some(image) = image {
            let img = cache.get(&resolve(asset_root, &image.source))?;
            let placement = Placement::cover(img.width(), img.height(), &slot.bounds, &state.transform(&slot.id));
            draw_image(&mut canvas, img, &placement, &slot.bounds, shape, 1.0, None);
        }
        report.drawn.push(slot.id.clone());
    }

    // Overlays
    for overlay in &template.overlays {
        let img = cache.get(&resolve(asset_root, &overlay.src))?;
        let placement = Placement::stretch(img.width(), img.height(), &overlay.bounds, &state.transform(&overlay.id));
        let clip = placement.extent();
        let tint_color = state.colors.get(&overlay.id).map(|c| c.to_array());
        draw_image(&mut canvas, img, &placement, &clip, MaskShape::Rect, overlay.opacity, tint_color);
        report.drawn.push(overlay.id.clone());
    }

    // Text
    for field in &template.fields {
        let text = state
            .form_data
            .get(&field.id)
            .cloned()
            .unwrap_or_else(|| field.default_text.clone());
        report.text_fields.push(TextPlacement {
            id: field.id.clone(),
            text,
            bounds: field.bounds,
            font_size: field.font_size,
            color: state.colors.get(&field.id).copied().unwrap_or(field.color),
            align: field.align,
            transform: state.transform(&field.id),
        });
    }

    unpremultiply_in_place(&mut canvas);
    tracing::debug!(
        template = %template.id,
        drawn = report.drawn.len(),
        empty = report.empty_slots.len(),
        "rendered card"
    );
    Ok((canvas, report))
}

struct CanvasDims {
    width: u32,
    height: u32,
}

impl CanvasDims {
    fn of(template: &TemplateConfig) -> Result<Self> {
        let (width, height) = (template.canvas.width, template.canvas.height);
        if width == 0 || height == 0 {
            return Err(PhotocardError::RenderError {
                reason: format!("canvas {}x{} has no pixels", width, height),
            });
        }
        Ok(Self { width, height })
    }
}

/// Canvas pixel range touched by `rect`, clamped to the canvas.
fn pixel_span(canvas: &RgbaImage, rect: &Rect) -> (u32, u32, u32, u32) {
    let clamp = |v: f64, max: u32| v.max(0.0).min(max as f64);
    let x0 = clamp(rect.x.floor(), canvas.width()) as u32;
    let y0 = clamp(rect.y.floor(), canvas.height()) as u32;
    let x1 = clamp(rect.right().ceil(), canvas.width()) as u32;
    let y1 = clamp(rect.bottom().ceil(), canvas.height()) as u32;
    (x0, y0, x1, y1)
}

fn fill(canvas: &mut RgbaImage, bounds: &Rect, shape: MaskShape<'_>, color: ColorData) {
    let src = premultiply(color.to_array());
    let (x0, y0, x1, y1) = pixel_span(canvas, bounds);
    for y in y0..y1 {
        for x in x0..x1 {
            let coverage = shape.coverage(bounds, x as f64 + 0.5, y as f64 + 0.5);
            if coverage > 0.0 {
                let dst = canvas.get_pixel_mut(x, y);
                dst.0 = over(dst.0, src, coverage);
            }
        }
    }
}

/// Draw a premultiplied image through `placement`, clipped to `clip` and
/// `shape`.
fn draw_image(
    canvas: &mut RgbaImage,
    img: &RgbaImage,
    placement: &Placement,
    clip: &Rect,
    shape: MaskShape<'_>,
    opacity: f32,
    tint_color: Option<[u8; 4]>,
) {
    let (x0, y0, x1, y1) = pixel_span(canvas, clip);
    for y in y0..y1 {
        for x in x0..x1 {
            let (px, py) = (x as f64 + 0.5, y as f64 + 0.5);
            let coverage = shape.coverage(clip, px, py);
            if coverage <= 0.0 {
                continue;
            }
            let Some((sx, sy)) = placement.source_pixel(px, py) else {
                continue;
            };
            let mut src: PremulRgba8 = img.get_pixel(sx, sy).0;
            if let Some(color) = tint_color {
                src = tint(src, color);
            }
            let dst = canvas.get_pixel_mut(x, y);
            dst.0 = over(dst.0, src, coverage * opacity);
        }
    }
}

/// Write a rendered card as PNG, creating parent directories.
pub fn export_png(image: &RgbaImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PhotocardError::DirectoryCreateError {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    image.save_with_format(path, ImageFormat::Png)?;
    tracing::info!(path = %path.display(), "exported png");
    Ok(())
}
