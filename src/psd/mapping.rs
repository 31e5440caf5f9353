//! Layer to template mapping
//!
//! Suggests a template role for each extracted layer from its name, with a
//! geometric fallback for the background. The suggestion is a starting
//! point; the report lists every decision so it can be reviewed.

use std::collections::HashSet;
use std::path::PathBuf;

use image::RgbaImage;
use serde::Serialize;

use crate::config::EditorConfig;
use crate::error::Result;
use crate::state::snapshot::ColorData;
use crate::template::model::{
    Background, Overlay, Slot, SlotMask, TemplateConfig, TextAlign, TextField, BACKGROUND_ID,
};

use super::decode::{ExtractedLayer, PsdDocument};

/// Directory, relative to the template file, that mapped pixels are written to.
pub const ASSET_DIR: &str = "assets";

/// Minimum share of the canvas a layer must cover to be taken as the
/// background.
const BACKGROUND_COVERAGE: f64 = 0.95;

/// Rounded-rect radius as a share of the slot's shorter side.
const ROUNDED_RADIUS_RATIO: f64 = 0.1;

/// Font size as a share of the text layer's height.
const FONT_SIZE_RATIO: f64 = 0.8;

const BACKGROUND_WORDS: &[&str] = &["background", "bg"];
const OVERLAY_WORDS: &[&str] = &["overlay", "frame", "sticker", "deco", "border"];
const SLOT_WORDS: &[&str] = &["photo", "image", "img", "slot", "picture", "pic"];
const FIELD_WORDS: &[&str] = &[
    "text", "title", "name", "caption", "date", "label", "message", "txt",
];
const ROUNDED_WORDS: &[&str] = &["rounded"];
const ELLIPSE_WORDS: &[&str] = &["circle", "ellipse", "oval", "round"];

/// Where a layer ended up.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum MappingTarget {
    Background,
    Slot { mask: SlotMask },
    Field,
    Overlay,
    Skipped { reason: String },
}

/// One mapping decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingEntry {
    pub layer_name: String,
    pub group_path: Vec<String>,
    pub z_index: usize,
    /// Template layer id, absent for skipped layers.
    pub layer_id: Option<String>,
    #[serde(flatten)]
    pub target: MappingTarget,
}

/// All mapping decisions, in PSD stack order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MappingReport {
    pub entries: Vec<MappingEntry>,
}

impl MappingReport {
    pub fn skipped(&self) -> impl Iterator<Item = &MappingEntry> {
        self.entries
            .iter()
            .filter(|e| matches!(e.target, MappingTarget::Skipped { .. }))
    }

    pub fn mapped_count(&self) -> usize {
        self.entries.len() - self.skipped().count()
    }

    /// One line per layer, for display.
    pub fn summary(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| {
                let target = match &e.target {
                    MappingTarget::Background => "background".to_string(),
                    MappingTarget::Slot { mask } => format!("slot ({})", mask_name(mask)),
                    MappingTarget::Field => "text field".to_string(),
                    MappingTarget::Overlay => "overlay".to_string(),
                    MappingTarget::Skipped { reason } => format!("skipped: {}", reason),
                };
                match &e.layer_id {
                    Some(id) => format!("{} -> {} [{}]", e.layer_name, target, id),
                    None => format!("{} -> {}", e.layer_name, target),
                }
            })
            .collect()
    }
}

fn mask_name(mask: &SlotMask) -> &'static str {
    match mask {
        SlotMask::Rect => "rect",
        SlotMask::RoundedRect { .. } => "rounded",
        SlotMask::Ellipse => "ellipse",
        SlotMask::Image { .. } => "image mask",
    }
}

/// Pixels to write next to the template, at `ASSET_DIR/file_name`.
#[derive(Debug, Clone)]
pub struct LayerAsset {
    pub file_name: String,
    pub pixels: RgbaImage,
}

/// Result of mapping a document.
#[derive(Debug, Clone)]
pub struct MappedTemplate {
    pub template: TemplateConfig,
    pub report: MappingReport,
    pub assets: Vec<LayerAsset>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Background,
    Slot,
    Field,
    Overlay,
}

/// Map a decoded document into a validated template.
pub fn map_layers(
    doc: &PsdDocument,
    template_id: &str,
    template_name: &str,
    config: &EditorConfig,
) -> Result<MappedTemplate> {
    let mut template = TemplateConfig::new(template_id, template_name, doc.width, doc.height);
    let mut report = MappingReport::default();
    let mut assets = Vec::new();
    let mut ids = IdAllocator::default();

    let background_index = find_background(doc, config);

    for layer in &doc.layers {
        let mut entry = MappingEntry {
            layer_name: layer.name.clone(),
            group_path: layer.group_path.clone(),
            z_index: layer.z_index,
            layer_id: None,
            target: MappingTarget::Overlay,
        };

        if let Some(reason) = skip_reason(layer, config) {
            entry.target = MappingTarget::Skipped { reason };
            report.entries.push(entry);
            continue;
        }

        let role = if Some(layer.z_index) == background_index {
            Role::Background
        } else {
            classify(&layer.name)
        };

        match role {
            Role::Background => {
                template.background = background_from(layer, &mut assets);
                entry.layer_id = Some(BACKGROUND_ID.to_string());
                entry.target = MappingTarget::Background;
            }
            Role::Slot => {
                let id = ids.allocate(&layer.name);
                let mask = infer_mask(&layer.name, layer);
                template.slots.push(Slot {
                    id: id.clone(),
                    label: layer.name.clone(),
                    bounds: layer.bounds,
                    mask: mask.clone(),
                });
                entry.layer_id = Some(id);
                entry.target = MappingTarget::Slot { mask };
            }
            Role::Field => {
                let id = ids.allocate(&layer.name);
                template.fields.push(TextField {
                    id: id.clone(),
                    label: layer.name.clone(),
                    bounds: layer.bounds,
                    // Text layers are named after their text by default.
                    default_text: layer.name.trim().to_string(),
                    font_size: (layer.bounds.height * FONT_SIZE_RATIO).max(1.0),
                    color: ColorData::BLACK,
                    align: TextAlign::Left,
                    max_length: None,
                });
                entry.layer_id = Some(id);
                entry.target = MappingTarget::Field;
            }
            Role::Overlay => {
                let id = ids.allocate(&layer.name);
                let file_name = format!("{}.png", id);
                if let Some(pixels) = &layer.pixels {
                    assets.push(LayerAsset {
                        file_name: file_name.clone(),
                        pixels: pixels.clone(),
                    });
                }
                template.overlays.push(Overlay {
                    id: id.clone(),
                    src: PathBuf::from(ASSET_DIR).join(file_name),
                    bounds: layer.bounds,
                    opacity: layer.opacity.clamp(0.0, 1.0),
                    locked: false,
                });
                entry.layer_id = Some(id);
                entry.target = MappingTarget::Overlay;
            }
        }

        tracing::debug!(layer = %entry.layer_name, target = ?entry.target, "mapped psd layer");
        report.entries.push(entry);
    }

    template.validate()?;
    tracing::info!(
        template = %template.id,
        mapped = report.mapped_count(),
        skipped = report.skipped().count(),
        "mapped psd layers"
    );

    Ok(MappedTemplate {
        template,
        report,
        assets,
    })
}

fn skip_reason(layer: &ExtractedLayer, config: &EditorConfig) -> Option<String> {
    if !layer.bounds.is_valid() {
        return Some("empty bounds".to_string());
    }
    if !layer.visible && !config.import_hidden_layers {
        return Some("hidden".to_string());
    }
    if !layer.has_pixels() {
        return Some("no visible pixels".to_string());
    }
    None
}

/// The background is the lowest usable layer named like one, or else the
/// bottom usable layer. Either way it must cover nearly the whole canvas;
/// a smaller layer keeps its place as an overlay.
fn find_background(doc: &PsdDocument, config: &EditorConfig) -> Option<usize> {
    let canvas_area = doc.width as f64 * doc.height as f64;
    let covers = |l: &ExtractedLayer| l.bounds.area() >= canvas_area * BACKGROUND_COVERAGE;

    let usable: Vec<&ExtractedLayer> = doc
        .layers
        .iter()
        .filter(|l| skip_reason(l, config).is_none())
        .collect();

    if let Some(named) = usable
        .iter()
        .find(|l| matches_any(&l.name, BACKGROUND_WORDS) && covers(l))
    {
        return Some(named.z_index);
    }

    usable
        .first()
        .filter(|l| covers(l))
        .map(|l| l.z_index)
}

fn classify(name: &str) -> Role {
    if matches_any(name, OVERLAY_WORDS) {
        Role::Overlay
    } else if matches_any(name, SLOT_WORDS) {
        Role::Slot
    } else if matches_any(name, FIELD_WORDS) {
        Role::Field
    } else {
        Role::Overlay
    }
}

fn infer_mask(name: &str, layer: &ExtractedLayer) -> SlotMask {
    if matches_any(name, ROUNDED_WORDS) {
        let radius = layer.bounds.width.min(layer.bounds.height) * ROUNDED_RADIUS_RATIO;
        SlotMask::RoundedRect { radius }
    } else if matches_any(name, ELLIPSE_WORDS) {
        SlotMask::Ellipse
    } else {
        SlotMask::Rect
    }
}

/// A solid opaque layer becomes a color background; anything else is kept
/// as an image.
fn background_from(layer: &ExtractedLayer, assets: &mut Vec<LayerAsset>) -> Background {
    let Some(pixels) = &layer.pixels else {
        return Background::default();
    };

    let first = pixels.get_pixel(0, 0).0;
    if first[3] == 255 && pixels.pixels().all(|p| p.0 == first) {
        return Background::Color {
            color: ColorData::rgb(first[0], first[1], first[2]),
        };
    }

    let file_name = format!("{}.png", BACKGROUND_ID);
    assets.push(LayerAsset {
        file_name: file_name.clone(),
        pixels: pixels.clone(),
    });
    Background::Image {
        src: PathBuf::from(ASSET_DIR).join(file_name),
    }
}

/// Whether any word of `name` starts with one of `keywords`.
fn matches_any(name: &str, keywords: &[&str]) -> bool {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .any(|w| keywords.iter().any(|k| w.starts_with(k)))
}

/// Hands out unique, slug-shaped layer ids.
#[derive(Debug, Default)]
struct IdAllocator {
    used: HashSet<String>,
}

impl IdAllocator {
    fn allocate(&mut self, name: &str) -> String {
        let base = slugify(name);
        let base = if base == BACKGROUND_ID {
            format!("{}-layer", base)
        } else {
            base
        };

        let mut candidate = base.clone();
        let mut n = 2;
        while self.used.contains(&candidate) {
            candidate = format!("{}-{}", base, n);
            n += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }
}

/// Lowercase ASCII alphanumerics joined by single dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "layer".to_string()
    } else {
        slug
    }
}
