//! Template Schema
//!
//! A template is declarative: a canvas, a background, ordered image slots,
//! text fields and overlay layers. It is immutable once loaded and replaced
//! wholesale when the user switches templates.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::PSD_MAX_DIMENSION;
use crate::error::{PhotocardError, Result};
use crate::state::snapshot::ColorData;
use crate::template::migration::{migrate_template, CURRENT_SCHEMA_VERSION};

/// Reserved layer id of the template background.
pub const BACKGROUND_ID: &str = "background";

/// Axis-aligned rectangle in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Finite coordinates and a strictly positive size.
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }

    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Intersection with another rectangle, if non-empty.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right > x && bottom > y {
            Some(Rect::new(x, y, right - x, bottom - y))
        } else {
            None
        }
    }
}

/// Canvas dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub fn as_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width as f64, self.height as f64)
    }
}

/// Bottom-most template layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Background {
    /// Solid fill; the color is user-editable.
    Color { color: ColorData },
    /// Image stretched to cover the canvas (path relative to the template).
    Image { src: PathBuf },
}

impl Default for Background {
    fn default() -> Self {
        Background::Color {
            color: ColorData::WHITE,
        }
    }
}

/// Clip shape applied to a slot's image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum SlotMask {
    #[default]
    Rect,
    RoundedRect {
        radius: f64,
    },
    Ellipse,
    /// Alpha of the mask image, stretched to the slot bounds.
    Image {
        src: PathBuf,
    },
}

/// A user-fillable image region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub id: String,

    #[serde(default)]
    pub label: String,

    pub bounds: Rect,

    #[serde(default)]
    pub mask: SlotMask,
}

/// Horizontal alignment of a text field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// A user-editable text region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextField {
    pub id: String,

    #[serde(default)]
    pub label: String,

    pub bounds: Rect,

    #[serde(default)]
    pub default_text: String,

    #[serde(default = "default_font_size")]
    pub font_size: f64,

    #[serde(default = "default_text_color")]
    pub color: ColorData,

    #[serde(default)]
    pub align: TextAlign,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

fn default_font_size() -> f64 {
    24.0
}

fn default_text_color() -> ColorData {
    ColorData::BLACK
}

/// Decorative image drawn above the slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub id: String,

    pub src: PathBuf,

    pub bounds: Rect,

    #[serde(default = "default_opacity")]
    pub opacity: f32,

    /// Locked overlays cannot be moved or scaled by the user.
    #[serde(default)]
    pub locked: bool,
}

fn default_opacity() -> f32 {
    1.0
}

/// Kinds of layer a template id can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Background,
    Slot,
    Field,
    Overlay,
}

impl LayerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::Background => "background",
            LayerKind::Slot => "slot",
            LayerKind::Field => "text field",
            LayerKind::Overlay => "overlay",
        }
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A complete card template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Schema version for migration support.
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    pub id: String,

    pub name: String,

    pub canvas: CanvasSize,

    #[serde(default)]
    pub background: Background,

    /// Image slots, bottom to top.
    #[serde(default)]
    pub slots: Vec<Slot>,

    /// Overlays, bottom to top, drawn above every slot.
    #[serde(default)]
    pub overlays: Vec<Overlay>,

    /// Text fields, drawn above everything else.
    #[serde(default)]
    pub fields: Vec<TextField>,

    /// Unknown fields preserved for forward compatibility.
    #[serde(flatten)]
    pub unknown_fields: BTreeMap<String, serde_json::Value>,
}

fn default_schema_version() -> String {
    CURRENT_SCHEMA_VERSION.to_string()
}

impl TemplateConfig {
    /// Create an empty template with a white background.
    pub fn new(id: impl Into<String>, name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION.to_string(),
            id: id.into(),
            name: name.into(),
            canvas: CanvasSize { width, height },
            background: Background::default(),
            slots: Vec::new(),
            overlays: Vec::new(),
            fields: Vec::new(),
            unknown_fields: BTreeMap::new(),
        }
    }

    /// Load, migrate and validate a template file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PhotocardError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path).map_err(|e| PhotocardError::FileReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::from_json_str(&content)
    }

    /// Parse, migrate and validate a template from JSON text.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let data: serde_json::Value = serde_json::from_str(content)?;
        Self::from_value(data)
    }

    /// Migrate and validate a template from a JSON value.
    pub fn from_value(data: serde_json::Value) -> Result<Self> {
        let data = migrate_template(data)?;
        let template: TemplateConfig = serde_json::from_value(data)?;
        template.validate()?;
        Ok(template)
    }

    /// Write the template as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| PhotocardError::FileWriteError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Check structural invariants: unique ids, sane sizes, layers on canvas.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Err(PhotocardError::InvalidTemplate { reason });

        if self.id.trim().is_empty() {
            return invalid("template id is empty".to_string());
        }
        if self.schema_version != CURRENT_SCHEMA_VERSION {
            return Err(PhotocardError::InvalidSchemaVersion {
                version: self.schema_version.clone(),
            });
        }

        let CanvasSize { width, height } = self.canvas;
        if width == 0 || height == 0 || width > PSD_MAX_DIMENSION || height > PSD_MAX_DIMENSION {
            return invalid(format!("canvas size {}x{} is out of range", width, height));
        }
        let canvas = self.canvas.as_rect();

        let mut seen: HashSet<String> = HashSet::new();
        let mut check = |id: &str, bounds: &Rect| -> Result<()> {
            if id.trim().is_empty() {
                return invalid("layer id is empty".to_string());
            }
            if id == BACKGROUND_ID {
                return invalid(format!("layer id '{}' is reserved", BACKGROUND_ID));
            }
            if !seen.insert(id.to_string()) {
                return invalid(format!("duplicate layer id '{}'", id));
            }
            if !bounds.is_valid() {
                return invalid(format!("layer '{}' has invalid bounds", id));
            }
            if !bounds.intersects(&canvas) {
                return invalid(format!("layer '{}' lies outside the canvas", id));
            }
            Ok(())
        };

        for slot in &self.slots {
            check(&slot.id, &slot.bounds)?;
            if let SlotMask::RoundedRect { radius } = slot.mask {
                if !radius.is_finite() || radius < 0.0 {
                    return invalid(format!("slot '{}' has a negative corner radius", slot.id));
                }
            }
        }
        for overlay in &self.overlays {
            check(&overlay.id, &overlay.bounds)?;
            if !(0.0..=1.0).contains(&overlay.opacity) {
                return invalid(format!("overlay '{}' opacity must be in 0..=1", overlay.id));
            }
        }
        for field in &self.fields {
            check(&field.id, &field.bounds)?;
            if !field.font_size.is_finite() || field.font_size <= 0.0 {
                return invalid(format!("text field '{}' has an invalid font size", field.id));
            }
            if let Some(max) = field.max_length {
                if field.default_text.chars().count() > max {
                    return invalid(format!(
                        "text field '{}' default text exceeds max_length",
                        field.id
                    ));
                }
            }
        }

        Ok(())
    }

    /// Kind of the layer with this id, if any.
    pub fn layer_kind(&self, id: &str) -> Option<LayerKind> {
        if id == BACKGROUND_ID {
            Some(LayerKind::Background)
        } else if self.slot(id).is_some() {
            Some(LayerKind::Slot)
        } else if self.field(id).is_some() {
            Some(LayerKind::Field)
        } else if self.overlay(id).is_some() {
            Some(LayerKind::Overlay)
        } else {
            None
        }
    }

    pub fn slot(&self, id: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.id == id)
    }

    pub fn field(&self, id: &str) -> Option<&TextField> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn overlay(&self, id: &str) -> Option<&Overlay> {
        self.overlays.iter().find(|o| o.id == id)
    }

    /// All layer ids in draw order, background first.
    pub fn layer_ids(&self) -> Vec<&str> {
        std::iter::once(BACKGROUND_ID)
            .chain(self.slots.iter().map(|s| s.id.as_str()))
            .chain(self.overlays.iter().map(|o| o.id.as_str()))
            .chain(self.fields.iter().map(|f| f.id.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> TemplateConfig {
        let mut template = TemplateConfig::new("birthday", "Birthday", 600, 400);
        template.slots.push(Slot {
            id: "photo".to_string(),
            label: "Photo".to_string(),
            bounds: Rect::new(20.0, 20.0, 260.0, 360.0),
            mask: SlotMask::Ellipse,
        });
        template.fields.push(TextField {
            id: "title".to_string(),
            label: "Title".to_string(),
            bounds: Rect::new(300.0, 40.0, 280.0, 60.0),
            default_text: "Happy Birthday".to_string(),
            font_size: 32.0,
            color: ColorData::BLACK,
            align: TextAlign::Center,
            max_length: Some(40),
        });
        template
    }

    #[test]
    fn test_valid_template() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut template = sample();
        template.fields[0].id = "photo".to_string();
        let err = template.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate layer id 'photo'"));
    }

    #[test]
    fn test_reserved_id_rejected() {
        let mut template = sample();
        template.slots[0].id = BACKGROUND_ID.to_string();
        assert!(template.validate().is_err());
    }

    #[test]
    fn test_offcanvas_layer_rejected() {
        let mut template = sample();
        template.slots[0].bounds = Rect::new(700.0, 0.0, 50.0, 50.0);
        assert_eq!(template.validate().unwrap_err().error_code(), "INVALID_TEMPLATE");
    }

    #[test]
    fn test_layer_kind_lookup() {
        let template = sample();
        assert_eq!(template.layer_kind("photo"), Some(LayerKind::Slot));
        assert_eq!(template.layer_kind("title"), Some(LayerKind::Field));
        assert_eq!(template.layer_kind(BACKGROUND_ID), Some(LayerKind::Background));
        assert_eq!(template.layer_kind("missing"), None);
        assert_eq!(template.layer_ids(), vec!["background", "photo", "title"]);
    }

    #[test]
    fn test_json_defaults() {
        let template = TemplateConfig::from_json_str(
            r#"{
                "schema_version": "1.1.0",
                "id": "plain",
                "name": "Plain",
                "canvas": { "width": 100, "height": 100 },
                "slots": [{ "id": "a", "bounds": { "x": 0, "y": 0, "width": 50, "height": 50 } }],
                "theme": "spring"
            }"#,
        )
        .unwrap();

        assert_eq!(template.background, Background::default());
        assert_eq!(template.slots[0].mask, SlotMask::Rect);
        assert_eq!(template.unknown_fields["theme"], "spring");
    }

    #[test]
    fn test_rect_intersection() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert_eq!(a.intersection(&b), Some(Rect::new(5.0, 5.0, 5.0, 5.0)));
        assert_eq!(a.intersection(&Rect::new(10.0, 0.0, 1.0, 1.0)), None);
    }
}
