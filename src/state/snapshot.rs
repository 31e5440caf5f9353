//! Editable session state
//!
//! Values the user changes while editing a card, keyed by layer id. The
//! whole `EditableState` is what a history snapshot captures.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PhotocardError;
use crate::template::model::{Background, TemplateConfig, BACKGROUND_ID};

/// Straight-alpha RGBA color, written as `#rrggbb` or `#rrggbbaa`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColorData {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl ColorData {
    pub const WHITE: ColorData = ColorData::rgb(255, 255, 255);
    pub const BLACK: ColorData = ColorData::rgb(0, 0, 0);
    pub const TRANSPARENT: ColorData = ColorData::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl FromStr for ColorData {
    type Err = PhotocardError;

    /// Parses `#rgb`, `#rrggbb` and `#rrggbbaa` (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PhotocardError::InvalidColor {
            value: s.to_string(),
        };

        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        let nibble = |i: usize| {
            u8::from_str_radix(&hex[i..i + 1], 16)
                .map(|v| v * 17)
                .map_err(|_| invalid())
        };

        match hex.len() {
            3 => Ok(Self::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
            6 => Ok(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Ok(Self::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for ColorData {
    type Error = PhotocardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ColorData> for String {
    fn from(color: ColorData) -> Self {
        color.to_string()
    }
}

impl fmt::Display for ColorData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

/// Metadata of an image placed into a slot.
///
/// Pixels are not held in the session: they are decoded from `source` at
/// render time, and snapshots compare the content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    /// Where the image was read from.
    pub source: PathBuf,

    /// SHA-256 of the file content, lowercase hex.
    pub content_hash: String,

    pub width: u32,

    pub height: u32,

    /// Detected format (lowercase extension, e.g. "png").
    pub format: String,

    pub byte_len: u64,
}

/// Placement of a layer relative to its template bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    /// Horizontal offset in canvas pixels.
    pub x: f64,
    /// Vertical offset in canvas pixels.
    pub y: f64,
    /// Uniform scale factor applied on top of the fit-to-bounds scale.
    pub scale: f64,
    /// Clockwise rotation in degrees, normalized to [0, 360).
    pub rotation: f64,
    pub flip_x: bool,
    pub flip_y: bool,
}

/// Smallest scale a user may set.
pub const MIN_SCALE: f64 = 0.05;

/// Largest scale a user may set.
pub const MAX_SCALE: f64 = 20.0;

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        x: 0.0,
        y: 0.0,
        scale: 1.0,
        rotation: 0.0,
        flip_x: false,
        flip_y: false,
    };

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Check the transform is usable, returning a reason when it is not.
    pub fn check(&self) -> std::result::Result<(), String> {
        if ![self.x, self.y, self.scale, self.rotation]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err("values must be finite".to_string());
        }
        if !(MIN_SCALE..=MAX_SCALE).contains(&self.scale) {
            return Err(format!(
                "scale {} is outside {}..={}",
                self.scale, MIN_SCALE, MAX_SCALE
            ));
        }
        Ok(())
    }

    /// Copy with rotation folded into [0, 360).
    pub fn normalized(mut self) -> Self {
        self.rotation = self.rotation.rem_euclid(360.0);
        // -0.0 and 360.0 collapse to 0.0 so equal placements compare equal
        if self.rotation == 0.0 || self.rotation >= 360.0 {
            self.rotation = 0.0;
        }
        self
    }
}

/// Everything the user can change on a card, keyed by layer id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditableState {
    /// Text field id → text.
    #[serde(default)]
    pub form_data: BTreeMap<String, String>,

    /// Slot id → placed image.
    #[serde(default)]
    pub images: BTreeMap<String, ImageData>,

    /// Layer id → color (background fill, text color, overlay tint).
    #[serde(default)]
    pub colors: BTreeMap<String, ColorData>,

    /// Layer id → placement. Absent means identity.
    #[serde(default)]
    pub transforms: BTreeMap<String, Transform>,
}

impl EditableState {
    /// Defaults seeded from a template: field texts, text colors, and the
    /// background color when the background is a solid fill.
    pub fn from_template(template: &TemplateConfig) -> Self {
        let mut state = EditableState::default();

        if let Background::Color { color } = &template.background {
            state.colors.insert(BACKGROUND_ID.to_string(), *color);
        }

        for field in &template.fields {
            state
                .form_data
                .insert(field.id.clone(), field.default_text.clone());
            state.colors.insert(field.id.clone(), field.color);
        }

        state
    }

    /// Transform of a layer, identity when unset.
    pub fn transform(&self, id: &str) -> Transform {
        self.transforms.get(id).copied().unwrap_or_default()
    }

    /// Every layer id this state refers to.
    pub fn referenced_ids(&self) -> impl Iterator<Item = &str> {
        self.form_data
            .keys()
            .chain(self.images.keys())
            .chain(self.colors.keys())
            .chain(self.transforms.keys())
            .map(String::as_str)
    }
}

/// A captured copy of the editable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub id: String,

    /// What the edit did, e.g. "Edit text title".
    pub label: String,

    pub taken_at: DateTime<Utc>,

    pub state: EditableState,
}

impl HistorySnapshot {
    pub fn new(label: impl Into<String>, state: EditableState) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            label: label.into(),
            taken_at: Utc::now(),
            state,
        }
    }
}
