//! Template Module
//!
//! The declarative card schema, its migrations, and on-disk template
//! libraries.

pub mod library;
pub mod migration;
pub mod model;

pub use library::TemplateLibrary;
pub use migration::{migrate_template, CURRENT_SCHEMA_VERSION};
pub use model::{
    Background, CanvasSize, LayerKind, Overlay, Rect, Slot, SlotMask, TemplateConfig, TextAlign,
    TextField, BACKGROUND_ID,
};
