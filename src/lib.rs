//! Photocard - Layered Photo-Card Editor Core
//!
//! Photocard models greeting-card style templates and the editing session
//! built on top of them:
//! 1. Templates - a background, image slots with masks, overlays, and text fields
//! 2. Editing - per-layer text, color, image, and transform state with undo/redo
//! 3. PSD import - Photoshop documents mapped heuristically into templates
//!
//! # Architecture
//!
//! Data flows one way:
//! - `psd` or template JSON produces an immutable `TemplateConfig`
//! - `EditorStore` owns the editable state and its snapshot `History`
//! - `render` composites template plus state into a PNG

pub mod assets;
pub mod cli;
pub mod config;
pub mod error;
pub mod psd;
pub mod render;
pub mod state;
pub mod template;

pub use error::{PhotocardError, Result};
