//! Error handling for Photocard
//!
//! Every failure is surfaced to the caller as a `PhotocardError`. Nothing in
//! the library is fatal: the worst case is a rejected edit or import that the
//! user can retry.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Photocard operations
pub type Result<T> = std::result::Result<T, PhotocardError>;

/// Main error type for Photocard operations
#[derive(Error, Debug)]
pub enum PhotocardError {
    // File Errors
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Failed to read file: {}: {source}", path.display())]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {}: {source}", path.display())]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory creation failed: {}: {source}", path.display())]
    DirectoryCreateError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Upload Validation Errors
    #[error("Image too large: {size_bytes} bytes (maximum {max_bytes})")]
    ImageTooLarge { size_bytes: u64, max_bytes: u64 },

    #[error("Unsupported image format: {format}")]
    UnsupportedImageFormat { format: String },

    #[error("Invalid image: {reason}")]
    InvalidImage { reason: String },

    // Template Errors
    #[error("Invalid template: {reason}")]
    InvalidTemplate { reason: String },

    #[error("Invalid template schema version: {version}")]
    InvalidSchemaVersion { version: String },

    #[error("Migration failed from {from} to {to}: {reason}")]
    MigrationError {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Template not found: {id}")]
    TemplateNotFound { id: String },

    // Editor Errors
    #[error("No template loaded")]
    NoTemplateLoaded,

    #[error("Layer not found: {id}")]
    LayerNotFound { id: String },

    #[error("Layer '{id}' is a {actual}, expected {expected}")]
    WrongLayerKind {
        id: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Text for '{id}' is {len} characters (maximum {max})")]
    TextTooLong { id: String, len: usize, max: usize },

    #[error("Invalid color: {value}")]
    InvalidColor { value: String },

    #[error("Invalid transform for '{id}': {reason}")]
    InvalidTransform { id: String, reason: String },

    // Undo/Redo Errors
    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    // PSD Errors
    #[error("PSD parse error: {reason}")]
    PsdParse { reason: String },

    #[error("PSD file too large: {size_bytes} bytes (maximum {max_bytes})")]
    PsdTooLarge { size_bytes: u64, max_bytes: u64 },

    // Storage Errors
    #[error("Invalid storage key: {key}")]
    InvalidStorageKey { key: String },

    #[error("Work not found: {id}")]
    WorkNotFound { id: String },

    // Render Errors
    #[error("Render failed: {reason}")]
    RenderError { reason: String },

    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PhotocardError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            PhotocardError::FileNotFound { .. } => "FILE_NOT_FOUND",
            PhotocardError::FileReadError { .. } => "FILE_READ_ERROR",
            PhotocardError::FileWriteError { .. } => "FILE_WRITE_ERROR",
            PhotocardError::DirectoryCreateError { .. } => "DIRECTORY_CREATE_ERROR",
            PhotocardError::ImageTooLarge { .. } => "IMAGE_TOO_LARGE",
            PhotocardError::UnsupportedImageFormat { .. } => "UNSUPPORTED_IMAGE_FORMAT",
            PhotocardError::InvalidImage { .. } => "INVALID_IMAGE",
            PhotocardError::InvalidTemplate { .. } => "INVALID_TEMPLATE",
            PhotocardError::InvalidSchemaVersion { .. } => "INVALID_SCHEMA_VERSION",
            PhotocardError::MigrationError { .. } => "MIGRATION_ERROR",
            PhotocardError::TemplateNotFound { .. } => "TEMPLATE_NOT_FOUND",
            PhotocardError::NoTemplateLoaded => "NO_TEMPLATE_LOADED",
            PhotocardError::LayerNotFound { .. } => "LAYER_NOT_FOUND",
            PhotocardError::WrongLayerKind { .. } => "WRONG_LAYER_KIND",
            PhotocardError::TextTooLong { .. } => "TEXT_TOO_LONG",
            PhotocardError::InvalidColor { .. } => "INVALID_COLOR",
            PhotocardError::InvalidTransform { .. } => "INVALID_TRANSFORM",
            PhotocardError::NothingToUndo => "NOTHING_TO_UNDO",
            PhotocardError::NothingToRedo => "NOTHING_TO_REDO",
            PhotocardError::PsdParse { .. } => "PSD_PARSE_ERROR",
            PhotocardError::PsdTooLarge { .. } => "PSD_TOO_LARGE",
            PhotocardError::InvalidStorageKey { .. } => "INVALID_STORAGE_KEY",
            PhotocardError::WorkNotFound { .. } => "WORK_NOT_FOUND",
            PhotocardError::RenderError { .. } => "RENDER_ERROR",
            PhotocardError::Image(_) => "IMAGE_CODEC_ERROR",
            PhotocardError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the user can recover by correcting their input and retrying.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            PhotocardError::DirectoryCreateError { .. }
                | PhotocardError::MigrationError { .. }
        )
    }

    /// Returns a user-facing recovery suggestion.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            PhotocardError::FileNotFound { .. } => Some("Check the file path and try again."),
            PhotocardError::ImageTooLarge { .. } => {
                Some("Resize or re-compress the image before uploading.")
            }
            PhotocardError::UnsupportedImageFormat { .. } => {
                Some("Convert the image to PNG, JPEG, WebP or GIF.")
            }
            PhotocardError::InvalidTemplate { .. } => {
                Some("Run 'photocard validate <template>' to see what is wrong.")
            }
            PhotocardError::InvalidSchemaVersion { .. } => {
                Some("The template was saved by a newer version of Photocard.")
            }
            PhotocardError::NoTemplateLoaded => Some("Load a template before editing."),
            PhotocardError::TextTooLong { .. } => Some("Shorten the text and try again."),
            PhotocardError::InvalidColor { .. } => {
                Some("Colors are written as #rgb, #rrggbb or #rrggbbaa.")
            }
            PhotocardError::NothingToUndo => Some("There are no edits to undo."),
            PhotocardError::NothingToRedo => Some("There are no undone edits to redo."),
            PhotocardError::PsdParse { .. } => {
                Some("Re-save the document from Photoshop as a standard PSD (not PSB).")
            }
            PhotocardError::PsdTooLarge { .. } => {
                Some("Flatten unused layers or reduce the document size.")
            }
            PhotocardError::WorkNotFound { .. } => {
                Some("Run 'photocard list-works' to see saved works.")
            }
            _ => None,
        }
    }
}
