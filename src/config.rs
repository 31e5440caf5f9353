//! Editor configuration
//!
//! Limits applied by the editor store, the image intake and the PSD importer.
//! Every field has a default, so a config file only needs the values it
//! overrides.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PhotocardError, Result};

/// Default maximum number of history snapshots kept per session.
pub const DEFAULT_MAX_HISTORY: usize = 50;

/// Default upload limit for slot images (10 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Default size limit for PSD documents (200 MiB).
pub const DEFAULT_MAX_PSD_BYTES: u64 = 200 * 1024 * 1024;

/// Largest width/height a standard PSD document may declare.
pub const PSD_MAX_DIMENSION: u32 = 30_000;

/// Limits and defaults for an editing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Maximum number of snapshots the history keeps, including the initial one.
    pub max_history: usize,

    /// Maximum size of an image placed into a slot.
    pub max_image_bytes: u64,

    /// Image formats accepted for slots and overlays (lowercase extensions).
    pub allowed_image_formats: Vec<String>,

    /// Maximum size of a PSD document accepted for import.
    pub max_psd_bytes: u64,

    /// Maximum PSD width/height accepted for import.
    pub max_psd_dimension: u32,

    /// Import hidden PSD layers as overlays instead of skipping them.
    pub import_hidden_layers: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            allowed_image_formats: ["png", "jpeg", "webp", "gif"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_psd_bytes: DEFAULT_MAX_PSD_BYTES,
            max_psd_dimension: PSD_MAX_DIMENSION,
            import_hidden_layers: false,
        }
    }
}

impl EditorConfig {
    /// Load a config file, falling back to defaults for missing fields.
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

        let config: EditorConfig = serde_json::from_str(&content)?;
        Ok(config.normalized())
    }

    /// Clamp values that would make the editor unusable.
    pub fn normalized(mut self) -> Self {
        self.max_history = self.max_history.max(1);
        self.max_psd_dimension = self.max_psd_dimension.clamp(1, PSD_MAX_DIMENSION);
        for format in &mut self.allowed_image_formats {
            *format = format.to_ascii_lowercase();
        }
        self
    }

    /// Whether an image format extension is on the allow-list.
    pub fn allows_format(&self, format: &str) -> bool {
        self.allowed_image_formats
            .iter()
            .any(|f| f.eq_ignore_ascii_case(format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_config_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "max_history": 0, "allowed_image_formats": ["PNG"] }}"#).unwrap();

        let config = EditorConfig::load(file.path()).unwrap();
        assert_eq!(config.max_history, 1);
        assert_eq!(config.max_image_bytes, DEFAULT_MAX_IMAGE_BYTES);
        assert!(config.allows_format("png"));
        assert!(!config.allows_format("jpeg"));
    }

    #[test]
    fn test_missing_config_file() {
        let err = EditorConfig::load(Path::new("/nonexistent/photocard.json")).unwrap_err();
        assert_eq!(err.error_code(), "FILE_NOT_FOUND");
    }
}
