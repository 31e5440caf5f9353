//! PSD import
//!
//! `import_psd` runs the whole pipeline: header validation, decoding, and
//! mapping into a `TemplateConfig`. Any failure aborts the import; nothing
//! outside the returned `PsdImport` is touched.

pub mod decode;
pub mod header;
pub mod mapping;

use std::fs;
use std::path::{Path, PathBuf};

use image::ImageFormat;

use crate::config::EditorConfig;
use crate::error::{PhotocardError, Result};
use crate::template::model::TemplateConfig;

pub use decode::{decode_psd, ExtractedLayer, PsdDocument};
pub use header::PsdHeader;
pub use mapping::{map_layers, LayerAsset, MappingEntry, MappingReport, MappingTarget, ASSET_DIR};

/// Template id used when the caller does not name the import.
pub const DEFAULT_TEMPLATE_ID: &str = "imported";

/// File name of the template written by `PsdImport::write_assets`.
pub const TEMPLATE_FILE: &str = "template.json";

/// A mapped PSD, ready to be saved or loaded into a store.
#[derive(Debug, Clone)]
pub struct PsdImport {
    pub header: PsdHeader,
    pub template: TemplateConfig,
    pub report: MappingReport,
    pub assets: Vec<LayerAsset>,
}

/// Import a PSD under the default template id.
pub fn import_psd(bytes: &[u8], config: &EditorConfig) -> Result<PsdImport> {
    import_psd_as(bytes, DEFAULT_TEMPLATE_ID, "Imported PSD", config)
}

/// Import a PSD, naming the resulting template.
pub fn import_psd_as(
    bytes: &[u8],
    template_id: &str,
    template_name: &str,
    config: &EditorConfig,
) -> Result<PsdImport> {
    let header = PsdHeader::parse(bytes, config)?;
    tracing::debug!(?header, "psd header ok");

    let document = decode_psd(bytes, &header)?;
    let mapped = map_layers(&document, template_id, template_name, config)?;

    Ok(PsdImport {
        header,
        template: mapped.template,
        report: mapped.report,
        assets: mapped.assets,
    })
}

/// Read and import a PSD file. The template id is taken from the file name.
pub fn import_psd_file(path: &Path, config: &EditorConfig) -> Result<PsdImport> {
    if !path.exists() {
        return Err(PhotocardError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let size_bytes = fs::metadata(path)
        .map_err(|e| PhotocardError::FileReadError {
            path: path.to_path_buf(),
            source: e,
        })?
        .len();
    if size_bytes > config.max_psd_bytes {
        return Err(PhotocardError::PsdTooLarge {
            size_bytes,
            max_bytes: config.max_psd_bytes,
        });
    }

    let bytes = fs::read(path).map_err(|e| PhotocardError::FileReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(DEFAULT_TEMPLATE_ID);
    import_psd_as(&bytes, &mapping::slugify(stem), stem, config)
}

impl PsdImport {
    /// Write the template and its layer images under `dir`.
    ///
    /// Layout: `dir/template.json` plus `dir/assets/*.png`. Returns the path
    /// of the template file.
    pub fn write_assets(&self, dir: &Path) -> Result<PathBuf> {
        let asset_dir = dir.join(ASSET_DIR);
        fs::create_dir_all(&asset_dir).map_err(|e| PhotocardError::DirectoryCreateError {
            path: asset_dir.clone(),
            source: e,
        })?;

        for asset in &self.assets {
            let path = asset_dir.join(&asset.file_name);
            asset.pixels.save_with_format(&path, ImageFormat::Png)?;
            tracing::debug!(path = %path.display(), "wrote layer asset");
        }

        let template_path = dir.join(TEMPLATE_FILE);
        self.template.save(&template_path)?;
        tracing::info!(
            path = %template_path.display(),
            assets = self.assets.len(),
            "wrote imported template"
        );
        Ok(template_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psd::header::header_bytes;
    use test_case::test_case;

    #[test_case(Vec::new() ; "empty")]
    #[test_case(b"not a psd at all, just some bytes".to_vec() ; "garbage")]
    #[test_case(header_bytes(2, 3, 10, 10, 8, 3) ; "psb")]
    #[test_case(header_bytes(1, 3, 10, 10, 8, 3) ; "header only")]
    fn test_import_rejects_corrupt_input(bytes: Vec<u8>) {
        let err = import_psd(&bytes, &EditorConfig::default()).unwrap_err();
        assert_eq!(err.error_code(), "PSD_PARSE_ERROR");
    }

    #[test]
    fn test_import_rejects_oversized_input() {
        let config = EditorConfig {
            max_psd_bytes: 8,
            ..EditorConfig::default()
        };
        let err = import_psd(&header_bytes(1, 3, 10, 10, 8, 3), &config).unwrap_err();
        assert_eq!(err.error_code(), "PSD_TOO_LARGE");
    }

    #[test]
    fn test_import_missing_file() {
        let err = import_psd_file(Path::new("/nonexistent/card.psd"), &EditorConfig::default())
            .unwrap_err();
        assert_eq!(err.error_code(), "FILE_NOT_FOUND");
    }

    #[test]
    fn test_write_assets_layout() {
        use image::{Rgba, RgbaImage};

        let temp = tempfile::tempdir().unwrap();
        let mut template = TemplateConfig::new("card", "Card", 20, 20);
        template.overlays.push(crate::template::model::Overlay {
            id: "star".to_string(),
            src: PathBuf::from(ASSET_DIR).join("star.png"),
            bounds: crate::template::model::Rect::new(0.0, 0.0, 4.0, 4.0),
            opacity: 1.0,
            locked: false,
        });
        let import = PsdImport {
            header: PsdHeader::parse(&header_bytes(1, 3, 20, 20, 8, 3), &EditorConfig::default())
                .unwrap(),
            template,
            report: MappingReport::default(),
            assets: vec![LayerAsset {
                file_name: "star.png".to_string(),
                pixels: RgbaImage::from_pixel(4, 4, Rgba([255, 200, 0, 255])),
            }],
        };

        let out = temp.path().join("card");
        let template_path = import.write_assets(&out).unwrap();
        assert!(out.join("assets/star.png").exists());

        let loaded = TemplateConfig::load(&template_path).unwrap();
        assert_eq!(loaded, import.template);
    }
}
