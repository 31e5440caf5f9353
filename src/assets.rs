//! Image intake
//!
//! Validates images before they enter a session: upload size, format
//! (detected from content, never from the extension), and dimensions. The
//! content hash lets history snapshots compare images without pixels.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, ImageReader};
use sha2::{Digest, Sha256};

use crate::config::EditorConfig;
use crate::error::{PhotocardError, Result};
use crate::state::snapshot::ImageData;

/// Read and validate an image file for placement into a slot.
///
/// # Errors
/// * `FileNotFound` - the file does not exist
/// * `ImageTooLarge` - the file exceeds `config.max_image_bytes`
/// * `UnsupportedImageFormat` - the content is not an allowed format
/// * `InvalidImage` - the header cannot be decoded
pub fn inspect_image(path: &Path, config: &EditorConfig) -> Result<ImageData> {
    if !path.exists() {
        return Err(PhotocardError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let metadata = fs::metadata(path).map_err(|e| PhotocardError::FileReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    if metadata.len() > config.max_image_bytes {
        return Err(PhotocardError::ImageTooLarge {
            size_bytes: metadata.len(),
            max_bytes: config.max_image_bytes,
        });
    }

    let bytes = fs::read(path).map_err(|e| PhotocardError::FileReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let source = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let mut image = inspect_image_bytes(&bytes, config)?;
    image.source = source;
    Ok(image)
}

/// Validate in-memory image bytes. The returned `source` is empty.
pub fn inspect_image_bytes(bytes: &[u8], config: &EditorConfig) -> Result<ImageData> {
    let byte_len = bytes.len() as u64;
    if byte_len > config.max_image_bytes {
        return Err(PhotocardError::ImageTooLarge {
            size_bytes: byte_len,
            max_bytes: config.max_image_bytes,
        });
    }

    let format = image::guess_format(bytes).map_err(|_| PhotocardError::UnsupportedImageFormat {
        format: "unknown".to_string(),
    })?;
    let format_name = format_name(format);
    if !config.allows_format(&format_name) {
        return Err(PhotocardError::UnsupportedImageFormat {
            format: format_name,
        });
    }

    let (width, height) = ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(|e| PhotocardError::InvalidImage {
            reason: e.to_string(),
        })?;
    if width == 0 || height == 0 {
        return Err(PhotocardError::InvalidImage {
            reason: format!("{}x{} image has no pixels", width, height),
        });
    }

    Ok(ImageData {
        source: Default::default(),
        content_hash: content_hash(bytes),
        width,
        height,
        format: format_name,
        byte_len,
    })
}

/// SHA-256 of `bytes` as lowercase hex.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        other => other
            .extensions_str()
            .first()
            .map(|ext| ext.to_string())
            .unwrap_or_else(|| format!("{:?}", other).to_ascii_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 10, 10, 255]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_inspect_png() {
        let bytes = png_bytes(7, 3);
        let image = inspect_image_bytes(&bytes, &EditorConfig::default()).unwrap();
        assert_eq!((image.width, image.height), (7, 3));
        assert_eq!(image.format, "png");
        assert_eq!(image.byte_len, bytes.len() as u64);
        assert_eq!(image.content_hash.len(), 64);
    }

    #[test]
    fn test_rejects_oversized_upload() {
        let config = EditorConfig {
            max_image_bytes: 16,
            ..EditorConfig::default()
        };
        let err = inspect_image_bytes(&png_bytes(4, 4), &config).unwrap_err();
        assert_eq!(err.error_code(), "IMAGE_TOO_LARGE");
    }

    #[test]
    fn test_rejects_disallowed_format() {
        let config = EditorConfig {
            allowed_image_formats: vec!["jpeg".to_string()],
            ..EditorConfig::default()
        };
        let err = inspect_image_bytes(&png_bytes(4, 4), &config).unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_IMAGE_FORMAT");
    }

    #[test]
    fn test_rejects_non_image() {
        let err = inspect_image_bytes(b"just some text", &EditorConfig::default()).unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_IMAGE_FORMAT");
    }

    #[test]
    fn test_inspect_file_sets_source() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("photo.bin");
        fs::write(&path, png_bytes(2, 2)).unwrap();

        let image = inspect_image(&path, &EditorConfig::default()).unwrap();
        assert!(image.source.ends_with("photo.bin"));
        assert_eq!(image.content_hash, content_hash(&fs::read(&path).unwrap()));
    }

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
