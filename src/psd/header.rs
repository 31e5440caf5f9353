//! PSD file header validation.
//!
//! The fixed 26-byte header is checked before the document is handed to the
//! decoder, so corrupt, oversized, or PSB input is rejected up front with a
//! precise reason.

use crate::config::EditorConfig;
use crate::error::{PhotocardError, Result};

/// Length of the fixed file header.
pub const HEADER_LEN: usize = 26;

const SIGNATURE: &[u8; 4] = b"8BPS";
const VERSION_PSD: u16 = 1;
const VERSION_PSB: u16 = 2;
const MAX_CHANNELS: u16 = 56;
const VALID_DEPTHS: [u16; 4] = [1, 8, 16, 32];

/// Color modes a PSD header can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Bitmap,
    Grayscale,
    Indexed,
    Rgb,
    Cmyk,
    Multichannel,
    Duotone,
    Lab,
}

impl ColorMode {
    fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(ColorMode::Bitmap),
            1 => Some(ColorMode::Grayscale),
            2 => Some(ColorMode::Indexed),
            3 => Some(ColorMode::Rgb),
            4 => Some(ColorMode::Cmyk),
            7 => Some(ColorMode::Multichannel),
            8 => Some(ColorMode::Duotone),
            9 => Some(ColorMode::Lab),
            _ => None,
        }
    }
}

/// Parsed file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PsdHeader {
    pub channels: u16,
    pub width: u32,
    pub height: u32,
    pub depth: u16,
    pub color_mode: ColorMode,
}

impl PsdHeader {
    /// Validate the size of the document and parse its header.
    pub fn parse(bytes: &[u8], config: &EditorConfig) -> Result<Self> {
        let size_bytes = bytes.len() as u64;
        if size_bytes > config.max_psd_bytes {
            return Err(PhotocardError::PsdTooLarge {
                size_bytes,
                max_bytes: config.max_psd_bytes,
            });
        }

        if bytes.len() < HEADER_LEN {
            return Err(parse_error(format!(
                "file is {} bytes, shorter than the {}-byte header",
                bytes.len(),
                HEADER_LEN
            )));
        }

        if &bytes[0..4] != SIGNATURE {
            return Err(parse_error("missing 8BPS signature"));
        }

        match read_u16(bytes, 4) {
            VERSION_PSD => {}
            VERSION_PSB => return Err(parse_error("large document format (PSB) is not supported")),
            other => return Err(parse_error(format!("unknown version {}", other))),
        }

        if bytes[6..12].iter().any(|&b| b != 0) {
            return Err(parse_error("reserved header bytes are not zero"));
        }

        let channels = read_u16(bytes, 12);
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(parse_error(format!("invalid channel count {}", channels)));
        }

        let height = read_u32(bytes, 14);
        let width = read_u32(bytes, 18);
        let max = config.max_psd_dimension;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(parse_error(format!(
                "document size {}x{} is outside 1..={}",
                width, height, max
            )));
        }

        let depth = read_u16(bytes, 22);
        if !VALID_DEPTHS.contains(&depth) {
            return Err(parse_error(format!("invalid bit depth {}", depth)));
        }

        let mode = read_u16(bytes, 24);
        let color_mode = ColorMode::from_u16(mode)
            .ok_or_else(|| parse_error(format!("unknown color mode {}", mode)))?;

        Ok(PsdHeader {
            channels,
            width,
            height,
            depth,
            color_mode,
        })
    }
}

fn parse_error(reason: impl Into<String>) -> PhotocardError {
    PhotocardError::PsdParse {
        reason: reason.into(),
    }
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[cfg(test)]
pub(crate) fn header_bytes(version: u16, channels: u16, width: u32, height: u32, depth: u16, mode: u16) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_LEN);
    bytes.extend_from_slice(SIGNATURE);
    bytes.extend_from_slice(&version.to_be_bytes());
    bytes.extend_from_slice(&[0u8; 6]);
    bytes.extend_from_slice(&channels.to_be_bytes());
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&depth.to_be_bytes());
    bytes.extend_from_slice(&mode.to_be_bytes());
    bytes
}
