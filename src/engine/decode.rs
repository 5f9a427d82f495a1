//! Decode primitive: bytes on disk to an in-memory buffer.

use anyhow::{Context, Result};
use std::path::Path;

use crate::DecodedImage;

pub trait Decoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<DecodedImage>;
}

/// Image decoder (format guessed from content). Produces RGBA8 pixels.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageDecoder;

impl Decoder for ImageDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage> {
        let img = image::ImageReader::open(path)
            .with_context(|| format!("open {}", path.display()))?
            .with_guessed_format()
            .with_context(|| format!("sniff format of {}", path.display()))?
            .decode()
            .with_context(|| format!("decode {}", path.display()))?
            .to_rgba8();
        Ok(DecodedImage {
            width: img.width(),
            height: img.height(),
            pixels: img.into_raw(),
        })
    }
}

/// Loads the file as-is: one row, one byte per "pixel". For payloads that are not images.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawDecoder;

impl Decoder for RawDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage> {
        let pixels = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
        let width = Self::row_width(pixels.len())
            .with_context(|| format!("load {}", path.display()))?;
        Ok(DecodedImage {
            width,
            height: 1,
            pixels,
        })
    }
}

impl RawDecoder {
    /// Width of the single row holding `len` bytes. Errors when it does not fit in `u32`.
    pub fn row_width(len: usize) -> Result<u32> {
        u32::try_from(len).with_context(|| format!("{len} bytes is too large for one row"))
    }
}
