//! Texture loading and skin classification.
//!
//! Decodes raster images (network or disk) into RGBA8 pixel buffers and
//! tags dual-layer skin textures by their pixel dimensions. Skins come in
//! two fixed layouts: the square 64x64 atlas and the legacy 64x32
//! half-height atlas.

use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Identifying header sent with skin downloads. Some texture hosts reject
/// requests without a browser-like agent string.
const USER_AGENT: &str = "Mozilla/5.0 (compatible; skin-portrait/0.1)";

/// Where the texture bytes come from.
#[derive(Debug, Clone, PartialEq)]
pub enum TextureSource {
    /// An absolute http(s) URL.
    Url(String),
    /// A file on disk.
    Path(PathBuf),
}

impl From<&str> for TextureSource {
    fn from(value: &str) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            Self::Url(value.to_string())
        } else {
            Self::Path(PathBuf::from(value))
        }
    }
}

/// A decoded RGBA8 image.
#[derive(Debug, Clone)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 rows, top to bottom.
    pub pixels: Vec<u8>,
}

impl TextureImage {
    /// Load from a [`TextureSource`].
    pub fn load(source: &TextureSource) -> Result<Self> {
        match source {
            TextureSource::Url(url) => Self::fetch(url),
            TextureSource::Path(path) => Self::open(path),
        }
    }

    /// Fetch and decode a texture over HTTP. Blocks until the transfer
    /// completes or fails; no retries.
    pub fn fetch(url: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;

        let response = client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::FetchStatus {
                status,
                url: url.to_string(),
            });
        }

        let bytes = response.bytes()?;
        tracing::debug!("Fetched texture: {} bytes from {}", bytes.len(), url);
        Self::from_bytes(&bytes)
    }

    /// Decode a texture from a file on disk.
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Decode a texture from any reader.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    /// Decode a texture from raw encoded bytes (PNG, JPEG, ...).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)?.into_rgba8();
        let (width, height) = decoded.dimensions();
        tracing::debug!("Decoded texture: {}x{}", width, height);
        Ok(Self {
            width,
            height,
            pixels: decoded.into_raw(),
        })
    }

    /// Procedural magenta/black checkerboard, for diagnostics when no
    /// real texture is supplied.
    pub fn checkerboard(width: u32, height: u32) -> Self {
        let mut pixels = vec![0u8; (width * height * 4) as usize];
        for y in 0..height {
            for x in 0..width {
                let idx = ((y * width + x) * 4) as usize;
                let is_magenta = (x + y) % 2 == 0;
                if is_magenta {
                    pixels[idx] = 255;
                    pixels[idx + 2] = 255;
                }
                pixels[idx + 3] = 255;
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Solid single-color texture.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..width * height {
            pixels.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// True when the dimensions match a dual-layer skin atlas: the square
    /// 64x64 layout or the legacy 64x32 half-height layout.
    pub fn is_skin(&self) -> bool {
        matches!((self.width, self.height), (64, 64) | (64, 32))
    }
}
