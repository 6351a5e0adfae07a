//! Sprite image decoding and GPU upload.
//!
//! Decoding always happens before anything is allocated on the GPU, so a
//! missing or corrupt asset never leaves a texture handle behind.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::renderer::RenderError;
use crate::traits::renderer::RenderBackend;

/// Relative path of the character sprite
pub const DEFAULT_SPRITE_PATH: &str = "assets/ranger.png";

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to read image {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("image {} has {channels} channels, expected 3 or 4", .path.display())]
    UnsupportedChannels { path: PathBuf, channels: u8 },
    #[error("failed to upload texture")]
    Upload(#[from] RenderError),
}

/// Decoded image ready for upload.
///
/// Pixels are always stored as RGBA8; `channels` records what the source
/// file carried so callers can tell whether alpha is meaningful.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteImage {
    width: u32,
    height: u32,
    channels: u8,
    rgba: Vec<u8>,
}

impl SpriteImage {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TextureError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| TextureError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::decode(&bytes, path)
    }

    /// Decode an in-memory image; `path` is only used for error reporting
    pub fn decode(bytes: &[u8], path: &Path) -> Result<Self, TextureError> {
        let image = image::load_from_memory(bytes).map_err(|source| TextureError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

        let channels = image.color().channel_count();
        if channels != 3 && channels != 4 {
            return Err(TextureError::UnsupportedChannels {
                path: path.to_path_buf(),
                channels,
            });
        }

        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();

        Ok(Self {
            width,
            height,
            channels,
            rgba: rgba.into_raw(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn has_alpha(&self) -> bool {
        self.channels == 4
    }

    /// Tightly packed RGBA8 rows, top row first
    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }
}

/// Decode `path` and upload it through `backend`
pub fn load_sprite_texture<B: RenderBackend>(
    backend: &mut B,
    path: impl AsRef<Path>,
) -> Result<B::Texture, TextureError> {
    let path = path.as_ref();
    let image = SpriteImage::load(path)?;

    log::info!(
        "Loaded sprite {} ({}x{}, {})",
        path.display(),
        image.width(),
        image.height(),
        if image.has_alpha() { "RGBA" } else { "RGB" }
    );

    Ok(backend.upload_texture(&image)?)
}
