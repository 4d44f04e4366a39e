//! Tile sheet image import.

use std::path::{Path, PathBuf};

use bevy::prelude::*;
use thiserror::Error;

use crate::assets::MaterialType;

#[derive(Debug, Error)]
pub enum TextureImportError {
    #[error("Texture '{}' does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to decode texture '{}': {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// What the importer needs to know about a tile sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    pub size: UVec2,
    pub material: MaterialType,
}

/// Reads tile sheet images.
pub trait TextureImporter: Send + Sync {
    /// Inspect the image at `source`. Pixels matching `chroma_key` count as fully
    /// transparent.
    fn import(&self, source: &Path, chroma_key: Option<Srgba>) -> Result<TextureInfo, TextureImportError>;
}

/// Decodes images with the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageTextureImporter;

impl TextureImporter for ImageTextureImporter {
    fn import(&self, source: &Path, chroma_key: Option<Srgba>) -> Result<TextureInfo, TextureImportError> {
        if !source.is_file() {
            return Err(TextureImportError::NotFound(source.to_path_buf()));
        }
        let decode_error = |source_error| TextureImportError::Decode {
            path: source.to_path_buf(),
            source: source_error,
        };
        let image = image::ImageReader::open(source)
            .map_err(|err| decode_error(image::ImageError::IoError(err)))?
            .with_guessed_format()
            .map_err(|err| decode_error(image::ImageError::IoError(err)))?
            .decode()
            .map_err(decode_error)?;
        let mut image = image.to_rgba8();

        if let Some(key) = chroma_key {
            apply_chroma_key(&mut image, key);
        }
        let material = classify_alpha(image.pixels().map(|pixel| pixel.0[3]));

        Ok(TextureInfo {
            size: UVec2::new(image.width(), image.height()),
            material,
        })
    }
}

/// Make every pixel matching `key` fully transparent. Alpha of `key` is ignored.
pub fn apply_chroma_key(image: &mut image::RgbaImage, key: Srgba) {
    let key = key.to_u8_array_no_alpha();
    for pixel in image.pixels_mut() {
        let [r, g, b, _] = pixel.0;
        if [r, g, b] == key {
            pixel.0[3] = 0;
        }
    }
}

/// Opaque if every alpha is 255, masked if only 0 and 255 appear, translucent
/// otherwise.
pub fn classify_alpha(alphas: impl IntoIterator<Item = u8>) -> MaterialType {
    let mut material = MaterialType::Opaque;
    for alpha in alphas {
        match alpha {
            255 => {}
            0 => material = MaterialType::Masked,
            _ => return MaterialType::Translucent,
        }
    }
    material
}
