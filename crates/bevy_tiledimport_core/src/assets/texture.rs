use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Blend mode a tile sheet needs, derived from its alpha channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MaterialType {
    /// Every pixel is fully opaque.
    #[default]
    Opaque,
    /// Pixels are either fully opaque or fully transparent.
    Masked,
    /// At least one pixel is partially transparent.
    Translucent,
}

/// An imported tile sheet image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextureAsset {
    /// Source image, relative to the project root.
    pub source: String,
    /// Pixel size.
    pub size: UVec2,
    pub material: MaterialType,
    /// Color treated as transparent when the sheet was classified.
    pub chroma_key: Option<Srgba>,
}

/// A rectangle of a texture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpriteAsset {
    /// Asset path of the [`TextureAsset`].
    pub texture: Option<String>,
    /// Top-left corner in pixels.
    pub source_min: UVec2,
    pub source_size: UVec2,
}
