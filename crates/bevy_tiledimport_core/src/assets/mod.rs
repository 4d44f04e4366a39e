//! Generated assets.
//!
//! These are the outputs of an import: plain serde structs persisted through an
//! [`AssetStore`](crate::store::AssetStore), one per generated asset path.

mod flipbook;
mod texture;
mod tilemap;
mod tileset;

pub use flipbook::{FLIPBOOK_FRAMES_PER_SECOND, FlipbookAsset, FlipbookKeyFrame};
pub use texture::{MaterialType, SpriteAsset, TextureAsset};
pub use tilemap::{
    LayerContent, TileCell, TileInstance, TileLayerData, TileMapAsset, TileMapLayer, TileSetBinding,
};
pub use tileset::{MAX_TERRAINS, NO_TERRAIN_MEMBERSHIP, TerrainType, TileMetadata, TileSetAsset};

use serde::{Deserialize, Serialize};

/// Any generated asset, as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "asset")]
pub enum GeneratedAsset {
    TileMap(TileMapAsset),
    TileSet(TileSetAsset),
    Texture(TextureAsset),
    Sprite(SpriteAsset),
    Flipbook(FlipbookAsset),
}

/// Conversion between a concrete asset type and [`GeneratedAsset`].
pub trait AssetData: Default + Sized {
    fn into_generated(self) -> GeneratedAsset;

    fn from_generated(asset: GeneratedAsset) -> Option<Self>;
}

macro_rules! asset_data {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl AssetData for $ty {
                fn into_generated(self) -> GeneratedAsset {
                    GeneratedAsset::$variant(self)
                }

                fn from_generated(asset: GeneratedAsset) -> Option<Self> {
                    match asset {
                        GeneratedAsset::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )*
    };
}

asset_data! {
    TileMap => TileMapAsset,
    TileSet => TileSetAsset,
    Texture => TextureAsset,
    Sprite => SpriteAsset,
    Flipbook => FlipbookAsset,
}
