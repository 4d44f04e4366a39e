use bevy::prelude::*;
use bevy_tiledimport_assets::geometry::SpriteGeometry;
use bevy_tiledimport_assets::properties::CustomProperties;
use serde::{Deserialize, Serialize};

/// Terrain membership byte meaning "no terrain".
pub const NO_TERRAIN_MEMBERSHIP: u8 = 0xFF;

/// Terrains a tile set can hold, so every index fits below [`NO_TERRAIN_MEMBERSHIP`].
pub const MAX_TERRAINS: usize = 0xFE;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainType {
    pub name: String,
    /// Representative tile, `None` if the terrain has none.
    pub solid_tile: Option<u32>,
}

/// Generated metadata for one tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileMetadata {
    pub collision: SpriteGeometry,
    /// Terrain index per corner: top-left, top-right, bottom-left, bottom-right.
    pub terrain_membership: [u8; 4],
    pub properties: CustomProperties,
    /// Copied from the `UserDataName` string property.
    pub user_data_name: Option<String>,
    /// Asset path of the tile's flipbook, for animated tiles.
    pub flipbook: Option<String>,
}

impl Default for TileMetadata {
    fn default() -> Self {
        Self {
            collision: SpriteGeometry::default(),
            terrain_membership: [NO_TERRAIN_MEMBERSHIP; 4],
            properties: CustomProperties::default(),
            user_data_name: None,
            flipbook: None,
        }
    }
}

impl TileMetadata {
    pub fn has_metadata(&self) -> bool {
        !self.collision.is_empty()
            || self.terrain_membership != [NO_TERRAIN_MEMBERSHIP; 4]
            || !self.properties.is_empty()
            || self.user_data_name.is_some()
            || self.flipbook.is_some()
    }
}

/// A generated tile set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TileSetAsset {
    pub tile_size: UVec2,
    pub margin: u32,
    pub spacing: u32,
    /// Pixel offset applied when drawing tiles.
    pub drawing_offset: IVec2,
    /// Asset path of the tile sheet [`TextureAsset`](super::TextureAsset).
    pub texture: Option<String>,
    /// Pixel size of the tile sheet at import time.
    pub texture_size: UVec2,
    pub transparent_color: Option<Srgba>,
    pub terrains: Vec<TerrainType>,
    /// One entry per tile in the sheet, row-major.
    pub tiles: Vec<TileMetadata>,
    pub properties: CustomProperties,
}

impl TileSetAsset {
    /// Tiles per row and per column that fit in the sheet.
    pub fn grid_size(&self) -> UVec2 {
        let axis = |texture: u32, tile: u32| {
            let step = tile + self.spacing;
            if step == 0 {
                0
            } else {
                texture.saturating_sub(self.margin) / step
            }
        };
        UVec2::new(
            axis(self.texture_size.x, self.tile_size.x),
            axis(self.texture_size.y, self.tile_size.y),
        )
    }

    pub fn tile_count(&self) -> u32 {
        let grid = self.grid_size();
        grid.x * grid.y
    }

    /// Pixel rectangle of a tile as `(min, size)`, `None` past the end of the sheet.
    pub fn tile_rect(&self, tile_index: u32) -> Option<(UVec2, UVec2)> {
        let grid = self.grid_size();
        if grid.x == 0 || tile_index >= self.tile_count() {
            return None;
        }
        let cell = UVec2::new(tile_index % grid.x, tile_index / grid.x);
        let min = cell * (self.tile_size + UVec2::splat(self.spacing)) + UVec2::splat(self.margin);
        Some((min, self.tile_size))
    }

    pub fn tile(&self, tile_index: u32) -> Option<&TileMetadata> {
        self.tiles.get(tile_index as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> TileSetAsset {
        TileSetAsset {
            tile_size: UVec2::splat(16),
            margin: 1,
            spacing: 1,
            texture_size: UVec2::new(69, 35),
            ..default()
        }
    }

    #[test]
    fn test_grid_and_rects() {
        let tile_set = sheet();
        assert_eq!(tile_set.grid_size(), UVec2::new(4, 2));
        assert_eq!(tile_set.tile_count(), 8);
        assert_eq!(tile_set.tile_rect(5), Some((UVec2::new(18, 18), UVec2::splat(16))));
        assert_eq!(tile_set.tile_rect(8), None);
    }

    #[test]
    fn test_zero_tile_size_has_no_tiles() {
        let tile_set = TileSetAsset {
            texture_size: UVec2::splat(64),
            ..default()
        };
        assert_eq!(tile_set.tile_count(), 0);
        assert_eq!(tile_set.tile_rect(0), None);
    }
}
