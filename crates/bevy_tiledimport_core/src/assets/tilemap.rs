use bevy::prelude::*;
use bevy_tiledimport_assets::gid::TileFlags;
use bevy_tiledimport_assets::layer::DrawOrder;
use bevy_tiledimport_assets::map::{
    DEFAULT_BACKGROUND, RenderOrder, StaggerAxis, StaggerIndex, TiledOrientation,
};
use bevy_tiledimport_assets::object::TiledObject;
use bevy_tiledimport_assets::properties::CustomProperties;
use serde::{Deserialize, Serialize};

use super::MaterialType;

/// A tile set used by a map, with its offset in the map's GID space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSetBinding {
    pub first_gid: u32,
    /// Asset path of the [`TileSetAsset`](super::TileSetAsset), `None` if its import
    /// failed.
    pub asset: Option<String>,
}

/// One resolved cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileCell {
    /// Original GID, flags included.
    pub gid: u32,
    /// Index into [`TileMapAsset::tile_sets`].
    pub tile_set: usize,
    /// Local tile index within the tile set.
    pub tile_id: u32,
    pub flags: TileFlags,
}

/// Per-cell object for occupied cells, carrying instance properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TileInstance {
    /// `(x, y, layer_index)`.
    pub coordinates: UVec3,
    pub properties: CustomProperties,
}

/// Cell grid of a tile layer.
///
/// Individual tiles are plain data. Tile instances exist only for occupied cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TileLayerData {
    /// Width in tiles.
    pub width: u32,
    /// Height in tiles.
    pub height: u32,
    /// Flattened grid, index = y * width + x. `None` = empty cell.
    pub cells: Vec<Option<TileCell>>,
    /// Parallel to `cells`.
    pub instances: Vec<Option<TileInstance>>,
}

impl TileLayerData {
    /// Create an empty layer with the given dimensions.
    pub fn empty(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            cells: vec![None; len],
            instances: vec![None; len],
        }
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }

    fn position(&self, index: usize) -> (u32, u32) {
        let width = self.width as usize;
        ((index % width) as u32, (index / width) as u32)
    }

    /// Get the cell at a position (None if out of bounds or empty).
    pub fn get(&self, x: u32, y: u32) -> Option<&TileCell> {
        self.cells.get(self.index(x, y)?)?.as_ref()
    }

    /// Set the cell at a position. Out of bounds positions are ignored.
    pub fn set(&mut self, x: u32, y: u32, cell: Option<TileCell>) {
        if let Some(slot) = self.index(x, y).and_then(|index| self.cells.get_mut(index)) {
            *slot = cell;
        }
    }

    pub fn instance(&self, x: u32, y: u32) -> Option<&TileInstance> {
        self.instances.get(self.index(x, y)?)?.as_ref()
    }

    pub fn instance_mut(&mut self, x: u32, y: u32) -> Option<&mut TileInstance> {
        let index = self.index(x, y)?;
        self.instances.get_mut(index)?.as_mut()
    }

    /// Iterate all non-empty cells with their positions.
    pub fn iter_tiles(&self) -> impl Iterator<Item = (u32, u32, &TileCell)> {
        self.cells.iter().enumerate().filter_map(|(index, cell)| {
            cell.as_ref().map(|cell| {
                let (x, y) = self.position(index);
                (x, y, cell)
            })
        })
    }

    /// Create an instance for every occupied cell and drop instances of empty ones.
    ///
    /// Existing instances keep their properties.
    pub fn refresh_instances(&mut self, layer_index: u32) {
        self.instances.resize(self.cells.len(), None);
        for (index, (cell, instance)) in self.cells.iter().zip(self.instances.iter_mut()).enumerate() {
            match (cell, instance.as_mut()) {
                (None, _) => *instance = None,
                (Some(_), Some(existing)) => {
                    existing.coordinates.z = layer_index;
                }
                (Some(_), None) => {
                    let width = self.width as usize;
                    let (x, y) = ((index % width) as u32, (index / width) as u32);
                    *instance = Some(TileInstance {
                        coordinates: UVec3::new(x, y, layer_index),
                        properties: CustomProperties::default(),
                    });
                }
            }
        }
    }
}

/// What a layer holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayerContent {
    Tiles(TileLayerData),
    Objects {
        objects: Vec<TiledObject>,
        draw_order: DrawOrder,
    },
    Image {
        path: String,
    },
}

impl Default for LayerContent {
    fn default() -> Self {
        Self::Tiles(TileLayerData::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileMapLayer {
    pub name: String,
    pub visible: bool,
    /// White, with alpha from the layer opacity.
    pub color: Srgba,
    /// 0 is the top-most layer.
    pub layer_index: u32,
    /// Pixel offset.
    pub offset: IVec2,
    pub properties: CustomProperties,
    pub content: LayerContent,
}

impl Default for TileMapLayer {
    fn default() -> Self {
        Self {
            name: String::new(),
            visible: true,
            color: Srgba::WHITE,
            layer_index: 0,
            offset: IVec2::ZERO,
            properties: CustomProperties::default(),
            content: LayerContent::default(),
        }
    }
}

impl TileMapLayer {
    pub fn tiles(&self) -> Option<&TileLayerData> {
        match &self.content {
            LayerContent::Tiles(tiles) => Some(tiles),
            _ => None,
        }
    }

    pub fn tiles_mut(&mut self) -> Option<&mut TileLayerData> {
        match &mut self.content {
            LayerContent::Tiles(tiles) => Some(tiles),
            _ => None,
        }
    }
}

/// A generated tile map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileMapAsset {
    /// Size in tiles.
    pub map_width: u32,
    pub map_height: u32,
    /// Tile size in pixels. The height includes the hex side length on hexagonal maps.
    pub tile_width: u32,
    pub tile_height: u32,
    pub separation_per_tile_x: f32,
    pub separation_per_tile_y: f32,
    pub separation_per_layer: f32,
    pub pixels_per_unit: f32,
    pub projection: TiledOrientation,
    pub hex_side_length: u32,
    pub stagger_axis: StaggerAxis,
    pub stagger_index: StaggerIndex,
    pub render_order: RenderOrder,
    pub background_color: Srgba,
    pub tile_sets: Vec<TileSetBinding>,
    /// Tile set selected by default for painting.
    pub selected_tile_set: Option<String>,
    /// Top-most layer first.
    pub layers: Vec<TileMapLayer>,
    pub material: MaterialType,
    pub properties: CustomProperties,
}

impl Default for TileMapAsset {
    fn default() -> Self {
        Self {
            map_width: 0,
            map_height: 0,
            tile_width: 0,
            tile_height: 0,
            separation_per_tile_x: 0.0,
            separation_per_tile_y: 0.0,
            separation_per_layer: 1.0,
            pixels_per_unit: 1.0,
            projection: TiledOrientation::Orthogonal,
            hex_side_length: 0,
            stagger_axis: StaggerAxis::default(),
            stagger_index: StaggerIndex::default(),
            render_order: RenderOrder::default(),
            background_color: DEFAULT_BACKGROUND,
            tile_sets: Vec::new(),
            selected_tile_set: None,
            layers: Vec::new(),
            material: MaterialType::Masked,
            properties: CustomProperties::default(),
        }
    }
}

impl TileMapAsset {
    /// `true` if any binding points at the given tile set asset.
    pub fn uses_tile_set(&self, asset_path: &str) -> bool {
        self.tile_sets
            .iter()
            .any(|binding| binding.asset.as_deref() == Some(asset_path))
    }

    /// Rebuild the tile instances of every tile layer.
    pub fn refresh_instances(&mut self) {
        for layer in &mut self.layers {
            let layer_index = layer.layer_index;
            if let Some(tiles) = layer.tiles_mut() {
                tiles.refresh_instances(layer_index);
            }
        }
    }
}
