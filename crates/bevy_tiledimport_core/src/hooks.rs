//! Extension hooks called during import.

use bevy::prelude::*;
use bevy_tiledimport_assets::properties::CustomProperties;

use crate::assets::{TileMapAsset, TileSetAsset};

/// Where a set of custom properties was loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyOwner<'a> {
    TileMap { asset_path: &'a str },
    TileLayer { asset_path: &'a str, layer_index: u32 },
    /// `coordinates` is `(x, y, layer_index)`.
    TileInstance { asset_path: &'a str, coordinates: UVec3 },
    TileSet { asset_path: &'a str },
    Tile { asset_path: &'a str, tile_index: u32 },
}

/// Callbacks invoked by the importer. Every method defaults to a no-op.
///
/// # Example
///
/// ```rust
/// use bevy_tiledimport_core::assets::TileMapAsset;
/// use bevy_tiledimport_core::hooks::ImportHooks;
///
/// struct CenterCamera;
///
/// impl ImportHooks for CenterCamera {
///     fn on_tile_map_imported(&self, asset_path: &str, tile_map: &mut TileMapAsset) {
///         tile_map.pixels_per_unit = tile_map.tile_width as f32;
///     }
/// }
/// ```
pub trait ImportHooks: Send + Sync {
    /// Runs after a tile map is assembled, before it is saved.
    fn on_tile_map_imported(&self, _asset_path: &str, _tile_map: &mut TileMapAsset) {}

    /// Runs after a tile set is assembled, before it is saved.
    fn on_tile_set_imported(&self, _asset_path: &str, _tile_set: &mut TileSetAsset) {}

    /// Runs whenever a property list is applied to part of an asset.
    fn on_custom_properties_loaded(&self, _owner: PropertyOwner<'_>, _properties: &CustomProperties) {}
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl ImportHooks for NoHooks {}
