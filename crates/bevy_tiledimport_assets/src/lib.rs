//! # `bevy_tiledimport_assets`
//!
//! Pure parsing layer for `bevy_tiledimport`. Reads Tiled JSON exports into typed
//! structs and provides the GID, geometry and custom property helpers the import
//! pipeline builds on.
//!
//! **This crate does NOT create assets or track files** - that is the job of
//! Layer 2 (`bevy_tiledimport_core`).
//!
//! ## Architecture
//!
//! Every parser reads `serde_json::Value` trees through the extractors in [`json`]
//! and records problems in a [`json::ParseReport`] instead of bailing out, so one
//! pass surfaces every error in a document and still yields a best-effort struct:
//!
//! - [`map::TileMapFromTiled`]: map fields and layers
//! - [`layer::TileLayerFromTiled`]: tile grids, object groups, image layers
//! - [`tileset::TileSetFromTiled`]: tileset documents, standalone or embedded
//! - [`tile_info::TiledTileInfo`]: per-tile terrain, probability, collision, animation
//! - [`object::TiledObject`]: placed shapes
//!
//! ## Example Usage
//!
//! ```rust
//! use bevy_tiledimport_assets::prelude::*;
//! use serde_json::json;
//!
//! let document = json!({
//!     "type": "map", "version": 1, "orientation": "orthogonal",
//!     "width": 2, "height": 1, "tilewidth": 16, "tileheight": 16,
//!     "layers": [{
//!         "type": "tilelayer", "name": "ground",
//!         "width": 2, "height": 1, "x": 0, "y": 0, "data": [0, 2]
//!     }]
//! });
//!
//! let mut report = ParseReport::new();
//! let mut map = TileMapFromTiled::default();
//! assert!(map.parse_json(document.as_object().unwrap(), "level.tmj", &mut report));
//! assert!(map.is_valid() && map.layers_valid());
//!
//! let tile_sets = [(1, Some("terrain"))];
//! let cell = resolve_gid(map.layers[0].gid_at(1, 0), tile_sets.iter().map(|(gid, set)| (*gid, set.as_ref())));
//! assert_eq!(cell.map(|tile| tile.local_index), Some(1));
//! ```

pub mod geometry;
pub mod gid;
pub mod json;
pub mod layer;
pub mod map;
pub mod object;
pub mod paths;
pub mod properties;
pub mod tile_info;
pub mod tileset;

pub mod prelude {
    //! Common imports for `bevy_tiledimport_assets` users.

    pub use crate::geometry::{CollisionShape, ShapeType, SpriteGeometry, add_to_geometry_collection};
    pub use crate::gid::{ResolvedTile, TileFlags, encode_gid, resolve_gid};
    pub use crate::json::{JsonFileError, ParseError, ParseReport, load_json_file};
    pub use crate::layer::{DrawOrder, TileLayerFromTiled, TiledLayerType};
    pub use crate::map::{RenderOrder, StaggerAxis, StaggerIndex, TileMapFromTiled, TiledOrientation};
    pub use crate::object::{TiledObject, TiledObjectKind};
    pub use crate::properties::{CustomProperties, FromCustomProperty};
    pub use crate::tile_info::{AnimationFrame, TiledTerrain, TiledTileInfo};
    pub use crate::tileset::TileSetFromTiled;
}
