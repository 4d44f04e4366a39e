//! # `bevy_tiledimport_core`
//!
//! Import pipeline for `bevy_tiledimport`. Turns Tiled maps and tilesets into
//! generated assets and keeps track of which source files produced which assets,
//! so changed sources are reimported and unused assets are cleaned up.
//!
//! **This crate does NOT parse Tiled JSON itself** - that is Layer 1
//! (`bevy_tiledimport_assets`).
//!
//! ## Architecture
//!
//! - **Resources** ([`resource`]): one node per tracked file or file part (tile
//!   map, tile set, texture, flipbook, sprite) with dependency and used-by edges
//! - **Manager** ([`manager::ResourceManager`]): import, reimport, delete and
//!   auto-reimport verbs, the lifespan sweep, and state persistence
//! - **Importers**: one per resource kind, writing assets through an
//!   [`store::AssetStore`] and reading images through a
//!   [`texture::TextureImporter`]
//! - **Hooks** ([`hooks::ImportHooks`]): callbacks for imported maps, tile sets
//!   and custom properties
//!
//! ## Generated Assets
//!
//! | Kind | Asset | Path |
//! |------|-------|------|
//! | Tile map | [`assets::TileMapAsset`] | chosen on import |
//! | Tile set | [`assets::TileSetAsset`] | `TileSets/BP_<name>` |
//! | Texture | [`assets::TextureAsset`] | `Textures/T_<name>` |
//! | Flipbook | [`assets::FlipbookAsset`] | `Flipbooks/FB_<tileset>_<tile>` |
//! | Sprite | [`assets::SpriteAsset`] | `Sprites/S_<tileset>_<tile>` |
//!
//! Dependency paths are relative to the directory of the asset that pulled them in.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use bevy_tiledimport_core::prelude::*;
//!
//! let mut manager = ResourceManager::with_filesystem(TiledImportConfig {
//!     project_dir: "game".into(),
//!     ..Default::default()
//! });
//! manager.load_state().ok();
//!
//! let map = manager
//!     .import_resource("maps/level1.tmj".as_ref(), "assets/maps/level1".as_ref())
//!     .unwrap();
//! for tile_set in manager.dependencies_of(map) {
//!     println!("{}", manager.get_resource(tile_set).unwrap().name);
//! }
//! ```

pub mod assets;
pub mod config;
pub mod error;
pub mod hooks;
mod importer;
pub mod manager;
pub mod plugin;
pub mod resource;
pub mod state;
pub mod store;
pub mod texture;

pub mod prelude {
    //! Common imports for `bevy_tiledimport_core` users.

    pub use crate::assets::{
        FlipbookAsset, GeneratedAsset, LayerContent, MaterialType, SpriteAsset, TextureAsset,
        TileLayerData, TileMapAsset, TileMapLayer, TileSetAsset,
    };
    pub use crate::config::{ImporterSettings, TiledImportConfig};
    pub use crate::error::ImportError;
    pub use crate::hooks::{ImportHooks, PropertyOwner};
    pub use crate::manager::{ResourceEvent, ResourceManager};
    pub use crate::plugin::{
        AutoReimportDisabled, ResourceAdded, ResourceReimported, ResourceRemoved,
        TiledImportPlugin,
    };
    pub use crate::resource::{ResourceId, ResourceKind};
    pub use crate::store::{AssetStore, FileAssetStore};
    pub use crate::texture::{ImageTextureImporter, TextureImporter};
}
