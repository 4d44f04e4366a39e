//! # bevy_tiledimport
//!
//! Tiled JSON importer for Bevy projects.
//!
//! This is a meta-crate combining the `bevy_tiledimport_*` sub-crates.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bevy::prelude::*;
//! use bevy_tiledimport::prelude::*;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(MinimalPlugins)
//!         .add_plugins(TiledImportPlugin::default())
//!         .add_systems(Startup, import_level)
//!         .run();
//! }
//!
//! fn import_level(mut manager: ResMut<ResourceManager>) {
//!     let source = std::path::Path::new("maps/level1.tmj");
//!     if manager.find_resource("maps/level1.tmj", None, None).is_none() {
//!         if let Err(err) = manager.import_resource(source, "assets/maps/level1".as_ref()) {
//!             error!("{err}");
//!         }
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Layer 1** ([`assets`]): parsing of Tiled `.tmj`/`.tsj`/`.json` documents, GID
//!   resolution, collision geometry and custom properties
//! - **Layer 2** ([`core`]): generated assets, the resource dependency graph and the
//!   manager that imports, reimports and garbage-collects them
//!
//! Changed sources are picked up by the periodic auto-reimport sweep the plugin
//! runs every [`TiledImportConfig::tick_interval`](core::config::TiledImportConfig::tick_interval)
//! seconds.

// Re-export sub-crates for advanced usage
pub use bevy_tiledimport_assets as assets;
pub use bevy_tiledimport_core as core;

/// Unified prelude for `bevy_tiledimport`.
pub mod prelude {
    pub use crate::assets::prelude::*;
    pub use crate::core::prelude::*;
}
