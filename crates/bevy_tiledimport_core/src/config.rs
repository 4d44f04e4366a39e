//! Importer configuration.

use std::path::{Path, PathBuf};

/// Defaults applied to every tile map import.
#[derive(Debug, Clone, PartialEq)]
pub struct ImporterSettings {
    /// Used when a map has no `PixelsPerUnit` property.
    pub default_pixels_per_unit: f32,
    /// Pick the map material from its tile sheets' alpha channels.
    pub pick_best_material: bool,
    /// Used when a map has no `SeparationPerLayer` property.
    pub default_separation_per_layer: f32,
}

impl Default for ImporterSettings {
    fn default() -> Self {
        Self {
            default_pixels_per_unit: 1.0,
            pick_best_material: true,
            default_separation_per_layer: 1.0,
        }
    }
}

/// Configuration for `TiledImportPlugin` and the resource manager.
///
/// # Example
///
/// ```rust
/// use bevy_tiledimport_core::config::TiledImportConfig;
///
/// let config = TiledImportConfig {
///     project_dir: "game".into(),
///     tick_interval: 1.0,
///     ..Default::default()
/// };
/// assert_eq!(config.content_root(), std::path::Path::new("game/assets"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TiledImportConfig {
    /// Every source file must live under this directory.
    pub project_dir: PathBuf,
    /// Every generated asset must live under this directory, relative to
    /// `project_dir`.
    pub content_dir: PathBuf,
    /// Persisted manager state, relative to `project_dir`.
    pub save_file_path: PathBuf,
    /// Seconds between auto-reimport sweeps.
    pub tick_interval: f32,
    pub importer: ImporterSettings,
}

impl Default for TiledImportConfig {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("."),
            content_dir: PathBuf::from("assets"),
            save_file_path: PathBuf::from("tiled_import.json"),
            tick_interval: 5.0,
            importer: ImporterSettings::default(),
        }
    }
}

impl TiledImportConfig {
    /// Directory the asset store writes to.
    pub fn content_root(&self) -> PathBuf {
        self.project_dir.join(&self.content_dir)
    }

    pub fn save_file(&self) -> PathBuf {
        self.project_dir.join(&self.save_file_path)
    }

    /// Absolute or project-relative path of a source file recorded in the graph.
    pub fn source_file(&self, source: &str) -> PathBuf {
        let path = Path::new(source);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        }
    }
}
