//! Persistence of generated assets.
//!
//! The importer never touches asset files directly. It goes through an
//! [`AssetStore`] keyed by asset path (`"maps/TileSets/BP_forest"`), so the
//! storage backend can be swapped.

use std::path::{Path, PathBuf};

use bevy::prelude::*;
use thiserror::Error;

use crate::assets::{AssetData, GeneratedAsset};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error for asset '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid asset data in '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Storage for generated assets.
pub trait AssetStore: Send + Sync {
    /// Load an asset, `Ok(None)` if nothing is stored at `asset_path`.
    fn load(&self, asset_path: &str) -> Result<Option<GeneratedAsset>, StoreError>;

    fn save(&mut self, asset_path: &str, asset: &GeneratedAsset) -> Result<(), StoreError>;

    fn exists(&self, asset_path: &str) -> bool;

    /// Remove an asset, returning whether anything was removed.
    fn delete(&mut self, asset_path: &str) -> Result<bool, StoreError>;
}

impl dyn AssetStore {
    /// Load an asset of a specific type. An asset of another type reads as absent.
    pub fn load_as<T: AssetData>(&self, asset_path: &str) -> Result<Option<T>, StoreError> {
        Ok(self.load(asset_path)?.and_then(T::from_generated))
    }

    /// The stored asset if it has the right type, otherwise a fresh default.
    ///
    /// Reusing the existing asset keeps fields the import does not write, such
    /// as tile instance properties.
    pub fn create_or_reuse<T: AssetData>(&self, asset_path: &str) -> T {
        match self.load_as::<T>(asset_path) {
            Ok(Some(asset)) => asset,
            Ok(None) => T::default(),
            Err(err) => {
                warn!("Replacing unreadable asset '{asset_path}': {err}");
                T::default()
            }
        }
    }

    pub fn save_as<T: AssetData>(&mut self, asset_path: &str, asset: T) -> Result<(), StoreError> {
        self.save(asset_path, &asset.into_generated())
    }
}

/// Stores each asset as pretty-printed JSON at `<root>/<asset_path>.json`.
#[derive(Debug, Clone)]
pub struct FileAssetStore {
    root: PathBuf,
}

impl FileAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing an asset path.
    pub fn file_path(&self, asset_path: &str) -> PathBuf {
        self.root.join(format!("{asset_path}.json"))
    }

    fn io_error(asset_path: &str) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
        move |source| StoreError::Io {
            path: asset_path.to_owned(),
            source,
        }
    }
}

impl AssetStore for FileAssetStore {
    fn load(&self, asset_path: &str) -> Result<Option<GeneratedAsset>, StoreError> {
        let file = self.file_path(asset_path);
        if !file.is_file() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&file).map_err(Self::io_error(asset_path))?;
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| StoreError::Json {
                path: asset_path.to_owned(),
                source,
            })
    }

    fn save(&mut self, asset_path: &str, asset: &GeneratedAsset) -> Result<(), StoreError> {
        let file = self.file_path(asset_path);
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent).map_err(Self::io_error(asset_path))?;
        }
        let text = serde_json::to_string_pretty(asset).map_err(|source| StoreError::Json {
            path: asset_path.to_owned(),
            source,
        })?;
        std::fs::write(&file, text).map_err(Self::io_error(asset_path))?;
        debug!("Saved asset '{asset_path}' to {}", file.display());
        Ok(())
    }

    fn exists(&self, asset_path: &str) -> bool {
        self.file_path(asset_path).is_file()
    }

    fn delete(&mut self, asset_path: &str) -> Result<bool, StoreError> {
        let file = self.file_path(asset_path);
        if !file.is_file() {
            return Ok(false);
        }
        std::fs::remove_file(&file).map_err(Self::io_error(asset_path))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{MaterialType, TextureAsset, TileSetAsset};

    #[test]
    fn test_save_load_delete() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut store: Box<dyn AssetStore> = Box::new(FileAssetStore::new(dir.path()));

        let texture = TextureAsset {
            source: "art/forest.png".into(),
            size: UVec2::new(64, 32),
            material: MaterialType::Masked,
            chroma_key: None,
        };
        store.save_as("maps/Textures/T_forest", texture.clone()).unwrap();

        assert!(store.exists("maps/Textures/T_forest"));
        assert!(dir.path().join("maps/Textures/T_forest.json").is_file());
        assert_eq!(
            store.load_as::<TextureAsset>("maps/Textures/T_forest").unwrap(),
            Some(texture)
        );
        // Wrong type reads as absent
        assert_eq!(store.load_as::<TileSetAsset>("maps/Textures/T_forest").unwrap(), None);

        assert!(store.delete("maps/Textures/T_forest").unwrap());
        assert!(!store.delete("maps/Textures/T_forest").unwrap());
        assert!(!store.exists("maps/Textures/T_forest"));
    }

    #[test]
    fn test_create_or_reuse() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut store: Box<dyn AssetStore> = Box::new(FileAssetStore::new(dir.path()));

        let fresh: TileSetAsset = store.create_or_reuse("BP_a");
        assert_eq!(fresh, TileSetAsset::default());

        let stored = TileSetAsset {
            margin: 3,
            ..default()
        };
        store.save_as("BP_a", stored.clone()).unwrap();
        assert_eq!(store.create_or_reuse::<TileSetAsset>("BP_a"), stored);

        std::fs::write(dir.path().join("BP_b.json"), "not json").unwrap();
        assert!(store.load("BP_b").is_err());
        assert_eq!(store.create_or_reuse::<TileSetAsset>("BP_b"), TileSetAsset::default());
    }
}
