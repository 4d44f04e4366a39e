//! Persisted manager state.
//!
//! The graph is written after every mutating operation and read back once at
//! startup. Only the structural fields are stored; JSON documents, tile set
//! offsets and import times are re-derived from the sources on load.

use std::path::{Path, PathBuf};

use bevy::log::{debug, error, info, warn};
use bevy_tiledimport_assets::paths::{resolve_relative_path, to_slash_string};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::manager::ResourceManager;
use crate::resource::{Resource, ResourceId, ResourceKind};

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to access state file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid state file '{}': {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One persisted resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedResource {
    pub id: ResourceId,
    pub name: String,
    /// [`ResourceKind::as_str`].
    #[serde(rename = "type")]
    pub kind: String,
    pub source: String,
    pub asset: String,
    pub auto_reimport: bool,
    pub manually_imported: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub embedded: bool,
    #[serde(default)]
    pub dependencies: Vec<ResourceId>,
}

impl From<&Resource> for SavedResource {
    fn from(resource: &Resource) -> Self {
        Self {
            id: resource.id,
            name: resource.name.clone(),
            kind: resource.kind.as_str().to_owned(),
            source: resource.source_path.clone(),
            asset: resource.asset_path.clone(),
            auto_reimport: resource.auto_reimport,
            manually_imported: resource.manually_imported,
            embedded: resource.embedded,
            dependencies: resource.dependencies.iter().copied().collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedState {
    pub resources: Vec<SavedResource>,
}

impl SavedState {
    pub fn read(path: &Path) -> Result<Self, StateError> {
        let text = std::fs::read_to_string(path).map_err(|source| StateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| StateError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn write(&self, path: &Path) -> Result<(), StateError> {
        let io_error = |source| StateError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let text = serde_json::to_string(self).map_err(|source| StateError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, text).map_err(io_error)
    }
}

impl ResourceManager {
    /// Snapshot of every registered resource that is still valid.
    pub fn saved_state(&self) -> SavedState {
        SavedState {
            resources: self
                .resources()
                .filter(|resource| self.is_valid(resource.id, false, false))
                .map(SavedResource::from)
                .collect(),
        }
    }

    pub fn save_state(&self) -> Result<(), StateError> {
        let path = self.config.save_file();
        self.saved_state().write(&path)?;
        debug!("Saved import state to {}", path.display());
        Ok(())
    }

    /// Rebuild the graph from the state file, returning how many resources were
    /// restored.
    ///
    /// Does nothing if the file does not exist or resources are already
    /// registered. Edges are resolved only after every node exists, so the order
    /// of entries does not matter. Stale resources with auto-reimport enabled are
    /// reimported afterwards.
    pub fn load_state(&mut self) -> Result<usize, StateError> {
        let path = self.config.save_file();
        if !path.is_file() || !self.registered.is_empty() {
            return Ok(0);
        }
        let state = SavedState::read(&path)?;

        let mut edges = Vec::with_capacity(state.resources.len());
        for saved in state.resources {
            let Some(kind) = ResourceKind::parse(&saved.kind) else {
                warn!("Skipping resource {} '{}' of unknown type '{}'", saved.id, saved.name, saved.kind);
                continue;
            };
            if self.instances.contains_key(&saved.id) {
                warn!("Skipping duplicate resource {}", saved.id);
                continue;
            }
            let mut resource = Resource::new(saved.id, kind, saved.name, saved.source);
            resource.asset_path = saved.asset;
            resource.auto_reimport = saved.auto_reimport;
            resource.manually_imported = saved.manually_imported;
            resource.embedded = saved.embedded;
            self.instances.insert(saved.id, resource);
            self.last_generated_id = self.last_generated_id.max(saved.id.0);
            edges.push((saved.id, saved.dependencies));
        }

        for (user, dependencies) in edges {
            for dependency in dependencies {
                if self.instances.contains_key(&dependency) {
                    self.add_dependency(user, dependency);
                } else {
                    error!("Resource {user} depends on unknown resource {dependency}, dropping the edge");
                }
            }
        }

        let ids: Vec<ResourceId> = self.instances.keys().copied().collect();
        for id in &ids {
            let uses_json = self.instances.get(id).is_some_and(|resource| resource.kind.uses_json());
            if uses_json && let Err(err) = self.load_json(*id) {
                warn!("Could not reload the document of resource {id}: {err}");
            }
        }
        for id in &ids {
            if self.instances.get(id).is_some_and(|resource| resource.kind == ResourceKind::TileMap) {
                self.restore_tile_set_offsets(*id);
            }
        }

        for id in &ids {
            if !self.is_valid(*id, false, false) {
                warn!("Restored resource {id} is not valid, its source may have moved");
            }
            self.on_resource_added(*id);
        }
        info!("Restored {} resources from {}", ids.len(), path.display());

        for id in &ids {
            if self.instances.contains_key(id) && self.should_auto_reimport(*id) {
                self.auto_reimport(*id);
            }
        }
        Ok(ids.len())
    }

    /// Fill a tile map's first GID table from its document.
    ///
    /// Embedded tile sets match by name, external ones by resolved source path.
    fn restore_tile_set_offsets(&mut self, id: ResourceId) {
        let Some(map) = self.instances.get(&id) else {
            return;
        };
        let Some(references) = map.json.as_ref().and_then(|json| json.get("tilesets")).and_then(Value::as_array) else {
            return;
        };
        let map_source = map.source_path.clone();

        let mut offsets = Vec::new();
        for reference in references {
            let Some(first_gid) = reference.get("firstgid").and_then(Value::as_u64) else {
                continue;
            };
            let source = reference.get("source").and_then(Value::as_str);
            let name = reference.get("name").and_then(Value::as_str);
            let matched = self.dependencies_of(id).into_iter().find(|dependency| {
                let Some(tile_set) = self.instances.get(dependency) else {
                    return false;
                };
                if tile_set.kind != ResourceKind::TileSet {
                    return false;
                }
                match source {
                    Some(source) => {
                        tile_set.source_path == to_slash_string(&resolve_relative_path(Path::new(&map_source), source))
                    }
                    None => tile_set.embedded && tile_set.source_path == map_source && Some(tile_set.name.as_str()) == name,
                }
            });
            match matched {
                Some(tile_set) => offsets.push((first_gid as u32, tile_set)),
                None => debug!("No restored tileset matches a reference in '{map_source}'"),
            }
        }

        if let Some(map) = self.instances.get_mut(&id) {
            map.tile_sets = offsets.into_iter().collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TiledImportConfig;
    use crate::store::FileAssetStore;
    use crate::texture::ImageTextureImporter;

    fn manager(dir: &Path) -> ResourceManager {
        let config = TiledImportConfig {
            project_dir: dir.to_path_buf(),
            ..Default::default()
        };
        let store = FileAssetStore::new(config.content_root());
        ResourceManager::new(config, Box::new(store), Box::new(ImageTextureImporter))
    }

    #[test]
    fn test_saved_resource_format() {
        let saved = SavedResource {
            id: ResourceId(3),
            name: "forest".into(),
            kind: "tileset".into(),
            source: "maps/forest.tsj".into(),
            asset: "maps/TileSets/BP_forest".into(),
            auto_reimport: true,
            manually_imported: false,
            embedded: false,
            dependencies: vec![ResourceId(4)],
        };
        let json = serde_json::to_value(&saved).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 3, "name": "forest", "type": "tileset", "source": "maps/forest.tsj",
                "asset": "maps/TileSets/BP_forest", "auto_reimport": true,
                "manually_imported": false, "dependencies": [4]
            })
        );
        let embedded: SavedResource = serde_json::from_value(serde_json::json!({
            "id": 5, "name": "inline", "type": "tileset", "source": "maps/level.tmj",
            "asset": "", "auto_reimport": false, "manually_imported": false, "embedded": true
        }))
        .unwrap();
        assert!(embedded.embedded);
        assert!(embedded.dependencies.is_empty());
    }

    #[test]
    fn test_load_skips_unknown_types_and_missing_edges() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("sheet.png"), b"").unwrap();
        let state = serde_json::json!({ "resources": [
            { "id": 2, "name": "sheet", "type": "texture", "source": "sheet.png", "asset": "",
              "auto_reimport": false, "manually_imported": true, "dependencies": [9] },
            { "id": 7, "name": "odd", "type": "sound", "source": "a.wav", "asset": "",
              "auto_reimport": false, "manually_imported": true }
        ]});
        std::fs::write(dir.path().join("tiled_import.json"), state.to_string()).unwrap();

        let mut manager = manager(dir.path());
        assert_eq!(manager.load_state().unwrap(), 1);
        let texture = manager.get_resource(ResourceId(2)).unwrap();
        assert_eq!(texture.kind, ResourceKind::Texture);
        assert!(texture.dependencies.is_empty());
        assert!(manager.is_registered(ResourceId(2)));
        assert!(manager.get_resource(ResourceId(7)).is_none());

        // IDs continue after the highest restored one
        assert_eq!(manager.generate_resource_id(), ResourceId(3));
        // Already populated, nothing to do
        assert_eq!(manager.load_state().unwrap(), 0);
    }

    #[test]
    fn test_missing_state_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut manager = manager(dir.path());
        assert_eq!(manager.load_state().unwrap(), 0);
        assert!(manager.resources().next().is_none());
    }
}
