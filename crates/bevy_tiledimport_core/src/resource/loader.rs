//! Resource factories.
//!
//! Each loader reads the JSON behind a resource, finds or creates the resource,
//! and rebuilds its dependency edges from scratch. Dependencies that are no
//! longer referenced are left for the lifespan sweep.

use std::collections::BTreeSet;
use std::path::Path;

use bevy::log::{error, warn};
use bevy_tiledimport_assets::json::{JsonObject, document_type, load_json_file};
use bevy_tiledimport_assets::paths::{resolve_relative_path, to_slash_string};
use bevy_tiledimport_assets::tileset::TileSetFromTiled;
use serde_json::Value;

use super::{ResourceId, ResourceKind};
use crate::error::ImportError;
use crate::manager::ResourceManager;

/// A tileset found while loading a file: `(first_gid, tileset_file, json, embedded)`.
type TileSetEntry = (Option<u32>, String, Value, bool);

/// `(tile_id, entry)` for every entry of a tileset's `tiles`, in either layout.
fn tile_entries(tile_set: &Value) -> Vec<(u32, &JsonObject)> {
    match tile_set.get("tiles") {
        Some(Value::Array(tiles)) => tiles
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|tile| Some((tile.get("id")?.as_u64()? as u32, tile)))
            .collect(),
        Some(Value::Object(tiles)) => tiles
            .iter()
            .filter_map(|(key, tile)| Some((key.parse().ok()?, tile.as_object()?)))
            .collect(),
        _ => Vec::new(),
    }
}

fn non_empty_str<'a>(json: &'a Value, field: &str) -> Option<&'a str> {
    json.get(field).and_then(Value::as_str).filter(|value| !value.is_empty())
}

impl ResourceManager {
    pub(crate) fn read_document(&self, source_path: &str) -> Result<Value, ImportError> {
        load_json_file(&self.config.source_file(source_path)).map_err(|source| ImportError::InvalidJson {
            path: source_path.to_owned(),
            source,
        })
    }

    /// Among `previous`, a resource of `kind` named `name`.
    fn reuse(&self, previous: &BTreeSet<ResourceId>, kind: ResourceKind, name: &str) -> Option<ResourceId> {
        previous.iter().copied().find(|id| {
            self.instances
                .get(id)
                .is_some_and(|resource| resource.kind == kind && resource.name == name)
        })
    }

    /// Find or create the texture resource for an image file.
    pub(crate) fn load_texture(&mut self, source_path: &str) -> ResourceId {
        if let Some(id) = self.find_resource(source_path, Some(ResourceKind::Texture), None) {
            return id;
        }
        let name = Path::new(source_path)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| source_path.to_owned());
        self.create_resource(ResourceKind::Texture, &name, source_path)
    }

    /// Load the tileset of a tileset file, or every tileset referenced by a map
    /// file, returning each with the first GID the map assigns it.
    ///
    /// External tilesets are resolved relative to the map. The first one that
    /// cannot be read stops the scan.
    pub(crate) fn load_tile_sets(&mut self, file: &str) -> Result<Vec<(Option<u32>, ResourceId)>, ImportError> {
        let document = self.read_document(file)?;

        let mut entries: Vec<TileSetEntry> = Vec::new();
        match document_type(&document) {
            Some("tileset") => entries.push((None, file.to_owned(), document.clone(), false)),
            Some("map") => {
                let references = document.get("tilesets").and_then(Value::as_array);
                for reference in references.into_iter().flatten() {
                    let first_gid = reference.get("firstgid").and_then(Value::as_u64).map(|gid| gid as u32);
                    match non_empty_str(reference, "source") {
                        Some(source) => {
                            let tileset_file = to_slash_string(&resolve_relative_path(Path::new(file), source));
                            match self.read_document(&tileset_file) {
                                Ok(json) => entries.push((first_gid, tileset_file, json, false)),
                                Err(err) => {
                                    error!("Failed to load tileset '{tileset_file}' referenced by '{file}': {err}");
                                    break;
                                }
                            }
                        }
                        None => entries.push((first_gid, file.to_owned(), reference.clone(), true)),
                    }
                }
            }
            _ => return Err(ImportError::UnsupportedFile(file.to_owned())),
        }

        Ok(entries
            .into_iter()
            .filter_map(|(first_gid, tileset_file, json, embedded)| {
                self.load_tile_set(&tileset_file, json, embedded)
                    .map(|id| (first_gid, id))
            })
            .collect())
    }

    fn load_tile_set(&mut self, tileset_file: &str, json: Value, embedded: bool) -> Option<ResourceId> {
        let Some(name) = non_empty_str(&json, "name").map(str::to_owned) else {
            error!("A tileset in '{tileset_file}' has no name");
            return None;
        };
        if non_empty_str(&json, "image").is_none() {
            error!("Tileset '{name}' in '{tileset_file}' has no image, image collection tilesets are not supported");
            return None;
        }

        let id = self
            .find_resource(tileset_file, Some(ResourceKind::TileSet), Some(&name))
            .unwrap_or_else(|| self.create_resource(ResourceKind::TileSet, &name, tileset_file));
        if let Some(resource) = self.instances.get_mut(&id) {
            resource.embedded = embedded;
            resource.json = Some(json);
        }
        self.populate_tile_set(id);
        Some(id)
    }

    /// Rebuild a tile set's edges: its tile sheet texture and one flipbook per
    /// animated tile.
    pub(crate) fn populate_tile_set(&mut self, id: ResourceId) {
        let previous = self.remove_all_dependencies(id);
        let Some(resource) = self.instances.get(&id) else {
            return;
        };
        let Some(json) = resource.json.clone() else {
            return;
        };
        let source_path = resource.source_path.clone();

        if let Some(image) = non_empty_str(&json, "image") {
            let texture_path = to_slash_string(&resolve_relative_path(Path::new(&source_path), image));
            let texture = self.load_texture(&texture_path);
            self.add_dependency(id, texture);
        }

        for (tile_id, tile) in tile_entries(&json) {
            let animated = tile
                .get("animation")
                .and_then(Value::as_array)
                .is_some_and(|frames| !frames.is_empty());
            if !animated {
                continue;
            }
            let name = tile_id.to_string();
            let flipbook = self
                .reuse(&previous, ResourceKind::Flipbook, &name)
                .unwrap_or_else(|| self.create_resource(ResourceKind::Flipbook, &name, &source_path));
            if let Some(resource) = self.instances.get_mut(&flipbook) {
                resource.json = Some(Value::Object(tile.clone()));
            }
            self.add_dependency(id, flipbook);
            self.populate_flipbook(flipbook);
        }
    }

    /// The tile set using a flipbook.
    pub(crate) fn flipbook_tile_set(&self, id: ResourceId) -> Option<ResourceId> {
        self.users_of(id).into_iter().find(|user| {
            self.instances
                .get(user)
                .is_some_and(|resource| resource.kind == ResourceKind::TileSet)
        })
    }

    /// The tile sheet texture of a tile set.
    pub(crate) fn tile_set_texture(&self, id: ResourceId) -> Option<ResourceId> {
        self.dependencies_of(id).into_iter().find(|dependency| {
            self.instances
                .get(dependency)
                .is_some_and(|resource| resource.kind == ResourceKind::Texture)
        })
    }

    /// A sprite another flipbook of the same tile set already cut for `name`.
    fn sibling_sprite(&self, flipbook: ResourceId, name: &str) -> Option<ResourceId> {
        let tile_set = self.flipbook_tile_set(flipbook)?;
        self.dependencies_of(tile_set)
            .into_iter()
            .filter(|sibling| *sibling != flipbook)
            .flat_map(|sibling| self.dependencies_of(sibling))
            .find(|sprite| {
                self.instances
                    .get(sprite)
                    .is_some_and(|resource| resource.kind == ResourceKind::Sprite && resource.name == name)
            })
    }

    /// Rebuild a flipbook's edges: one sprite per distinct animation frame tile,
    /// each depending on the tile sheet texture.
    pub(crate) fn populate_flipbook(&mut self, id: ResourceId) {
        let previous = self.remove_all_dependencies(id);
        let Some(resource) = self.instances.get(&id) else {
            return;
        };
        let Some(json) = resource.json.clone() else {
            return;
        };
        let source_path = resource.source_path.clone();
        let texture = self
            .flipbook_tile_set(id)
            .and_then(|tile_set| self.tile_set_texture(tile_set));

        let frames = json.get("animation").and_then(Value::as_array);
        for frame in frames.into_iter().flatten() {
            let Some(tile_id) = frame.get("tileid").and_then(Value::as_u64) else {
                warn!("Skipping animation frame without a tile id in '{source_path}'");
                continue;
            };
            let name = tile_id.to_string();
            let duplicate = self.dependencies_of(id).into_iter().any(|sprite| {
                self.instances
                    .get(&sprite)
                    .is_some_and(|resource| resource.kind == ResourceKind::Sprite && resource.name == name)
            });
            if duplicate {
                continue;
            }
            let sprite = self
                .reuse(&previous, ResourceKind::Sprite, &name)
                .or_else(|| self.sibling_sprite(id, &name))
                .unwrap_or_else(|| self.create_resource(ResourceKind::Sprite, &name, &source_path));
            self.remove_all_dependencies(sprite);
            if let Some(texture) = texture {
                self.add_dependency(sprite, texture);
            }
            self.add_dependency(id, sprite);
        }
    }

    /// Find or create the resource for a map file and load its tile sets.
    ///
    /// On failure the map resource is torn down again.
    pub(crate) fn load_tile_map(&mut self, file: &str) -> Result<ResourceId, ImportError> {
        let document = self.read_document(file)?;
        if document_type(&document) != Some("map") {
            return Err(ImportError::UnsupportedFile(file.to_owned()));
        }

        let id = match self.find_resource(file, Some(ResourceKind::TileMap), None) {
            Some(id) => id,
            None => {
                let name = Path::new(file)
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file.to_owned());
                self.create_resource(ResourceKind::TileMap, &name, file)
            }
        };
        self.resource_mut(id)?.json = Some(document);

        if let Err(err) = self.populate_tile_map(id) {
            self.on_resource_deleted(id);
            return Err(err);
        }
        Ok(id)
    }

    /// Rebuild a tile map's edges: one per tileset, keyed by first GID.
    pub(crate) fn populate_tile_map(&mut self, id: ResourceId) -> Result<(), ImportError> {
        self.remove_all_dependencies(id);
        let source_path = self.resource(id)?.source_path.clone();

        for (first_gid, tile_set) in self.load_tile_sets(&source_path)? {
            let Some(first_gid) = first_gid else {
                warn!("Tileset reference in '{source_path}' has no firstgid, skipping it");
                continue;
            };
            self.add_dependency(id, tile_set);
            self.resource_mut(id)?.tile_sets.insert(first_gid, tile_set);
        }

        if self.resource(id)?.tile_sets.is_empty() {
            return Err(ImportError::NoValidTileset(source_path));
        }
        Ok(())
    }

    /// Reload the transient JSON node of a resource.
    ///
    /// Embedded tile sets read their entry from the map file, flipbooks their
    /// tile entry from the owning tile set.
    pub(crate) fn load_json(&mut self, id: ResourceId) -> Result<(), ImportError> {
        let resource = self.resource(id)?;
        let (kind, embedded) = (resource.kind, resource.embedded);
        let (name, source_path) = (resource.name.clone(), resource.source_path.clone());

        let json = match kind {
            ResourceKind::TileMap => Some(self.read_document(&source_path)?),
            ResourceKind::TileSet if embedded => {
                let map = self.read_document(&source_path)?;
                map.as_object()
                    .and_then(|map| TileSetFromTiled::find_embedded(map, &name))
                    .map(|tile_set| Value::Object(tile_set.clone()))
            }
            ResourceKind::TileSet => Some(self.read_document(&source_path)?),
            ResourceKind::Flipbook => {
                let Some(tile_set) = self.flipbook_tile_set(id) else {
                    return Err(ImportError::ReimportFailed {
                        name,
                        reason: "the flipbook is not used by any tileset".to_owned(),
                    });
                };
                if !self.resource(tile_set)?.has_json() {
                    self.load_json(tile_set)?;
                }
                let tile_id = name.parse::<u32>().ok();
                self.resource(tile_set)?
                    .json
                    .as_ref()
                    .and_then(Value::as_object)
                    .zip(tile_id)
                    .and_then(|(tile_set, tile_id)| TileSetFromTiled::find_tile(tile_set, tile_id))
                    .map(|tile| Value::Object(tile.clone()))
            }
            ResourceKind::Texture | ResourceKind::Sprite => None,
        };

        self.resource_mut(id)?.json = json;
        Ok(())
    }

    /// Re-derive the dependency set of a resource from its current source.
    pub(crate) fn reload_dependencies(&mut self, id: ResourceId) -> Result<(), ImportError> {
        match self.resource(id)?.kind {
            ResourceKind::TileMap => {
                self.load_json(id)?;
                self.populate_tile_map(id)
            }
            ResourceKind::TileSet => {
                self.load_json(id)?;
                self.populate_tile_set(id);
                Ok(())
            }
            ResourceKind::Flipbook => {
                self.load_json(id)?;
                self.populate_flipbook(id);
                Ok(())
            }
            ResourceKind::Texture | ResourceKind::Sprite => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tile_entries_both_layouts() {
        let array = json!({ "tiles": [{ "id": 3 }, { "id": 7, "animation": [] }, { "noid": true }] });
        let ids: Vec<_> = tile_entries(&array).into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![3, 7]);

        let object = json!({ "tiles": { "2": {}, "x": {} } });
        let ids: Vec<_> = tile_entries(&object).into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![2]);
    }
}
