//! The resource manager.
//!
//! Owns the resource graph and drives import, reimport, deletion, auto-reimport
//! and garbage collection. Every mutating verb persists the graph afterwards.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use bevy::log::{debug, error, info, warn};
use bevy::time::{Timer, TimerMode};
use bevy_tiledimport_assets::json::{document_type, load_json_file};
use bevy_tiledimport_assets::paths::to_slash_string;
use normalize_path::NormalizePath;

use crate::config::TiledImportConfig;
use crate::error::ImportError;
use crate::hooks::{ImportHooks, NoHooks};
use crate::resource::{Resource, ResourceId, ResourceKind};
use crate::store::{AssetStore, FileAssetStore};
use crate::texture::{ImageTextureImporter, TextureImporter};

/// Something that happened to the graph, drained by the plugin each frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceEvent {
    Added(ResourceId),
    Removed {
        id: ResourceId,
        name: String,
        kind: ResourceKind,
    },
    Reimported(ResourceId),
    AutoReimportDisabled { id: ResourceId, reason: String },
}

/// Registry of every tracked resource.
///
/// `instances` holds every node that exists, `registered` the ones the manager
/// tracks for auto-reimport and persistence. A node becomes registered once an
/// import that created it succeeds, or when the lifespan sweep finds it in use.
#[derive(bevy::prelude::Resource)]
pub struct ResourceManager {
    pub(crate) config: TiledImportConfig,
    pub(crate) store: Box<dyn AssetStore>,
    pub(crate) textures: Box<dyn TextureImporter>,
    pub(crate) hooks: Box<dyn ImportHooks>,
    pub(crate) instances: BTreeMap<ResourceId, Resource>,
    pub(crate) registered: BTreeSet<ResourceId>,
    pub(crate) last_generated_id: u32,
    pub(crate) check_lifespan: bool,
    tick_timer: Timer,
    events: Vec<ResourceEvent>,
}

impl ResourceManager {
    pub fn new(
        config: TiledImportConfig,
        store: Box<dyn AssetStore>,
        textures: Box<dyn TextureImporter>,
    ) -> Self {
        let tick_timer = Timer::from_seconds(config.tick_interval, TimerMode::Repeating);
        Self {
            config,
            store,
            textures,
            hooks: Box::new(NoHooks),
            instances: BTreeMap::new(),
            registered: BTreeSet::new(),
            last_generated_id: 0,
            check_lifespan: false,
            tick_timer,
            events: Vec::new(),
        }
    }

    /// A manager writing JSON assets under the configured content directory and
    /// decoding images with the `image` crate.
    pub fn with_filesystem(config: TiledImportConfig) -> Self {
        let store = FileAssetStore::new(config.content_root());
        Self::new(config, Box::new(store), Box::new(ImageTextureImporter))
    }

    pub fn with_hooks(mut self, hooks: impl ImportHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn config(&self) -> &TiledImportConfig {
        &self.config
    }

    pub fn store(&self) -> &(dyn AssetStore + 'static) {
        self.store.as_ref()
    }

    // ===== QUERIES =====

    pub fn get_resource(&self, id: ResourceId) -> Option<&Resource> {
        self.instances.get(&id)
    }

    pub(crate) fn resource(&self, id: ResourceId) -> Result<&Resource, ImportError> {
        self.instances.get(&id).ok_or(ImportError::UnknownResource(id))
    }

    pub(crate) fn resource_mut(&mut self, id: ResourceId) -> Result<&mut Resource, ImportError> {
        self.instances.get_mut(&id).ok_or(ImportError::UnknownResource(id))
    }

    /// Find a resource by source file, optionally narrowed by kind and name.
    ///
    /// Every existing node is searched, registered or not.
    pub fn find_resource(
        &self,
        source_path: &str,
        kind: Option<ResourceKind>,
        name: Option<&str>,
    ) -> Option<ResourceId> {
        self.instances
            .values()
            .find(|resource| {
                resource.source_path == source_path
                    && kind.is_none_or(|kind| resource.kind == kind)
                    && name.is_none_or(|name| resource.name == name)
            })
            .map(|resource| resource.id)
    }

    /// Registered resources, by id.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.registered.iter().filter_map(|id| self.instances.get(id))
    }

    pub fn is_registered(&self, id: ResourceId) -> bool {
        self.registered.contains(&id)
    }

    /// Live dependencies of a resource.
    pub fn dependencies_of(&self, id: ResourceId) -> Vec<ResourceId> {
        self.instances.get(&id).map_or_else(Vec::new, |resource| {
            resource
                .dependencies
                .iter()
                .copied()
                .filter(|dependency| self.instances.contains_key(dependency))
                .collect()
        })
    }

    /// Live users of a resource.
    pub fn users_of(&self, id: ResourceId) -> Vec<ResourceId> {
        self.instances.get(&id).map_or_else(Vec::new, |resource| {
            resource
                .used_by
                .iter()
                .copied()
                .filter(|user| self.instances.contains_key(user))
                .collect()
        })
    }

    pub fn drain_events(&mut self) -> Vec<ResourceEvent> {
        std::mem::take(&mut self.events)
    }

    // ===== GRAPH =====

    pub(crate) fn generate_resource_id(&mut self) -> ResourceId {
        let mut candidate = self.last_generated_id + 1;
        while self.instances.contains_key(&ResourceId(candidate)) {
            candidate += 1;
        }
        self.last_generated_id = candidate;
        ResourceId(candidate)
    }

    pub(crate) fn create_resource(&mut self, kind: ResourceKind, name: &str, source_path: &str) -> ResourceId {
        let id = self.generate_resource_id();
        debug!("Created {kind} resource {id} '{name}' from '{source_path}'");
        self.instances.insert(id, Resource::new(id, kind, name, source_path));
        id
    }

    /// Add the edge `user -> dependency`. Idempotent.
    pub fn add_dependency(&mut self, user: ResourceId, dependency: ResourceId) {
        if !self.instances.contains_key(&dependency) {
            return;
        }
        if let Some(resource) = self.instances.get_mut(&user) {
            resource.dependencies.insert(dependency);
        } else {
            return;
        }
        if let Some(resource) = self.instances.get_mut(&dependency) {
            resource.used_by.insert(user);
        }
    }

    /// Remove the edge `user -> dependency`. Idempotent.
    pub fn remove_dependency(&mut self, user: ResourceId, dependency: ResourceId) {
        if let Some(resource) = self.instances.get_mut(&user) {
            resource.dependencies.remove(&dependency);
            resource.tile_sets.retain(|_, tile_set| *tile_set != dependency);
        }
        if let Some(resource) = self.instances.get_mut(&dependency) {
            resource.used_by.remove(&user);
        }
    }

    /// Remove every outgoing edge, returning the former dependencies.
    pub(crate) fn remove_all_dependencies(&mut self, user: ResourceId) -> BTreeSet<ResourceId> {
        let dependencies = self
            .instances
            .get(&user)
            .map(|resource| resource.dependencies.clone())
            .unwrap_or_default();
        for dependency in &dependencies {
            self.remove_dependency(user, *dependency);
        }
        dependencies
    }

    pub fn has_dependency(&self, user: ResourceId, dependency: ResourceId) -> bool {
        self.instances
            .get(&user)
            .is_some_and(|resource| resource.dependencies.contains(&dependency))
    }

    /// Whether anything still needs `id`.
    ///
    /// Without a `probe`, manually imported resources always count as in use.
    /// With one, only a live back reference from `probe` counts.
    pub fn is_in_use(&self, id: ResourceId, probe: Option<ResourceId>) -> bool {
        let Some(resource) = self.instances.get(&id) else {
            return false;
        };
        let live = |user: &ResourceId| self.instances.contains_key(user);
        match probe {
            Some(probe) => resource.used_by.contains(&probe) && live(&probe),
            None => resource.manually_imported || resource.used_by.iter().any(live),
        }
    }

    /// Modification time comparison only. A missing timestamp counts as modified,
    /// an unreadable source does not.
    pub fn is_source_modified(&self, id: ResourceId) -> bool {
        let Some(resource) = self.instances.get(&id) else {
            return false;
        };
        let Some(last_import) = resource.last_import_time else {
            return true;
        };
        self.source_modified_time(&resource.source_path)
            .is_some_and(|modified| modified > last_import)
    }

    fn source_modified_time(&self, source_path: &str) -> Option<SystemTime> {
        let source = self.config.source_file(source_path);
        std::fs::metadata(source).and_then(|metadata| metadata.modified()).ok()
    }

    /// Whether a resource can be (re)imported.
    ///
    /// Requires the source file to exist and, for JSON-backed kinds, a loaded
    /// document. `check_asset` also requires the generated asset to exist.
    /// Dependencies are checked recursively, their assets only when
    /// `check_dependency_assets` is set.
    pub fn is_valid(&self, id: ResourceId, check_asset: bool, check_dependency_assets: bool) -> bool {
        let Some(resource) = self.instances.get(&id) else {
            return false;
        };
        if !self.config.source_file(&resource.source_path).is_file() {
            return false;
        }
        if resource.kind.uses_json() && !resource.has_json() {
            return false;
        }
        if check_asset && (resource.asset_path.is_empty() || !self.store.exists(&resource.asset_path)) {
            return false;
        }
        resource.dependencies.iter().all(|dependency| {
            self.is_valid(*dependency, check_dependency_assets, check_dependency_assets)
        })
    }

    pub fn should_auto_reimport(&self, id: ResourceId) -> bool {
        self.instances.get(&id).is_some_and(|resource| {
            resource.auto_reimport && resource.kind.can_auto_reimport()
        }) && self.is_source_modified(id)
    }

    // ===== IMPORT =====

    /// Import a Tiled map or tileset file.
    ///
    /// `source` must lie under the project directory and `target` under the
    /// content directory, both relative to the project directory unless absolute.
    /// `target` names the generated asset, without extension.
    pub fn import_resource(&mut self, source: &Path, target: &Path) -> Result<ResourceId, ImportError> {
        let source_path = self.project_relative(source)?;
        let asset_path = self.content_relative(target)?;

        if let Some(existing) = self.find_resource(&source_path, None, None) {
            debug!("'{source_path}' is already tracked as {existing}");
            return Err(ImportError::AlreadyImported(source_path));
        }
        let target_file = self.absolute(target);
        if target_file.exists() || self.store.exists(&asset_path) {
            return Err(ImportError::TargetExists(target_file));
        }

        let source_file = self.config.source_file(&source_path);
        let document = load_json_file(&source_file).map_err(|source| ImportError::InvalidJson {
            path: source_path.clone(),
            source,
        })?;

        let loaded = match document_type(&document) {
            Some("map") => self.load_tile_map(&source_path),
            Some("tileset") => self.load_tile_sets(&source_path).and_then(|tile_sets| {
                tile_sets
                    .first()
                    .map(|(_, id)| *id)
                    .ok_or_else(|| ImportError::NoValidTileset(source_path.clone()))
            }),
            _ => Err(ImportError::UnsupportedFile(source_path.clone())),
        };
        self.check_lifespan = true;
        let id = loaded?;

        if let Err(err) = self.import_asset(id, asset_path) {
            self.on_resource_deleted(id);
            return Err(err);
        }

        self.resource_mut(id)?.manually_imported = true;
        self.on_resource_added(id);
        self.persist();
        info!("Imported '{source_path}'");
        Ok(id)
    }

    /// Reimport a resource if its source changed since the last import.
    pub fn reimport_resource(&mut self, id: ResourceId) -> Result<(), ImportError> {
        self.check_lifespan = true;
        let reimported = self.reimport_asset(id)?;
        if reimported {
            self.persist();
            self.events.push(ResourceEvent::Reimported(id));
            info!("Reimported '{}'", self.resource(id)?.source_path);
        }
        Ok(())
    }

    /// Delete a resource, its asset and every dependency nothing else needs.
    pub fn delete_resource(&mut self, id: ResourceId) -> Result<(), ImportError> {
        let resource = self.resource(id)?;
        let (name, asset_path) = (resource.name.clone(), resource.asset_path.clone());
        let users = self.users_of(id);
        if !users.is_empty() {
            warn!("Deleting '{name}' while it is still used by {users:?}");
        }

        self.check_lifespan = true;
        if !asset_path.is_empty() {
            self.store
                .delete(&asset_path)
                .map_err(|source| ImportError::DeleteFailed {
                    name: name.clone(),
                    source,
                })?;
        }
        self.on_resource_deleted(id);
        self.persist();
        info!("Deleted '{name}'");
        Ok(())
    }

    /// Enable or disable auto-reimport on a resource and its direct dependencies.
    pub fn set_resource_auto_import(&mut self, id: ResourceId, enabled: bool) -> Result<(), ImportError> {
        let dependencies = self.resource(id)?.dependencies.clone();
        for target in std::iter::once(id).chain(dependencies) {
            if let Some(resource) = self.instances.get_mut(&target) {
                resource.auto_reimport = enabled;
            }
        }
        self.persist();
        Ok(())
    }

    /// Advance the sweep timer. Once per tick interval, collect unused resources
    /// and reimport every registered resource whose source changed.
    ///
    /// A failing auto-reimport switches auto-reimport off for that resource so it
    /// is not retried every sweep.
    pub fn on_tick(&mut self, delta: Duration) {
        self.tick_timer.tick(delta);
        if !self.tick_timer.just_finished() {
            return;
        }

        self.check_resource_lifespan();

        let candidates: Vec<_> = self.registered.iter().copied().collect();
        for id in candidates {
            if self.instances.contains_key(&id) && self.should_auto_reimport(id) {
                self.auto_reimport(id);
            }
        }
    }

    /// Reimport, switching auto-reimport off on failure.
    pub(crate) fn auto_reimport(&mut self, id: ResourceId) {
        let Err(err) = self.reimport_resource(id) else {
            return;
        };
        let name = self.instances.get(&id).map(|resource| resource.name.clone()).unwrap_or_default();
        error!("Auto-reimport of '{name}' failed, disabling auto-reimport: {err}");
        if let Err(disable_err) = self.set_resource_auto_import(id, false) {
            warn!("Could not disable auto-reimport for {id}: {disable_err}");
        }
        self.events.push(ResourceEvent::AutoReimportDisabled {
            id,
            reason: err.to_string(),
        });
    }

    /// Delete unused resources and register used but untracked ones.
    ///
    /// Only runs after an operation armed the sweep. A delete that fails re-arms it.
    pub fn check_resource_lifespan(&mut self) {
        if !self.check_lifespan {
            return;
        }
        self.check_lifespan = false;

        let mut changed = false;
        let ids: Vec<_> = self.instances.keys().copied().collect();
        for id in ids {
            if !self.instances.contains_key(&id) {
                continue;
            }
            if !self.is_in_use(id, None) {
                if self.on_resource_deleted(id) {
                    changed = true;
                } else {
                    self.check_lifespan = true;
                }
            } else if !self.registered.contains(&id) {
                self.on_resource_added(id);
                changed = true;
            }
        }

        if changed {
            self.persist();
        }
    }

    /// Register a resource and, recursively, its dependencies.
    pub(crate) fn on_resource_added(&mut self, id: ResourceId) {
        if !self.instances.contains_key(&id) {
            return;
        }
        if self.registered.insert(id) {
            self.events.push(ResourceEvent::Added(id));
        }
        for dependency in self.dependencies_of(id) {
            self.on_resource_added(dependency);
        }
    }

    /// Remove a resource and its asset, then every dependency left unused.
    ///
    /// Returns `false`, leaving the resource in place, if its asset could not be
    /// deleted.
    pub(crate) fn on_resource_deleted(&mut self, id: ResourceId) -> bool {
        let Some(resource) = self.instances.get(&id) else {
            return true;
        };
        if !resource.asset_path.is_empty()
            && let Err(err) = self.store.delete(&resource.asset_path)
        {
            error!("Failed to delete asset '{}': {err}", resource.asset_path);
            return false;
        }

        let dependencies = self.remove_all_dependencies(id);
        for user in self.users_of(id) {
            self.remove_dependency(user, id);
        }
        for dependency in dependencies {
            if !self.is_in_use(dependency, None) {
                self.on_resource_deleted(dependency);
            }
        }

        self.registered.remove(&id);
        if let Some(resource) = self.instances.remove(&id) {
            debug!("Removed {} resource {id} '{}'", resource.kind, resource.name);
            self.events.push(ResourceEvent::Removed {
                id,
                name: resource.name,
                kind: resource.kind,
            });
        }
        true
    }

    /// Run the kind-specific import into `asset_path`.
    pub(crate) fn import_asset(&mut self, id: ResourceId, asset_path: String) -> Result<(), ImportError> {
        self.resource_mut(id)?.asset_path = asset_path;
        self.import_asset_internal(id)?;
        self.finish_import(id)
    }

    /// Re-derive dependencies and import again, if the source changed.
    ///
    /// Returns whether anything was imported.
    pub(crate) fn reimport_asset(&mut self, id: ResourceId) -> Result<bool, ImportError> {
        let resource = self.resource(id)?;
        if !self.is_valid(id, true, false) {
            return Err(ImportError::ReimportFailed {
                name: resource.name.clone(),
                reason: "the source file, document, asset or a dependency is missing".to_owned(),
            });
        }
        if !self.is_source_modified(id) {
            return Ok(false);
        }

        self.reload_dependencies(id)?;
        self.import_asset_internal(id)?;
        self.finish_import(id)?;
        Ok(true)
    }

    /// Import a dependency into `asset_path`, or reimport it if it already has an
    /// asset.
    pub(crate) fn import_dependency(&mut self, id: ResourceId, asset_path: String) -> Result<(), ImportError> {
        let existing = &self.resource(id)?.asset_path;
        if !existing.is_empty() && self.store.exists(existing) {
            self.reimport_asset(id).map(|_| ())
        } else {
            self.import_asset(id, asset_path)
        }
    }

    fn finish_import(&mut self, id: ResourceId) -> Result<(), ImportError> {
        if !self.is_valid(id, true, false) {
            let resource = self.resource(id)?;
            return Err(ImportError::AssetImportFailed {
                kind: resource.kind.as_str(),
                name: resource.name.clone(),
                reason: "the generated asset is not valid".to_owned(),
            });
        }
        // The source's own timestamp, so edits saved during the import still
        // count as changes.
        let imported_at = self
            .source_modified_time(&self.resource(id)?.source_path)
            .unwrap_or_else(SystemTime::now);
        self.resource_mut(id)?.last_import_time = Some(imported_at);
        Ok(())
    }

    // ===== PATHS =====

    /// The project directory made absolute against the working directory.
    fn project_root(&self) -> PathBuf {
        let project_dir = &self.config.project_dir;
        std::path::absolute(project_dir)
            .unwrap_or_else(|_| project_dir.clone())
            .normalize()
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.normalize()
        } else {
            self.project_root().join(path).normalize()
        }
    }

    fn project_relative(&self, path: &Path) -> Result<String, ImportError> {
        let root = self.project_root();
        let path = self.absolute(path);
        path.strip_prefix(&root)
            .map(to_slash_string)
            .map_err(|_| ImportError::OutsideProject { path: path.clone(), root })
    }

    fn content_relative(&self, path: &Path) -> Result<String, ImportError> {
        let root = self.project_root().join(&self.config.content_dir).normalize();
        let path = self.absolute(path);
        let relative = path
            .strip_prefix(&root)
            .ok()
            .filter(|relative| !relative.as_os_str().is_empty())
            .map(|relative| to_slash_string(&relative.with_extension("")));
        relative.ok_or(ImportError::OutsideContent { path, root })
    }

    pub(crate) fn persist(&self) {
        if let Err(err) = self.save_state() {
            error!("Failed to save import state: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::UNIX_EPOCH;

    use bevy::color::ColorToPacked;
    use bevy::prelude::UVec2;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::assets::{
        FlipbookAsset, MaterialType, SpriteAsset, TextureAsset, TileMapAsset, TileSetAsset,
    };
    use crate::texture::{TextureImportError, TextureInfo, apply_chroma_key};

    /// Counts how often a tile sheet is decoded.
    #[derive(Clone, Default)]
    struct CountingImporter(Arc<AtomicUsize>);

    impl TextureImporter for CountingImporter {
        fn import(
            &self,
            source: &Path,
            chroma_key: Option<bevy::prelude::Srgba>,
        ) -> Result<TextureInfo, TextureImportError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            ImageTextureImporter.import(source, chroma_key)
        }
    }

    fn write_fixture(dir: &Path) {
        std::fs::create_dir_all(dir.join("maps")).unwrap();
        std::fs::create_dir_all(dir.join("art")).unwrap();

        image::RgbaImage::from_pixel(32, 32, image::Rgba([0, 128, 0, 255]))
            .save(dir.join("art/terrain.png"))
            .unwrap();
        let mut props = image::RgbaImage::from_pixel(32, 16, image::Rgba([200, 100, 0, 255]));
        props.put_pixel(0, 0, image::Rgba([0, 0, 0, 0]));
        props.save(dir.join("art/props.png")).unwrap();

        let level = json!({
            "type": "map", "version": 1, "orientation": "orthogonal", "renderorder": "right-down",
            "width": 2, "height": 2, "tilewidth": 16, "tileheight": 16,
            "properties": [
                { "name": "PixelsPerUnit", "type": "float", "value": 16 },
                { "name": "TileProperties[1,0,1]", "type": "class", "value": { "lit": true } }
            ],
            "layers": [
                { "type": "tilelayer", "name": "ground", "width": 2, "height": 2, "x": 0, "y": 0,
                  "data": [1, 2, 0, 2147483654u32] },
                { "type": "objectgroup", "name": "spawns", "width": 0, "height": 0, "x": 0, "y": 0,
                  "objects": [] }
            ],
            "tilesets": [
                { "firstgid": 1, "name": "terrain", "image": "../art/terrain.png",
                  "imagewidth": 32, "imageheight": 32, "tilewidth": 16, "tileheight": 16,
                  "margin": 0, "spacing": 0 },
                { "firstgid": 5, "source": "props.tsj" }
            ]
        });
        std::fs::write(dir.join("maps/level.tmj"), level.to_string()).unwrap();

        let props = json!({
            "type": "tileset", "name": "props", "image": "../art/props.png",
            "imagewidth": 32, "imageheight": 16, "tilewidth": 16, "tileheight": 16,
            "margin": 0, "spacing": 0,
            "tiles": [{
                "id": 0,
                "animation": [{ "tileid": 0, "duration": 200 }, { "tileid": 1, "duration": 200 }],
                "properties": [{ "name": "UserDataName", "type": "string", "value": "torch" }]
            }]
        });
        std::fs::write(dir.join("maps/props.tsj"), props.to_string()).unwrap();
    }

    fn manager_in(dir: &Path, textures: impl TextureImporter + 'static) -> ResourceManager {
        let config = TiledImportConfig {
            project_dir: dir.to_path_buf(),
            ..Default::default()
        };
        let store = FileAssetStore::new(config.content_root());
        ResourceManager::new(config, Box::new(store), Box::new(textures))
    }

    fn import_level(manager: &mut ResourceManager) -> ResourceId {
        manager
            .import_resource(Path::new("maps/level.tmj"), Path::new("assets/maps/level"))
            .unwrap()
    }

    fn count_kind(manager: &ResourceManager, kind: ResourceKind) -> usize {
        manager.resources().filter(|resource| resource.kind == kind).count()
    }

    fn set_last_import(manager: &mut ResourceManager, id: ResourceId, time: SystemTime) {
        manager.instances.get_mut(&id).unwrap().last_import_time = Some(time);
    }

    #[test]
    fn test_import_map_builds_graph() {
        let dir = TempDir::new().unwrap();
        write_fixture(dir.path());
        let mut manager = manager_in(dir.path(), ImageTextureImporter);

        let map = import_level(&mut manager);

        assert_eq!(count_kind(&manager, ResourceKind::TileMap), 1);
        assert_eq!(count_kind(&manager, ResourceKind::TileSet), 2);
        assert_eq!(count_kind(&manager, ResourceKind::Texture), 2);
        assert_eq!(count_kind(&manager, ResourceKind::Flipbook), 1);
        assert_eq!(count_kind(&manager, ResourceKind::Sprite), 2);

        let resource = manager.get_resource(map).unwrap();
        assert!(resource.manually_imported);
        assert_eq!(resource.asset_path, "maps/level");
        assert_eq!(resource.tile_sets.keys().copied().collect::<Vec<_>>(), vec![1, 5]);

        let terrain = manager
            .find_resource("maps/level.tmj", Some(ResourceKind::TileSet), Some("terrain"))
            .unwrap();
        assert!(manager.get_resource(terrain).unwrap().embedded);
        assert!(manager.has_dependency(map, terrain));
        assert_eq!(manager.users_of(terrain), vec![map]);
        assert!(manager.find_resource("art/props.png", Some(ResourceKind::Texture), None).is_some());

        let store = manager.store();
        let tile_map = store.load_as::<TileMapAsset>("maps/level").unwrap().unwrap();
        assert_eq!(tile_map.layers.len(), 2);
        assert_eq!(tile_map.layers[0].name, "spawns");
        let ground = tile_map.layers[1].tiles().unwrap();
        assert_eq!(ground.get(0, 0).map(|cell| (cell.tile_set, cell.tile_id)), Some((0, 0)));
        assert_eq!(ground.get(1, 0).map(|cell| (cell.tile_set, cell.tile_id)), Some((0, 1)));
        assert!(ground.get(0, 1).is_none());
        let flipped = ground.get(1, 1).unwrap();
        assert_eq!((flipped.tile_set, flipped.tile_id), (1, 1));
        assert!(flipped.flags.horizontal);
        assert_eq!(ground.instance(1, 0).unwrap().properties.get_bool("lit"), Some(true));
        assert!(ground.instance(0, 1).is_none());
        assert_eq!(tile_map.pixels_per_unit, 16.0);
        assert_eq!(tile_map.material, MaterialType::Masked);
        assert_eq!(tile_map.selected_tile_set.as_deref(), Some("maps/TileSets/BP_terrain"));

        let props = store.load_as::<TileSetAsset>("maps/TileSets/BP_props").unwrap().unwrap();
        assert_eq!(props.texture.as_deref(), Some("maps/TileSets/Textures/T_props"));
        assert_eq!(props.tiles.len(), 2);
        assert_eq!(props.tiles[0].user_data_name.as_deref(), Some("torch"));
        assert_eq!(
            props.tiles[0].flipbook.as_deref(),
            Some("maps/TileSets/Flipbooks/FB_props_0")
        );

        let flipbook = store
            .load_as::<FlipbookAsset>("maps/TileSets/Flipbooks/FB_props_0")
            .unwrap()
            .unwrap();
        assert_eq!(flipbook.key_frames.len(), 2);
        assert_eq!(flipbook.frame_count(), 6);
        assert_eq!(flipbook.key_frames[1].sprite, "maps/TileSets/Flipbooks/Sprites/S_props_1");

        let sprite = store
            .load_as::<SpriteAsset>("maps/TileSets/Flipbooks/Sprites/S_props_1")
            .unwrap()
            .unwrap();
        assert_eq!(sprite.source_min, UVec2::new(16, 0));
        assert_eq!(sprite.source_size, UVec2::splat(16));
        assert_eq!(sprite.texture.as_deref(), Some("maps/TileSets/Textures/T_props"));

        assert!(dir.path().join("tiled_import.json").is_file());
        assert!(manager.drain_events().contains(&ResourceEvent::Added(map)));
    }

    #[test]
    fn test_import_rejections() {
        let dir = TempDir::new().unwrap();
        write_fixture(dir.path());
        let mut manager = manager_in(dir.path(), ImageTextureImporter);
        import_level(&mut manager);

        assert!(matches!(
            manager.import_resource(Path::new("maps/level.tmj"), Path::new("assets/maps/other")),
            Err(ImportError::AlreadyImported(_))
        ));
        assert!(matches!(
            manager.import_resource(Path::new("maps/props.tsj"), Path::new("assets/props")),
            Err(ImportError::AlreadyImported(_))
        ));

        std::fs::copy(dir.path().join("maps/props.tsj"), dir.path().join("maps/extra.tsj")).unwrap();
        assert!(matches!(
            manager.import_resource(Path::new("maps/extra.tsj"), Path::new("assets/maps/level")),
            Err(ImportError::TargetExists(_))
        ));
        assert!(matches!(
            manager.import_resource(Path::new("../elsewhere.tmj"), Path::new("assets/x")),
            Err(ImportError::OutsideProject { .. })
        ));
        assert!(matches!(
            manager.import_resource(Path::new("maps/extra.tsj"), Path::new("maps/extra")),
            Err(ImportError::OutsideContent { .. })
        ));
    }

    #[test]
    fn test_import_standalone_tileset() {
        let dir = TempDir::new().unwrap();
        write_fixture(dir.path());
        let mut manager = manager_in(dir.path(), ImageTextureImporter);

        let tile_set = manager
            .import_resource(Path::new("maps/props.tsj"), Path::new("assets/tilesets/props"))
            .unwrap();

        assert_eq!(manager.get_resource(tile_set).unwrap().kind, ResourceKind::TileSet);
        assert!(manager.store().exists("tilesets/props"));
        assert!(manager.store().exists("tilesets/Textures/T_props"));
        assert_eq!(count_kind(&manager, ResourceKind::TileMap), 0);
    }

    #[test]
    fn test_failed_import_tears_down() {
        let dir = TempDir::new().unwrap();
        write_fixture(dir.path());
        std::fs::remove_file(dir.path().join("art/props.png")).unwrap();
        let mut manager = manager_in(dir.path(), ImageTextureImporter);

        let result = manager.import_resource(Path::new("maps/props.tsj"), Path::new("assets/tilesets/props"));

        assert!(result.is_err());
        assert!(manager.resources().next().is_none());
        assert!(manager.find_resource("maps/props.tsj", None, None).is_none());
        assert!(!manager.store().exists("tilesets/props"));
    }

    #[test]
    fn test_reimport_skips_unmodified_sources() {
        let dir = TempDir::new().unwrap();
        write_fixture(dir.path());
        let importer = CountingImporter::default();
        let decoded = importer.0.clone();
        let mut manager = manager_in(dir.path(), importer);

        import_level(&mut manager);
        assert_eq!(decoded.load(Ordering::SeqCst), 2);
        manager.drain_events();

        let texture = manager
            .find_resource("art/terrain.png", Some(ResourceKind::Texture), None)
            .unwrap();
        manager.reimport_resource(texture).unwrap();
        assert_eq!(decoded.load(Ordering::SeqCst), 2);
        assert!(manager.drain_events().is_empty());

        set_last_import(&mut manager, texture, UNIX_EPOCH);
        manager.reimport_resource(texture).unwrap();
        assert_eq!(decoded.load(Ordering::SeqCst), 3);
        assert_eq!(manager.drain_events(), vec![ResourceEvent::Reimported(texture)]);
        assert!(manager.get_resource(texture).unwrap().last_import_time > Some(UNIX_EPOCH));
    }

    #[test]
    fn test_reimport_keeps_ids() {
        let dir = TempDir::new().unwrap();
        write_fixture(dir.path());
        let mut manager = manager_in(dir.path(), ImageTextureImporter);
        let map = import_level(&mut manager);
        let before: Vec<ResourceId> = manager.resources().map(|resource| resource.id).collect();

        let ids: Vec<ResourceId> = before.clone();
        for id in ids {
            set_last_import(&mut manager, id, UNIX_EPOCH);
        }
        manager.reimport_resource(map).unwrap();
        manager.check_resource_lifespan();

        let after: Vec<ResourceId> = manager.resources().map(|resource| resource.id).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_delete_collects_orphans() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager_in(dir.path(), ImageTextureImporter);

        let tile_set = manager.create_resource(ResourceKind::TileSet, "forest", "forest.tsj");
        let texture = manager.create_resource(ResourceKind::Texture, "forest", "forest.png");
        manager.add_dependency(tile_set, texture);
        manager.on_resource_added(tile_set);
        assert!(manager.is_registered(texture));
        assert!(manager.is_in_use(texture, Some(tile_set)));

        manager.delete_resource(tile_set).unwrap();
        manager.check_resource_lifespan();
        assert!(manager.get_resource(tile_set).is_none());
        assert!(manager.get_resource(texture).is_none());

        // A manually imported texture survives its last user
        let tile_set = manager.create_resource(ResourceKind::TileSet, "forest", "forest.tsj");
        let texture = manager.create_resource(ResourceKind::Texture, "forest", "forest.png");
        manager.instances.get_mut(&texture).unwrap().manually_imported = true;
        manager.add_dependency(tile_set, texture);
        manager.on_resource_added(tile_set);

        manager.delete_resource(tile_set).unwrap();
        manager.check_resource_lifespan();
        assert!(manager.get_resource(tile_set).is_none());
        assert!(manager.is_registered(texture));
        assert!(manager.users_of(texture).is_empty());
    }

    #[test]
    fn test_lifespan_sweep() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager_in(dir.path(), ImageTextureImporter);

        let orphan = manager.create_resource(ResourceKind::Sprite, "3", "a.tsj");
        let flipbook = manager.create_resource(ResourceKind::Flipbook, "3", "a.tsj");
        let sprite = manager.create_resource(ResourceKind::Sprite, "4", "a.tsj");
        manager.add_dependency(flipbook, sprite);
        manager.instances.get_mut(&flipbook).unwrap().manually_imported = true;

        // Not armed yet
        manager.check_resource_lifespan();
        assert!(manager.get_resource(orphan).is_some());

        manager.check_lifespan = true;
        manager.check_resource_lifespan();
        assert!(manager.get_resource(orphan).is_none());
        assert!(manager.is_registered(flipbook));
        assert!(manager.is_registered(sprite));

        // IDs are never reused
        assert_eq!(manager.generate_resource_id(), ResourceId(4));
    }

    #[test]
    fn test_auto_import_flag_reaches_direct_dependencies_only() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager_in(dir.path(), ImageTextureImporter);
        let map = manager.create_resource(ResourceKind::TileMap, "level", "level.tmj");
        let tile_set = manager.create_resource(ResourceKind::TileSet, "forest", "forest.tsj");
        let texture = manager.create_resource(ResourceKind::Texture, "forest", "forest.png");
        manager.add_dependency(map, tile_set);
        manager.add_dependency(tile_set, texture);

        manager.set_resource_auto_import(map, false).unwrap();

        assert!(!manager.get_resource(map).unwrap().auto_reimport);
        assert!(!manager.get_resource(tile_set).unwrap().auto_reimport);
        assert!(manager.get_resource(texture).unwrap().auto_reimport);
    }

    #[test]
    fn test_failed_auto_reimport_disables_it() {
        let dir = TempDir::new().unwrap();
        write_fixture(dir.path());
        let mut manager = manager_in(dir.path(), ImageTextureImporter);
        let map = import_level(&mut manager);
        manager.drain_events();

        std::fs::write(dir.path().join("maps/level.tmj"), "{ not json").unwrap();
        set_last_import(&mut manager, map, UNIX_EPOCH);

        // Throttled until a full tick interval has passed
        manager.on_tick(Duration::from_secs(1));
        assert!(manager.get_resource(map).unwrap().auto_reimport);

        manager.on_tick(Duration::from_secs(4));
        let resource = manager.get_resource(map).unwrap();
        assert!(!resource.auto_reimport);
        for dependency in manager.dependencies_of(map) {
            assert!(!manager.get_resource(dependency).unwrap().auto_reimport);
        }
        assert!(
            manager
                .drain_events()
                .iter()
                .any(|event| matches!(event, ResourceEvent::AutoReimportDisabled { id, .. } if *id == map))
        );
    }

    #[test]
    fn test_state_round_trip() {
        let dir = TempDir::new().unwrap();
        write_fixture(dir.path());
        let mut manager = manager_in(dir.path(), ImageTextureImporter);
        let map = import_level(&mut manager);
        let saved = manager.saved_state();
        let tile_sets = manager.get_resource(map).unwrap().tile_sets.clone();
        drop(manager);

        let mut restored = manager_in(dir.path(), ImageTextureImporter);
        assert_eq!(restored.load_state().unwrap(), saved.resources.len());

        for expected in &saved.resources {
            let resource = restored.get_resource(expected.id).unwrap();
            assert_eq!(resource.name, expected.name);
            assert_eq!(resource.kind.as_str(), expected.kind);
            assert_eq!(resource.asset_path, expected.asset);
            assert_eq!(
                resource.dependencies,
                expected.dependencies.iter().copied().collect::<BTreeSet<_>>()
            );
            assert!(restored.is_registered(expected.id));
        }
        assert_eq!(restored.resources().count(), saved.resources.len());
        assert_eq!(restored.get_resource(map).unwrap().tile_sets, tile_sets);
        assert!(restored.get_resource(map).unwrap().has_json());
    }

    #[test]
    fn test_default_config_resolves_relative_paths() {
        let manager = ResourceManager::with_filesystem(TiledImportConfig::default());

        assert_eq!(
            manager.project_relative(Path::new("maps/level.tmj")).unwrap(),
            "maps/level.tmj"
        );
        assert_eq!(
            manager.project_relative(Path::new("./maps/../maps/level.tmj")).unwrap(),
            "maps/level.tmj"
        );
        assert_eq!(
            manager.content_relative(Path::new("assets/maps/level")).unwrap(),
            "maps/level"
        );
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(
            manager.project_relative(&cwd.join("maps/level.tmj")).unwrap(),
            "maps/level.tmj"
        );
        assert!(matches!(
            manager.project_relative(Path::new("../level.tmj")),
            Err(ImportError::OutsideProject { .. })
        ));
        assert!(matches!(
            manager.content_relative(Path::new("maps/level")),
            Err(ImportError::OutsideContent { .. })
        ));
    }

    #[test]
    fn test_import_records_source_timestamp() {
        let dir = TempDir::new().unwrap();
        write_fixture(dir.path());
        let source = dir.path().join("maps/props.tsj");
        let future = SystemTime::now() + Duration::from_secs(3600);
        std::fs::File::options()
            .write(true)
            .open(&source)
            .unwrap()
            .set_modified(future)
            .unwrap();
        let mut manager = manager_in(dir.path(), ImageTextureImporter);

        let tile_set = manager
            .import_resource(Path::new("maps/props.tsj"), Path::new("assets/tilesets/props"))
            .unwrap();
        manager.drain_events();

        assert_eq!(manager.get_resource(tile_set).unwrap().last_import_time, Some(future));
        assert!(!manager.is_source_modified(tile_set));
        manager.reimport_resource(tile_set).unwrap();
        assert!(manager.drain_events().is_empty());

        std::fs::File::options()
            .write(true)
            .open(&source)
            .unwrap()
            .set_modified(future + Duration::from_secs(1))
            .unwrap();
        assert!(manager.is_source_modified(tile_set));
    }

    #[test]
    fn test_missing_source_keeps_auto_reimport() {
        let dir = TempDir::new().unwrap();
        write_fixture(dir.path());
        let mut manager = manager_in(dir.path(), ImageTextureImporter);
        let map = import_level(&mut manager);
        manager.drain_events();

        std::fs::rename(dir.path().join("maps/level.tmj"), dir.path().join("maps/level.bak")).unwrap();

        assert!(!manager.is_source_modified(map));
        assert!(!manager.should_auto_reimport(map));
        manager.on_tick(Duration::from_secs(5));
        assert!(manager.get_resource(map).unwrap().auto_reimport);
        assert!(
            !manager
                .drain_events()
                .iter()
                .any(|event| matches!(event, ResourceEvent::AutoReimportDisabled { .. }))
        );
    }

    #[test]
    fn test_transparent_color_keys_tile_sheet() {
        let dir = TempDir::new().unwrap();
        write_fixture(dir.path());
        let mut sheet = image::RgbaImage::from_pixel(32, 16, image::Rgba([40, 80, 120, 255]));
        sheet.put_pixel(3, 4, image::Rgba([255, 0, 255, 255]));
        sheet.save(dir.path().join("art/keyed.png")).unwrap();
        let keyed = json!({
            "type": "tileset", "name": "keyed", "image": "../art/keyed.png",
            "imagewidth": 32, "imageheight": 16, "tilewidth": 16, "tileheight": 16,
            "margin": 0, "spacing": 0, "transparentcolor": "#ff00ff"
        });
        std::fs::write(dir.path().join("maps/keyed.tsj"), keyed.to_string()).unwrap();
        let mut manager = manager_in(dir.path(), ImageTextureImporter);

        manager
            .import_resource(Path::new("maps/keyed.tsj"), Path::new("assets/tilesets/keyed"))
            .unwrap();

        let tile_set = manager
            .store()
            .load_as::<TileSetAsset>("tilesets/keyed")
            .unwrap()
            .unwrap();
        assert_eq!(
            tile_set.transparent_color.map(|color| color.to_u8_array()),
            Some([255, 0, 255, 255])
        );
        let texture = manager
            .store()
            .load_as::<TextureAsset>("tilesets/Textures/T_keyed")
            .unwrap()
            .unwrap();
        assert_eq!(texture.material, MaterialType::Masked);
        let key = texture.chroma_key.unwrap();
        assert_eq!(key.to_u8_array_no_alpha(), [255, 0, 255]);

        apply_chroma_key(&mut sheet, key);
        assert_eq!(sheet.get_pixel(3, 4).0[3], 0);
        assert_eq!(sheet.get_pixel(0, 0).0[3], 255);
    }
}
