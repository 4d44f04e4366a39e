use bevy::prelude::*;
use bevy_tiledimport_assets::geometry::add_to_geometry_collection;
use bevy_tiledimport_assets::json::ParseReport;
use bevy_tiledimport_assets::properties::parse_hex_color;
use bevy_tiledimport_assets::tile_info::TiledTileInfo;
use bevy_tiledimport_assets::tileset::TileSetFromTiled;
use serde_json::Value;

use super::parse_failed;
use crate::assets::{
    MAX_TERRAINS, NO_TERRAIN_MEMBERSHIP, TerrainType, TextureAsset, TileMapAsset, TileMetadata,
    TileSetAsset,
};
use crate::error::ImportError;
use crate::hooks::PropertyOwner;
use crate::manager::ResourceManager;
use crate::resource::{ResourceId, ResourceKind};

/// Tile property copied to [`TileMetadata::user_data_name`].
pub(crate) const USER_DATA_NAME_PROPERTY: &str = "UserDataName";

/// Terrain corner indices as membership bytes.
fn terrain_membership(indices: [i32; 4]) -> [u8; 4] {
    indices.map(|index| match u8::try_from(index) {
        Ok(index) if usize::from(index) < MAX_TERRAINS => index,
        _ => NO_TERRAIN_MEMBERSHIP,
    })
}

impl ResourceManager {
    /// Import the tile sheet, generate per-tile metadata, then import the
    /// flipbooks of animated tiles and refresh every tile map using this set.
    pub(crate) fn import_tile_set(&mut self, id: ResourceId) -> Result<(), ImportError> {
        let resource = self.resource(id)?;
        let (name, source_path, asset_path) = (
            resource.name.clone(),
            resource.source_path.clone(),
            resource.asset_path.clone(),
        );
        if !self.is_valid(id, false, false) {
            return Err(ImportError::AssetImportFailed {
                kind: ResourceKind::TileSet.as_str(),
                name,
                reason: "the source file or a dependency is missing".to_owned(),
            });
        }

        let document = self.resource_document(id)?;
        let mut report = ParseReport::new();
        let mut parsed = TileSetFromTiled::default();
        let context = format!("{source_path} tileset '{name}'");
        if !parsed.parse_json(&document, &context, &mut report) || !parsed.is_valid() {
            return Err(parse_failed(&source_path, &report));
        }

        let texture = self.import_tile_sheet(id, &name)?;

        let mut tile_set: TileSetAsset = self.store.create_or_reuse(&asset_path);
        tile_set.tile_size = parsed.tile_size();
        tile_set.margin = parsed.margin;
        tile_set.spacing = parsed.spacing;
        tile_set.drawing_offset = parsed.tile_offset;
        tile_set.transparent_color = parsed.transparent_color;
        tile_set.texture_size = texture
            .as_ref()
            .map(|(_, texture)| texture.size)
            .filter(|size| size.x > 0 && size.y > 0)
            .unwrap_or(UVec2::new(parsed.image_width, parsed.image_height));
        tile_set.texture = texture.map(|(asset_path, _)| asset_path);

        if parsed.terrains.len() > MAX_TERRAINS {
            warn!(
                "Tileset '{name}' has {} terrains, only the first {MAX_TERRAINS} are kept",
                parsed.terrains.len()
            );
        }
        tile_set.terrains = parsed
            .terrains
            .iter()
            .take(MAX_TERRAINS)
            .map(|terrain| TerrainType {
                name: terrain.name.clone(),
                solid_tile: u32::try_from(terrain.solid_tile).ok(),
            })
            .collect();

        tile_set.properties.load(&parsed.properties);
        self.hooks.on_custom_properties_loaded(
            PropertyOwner::TileSet {
                asset_path: &asset_path,
            },
            &tile_set.properties,
        );

        self.fill_tile_metadata(&parsed, &asset_path, &mut tile_set);

        // Sprites read their rectangles from the saved asset.
        self.store.save_as(&asset_path, tile_set.clone())?;
        self.import_tile_flipbooks(id, &name, &mut tile_set);

        self.hooks.on_tile_set_imported(&asset_path, &mut tile_set);
        self.store.save_as(&asset_path, tile_set)?;

        self.refresh_tile_map_users(id)
    }

    /// Import the tile sheet texture, returning its asset path and asset.
    fn import_tile_sheet(&mut self, id: ResourceId, name: &str) -> Result<Option<(String, TextureAsset)>, ImportError> {
        let Some(texture) = self.tile_set_texture(id) else {
            return Ok(None);
        };
        let texture_name = self.resource(texture)?.name.clone();
        let target = self.dependency_asset_path(id, "Textures", &format!("T_{texture_name}"))?;
        self.import_dependency(texture, target)
            .map_err(|err| ImportError::AssetImportFailed {
                kind: ResourceKind::TileSet.as_str(),
                name: name.to_owned(),
                reason: format!("its tile sheet could not be imported: {err}"),
            })?;

        let asset_path = self.resource(texture)?.asset_path.clone();
        let asset = self.store.create_or_reuse::<TextureAsset>(&asset_path);
        Ok(Some((asset_path, asset)))
    }

    fn fill_tile_metadata(&self, parsed: &TileSetFromTiled, asset_path: &str, tile_set: &mut TileSetAsset) {
        let tile_count = tile_set.tile_count() as usize;
        tile_set.tiles.resize(tile_count, TileMetadata::default());

        let tile_size = tile_set.tile_size.as_vec2();
        for (tile_index, metadata) in tile_set.tiles.iter_mut().enumerate() {
            let tile_index = tile_index as u32;
            metadata.flipbook = None;
            let Some(info) = parsed.per_tile_data.get(&tile_index) else {
                *metadata = TileMetadata {
                    properties: std::mem::take(&mut metadata.properties),
                    ..default()
                };
                continue;
            };
            self.apply_tile_info(info, tile_size, asset_path, metadata);
        }

        for tile_index in parsed.per_tile_data.keys().filter(|index| **index as usize >= tile_count) {
            warn!("Tile {tile_index} of '{asset_path}' is outside the tile sheet, ignoring its metadata");
        }
    }

    fn apply_tile_info(&self, info: &TiledTileInfo, tile_size: Vec2, asset_path: &str, metadata: &mut TileMetadata) {
        add_to_geometry_collection(tile_size, &info.objects, &mut metadata.collision);
        metadata.terrain_membership = terrain_membership(info.terrain_indices);

        metadata.properties.load(&info.properties);
        self.hooks.on_custom_properties_loaded(
            PropertyOwner::Tile {
                asset_path,
                tile_index: info.tile_index,
            },
            &metadata.properties,
        );
        metadata.user_data_name = metadata
            .properties
            .get_string(USER_DATA_NAME_PROPERTY)
            .map(str::to_owned);
    }

    /// Import every flipbook of the tile set and link it to its tile.
    fn import_tile_flipbooks(&mut self, id: ResourceId, name: &str, tile_set: &mut TileSetAsset) {
        for flipbook in self.dependencies_of_kind(id, ResourceKind::Flipbook) {
            let Some(tile_name) = self.instances.get(&flipbook).map(|resource| resource.name.clone()) else {
                continue;
            };
            let imported = self
                .dependency_asset_path(id, "Flipbooks", &format!("FB_{name}_{tile_name}"))
                .and_then(|target| self.import_dependency(flipbook, target));
            if let Err(err) = imported {
                warn!("Failed to import the flipbook of tile {tile_name} in '{name}': {err}");
                continue;
            }

            let flipbook_asset = self.instances.get(&flipbook).map(|resource| resource.asset_path.clone());
            if let Ok(tile_index) = tile_name.parse::<usize>()
                && let Some(metadata) = tile_set.tiles.get_mut(tile_index)
            {
                metadata.flipbook = flipbook_asset;
            }
        }
    }

    /// Rebuild tile instances of every tile map asset using the tile set.
    fn refresh_tile_map_users(&mut self, id: ResourceId) -> Result<(), ImportError> {
        for tile_map in self.users_of_kind(id, ResourceKind::TileMap) {
            let asset_path = self.resource(tile_map)?.asset_path.clone();
            if asset_path.is_empty() {
                continue;
            }
            match self.store.load_as::<TileMapAsset>(&asset_path) {
                Ok(Some(mut asset)) => {
                    asset.refresh_instances();
                    self.store.save_as(&asset_path, asset)?;
                }
                Ok(None) => {}
                Err(err) => warn!("Could not refresh tile map '{asset_path}': {err}"),
            }
        }
        Ok(())
    }

    /// Record the tile sheet's size and classify its alpha channel.
    ///
    /// The chroma key comes from the `transparentcolor` of a tile set using the
    /// texture.
    pub(crate) fn import_texture(&mut self, id: ResourceId) -> Result<(), ImportError> {
        let resource = self.resource(id)?;
        let (source_path, asset_path) = (resource.source_path.clone(), resource.asset_path.clone());

        let chroma_key = self
            .users_of_kind(id, ResourceKind::TileSet)
            .into_iter()
            .filter_map(|tile_set| self.instances.get(&tile_set)?.json.as_ref())
            .find_map(|json| json.get("transparentcolor").and_then(Value::as_str).and_then(parse_hex_color));

        let info = self
            .textures
            .import(&self.config.source_file(&source_path), chroma_key)?;

        let mut texture: TextureAsset = self.store.create_or_reuse(&asset_path);
        texture.source = source_path;
        texture.size = info.size;
        texture.material = info.material;
        texture.chroma_key = chroma_key;
        self.store.save_as(&asset_path, texture)?;
        Ok(())
    }
}
