use bevy::prelude::*;
use bevy_tiledimport_assets::gid::resolve_gid;
use bevy_tiledimport_assets::json::ParseReport;
use bevy_tiledimport_assets::layer::{TileLayerFromTiled, TiledLayerType};
use bevy_tiledimport_assets::map::TileMapFromTiled;
use bevy_tiledimport_assets::tileset::TileSetFromTiled;
use serde_json::{Value, json};

use super::parse_failed;
use crate::assets::{
    LayerContent, MaterialType, TextureAsset, TileCell, TileLayerData, TileMapAsset, TileSetAsset,
    TileSetBinding,
};
use crate::error::ImportError;
use crate::hooks::PropertyOwner;
use crate::manager::ResourceManager;
use crate::resource::ResourceId;

/// Map property overriding [`TileMapAsset::pixels_per_unit`].
pub(crate) const PIXELS_PER_UNIT_PROPERTY: &str = "PixelsPerUnit";
/// Map property overriding [`TileMapAsset::separation_per_layer`].
pub(crate) const SEPARATION_PER_LAYER_PROPERTY: &str = "SeparationPerLayer";

/// Name of the map property holding the properties of the tile instance at
/// `(x, y, layer_index)`.
fn tile_properties_name(x: u32, y: u32, layer_index: u32) -> String {
    format!("TileProperties[{x},{y},{layer_index}]")
}

/// The per-instance property list stored under `name` in the map properties,
/// as `{name, value}` entries.
fn instance_properties(map_properties: &[Value], name: &str) -> Option<Vec<Value>> {
    let property = map_properties
        .iter()
        .filter_map(Value::as_object)
        .find(|property| property.get("name").and_then(Value::as_str) == Some(name))?;
    let members = property.get("value")?.as_object()?;
    Some(
        members
            .iter()
            .map(|(name, value)| json!({ "name": name, "value": value }))
            .collect(),
    )
}

/// Translucent beats masked, masked beats opaque. Masked if nothing could be
/// analyzed.
fn best_material(materials: impl IntoIterator<Item = MaterialType>) -> MaterialType {
    let mut best = None;
    for material in materials {
        best = match (best, material) {
            (_, MaterialType::Translucent) => Some(MaterialType::Translucent),
            (None | Some(MaterialType::Opaque), material) => Some(material),
            (current, _) => current,
        };
    }
    best.unwrap_or(MaterialType::Masked)
}

impl ResourceManager {
    /// Parse the map, import its tile sets and assemble the tile map asset.
    ///
    /// The existing asset is left untouched unless every step succeeds.
    pub(crate) fn import_tile_map(&mut self, id: ResourceId) -> Result<(), ImportError> {
        let document = self.resource_document(id)?;
        let resource = self.resource(id)?;
        let source_path = resource.source_path.clone();
        let asset_path = resource.asset_path.clone();
        let tile_set_ids: Vec<(u32, ResourceId)> = resource
            .tile_sets
            .iter()
            .map(|(first_gid, tile_set)| (*first_gid, *tile_set))
            .collect();

        let mut report = ParseReport::new();
        let mut map = TileMapFromTiled::default();
        let parsed = map.parse_json(&document, &source_path, &mut report);
        if !map.validate(&source_path, &mut report) || !parsed {
            return Err(parse_failed(&source_path, &report));
        }
        if tile_set_ids.is_empty() {
            return Err(ImportError::NoValidTileset(source_path));
        }

        let mut bindings = Vec::with_capacity(tile_set_ids.len());
        for (first_gid, tile_set) in tile_set_ids {
            let name = self.resource(tile_set)?.name.clone();
            let target = self.dependency_asset_path(id, "TileSets", &format!("BP_{name}"))?;
            let imported = match self.import_dependency(tile_set, target) {
                Ok(()) => Some(self.resource(tile_set)?.asset_path.clone()),
                Err(err) => {
                    error!("Failed to import tileset '{name}' of '{source_path}': {err}");
                    None
                }
            };

            let tile_set_document = self.resource_document(tile_set)?;
            let mut parsed_tile_set = TileSetFromTiled::with_first_gid(first_gid);
            let context = format!("{source_path} tileset '{name}'");
            if !parsed_tile_set.parse_json(&tile_set_document, &context, &mut report) {
                return Err(parse_failed(&source_path, &report));
            }
            map.tile_sets.push(parsed_tile_set);
            bindings.push(TileSetBinding {
                first_gid,
                asset: imported,
            });
        }

        let mut tile_map: TileMapAsset = self.store.create_or_reuse(&asset_path);
        self.assemble_tile_map(&map, bindings, &asset_path, &mut tile_map);
        self.load_tile_instance_properties(&map.properties, &asset_path, &mut tile_map);
        self.finalize_tile_map(&mut tile_map);

        self.hooks.on_tile_map_imported(&asset_path, &mut tile_map);
        self.store.save_as(&asset_path, tile_map)?;
        Ok(())
    }

    fn assemble_tile_map(
        &self,
        map: &TileMapFromTiled,
        bindings: Vec<TileSetBinding>,
        asset_path: &str,
        tile_map: &mut TileMapAsset,
    ) {
        tile_map.map_width = map.width;
        tile_map.map_height = map.height;
        tile_map.tile_width = map.tile_width;
        tile_map.tile_height = map.effective_tile_height();
        tile_map.separation_per_tile_x = 0.0;
        tile_map.separation_per_tile_y = 0.0;
        tile_map.projection = map.orientation;
        tile_map.hex_side_length = map.hex_side_length;
        tile_map.stagger_axis = map.stagger_axis;
        tile_map.stagger_index = map.stagger_index;
        tile_map.render_order = map.render_order;
        tile_map.background_color = map.background_color;
        tile_map.tile_sets = bindings;

        tile_map.properties.load(&map.properties);
        self.hooks
            .on_custom_properties_loaded(PropertyOwner::TileMap { asset_path }, &tile_map.properties);

        // Binding indices, present only for tile sets that imported.
        let indices: Vec<usize> = (0..tile_map.tile_sets.len()).collect();
        let previous_layers = std::mem::take(&mut tile_map.layers);
        let mut layers = Vec::with_capacity(map.layers.len());

        for (layer_index, parsed) in map.layers.iter().rev().enumerate() {
            let layer_index = layer_index as u32;
            let mut layer = previous_layers
                .get(layer_index as usize)
                .cloned()
                .unwrap_or_default();
            layer.name = parsed.name.clone();
            layer.visible = parsed.visible;
            layer.color = Srgba::WHITE.with_alpha(parsed.opacity.clamp(0.0, 1.0));
            layer.layer_index = layer_index;
            layer.offset = parsed.offset;

            layer.properties.load(&parsed.properties);
            self.hooks.on_custom_properties_loaded(
                PropertyOwner::TileLayer {
                    asset_path,
                    layer_index,
                },
                &layer.properties,
            );

            let previous_content = std::mem::take(&mut layer.content);
            layer.content = match parsed.layer_type {
                Some(TiledLayerType::ObjectGroup) => LayerContent::Objects {
                    objects: parsed.objects.clone(),
                    draw_order: parsed.draw_order,
                },
                Some(TiledLayerType::ImageLayer) => LayerContent::Image {
                    path: parsed.image_path.clone(),
                },
                Some(TiledLayerType::TileLayer) | None => {
                    let tiles = match previous_content {
                        LayerContent::Tiles(tiles) if tiles.width == parsed.width && tiles.height == parsed.height => {
                            tiles
                        }
                        _ => TileLayerData::empty(parsed.width, parsed.height),
                    };
                    LayerContent::Tiles(Self::fill_cells(parsed, tiles, &tile_map.tile_sets, &indices, layer_index))
                }
            };
            layers.push(layer);
        }
        tile_map.layers = layers;
    }

    /// Resolve every GID of a tile layer and rebuild its instances.
    fn fill_cells(
        parsed: &TileLayerFromTiled,
        mut tiles: TileLayerData,
        bindings: &[TileSetBinding],
        indices: &[usize],
        layer_index: u32,
    ) -> TileLayerData {
        for y in 0..parsed.height {
            for x in 0..parsed.width {
                let gid = parsed.gid_at(x, y);
                let candidates = bindings
                    .iter()
                    .zip(indices)
                    .map(|(binding, index)| (binding.first_gid, binding.asset.is_some().then_some(index)));
                let cell = resolve_gid(gid, candidates).map(|resolved| TileCell {
                    gid,
                    tile_set: *resolved.tile_set,
                    tile_id: resolved.local_index,
                    flags: resolved.flags,
                });
                tiles.set(x, y, cell);
            }
        }
        tiles.refresh_instances(layer_index);
        tiles
    }

    /// Apply `TileProperties[X,Y,Z]` map properties to the matching instances.
    fn load_tile_instance_properties(&self, map_properties: &[Value], asset_path: &str, tile_map: &mut TileMapAsset) {
        if map_properties.is_empty() {
            return;
        }
        for layer in &mut tile_map.layers {
            let Some(tiles) = layer.tiles_mut() else {
                continue;
            };
            for instance in tiles.instances.iter_mut().flatten() {
                let coordinates = instance.coordinates;
                let name = tile_properties_name(coordinates.x, coordinates.y, coordinates.z);
                let Some(properties) = instance_properties(map_properties, &name) else {
                    continue;
                };
                instance.properties.load(&properties);
                self.hooks.on_custom_properties_loaded(
                    PropertyOwner::TileInstance {
                        asset_path,
                        coordinates,
                    },
                    &instance.properties,
                );
            }
        }
    }

    fn finalize_tile_map(&self, tile_map: &mut TileMapAsset) {
        let settings = &self.config.importer;

        tile_map.selected_tile_set = tile_map
            .tile_sets
            .iter()
            .find_map(|binding| binding.asset.clone());
        tile_map.pixels_per_unit = tile_map
            .properties
            .get_number(PIXELS_PER_UNIT_PROPERTY)
            .map_or(settings.default_pixels_per_unit, |value| value as f32);
        tile_map.separation_per_layer = tile_map
            .properties
            .get_number(SEPARATION_PER_LAYER_PROPERTY)
            .map_or(settings.default_separation_per_layer, |value| value as f32);

        tile_map.material = if settings.pick_best_material {
            best_material(
                tile_map
                    .tile_sets
                    .iter()
                    .filter_map(|binding| self.tile_sheet_material(binding.asset.as_deref()?)),
            )
        } else {
            MaterialType::Masked
        };
    }

    /// Material of the tile sheet behind a tile set asset.
    fn tile_sheet_material(&self, tile_set_asset: &str) -> Option<MaterialType> {
        let texture = self
            .store
            .load_as::<TileSetAsset>(tile_set_asset)
            .and_then(|tile_set| match tile_set.and_then(|tile_set| tile_set.texture) {
                Some(texture) => self.store.load_as::<TextureAsset>(&texture),
                None => Ok(None),
            });
        match texture {
            Ok(texture) => texture.map(|texture| texture.material),
            Err(err) => {
                warn!("Could not analyze the tile sheet of '{tile_set_asset}': {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_material() {
        assert_eq!(best_material([]), MaterialType::Masked);
        assert_eq!(best_material([MaterialType::Opaque]), MaterialType::Opaque);
        assert_eq!(
            best_material([MaterialType::Opaque, MaterialType::Masked]),
            MaterialType::Masked
        );
        assert_eq!(
            best_material([MaterialType::Masked, MaterialType::Opaque]),
            MaterialType::Masked
        );
        assert_eq!(
            best_material([MaterialType::Translucent, MaterialType::Opaque]),
            MaterialType::Translucent
        );
    }

    #[test]
    fn test_instance_properties_lookup() {
        let properties = vec![
            json!({ "name": "PixelsPerUnit", "type": "float", "value": 16 }),
            json!({ "name": "TileProperties[1,0,2]", "type": "class", "value": { "lit": true, "label": "door" } }),
        ];
        assert_eq!(tile_properties_name(1, 0, 2), "TileProperties[1,0,2]");

        let entries = instance_properties(&properties, "TileProperties[1,0,2]").unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.contains(&json!({ "name": "lit", "value": true })));
        assert!(instance_properties(&properties, "TileProperties[0,0,0]").is_none());
        assert!(instance_properties(&properties, "PixelsPerUnit").is_none());
    }
}
