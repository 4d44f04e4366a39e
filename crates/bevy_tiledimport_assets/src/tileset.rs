//! Tileset documents, standalone (`.tsj`) or embedded in a map.

use std::collections::BTreeMap;

use bevy::prelude::*;
use serde_json::Value;

use crate::json::{
    JsonObject, ParseError, ParseReport, array, object, optional_str, required_int, required_str,
};
use crate::properties::parse_hex_color;
use crate::tile_info::{TiledTerrain, TiledTileInfo};

/// A parsed tileset.
///
/// Parsing never stops at the first bad field, so a failed parse still leaves
/// every readable field filled in. Check [`TileSetFromTiled::is_valid`] before
/// using anything derived from the tile size.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileSetFromTiled {
    /// Offset of this tileset in the owning map's GID space.
    ///
    /// Set by the caller for tilesets referenced from a map, otherwise read from
    /// the document if present.
    pub first_gid: Option<u32>,
    pub name: String,
    /// Tile sheet path, relative to the tileset document.
    pub image_path: String,
    pub image_width: u32,
    pub image_height: u32,
    pub margin: u32,
    pub spacing: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    /// Pixel offset applied when drawing tiles.
    pub tile_offset: IVec2,
    /// Chroma key removed from the tile sheet.
    pub transparent_color: Option<Srgba>,

    // ===== PER-TILE DATA =====
    /// Terrain list, in declaration order. Terrain corner indices refer to it.
    pub terrains: Vec<TiledTerrain>,
    /// Sparse metadata, keyed by local tile index.
    pub per_tile_data: BTreeMap<u32, TiledTileInfo>,
    /// Raw `properties` array.
    pub properties: Vec<Value>,
}

impl TileSetFromTiled {
    /// Create an empty tileset that will be parsed with a known `firstgid`.
    pub fn with_first_gid(first_gid: u32) -> Self {
        Self {
            first_gid: Some(first_gid),
            ..default()
        }
    }

    /// Parse a tileset document into `self`, returning `true` if no error was
    /// recorded.
    pub fn parse_json(&mut self, json: &JsonObject, context: &str, report: &mut ParseReport) -> bool {
        let mark = report.mark();

        self.image_width = required_int(json, "imagewidth", 1, context, report) as u32;
        self.image_height = required_int(json, "imageheight", 1, context, report) as u32;
        self.margin = required_int(json, "margin", 0, context, report) as u32;
        self.spacing = required_int(json, "spacing", 0, context, report) as u32;
        self.tile_width = required_int(json, "tilewidth", 1, context, report) as u32;
        self.tile_height = required_int(json, "tileheight", 1, context, report) as u32;

        if report.clean_since(mark) {
            if self.first_gid.is_none() && json.contains_key("firstgid") {
                self.first_gid = Some(required_int(json, "firstgid", 1, context, report) as u32);
            }

            match json.get("tileoffset") {
                None => self.tile_offset = IVec2::ZERO,
                Some(Value::Object(offset)) => {
                    self.tile_offset = IVec2::new(
                        required_int(offset, "x", i64::MIN, context, report) as i32,
                        required_int(offset, "y", i64::MIN, context, report) as i32,
                    );
                }
                Some(other) => report.record(ParseError::invalid(
                    context,
                    format!("Invalid 'tileoffset' {other}"),
                )),
            }
        }

        self.name = match optional_str(json, "name") {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => format!(
                "TileSetStartingAt{}",
                self.first_gid.map_or(-1, i64::from)
            ),
        };

        self.image_path = required_str(json, "image", context, report).to_owned();

        if let Some(color) = optional_str(json, "transparentcolor").filter(|color| !color.is_empty()) {
            self.transparent_color = parse_hex_color(color);
            if self.transparent_color.is_none() {
                report.record(ParseError::invalid(
                    context,
                    format!("Invalid 'transparentcolor' '{color}'"),
                ));
            }
        }

        self.terrains = array(json, "terrains")
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_object)
            .map(|terrain| TiledTerrain::from_json(terrain, context, report))
            .collect();

        self.per_tile_data.clear();
        match json.get("tiles") {
            Some(Value::Array(tiles)) => {
                for tile in tiles.iter().filter_map(Value::as_object) {
                    let index = required_int(tile, "id", 0, context, report) as u32;
                    self.insert_tile(tile, index, context, report);
                }
            }
            // Tiled before 1.2 keyed tiles by their index
            Some(Value::Object(tiles)) => {
                for (key, tile) in tiles {
                    match (key.parse::<u32>(), tile.as_object()) {
                        (Ok(index), Some(tile)) => self.insert_tile(tile, index, context, report),
                        _ => report.record(ParseError::invalid(
                            context,
                            format!("Invalid tile entry '{key}'"),
                        )),
                    }
                }
            }
            _ => {}
        }

        self.properties = array(json, "properties").unwrap_or_default().to_vec();

        report.clean_since(mark)
    }

    fn insert_tile(&mut self, tile: &JsonObject, index: u32, context: &str, report: &mut ParseReport) {
        let tile_context = format!("{context} tile {index}");
        let info = TiledTileInfo::from_json(tile, index, &tile_context, report);
        self.per_tile_data.insert(index, info);
    }

    /// Tile size in pixels.
    pub fn tile_size(&self) -> UVec2 {
        UVec2::new(self.tile_width, self.tile_height)
    }

    pub fn is_valid(&self) -> bool {
        self.tile_width > 0 && self.tile_height > 0
    }

    /// Look up the tileset node inside a map document by name.
    pub fn find_embedded<'a>(map: &'a JsonObject, name: &str) -> Option<&'a JsonObject> {
        array(map, "tilesets")?
            .iter()
            .filter_map(Value::as_object)
            .find(|tileset| optional_str(tileset, "name") == Some(name))
    }

    /// The `tiles` entry of a tileset document with the given local id.
    pub fn find_tile(tileset: &JsonObject, tile_id: u32) -> Option<&JsonObject> {
        match tileset.get("tiles")? {
            Value::Array(tiles) => tiles
                .iter()
                .filter_map(Value::as_object)
                .find(|tile| tile.get("id").and_then(Value::as_u64) == Some(u64::from(tile_id))),
            Value::Object(tiles) => object(tiles, &tile_id.to_string()),
            _ => None,
        }
    }
}
