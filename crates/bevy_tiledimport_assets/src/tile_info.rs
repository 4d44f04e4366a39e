//! Per-tile metadata and terrain definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::json::{
    JsonObject, ParseError, ParseReport, array, as_number, object, optional_number,
    required_int, required_str,
};
use crate::object::{TiledObject, parse_objects};

/// Terrain corner value meaning "not part of any terrain".
pub const NO_TERRAIN: i32 = -1;

/// A terrain type declared by a tileset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TiledTerrain {
    pub name: String,
    /// Local index of the tile that represents this terrain, `-1` if none.
    pub solid_tile: i32,
}

impl TiledTerrain {
    pub fn from_json(object: &JsonObject, context: &str, report: &mut ParseReport) -> Self {
        Self {
            name: required_str(object, "name", context, report).to_owned(),
            solid_tile: required_int(object, "tile", -1, context, report) as i32,
        }
    }
}

/// One frame of a tile animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnimationFrame {
    pub tile_id: u32,
    /// Milliseconds.
    pub duration: u32,
}

/// Metadata for one tile of a tileset, keyed by its local index.
#[derive(Debug, Clone, PartialEq)]
pub struct TiledTileInfo {
    pub tile_index: u32,
    /// Terrain index per corner: top-left, top-right, bottom-left, bottom-right.
    pub terrain_indices: [i32; 4],
    /// Placement weight in `[0, 1]`.
    pub probability: f32,
    /// Collision shapes, relative to the tile's top-left corner.
    pub objects: Vec<TiledObject>,
    /// Raw `properties` array, resolved by [`crate::properties::CustomProperties`].
    pub properties: Vec<Value>,
    pub animation: Vec<AnimationFrame>,
}

impl Default for TiledTileInfo {
    fn default() -> Self {
        Self {
            tile_index: 0,
            terrain_indices: [NO_TERRAIN; 4],
            probability: 1.0,
            objects: Vec::new(),
            properties: Vec::new(),
            animation: Vec::new(),
        }
    }
}

impl TiledTileInfo {
    /// Parse one entry of a tileset's `tiles` array.
    ///
    /// A bad terrain array or collision object fails the entry, but every other
    /// field is still filled in.
    pub fn from_json(
        tile: &JsonObject,
        tile_index: u32,
        context: &str,
        report: &mut ParseReport,
    ) -> Self {
        let mut info = Self {
            tile_index,
            ..Self::default()
        };

        if let Some(terrain) = tile.get("terrain") {
            let corners: Option<Vec<i32>> = terrain.as_array().and_then(|corners| {
                corners
                    .iter()
                    .map(|corner| as_number(corner).map(|corner| corner as i32))
                    .collect()
            });
            match corners.as_deref() {
                Some(&[top_left, top_right, bottom_left, bottom_right]) => {
                    info.terrain_indices = [top_left, top_right, bottom_left, bottom_right];
                }
                _ => report.record(ParseError::invalid(
                    context,
                    format!("'terrain' must hold exactly 4 numbers, got {terrain}"),
                )),
            }
        }

        let probability = optional_number(tile, "probability", f64::NEG_INFINITY, 1.0, context, report);
        info.probability = probability.clamp(0.0, 1.0) as f32;

        if let Some(group) = object(tile, "objectgroup") {
            match array(group, "objects") {
                Some(objects) => info.objects = parse_objects(objects, context, report).0,
                None => report.record(ParseError::MissingField {
                    context: format!("{context} objectgroup"),
                    field: "objects".to_owned(),
                }),
            }
        }

        if let Some(properties) = array(tile, "properties") {
            info.properties = properties.to_vec();
        }

        if let Some(frames) = array(tile, "animation") {
            info.animation = frames
                .iter()
                .filter_map(Value::as_object)
                .map(|frame| AnimationFrame {
                    tile_id: required_int(frame, "tileid", 0, context, report) as u32,
                    duration: required_int(frame, "duration", 0, context, report) as u32,
                })
                .collect();
        }

        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> (TiledTileInfo, ParseReport) {
        let mut report = ParseReport::new();
        let info = TiledTileInfo::from_json(value.as_object().unwrap(), 4, "tile 4", &mut report);
        (info, report)
    }

    #[test]
    fn test_probability_clamp() {
        assert_eq!(parse(json!({ "probability": 1.5 })).0.probability, 1.0);
        assert_eq!(parse(json!({ "probability": -0.2 })).0.probability, 0.0);
        assert_eq!(parse(json!({})).0.probability, 1.0);
    }

    #[test]
    fn test_terrain_corners() {
        let (info, report) = parse(json!({ "terrain": [0, -1, 1, 2] }));
        assert!(report.is_success());
        assert_eq!(info.terrain_indices, [0, -1, 1, 2]);

        let (info, report) = parse(json!({ "terrain": [0, 1, 2], "probability": 0.5 }));
        assert!(!report.is_success());
        assert_eq!(info.terrain_indices, [NO_TERRAIN; 4]);
        assert_eq!(info.probability, 0.5);
    }

    #[test]
    fn test_collision_and_animation() {
        let (info, report) = parse(json!({
            "objectgroup": { "objects": [{ "id": 1, "name": "", "type": "", "width": 8, "height": 8 }] },
            "animation": [{ "tileid": 4, "duration": 100 }, { "tileid": 5, "duration": 200 }],
            "properties": [{ "name": "UserDataName", "type": "string", "value": "Lava" }]
        }));
        assert!(report.is_success());
        assert_eq!(info.objects.len(), 1);
        assert_eq!(info.animation[1], AnimationFrame { tile_id: 5, duration: 200 });
        assert_eq!(info.properties.len(), 1);

        let (_, report) = parse(json!({ "objectgroup": {} }));
        assert!(!report.is_success());
    }
}
