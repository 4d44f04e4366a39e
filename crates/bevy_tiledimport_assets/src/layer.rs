//! Map layers: tile grids, object groups and image overlays.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::json::{
    JsonObject, ParseError, ParseReport, TiledLiteral, array, as_number, optional_bool,
    optional_literal, optional_number, optional_str, required_int, required_literal,
    required_str,
};
use crate::object::{TiledObject, parse_objects};

/// Layer kind, from the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiledLayerType {
    TileLayer,
    ObjectGroup,
    ImageLayer,
}

impl TiledLiteral for TiledLayerType {
    const EXPECTED: &'static str = "'tilelayer', 'objectgroup' or 'imagelayer'";

    fn from_literal(literal: &str) -> Option<Self> {
        match literal {
            "tilelayer" => Some(Self::TileLayer),
            "objectgroup" => Some(Self::ObjectGroup),
            "imagelayer" => Some(Self::ImageLayer),
            _ => None,
        }
    }
}

/// Order in which an object group's objects are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DrawOrder {
    /// Sorted by y coordinate.
    #[default]
    TopDown,
    /// Document order.
    Index,
}

impl TiledLiteral for DrawOrder {
    const EXPECTED: &'static str = "'index' or 'topdown'";

    fn from_literal(literal: &str) -> Option<Self> {
        match literal {
            "index" => Some(Self::Index),
            "topdown" => Some(Self::TopDown),
            _ => None,
        }
    }
}

/// A parsed layer.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayerFromTiled {
    pub name: String,
    /// Size in tiles.
    pub width: u32,
    pub height: u32,
    /// `None` if the `type` field was missing or unknown.
    pub layer_type: Option<TiledLayerType>,
    /// Raw GIDs, row-major, `width * height` long for a valid tile layer.
    pub tile_indices: Vec<u32>,
    pub objects: Vec<TiledObject>,
    pub draw_order: DrawOrder,
    pub image_path: String,
    pub visible: bool,
    /// Not clamped here.
    pub opacity: f32,
    /// Pixel offset.
    pub offset: IVec2,
    /// Raw `properties` array.
    pub properties: Vec<Value>,
}

impl Default for TileLayerFromTiled {
    fn default() -> Self {
        Self {
            name: String::new(),
            width: 0,
            height: 0,
            layer_type: None,
            tile_indices: Vec::new(),
            objects: Vec::new(),
            draw_order: DrawOrder::TopDown,
            image_path: String::new(),
            visible: true,
            opacity: 1.0,
            offset: IVec2::ZERO,
            properties: Vec::new(),
        }
    }
}

impl TileLayerFromTiled {
    /// Parse one entry of a map's `layers` array, returning `true` if no error was
    /// recorded.
    pub fn parse_json(&mut self, json: &JsonObject, context: &str, report: &mut ParseReport) -> bool {
        let mark = report.mark();

        self.width = required_int(json, "width", 0, context, report) as u32;
        self.height = required_int(json, "height", 0, context, report) as u32;
        self.offset = IVec2::new(
            required_int(json, "x", 0, context, report) as i32,
            required_int(json, "y", 0, context, report) as i32,
        );

        self.visible = optional_bool(json, "visible", true);
        self.opacity = optional_number(json, "opacity", f64::NEG_INFINITY, 1.0, context, report) as f32;
        self.name = required_str(json, "name", context, report).to_owned();
        let context = format!("{context} layer '{}'", self.name);

        self.layer_type = required_literal(json, "type", &context, report);
        match self.layer_type {
            Some(TiledLayerType::TileLayer) => self.parse_tiles(json, &context, report),
            Some(TiledLayerType::ObjectGroup) => {
                self.draw_order = optional_literal(json, "draworder", &context, report).unwrap_or_default();
                match array(json, "objects") {
                    Some(objects) => self.objects = parse_objects(objects, &context, report).0,
                    None => report.record(ParseError::MissingField {
                        context: context.clone(),
                        field: "objects".to_owned(),
                    }),
                }
            }
            Some(TiledLayerType::ImageLayer) => {
                self.image_path = optional_str(json, "image").unwrap_or_default().to_owned();
            }
            None => {}
        }

        self.properties = array(json, "properties").unwrap_or_default().to_vec();

        report.clean_since(mark)
    }

    fn parse_tiles(&mut self, json: &JsonObject, context: &str, report: &mut ParseReport) {
        // A tile layer needs an actual grid
        for (field, value) in [("width", self.width), ("height", self.height)] {
            if value < 1 {
                report.record(ParseError::BelowMinimum {
                    context: context.to_owned(),
                    field: field.to_owned(),
                    value: value.to_string(),
                    min: "1".to_owned(),
                });
            }
        }

        match json.get("data") {
            Some(Value::Array(data)) => {
                self.tile_indices = data
                    .iter()
                    .map(|gid| as_number(gid).map_or(0, |gid| gid as u32))
                    .collect();
            }
            Some(Value::String(_)) => report.record(ParseError::invalid(
                context,
                format!(
                    "Encoded layer data ('{}') is not supported, export the map with CSV layer format",
                    optional_str(json, "encoding").unwrap_or_default()
                ),
            )),
            _ => report.record(ParseError::MissingField {
                context: context.to_owned(),
                field: "data".to_owned(),
            }),
        }
    }

    pub fn is_tile_layer(&self) -> bool {
        self.layer_type == Some(TiledLayerType::TileLayer)
    }

    /// Object groups and image layers may have a zero size. Tile layers need a
    /// non-empty grid with one GID per cell.
    pub fn is_valid(&self) -> bool {
        self.validation_error().is_none()
    }

    /// Why [`Self::is_valid`] fails, if it does.
    pub fn validation_error(&self) -> Option<String> {
        if !self.is_tile_layer() {
            return None;
        }
        if self.width == 0 || self.height == 0 {
            return Some(format!(
                "Tile layer '{}' has an empty {}x{} grid",
                self.name, self.width, self.height
            ));
        }
        let cells = self.width as usize * self.height as usize;
        (self.tile_indices.len() != cells).then(|| {
            format!(
                "Tile layer '{}' has {} GIDs for {cells} cells",
                self.name,
                self.tile_indices.len()
            )
        })
    }

    /// Raw GID at a cell, `0` outside the grid.
    pub fn gid_at(&self, x: u32, y: u32) -> u32 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.tile_indices
            .get(y as usize * self.width as usize + x as usize)
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> (TileLayerFromTiled, bool) {
        let mut report = ParseReport::new();
        let mut layer = TileLayerFromTiled::default();
        let ok = layer.parse_json(value.as_object().unwrap(), "map.tmj", &mut report);
        (layer, ok)
    }

    #[test]
    fn test_tile_layer_length_must_match() {
        let (layer, ok) = parse(json!({
            "type": "tilelayer", "name": "ground", "width": 3, "height": 2, "x": 0, "y": 0,
            "data": [1, 2, 3, 4, 5]
        }));
        assert!(ok);
        assert!(!layer.is_valid());

        let (layer, ok) = parse(json!({
            "type": "tilelayer", "name": "ground", "width": 3, "height": 2, "x": 0, "y": 0,
            "data": [1, 2, 3, 4, 5, 3221225473u32], "opacity": 1.5
        }));
        assert!(ok);
        assert!(layer.is_valid());
        assert_eq!(layer.gid_at(2, 1), 0xC000_0001);
        assert_eq!(layer.opacity, 1.5);
    }

    #[test]
    fn test_zero_area_tile_layer_fails() {
        let (layer, ok) = parse(json!({
            "type": "tilelayer", "name": "empty", "width": 0, "height": 2, "x": 0, "y": 0, "data": []
        }));
        assert!(!ok);
        assert!(!layer.is_valid());
    }

    #[test]
    fn test_object_group() {
        let (layer, ok) = parse(json!({
            "type": "objectgroup", "name": "spawns", "width": 10, "height": 10, "x": 0, "y": 0,
            "draworder": "index", "visible": false,
            "objects": [{ "id": 1, "name": "player", "type": "Spawn", "x": 16, "y": 32, "point": true }]
        }));
        assert!(ok);
        assert!(layer.is_valid());
        assert!(!layer.visible);
        assert_eq!(layer.draw_order, DrawOrder::Index);
        assert_eq!(layer.objects[0].name, "player");

        let (_, ok) = parse(json!({
            "type": "objectgroup", "name": "spawns", "width": 10, "height": 10, "x": 0, "y": 0
        }));
        assert!(!ok);
    }

    #[test]
    fn test_zero_size_object_group_is_valid() {
        let (layer, ok) = parse(json!({
            "type": "objectgroup", "name": "spawns", "width": 0, "height": 0, "x": 0, "y": 0,
            "objects": []
        }));
        assert!(ok);
        assert!(layer.is_valid());
        assert!(layer.validation_error().is_none());

        let (layer, _) = parse(json!({
            "type": "tilelayer", "name": "ground", "width": 2, "height": 2, "x": 0, "y": 0,
            "data": [1, 2, 3]
        }));
        assert_eq!(
            layer.validation_error().as_deref(),
            Some("Tile layer 'ground' has 3 GIDs for 4 cells")
        );
    }

    #[test]
    fn test_gid_at_far_corner_of_large_grid() {
        let (mut layer, _) = parse(json!({
            "type": "tilelayer", "name": "huge", "width": 1, "height": 1, "x": 0, "y": 0, "data": [7]
        }));
        layer.width = 70_000;
        layer.height = 70_000;

        assert_eq!(layer.gid_at(0, 0), 7);
        assert_eq!(layer.gid_at(69_999, 69_999), 0);
    }

    #[test]
    fn test_unknown_type_fails() {
        let (layer, ok) = parse(json!({
            "type": "group", "name": "folder", "width": 1, "height": 1, "x": 0, "y": 0
        }));
        assert!(!ok);
        assert_eq!(layer.layer_type, None);

        let (_, ok) = parse(json!({ "type": "imagelayer", "width": 1, "height": 1, "x": 0, "y": 0 }));
        assert!(!ok, "name is required");
    }
}
