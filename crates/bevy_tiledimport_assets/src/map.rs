//! Map documents (`.tmj` / `.json`).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::json::{
    JsonObject, ParseError, ParseReport, TiledLiteral, array, optional_int, optional_literal,
    optional_str, required_int, required_literal,
};
use crate::layer::TileLayerFromTiled;
use crate::properties::parse_hex_color;
use crate::tileset::TileSetFromTiled;

/// The only map format version this importer understands.
pub const SUPPORTED_VERSION: i64 = 1;

/// Background color used when a map does not set one.
pub const DEFAULT_BACKGROUND: Srgba = Srgba::rgb(55.0 / 255.0, 55.0 / 255.0, 55.0 / 255.0);

/// Projection used to lay out the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TiledOrientation {
    #[default]
    Unknown,
    Orthogonal,
    Isometric,
    Staggered,
    Hexagonal,
}

impl TiledLiteral for TiledOrientation {
    const EXPECTED: &'static str = "'orthogonal', 'isometric', 'staggered' or 'hexagonal'";

    fn from_literal(literal: &str) -> Option<Self> {
        match literal {
            "orthogonal" => Some(Self::Orthogonal),
            "isometric" => Some(Self::Isometric),
            "staggered" => Some(Self::Staggered),
            "hexagonal" => Some(Self::Hexagonal),
            _ => None,
        }
    }
}

/// Which axis is staggered, for staggered and hexagonal maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StaggerAxis {
    X,
    #[default]
    Y,
}

impl TiledLiteral for StaggerAxis {
    const EXPECTED: &'static str = "'x' or 'y'";

    fn from_literal(literal: &str) -> Option<Self> {
        match literal {
            "x" => Some(Self::X),
            "y" => Some(Self::Y),
            _ => None,
        }
    }
}

/// Whether odd or even rows/columns are shifted, for staggered and hexagonal maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StaggerIndex {
    #[default]
    Odd,
    Even,
}

impl TiledLiteral for StaggerIndex {
    const EXPECTED: &'static str = "'odd' or 'even'";

    fn from_literal(literal: &str) -> Option<Self> {
        match literal {
            "odd" => Some(Self::Odd),
            "even" => Some(Self::Even),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RenderOrder {
    #[default]
    RightDown,
    RightUp,
    LeftDown,
    LeftUp,
}

impl TiledLiteral for RenderOrder {
    const EXPECTED: &'static str = "'right-down', 'right-up', 'left-down' or 'left-up'";

    fn from_literal(literal: &str) -> Option<Self> {
        match literal {
            "right-down" => Some(Self::RightDown),
            "right-up" => Some(Self::RightUp),
            "left-down" => Some(Self::LeftDown),
            "left-up" => Some(Self::LeftUp),
            _ => None,
        }
    }
}

/// A parsed map document. Lives only for the duration of one import.
#[derive(Debug, Clone, PartialEq)]
pub struct TileMapFromTiled {
    pub version: i64,
    /// Size in tiles.
    pub width: u32,
    pub height: u32,
    /// Tile size in pixels, as written in the document.
    pub tile_width: u32,
    pub tile_height: u32,
    pub orientation: TiledOrientation,
    pub hex_side_length: u32,
    pub stagger_axis: StaggerAxis,
    pub stagger_index: StaggerIndex,
    pub render_order: RenderOrder,
    pub background_color: Srgba,
    /// Tilesets with their first GID set, filled in by the importer.
    pub tile_sets: Vec<TileSetFromTiled>,
    /// Layers in document order, bottom to top.
    pub layers: Vec<TileLayerFromTiled>,
    /// Raw `properties` array.
    pub properties: Vec<Value>,
}

impl Default for TileMapFromTiled {
    fn default() -> Self {
        Self {
            version: 0,
            width: 0,
            height: 0,
            tile_width: 0,
            tile_height: 0,
            orientation: TiledOrientation::Unknown,
            hex_side_length: 0,
            stagger_axis: StaggerAxis::default(),
            stagger_index: StaggerIndex::default(),
            render_order: RenderOrder::default(),
            background_color: DEFAULT_BACKGROUND,
            tile_sets: Vec::new(),
            layers: Vec::new(),
            properties: Vec::new(),
        }
    }
}

impl TileMapFromTiled {
    /// Parse the map-level fields and every layer, returning `true` if no error
    /// was recorded.
    ///
    /// Tilesets are not read here; the importer resolves them to imported assets
    /// first and then fills [`TileMapFromTiled::tile_sets`].
    pub fn parse_json(&mut self, json: &JsonObject, context: &str, report: &mut ParseReport) -> bool {
        let mark = report.mark();

        self.version = required_int(json, "version", i64::MIN, context, report);
        if self.version != SUPPORTED_VERSION {
            warn!(
                "'{context}' uses map format version {}, only version {SUPPORTED_VERSION} is supported. The import may be incomplete",
                self.version
            );
        }
        self.width = required_int(json, "width", 1, context, report) as u32;
        self.height = required_int(json, "height", 1, context, report) as u32;
        self.tile_width = required_int(json, "tilewidth", 1, context, report) as u32;
        self.tile_height = required_int(json, "tileheight", 1, context, report) as u32;
        self.hex_side_length = optional_int(json, "hexsidelength", 0, 0, context, report) as u32;

        self.stagger_axis = optional_literal(json, "staggeraxis", context, report).unwrap_or_default();
        self.stagger_index = optional_literal(json, "staggerindex", context, report).unwrap_or_default();
        self.render_order = optional_literal(json, "renderorder", context, report).unwrap_or_default();

        self.background_color = DEFAULT_BACKGROUND;
        if let Some(color) = optional_str(json, "backgroundcolor").filter(|color| !color.is_empty()) {
            match parse_hex_color(color) {
                Some(color) => self.background_color = color,
                None => report.record(ParseError::invalid(
                    context,
                    format!("Invalid 'backgroundcolor' '{color}'"),
                )),
            }
        }

        self.orientation = required_literal(json, "orientation", context, report).unwrap_or_default();

        self.properties = array(json, "properties").unwrap_or_default().to_vec();

        self.layers.clear();
        match array(json, "layers") {
            Some(layers) => {
                for (index, layer) in layers.iter().enumerate() {
                    let mut parsed = TileLayerFromTiled::default();
                    match layer.as_object() {
                        Some(layer) => {
                            parsed.parse_json(layer, context, report);
                        }
                        None => report.record(ParseError::invalid(
                            context,
                            format!("Layer {index} is not an object"),
                        )),
                    }
                    self.layers.push(parsed);
                }
            }
            None => report.record(ParseError::MissingField {
                context: context.to_owned(),
                field: "layers".to_owned(),
            }),
        }

        report.clean_since(mark)
    }

    /// Tile height used for layout. Hexagonal maps add the side length.
    pub fn effective_tile_height(&self) -> u32 {
        if self.orientation == TiledOrientation::Hexagonal {
            self.tile_height + self.hex_side_length
        } else {
            self.tile_height
        }
    }

    pub fn is_valid(&self) -> bool {
        self.version != 0
            && self.width > 0
            && self.height > 0
            && self.tile_width > 0
            && self.tile_height > 0
            && self.orientation != TiledOrientation::Unknown
    }

    /// `true` if every layer passes [`TileLayerFromTiled::is_valid`].
    pub fn layers_valid(&self) -> bool {
        self.layers.iter().all(TileLayerFromTiled::is_valid)
    }

    /// Check [`Self::is_valid`] and [`Self::layers_valid`], recording the reason of
    /// every failure into `report`.
    pub fn validate(&self, context: &str, report: &mut ParseReport) -> bool {
        let mark = report.mark();
        if self.orientation == TiledOrientation::Unknown {
            report.record(ParseError::invalid(context, "Unknown map orientation"));
        }
        if self.orientation != TiledOrientation::Unknown && !self.is_valid() {
            report.record(ParseError::invalid(
                context,
                format!(
                    "Invalid map header (version {}, {}x{} tiles of {}x{} pixels)",
                    self.version, self.width, self.height, self.tile_width, self.tile_height
                ),
            ));
        }
        for layer in &self.layers {
            if let Some(reason) = layer.validation_error() {
                report.record(ParseError::invalid(context, reason));
            }
        }
        report.clean_since(mark)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hex_map() -> Value {
        json!({
            "type": "map",
            "version": "1.10",
            "orientation": "hexagonal",
            "renderorder": "left-up",
            "staggeraxis": "x",
            "staggerindex": "even",
            "hexsidelength": 8,
            "width": 2,
            "height": 2,
            "tilewidth": 32,
            "tileheight": 32,
            "backgroundcolor": "#80102030",
            "layers": [{
                "type": "tilelayer", "name": "ground", "width": 2, "height": 2, "x": 0, "y": 0,
                "data": [1, 0, 0, 2]
            }],
            "tilesets": []
        })
    }

    #[test]
    fn test_parse_hexagonal_map() {
        let mut report = ParseReport::new();
        let mut map = TileMapFromTiled::default();
        assert!(map.parse_json(hex_map().as_object().unwrap(), "hex.tmj", &mut report));

        assert!(map.is_valid());
        assert!(map.layers_valid());
        assert_eq!(map.version, 1);
        assert_eq!(map.orientation, TiledOrientation::Hexagonal);
        assert_eq!(map.stagger_axis, StaggerAxis::X);
        assert_eq!(map.stagger_index, StaggerIndex::Even);
        assert_eq!(map.render_order, RenderOrder::LeftUp);
        assert_eq!(map.effective_tile_height(), 40);
        assert_eq!(map.background_color, Srgba::rgba_u8(0x10, 0x20, 0x30, 0x80));
    }

    #[test]
    fn test_unknown_orientation_is_invalid() {
        let mut value = hex_map();
        value["orientation"] = json!("Orthogonal");
        value.as_object_mut().unwrap().remove("backgroundcolor");

        let mut report = ParseReport::new();
        let mut map = TileMapFromTiled::default();
        assert!(!map.parse_json(value.as_object().unwrap(), "hex.tmj", &mut report));
        assert_eq!(map.orientation, TiledOrientation::Unknown);
        assert_eq!(map.background_color, DEFAULT_BACKGROUND);
        assert!(!map.is_valid());
    }

    #[test]
    fn test_missing_layers_fails() {
        let mut value = hex_map();
        value.as_object_mut().unwrap().remove("layers");

        let mut report = ParseReport::new();
        let mut map = TileMapFromTiled::default();
        assert!(!map.parse_json(value.as_object().unwrap(), "hex.tmj", &mut report));
        assert!(map.is_valid());
    }

    #[test]
    fn test_validate_reports_layer_reasons() {
        let mut value = hex_map();
        value["layers"]
            .as_array_mut()
            .unwrap()
            .push(json!({
                "type": "objectgroup", "name": "spawns", "width": 0, "height": 0, "x": 0, "y": 0,
                "objects": []
            }));

        let mut report = ParseReport::new();
        let mut map = TileMapFromTiled::default();
        assert!(map.parse_json(value.as_object().unwrap(), "hex.tmj", &mut report));
        assert!(map.layers_valid());
        assert!(map.validate("hex.tmj", &mut report));
        assert!(report.is_success());

        value["layers"][0]["data"] = json!([1, 0, 0]);
        let mut map = TileMapFromTiled::default();
        assert!(map.parse_json(value.as_object().unwrap(), "hex.tmj", &mut report));
        assert!(!map.validate("hex.tmj", &mut report));
        assert_eq!(report.errors().len(), 1);
        assert!(report.errors()[0].to_string().contains("3 GIDs for 4 cells"));
    }
}
