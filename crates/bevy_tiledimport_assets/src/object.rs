//! Placed shapes from object groups.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::json::{
    JsonObject, ParseError, ParseReport, array, as_number, optional_bool, optional_number,
    optional_str, required_int, required_str,
};

/// The shape of a [`TiledObject`], decided by which keys are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TiledObjectKind {
    #[default]
    Box,
    Ellipse,
    Polygon,
    Polyline,
    PlacedTile,
}

/// One placed shape.
///
/// `position` is the Tiled `x`/`y` pair. Its anchor depends on `kind`: the box origin
/// for boxes and ellipses, the first vertex for polygons and polylines, the
/// bottom-left corner for placed tiles. Only one of `size`, `points` and `tile_gid`
/// carries meaning for a given kind.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TiledObject {
    pub kind: TiledObjectKind,
    pub id: u32,
    pub name: String,
    pub user_type: String,
    pub visible: bool,
    pub position: Vec2,
    pub size: Vec2,
    /// Degrees, clockwise, unbounded.
    pub rotation: f32,
    /// Vertices relative to `position`.
    pub points: Vec<Vec2>,
    pub tile_gid: Option<u32>,
}

impl TiledObject {
    /// Parse one entry of an `objects` array.
    ///
    /// Errors are recorded into `report`, and whatever could be read is still
    /// returned. The kind is chosen from key presence alone: `gid`, then `ellipse`,
    /// then `polygon`, then `polyline`, otherwise a box.
    pub fn from_json(object: &JsonObject, context: &str, report: &mut ParseReport) -> Self {
        let coordinate = |field: &str, report: &mut ParseReport| {
            let value = optional_number(object, field, f64::NEG_INFINITY, f64::NEG_INFINITY, context, report);
            if value.is_finite() { value as f32 } else { 0.0 }
        };
        let position = Vec2::new(coordinate("x", report), coordinate("y", report));
        let rotation = coordinate("rotation", report);
        let width = optional_number(object, "width", 0.0, 0.0, context, report) as f32;
        let height = optional_number(object, "height", 0.0, 0.0, context, report) as f32;

        let visible = optional_bool(object, "visible", true);
        let name = required_str(object, "name", context, report).to_owned();
        // Tiled 1.9 renamed "type" to "class" on objects
        let user_type = match optional_str(object, "type").or_else(|| optional_str(object, "class")) {
            Some(user_type) => user_type.to_owned(),
            None => required_str(object, "type", context, report).to_owned(),
        };
        let id = required_int(object, "id", 0, context, report) as u32;

        let mut parsed = Self {
            id,
            name,
            user_type,
            visible,
            position,
            rotation,
            ..default()
        };

        if let Some(gid) = object.get("gid") {
            parsed.kind = TiledObjectKind::PlacedTile;
            parsed.size = Vec2::new(width, height);
            match as_number(gid) {
                Some(gid) => parsed.tile_gid = Some(gid as u32),
                None => report.record(ParseError::invalid(context, "'gid' is not a number")),
            }
        } else if object.contains_key("ellipse") {
            parsed.kind = TiledObjectKind::Ellipse;
            parsed.size = Vec2::new(width, height);
        } else if let Some(points) = array(object, "polygon") {
            parsed.kind = TiledObjectKind::Polygon;
            parsed.points = parse_points(points, context, report);
        } else if let Some(points) = array(object, "polyline") {
            parsed.kind = TiledObjectKind::Polyline;
            parsed.points = parse_points(points, context, report);
        } else {
            parsed.kind = TiledObjectKind::Box;
            parsed.size = Vec2::new(width, height);
        }

        parsed
    }
}

fn parse_points(points: &[Value], context: &str, report: &mut ParseReport) -> Vec<Vec2> {
    points
        .iter()
        .filter_map(|point| {
            let x = point.get("x").and_then(as_number);
            let y = point.get("y").and_then(as_number);
            match (x, y) {
                (Some(x), Some(y)) => Some(Vec2::new(x as f32, y as f32)),
                _ => {
                    report.record(ParseError::invalid(context, format!("Invalid point {point}")));
                    None
                }
            }
        })
        .collect()
}

/// Parse every entry of an `objects` array. Returns the objects and whether all of
/// them parsed cleanly.
pub fn parse_objects(
    objects: &[Value],
    context: &str,
    report: &mut ParseReport,
) -> (Vec<TiledObject>, bool) {
    let mark = report.mark();
    let parsed = objects
        .iter()
        .enumerate()
        .filter_map(|(index, object)| {
            let object_context = format!("{context} object {index}");
            match object.as_object() {
                Some(object) => Some(TiledObject::from_json(object, &object_context, report)),
                None => {
                    report.record(ParseError::invalid(&object_context, "Expected an object"));
                    None
                }
            }
        })
        .collect();
    (parsed, report.clean_since(mark))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> (TiledObject, ParseReport) {
        let mut report = ParseReport::new();
        let object = TiledObject::from_json(value.as_object().unwrap(), "test", &mut report);
        (object, report)
    }

    #[test]
    fn test_kind_priority() {
        let (object, report) = parse(json!({
            "id": 3, "name": "", "type": "", "x": 1, "y": 2,
            "gid": 7, "ellipse": true, "polygon": []
        }));
        assert!(report.is_success());
        assert_eq!(object.kind, TiledObjectKind::PlacedTile);
        assert_eq!(object.tile_gid, Some(7));

        let (object, _) = parse(json!({
            "id": 3, "name": "", "type": "", "ellipse": true, "width": 4, "height": 6
        }));
        assert_eq!(object.kind, TiledObjectKind::Ellipse);
        assert_eq!(object.size, Vec2::new(4.0, 6.0));
    }

    #[test]
    fn test_polygon_points() {
        let (object, report) = parse(json!({
            "id": 1, "name": "hull", "class": "Solid", "x": 8, "y": 8, "rotation": 45,
            "polygon": [{ "x": 0, "y": 0 }, { "x": 4, "y": 0 }, { "x": 4, "y": 4 }]
        }));
        assert!(report.is_success());
        assert_eq!(object.kind, TiledObjectKind::Polygon);
        assert_eq!(object.user_type, "Solid");
        assert_eq!(object.points.len(), 3);
        assert_eq!(object.points[2], Vec2::new(4.0, 4.0));
        assert_eq!(object.rotation, 45.0);
    }

    #[test]
    fn test_missing_fields_keep_classification() {
        let (object, report) = parse(json!({
            "polyline": [{ "x": 0, "y": 0 }, { "x": 1 }]
        }));
        assert_eq!(object.kind, TiledObjectKind::Polyline);
        assert_eq!(object.points.len(), 1);
        assert!(object.visible);
        // name, type, id and the broken point
        assert_eq!(report.errors().len(), 4);
    }
}
