//! Collision geometry for tiles.
//!
//! Tiled places per-tile collision shapes relative to the tile's top-left corner.
//! [`add_to_geometry_collection`] converts them to shapes anchored at the tile center.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::object::{TiledObject, TiledObjectKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShapeType {
    #[default]
    Box,
    Circle,
    Polygon,
}

/// One collision shape in tile-center coordinates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CollisionShape {
    pub shape: ShapeType,
    pub position: Vec2,
    /// Unused for polygons.
    pub size: Vec2,
    /// Degrees, counter-clockwise, in `(-360, 360)`.
    pub rotation: f32,
    /// Polygon vertices relative to `position`.
    pub vertices: Vec<Vec2>,
}

/// Collision shapes attached to one tile.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpriteGeometry {
    pub shapes: Vec<CollisionShape>,
}

impl SpriteGeometry {
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

/// Replace `geometry` with the collision shapes described by `objects`.
///
/// Boxes and ellipses are shifted by `size / 2 - tile_size / 2`, polygons by
/// `-tile_size / 2`. Placed tiles and polylines have no collision meaning and are
/// skipped with a warning.
pub fn add_to_geometry_collection(
    tile_size: Vec2,
    objects: &[TiledObject],
    geometry: &mut SpriteGeometry,
) {
    geometry.shapes.clear();

    let half_tile = tile_size * 0.5;
    for object in objects {
        let rotation = (-object.rotation) % 360.0;
        let shape = match object.kind {
            TiledObjectKind::Box | TiledObjectKind::Ellipse => CollisionShape {
                shape: if object.kind == TiledObjectKind::Box {
                    ShapeType::Box
                } else {
                    ShapeType::Circle
                },
                position: object.position - half_tile + object.size * 0.5,
                size: object.size,
                rotation,
                vertices: Vec::new(),
            },
            TiledObjectKind::Polygon => CollisionShape {
                shape: ShapeType::Polygon,
                position: object.position - half_tile,
                size: Vec2::ZERO,
                rotation,
                vertices: object.points.clone(),
            },
            TiledObjectKind::PlacedTile | TiledObjectKind::Polyline => {
                warn!(
                    "Ignoring {:?} object '{}' in tile collision, only boxes, ellipses and polygons are supported",
                    object.kind, object.name
                );
                continue;
            }
        };
        geometry.shapes.push(shape);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_and_ellipse_offsets() {
        let objects = vec![
            TiledObject {
                kind: TiledObjectKind::Box,
                position: Vec2::new(0.0, 0.0),
                size: Vec2::new(16.0, 8.0),
                rotation: 30.0,
                ..default()
            },
            TiledObject {
                kind: TiledObjectKind::Ellipse,
                position: Vec2::new(4.0, 4.0),
                size: Vec2::new(8.0, 8.0),
                ..default()
            },
        ];
        let mut geometry = SpriteGeometry::default();
        add_to_geometry_collection(Vec2::splat(16.0), &objects, &mut geometry);

        assert_eq!(geometry.shapes.len(), 2);
        assert_eq!(geometry.shapes[0].shape, ShapeType::Box);
        assert_eq!(geometry.shapes[0].position, Vec2::new(0.0, -4.0));
        assert_eq!(geometry.shapes[0].rotation, -30.0);
        assert_eq!(geometry.shapes[1].shape, ShapeType::Circle);
        assert_eq!(geometry.shapes[1].position, Vec2::ZERO);
    }

    #[test]
    fn test_polygon_and_skipped_kinds() {
        let objects = vec![
            TiledObject {
                kind: TiledObjectKind::Polygon,
                position: Vec2::new(2.0, 2.0),
                rotation: 400.0,
                points: vec![Vec2::ZERO, Vec2::new(4.0, 0.0), Vec2::new(0.0, 4.0)],
                ..default()
            },
            TiledObject {
                kind: TiledObjectKind::Polyline,
                points: vec![Vec2::ZERO, Vec2::ONE],
                ..default()
            },
            TiledObject {
                kind: TiledObjectKind::PlacedTile,
                tile_gid: Some(1),
                ..default()
            },
        ];
        let mut geometry = SpriteGeometry {
            shapes: vec![CollisionShape::default()],
        };
        add_to_geometry_collection(Vec2::new(8.0, 8.0), &objects, &mut geometry);

        assert_eq!(geometry.shapes.len(), 1);
        let polygon = &geometry.shapes[0];
        assert_eq!(polygon.shape, ShapeType::Polygon);
        assert_eq!(polygon.position, Vec2::new(-2.0, -2.0));
        assert_eq!(polygon.vertices.len(), 3);
        assert_eq!(polygon.rotation, -40.0);
    }
}
