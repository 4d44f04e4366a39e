//! Resource graph nodes.
//!
//! A [`Resource`] tracks one source file (or one part of it, for embedded tile
//! sets and animated tiles) together with the asset generated from it. Edges
//! point from a resource to the resources it needs; every edge has a back
//! reference in the target's `used_by` set.

mod loader;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Manager-assigned resource identifier. Never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub u32);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    TileMap,
    TileSet,
    Texture,
    Sprite,
    Flipbook,
}

impl ResourceKind {
    /// Name used in the persisted state file.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TileMap => "map",
            Self::TileSet => "tileset",
            Self::Texture => "texture",
            Self::Sprite => "sprite",
            Self::Flipbook => "flipbook",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "map" => Some(Self::TileMap),
            "tileset" => Some(Self::TileSet),
            "texture" => Some(Self::Texture),
            "sprite" => Some(Self::Sprite),
            "flipbook" => Some(Self::Flipbook),
            _ => None,
        }
    }

    /// Sprites and flipbooks are regenerated by their tile set instead.
    pub fn can_auto_reimport(self) -> bool {
        !matches!(self, Self::Sprite | Self::Flipbook)
    }

    /// Kinds whose import reads a JSON document.
    pub fn uses_json(self) -> bool {
        matches!(self, Self::TileMap | Self::TileSet | Self::Flipbook)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of the resource graph.
#[derive(Debug, Clone)]
pub struct Resource {
    pub id: ResourceId,
    pub kind: ResourceKind,
    pub name: String,
    /// Source file, relative to the project directory, with `/` separators.
    pub source_path: String,
    /// Generated asset path, empty until the first import.
    pub asset_path: String,
    pub auto_reimport: bool,
    /// Chosen by the user rather than pulled in as a dependency.
    pub manually_imported: bool,
    /// Tile set defined inside its map file.
    pub embedded: bool,
    pub last_import_time: Option<SystemTime>,
    pub dependencies: BTreeSet<ResourceId>,
    /// Back references. They do not keep a resource alive.
    pub used_by: BTreeSet<ResourceId>,
    /// Tile maps only: first GID of each tile set dependency.
    pub tile_sets: BTreeMap<u32, ResourceId>,
    /// Transient JSON node, never persisted.
    pub json: Option<Value>,
}

impl Resource {
    pub fn new(id: ResourceId, kind: ResourceKind, name: impl Into<String>, source_path: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            source_path: source_path.into(),
            asset_path: String::new(),
            auto_reimport: true,
            manually_imported: false,
            embedded: false,
            last_import_time: None,
            dependencies: BTreeSet::new(),
            used_by: BTreeSet::new(),
            tile_sets: BTreeMap::new(),
            json: None,
        }
    }

    /// `true` if a JSON-backed resource has a non-empty document.
    pub fn has_json(&self) -> bool {
        match &self.json {
            Some(Value::Object(object)) => !object.is_empty(),
            _ => false,
        }
    }

    /// Directory of the generated asset path, `""` at the content root.
    pub fn asset_dir(&self) -> &str {
        self.asset_path.rsplit_once('/').map_or("", |(dir, _)| dir)
    }
}

/// Join an asset directory and a file name.
pub(crate) fn join_asset_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_owned()
    } else {
        format!("{dir}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        for kind in [
            ResourceKind::TileMap,
            ResourceKind::TileSet,
            ResourceKind::Texture,
            ResourceKind::Sprite,
            ResourceKind::Flipbook,
        ] {
            assert_eq!(ResourceKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ResourceKind::parse("Map"), None);
        assert!(!ResourceKind::Flipbook.can_auto_reimport());
        assert!(ResourceKind::Texture.can_auto_reimport());
        assert!(!ResourceKind::Texture.uses_json());
    }

    #[test]
    fn test_asset_dir() {
        let mut resource = Resource::new(ResourceId(1), ResourceKind::TileSet, "forest", "maps/forest.tsj");
        assert_eq!(resource.asset_dir(), "");
        resource.asset_path = "maps/TileSets/BP_forest".into();
        assert_eq!(resource.asset_dir(), "maps/TileSets");
        assert_eq!(join_asset_path(resource.asset_dir(), "x"), "maps/TileSets/x");
        assert_eq!(join_asset_path("", "x"), "x");
    }
}
