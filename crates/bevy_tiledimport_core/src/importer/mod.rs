//! Kind-specific asset generation.
//!
//! Each importer reads the parsed JSON a resource carries, imports the
//! dependencies it needs first, then builds its asset on top of whatever the
//! store already holds at the asset path and saves it back.

mod flipbook;
mod tilemap;
mod tileset;

use bevy_tiledimport_assets::json::{JsonObject, ParseError, ParseReport};
use serde_json::Value;

use crate::error::ImportError;
use crate::manager::ResourceManager;
use crate::resource::{ResourceId, ResourceKind, join_asset_path};

/// A parse failure carrying every recorded error, or a generic validation
/// error when nothing was recorded.
pub(crate) fn parse_failed(path: &str, report: &ParseReport) -> ImportError {
    let mut errors = report.errors().to_vec();
    if errors.is_empty() {
        errors.push(ParseError::invalid(path, "The document parsed but failed validation"));
    }
    ImportError::Parse {
        path: path.to_owned(),
        errors,
    }
}

impl ResourceManager {
    pub(crate) fn import_asset_internal(&mut self, id: ResourceId) -> Result<(), ImportError> {
        match self.resource(id)?.kind {
            ResourceKind::TileMap => self.import_tile_map(id),
            ResourceKind::TileSet => self.import_tile_set(id),
            ResourceKind::Texture => self.import_texture(id),
            ResourceKind::Flipbook => self.import_flipbook(id),
            ResourceKind::Sprite => self.import_sprite(id),
        }
    }

    /// The JSON object behind a resource.
    fn resource_document(&self, id: ResourceId) -> Result<JsonObject, ImportError> {
        let resource = self.resource(id)?;
        match &resource.json {
            Some(Value::Object(document)) => Ok(document.clone()),
            _ => Err(ImportError::AssetImportFailed {
                kind: resource.kind.as_str(),
                name: resource.name.clone(),
                reason: "no JSON document is loaded".to_owned(),
            }),
        }
    }

    /// `<dir of owner asset>/<folder>/<file>`.
    fn dependency_asset_path(&self, owner: ResourceId, folder: &str, file: &str) -> Result<String, ImportError> {
        let owner = self.resource(owner)?;
        Ok(join_asset_path(&join_asset_path(owner.asset_dir(), folder), file))
    }

    /// Dependencies of one kind.
    fn dependencies_of_kind(&self, id: ResourceId, kind: ResourceKind) -> Vec<ResourceId> {
        self.dependencies_of(id)
            .into_iter()
            .filter(|dependency| {
                self.instances
                    .get(dependency)
                    .is_some_and(|resource| resource.kind == kind)
            })
            .collect()
    }

    /// Users of one kind.
    fn users_of_kind(&self, id: ResourceId, kind: ResourceKind) -> Vec<ResourceId> {
        self.users_of(id)
            .into_iter()
            .filter(|user| {
                self.instances
                    .get(user)
                    .is_some_and(|resource| resource.kind == kind)
            })
            .collect()
    }
}
