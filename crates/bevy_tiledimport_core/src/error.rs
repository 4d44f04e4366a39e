use std::path::PathBuf;

use bevy_tiledimport_assets::json::{JsonFileError, ParseError};
use thiserror::Error;

use crate::resource::ResourceId;
use crate::store::StoreError;
use crate::texture::TextureImportError;

/// Failure of a resource manager operation.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("'{}' is not inside the project directory '{}'", .path.display(), .root.display())]
    OutsideProject { path: PathBuf, root: PathBuf },

    #[error("'{}' is not inside the content directory '{}'", .path.display(), .root.display())]
    OutsideContent { path: PathBuf, root: PathBuf },

    #[error("'{0}' is already imported, reimport it instead")]
    AlreadyImported(String),

    #[error("'{}' already exists", .0.display())]
    TargetExists(PathBuf),

    #[error("'{0}' is not a valid tile map or tile set file")]
    UnsupportedFile(String),

    #[error("'{path}' is not valid JSON: {source}")]
    InvalidJson {
        path: String,
        #[source]
        source: JsonFileError,
    },

    #[error(
        "Failed to parse '{path}' ({} errors){}",
        .errors.len(),
        .errors.first().map(|first| format!(", first: {first}")).unwrap_or_default()
    )]
    Parse { path: String, errors: Vec<ParseError> },

    #[error("'{0}' does not contain a valid tileset")]
    NoValidTileset(String),

    #[error("Failed to import {kind} '{name}': {reason}")]
    AssetImportFailed {
        kind: &'static str,
        name: String,
        reason: String,
    },

    #[error("Unknown resource {0}")]
    UnknownResource(ResourceId),

    #[error("Failed to reimport '{name}': {reason}")]
    ReimportFailed { name: String, reason: String },

    #[error("Failed to delete the asset of '{name}': {source}")]
    DeleteFailed {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Texture(#[from] TextureImportError),
}
