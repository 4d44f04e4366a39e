use bevy_tiledimport_assets::json::ParseReport;
use bevy_tiledimport_assets::tile_info::TiledTileInfo;

use super::parse_failed;
use crate::assets::{FLIPBOOK_FRAMES_PER_SECOND, FlipbookAsset, FlipbookKeyFrame, SpriteAsset, TileSetAsset};
use crate::error::ImportError;
use crate::manager::ResourceManager;
use crate::resource::{ResourceId, ResourceKind};

impl ResourceManager {
    /// Import the frame sprites of an animated tile and build its key frames.
    pub(crate) fn import_flipbook(&mut self, id: ResourceId) -> Result<(), ImportError> {
        let document = self.resource_document(id)?;
        let resource = self.resource(id)?;
        let (name, source_path, asset_path) = (
            resource.name.clone(),
            resource.source_path.clone(),
            resource.asset_path.clone(),
        );
        let tile_set_name = self
            .flipbook_tile_set(id)
            .and_then(|tile_set| self.instances.get(&tile_set))
            .map(|tile_set| tile_set.name.clone())
            .unwrap_or_default();

        let mut report = ParseReport::new();
        let tile_index = name.parse().unwrap_or_default();
        let context = format!("{source_path} tile {name}");
        let info = TiledTileInfo::from_json(&document, tile_index, &context, &mut report);
        if !report.is_success() {
            return Err(parse_failed(&source_path, &report));
        }

        for sprite in self.dependencies_of_kind(id, ResourceKind::Sprite) {
            let sprite_name = self.resource(sprite)?.name.clone();
            let target = self.dependency_asset_path(id, "Sprites", &format!("S_{tile_set_name}_{sprite_name}"))?;
            self.import_dependency(sprite, target)?;
        }

        let sprites = self.dependencies_of_kind(id, ResourceKind::Sprite);
        let sprite_asset = |tile_id: u32| {
            let tile_name = tile_id.to_string();
            sprites
                .iter()
                .filter_map(|sprite| self.instances.get(sprite))
                .find(|sprite| sprite.name == tile_name)
                .map(|sprite| sprite.asset_path.clone())
        };
        let mut key_frames = Vec::with_capacity(info.animation.len());
        for frame in &info.animation {
            let Some(sprite) = sprite_asset(frame.tile_id) else {
                return Err(ImportError::AssetImportFailed {
                    kind: ResourceKind::Flipbook.as_str(),
                    name,
                    reason: format!("no sprite for frame tile {}", frame.tile_id),
                });
            };
            key_frames.push(FlipbookKeyFrame {
                sprite,
                frame_run: FlipbookAsset::frame_run(frame.duration),
            });
        }

        let mut flipbook: FlipbookAsset = self.store.create_or_reuse(&asset_path);
        flipbook.frames_per_second = FLIPBOOK_FRAMES_PER_SECOND;
        flipbook.key_frames = key_frames;
        self.store.save_as(&asset_path, flipbook)?;
        Ok(())
    }

    /// Cut a tile out of the tile sheet.
    ///
    /// The rectangle comes from the saved asset of the tile set whose flipbook
    /// uses this sprite.
    pub(crate) fn import_sprite(&mut self, id: ResourceId) -> Result<(), ImportError> {
        let resource = self.resource(id)?;
        let (name, asset_path) = (resource.name.clone(), resource.asset_path.clone());
        let failed = |reason: &str| ImportError::AssetImportFailed {
            kind: ResourceKind::Sprite.as_str(),
            name: name.clone(),
            reason: reason.to_owned(),
        };

        let tile_id: u32 = name.parse().map_err(|_| failed("the name is not a tile id"))?;
        let texture = self
            .dependencies_of_kind(id, ResourceKind::Texture)
            .first()
            .and_then(|texture| self.instances.get(texture))
            .map(|texture| texture.asset_path.clone())
            .filter(|asset_path| !asset_path.is_empty());

        let rect = self
            .users_of_kind(id, ResourceKind::Flipbook)
            .into_iter()
            .filter_map(|flipbook| self.flipbook_tile_set(flipbook))
            .filter_map(|tile_set| {
                let tile_set_asset = &self.instances.get(&tile_set)?.asset_path;
                self.store.load_as::<TileSetAsset>(tile_set_asset).ok()?
            })
            .find_map(|tile_set| tile_set.tile_rect(tile_id));
        let Some((source_min, source_size)) = rect else {
            return Err(failed("the tile is outside the tile sheet"));
        };

        let mut sprite: SpriteAsset = self.store.create_or_reuse(&asset_path);
        sprite.texture = texture;
        sprite.source_min = source_min;
        sprite.source_size = source_size;
        self.store.save_as(&asset_path, sprite)?;
        Ok(())
    }
}
