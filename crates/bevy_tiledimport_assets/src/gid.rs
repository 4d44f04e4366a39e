//! Global tile ID encoding.
//!
//! A layer cell stores one `u32` GID. The top three bits are flip flags, the rest
//! is the tile index offset by the owning tileset's `firstgid`. `0` is an empty cell.

use serde::{Deserialize, Serialize};

pub const FLIPPED_HORIZONTALLY: u32 = 0x8000_0000;
pub const FLIPPED_VERTICALLY: u32 = 0x4000_0000;
pub const FLIPPED_DIAGONALLY: u32 = 0x2000_0000;
const FLAG_MASK: u32 = FLIPPED_HORIZONTALLY | FLIPPED_VERTICALLY | FLIPPED_DIAGONALLY;

/// Flip and rotation bits of a GID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct TileFlags {
    pub horizontal: bool,
    pub vertical: bool,
    /// Swap of x and y axes, combined with the other two to express rotations.
    pub diagonal: bool,
}

impl TileFlags {
    pub fn from_gid(gid: u32) -> Self {
        Self {
            horizontal: gid & FLIPPED_HORIZONTALLY != 0,
            vertical: gid & FLIPPED_VERTICALLY != 0,
            diagonal: gid & FLIPPED_DIAGONALLY != 0,
        }
    }

    pub fn bits(self) -> u32 {
        let mut bits = 0;
        if self.horizontal {
            bits |= FLIPPED_HORIZONTALLY;
        }
        if self.vertical {
            bits |= FLIPPED_VERTICALLY;
        }
        if self.diagonal {
            bits |= FLIPPED_DIAGONALLY;
        }
        bits
    }
}

/// GID with the flag bits cleared.
pub fn strip_flags(gid: u32) -> u32 {
    gid & !FLAG_MASK
}

/// Pack flags and a tileset-relative index. Add the tileset's `firstgid` to get
/// the value stored in a layer.
pub fn encode_gid(flags: TileFlags, local_index: u32) -> u32 {
    flags.bits() | strip_flags(local_index)
}

/// A GID resolved against a map's tilesets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTile<'a, H> {
    pub tile_set: &'a H,
    pub first_gid: u32,
    pub local_index: u32,
    pub flags: TileFlags,
}

/// Resolve a raw GID against `(first_gid, tileset)` pairs.
///
/// The owning tileset is the one with the highest `first_gid` not above the
/// unflagged GID. Returns `None` for empty cells, for GIDs below every tileset and
/// for GIDs owned by a tileset whose import failed (`None` handle).
///
/// # Example
///
/// ```rust
/// use bevy_tiledimport_assets::gid::resolve_gid;
///
/// let tile_sets = [(1, Some("terrain")), (50, Some("props")), (100, Some("items"))];
/// let resolved = resolve_gid(75, tile_sets.iter().map(|(gid, set)| (*gid, set.as_ref()))).unwrap();
/// assert_eq!(*resolved.tile_set, "props");
/// assert_eq!(resolved.local_index, 25);
/// ```
pub fn resolve_gid<'a, H: 'a>(
    gid: u32,
    tile_sets: impl IntoIterator<Item = (u32, Option<&'a H>)>,
) -> Option<ResolvedTile<'a, H>> {
    let index = strip_flags(gid);
    if index == 0 {
        return None;
    }

    let (first_gid, tile_set) = tile_sets
        .into_iter()
        .filter(|(first_gid, _)| *first_gid <= index)
        .max_by_key(|(first_gid, _)| *first_gid)?;

    Some(ResolvedTile {
        tile_set: tile_set?,
        first_gid,
        local_index: index - first_gid,
        flags: TileFlags::from_gid(gid),
    })
}
