use serde::{Deserialize, Serialize};

/// Playback rate of generated flipbooks.
pub const FLIPBOOK_FRAMES_PER_SECOND: f32 = 15.0;

/// One key frame: a sprite shown for `frame_run` frames.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlipbookKeyFrame {
    /// Asset path of the [`SpriteAsset`](super::SpriteAsset).
    pub sprite: String,
    pub frame_run: u32,
}

/// An animated tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlipbookAsset {
    pub frames_per_second: f32,
    pub key_frames: Vec<FlipbookKeyFrame>,
}

impl Default for FlipbookAsset {
    fn default() -> Self {
        Self {
            frames_per_second: FLIPBOOK_FRAMES_PER_SECOND,
            key_frames: Vec::new(),
        }
    }
}

impl FlipbookAsset {
    /// Frames a Tiled frame duration covers at [`FLIPBOOK_FRAMES_PER_SECOND`].
    pub fn frame_run(duration_ms: u32) -> u32 {
        (duration_ms as f32 * FLIPBOOK_FRAMES_PER_SECOND / 1000.0) as u32
    }

    /// Total length in frames.
    pub fn frame_count(&self) -> u32 {
        self.key_frames.iter().map(|frame| frame.frame_run).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_run() {
        assert_eq!(FlipbookAsset::frame_run(200), 3);
        assert_eq!(FlipbookAsset::frame_run(1000), 15);
        assert_eq!(FlipbookAsset::frame_run(50), 0);
    }
}
