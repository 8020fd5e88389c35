use std::path::PathBuf;

/// Source references for one effect: the base image and its depth map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectSources {
    pub image: PathBuf,
    pub depth_map: PathBuf,
}

/// A decoded RGBA8 bitmap ready for GPU upload.
#[derive(Debug, Clone)]
pub struct PreparedImageCpu {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl PreparedImageCpu {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Both bitmaps of an effect; only ever produced when both decoded.
#[derive(Debug, Clone)]
pub struct LoadedAssets {
    pub image: PreparedImageCpu,
    pub depth_map: PreparedImageCpu,
}

/// Host-side pointer notification in client (window-relative) coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Moved { client_x: f64, client_y: f64 },
    Left,
}

/// One effect as handed to the host by the factory: a title and its sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectBinding {
    pub title: String,
    pub sources: EffectSources,
}
