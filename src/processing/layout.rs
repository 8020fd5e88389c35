/// Texture-space window that emulates aspect-preserving "cover" display.
///
/// The quad always fills the surface; only the sampling window into the
/// source textures shrinks and recenters. `cover_uv = uv * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverTransform {
    pub scale_x: f32,
    pub scale_y: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl CoverTransform {
    pub const IDENTITY: Self = Self {
        scale_x: 1.0,
        scale_y: 1.0,
        offset_x: 0.0,
        offset_y: 0.0,
    };

    pub fn scale(&self) -> [f32; 2] {
        [self.scale_x, self.scale_y]
    }

    pub fn offset(&self) -> [f32; 2] {
        [self.offset_x, self.offset_y]
    }
}

impl Default for CoverTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Compute the cover transform for a surface showing an image.
///
/// Returns `None` when any dimension is zero; callers skip the update until
/// the intrinsic image size is known.
#[allow(clippy::cast_precision_loss)]
pub fn update_cover(
    surface_w: u32,
    surface_h: u32,
    image_w: u32,
    image_h: u32,
) -> Option<CoverTransform> {
    if surface_w == 0 || surface_h == 0 || image_w == 0 || image_h == 0 {
        return None;
    }
    let canvas_ratio = surface_w as f32 / surface_h as f32;
    let image_ratio = image_w as f32 / image_h as f32;

    let mut cover = CoverTransform::IDENTITY;
    if canvas_ratio > image_ratio {
        // surface is relatively wider: crop top/bottom
        cover.scale_y = image_ratio / canvas_ratio;
        cover.offset_y = (1.0 - cover.scale_y) / 2.0;
    } else {
        // surface is relatively taller (or equal): crop left/right
        cover.scale_x = canvas_ratio / image_ratio;
        cover.offset_x = (1.0 - cover.scale_x) / 2.0;
    }
    Some(cover)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_dimension_is_skipped() {
        assert!(update_cover(0, 400, 100, 100).is_none());
        assert!(update_cover(800, 400, 100, 0).is_none());
    }

    #[test]
    fn equal_ratios_are_identity() {
        let cover = update_cover(1920, 1080, 3840, 2160).unwrap();
        assert_eq!(cover, CoverTransform::IDENTITY);
    }

    #[test]
    fn tall_surface_crops_sides() {
        // 400x800 surface, square image: canvas ratio 0.5
        let cover = update_cover(400, 800, 1000, 1000).unwrap();
        assert!((cover.scale_x - 0.5).abs() < 1e-6);
        assert!((cover.offset_x - 0.25).abs() < 1e-6);
        assert_eq!(cover.scale_y, 1.0);
        assert_eq!(cover.offset_y, 0.0);
    }
}
