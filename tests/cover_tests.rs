use depth_parallax::processing::layout::{CoverTransform, update_cover};

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
}

#[test]
fn wide_surface_square_image_crops_top_and_bottom() {
    let cover = update_cover(800, 400, 1600, 1600).unwrap();
    assert!(approx(cover.scale_x, 1.0));
    assert!(approx(cover.offset_x, 0.0));
    assert!(approx(cover.scale_y, 0.5));
    assert!(approx(cover.offset_y, 0.25));
}

#[test]
fn zero_image_dimensions_skip_the_update() {
    assert!(update_cover(800, 400, 0, 600).is_none());
    assert!(update_cover(800, 400, 600, 0).is_none());
    assert!(update_cover(0, 400, 600, 600).is_none());
}

#[test]
fn cover_window_stays_inside_the_texture() {
    let sizes = [1u32, 3, 64, 480, 801, 1920, 4096];
    for &sw in &sizes {
        for &sh in &sizes {
            for &(iw, ih) in &[(1u32, 1u32), (4000, 3000), (3000, 4000), (1920, 1080), (7, 1)] {
                let c = update_cover(sw, sh, iw, ih).unwrap();
                // at most one axis is cropped
                assert!(approx(c.scale_x, 1.0) || approx(c.scale_y, 1.0), "{sw}x{sh} {iw}x{ih}: {c:?}");
                for (scale, offset) in [(c.scale_x, c.offset_x), (c.scale_y, c.offset_y)] {
                    assert!(scale > 0.0 && scale <= 1.0 + 1e-6);
                    assert!(offset >= -1e-6);
                    // centred: equal margins on both sides
                    assert!(approx(offset * 2.0 + scale, 1.0));
                }
            }
        }
    }
}

#[test]
fn visible_window_matches_surface_aspect() {
    let (sw, sh, iw, ih) = (1280u32, 720u32, 1000u32, 1000u32);
    let c = update_cover(sw, sh, iw, ih).unwrap();
    let visible_w = c.scale_x * iw as f32;
    let visible_h = c.scale_y * ih as f32;
    assert!(approx(visible_w / visible_h, sw as f32 / sh as f32));
}

#[test]
fn repeated_updates_are_stable() {
    let first = update_cover(1024, 768, 640, 480).unwrap();
    assert_eq!(first, CoverTransform::IDENTITY);
    for _ in 0..5 {
        assert_eq!(update_cover(1024, 768, 640, 480).unwrap(), first);
    }
}
