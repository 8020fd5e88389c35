use depth_parallax::effect::tick;
use depth_parallax::processing::pointer::{
    PointerTracker, PointerVector, Rect, TrackingState, pointer_target,
};

#[test]
fn top_left_corner_targets_positive_quadrant() {
    let rect = Rect::new(0.0, 0.0, 200.0, 100.0);
    let target = pointer_target(0.0, 0.0, rect).unwrap();
    assert_eq!(target, PointerVector::new(1.0, 1.0));
}

#[test]
fn offset_rect_is_respected() {
    let rect = Rect::new(50.0, 30.0, 200.0, 100.0);
    assert_eq!(pointer_target(250.0, 130.0, rect).unwrap(), PointerVector::new(-1.0, -1.0));
    assert_eq!(pointer_target(150.0, 80.0, rect).unwrap(), PointerVector::ORIGIN);
}

#[test]
fn smoothing_converges_geometrically() {
    let target = PointerVector::new(1.0, 0.0);
    let mut current = PointerVector::ORIGIN;
    for n in 1..=60 {
        let (next, cmd) = tick(current, target, 0.05);
        current = next;
        assert_eq!(cmd.pointer, current);
        let expected = 1.0 - 0.95f32.powi(n);
        assert!((current.x - expected).abs() < 1e-4, "frame {n}: {} vs {expected}", current.x);
    }
    assert!((current.x - 0.954).abs() < 1e-3);
    assert_eq!(current.y, 0.0);
}

#[test]
fn leave_returns_target_to_centre() {
    let rect = Rect::new(0.0, 0.0, 200.0, 100.0);
    let mut tracker = PointerTracker::new();
    tracker.on_move(10.0, 90.0, rect);
    assert_eq!(tracker.state(), TrackingState::Tracking);
    assert_ne!(tracker.target(), PointerVector::ORIGIN);

    tracker.on_leave();
    assert_eq!(tracker.state(), TrackingState::Idle);
    assert_eq!(tracker.target(), PointerVector::ORIGIN);

    // leaving again is a no-op
    assert!(tracker.on_leave().is_none());
}

#[test]
fn pixel_size_rounds_and_never_hits_zero() {
    assert_eq!(Rect::new(0.0, 0.0, 799.6, 400.4).pixel_size(), (800, 400));
    assert_eq!(Rect::new(0.0, 0.0, 0.0, 0.2).pixel_size(), (1, 1));
}
