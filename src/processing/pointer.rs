//! Pointer-to-displacement mapping and temporal smoothing.
//!
//! Both halves are pure: input handlers produce a new `target`, the frame
//! step produces a new `current`. Neither touches the other's value.

/// Fraction of the remaining distance covered per frame.
pub const DEFAULT_SMOOTHING: f32 = 0.05;

/// Normalized pointer displacement in `[-1, 1]²`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerVector {
    pub x: f32,
    pub y: f32,
}

impl PointerVector {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn as_array(&self) -> [f32; 2] {
        [self.x, self.y]
    }
}

/// Container bounding rectangle in the same space as pointer client coords.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Size rounded to whole device pixels, at least 1x1.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn pixel_size(&self) -> (u32, u32) {
        let w = self.width.round().max(1.0) as u32;
        let h = self.height.round().max(1.0) as u32;
        (w, h)
    }
}

/// Map client coordinates into `[-1, 1]²` relative to `rect`.
///
/// Returns `None` for a degenerate rectangle.
#[allow(clippy::cast_possible_truncation)]
pub fn normalize(client_x: f64, client_y: f64, rect: Rect) -> Option<PointerVector> {
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return None;
    }
    let nx = ((client_x - rect.left) / rect.width) * 2.0 - 1.0;
    let ny = ((client_y - rect.top) / rect.height) * 2.0 - 1.0;
    Some(PointerVector::new(
        nx.clamp(-1.0, 1.0) as f32,
        ny.clamp(-1.0, 1.0) as f32,
    ))
}

/// Published target for a pointer position: both axes inverted so content
/// pans opposite the pointer.
pub fn pointer_target(client_x: f64, client_y: f64, rect: Rect) -> Option<PointerVector> {
    normalize(client_x, client_y, rect).map(|n| PointerVector::new(-n.x, -n.y))
}

/// One step of the first-order low-pass filter. Not delta-time normalized.
pub fn smooth(current: PointerVector, target: PointerVector, smoothing: f32) -> PointerVector {
    PointerVector::new(
        current.x + (target.x - current.x) * smoothing,
        current.y + (target.y - current.y) * smoothing,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    Idle,
    Tracking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingStateChange {
    pub from: TrackingState,
    pub to: TrackingState,
}

/// Owns the pointer `target`; only input handlers mutate it.
#[derive(Debug, Clone)]
pub struct PointerTracker {
    state: TrackingState,
    target: PointerVector,
}

impl Default for PointerTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PointerTracker {
    pub fn new() -> Self {
        Self {
            state: TrackingState::Idle,
            target: PointerVector::ORIGIN,
        }
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn target(&self) -> PointerVector {
        self.target
    }

    /// `rect` must be the container's live rectangle, queried for this event.
    pub fn on_move(&mut self, client_x: f64, client_y: f64, rect: Rect) -> Option<TrackingStateChange> {
        let target = pointer_target(client_x, client_y, rect)?;
        self.target = target;
        self.goto(TrackingState::Tracking)
    }

    pub fn on_leave(&mut self) -> Option<TrackingStateChange> {
        self.target = PointerVector::ORIGIN;
        self.goto(TrackingState::Idle)
    }

    fn goto(&mut self, to: TrackingState) -> Option<TrackingStateChange> {
        if self.state == to {
            return None;
        }
        let ch = TrackingStateChange {
            from: self.state,
            to,
        };
        self.state = to;
        Some(ch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centre_maps_to_origin() {
        let rect = Rect::new(10.0, 20.0, 200.0, 100.0);
        let n = normalize(110.0, 70.0, rect).unwrap();
        assert_eq!(n, PointerVector::ORIGIN);
    }

    #[test]
    fn degenerate_rect_is_ignored() {
        let mut tracker = PointerTracker::new();
        assert!(tracker.on_move(1.0, 1.0, Rect::new(0.0, 0.0, 0.0, 10.0)).is_none());
        assert_eq!(tracker.state(), TrackingState::Idle);
    }

    #[test]
    fn move_then_leave_cycles_states() {
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        let mut tracker = PointerTracker::new();
        let ch = tracker.on_move(100.0, 50.0, rect).unwrap();
        assert_eq!((ch.from, ch.to), (TrackingState::Idle, TrackingState::Tracking));
        assert_eq!(tracker.target(), PointerVector::new(-1.0, 0.0));

        // further moves stay in Tracking and keep updating the target
        assert!(tracker.on_move(0.0, 50.0, rect).is_none());
        assert_eq!(tracker.target(), PointerVector::new(1.0, 0.0));

        let ch = tracker.on_leave().unwrap();
        assert_eq!((ch.from, ch.to), (TrackingState::Tracking, TrackingState::Idle));
        assert_eq!(tracker.target(), PointerVector::ORIGIN);
    }

    #[test]
    fn positions_outside_rect_are_clamped() {
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        let n = normalize(250.0, -40.0, rect).unwrap();
        assert_eq!(n, PointerVector::new(1.0, -1.0));
    }
}
