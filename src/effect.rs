//! Per-container parallax effect: lifecycle, input, resize and frame step.
//!
//! The instance is written against three host capabilities ([`Container`],
//! [`FrameScheduler`], [`RenderSurface`]) so the whole state machine runs
//! without a graphics context. All calls arrive on one thread; nothing here
//! locks.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::events::{EffectSources, LoadedAssets, PointerEvent};
use crate::processing::layout::{CoverTransform, update_cover};
use crate::processing::pointer::{
    DEFAULT_SMOOTHING, PointerTracker, PointerVector, Rect, TrackingState, smooth,
};
use crate::render::pipeline::QUAD_VERTEX_COUNT;

/// Opaque handle for one scheduled frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Host capability: run the instance's tick before the next repaint.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameHandle;
    /// Must be a no-op for handles that already fired or were cancelled.
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// The GPU-backed child surface hosted by a container.
pub trait RenderSurface {
    fn size(&self) -> (u32, u32);
    fn resize(&mut self, width: u32, height: u32);
    fn upload_cover(&mut self, cover: &CoverTransform) -> Result<()>;
    fn draw(&mut self, command: &DrawCommand) -> Result<()>;
    /// False once the surface can no longer present (lost device, removed).
    fn is_valid(&self) -> bool;
}

/// The element the effect is bound to.
pub trait Container {
    type Surface: RenderSurface;

    /// Live bounding rectangle; re-queried on every use, never cached.
    fn bounding_rect(&self) -> Rect;
    /// Build the pipeline and attach a surface sized to the content box.
    fn create_surface(&mut self, assets: &LoadedAssets) -> Result<Self::Surface>;
    fn remove_surface(&mut self, surface: Self::Surface) -> Result<()>;
    fn set_ready(&mut self, ready: bool);
    fn observe_size(&mut self) -> Result<()>;
    fn unobserve_size(&mut self) -> Result<()>;
}

/// Tunables shared by every instance the factory creates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectParams {
    pub parallax_strength: f32,
    pub smoothing: f32,
}

impl Default for EffectParams {
    fn default() -> Self {
        Self {
            parallax_strength: 0.04,
            smoothing: DEFAULT_SMOOTHING,
        }
    }
}

/// Work for one frame: a single draw of the quad with the smoothed pointer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCommand {
    pub pointer: PointerVector,
    pub vertex_count: u32,
}

/// Pure render step: smooth `current` toward `target` and describe the draw.
pub fn tick(
    current: PointerVector,
    target: PointerVector,
    smoothing: f32,
) -> (PointerVector, DrawCommand) {
    let next = smooth(current, target, smoothing);
    (
        next,
        DrawCommand {
            pointer: next,
            vertex_count: QUAD_VERTEX_COUNT,
        },
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Waiting for both bitmaps.
    Loading,
    /// Pipeline built; frames are being drawn.
    Active,
    /// Load or build failed; the effect is a no-op.
    Failed,
    Disposed,
}

pub struct EffectInstance<C: Container, S: FrameScheduler> {
    label: String,
    sources: EffectSources,
    container: C,
    scheduler: S,
    params: EffectParams,
    lifecycle: Lifecycle,
    surface: Option<C::Surface>,
    image_size: Option<(u32, u32)>,
    cover: CoverTransform,
    cover_upload_enabled: bool,
    pointer: PointerTracker,
    current: PointerVector,
    pending_frame: Option<FrameHandle>,
    observing: bool,
    ready: bool,
    cancel: CancellationToken,
}

impl<C: Container, S: FrameScheduler> EffectInstance<C, S> {
    pub fn new(
        label: impl Into<String>,
        sources: EffectSources,
        container: C,
        scheduler: S,
        params: EffectParams,
    ) -> Self {
        Self {
            label: label.into(),
            sources,
            container,
            scheduler,
            params,
            lifecycle: Lifecycle::Loading,
            surface: None,
            image_size: None,
            cover: CoverTransform::IDENTITY,
            cover_upload_enabled: true,
            pointer: PointerTracker::new(),
            current: PointerVector::ORIGIN,
            pending_frame: None,
            observing: false,
            ready: false,
            cancel: CancellationToken::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn sources(&self) -> &EffectSources {
        &self.sources
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn current(&self) -> PointerVector {
        self.current
    }

    pub fn target(&self) -> PointerVector {
        self.pointer.target()
    }

    pub fn tracking(&self) -> TrackingState {
        self.pointer.state()
    }

    /// Last cover window uploaded to the surface; identity until one lands.
    pub fn cover(&self) -> CoverTransform {
        self.cover
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.pending_frame
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn container(&self) -> &C {
        &self.container
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Token cancelled on disposal; hand it to the asset load.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Completion of the asynchronous load. Builds the pipeline and starts
    /// the frame loop, or degrades to a no-op.
    ///
    /// Results arriving after disposal are dropped.
    pub fn on_assets_loaded(&mut self, loaded: Result<LoadedAssets>) -> Result<()> {
        if self.lifecycle != Lifecycle::Loading {
            debug!(effect = %self.label, state = ?self.lifecycle, "ignoring late asset load");
            return Ok(());
        }
        let assets = match loaded {
            Ok(assets) => assets,
            Err(Error::Cancelled) => {
                debug!(effect = %self.label, "asset load cancelled");
                self.lifecycle = Lifecycle::Failed;
                return Err(Error::Cancelled);
            }
            Err(err) => {
                warn!(effect = %self.label, error = %err, "failed to load depth effect assets");
                self.lifecycle = Lifecycle::Failed;
                return Err(err);
            }
        };

        let surface = match self.container.create_surface(&assets) {
            Ok(surface) => surface,
            Err(err) => {
                warn!(effect = %self.label, error = %err, "failed to build depth effect pipeline");
                self.lifecycle = Lifecycle::Failed;
                return Err(err);
            }
        };
        self.surface = Some(surface);
        self.image_size = Some(assets.image.dimensions());
        self.lifecycle = Lifecycle::Active;
        self.resize();

        match self.container.observe_size() {
            Ok(()) => self.observing = true,
            Err(err) => warn!(effect = %self.label, error = %err, "size observation unavailable"),
        }

        info!(
            effect = %self.label,
            image = ?assets.image.dimensions(),
            depth_map = ?assets.depth_map.dimensions(),
            "depth effect active",
        );
        self.schedule_frame();
        Ok(())
    }

    /// Size-change notification. Idempotent; bursts need no throttling.
    pub fn on_resize(&mut self) {
        if self.lifecycle == Lifecycle::Active {
            self.resize();
        }
    }

    pub fn on_pointer(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Moved { client_x, client_y } => self.on_pointer_move(client_x, client_y),
            PointerEvent::Left => self.on_pointer_leave(),
        }
    }

    pub fn on_pointer_move(&mut self, client_x: f64, client_y: f64) {
        if self.lifecycle == Lifecycle::Disposed {
            return;
        }
        let rect = self.container.bounding_rect();
        if let Some(ch) = self.pointer.on_move(client_x, client_y, rect) {
            debug!(effect = %self.label, from = ?ch.from, to = ?ch.to, "pointer tracking");
        }
    }

    pub fn on_pointer_leave(&mut self) {
        if self.lifecycle == Lifecycle::Disposed {
            return;
        }
        if let Some(ch) = self.pointer.on_leave() {
            debug!(effect = %self.label, from = ?ch.from, to = ?ch.to, "pointer tracking");
        }
    }

    /// Scheduled frame callback. Stale handles and frames that land after
    /// disposal are ignored.
    pub fn on_frame(&mut self, handle: FrameHandle) -> Option<DrawCommand> {
        if self.pending_frame != Some(handle) {
            return None;
        }
        self.pending_frame = None;
        if self.lifecycle != Lifecycle::Active {
            return None;
        }
        let surface = self.surface.as_mut()?;
        if !surface.is_valid() {
            warn!(effect = %self.label, "surface no longer valid; frame loop stopped");
            return None;
        }

        if !self.ready {
            self.container.set_ready(true);
            self.ready = true;
        }

        let (next, command) = tick(self.current, self.pointer.target(), self.params.smoothing);
        self.current = next;
        if let Err(err) = surface.draw(&command) {
            debug!(effect = %self.label, error = %err, "frame skipped");
        }
        self.schedule_frame();
        Some(command)
    }

    /// Release everything the instance holds. Safe to call repeatedly and in
    /// any lifecycle state; never fails.
    pub fn dispose(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.pending_frame.take() {
            self.scheduler.cancel_frame(handle);
        }
        if self.observing {
            self.observing = false;
            if let Err(err) = self.container.unobserve_size() {
                warn!(effect = %self.label, error = %err, "failed to stop size observation");
            }
        }
        if let Some(surface) = self.surface.take() {
            if let Err(err) = self.container.remove_surface(surface) {
                warn!(effect = %self.label, error = %err, "failed to remove surface");
            }
        }
        if self.ready {
            self.ready = false;
            self.container.set_ready(false);
        }
        if self.lifecycle != Lifecycle::Disposed {
            debug!(effect = %self.label, "depth effect disposed");
        }
        self.lifecycle = Lifecycle::Disposed;
    }

    fn schedule_frame(&mut self) {
        if self.pending_frame.is_none() {
            self.pending_frame = Some(self.scheduler.request_frame());
        }
    }

    fn resize(&mut self) {
        let rect = self.container.bounding_rect();
        let (width, height) = rect.pixel_size();
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        surface.resize(width, height);

        let Some((image_w, image_h)) = self.image_size else {
            return;
        };
        let Some(cover) = update_cover(width, height, image_w, image_h) else {
            return;
        };
        if !self.cover_upload_enabled {
            return;
        }
        // `self.cover` tracks what the GPU holds, not what was computed
        match surface.upload_cover(&cover) {
            Ok(()) => {
                self.cover = cover;
                debug!(effect = %self.label, width, height, ?cover, "cover transform updated");
            }
            Err(err) => {
                warn!(effect = %self.label, error = %err, "cover upload skipped");
                self.cover_upload_enabled = false;
            }
        }
    }
}

impl<C: Container, S: FrameScheduler> Drop for EffectInstance<C, S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Explicit factory: one instance per `(label, sources, container, scheduler)`.
pub fn bind_effects<C, S, I>(entries: I, params: EffectParams) -> Vec<EffectInstance<C, S>>
where
    C: Container,
    S: FrameScheduler,
    I: IntoIterator<Item = (String, EffectSources, C, S)>,
{
    entries
        .into_iter()
        .map(|(label, sources, container, scheduler)| {
            EffectInstance::new(label, sources, container, scheduler, params)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_moves_five_percent_of_the_gap() {
        let (next, cmd) = tick(PointerVector::ORIGIN, PointerVector::new(1.0, -1.0), 0.05);
        assert!((next.x - 0.05).abs() < 1e-6);
        assert!((next.y + 0.05).abs() < 1e-6);
        assert_eq!(cmd.pointer, next);
        assert_eq!(cmd.vertex_count, 6);
    }

    #[test]
    fn tick_at_target_is_stable() {
        let at = PointerVector::new(0.3, 0.7);
        let (next, _) = tick(at, at, 0.05);
        assert_eq!(next, at);
    }
}
