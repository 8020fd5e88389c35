use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    keyboard::{Key, NamedKey},
    window::{Fullscreen, Window, WindowAttributes, WindowId},
};

use crate::config::WindowOptions;
use crate::effect::{Container, EffectInstance, EffectParams, FrameHandle, FrameScheduler, bind_effects};
use crate::error;
use crate::events::{EffectBinding, LoadedAssets};
use crate::processing::pointer::Rect;
use crate::render::reflect::CompiledShader;
use crate::render::surface::GpuSurface;
use crate::tasks::loader;

const LOADING_SUFFIX: &str = " (loading)";

#[derive(Debug)]
enum HostEvent {
    AssetsLoaded {
        window_id: WindowId,
        result: error::Result<LoadedAssets>,
    },
    Cancelled,
}

/// A top-level window acting as the effect's container. The client area is
/// the content box; readiness shows up in the title.
struct WindowContainer {
    window: Arc<Window>,
    title: String,
    shader: Rc<CompiledShader>,
    strength: f32,
}

impl Container for WindowContainer {
    type Surface = GpuSurface;

    fn bounding_rect(&self) -> Rect {
        let size = self.window.inner_size();
        Rect::new(0.0, 0.0, f64::from(size.width), f64::from(size.height))
    }

    fn create_surface(&mut self, assets: &LoadedAssets) -> error::Result<GpuSurface> {
        GpuSurface::create(self.window.clone(), &self.shader, assets, self.strength)
    }

    fn remove_surface(&mut self, surface: GpuSurface) -> error::Result<()> {
        drop(surface);
        Ok(())
    }

    fn set_ready(&mut self, ready: bool) {
        if ready {
            self.window.set_title(&self.title);
        } else {
            self.window.set_title(&format!("{}{LOADING_SUFFIX}", self.title));
        }
    }

    // Resized reaches every window; the host forwards it only while the instance observes
    fn observe_size(&mut self) -> error::Result<()> {
        Ok(())
    }

    fn unobserve_size(&mut self) -> error::Result<()> {
        Ok(())
    }
}

/// One pending redraw per window; the handle is matched when
/// `RedrawRequested` arrives.
struct RedrawScheduler {
    window: Arc<Window>,
    next_id: u64,
    pending: Rc<Cell<Option<FrameHandle>>>,
}

impl FrameScheduler for RedrawScheduler {
    fn request_frame(&mut self) -> FrameHandle {
        self.next_id += 1;
        let handle = FrameHandle(self.next_id);
        self.pending.set(Some(handle));
        self.window.request_redraw();
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending.get() == Some(handle) {
            self.pending.set(None);
        }
    }
}

struct EffectSlot {
    effect: EffectInstance<WindowContainer, RedrawScheduler>,
    pending: Rc<Cell<Option<FrameHandle>>>,
}

struct ParallaxApp {
    bindings: Vec<EffectBinding>,
    params: EffectParams,
    window_opts: WindowOptions,
    shader: Rc<CompiledShader>,
    proxy: EventLoopProxy<HostEvent>,
    slots: HashMap<WindowId, EffectSlot>,
    started: bool,
}

impl ParallaxApp {
    fn new(
        bindings: Vec<EffectBinding>,
        params: EffectParams,
        window_opts: WindowOptions,
        shader: CompiledShader,
        proxy: EventLoopProxy<HostEvent>,
    ) -> Self {
        Self {
            bindings,
            params,
            window_opts,
            shader: Rc::new(shader),
            proxy,
            slots: HashMap::new(),
            started: false,
        }
    }

    fn create_window(&self, event_loop: &ActiveEventLoop, title: &str) -> Option<Arc<Window>> {
        let mut attrs = WindowAttributes::default()
            .with_title(format!("{title}{LOADING_SUFFIX}"))
            .with_inner_size(LogicalSize::new(
                self.window_opts.width,
                self.window_opts.height,
            ));
        if self.window_opts.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        match event_loop.create_window(attrs) {
            Ok(window) => Some(Arc::new(window)),
            Err(err) => {
                error!(error = %err, title, "failed to create effect window");
                None
            }
        }
    }

    fn bind_all(&mut self, event_loop: &ActiveEventLoop) {
        let mut entries = Vec::with_capacity(self.bindings.len());
        let mut shared = Vec::with_capacity(self.bindings.len());
        for binding in std::mem::take(&mut self.bindings) {
            let Some(window) = self.create_window(event_loop, &binding.title) else {
                continue;
            };
            let pending = Rc::new(Cell::new(None));
            let container = WindowContainer {
                window: window.clone(),
                title: binding.title.clone(),
                shader: self.shader.clone(),
                strength: self.params.parallax_strength,
            };
            let scheduler = RedrawScheduler {
                window: window.clone(),
                next_id: 0,
                pending: pending.clone(),
            };
            shared.push((window.id(), pending));
            entries.push((binding.title, binding.sources, container, scheduler));
        }

        let effects = bind_effects(entries, self.params);
        for (effect, (window_id, pending)) in effects.into_iter().zip(shared) {
            self.spawn_load(window_id, &effect);
            self.slots.insert(window_id, EffectSlot { effect, pending });
        }
        info!(count = self.slots.len(), "depth effects bound");
    }

    fn spawn_load(
        &self,
        window_id: WindowId,
        effect: &EffectInstance<WindowContainer, RedrawScheduler>,
    ) {
        let sources = effect.sources().clone();
        let cancel = effect.cancel_token();
        let proxy = self.proxy.clone();
        tokio::spawn(async move {
            let result = loader::load_cancellable(&sources, cancel).await;
            if proxy
                .send_event(HostEvent::AssetsLoaded { window_id, result })
                .is_err()
            {
                debug!("event loop gone; dropping asset load result");
            }
        });
    }

    fn close(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId) {
        if let Some(mut slot) = self.slots.remove(&window_id) {
            slot.effect.dispose();
        }
        if self.slots.is_empty() {
            info!("no effect windows remain; exiting");
            event_loop.exit();
        }
    }

    fn dispose_all(&mut self) {
        for (_, mut slot) in self.slots.drain() {
            slot.effect.dispose();
        }
    }
}

impl ApplicationHandler<HostEvent> for ParallaxApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.started {
            return;
        }
        self.started = true;
        self.bind_all(event_loop);
        if self.slots.is_empty() {
            error!("no effect windows could be created");
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(slot) = self.slots.get_mut(&window_id) else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                info!(effect = %slot.effect.label(), "effect window close requested");
                self.close(event_loop, window_id);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                info!("escape pressed; closing all effect windows");
                self.dispose_all();
                event_loop.exit();
            }
            WindowEvent::CursorMoved { position, .. } => {
                slot.effect.on_pointer_move(position.x, position.y);
            }
            WindowEvent::CursorLeft { .. } => slot.effect.on_pointer_leave(),
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                if slot.effect.is_observing() {
                    slot.effect.on_resize();
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(handle) = slot.pending.take() {
                    slot.effect.on_frame(handle);
                }
            }
            _ => {}
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: HostEvent) {
        match event {
            HostEvent::AssetsLoaded { window_id, result } => {
                let Some(slot) = self.slots.get_mut(&window_id) else {
                    debug!("asset load finished for a closed window");
                    return;
                };
                if slot.effect.on_assets_loaded(result).is_err() {
                    debug!(effect = %slot.effect.label(), "closing window of failed effect");
                    self.close(event_loop, window_id);
                }
            }
            HostEvent::Cancelled => {
                info!("host received cancellation");
                self.dispose_all();
                event_loop.exit();
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.dispose_all();
    }
}

/// Open one window per binding and run the parallax loop until every window
/// is closed or `cancel` fires. Must be called on the main thread from within
/// a tokio runtime.
pub fn run_windowed(
    bindings: Vec<EffectBinding>,
    params: EffectParams,
    window_opts: WindowOptions,
    cancel: CancellationToken,
) -> Result<()> {
    let shader = CompiledShader::parallax().context("failed to prepare parallax shader")?;

    let event_loop = EventLoop::<HostEvent>::with_user_event()
        .build()
        .context("failed to build parallax event loop")?;
    let proxy = event_loop.create_proxy();

    let cancel_task = {
        let proxy = proxy.clone();
        tokio::spawn(async move {
            cancel.cancelled().await;
            let _ = proxy.send_event(HostEvent::Cancelled);
        })
    };

    let mut app = ParallaxApp::new(bindings, params, window_opts, shader, proxy);
    let run_result = event_loop.run_app(&mut app);
    cancel_task.abort();

    run_result.context("parallax event loop failed")
}
