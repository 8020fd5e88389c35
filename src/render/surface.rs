use std::sync::Arc;

use tracing::{info, warn};
use wgpu::SurfaceError;
use winit::window::Window;

use crate::effect::{DrawCommand, RenderSurface};
use crate::error::{Error, Result};
use crate::events::LoadedAssets;
use crate::processing::layout::CoverTransform;
use crate::render::pipeline::ParallaxPipeline;
use crate::render::reflect::CompiledShader;

/// A configured wgpu surface on a window plus the effect's pipeline.
pub struct GpuSurface {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pipeline: ParallaxPipeline,
    valid: bool,
}

impl GpuSurface {
    pub fn create(
        window: Arc<Window>,
        shader: &CompiledShader,
        assets: &LoadedAssets,
        strength: f32,
    ) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let size = window.inner_size();
        let surface = instance
            .create_surface(window)
            .map_err(|err| Error::Surface(format!("failed to create surface: {err}")))?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|err| Error::Surface(format!("failed to acquire GPU adapter: {err}")))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|fmt| fmt.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| Error::Surface("surface reports no formats".into()))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("parallax-device"),
            required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
            ..Default::default()
        }))
        .map_err(|err| Error::Surface(format!("failed to acquire GPU device: {err}")))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        info!(
            width = config.width,
            height = config.height,
            format = ?config.format,
            "parallax surface configured",
        );

        let pipeline = ParallaxPipeline::build(&device, &queue, format, shader, assets, strength)?;

        Ok(Self {
            surface,
            device,
            queue,
            config,
            pipeline,
            valid: true,
        })
    }

    fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }
}

impl RenderSurface for GpuSurface {
    fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if (width, height) == self.size() {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.reconfigure();
        tracing::debug!(width, height, "parallax surface resized");
    }

    fn upload_cover(&mut self, cover: &CoverTransform) -> Result<()> {
        self.pipeline.write_cover(&self.queue, cover)
    }

    fn draw(&mut self, command: &DrawCommand) -> Result<()> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(SurfaceError::Outdated) | Err(SurfaceError::Lost) => {
                info!("parallax surface lost; reconfiguring");
                self.reconfigure();
                return Err(Error::Surface("surface lost".into()));
            }
            Err(SurfaceError::OutOfMemory) => {
                warn!("parallax surface out of memory; stopping");
                self.valid = false;
                return Err(Error::Surface("out of memory".into()));
            }
            Err(SurfaceError::Timeout) => {
                return Err(Error::Surface("frame acquisition timed out".into()));
            }
            Err(SurfaceError::Other) => {
                self.reconfigure();
                return Err(Error::Surface("unknown surface error".into()));
            }
        };

        self.pipeline.write_pointer(&self.queue, command.pointer);

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("parallax-encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("parallax-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            self.pipeline.record(&mut rpass, command.vertex_count);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn is_valid(&self) -> bool {
        self.valid
    }
}
