use tracing::debug;
use wgpu::util::DeviceExt;

use crate::error::{Error, Result};
use crate::events::{LoadedAssets, PreparedImageCpu};
use crate::processing::layout::CoverTransform;
use crate::processing::pointer::PointerVector;
use crate::render::reflect::{CompiledShader, FRAGMENT_ENTRY, ShaderBindings, VERTEX_ENTRY};

/// Vertices in the unit quad: two triangles covering clip space.
pub const QUAD_VERTEX_COUNT: u32 = 6;

const QUAD_POSITIONS: [[f32; 2]; 6] = [
    [-1.0, -1.0],
    [1.0, -1.0],
    [-1.0, 1.0],
    [-1.0, 1.0],
    [1.0, -1.0],
    [1.0, 1.0],
];

// row 0 of the bitmaps is the top, so v grows downward
const QUAD_TEX_COORDS: [[f32; 2]; 6] = [
    [0.0, 1.0],
    [1.0, 1.0],
    [0.0, 0.0],
    [0.0, 0.0],
    [1.0, 1.0],
    [1.0, 0.0],
];

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointerUniform {
    pub pointer: [f32; 2],
    pub strength: f32,
    pub _pad: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CoverUniform {
    pub scale: [f32; 2],
    pub offset: [f32; 2],
}

impl From<&CoverTransform> for CoverUniform {
    fn from(cover: &CoverTransform) -> Self {
        Self {
            scale: cover.scale(),
            offset: cover.offset(),
        }
    }
}

/// GPU-resident program, geometry, textures and uniforms for one effect.
///
/// Built once per instance; everything the render step touches is cached.
pub struct ParallaxPipeline {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    positions: wgpu::Buffer,
    tex_coords: wgpu::Buffer,
    pointer_buf: wgpu::Buffer,
    cover_buf: Option<wgpu::Buffer>,
    _image: wgpu::Texture,
    _depth_map: wgpu::Texture,
    strength: f32,
}

impl ParallaxPipeline {
    pub fn build(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        shader: &CompiledShader,
        assets: &LoadedAssets,
        strength: f32,
    ) -> Result<Self> {
        let bindings = *shader.bindings();

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("parallax-shader"),
            source: wgpu::ShaderSource::Wgsl(shader.source().to_owned().into()),
        });

        let positions = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("parallax-positions"),
            contents: bytemuck::cast_slice(&QUAD_POSITIONS),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let tex_coords = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("parallax-tex-coords"),
            contents: bytemuck::cast_slice(&QUAD_TEX_COORDS),
            usage: wgpu::BufferUsages::VERTEX,
        });

        // the photo is colour data; the depth map is linear and read raw
        let image = upload_texture(
            device,
            queue,
            &assets.image,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            "parallax-image",
        )?;
        let depth_map = upload_texture(
            device,
            queue,
            &assets.depth_map,
            wgpu::TextureFormat::Rgba8Unorm,
            "parallax-depth-map",
        )?;
        let image_view = image.create_view(&wgpu::TextureViewDescriptor::default());
        let depth_view = depth_map.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("parallax-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let pointer_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("parallax-pointer"),
            contents: bytemuck::bytes_of(&PointerUniform {
                pointer: [0.0, 0.0],
                strength,
                _pad: 0.0,
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let cover_buf = bindings.cover.map(|_| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("parallax-cover"),
                contents: bytemuck::bytes_of(&CoverUniform::from(&CoverTransform::IDENTITY)),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
        });

        let layout_entries = layout_entries(&bindings);
        let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("parallax-bind-layout"),
            entries: &layout_entries,
        });

        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: bindings.image,
                resource: wgpu::BindingResource::TextureView(&image_view),
            },
            wgpu::BindGroupEntry {
                binding: bindings.depth_map,
                resource: wgpu::BindingResource::TextureView(&depth_view),
            },
            wgpu::BindGroupEntry {
                binding: bindings.sampler,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
            wgpu::BindGroupEntry {
                binding: bindings.pointer,
                resource: pointer_buf.as_entire_binding(),
            },
        ];
        if let (Some(slot), Some(buf)) = (bindings.cover, cover_buf.as_ref()) {
            entries.push(wgpu::BindGroupEntry {
                binding: slot,
                resource: buf.as_entire_binding(),
            });
        }
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("parallax-bind-group"),
            layout: &bind_layout,
            entries: &entries,
        });

        let position_attr = [wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x2,
            offset: 0,
            shader_location: bindings.position_location,
        }];
        let tex_coord_attr = [wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x2,
            offset: 0,
            shader_location: bindings.tex_coord_location,
        }];
        let stride = std::mem::size_of::<[f32; 2]>() as u64;
        let vertex_layouts = [
            wgpu::VertexBufferLayout {
                array_stride: stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &position_attr,
            },
            wgpu::VertexBufferLayout {
                array_stride: stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &tex_coord_attr,
            },
        ];

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("parallax-pipeline-layout"),
            bind_group_layouts: &[&bind_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("parallax-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some(VERTEX_ENTRY),
                buffers: &vertex_layouts,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some(FRAGMENT_ENTRY),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        debug!(
            image = ?assets.image.dimensions(),
            depth_map = ?assets.depth_map.dimensions(),
            cover_uniform = bindings.cover.is_some(),
            "parallax pipeline built",
        );

        Ok(Self {
            pipeline,
            bind_group,
            positions,
            tex_coords,
            pointer_buf,
            cover_buf,
            _image: image,
            _depth_map: depth_map,
            strength,
        })
    }

    /// Upload the cover window; fails when the program has no cover uniform.
    pub fn write_cover(&self, queue: &wgpu::Queue, cover: &CoverTransform) -> Result<()> {
        let buf = self
            .cover_buf
            .as_ref()
            .ok_or(Error::BindingLookup(crate::render::reflect::COVER_UNIFORM))?;
        queue.write_buffer(buf, 0, bytemuck::bytes_of(&CoverUniform::from(cover)));
        Ok(())
    }

    pub fn write_pointer(&self, queue: &wgpu::Queue, pointer: PointerVector) {
        let block = PointerUniform {
            pointer: pointer.as_array(),
            strength: self.strength,
            _pad: 0.0,
        };
        queue.write_buffer(&self.pointer_buf, 0, bytemuck::bytes_of(&block));
    }

    pub fn record(&self, rpass: &mut wgpu::RenderPass<'_>, vertex_count: u32) {
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        rpass.set_vertex_buffer(0, self.positions.slice(..));
        rpass.set_vertex_buffer(1, self.tex_coords.slice(..));
        rpass.draw(0..vertex_count, 0..1);
    }
}

fn layout_entries(bindings: &ShaderBindings) -> Vec<wgpu::BindGroupLayoutEntry> {
    let texture = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    };
    let uniform = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    };

    let mut entries = vec![
        texture(bindings.image),
        texture(bindings.depth_map),
        wgpu::BindGroupLayoutEntry {
            binding: bindings.sampler,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        },
        uniform(bindings.pointer),
    ];
    if let Some(slot) = bindings.cover {
        entries.push(uniform(slot));
    }
    entries
}

/// Upload one RGBA8 bitmap as a single-level 2D texture.
fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    bitmap: &PreparedImageCpu,
    format: wgpu::TextureFormat,
    label: &'static str,
) -> Result<wgpu::Texture> {
    let max_dim = device.limits().max_texture_dimension_2d;
    if bitmap.width > max_dim || bitmap.height > max_dim {
        return Err(Error::Surface(format!(
            "{} is {}x{}, above the device texture limit of {max_dim}",
            bitmap.path.display(),
            bitmap.width,
            bitmap.height,
        )));
    }
    let size = wgpu::Extent3d {
        width: bitmap.width,
        height: bitmap.height,
        depth_or_array_layers: 1,
    };
    let tex = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        tex.as_image_copy(),
        &bitmap.pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * bitmap.width),
            rows_per_image: Some(bitmap.height),
        },
        size,
    );
    Ok(tex)
}
