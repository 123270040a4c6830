//! Offscreen render session.
//!
//! One session per render call: it owns the wgpu device, the compiled
//! shader, both render pipelines, and the offscreen color/depth targets.
//! Construction walks the initialization chain in a strict order and
//! fails fast with the validation log attached; every resource is
//! released by `Drop` on success and failure paths alike, so a session
//! can never leak native handles.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use crate::config::RendererConfig;
use crate::error::{Error, Result};
use crate::mesh::{GpuMesh, Vertex};
use crate::texture::TextureImage;

const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

/// Fixed camera: eye on the +Z axis looking at the origin, +Y up.
const EYE: Vec3 = Vec3::new(0.0, 0.0, 52.0);
const VERTICAL_FOV_DEG: f32 = 45.0;
const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 1000.0;

/// Fixed light color; only the light position is configurable.
const LIGHT_COLOR: Vec3 = Vec3::new(1.0, 1.0, 1.0);

/// Uniform block shared by both passes. Matrices are column-major; the
/// vec3 payloads are padded to 16 bytes per WGSL layout rules.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct Uniforms {
    model: [[f32; 4]; 4],
    view: [[f32; 4]; 4],
    proj: [[f32; 4]; 4],
    light_pos: [f32; 4],
    light_color: [f32; 4],
    view_pos: [f32; 4],
}

/// A skin texture uploaded to the device, with its sampler bind group.
pub(crate) struct SkinTexture {
    /// Keeps the underlying texture alive for the view in `bind_group`.
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

pub(crate) struct RenderSession {
    device: wgpu::Device,
    queue: wgpu::Queue,
    opaque_pipeline: wgpu::RenderPipeline,
    overlay_pipeline: wgpu::RenderPipeline,
    texture_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    sampler: wgpu::Sampler,
    /// Keeps the color texture alive for `color_view`; also the readback
    /// source.
    color_texture: wgpu::Texture,
    color_view: wgpu::TextureView,
    #[allow(dead_code)] // Keeps the depth texture alive for depth_view.
    depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl RenderSession {
    /// Initialize a session for a width x height offscreen target.
    ///
    /// Order: adapter -> device -> shader -> pipelines -> targets. Each
    /// step is fatal on failure and aborts the rest; wgpu validation
    /// errors are captured through error scopes so the diagnostics carry
    /// the compiler/validator log.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::RenderTarget {
                log: format!("output size {width}x{height} is empty"),
            });
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Headless: no surface, any adapter that can render offscreen.
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))?;

        tracing::info!("Using GPU adapter: {:?}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Portrait Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            experimental_features: Default::default(),
            trace: wgpu::Trace::Off,
        }))?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Portrait Shader"),
            source: wgpu::ShaderSource::Wgsl(
                include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/portrait.wgsl")).into(),
            ),
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(Error::ShaderCompile {
                log: err.to_string(),
            });
        }

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniform Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Texture Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Portrait Uniforms"),
            size: std::mem::size_of::<Uniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Uniform Bind Group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        // Nearest filtering keeps skin texels crisp; repeat wrapping
        // supports synthesized UVs that tile past [0, 1].
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Skin Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Portrait Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let opaque_pipeline =
            build_pipeline(&device, &shader, &pipeline_layout, None, "Opaque Pipeline");
        let overlay_pipeline = build_pipeline(
            &device,
            &shader,
            &pipeline_layout,
            Some(wgpu::BlendState::ALPHA_BLENDING),
            "Overlay Pipeline",
        );
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(Error::Pipeline {
                log: err.to_string(),
            });
        }

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let color_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Portrait Color Target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Portrait Depth Target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(Error::RenderTarget {
                log: err.to_string(),
            });
        }

        let color_view = color_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(Self {
            device,
            queue,
            opaque_pipeline,
            overlay_pipeline,
            texture_layout,
            uniform_buffer,
            uniform_bind_group,
            sampler,
            color_texture,
            color_view,
            depth_texture,
            depth_view,
            width,
            height,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Upload a decoded texture and build its bind group.
    pub fn upload_texture(&self, image: &TextureImage) -> SkinTexture {
        let texture = self.device.create_texture_with_data(
            &self.queue,
            &wgpu::TextureDescriptor {
                label: Some("Skin Texture"),
                size: wgpu::Extent3d {
                    width: image.width,
                    height: image.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &image.pixels,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Skin Bind Group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        SkinTexture {
            _texture: texture,
            bind_group,
        }
    }

    /// Execute the draw pipeline: clear, opaque base pass, then - when
    /// overlays exist - the alpha-blended overlay pass.
    pub fn render(
        &self,
        config: &RendererConfig,
        texture: &SkinTexture,
        base: &[GpuMesh],
        overlays: &[GpuMesh],
    ) {
        self.queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&self.build_uniforms(config)),
        );

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Portrait Encoder"),
            });

        {
            let [r, g, b] = config.background;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Portrait Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(0),
                        store: wgpu::StoreOp::Store,
                    }),
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.set_bind_group(1, &texture.bind_group, &[]);

            pass.set_pipeline(&self.opaque_pipeline);
            for mesh in base {
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }

            if !overlays.is_empty() {
                pass.set_pipeline(&self.overlay_pipeline);
                for mesh in overlays {
                    pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                    pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..mesh.index_count, 0, 0..1);
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        tracing::debug!(
            "Rendered {} base mesh(es), {} overlay(s) at {}x{}",
            base.len(),
            overlays.len(),
            self.width,
            self.height
        );
    }

    fn build_uniforms(&self, config: &RendererConfig) -> Uniforms {
        // Scale applies first, then the Y rotation, then translation.
        let model = Mat4::from_translation(Vec3::from(config.translation))
            * Mat4::from_rotation_y(config.rotation_y.to_radians())
            * Mat4::from_scale(Vec3::splat(config.scale));
        let view = Mat4::look_at_rh(EYE, Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(
            VERTICAL_FOV_DEG.to_radians(),
            self.width as f32 / self.height as f32,
            Z_NEAR,
            Z_FAR,
        );

        let [lx, ly, lz] = config.light_position;
        Uniforms {
            model: model.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            proj: proj.to_cols_array_2d(),
            light_pos: [lx, ly, lz, 1.0],
            light_color: [LIGHT_COLOR.x, LIGHT_COLOR.y, LIGHT_COLOR.z, 1.0],
            view_pos: [EYE.x, EYE.y, EYE.z, 1.0],
        }
    }

    /// Read the color target back as tightly packed RGB, width x height
    /// x 3 bytes, rows top to bottom.
    ///
    /// wgpu requires staging-buffer rows aligned to 256 bytes; the
    /// padding is stripped while the RGBA data is repacked to RGB.
    pub fn read_pixels(&self) -> Result<Vec<u8>> {
        let bytes_per_pixel = 4u32;
        let unpadded_bytes_per_row = self.width * bytes_per_pixel;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;
        let buffer_size = (padded_bytes_per_row * self.height) as u64;

        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Staging Buffer"),
            size: buffer_size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.color_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );

        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| Error::Readback {
                reason: format!("device poll failed: {e}"),
            })?;

        rx.recv()
            .map_err(|_| Error::Readback {
                reason: "map callback dropped".to_string(),
            })?
            .map_err(|e| Error::Readback {
                reason: format!("buffer map failed: {e}"),
            })?;

        // Strip row padding and drop the alpha channel in one pass.
        let mapped = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((self.width * self.height * 3) as usize);
        for row in 0..self.height {
            let start = (row * padded_bytes_per_row) as usize;
            let end = start + unpadded_bytes_per_row as usize;
            for rgba in mapped[start..end].chunks_exact(4) {
                pixels.extend_from_slice(&rgba[..3]);
            }
        }

        drop(mapped);
        staging_buffer.unmap();

        Ok(pixels)
    }
}

fn build_pipeline(
    device: &wgpu::Device,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    blend: Option<wgpu::BlendState>,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[Vertex::layout()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: COLOR_FORMAT,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // Overlay interiors must stay visible through transparent
            // texels, so no face culling in either pass.
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}
