use std::ops::Range;
use std::sync::Arc;

use thiserror::Error;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::texture::SpriteImage;
use crate::traits::renderer::{Blend, FrameSetup, Primitive, RenderBackend};
use crate::types::{srgb_color_to_linear, CameraUniform, Vertex};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const INITIAL_VERTEX_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("failed to find an appropriate adapter: {0}")]
    RequestAdapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("failed to acquire frame: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("present called without begin_frame")]
    NoFrame,
    #[error("texture upload rejected: {0}")]
    Validation(String),
}

/// Sprite texture owned by the game; destroyed on drop
pub struct GpuTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

impl GpuTexture {
    pub fn size(&self) -> (u32, u32) {
        (self.texture.width(), self.texture.height())
    }
}

impl Drop for GpuTexture {
    fn drop(&mut self) {
        let (width, height) = self.size();
        self.texture.destroy();
        log::debug!("Released {}x{} texture", width, height);
    }
}

struct DrawCommand {
    pipeline: usize,
    vertices: Range<u32>,
    bind_group: wgpu::BindGroup,
}

/// State collected between `begin_frame` and `present`
struct FrameInProgress {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    clear_color: wgpu::Color,
    vertices: Vec<Vertex>,
    commands: Vec<DrawCommand>,
}

/// wgpu implementation of the render backend.
///
/// Draw calls are recorded on the CPU and replayed in a single render pass
/// when the frame is presented. Blending is baked into pipelines, one per
/// primitive/blend pair.
pub struct WgpuRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    /// Surface gamma-encodes on write, so colours must be handed over linear
    srgb_output: bool,
    depth_view: wgpu::TextureView,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    white_texture: GpuTexture,
    pipelines: Vec<wgpu::RenderPipeline>,
    vertex_buffer: wgpu::Buffer,
    vertex_capacity: usize,
    blend: Blend,
    frame: Option<FrameInProgress>,
}

impl WgpuRenderer {
    pub async fn new(window: Arc<Window>) -> Result<Self, RenderError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("openRange Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                experimental_features: Default::default(),
                trace: Default::default(),
            })
            .await?;

        let config = Self::create_surface_config(&surface, &adapter, size);
        surface.configure(&device, &config);
        log::info!(
            "Surface configured: {}x{} {:?} via {}",
            config.width,
            config.height,
            config.format,
            adapter.get_info().name
        );

        let srgb_output = config.format.is_srgb();
        let depth_view = Self::create_depth_view(&device, config.width, config.height);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[CameraUniform::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Camera Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
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

        // Nearest filtering keeps pixel art crisp
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Sprite Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let white_texture = Self::create_texture(
            &device,
            &queue,
            &texture_layout,
            &sampler,
            texture_format(srgb_output),
            1,
            1,
            &[255, 255, 255, 255],
            "White Texture",
        );

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("scene.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&camera_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let pipelines: Vec<_> = PIPELINE_KEYS
            .iter()
            .map(|&(primitive, blend)| {
                Self::create_pipeline(&device, &pipeline_layout, &shader, config.format, primitive, blend)
            })
            .collect();

        let vertex_buffer = Self::create_vertex_buffer(&device, INITIAL_VERTEX_CAPACITY);

        Ok(Self {
            device,
            queue,
            surface,
            config,
            srgb_output,
            depth_view,
            camera_buffer,
            camera_bind_group,
            texture_layout,
            sampler,
            white_texture,
            pipelines,
            vertex_buffer,
            vertex_capacity: INITIAL_VERTEX_CAPACITY,
            blend: Blend::Replace,
            frame: None,
        })
    }

    /// Reconfigure the surface after a window size change
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = Self::create_depth_view(&self.device, width, height);
    }

    fn create_surface_config(
        surface: &wgpu::Surface,
        adapter: &wgpu::Adapter,
        size: winit::dpi::PhysicalSize<u32>,
    ) -> wgpu::SurfaceConfiguration {
        let surface_caps = surface.get_capabilities(adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        }
    }

    fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
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

        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn create_vertex_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Vertex Buffer"),
            size: (capacity * std::mem::size_of::<Vertex>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn create_texture(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        rgba: &[u8],
        label: &str,
    ) -> GpuTexture {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
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
            texture.as_image_copy(),
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        GpuTexture {
            texture,
            bind_group,
        }
    }

    fn create_pipeline(
        device: &wgpu::Device,
        layout: &wgpu::PipelineLayout,
        shader: &wgpu::ShaderModule,
        format: wgpu::TextureFormat,
        primitive: Primitive,
        blend: Blend,
    ) -> wgpu::RenderPipeline {
        let topology = match primitive {
            Primitive::Triangles => wgpu::PrimitiveTopology::TriangleList,
            Primitive::Lines => wgpu::PrimitiveTopology::LineList,
        };
        let blend_state = match blend {
            Blend::Replace => wgpu::BlendState::REPLACE,
            Blend::AlphaOver => wgpu::BlendState::ALPHA_BLENDING,
        };
        let label = format!("{:?}/{:?} Pipeline", primitive, blend);

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label.as_str()),
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
                    format,
                    blend: Some(blend_state),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    fn ensure_vertex_capacity(&mut self, needed: usize) {
        if needed <= self.vertex_capacity {
            return;
        }

        let capacity = needed.next_power_of_two();
        log::debug!("Growing vertex buffer to {} vertices", capacity);
        self.vertex_buffer = Self::create_vertex_buffer(&self.device, capacity);
        self.vertex_capacity = capacity;
    }
}

const PIPELINE_KEYS: [(Primitive, Blend); 4] = [
    (Primitive::Triangles, Blend::Replace),
    (Primitive::Triangles, Blend::AlphaOver),
    (Primitive::Lines, Blend::Replace),
    (Primitive::Lines, Blend::AlphaOver),
];

/// Texel format matching the surface, so sprite pixels reach the screen unchanged
fn texture_format(srgb_output: bool) -> wgpu::TextureFormat {
    if srgb_output {
        wgpu::TextureFormat::Rgba8UnormSrgb
    } else {
        wgpu::TextureFormat::Rgba8Unorm
    }
}

/// Vertex colours are display values; an sRGB target expects them linear
fn encode_for_target(vertex: Vertex, srgb_output: bool) -> Vertex {
    if !srgb_output {
        return vertex;
    }

    Vertex {
        color: srgb_color_to_linear(vertex.color),
        ..vertex
    }
}

fn pipeline_index(primitive: Primitive, blend: Blend) -> usize {
    PIPELINE_KEYS
        .iter()
        .position(|&key| key == (primitive, blend))
        .unwrap_or(0)
}

impl RenderBackend for WgpuRenderer {
    type Texture = GpuTexture;

    fn upload_texture(&mut self, image: &SpriteImage) -> Result<GpuTexture, RenderError> {
        // Oversized images and bad layouts are reported here instead of as an uncaptured error
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let texture = Self::create_texture(
            &self.device,
            &self.queue,
            &self.texture_layout,
            &self.sampler,
            texture_format(self.srgb_output),
            image.width(),
            image.height(),
            image.rgba(),
            "Sprite Texture",
        );

        match pollster::block_on(self.device.pop_error_scope()) {
            Some(error) => Err(RenderError::Validation(error.to_string())),
            None => Ok(texture),
        }
    }

    fn begin_frame(&mut self, setup: &FrameSetup) -> Result<(), RenderError> {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(e @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                self.surface.configure(&self.device, &self.config);
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let uniform = CameraUniform::new(setup.projection * setup.view);
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[uniform]));

        let clear_color = if self.srgb_output {
            srgb_color_to_linear(setup.clear_color)
        } else {
            setup.clear_color
        };
        let [r, g, b, a] = clear_color.map(f64::from);
        self.frame = Some(FrameInProgress {
            surface_texture,
            view,
            clear_color: wgpu::Color { r, g, b, a },
            vertices: Vec::new(),
            commands: Vec::new(),
        });

        Ok(())
    }

    fn set_blend(&mut self, blend: Blend) {
        self.blend = blend;
    }

    fn draw(&mut self, primitive: Primitive, vertices: &[Vertex], texture: Option<&GpuTexture>) {
        let Some(frame) = self.frame.as_mut() else {
            log::warn!("Draw call outside of a frame ignored");
            return;
        };

        let srgb_output = self.srgb_output;
        let start = frame.vertices.len() as u32;
        frame
            .vertices
            .extend(vertices.iter().map(|&vertex| encode_for_target(vertex, srgb_output)));
        let end = frame.vertices.len() as u32;

        let bind_group = texture.unwrap_or(&self.white_texture).bind_group.clone();
        frame.commands.push(DrawCommand {
            pipeline: pipeline_index(primitive, self.blend),
            vertices: start..end,
            bind_group,
        });
    }

    fn present(&mut self) -> Result<(), RenderError> {
        let frame = self.frame.take().ok_or(RenderError::NoFrame)?;

        self.ensure_vertex_capacity(frame.vertices.len());
        if !frame.vertices.is_empty() {
            self.queue
                .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&frame.vertices));
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Scene Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(frame.clear_color),
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
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));

            for command in &frame.commands {
                render_pass.set_pipeline(&self.pipelines[command.pipeline]);
                render_pass.set_bind_group(1, &command.bind_group, &[]);
                render_pass.draw(command.vertices.clone(), 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.surface_texture.present();
        Ok(())
    }

    fn aspect_ratio(&self) -> f32 {
        self.config.width as f32 / self.config.height.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_primitive_blend_pair_has_a_pipeline() {
        let mut seen = Vec::new();
        for primitive in [Primitive::Triangles, Primitive::Lines] {
            for blend in [Blend::Replace, Blend::AlphaOver] {
                let index = pipeline_index(primitive, blend);
                assert_eq!(PIPELINE_KEYS[index], (primitive, blend));
                seen.push(index);
            }
        }

        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), PIPELINE_KEYS.len());
    }

    #[test]
    fn render_error_messages() {
        assert_eq!(
            RenderError::NoFrame.to_string(),
            "present called without begin_frame"
        );
        let surface: RenderError = wgpu::SurfaceError::Lost.into();
        assert!(surface.to_string().starts_with("failed to acquire frame"));
        assert_eq!(
            RenderError::Validation("too large".into()).to_string(),
            "texture upload rejected: too large"
        );
    }

    #[test]
    fn srgb_target_gets_linear_vertex_colors() {
        let vertex = Vertex::colored([1.0, 2.0, 3.0], [0.3, 0.7, 0.3, 1.0]);
        let encoded = encode_for_target(vertex, true);

        assert_eq!(encoded.position, vertex.position);
        assert_eq!(encoded.uv, vertex.uv);
        assert_eq!(encoded.color, srgb_color_to_linear(vertex.color));
        assert!(encoded.color[1] < vertex.color[1]);
    }

    #[test]
    fn non_srgb_target_passes_colors_through() {
        let vertex = Vertex::colored([0.0; 3], [0.2, 0.6, 0.2, 1.0]);
        assert_eq!(encode_for_target(vertex, false), vertex);
    }

    #[test]
    fn textured_vertices_keep_white_tint() {
        let vertex = Vertex::textured([0.0; 3], [1.0, 0.0]);
        assert_eq!(encode_for_target(vertex, true).color, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn texture_format_follows_surface_encoding() {
        assert!(texture_format(true).is_srgb());
        assert!(!texture_format(false).is_srgb());
    }
}
