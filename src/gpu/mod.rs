//! Render submission.
//!
//! [`GpuState`] owns every wgpu resource. Point clouds are uploaded once as
//! static per-instance attributes and animated in the vertex shaders from the
//! per-frame uniforms. Ornaments are evaluated on the host and their instance
//! buffers rewritten every frame through [`FrameSink`].

pub mod camera;
pub mod layout;
pub mod mesh;
pub mod shaders;

use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::config::SceneConfig;
use crate::dataset::ShapeType;
use crate::error::GpuError;
use crate::scene::{FrameUniforms, Scene};
pub use camera::Camera;
use layout::{DustVertex, FoliageVertex, MeshVertex, OrnamentInstance, SceneUniforms, StarVertex};
use mesh::Mesh;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.0,
    g: 0.01,
    b: 0.02,
    a: 1.0,
};

/// Consumer of evaluated frames.
///
/// Implemented by [`GpuState`]; tests implement it with a recorder.
pub trait FrameSink {
    /// Per-frame scalars for every group.
    fn upload_uniforms(&mut self, frame: &FrameUniforms);
    /// The full instance list of one ornament shape for this frame.
    fn upload_instances(&mut self, shape: ShapeType, instances: &[OrnamentInstance]);
}

/// Static part of the uniform block, taken from the config.
pub fn uniform_template(config: &SceneConfig) -> SceneUniforms {
    SceneUniforms {
        view_proj: glam::Mat4::IDENTITY.to_cols_array_2d(),
        camera_right: [1.0, 0.0, 0.0, 0.0],
        camera_up: [0.0, 1.0, 0.0, 0.0],
        foliage_color: config.foliage.color.extend(config.foliage.point_size).to_array(),
        accent_color: config
            .foliage
            .accent_color
            .extend(config.foliage.accent_fraction)
            .to_array(),
        dust_color: config.dust.color.extend(config.dust.point_size).to_array(),
        time: 0.0,
        foliage_progress: config.initial_state.target(),
        float_amplitude: config.float_amplitude,
        dust_half_height: config.dust.half_height,
        star_size: config.stars.point_size,
        _padding: [0.0; 3],
    }
}

/// Fill the per-frame lanes of `template`.
pub fn compose_uniforms(
    template: &SceneUniforms,
    camera: &Camera,
    aspect: f32,
    frame: &FrameUniforms,
) -> SceneUniforms {
    let (right, up) = camera.billboard_axes();
    SceneUniforms {
        view_proj: camera.view_proj(aspect).to_cols_array_2d(),
        camera_right: right.extend(0.0).to_array(),
        camera_up: up.extend(0.0).to_array(),
        time: frame.time,
        foliage_progress: frame.foliage_progress,
        ..*template
    }
}

/// Static point cloud drawn as instanced quads.
struct PointDraw {
    pipeline: wgpu::RenderPipeline,
    buffer: wgpu::Buffer,
    count: u32,
}

/// Mesh plus a growable per-frame instance buffer for one ornament shape.
struct OrnamentDraw {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    instance_buffer: wgpu::Buffer,
    capacity: usize,
    count: u32,
}

pub struct GpuState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_template: SceneUniforms,
    depth_texture: wgpu::TextureView,
    ornament_pipeline: wgpu::RenderPipeline,
    spheres: OrnamentDraw,
    boxes: OrnamentDraw,
    foliage: Option<PointDraw>,
    dust: Option<PointDraw>,
    stars: Option<PointDraw>,
    pub camera: Camera,
}

impl GpuState {
    /// Create the device and upload every static buffer of `scene`.
    pub async fn new(window: Arc<Window>, scene: &Scene) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;
        log::info!("using adapter {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(GpuError::NoAdapter)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = create_depth_texture(&device, &config);

        let camera = Camera::new();
        let uniform_template = uniform_template(scene.config());
        let initial = compose_uniforms(&uniform_template, &camera, aspect(&config), scene.frame());

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::bytes_of(&initial),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout],
            push_constant_ranges: &[],
        });

        let foliage_attributes = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32, 2 => Float32x3];
        let dust_attributes = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32, 2 => Float32x4];
        let star_attributes = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32];

        let foliage_records: Vec<FoliageVertex> = scene
            .foliage()
            .records()
            .unwrap_or_default()
            .iter()
            .map(FoliageVertex::from)
            .collect();
        let dust_records: Vec<DustVertex> = scene
            .dust()
            .unwrap_or_default()
            .iter()
            .map(DustVertex::from)
            .collect();
        let star_records: Vec<StarVertex> = scene
            .stars()
            .unwrap_or_default()
            .iter()
            .map(StarVertex::from)
            .collect();

        let point_pipeline = |label: &str, source: &str, stride: usize, attributes: &[wgpu::VertexAttribute]| {
            create_point_pipeline(&device, &pipeline_layout, config.format, label, source, stride, attributes)
        };

        let foliage = point_draw(
            &device,
            "Foliage",
            &foliage_records,
            || point_pipeline("Foliage", shaders::FOLIAGE, std::mem::size_of::<FoliageVertex>(), &foliage_attributes),
        );
        let dust = point_draw(
            &device,
            "Dust",
            &dust_records,
            || point_pipeline("Dust", shaders::DUST, std::mem::size_of::<DustVertex>(), &dust_attributes),
        );
        let stars = point_draw(
            &device,
            "Stars",
            &star_records,
            || point_pipeline("Stars", shaders::STARS, std::mem::size_of::<StarVertex>(), &star_attributes),
        );

        let ornament_pipeline = create_ornament_pipeline(&device, &pipeline_layout, config.format);
        let spheres = OrnamentDraw::new(
            &device,
            "Sphere",
            &Mesh::for_shape(ShapeType::Sphere, scene.config().spheres.size),
            scene.ornaments(ShapeType::Sphere).records().map_or(0, <[_]>::len),
        );
        let boxes = OrnamentDraw::new(
            &device,
            "Box",
            &Mesh::for_shape(ShapeType::Box, scene.config().boxes.size),
            scene.ornaments(ShapeType::Box).records().map_or(0, <[_]>::len),
        );

        log::info!(
            "GPU ready: {} foliage, {} dust, {} stars, {}x{} {:?}",
            foliage_records.len(),
            dust_records.len(),
            star_records.len(),
            config.width,
            config.height,
            config.format,
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            uniform_buffer,
            uniform_bind_group,
            uniform_template,
            depth_texture,
            ornament_pipeline,
            spheres,
            boxes,
            foliage,
            dust,
            stars,
            camera,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture = create_depth_texture(&self.device, &self.config);
        }
    }

    /// Re-apply the current surface configuration, e.g. after `SurfaceError::Lost`.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);

            // Opaque ornaments first so the additive points depth-test against them.
            render_pass.set_pipeline(&self.ornament_pipeline);
            for draw in [&self.spheres, &self.boxes] {
                if draw.count == 0 {
                    continue;
                }
                let used = draw.count as u64 * std::mem::size_of::<OrnamentInstance>() as u64;
                render_pass.set_vertex_buffer(0, draw.vertex_buffer.slice(..));
                render_pass.set_vertex_buffer(1, draw.instance_buffer.slice(..used));
                render_pass.set_index_buffer(draw.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                render_pass.draw_indexed(0..draw.index_count, 0, 0..draw.count);
            }

            for draw in [&self.stars, &self.foliage, &self.dust].into_iter().flatten() {
                render_pass.set_pipeline(&draw.pipeline);
                render_pass.set_vertex_buffer(0, draw.buffer.slice(..));
                render_pass.draw(0..6, 0..draw.count);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

impl FrameSink for GpuState {
    fn upload_uniforms(&mut self, frame: &FrameUniforms) {
        let uniforms = compose_uniforms(&self.uniform_template, &self.camera, aspect(&self.config), frame);
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    fn upload_instances(&mut self, shape: ShapeType, instances: &[OrnamentInstance]) {
        let draw = match shape {
            ShapeType::Sphere => &mut self.spheres,
            ShapeType::Box => &mut self.boxes,
        };
        if instances.len() > draw.capacity {
            log::debug!(
                "growing {:?} instance buffer {} -> {}",
                shape,
                draw.capacity,
                instances.len()
            );
            draw.instance_buffer = create_instance_buffer(&self.device, instances.len());
            draw.capacity = instances.len();
        }
        if !instances.is_empty() {
            self.queue.write_buffer(&draw.instance_buffer, 0, bytemuck::cast_slice(instances));
        }
        draw.count = instances.len() as u32;
    }
}

impl OrnamentDraw {
    fn new(device: &wgpu::Device, label: &str, mesh: &Mesh, capacity: usize) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Mesh Vertices")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Mesh Indices")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let capacity = capacity.max(1);
        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
            instance_buffer: create_instance_buffer(device, capacity),
            capacity,
            count: 0,
        }
    }
}

fn aspect(config: &wgpu::SurfaceConfiguration) -> f32 {
    config.width as f32 / config.height.max(1) as f32
}

fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Ornament Instance Buffer"),
        size: (capacity.max(1) * std::mem::size_of::<OrnamentInstance>()) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Upload a static point cloud. Empty clouds get no buffer and no pipeline.
fn point_draw<T: bytemuck::Pod>(
    device: &wgpu::Device,
    label: &str,
    records: &[T],
    pipeline: impl FnOnce() -> wgpu::RenderPipeline,
) -> Option<PointDraw> {
    if records.is_empty() {
        log::debug!("{label} has no points, skipping its pipeline");
        return None;
    }
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{label} Point Buffer")),
        contents: bytemuck::cast_slice(records),
        usage: wgpu::BufferUsages::VERTEX,
    });
    Some(PointDraw {
        pipeline: pipeline(),
        buffer,
        count: records.len() as u32,
    })
}

fn create_point_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    format: wgpu::TextureFormat,
    label: &str,
    source: &str,
    stride: usize,
    attributes: &[wgpu::VertexAttribute],
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some(shaders::VERTEX),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: stride as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes,
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some(shaders::POINT_FRAGMENT),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState {
                    color: wgpu::BlendComponent {
                        src_factor: wgpu::BlendFactor::One,
                        dst_factor: wgpu::BlendFactor::One,
                        operation: wgpu::BlendOperation::Add,
                    },
                    alpha: wgpu::BlendComponent::OVER,
                }),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn create_ornament_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Ornament Shader"),
        source: wgpu::ShaderSource::Wgsl(shaders::ORNAMENT.into()),
    });

    let mesh_attributes = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
    let instance_attributes = wgpu::vertex_attr_array![
        2 => Float32x4,
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4,
    ];

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Ornament Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some(shaders::VERTEX),
            buffers: &[
                wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &mesh_attributes,
                },
                wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<OrnamentInstance>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &instance_attributes,
                },
            ],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some(shaders::MESH_FRAGMENT),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
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

fn create_depth_texture(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
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
