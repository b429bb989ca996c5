//! Executes a [`FramePlan`] on wgpu: the offscreen depth pass into the shadow
//! map, then one render pass drawing the four scissored viewports, then the
//! egui control panel.
//!
//! All core matrices use GL clip conventions (z in [-1, 1]); the correction
//! to wgpu's [0, 1] clip range is applied here at uniform upload and nowhere
//! else. The shadow map therefore stores exactly the depth the light-space
//! transform produces, and the comparison in the shader needs no further
//! adjustment.

use std::sync::Arc;

use glam::{Mat4, Vec4};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::controls::ViewerControls;
use crate::frame::{DrawCall, DrawMesh, FramePlan};
use crate::scene::Scene;
use crate::shadow::SHADOW_MAP_SIZE;
use crate::viewport::ViewportGrid;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Maps GL clip coordinates (z in [-1, 1]) to wgpu clip coordinates
/// (z in [0, 1]): z' = 0.5 * z + 0.5 * w.
const GL_TO_WGPU: Mat4 = Mat4::from_cols(
    Vec4::new(1.0, 0.0, 0.0, 0.0),
    Vec4::new(0.0, 1.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, 0.5, 0.0),
    Vec4::new(0.0, 0.0, 0.5, 1.0),
);

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Dynamic-offset stride; one slot per draw call.
const UNIFORM_STRIDE: u64 = 256;
const INITIAL_UNIFORM_SLOTS: u64 = 256;

/// Subdivisions of the near-plane grid drawn on the light frustum.
const NEAR_GRID_LINES: u32 = 8;

/// Per-draw uniform block, 256 bytes to match the dynamic-offset stride.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct DrawUniforms {
    mvp: [[f32; 4]; 4],
    mv: [[f32; 4]; 4],
    light_space: [[f32; 4]; 4],
    light_pos: [f32; 4],
    color: [f32; 4],
    flags: [u32; 4],
    params: [f32; 4],
}

impl DrawUniforms {
    fn for_draw(draw: &DrawCall, plan: &FramePlan) -> Self {
        // The depth display modes only make sense on lit geometry; lines and
        // cheap shadows keep their flat color.
        let (draw_depth, draw_depth_map) = if draw.use_lighting {
            (plan.shadow.draw_depth, plan.shadow.draw_depth_map)
        } else {
            (false, false)
        };
        Self {
            mvp: (GL_TO_WGPU * draw.mvp).to_cols_array_2d(),
            mv: draw.mv.to_cols_array_2d(),
            light_space: plan.shadow.light_space_transform.to_cols_array_2d(),
            light_pos: draw.light_pos.extend(1.0).to_array(),
            color: draw.color,
            flags: [
                draw.use_lighting as u32,
                draw.use_shadow_map as u32,
                plan.shadow.use_linear_filter as u32,
                plan.shadow.use_bias as u32,
            ],
            params: [
                plan.shadow.bias_slope_factor,
                draw_depth as u32 as f32,
                draw_depth_map as u32 as f32,
                0.0,
            ],
        }
    }

    fn flat_color(color: [f32; 4]) -> Self {
        Self {
            mvp: Mat4::IDENTITY.to_cols_array_2d(),
            mv: Mat4::IDENTITY.to_cols_array_2d(),
            light_space: Mat4::IDENTITY.to_cols_array_2d(),
            light_pos: [0.0; 4],
            color,
            flags: [0; 4],
            params: [0.0; 4],
        }
    }

    fn for_depth_pass(mvp: Mat4) -> Self {
        Self {
            mvp: (GL_TO_WGPU * mvp).to_cols_array_2d(),
            ..Self::flat_color([0.0; 4])
        }
    }
}

/// One GPU mesh: interleaved vertex buffer, optional index buffer.
struct GpuMesh {
    vertices: wgpu::Buffer,
    indices: Option<wgpu::Buffer>,
    count: u32,
}

pub struct Renderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    depth_texture_view: wgpu::TextureView,
    shadow_map_view: wgpu::TextureView,
    object_meshes: Vec<GpuMesh>,
    frustum_cube: GpuMesh,
    near_plane_grid: GpuMesh,
    axes: [GpuMesh; 3],
    uniform_buffer: wgpu::Buffer,
    uniform_slots: u64,
    depth_bind_group_layout: wgpu::BindGroupLayout,
    scene_bind_group_layout: wgpu::BindGroupLayout,
    depth_bind_group: wgpu::BindGroup,
    scene_bind_group: wgpu::BindGroup,
    shadow_sampler_linear: wgpu::Sampler,
    shadow_sampler_nearest: wgpu::Sampler,
    depth_pipeline: wgpu::RenderPipeline,
    depth_pipeline_cull_front: wgpu::RenderPipeline,
    scene_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    background_pipeline: wgpu::RenderPipeline,
    egui_renderer: egui_wgpu::Renderer,
    egui_state: egui_winit::State,
    egui_ctx: egui::Context,
}

impl Renderer {
    pub async fn new(window: Arc<Window>, scene: &Scene) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;
        let adapter = Self::request_adapter(&instance, &surface).await?;
        let (device, queue) = Self::request_device(&adapter).await?;

        let surface_config = Self::create_surface_config(&surface, &adapter, size);
        surface.configure(&device, &surface_config);

        let depth_texture_view = Self::create_depth_texture(&device, size.width, size.height);
        let shadow_map_view = Self::create_shadow_map(&device);

        let object_meshes = scene.objects.iter().map(|o| {
            let mut data = Vec::with_capacity(o.vertices.len() * 6);
            for (v, n) in o.vertices.iter().zip(&o.normals) {
                data.extend_from_slice(&[v.x, v.y, v.z, n.x, n.y, n.z]);
            }
            GpuMesh {
                vertices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} Vertices", o.name)),
                    contents: bytemuck::cast_slice(&data),
                    usage: wgpu::BufferUsages::VERTEX,
                }),
                indices: Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} Indices", o.name)),
                    contents: bytemuck::cast_slice(&o.indices),
                    usage: wgpu::BufferUsages::INDEX,
                })),
                count: o.indices.len() as u32,
            }
        }).collect();

        let frustum_cube = Self::line_mesh(&device, "Frustum Cube", &frustum_cube_lines());
        let near_plane_grid = Self::line_mesh(&device, "Near Plane Grid", &near_plane_grid_lines());
        let axes = [
            Self::line_mesh(&device, "Axis X", &[[0.0; 3], [1.0, 0.0, 0.0]]),
            Self::line_mesh(&device, "Axis Y", &[[0.0; 3], [0.0, 1.0, 0.0]]),
            Self::line_mesh(&device, "Axis Z", &[[0.0; 3], [0.0, 0.0, 1.0]]),
        ];

        let shadow_sampler_linear = Self::create_comparison_sampler(&device, wgpu::FilterMode::Linear);
        let shadow_sampler_nearest = Self::create_comparison_sampler(&device, wgpu::FilterMode::Nearest);

        let depth_bind_group_layout = Self::create_depth_bind_group_layout(&device);
        let scene_bind_group_layout = Self::create_scene_bind_group_layout(&device);

        let uniform_slots = INITIAL_UNIFORM_SLOTS;
        let uniform_buffer = Self::create_uniform_buffer(&device, uniform_slots);
        let (depth_bind_group, scene_bind_group) = Self::create_bind_groups(
            &device,
            &depth_bind_group_layout,
            &scene_bind_group_layout,
            &uniform_buffer,
            &shadow_map_view,
            &shadow_sampler_linear,
            &shadow_sampler_nearest,
        );

        let depth_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Depth Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("depth.wgsl").into()),
        });
        let scene_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("scene.wgsl").into()),
        });

        let depth_pipeline = Self::create_depth_pipeline(
            &device,
            &depth_bind_group_layout,
            &depth_shader,
            None,
        );
        let depth_pipeline_cull_front = Self::create_depth_pipeline(
            &device,
            &depth_bind_group_layout,
            &depth_shader,
            Some(wgpu::Face::Front),
        );
        let scene_pipeline = Self::create_scene_pipeline(
            &device,
            &scene_bind_group_layout,
            &scene_shader,
            surface_config.format,
        );
        let line_pipeline = Self::create_line_pipeline(
            &device,
            &scene_bind_group_layout,
            &scene_shader,
            surface_config.format,
        );
        let background_pipeline = Self::create_background_pipeline(
            &device,
            &scene_bind_group_layout,
            &scene_shader,
            surface_config.format,
        );

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(
            &device,
            surface_config.format,
            egui_wgpu::RendererOptions::default(),
        );

        log::info!(
            "renderer initialized: {} objects, {}x{} shadow map",
            scene.objects.len(),
            SHADOW_MAP_SIZE,
            SHADOW_MAP_SIZE
        );

        Ok(Self {
            device,
            queue,
            surface,
            surface_config,
            size,
            depth_texture_view,
            shadow_map_view,
            object_meshes,
            frustum_cube,
            near_plane_grid,
            axes,
            uniform_buffer,
            uniform_slots,
            depth_bind_group_layout,
            scene_bind_group_layout,
            depth_bind_group,
            scene_bind_group,
            shadow_sampler_linear,
            shadow_sampler_nearest,
            depth_pipeline,
            depth_pipeline_cull_front,
            scene_pipeline,
            line_pipeline,
            background_pipeline,
            egui_renderer,
            egui_state,
            egui_ctx,
        })
    }

    async fn request_adapter(
        instance: &wgpu::Instance,
        surface: &wgpu::Surface<'_>,
    ) -> Result<wgpu::Adapter> {
        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| "Failed to find appropriate adapter".into())
    }

    async fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue)> {
        adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                experimental_features: Default::default(),
                trace: Default::default(),
            })
            .await
            .map_err(|e| e.into())
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
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        }
    }

    fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Window Depth Texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
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

    fn create_shadow_map(device: &wgpu::Device) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Shadow Map"),
            size: wgpu::Extent3d {
                width: SHADOW_MAP_SIZE,
                height: SHADOW_MAP_SIZE,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn create_comparison_sampler(device: &wgpu::Device, filter: wgpu::FilterMode) -> wgpu::Sampler {
        device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Comparison Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        })
    }

    fn line_mesh(device: &wgpu::Device, label: &str, vertices: &[[f32; 3]]) -> GpuMesh {
        GpuMesh {
            vertices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            indices: None,
            count: vertices.len() as u32,
        }
    }

    fn create_uniform_buffer(device: &wgpu::Device, slots: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Uniforms"),
            size: slots * UNIFORM_STRIDE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_depth_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("depth_bind_group_layout"),
        })
    }

    fn create_scene_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
            label: Some("scene_bind_group_layout"),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn create_bind_groups(
        device: &wgpu::Device,
        depth_layout: &wgpu::BindGroupLayout,
        scene_layout: &wgpu::BindGroupLayout,
        uniform_buffer: &wgpu::Buffer,
        shadow_map_view: &wgpu::TextureView,
        sampler_linear: &wgpu::Sampler,
        sampler_nearest: &wgpu::Sampler,
    ) -> (wgpu::BindGroup, wgpu::BindGroup) {
        let uniform_binding = wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer: uniform_buffer,
            offset: 0,
            size: wgpu::BufferSize::new(UNIFORM_STRIDE),
        });

        let depth_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: depth_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_binding.clone(),
            }],
            label: Some("depth_bind_group"),
        });

        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: scene_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_binding,
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(shadow_map_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler_linear),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(sampler_nearest),
                },
            ],
            label: Some("scene_bind_group"),
        });

        (depth_bind_group, scene_bind_group)
    }

    fn scene_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: 24,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x3,
                    offset: 0,
                    shader_location: 0,
                },
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x3,
                    offset: 12,
                    shader_location: 1,
                },
            ],
        }
    }

    fn line_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: 12,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x3,
                offset: 0,
                shader_location: 0,
            }],
        }
    }

    fn create_depth_pipeline(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        shader: &wgpu::ShaderModule,
        cull_mode: Option<wgpu::Face>,
    ) -> wgpu::RenderPipeline {
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Depth Pipeline Layout"),
            bind_group_layouts: &[layout],
            push_constant_ranges: &[],
        });

        // Positions only; the normal bytes in the stride are skipped.
        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: 24,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x3,
                offset: 0,
                shader_location: 0,
            }],
        };

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Depth Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                buffers: &[vertex_layout],
                compilation_options: Default::default(),
            },
            fragment: None,
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
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

    fn create_scene_pipeline(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        shader: &wgpu::ShaderModule,
        surface_format: wgpu::TextureFormat,
    ) -> wgpu::RenderPipeline {
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Scene Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_scene"),
                buffers: &[Self::scene_vertex_layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_scene"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
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

    fn create_line_pipeline(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        shader: &wgpu::ShaderModule,
        surface_format: wgpu::TextureFormat,
    ) -> wgpu::RenderPipeline {
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Line Pipeline Layout"),
            bind_group_layouts: &[layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Line Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_line"),
                buffers: &[Self::line_vertex_layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_flat"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
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

    fn create_background_pipeline(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        shader: &wgpu::ShaderModule,
        surface_format: wgpu::TextureFormat,
    ) -> wgpu::RenderPipeline {
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Background Pipeline Layout"),
            bind_group_layouts: &[layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Background Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_background"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_flat"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: Default::default(),
                bias: Default::default(),
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

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.surface_config.width = new_size.width;
        self.surface_config.height = new_size.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_texture_view =
            Self::create_depth_texture(&self.device, new_size.width, new_size.height);
    }

    fn mesh_for(&self, mesh: DrawMesh) -> &GpuMesh {
        match mesh {
            DrawMesh::Object(i) => &self.object_meshes[i],
            DrawMesh::FrustumCube => &self.frustum_cube,
            DrawMesh::NearPlaneGrid => &self.near_plane_grid,
            DrawMesh::AxisX => &self.axes[0],
            DrawMesh::AxisY => &self.axes[1],
            DrawMesh::AxisZ => &self.axes[2],
        }
    }

    /// Grow the dynamic-offset buffer when a frame needs more slots than the
    /// current capacity; the bind groups alias the buffer and follow it.
    fn ensure_uniform_slots(&mut self, needed: u64) {
        if needed <= self.uniform_slots {
            return;
        }
        self.uniform_slots = needed.next_power_of_two();
        self.uniform_buffer = Self::create_uniform_buffer(&self.device, self.uniform_slots);
        let (depth_bind_group, scene_bind_group) = Self::create_bind_groups(
            &self.device,
            &self.depth_bind_group_layout,
            &self.scene_bind_group_layout,
            &self.uniform_buffer,
            &self.shadow_map_view,
            &self.shadow_sampler_linear,
            &self.shadow_sampler_nearest,
        );
        self.depth_bind_group = depth_bind_group;
        self.scene_bind_group = scene_bind_group;
    }

    pub fn render(
        &mut self,
        window: &Window,
        plan: &FramePlan,
        grid: &ViewportGrid,
        controls: &mut ViewerControls,
        show_ui: bool,
    ) -> std::result::Result<(), wgpu::SurfaceError> {
        // Slot 0 is the depth pass; each view contributes one background slot
        // followed by one slot per draw call.
        let mut uniforms = vec![DrawUniforms::for_depth_pass(plan.depth.mvp)];
        for view in &plan.views {
            let [r, g, b] = view.clear_color;
            uniforms.push(DrawUniforms::flat_color([r, g, b, 1.0]));
            for draw in &view.draws {
                uniforms.push(DrawUniforms::for_draw(draw, plan));
            }
        }

        self.ensure_uniform_slots(uniforms.len() as u64);
        let mut bytes = Vec::with_capacity(uniforms.len() * UNIFORM_STRIDE as usize);
        for u in &uniforms {
            bytes.extend_from_slice(bytemuck::bytes_of(u));
        }
        self.queue.write_buffer(&self.uniform_buffer, 0, &bytes);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Encoder"),
            });

        // Depth pass into the shadow map, always before any view samples it.
        {
            let mut depth_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Depth Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow_map_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if plan.depth.cull_front_faces {
                depth_pass.set_pipeline(&self.depth_pipeline_cull_front);
            } else {
                depth_pass.set_pipeline(&self.depth_pipeline);
            }
            depth_pass.set_bind_group(0, &self.depth_bind_group, &[0]);
            for mesh in &self.object_meshes {
                depth_pass.set_vertex_buffer(0, mesh.vertices.slice(..));
                if let Some(indices) = &mesh.indices {
                    depth_pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                    depth_pass.draw_indexed(0..mesh.count, 0, 0..1);
                } else {
                    depth_pass.draw(0..mesh.count, 0..1);
                }
            }
        }

        // One pass for all four viewports; the full-window clear is the
        // border color between them.
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Viewports Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::WHITE),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            let mut slot: u32 = 1;
            for (view_frame, vp) in plan.views.iter().zip(&grid.viewports) {
                render_pass.set_viewport(
                    vp.x as f32,
                    vp.y as f32,
                    vp.w as f32,
                    vp.h as f32,
                    0.0,
                    1.0,
                );
                render_pass.set_scissor_rect(vp.x, vp.y, vp.w, vp.h);

                render_pass.set_pipeline(&self.background_pipeline);
                render_pass.set_bind_group(
                    0,
                    &self.scene_bind_group,
                    &[slot * UNIFORM_STRIDE as u32],
                );
                render_pass.draw(0..3, 0..1);
                slot += 1;

                for draw in &view_frame.draws {
                    let mesh = self.mesh_for(draw.mesh);
                    match draw.mesh {
                        DrawMesh::Object(_) => render_pass.set_pipeline(&self.scene_pipeline),
                        _ => render_pass.set_pipeline(&self.line_pipeline),
                    }
                    render_pass.set_bind_group(
                        0,
                        &self.scene_bind_group,
                        &[slot * UNIFORM_STRIDE as u32],
                    );
                    render_pass.set_vertex_buffer(0, mesh.vertices.slice(..));
                    if let Some(indices) = &mesh.indices {
                        render_pass
                            .set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                        render_pass.draw_indexed(0..mesh.count, 0, 0..1);
                    } else {
                        render_pass.draw(0..mesh.count, 0..1);
                    }
                    slot += 1;
                }
            }
        }

        if show_ui {
            self.render_ui(window, &view, &mut encoder, grid, controls);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn render_ui(
        &mut self,
        window: &Window,
        view: &wgpu::TextureView,
        encoder: &mut wgpu::CommandEncoder,
        grid: &ViewportGrid,
        controls: &mut ViewerControls,
    ) {
        let raw_input = self.egui_state.take_egui_input(window);
        let pixels_per_point = window.scale_factor() as f32;

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            egui::Window::new("Controls")
                .title_bar(true)
                .resizable(false)
                .default_pos(egui::pos2(10.0, 10.0))
                .show(ctx, |ui| {
                    ui.checkbox(&mut controls.use_shadow_map, "Shadow map (U)");
                    ui.checkbox(&mut controls.use_linear_filter, "Linear filtering (F)");
                    ui.checkbox(&mut controls.use_depth_bias, "Depth bias");
                    ui.add(
                        egui::Slider::new(&mut controls.bias_slope_factor, 0.0..=0.02)
                            .text("Bias slope"),
                    );
                    ui.checkbox(&mut controls.use_culling, "Front-face culling (C)");
                    ui.checkbox(&mut controls.cheap_shadows, "Cheap shadows (O)");

                    ui.add_space(5.0);
                    ui.separator();
                    ui.add_space(5.0);

                    let mut mode = if controls.draw_depth {
                        1
                    } else if controls.draw_depth_map {
                        2
                    } else {
                        0
                    };
                    ui.radio_value(&mut mode, 0, "Shaded (D cycles)");
                    ui.radio_value(&mut mode, 1, "Fragment depth");
                    ui.radio_value(&mut mode, 2, "Shadow-map depth");
                    controls.draw_depth = mode == 1;
                    controls.draw_depth_map = mode == 2;

                    ui.add_space(5.0);
                    ui.separator();
                    ui.add_space(5.0);

                    ui.checkbox(&mut controls.show_main_camera, "Main frustum (E)");
                    ui.checkbox(&mut controls.show_light_camera, "Light frustum (L)");
                    ui.add(
                        egui::Slider::new(&mut controls.main_view_fov, 5.0..=90.0)
                            .text("Main FOV"),
                    );
                    ui.checkbox(&mut controls.manual_light_fov, "Manual light FOV (M)");
                    ui.add_enabled(
                        controls.manual_light_fov,
                        egui::Slider::new(&mut controls.light_view_fov, 10.0..=120.0)
                            .text("Light FOV"),
                    );
                });

            let labels = ["main", "light", "third person", "post perspective"];
            for (label, vp) in labels.iter().zip(&grid.viewports) {
                egui::Area::new(egui::Id::new(*label))
                    .fixed_pos(egui::pos2(
                        (vp.x + vp.w) as f32 / pixels_per_point - 110.0,
                        (vp.y + vp.h) as f32 / pixels_per_point - 22.0,
                    ))
                    .show(ctx, |ui| {
                        ui.label(
                            egui::RichText::new(*label)
                                .size(14.0)
                                .color(egui::Color32::from_rgb(200, 200, 200)),
                        );
                    });
            }
        });

        self.egui_state
            .handle_platform_output(window, full_output.platform_output);

        let tris = self
            .egui_ctx
            .tessellate(full_output.shapes, self.egui_ctx.pixels_per_point());
        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, image_delta);
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.size.width, self.size.height],
            pixels_per_point,
        };

        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            encoder,
            &tris,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            // SAFETY: The render pass lifetime is actually tied to the encoder,
            // but egui-wgpu requires 'static. This is safe because we drop the
            // render pass before using the encoder again.
            let render_pass_static = unsafe {
                std::mem::transmute::<&mut wgpu::RenderPass<'_>, &mut wgpu::RenderPass<'static>>(
                    &mut render_pass,
                )
            };

            self.egui_renderer
                .render(render_pass_static, &tris, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }

    /// Let egui see a window event; returns true if it consumed it.
    pub fn handle_event(&mut self, window: &Window, event: &winit::event::WindowEvent) -> bool {
        self.egui_state.on_window_event(window, event).consumed
    }
}

/// The 12 edges of the [-1, 1]^3 cube as a line list.
fn frustum_cube_lines() -> Vec<[f32; 3]> {
    let corner = |bits: u32| {
        [
            if bits & 1 != 0 { 1.0 } else { -1.0 },
            if bits & 2 != 0 { 1.0 } else { -1.0 },
            if bits & 4 != 0 { 1.0 } else { -1.0 },
        ]
    };
    let mut lines = Vec::with_capacity(24);
    for bits in 0..8u32 {
        for axis in 0..3 {
            if bits & (1 << axis) == 0 {
                lines.push(corner(bits));
                lines.push(corner(bits | (1 << axis)));
            }
        }
    }
    lines
}

/// A square grid of lines on the cube's near face (z = -1 in GL clip space).
fn near_plane_grid_lines() -> Vec<[f32; 3]> {
    let n = NEAR_GRID_LINES;
    let mut lines = Vec::with_capacity(((n + 1) * 4) as usize);
    for i in 0..=n {
        let t = -1.0 + 2.0 * i as f32 / n as f32;
        lines.push([t, -1.0, -1.0]);
        lines.push([t, 1.0, -1.0]);
        lines.push([-1.0, t, -1.0]);
        lines.push([1.0, t, -1.0]);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_gl_to_wgpu_remaps_depth_only() {
        let near = GL_TO_WGPU.project_point3(Vec3::new(0.3, -0.7, -1.0));
        assert!(near.abs_diff_eq(Vec3::new(0.3, -0.7, 0.0), 1e-6));
        let far = GL_TO_WGPU.project_point3(Vec3::new(0.0, 0.0, 1.0));
        assert!(far.abs_diff_eq(Vec3::new(0.0, 0.0, 1.0), 1e-6));
    }

    #[test]
    fn test_draw_uniforms_fill_a_slot() {
        assert_eq!(std::mem::size_of::<DrawUniforms>() as u64, UNIFORM_STRIDE);
    }

    #[test]
    fn test_frustum_cube_has_twelve_edges() {
        let lines = frustum_cube_lines();
        assert_eq!(lines.len(), 24);
        // Every edge has unit half-length per axis and spans exactly one axis.
        for pair in lines.chunks_exact(2) {
            let differing = (0..3).filter(|&i| pair[0][i] != pair[1][i]).count();
            assert_eq!(differing, 1);
        }
    }

    #[test]
    fn test_near_grid_lies_on_near_face() {
        assert!(near_plane_grid_lines().iter().all(|v| v[2] == -1.0));
    }
}
