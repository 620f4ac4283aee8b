use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use std::collections::HashMap;
use std::num::NonZeroU64;
use wgpu::util::DeviceExt;

use super::{linear_color, DEPTH_FORMAT};
use crate::viewer::{DrawKey, DrawKind, SceneDraw};

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct FrameUniform {
    view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct DrawUniform {
    model: [[f32; 4]; 4],
    color: [f32; 4],
}

const DRAW_UNIFORM_SIZE: u64 = std::mem::size_of::<DrawUniform>() as u64;

struct ScenePipelines {
    opaque_triangles: wgpu::RenderPipeline,
    translucent_triangles: wgpu::RenderPipeline,
    lines: wgpu::RenderPipeline,
    draw_bgl: wgpu::BindGroupLayout,
    frame_bind_group: wgpu::BindGroup,
    frame_buffer: wgpu::Buffer,
    format: wgpu::TextureFormat,
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    vertex_count: usize,
    index_count: u32,
}

/// Draws flat-colored triangle and line geometry. Vertex and index buffers are
/// cached per [`DrawKey`]; per-draw uniforms live in one buffer addressed by
/// dynamic offsets.
#[derive(Default)]
pub struct ScenePass {
    resources: Option<ScenePipelines>,
    meshes: HashMap<DrawKey, GpuMesh>,
    draw_buffer: Option<wgpu::Buffer>,
    draw_bind_group: Option<wgpu::BindGroup>,
    draw_capacity: usize,
    draw_stride: u64,
    staging: Vec<u8>,
}

pub struct ScenePassParams<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color_view: &'a wgpu::TextureView,
    pub depth_view: &'a wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    pub view_proj: Mat4,
    pub draws: &'a [SceneDraw<'a>],
    pub clear_color: [f32; 3],
}

impl ScenePass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, params: ScenePassParams<'_>) -> Result<()> {
        let ScenePassParams { device, queue, encoder, color_view, depth_view, format, view_proj, draws, clear_color } =
            params;
        self.ensure_resources(device, format);
        self.ensure_draw_capacity(device, draws.len())?;

        let resources = self.resources.as_ref().context("Scene pipelines missing")?;
        let frame = FrameUniform { view_proj: view_proj.to_cols_array_2d() };
        queue.write_buffer(&resources.frame_buffer, 0, bytemuck::bytes_of(&frame));

        let srgb_target = format.is_srgb();
        self.staging.clear();
        for draw in draws {
            let color = if srgb_target { linear_color(draw.color) } else { draw.color };
            let uniform = DrawUniform { model: draw.model.to_cols_array_2d(), color };
            self.staging.extend_from_slice(bytemuck::bytes_of(&uniform));
            self.staging.resize(self.staging.len() + (self.draw_stride - DRAW_UNIFORM_SIZE) as usize, 0);
        }
        let draw_buffer = self.draw_buffer.as_ref().context("Scene draw buffer missing")?;
        if !self.staging.is_empty() {
            queue.write_buffer(draw_buffer, 0, &self.staging);
        }

        for draw in draws {
            upload_mesh(&mut self.meshes, device, draw);
        }

        let [r, g, b] = if srgb_target { linear_rgb(clear_color) } else { clear_color };
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color { r: r as f64, g: g as f64, b: b as f64, a: 1.0 }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations { load: wgpu::LoadOp::Clear(1.0), store: wgpu::StoreOp::Store }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_bind_group(0, &resources.frame_bind_group, &[]);
        let draw_bind_group = self.draw_bind_group.as_ref().context("Scene draw bind group missing")?;

        for (slot, draw) in draws.iter().enumerate() {
            let Some(mesh) = self.meshes.get(&draw.key) else {
                continue;
            };
            let pipeline = match (draw.kind, draw.translucent) {
                (DrawKind::Lines, _) => &resources.lines,
                (DrawKind::Triangles, true) => &resources.translucent_triangles,
                (DrawKind::Triangles, false) => &resources.opaque_triangles,
            };
            let offset = (slot as u64 * self.draw_stride) as u32;
            pass.set_pipeline(pipeline);
            pass.set_bind_group(1, draw_bind_group, &[offset]);
            pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
        Ok(())
    }

    fn ensure_resources(&mut self, device: &wgpu::Device, format: wgpu::TextureFormat) {
        if self.resources.as_ref().is_some_and(|resources| resources.format == format) {
            return;
        }
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Flat Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../assets/shaders/flat.wgsl").into()),
        });

        let frame_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Frame BGL"),
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
        let draw_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Draw BGL"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(DRAW_UNIFORM_SIZE),
                },
                count: None,
            }],
        });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&frame_bgl, &draw_bgl],
            push_constant_ranges: &[],
        });

        let build = |label: &str, topology: wgpu::PrimitiveTopology, translucent: bool| {
            let blend = if translucent { wgpu::BlendState::ALPHA_BLENDING } else { wgpu::BlendState::REPLACE };
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<[f32; 3]>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![0 => Float32x3],
                    }],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(blend),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: !translucent,
                    depth_compare: wgpu::CompareFunction::LessEqual,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };
        let opaque_triangles = build("Scene Opaque Pipeline", wgpu::PrimitiveTopology::TriangleList, false);
        let translucent_triangles =
            build("Scene Translucent Pipeline", wgpu::PrimitiveTopology::TriangleList, true);
        let lines = build("Scene Line Pipeline", wgpu::PrimitiveTopology::LineList, false);

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Frame Buffer"),
            size: std::mem::size_of::<FrameUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Frame BG"),
            layout: &frame_bgl,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: frame_buffer.as_entire_binding() }],
        });

        self.draw_stride = draw_stride(device.limits().min_uniform_buffer_offset_alignment as u64);
        self.resources = Some(ScenePipelines {
            opaque_triangles,
            translucent_triangles,
            lines,
            draw_bgl,
            frame_bind_group,
            frame_buffer,
            format,
        });
        self.draw_buffer = None;
        self.draw_bind_group = None;
        self.draw_capacity = 0;
        tracing::debug!(?format, stride = self.draw_stride, "Scene pipelines created");
    }

    fn ensure_draw_capacity(&mut self, device: &wgpu::Device, draws: usize) -> Result<()> {
        if self.draw_buffer.is_some() && draws <= self.draw_capacity {
            return Ok(());
        }
        let resources = self.resources.as_ref().context("Scene pipelines missing")?;
        let capacity = draws.max(1).next_power_of_two().max(self.draw_capacity);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Draw Buffer"),
            size: capacity as u64 * self.draw_stride,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Draw BG"),
            layout: &resources.draw_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(DRAW_UNIFORM_SIZE),
                }),
            }],
        });
        self.draw_buffer = Some(buffer);
        self.draw_bind_group = Some(bind_group);
        self.draw_capacity = capacity;
        Ok(())
    }
}

fn upload_mesh(meshes: &mut HashMap<DrawKey, GpuMesh>, device: &wgpu::Device, draw: &SceneDraw<'_>) {
    if draw.positions.is_empty() || draw.indices.is_empty() {
        return;
    }
    let fresh = meshes
        .get(&draw.key)
        .is_some_and(|mesh| mesh.vertex_count == draw.positions.len() && mesh.index_count as usize == draw.indices.len());
    if fresh {
        return;
    }
    let vertices: Vec<[f32; 3]> = draw.positions.iter().map(Vec3::to_array).collect();
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Scene Vertex Buffer"),
        contents: bytemuck::cast_slice(&vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Scene Index Buffer"),
        contents: bytemuck::cast_slice(draw.indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    meshes.insert(
        draw.key,
        GpuMesh {
            vertex_buffer,
            index_buffer,
            vertex_count: draw.positions.len(),
            index_count: draw.indices.len() as u32,
        },
    );
}

/// Per-draw uniform stride rounded up to the device's dynamic offset alignment.
fn draw_stride(alignment: u64) -> u64 {
    let alignment = alignment.max(1);
    DRAW_UNIFORM_SIZE.div_ceil(alignment) * alignment
}

fn linear_rgb([r, g, b]: [f32; 3]) -> [f32; 3] {
    let [r, g, b, _] = linear_color([r, g, b, 1.0]);
    [r, g, b]
}
