use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::attachment::{Framebuffer, LoadPolicy};
use crate::draw::DrawUniformPool;
use crate::mesh::{MeshCache, Vertex3D};
use crate::scene::DrawItem;
use crate::shader::{ShaderAsset, ShaderLibrary};

use super::SHADOW_DEPTH;

/// Shadow pass uniforms (light view-projection matrix).
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShadowUniforms {
    pub light_space: [[f32; 4]; 4],
}

/// Depth-only render of the draw list from the directional light.
pub struct ShadowPass {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl ShadowPass {
    pub fn new(
        device: &wgpu::Device,
        shaders: &ShaderLibrary,
        draw_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let shader_module = shaders.create_module(device, ShaderAsset::ShadowDepth);

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shadow Uniform Layout"),
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

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Shadow Uniform Buffer"),
            contents: bytemuck::cast_slice(&[ShadowUniforms {
                light_space: Mat4::IDENTITY.to_cols_array_2d(),
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Shadow Uniform Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Shadow Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout, draw_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Shadow Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader_module,
                entry_point: Some("vs_main"),
                buffers: &[Vertex3D::position_only_desc()],
                compilation_options: Default::default(),
            },
            // Depth only
            fragment: None,
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: SHADOW_DEPTH.format,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            uniform_buffer,
            bind_group,
        }
    }

    pub fn update(&self, queue: &wgpu::Queue, light_space: Mat4) {
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::cast_slice(&[ShadowUniforms {
                light_space: light_space.to_cols_array_2d(),
            }]),
        );
    }

    /// Clear the shadow map and, when `cast_shadows` is set, draw the
    /// first `draw_count` items into it.
    pub fn execute(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        shadow_map: &Framebuffer,
        draw_pool: &DrawUniformPool,
        draws: &[DrawItem],
        draw_count: usize,
        meshes: &MeshCache,
        cast_shadows: bool,
    ) {
        let mut render_pass = shadow_map.bind(encoder, "shadow_pass", LoadPolicy::Clear);
        if !cast_shadows {
            return;
        }
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);

        for (draw_index, item) in draws.iter().take(draw_count).enumerate() {
            let Some(gpu_mesh) = meshes.get(item.mesh) else {
                continue;
            };
            render_pass.set_bind_group(
                1,
                &draw_pool.bind_group,
                &[DrawUniformPool::dynamic_offset(draw_index)],
            );
            gpu_mesh.draw(&mut render_pass, 0..1);
        }
    }
}
