use crate::attachment::{Framebuffer, LoadPolicy};
use crate::camera::CameraState;
use crate::draw::DrawUniformPool;
use crate::mesh::{MeshCache, Vertex3D};
use crate::scene::DrawItem;
use crate::shader::{ShaderAsset, ShaderLibrary};
use crate::texture::TextureCache;

use super::{opaque_target, GBUFFER_DEPTH};

/// Rasterizes the draw list into the G-buffer.
pub struct GeometryPass {
    pipeline: wgpu::RenderPipeline,
}

impl GeometryPass {
    pub fn new(
        device: &wgpu::Device,
        shaders: &ShaderLibrary,
        gbuffer: &Framebuffer,
        camera_layout: &wgpu::BindGroupLayout,
        draw_layout: &wgpu::BindGroupLayout,
        texture_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let shader_module = shaders.create_module(device, ShaderAsset::GBuffer);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Geometry Pipeline Layout"),
            bind_group_layouts: &[camera_layout, draw_layout, texture_layout],
            push_constant_ranges: &[],
        });

        let targets: Vec<Option<wgpu::ColorTargetState>> = gbuffer
            .color_attachments()
            .iter()
            .map(|attachment| opaque_target(attachment.format()))
            .collect();

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Geometry Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader_module,
                entry_point: Some("vs_main"),
                buffers: &[Vertex3D::desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader_module,
                entry_point: Some("fs_main"),
                targets: &targets,
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: GBUFFER_DEPTH.format,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self { pipeline }
    }

    /// Clear the G-buffer and draw the first `draw_count` items of `draws`.
    #[allow(clippy::too_many_arguments)]
    pub fn execute(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        gbuffer: &Framebuffer,
        camera: &CameraState,
        draw_pool: &DrawUniformPool,
        draws: &[DrawItem],
        draw_count: usize,
        meshes: &MeshCache,
        textures: &TextureCache,
    ) {
        let mut render_pass = gbuffer.bind(encoder, "geometry_pass", LoadPolicy::Clear);
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &camera.bind_group, &[]);

        for (draw_index, item) in draws.iter().take(draw_count).enumerate() {
            let Some(gpu_mesh) = meshes.get(item.mesh) else {
                tracing::warn!("Draw {} references unknown mesh {:?}", draw_index, item.mesh);
                continue;
            };
            render_pass.set_bind_group(
                1,
                &draw_pool.bind_group,
                &[DrawUniformPool::dynamic_offset(draw_index)],
            );
            render_pass.set_bind_group(2, textures.bind_group(item.material.diffuse), &[]);
            gpu_mesh.draw(&mut render_pass, 0..1);
        }
    }
}
