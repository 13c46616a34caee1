use gloam_core::DirectionalLight;
use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::attachment::{Framebuffer, LoadPolicy};
use crate::camera::CameraState;
use crate::shader::{ShaderAsset, ShaderLibrary};

use super::{opaque_target, LIGHTING_OUTPUT};

/// Light, shadow and material parameters of the directional pass.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DirectionalUniforms {
    pub light_space: [[f32; 4]; 4], // offset 0
    pub light_position: [f32; 3],   // offset 64
    pub linear: f32,                // offset 76
    pub light_color: [f32; 3],      // offset 80
    pub quadratic: f32,             // offset 92
    pub glossiness: f32,            // offset 96
    pub shadow_texel: f32,          // offset 100
    pub shadows_enabled: u32,       // offset 104
    pub _pad: u32,                  // offset 108 → 112
}

impl DirectionalUniforms {
    pub fn new(
        light: &DirectionalLight,
        light_space: Mat4,
        glossiness: f32,
        shadow_resolution: u32,
        shadows_enabled: bool,
    ) -> Self {
        Self {
            light_space: light_space.to_cols_array_2d(),
            light_position: light.position.to_array(),
            linear: light.linear,
            light_color: light.color.to_array(),
            quadratic: light.quadratic,
            glossiness,
            shadow_texel: 1.0 / shadow_resolution.max(1) as f32,
            shadows_enabled: shadows_enabled as u32,
            _pad: 0,
        }
    }
}

/// Fullscreen Blinn-Phong + PCF pass writing the lighting output.
pub struct DirectionalPass {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl DirectionalPass {
    /// The shadow map is fixed-size, so the bind group built here stays
    /// valid across window resizes.
    pub fn new(
        device: &wgpu::Device,
        shaders: &ShaderLibrary,
        camera_layout: &wgpu::BindGroupLayout,
        gbuffer_layout: &wgpu::BindGroupLayout,
        shadow_view: &wgpu::TextureView,
        shadow_resolution: u32,
    ) -> Self {
        let shader_module = shaders.create_module(device, ShaderAsset::DirectionalLight);

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Directional Light Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
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
            ],
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Directional Uniform Buffer"),
            contents: bytemuck::cast_slice(&[DirectionalUniforms::new(
                &DirectionalLight::default(),
                Mat4::IDENTITY,
                1.0,
                shadow_resolution,
                false,
            )]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        // One binary visibility test per tap: LessEqual, nearest, no wrap
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Comparison Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Directional Light Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(shadow_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&shadow_sampler),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Directional Light Pipeline Layout"),
            bind_group_layouts: &[camera_layout, gbuffer_layout, &bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Directional Light Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader_module,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader_module,
                entry_point: Some("fs_main"),
                targets: &[opaque_target(LIGHTING_OUTPUT.format)],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
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

    pub fn update(&self, queue: &wgpu::Queue, uniforms: &DirectionalUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[*uniforms]));
    }

    pub fn execute(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        output: &Framebuffer,
        camera: &CameraState,
        gbuffer_bind_group: &wgpu::BindGroup,
    ) {
        let mut render_pass = output.bind(encoder, "directional_lighting_pass", LoadPolicy::Clear);
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &camera.bind_group, &[]);
        render_pass.set_bind_group(1, gbuffer_bind_group, &[]);
        render_pass.set_bind_group(2, &self.bind_group, &[]);
        // Fullscreen triangle (3 vertices, no vertex buffer)
        render_pass.draw(0..3, 0..1);
    }
}
