use gloam_core::config::MAX_POINT_LIGHTS;
use gloam_core::PointLight;
use wgpu::util::DeviceExt;

use crate::attachment::{Framebuffer, LoadPolicy};
use crate::camera::CameraState;
use crate::mesh::{self, GpuMesh, Vertex3D};
use crate::shader::{ShaderAsset, ShaderLibrary};

use super::LIGHTING_OUTPUT;

const VOLUME_RINGS: u32 = 12;
const VOLUME_SECTORS: u32 = 16;

/// Per-instance light data, read as vertex attributes 1..=6.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointLightInstance {
    pub transform: [[f32; 4]; 4],
    pub color: [f32; 3],
    pub radius: f32,
}

impl PointLightInstance {
    const ATTRIBS: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
        1 => Float32x4,
        2 => Float32x4,
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x3,
        6 => Float32,
    ];

    pub fn from_light(light: &PointLight) -> Self {
        Self {
            transform: light.transform().to_cols_array_2d(),
            color: light.color.to_array(),
            radius: light.volume_scale(),
        }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PointLightInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBS,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointLightParams {
    pub glossiness: f32,
    pub intensity: f32,
    pub _pad: [f32; 2],
}

/// Instanced light volumes, additively blended onto the lighting output.
pub struct PointLightPass {
    pipeline: wgpu::RenderPipeline,
    wireframe_pipeline: Option<wgpu::RenderPipeline>,
    volume: GpuMesh,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    instance_count: u32,
    params_buffer: wgpu::Buffer,
    params_bind_group: wgpu::BindGroup,
}

fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Point Light Instances"),
        size: (capacity.max(1) * std::mem::size_of::<PointLightInstance>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

impl PointLightPass {
    /// `light_capacity` sizes the instance buffer, normally the light grid
    /// size. `wireframe_supported` gates the line-mode debug pipeline.
    pub fn new(
        device: &wgpu::Device,
        shaders: &ShaderLibrary,
        camera_layout: &wgpu::BindGroupLayout,
        gbuffer_layout: &wgpu::BindGroupLayout,
        light_capacity: usize,
        wireframe_supported: bool,
    ) -> Self {
        let shader_module = shaders.create_module(device, ShaderAsset::PointLight);

        let params_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Point Light Params Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Point Light Params"),
            contents: bytemuck::cast_slice(&[PointLightParams {
                glossiness: 1.0,
                intensity: 1.0,
                _pad: [0.0; 2],
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let params_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Point Light Params Bind Group"),
            layout: &params_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: params_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Point Light Pipeline Layout"),
            bind_group_layouts: &[camera_layout, gbuffer_layout, &params_layout],
            push_constant_ranges: &[],
        });

        let additive = Some(wgpu::ColorTargetState {
            format: LIGHTING_OUTPUT.format,
            blend: Some(wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            }),
            write_mask: wgpu::ColorWrites::ALL,
        });

        let create = |label: &str, fragment_entry: &str, polygon_mode: wgpu::PolygonMode, cull_mode| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader_module,
                    entry_point: Some("vs_main"),
                    buffers: &[Vertex3D::position_only_desc(), PointLightInstance::desc()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader_module,
                    entry_point: Some(fragment_entry),
                    targets: &[additive.clone()],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode,
                    polygon_mode,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        // Back faces only: still shades when the camera is inside a volume
        let pipeline = create(
            "Point Light Pipeline",
            "fs_main",
            wgpu::PolygonMode::Fill,
            Some(wgpu::Face::Front),
        );
        let wireframe_pipeline = wireframe_supported.then(|| {
            create(
                "Point Light Wireframe Pipeline",
                "fs_wireframe",
                wgpu::PolygonMode::Line,
                None,
            )
        });

        let instance_capacity = light_capacity.clamp(1, MAX_POINT_LIGHTS);
        let instance_buffer = create_instance_buffer(device, instance_capacity);
        let volume = GpuMesh::upload(
            device,
            "light_volume",
            &mesh::sphere_data(VOLUME_RINGS, VOLUME_SECTORS),
        );

        Self {
            pipeline,
            wireframe_pipeline,
            volume,
            instance_buffer,
            instance_capacity,
            instance_count: 0,
            params_buffer,
            params_bind_group,
        }
    }

    pub fn supports_wireframe(&self) -> bool {
        self.wireframe_pipeline.is_some()
    }

    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    /// Upload instance data for `lights`, growing the buffer when the light
    /// count exceeds its capacity.
    pub fn set_lights(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, lights: &[PointLight]) {
        if lights.len() > MAX_POINT_LIGHTS {
            tracing::warn!(
                "{} point lights exceed the maximum of {}, extra lights are dropped",
                lights.len(),
                MAX_POINT_LIGHTS
            );
        }
        let count = lights.len().min(MAX_POINT_LIGHTS);
        if count > self.instance_capacity {
            tracing::debug!(
                "Growing point light buffer {} -> {}",
                self.instance_capacity,
                count
            );
            self.instance_buffer = create_instance_buffer(device, count);
            self.instance_capacity = count;
        }
        let instances: Vec<PointLightInstance> = lights[..count]
            .iter()
            .map(PointLightInstance::from_light)
            .collect();
        if !instances.is_empty() {
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }
        self.instance_count = count as u32;
    }

    pub fn update(&self, queue: &wgpu::Queue, glossiness: f32, intensity: f32) {
        queue.write_buffer(
            &self.params_buffer,
            0,
            bytemuck::cast_slice(&[PointLightParams {
                glossiness,
                intensity,
                _pad: [0.0; 2],
            }]),
        );
    }

    /// Accumulate every light onto `output` without clearing it.
    pub fn execute(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        output: &Framebuffer,
        camera: &CameraState,
        gbuffer_bind_group: &wgpu::BindGroup,
        wireframe: bool,
    ) {
        let mut render_pass = output.bind(encoder, "point_lighting_pass", LoadPolicy::Preserve);
        if self.instance_count == 0 {
            return;
        }
        render_pass.set_bind_group(0, &camera.bind_group, &[]);
        render_pass.set_bind_group(1, gbuffer_bind_group, &[]);
        render_pass.set_bind_group(2, &self.params_bind_group, &[]);
        render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));

        render_pass.set_pipeline(&self.pipeline);
        self.volume.draw(&mut render_pass, 0..self.instance_count);

        if wireframe {
            if let Some(pipeline) = &self.wireframe_pipeline {
                render_pass.set_pipeline(pipeline);
                self.volume.draw(&mut render_pass, 0..self.instance_count);
            }
        }
    }
}
