//! Per-draw uniforms, packed into one buffer and addressed with dynamic
//! offsets.

use glam::{Mat3, Mat4};

use crate::scene::DrawItem;

/// Stride between draws; the minimum uniform offset alignment wgpu allows
/// on every backend.
pub const DRAW_UNIFORM_SIZE: u64 = 256;

pub const MAX_DRAWS: usize = 1024;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniforms {
    pub model: [[f32; 4]; 4],         // offset 0
    pub normal_matrix: [[f32; 4]; 4], // offset 64
    pub tint: [f32; 4],               // offset 128
    pub specular: [f32; 4],           // offset 144 → 160
}

impl DrawUniforms {
    pub fn from_item(item: &DrawItem) -> Self {
        Self {
            model: item.transform.to_cols_array_2d(),
            normal_matrix: normal_matrix(item.transform).to_cols_array_2d(),
            tint: item.material.tint.to_array(),
            specular: item.specular().to_array(),
        }
    }
}

/// Inverse-transpose of the upper 3×3, widened back to a mat4.
pub fn normal_matrix(model: Mat4) -> Mat4 {
    Mat4::from_mat3(Mat3::from_mat4(model).inverse().transpose())
}

pub struct DrawUniformPool {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl DrawUniformPool {
    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw Uniform Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<DrawUniforms>() as u64
                    ),
                },
                count: None,
            }],
        });

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Uniform Pool"),
            size: DRAW_UNIFORM_SIZE * MAX_DRAWS as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw Uniform Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniforms>() as u64),
                }),
            }],
        });

        Self {
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Write uniforms for the first [`MAX_DRAWS`] items. Returns how many
    /// were written; the rest are not drawn this frame.
    pub fn upload(&self, queue: &wgpu::Queue, draws: &[DrawItem]) -> usize {
        if draws.len() > MAX_DRAWS {
            tracing::warn!(
                "Draw list has {} items, only the first {} are drawn",
                draws.len(),
                MAX_DRAWS
            );
        }
        let count = draws.len().min(MAX_DRAWS);
        for (index, item) in draws.iter().take(count).enumerate() {
            queue.write_buffer(
                &self.buffer,
                Self::offset(index),
                bytemuck::cast_slice(&[DrawUniforms::from_item(item)]),
            );
        }
        count
    }

    pub fn offset(index: usize) -> u64 {
        index as u64 * DRAW_UNIFORM_SIZE
    }

    pub fn dynamic_offset(index: usize) -> u32 {
        Self::offset(index) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::MeshHandle;
    use crate::scene::Material;
    use glam::{Vec3, Vec4};

    #[test]
    fn test_uniform_size_fits_stride() {
        assert_eq!(std::mem::size_of::<DrawUniforms>(), 160);
        assert!(std::mem::size_of::<DrawUniforms>() as u64 <= DRAW_UNIFORM_SIZE);
        assert_eq!(DrawUniformPool::dynamic_offset(3), 768);
    }

    #[test]
    fn test_normal_matrix_under_non_uniform_scale() {
        let model = Mat4::from_scale(Vec3::new(4.0, 1.0, 1.0));
        let n = normal_matrix(model);
        // A 45° surface stretched along x must tilt its normal toward +y.
        let normal = n.transform_vector3(Vec3::new(1.0, 1.0, 0.0)).normalize();
        let tangent = model.transform_vector3(Vec3::new(1.0, -1.0, 0.0));
        assert!(normal.dot(tangent).abs() < 1e-5);
        assert!(normal.y > normal.x);
    }

    #[test]
    fn test_from_item_uses_override() {
        let item = DrawItem {
            mesh: MeshHandle(0),
            transform: Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
            material: Material {
                tint: Vec4::new(0.5, 0.25, 1.0, 1.0),
                ..Default::default()
            },
            specular_override: Some(Vec4::new(0.0, 1.0, 0.0, 0.75)),
        };
        let uniforms = DrawUniforms::from_item(&item);
        assert_eq!(uniforms.specular, [0.0, 1.0, 0.0, 0.75]);
        assert_eq!(uniforms.tint, [0.5, 0.25, 1.0, 1.0]);
        assert_eq!(uniforms.model[3], [1.0, 2.0, 3.0, 1.0]);
        // Translation does not reach the normal matrix
        assert_eq!(uniforms.normal_matrix[3], [0.0, 0.0, 0.0, 1.0]);
    }
}
