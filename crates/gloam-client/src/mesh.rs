use wgpu::util::DeviceExt;

/// 3D vertex for mesh rendering.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3D {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex3D {
    const ATTRIBS: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    const POSITION_ATTRIBS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex3D>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }

    /// Same buffer, position attribute only (shadow pass, light volumes).
    pub fn position_only_desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex3D>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::POSITION_ATTRIBS,
        }
    }
}

/// CPU-side geometry before upload.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex3D>,
    pub indices: Vec<u32>,
}

impl MeshData {
    fn push_quad(&mut self, corners: [[f32; 3]; 4], normal: [f32; 3]) {
        let base = self.vertices.len() as u32;
        let uvs = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];
        for (position, tex_coords) in corners.into_iter().zip(uvs) {
            self.vertices.push(Vertex3D {
                position,
                normal,
                tex_coords,
            });
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}

/// Unit cube centered on the origin, CCW faces pointing outward.
pub fn cube_data() -> MeshData {
    let mut mesh = MeshData::default();
    #[rustfmt::skip]
    let faces: [([[f32; 3]; 4], [f32; 3]); 6] = [
        ([[-0.5, -0.5,  0.5], [ 0.5, -0.5,  0.5], [ 0.5,  0.5,  0.5], [-0.5,  0.5,  0.5]], [ 0.0,  0.0,  1.0]),
        ([[ 0.5, -0.5, -0.5], [-0.5, -0.5, -0.5], [-0.5,  0.5, -0.5], [ 0.5,  0.5, -0.5]], [ 0.0,  0.0, -1.0]),
        ([[-0.5,  0.5,  0.5], [ 0.5,  0.5,  0.5], [ 0.5,  0.5, -0.5], [-0.5,  0.5, -0.5]], [ 0.0,  1.0,  0.0]),
        ([[-0.5, -0.5, -0.5], [ 0.5, -0.5, -0.5], [ 0.5, -0.5,  0.5], [-0.5, -0.5,  0.5]], [ 0.0, -1.0,  0.0]),
        ([[ 0.5, -0.5,  0.5], [ 0.5, -0.5, -0.5], [ 0.5,  0.5, -0.5], [ 0.5,  0.5,  0.5]], [ 1.0,  0.0,  0.0]),
        ([[-0.5, -0.5, -0.5], [-0.5, -0.5,  0.5], [-0.5,  0.5,  0.5], [-0.5,  0.5, -0.5]], [-1.0,  0.0,  0.0]),
    ];
    for (corners, normal) in faces {
        mesh.push_quad(corners, normal);
    }
    mesh
}

/// Unit quad in the XZ plane facing +Y.
pub fn plane_data() -> MeshData {
    let mut mesh = MeshData::default();
    mesh.push_quad(
        [
            [-0.5, 0.0, 0.5],
            [0.5, 0.0, 0.5],
            [0.5, 0.0, -0.5],
            [-0.5, 0.0, -0.5],
        ],
        [0.0, 1.0, 0.0],
    );
    mesh
}

/// Unit quad in the XY plane, visible from both sides (foliage cards).
pub fn card_data() -> MeshData {
    let mut mesh = MeshData::default();
    mesh.push_quad(
        [
            [-0.5, -0.5, 0.0],
            [0.5, -0.5, 0.0],
            [0.5, 0.5, 0.0],
            [-0.5, 0.5, 0.0],
        ],
        [0.0, 0.0, 1.0],
    );
    mesh.push_quad(
        [
            [0.5, -0.5, 0.0],
            [-0.5, -0.5, 0.0],
            [-0.5, 0.5, 0.0],
            [0.5, 0.5, 0.0],
        ],
        [0.0, 0.0, -1.0],
    );
    mesh
}

/// UV sphere of radius 1. Used as the point-light volume.
pub fn sphere_data(rings: u32, sectors: u32) -> MeshData {
    let rings = rings.max(2);
    let sectors = sectors.max(3);
    let mut mesh = MeshData::default();

    for ring in 0..=rings {
        let theta = std::f32::consts::PI * ring as f32 / rings as f32;
        let (sin_theta, cos_theta) = theta.sin_cos();
        for sector in 0..=sectors {
            let phi = std::f32::consts::TAU * sector as f32 / sectors as f32;
            let (sin_phi, cos_phi) = phi.sin_cos();
            let n = [sin_theta * cos_phi, cos_theta, sin_theta * sin_phi];
            mesh.vertices.push(Vertex3D {
                position: n,
                normal: n,
                tex_coords: [sector as f32 / sectors as f32, ring as f32 / rings as f32],
            });
        }
    }

    for ring in 0..rings {
        for sector in 0..sectors {
            let curr_row = ring * (sectors + 1);
            let next_row = (ring + 1) * (sectors + 1);

            // CCW winding when viewed from outside the sphere
            mesh.indices.push(curr_row + sector);
            mesh.indices.push(next_row + sector + 1);
            mesh.indices.push(next_row + sector);

            mesh.indices.push(curr_row + sector);
            mesh.indices.push(curr_row + sector + 1);
            mesh.indices.push(next_row + sector + 1);
        }
    }
    mesh
}

/// An uploaded mesh.
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl GpuMesh {
    pub fn upload(device: &wgpu::Device, label: &str, data: &MeshData) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Mesh VB: {}", label)),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Mesh IB: {}", label)),
            contents: bytemuck::cast_slice(&data.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        tracing::debug!(
            "Uploaded mesh '{}': {} verts, {} indices",
            label,
            data.vertices.len(),
            data.indices.len()
        );
        Self {
            vertex_buffer,
            index_buffer,
            index_count: data.indices.len() as u32,
        }
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, instances: std::ops::Range<u32>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, instances);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub usize);

/// Meshes uploaded for the scene, addressed by handle.
#[derive(Default)]
pub struct MeshCache {
    meshes: Vec<GpuMesh>,
}

impl MeshCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, device: &wgpu::Device, label: &str, data: &MeshData) -> MeshHandle {
        let handle = MeshHandle(self.meshes.len());
        self.meshes.push(GpuMesh::upload(device, label, data));
        handle
    }

    pub fn get(&self, handle: MeshHandle) -> Option<&GpuMesh> {
        self.meshes.get(handle.0)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn assert_outward_ccw(mesh: &MeshData) {
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [0, 1, 2].map(|i| &mesh.vertices[tri[i] as usize]);
            let face = (Vec3::from(b.position) - Vec3::from(a.position))
                .cross(Vec3::from(c.position) - Vec3::from(a.position));
            if face.length_squared() < 1e-12 {
                continue; // degenerate pole triangle
            }
            assert!(
                face.dot(Vec3::from(a.normal)) > 0.0,
                "triangle {:?} winds against its normal",
                tri
            );
        }
    }

    #[test]
    fn test_vertex_size() {
        assert_eq!(std::mem::size_of::<Vertex3D>(), 32);
    }

    #[test]
    fn test_cube_winding() {
        let cube = cube_data();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        assert_outward_ccw(&cube);
    }

    #[test]
    fn test_plane_and_card_winding() {
        assert_outward_ccw(&plane_data());
        let card = card_data();
        assert_eq!(card.indices.len(), 12);
        assert_outward_ccw(&card);
    }

    #[test]
    fn test_sphere_is_unit_and_outward() {
        let sphere = sphere_data(16, 24);
        for v in &sphere.vertices {
            assert!((Vec3::from(v.position).length() - 1.0).abs() < 1e-5);
        }
        assert!(sphere
            .indices
            .iter()
            .all(|&i| (i as usize) < sphere.vertices.len()));
        assert_outward_ccw(&sphere);
    }
}
