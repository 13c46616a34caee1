//! Scene entities and the per-frame draw list.

use std::path::Path;

use glam::{Mat4, Quat, Vec3, Vec4};

use crate::mesh::{self, MeshCache, MeshHandle};
use crate::texture::{TextureCache, TextureHandle};

/// Transform component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position_scale(position: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            scale,
            ..Default::default()
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// Surface inputs of the geometry pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub diffuse: TextureHandle,
    /// Multiplies the sampled diffuse color; alpha is ignored.
    pub tint: Vec4,
    /// rgb = specular color, a = glossiness weight.
    pub specular: Vec4,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse: TextureCache::WHITE,
            tint: Vec4::ONE,
            specular: Vec4::new(1.0, 1.0, 1.0, 0.5),
        }
    }
}

/// Identifies this entity as a mesh to render.
#[derive(Debug, Clone, Copy)]
pub struct MeshRenderer {
    pub mesh: MeshHandle,
    pub material: Material,
}

/// Replaces the material's specular color and glossiness weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecularOverride(pub Vec4);

/// One entry of the draw list handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub mesh: MeshHandle,
    pub transform: Mat4,
    pub material: Material,
    pub specular_override: Option<Vec4>,
}

impl DrawItem {
    /// Specular written to the G-buffer.
    pub fn specular(&self) -> Vec4 {
        self.specular_override.unwrap_or(self.material.specular)
    }
}

pub struct SceneWorld {
    pub world: hecs::World,
}

impl Default for SceneWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneWorld {
    pub fn new() -> Self {
        Self {
            world: hecs::World::new(),
        }
    }

    pub fn spawn_mesh(
        &mut self,
        transform: Transform,
        mesh: MeshHandle,
        material: Material,
    ) -> hecs::Entity {
        self.world.spawn((transform, MeshRenderer { mesh, material }))
    }

    pub fn draw_list(&self) -> Vec<DrawItem> {
        self.world
            .query::<(&Transform, &MeshRenderer, Option<&SpecularOverride>)>()
            .iter()
            .map(|(_, (transform, renderer, specular))| DrawItem {
                mesh: renderer.mesh,
                transform: transform.matrix(),
                material: renderer.material,
                specular_override: specular.map(|s| s.0),
            })
            .collect()
    }
}

/// Leaf-like card texture: opaque discs on a transparent background.
pub fn cutout_texture(size: u32) -> image::RgbaImage {
    let size = size.max(4);
    let cell = size as f32 / 4.0;
    let radius = cell * 0.45;
    image::RgbaImage::from_fn(size, size, |x, y| {
        let fx = x as f32 + 0.5;
        let fy = y as f32 + 0.5;
        let cx = (fx / cell).floor() * cell + cell * 0.5;
        let cy = (fy / cell).floor() * cell + cell * 0.5;
        let d = ((fx - cx).powi(2) + (fy - cy).powi(2)).sqrt();
        if d <= radius {
            let shade = (255.0 * (0.6 + 0.4 * (1.0 - d / radius))) as u8;
            image::Rgba([shade, shade, shade, 255])
        } else {
            image::Rgba([0, 0, 0, 0])
        }
    })
}

/// Ground quad, a floating box occluder, a few props and a cutout foliage
/// card.
///
/// `ground_texture` replaces the ground's plain white diffuse. A file that
/// cannot be loaded leaves the ground transparent.
pub fn build_demo_scene(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    meshes: &mut MeshCache,
    textures: &mut TextureCache,
    ground_texture: Option<&Path>,
) -> SceneWorld {
    let cube = meshes.add(device, "cube", &mesh::cube_data());
    let plane = meshes.add(device, "plane", &mesh::plane_data());
    let card = meshes.add(device, "card", &mesh::card_data());
    let leaves = textures.add_rgba(device, queue, "leaves", &cutout_texture(64));
    let ground = ground_texture
        .map(|path| textures.load(device, queue, path))
        .unwrap_or(TextureCache::WHITE);

    let mut scene = SceneWorld::new();

    scene.spawn_mesh(
        Transform::from_position_scale(Vec3::ZERO, Vec3::new(20.0, 1.0, 20.0)),
        plane,
        Material {
            diffuse: ground,
            tint: Vec4::new(0.75, 0.75, 0.72, 1.0),
            specular: Vec4::new(0.5, 0.5, 0.5, 0.25),
            ..Default::default()
        },
    );

    scene.spawn_mesh(
        Transform::from_position_scale(Vec3::new(0.0, 1.5, 0.0), Vec3::new(2.0, 1.0, 2.0)),
        cube,
        Material {
            tint: Vec4::new(0.8, 0.35, 0.3, 1.0),
            ..Default::default()
        },
    );

    let props = [
        (Vec3::new(3.5, 0.5, 2.0), Vec3::ONE, Vec4::new(0.3, 0.5, 0.8, 1.0)),
        (Vec3::new(-3.0, 0.75, 2.5), Vec3::splat(1.5), Vec4::new(0.85, 0.8, 0.4, 1.0)),
        (Vec3::new(2.5, 1.0, -3.0), Vec3::new(0.75, 2.0, 0.75), Vec4::new(0.6, 0.6, 0.65, 1.0)),
    ];
    for (position, scale, tint) in props {
        scene.spawn_mesh(
            Transform::from_position_scale(position, scale),
            cube,
            Material {
                tint,
                ..Default::default()
            },
        );
    }

    // Polished pillar: per-entity specular override
    let pillar = scene.spawn_mesh(
        Transform::from_position_scale(Vec3::new(-4.5, 1.25, -1.0), Vec3::new(0.6, 2.5, 0.6)),
        cube,
        Material::default(),
    );
    if let Err(e) = scene
        .world
        .insert_one(pillar, SpecularOverride(Vec4::new(1.0, 1.0, 1.0, 1.0)))
    {
        tracing::warn!("Failed to add specular override to pillar: {}", e);
    }

    for (i, x) in [-2.0f32, -1.2].into_iter().enumerate() {
        scene.spawn_mesh(
            Transform {
                position: Vec3::new(x, 1.0, -3.5),
                rotation: Quat::from_rotation_y(0.4 + i as f32 * 0.9),
                scale: Vec3::splat(2.0),
            },
            card,
            Material {
                diffuse: leaves,
                tint: Vec4::new(0.35, 0.75, 0.3, 1.0),
                specular: Vec4::new(0.2, 0.3, 0.2, 0.1),
            },
        );
    }

    tracing::info!("Demo scene: {} entities", scene.world.len());
    scene
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specular_override_takes_precedence() {
        let material = Material::default();
        let mut item = DrawItem {
            mesh: MeshHandle(0),
            transform: Mat4::IDENTITY,
            material,
            specular_override: None,
        };
        assert_eq!(item.specular(), material.specular);
        item.specular_override = Some(Vec4::new(0.1, 0.2, 0.3, 0.4));
        assert_eq!(item.specular(), Vec4::new(0.1, 0.2, 0.3, 0.4));
    }

    #[test]
    fn test_draw_list_collects_meshes() {
        let mut scene = SceneWorld::new();
        scene.spawn_mesh(
            Transform::from_position_scale(Vec3::new(1.0, 2.0, 3.0), Vec3::splat(2.0)),
            MeshHandle(4),
            Material::default(),
        );
        let e = scene.spawn_mesh(Transform::default(), MeshHandle(5), Material::default());
        scene
            .world
            .insert_one(e, SpecularOverride(Vec4::ONE))
            .unwrap();
        // Entities without a MeshRenderer are not drawn
        scene.world.spawn((Transform::default(),));

        let draws = scene.draw_list();
        assert_eq!(draws.len(), 2);
        let moved = draws.iter().find(|d| d.mesh == MeshHandle(4)).unwrap();
        assert_eq!(
            moved.transform.transform_point3(Vec3::ZERO),
            Vec3::new(1.0, 2.0, 3.0)
        );
        assert_eq!(moved.specular_override, None);
        let glossy = draws.iter().find(|d| d.mesh == MeshHandle(5)).unwrap();
        assert_eq!(glossy.specular_override, Some(Vec4::ONE));
    }

    #[test]
    fn test_cutout_texture_has_holes() {
        let img = cutout_texture(64);
        let opaque = img.pixels().filter(|p| p.0[3] == 255).count();
        let clear = img.pixels().filter(|p| p.0[3] == 0).count();
        assert!(opaque > 0);
        assert!(clear > 0);
        assert!(img.pixels().all(|p| p.0[3] == 0 || p.0[3] == 255));
        // Disc centers are opaque, cell corners transparent
        assert_eq!(img.get_pixel(8, 8).0[3], 255);
        assert_eq!(img.get_pixel(0, 0).0[3], 0);
    }
}
