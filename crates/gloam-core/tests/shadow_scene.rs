//! Shadow factor for a ground quad with a box hovering between it and the
//! directional light, using a ray-cast depth map in place of a rasterized
//! shadow pass.

use glam::{Mat4, Vec2, Vec3};

use gloam_core::shadow::{
    nearest_texel, pcf_shadow_factor, project_to_light_space, texel_center, DepthMap,
    ShadowProjection,
};

const LIGHT: Vec3 = Vec3::new(-2.5, 5.0, -1.25);
const RESOLUTION: u32 = 1024;
const GROUND_HALF_SIZE: f32 = 10.0;

struct Aabb {
    min: Vec3,
    max: Vec3,
}

impl Aabb {
    /// Entry parameter of the segment `origin + t·dir`, t in [0, 1].
    fn intersect(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        let mut t_min = 0.0f32;
        let mut t_max = 1.0f32;
        for axis in 0..3 {
            let o = origin[axis];
            let d = dir[axis];
            if d.abs() < 1e-9 {
                if o < self.min[axis] || o > self.max[axis] {
                    return None;
                }
                continue;
            }
            let t0 = (self.min[axis] - o) / d;
            let t1 = (self.max[axis] - o) / d;
            t_min = t_min.max(t0.min(t1));
            t_max = t_max.min(t0.max(t1));
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }
}

/// Depth map of a ground quad at y = 0 plus boxes, computed per lookup.
struct RaycastDepthMap {
    inverse_light_space: Mat4,
    boxes: Vec<Aabb>,
}

impl RaycastDepthMap {
    fn new(light_space: Mat4, boxes: Vec<Aabb>) -> Self {
        Self {
            inverse_light_space: light_space.inverse(),
            boxes,
        }
    }
}

impl DepthMap for RaycastDepthMap {
    fn resolution(&self) -> u32 {
        RESOLUTION
    }

    fn sample(&self, uv: Vec2) -> f32 {
        let (x, y) = nearest_texel(uv, RESOLUTION);
        let center = texel_center(x, y, RESOLUTION);
        let ndc = Vec2::new(center.x * 2.0 - 1.0, 1.0 - center.y * 2.0);

        // Orthographic: depth is linear in the segment parameter.
        let near = self.inverse_light_space.project_point3(ndc.extend(0.0));
        let far = self.inverse_light_space.project_point3(ndc.extend(1.0));
        let dir = far - near;

        let mut nearest = 1.0f32;
        if dir.y.abs() > 1e-9 {
            let t = -near.y / dir.y;
            let hit = near + dir * t;
            if (0.0..=1.0).contains(&t)
                && hit.x.abs() <= GROUND_HALF_SIZE
                && hit.z.abs() <= GROUND_HALF_SIZE
            {
                nearest = nearest.min(t);
            }
        }
        for aabb in &self.boxes {
            if let Some(t) = aabb.intersect(near, dir) {
                nearest = nearest.min(t);
            }
        }
        nearest
    }
}

fn scene() -> (Mat4, RaycastDepthMap) {
    let light_space = ShadowProjection::from_light_position(LIGHT).light_space();
    let occluder = Aabb {
        min: Vec3::new(-1.0, 1.0, -1.0),
        max: Vec3::new(1.0, 2.0, 1.0),
    };
    (light_space, RaycastDepthMap::new(light_space, vec![occluder]))
}

#[test]
fn test_point_below_box_is_shadowed() {
    let (light_space, map) = scene();
    let point = Vec3::ZERO;
    assert!(project_to_light_space(light_space, point).depth < 1.0);
    assert_eq!(pcf_shadow_factor(&map, light_space, point, Vec3::Y, LIGHT), 0.0);
}

#[test]
fn test_point_moved_laterally_is_lit() {
    let (light_space, map) = scene();
    let point = Vec3::new(5.0, 0.0, 0.0);
    assert_eq!(pcf_shadow_factor(&map, light_space, point, Vec3::Y, LIGHT), 1.0);
}

#[test]
fn test_ground_without_occluders_has_no_acne() {
    let light_space = ShadowProjection::from_light_position(LIGHT).light_space();
    let map = RaycastDepthMap::new(light_space, Vec::new());
    for x in [-3.0f32, -1.3, 0.0, 0.7, 2.2, 4.0] {
        for z in [-2.0f32, -0.4, 0.0, 1.9, 3.3] {
            let point = Vec3::new(x, 0.0, z);
            let factor = pcf_shadow_factor(&map, light_space, point, Vec3::Y, LIGHT);
            assert_eq!(factor, 1.0, "acne at {:?}", point);
        }
    }
}

#[test]
fn test_box_top_is_lit() {
    let (light_space, map) = scene();
    let point = Vec3::new(0.0, 2.0, 0.0);
    assert_eq!(pcf_shadow_factor(&map, light_space, point, Vec3::Y, LIGHT), 1.0);
}
