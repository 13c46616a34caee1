//! Shadow-map projection and the CPU reference of 8-tap Poisson PCF.

use glam::{Mat4, Vec2, Vec3};

pub const SHADOW_NEAR: f32 = 1.0;
pub const SHADOW_FAR: f32 = 10.0;
/// Half-size of the orthographic shadow frustum on both axes.
pub const SHADOW_EXTENT: f32 = 10.0;
pub const DEFAULT_SHADOW_MAP_RESOLUTION: u32 = 2048;

pub const PCF_TAPS: usize = 8;

/// Tap offsets in texels. Mirrored in `directional_light.wgsl`.
pub const POISSON_DISK: [Vec2; PCF_TAPS] = [
    Vec2::new(-0.942_016_24, -0.399_062_16),
    Vec2::new(0.945_586_1, -0.768_907_25),
    Vec2::new(-0.094_184_1, -0.929_388_7),
    Vec2::new(0.344_959_38, 0.293_877_6),
    Vec2::new(-0.915_885_8, 0.457_714_32),
    Vec2::new(-0.815_442_3, -0.879_124_64),
    Vec2::new(-0.382_775_43, 0.276_768_45),
    Vec2::new(0.974_843_98, 0.756_483_8),
];

/// Orthographic light camera looking from the light toward the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowProjection {
    pub projection: Mat4,
    pub view: Mat4,
}

impl ShadowProjection {
    pub fn from_light_position(light_position: Vec3) -> Self {
        let eye = if light_position.length_squared() < 1e-8 {
            tracing::warn!("Directional light at the origin; shadow view falls back to +Y");
            Vec3::Y
        } else {
            light_position
        };
        // look_at degenerates when the view direction is parallel to up
        let up = if eye.normalize().cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let view = Mat4::look_at_rh(eye, Vec3::ZERO, up);
        let projection = Mat4::orthographic_rh(
            -SHADOW_EXTENT,
            SHADOW_EXTENT,
            -SHADOW_EXTENT,
            SHADOW_EXTENT,
            SHADOW_NEAR,
            SHADOW_FAR,
        );
        Self { projection, view }
    }

    /// projection × view
    pub fn light_space(&self) -> Mat4 {
        self.projection * self.view
    }
}

/// A world position expressed in shadow-map coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSpacePoint {
    /// Texture coordinate, origin top-left.
    pub uv: Vec2,
    /// Depth in [0, 1] inside the frustum.
    pub depth: f32,
}

pub fn project_to_light_space(light_space: Mat4, world: Vec3) -> LightSpacePoint {
    let ndc = light_space.project_point3(world);
    LightSpacePoint {
        uv: Vec2::new(ndc.x * 0.5 + 0.5, -ndc.y * 0.5 + 0.5),
        depth: ndc.z,
    }
}

/// Slope-scaled comparison bias: `max(0.05·(1 − N·L), 0.005)`.
pub fn shadow_bias(n_dot_l: f32) -> f32 {
    (0.05 * (1.0 - n_dot_l)).max(0.005)
}

/// Anything the PCF filter can read depth from.
pub trait DepthMap {
    /// Texels along one side (the map is square).
    fn resolution(&self) -> u32;

    /// Stored depth at `uv` using nearest-texel lookup, clamped to the edge.
    fn sample(&self, uv: Vec2) -> f32;
}

/// Visible fraction of the 8 Poisson taps, in [0, 1].
///
/// Returns 1.0 for points beyond the far plane of the shadow frustum.
pub fn pcf_shadow_factor<M: DepthMap + ?Sized>(
    map: &M,
    light_space: Mat4,
    world: Vec3,
    normal: Vec3,
    light_position: Vec3,
) -> f32 {
    let point = project_to_light_space(light_space, world);
    if point.depth > 1.0 {
        return 1.0;
    }

    let n_dot_l = normal
        .normalize_or_zero()
        .dot((light_position - world).normalize_or_zero());
    let bias = shadow_bias(n_dot_l);
    let texel = 1.0 / map.resolution().max(1) as f32;

    let visible = POISSON_DISK
        .iter()
        .filter(|offset| point.depth - bias <= map.sample(point.uv + **offset * texel))
        .count();

    visible as f32 / PCF_TAPS as f32
}

/// Texel index for `uv` in a `resolution`-wide map with clamp-to-edge
/// addressing and nearest filtering.
pub fn nearest_texel(uv: Vec2, resolution: u32) -> (u32, u32) {
    let max = resolution.saturating_sub(1);
    let to_index = |c: f32| ((c * resolution as f32).floor().max(0.0) as u32).min(max);
    (to_index(uv.x), to_index(uv.y))
}

/// Texel center in uv space.
pub fn texel_center(x: u32, y: u32, resolution: u32) -> Vec2 {
    Vec2::new(
        (x as f32 + 0.5) / resolution as f32,
        (y as f32 + 0.5) / resolution as f32,
    )
}
