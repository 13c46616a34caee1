use glam::{Mat4, Vec3};

/// The single shadow-casting light.
///
/// `position` is both the shadow viewpoint (looking at the origin) and the
/// Blinn-Phong light source position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub position: Vec3,
    pub color: Vec3,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            position: Vec3::new(-2.5, 5.0, -1.25),
            color: Vec3::ONE,
            linear: 0.09,
            quadratic: 0.032,
        }
    }
}

impl DirectionalLight {
    /// `1 / (1 + linear·d + quadratic·d²)`.
    pub fn attenuation(&self, distance: f32) -> f32 {
        directional_attenuation(distance, self.linear, self.quadratic)
    }
}

/// A local light shaded through its bounding volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub radius: f32,
}

impl PointLight {
    /// Instance transform for the light volume. Translation only; the
    /// vertex stage applies the radius as a uniform scale.
    pub fn transform(&self) -> Mat4 {
        Mat4::from_translation(self.position)
    }

    /// Scale applied to the unit light-volume mesh.
    ///
    /// Equal to the radius so attenuation reaches zero exactly on the
    /// volume boundary.
    pub fn volume_scale(&self) -> f32 {
        self.radius
    }

    pub fn attenuation(&self, distance: f32) -> f32 {
        point_attenuation(distance, self.radius)
    }
}

pub fn directional_attenuation(distance: f32, linear: f32, quadratic: f32) -> f32 {
    1.0 / (1.0 + linear * distance + quadratic * distance * distance)
}

/// Hermite smoothstep, same definition as GLSL/WGSL `smoothstep`.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// `1 − smoothstep(0, 1, clamp(d / radius, 0, 1))⁴`.
///
/// 1.0 at the light, exactly 0.0 at `distance >= radius`.
pub fn point_attenuation(distance: f32, radius: f32) -> f32 {
    if radius <= 0.0 {
        return 0.0;
    }
    let s = smoothstep(0.0, 1.0, (distance / radius).clamp(0.0, 1.0));
    1.0 - s.powi(4)
}
