//! CPU reference of the Blinn-Phong terms evaluated by the lighting shaders.
//!
//! `directional_light.wgsl` and `point_light.wgsl` implement exactly these
//! formulas; keep the two in sync.

use glam::{Vec3, Vec4};

use crate::light::{DirectionalLight, PointLight};

/// Ambient term is `diffuse × AMBIENT_STRENGTH`.
pub const AMBIENT_STRENGTH: f32 = 0.2;

/// Geometry fragments whose sampled coverage is below this are discarded.
pub const COVERAGE_CUTOFF: f32 = 0.02;

pub fn is_covered(coverage: f32) -> bool {
    coverage >= COVERAGE_CUTOFF
}

/// One decoded G-buffer pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSample {
    pub position: Vec3,
    pub normal: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub glossiness_weight: f32,
}

/// Unattenuated diffuse and specular contributions of one light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlinnPhong {
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub distance: f32,
    pub n_dot_l: f32,
}

pub fn blinn_phong(
    surface: &SurfaceSample,
    light_position: Vec3,
    light_color: Vec3,
    eye: Vec3,
    glossiness: f32,
) -> BlinnPhong {
    let n = surface.normal.normalize_or_zero();
    let to_light = light_position - surface.position;
    let distance = to_light.length();
    let l = to_light.normalize_or_zero();
    let v = (eye - surface.position).normalize_or_zero();
    let h = (l + v).normalize_or_zero();

    let n_dot_l = n.dot(l).max(0.0);
    let diffuse = n_dot_l * surface.diffuse * light_color;

    let strength = n.dot(h).max(0.0).powf(glossiness) * surface.glossiness_weight;
    let specular = strength * light_color * surface.specular;

    BlinnPhong {
        diffuse,
        specular,
        distance,
        n_dot_l: n.dot(l),
    }
}

/// Directional pass output color for one pixel.
///
/// `ambient + shadow × (diffuse + specular) × attenuation`.
pub fn shade_directional(
    surface: &SurfaceSample,
    light: &DirectionalLight,
    eye: Vec3,
    glossiness: f32,
    shadow: f32,
) -> Vec3 {
    let ambient = surface.diffuse * AMBIENT_STRENGTH;
    let terms = blinn_phong(surface, light.position, light.color, eye, glossiness);
    let attenuation = light.attenuation(terms.distance);
    ambient + shadow * (terms.diffuse + terms.specular) * attenuation
}

/// Point pass output for one pixel: rgb is added onto the lighting target,
/// alpha is 0 outside the light radius.
pub fn shade_point(
    surface: &SurfaceSample,
    light: &PointLight,
    eye: Vec3,
    glossiness: f32,
    intensity: f32,
) -> Vec4 {
    let terms = blinn_phong(surface, light.position, light.color, eye, glossiness);
    let attenuation = light.attenuation(terms.distance);
    let color = (terms.diffuse + terms.specular) * attenuation * intensity;
    let alpha = if terms.distance > light.radius { 0.0 } else { 1.0 };
    color.extend(alpha)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_surface() -> SurfaceSample {
        SurfaceSample {
            position: Vec3::ZERO,
            normal: Vec3::Y,
            diffuse: Vec3::new(0.8, 0.6, 0.4),
            specular: Vec3::new(1.0, 1.0, 1.0),
            glossiness_weight: 0.5,
        }
    }

    #[test]
    fn test_flat_facing_light_matches_hand_computed() {
        // N = L = V = +Y, distance 1, white light, coefficients 0.09 / 0.032.
        let surface = flat_surface();
        let light = DirectionalLight {
            position: Vec3::Y,
            color: Vec3::ONE,
            linear: 0.09,
            quadratic: 0.032,
        };
        let eye = Vec3::new(0.0, 3.0, 0.0);
        let color = shade_directional(&surface, &light, eye, 32.0, 1.0);

        let attenuation = 1.0 / 1.122;
        let ambient = Vec3::new(0.16, 0.12, 0.08);
        let diffuse = Vec3::new(0.8, 0.6, 0.4);
        let specular = Vec3::splat(0.5);
        let expected = ambient + (diffuse + specular) * attenuation;
        assert!((color - expected).abs().max_element() < 1e-5, "{:?} vs {:?}", color, expected);
    }

    #[test]
    fn test_full_shadow_leaves_only_ambient() {
        let surface = flat_surface();
        let light = DirectionalLight::default();
        let color = shade_directional(&surface, &light, Vec3::new(0.0, 5.0, 5.0), 16.0, 0.0);
        assert!((color - surface.diffuse * AMBIENT_STRENGTH).abs().max_element() < 1e-6);
    }

    #[test]
    fn test_back_facing_light_has_no_direct_terms() {
        let surface = flat_surface();
        let terms = blinn_phong(&surface, Vec3::new(0.0, -2.0, 0.0), Vec3::ONE, Vec3::new(0.0, -1.0, 0.0), 8.0);
        assert_eq!(terms.diffuse, Vec3::ZERO);
        assert_eq!(terms.specular, Vec3::ZERO);
        assert_eq!(terms.distance, 2.0);
    }

    #[test]
    fn test_point_light_zero_at_and_beyond_radius() {
        let surface = flat_surface();
        let light = PointLight {
            position: Vec3::new(0.0, 2.0, 0.0),
            color: Vec3::ONE,
            radius: 2.0,
        };
        let at_edge = shade_point(&surface, &light, Vec3::new(0.0, 4.0, 0.0), 32.0, 1.0);
        assert_eq!(at_edge.truncate(), Vec3::ZERO);
        assert_eq!(at_edge.w, 1.0);

        let outside = PointLight { radius: 1.5, ..light };
        let beyond = shade_point(&surface, &outside, Vec3::new(0.0, 4.0, 0.0), 32.0, 1.0);
        assert_eq!(beyond.truncate(), Vec3::ZERO);
        assert_eq!(beyond.w, 0.0);
    }

    #[test]
    fn test_point_light_scales_with_intensity() {
        let surface = flat_surface();
        let light = PointLight {
            position: Vec3::new(0.0, 1.0, 0.0),
            color: Vec3::ONE,
            radius: 4.0,
        };
        let eye = Vec3::new(1.0, 2.0, 0.0);
        let one = shade_point(&surface, &light, eye, 32.0, 1.0);
        let three = shade_point(&surface, &light, eye, 32.0, 3.0);
        assert!((three.truncate() - one.truncate() * 3.0).abs().max_element() < 1e-5);
        assert!(one.x > 0.0);
    }

    #[test]
    fn test_coverage_cutoff() {
        assert!(!is_covered(0.0));
        assert!(!is_covered(0.019));
        assert!(is_covered(0.02));
        assert!(is_covered(1.0));
    }
}
