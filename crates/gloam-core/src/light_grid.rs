//! Procedural lattice of point lights.
//!
//! Lights sit on a `width × height × width` lattice (x, y, z) centered on the
//! origin horizontally and stacked upward from `vertical_offset`. Each light
//! gets a small horizontal polar jitter and a random pastel color.

use std::f32::consts::TAU;

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::light::PointLight;

/// Maximum jitter distance from a lattice cell center.
pub const MAX_JITTER: f32 = 0.5;

/// Pastel color channels are drawn from `[PASTEL_MIN, 1.0]`.
pub const PASTEL_MIN: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightGridParams {
    /// Lights along x and along z.
    pub width: u32,
    /// Lights along y.
    pub height: u32,
    pub radius: f32,
    /// Spacing between neighbouring cells, as a multiple of the light diameter.
    pub separation: f32,
    pub vertical_offset: f32,
}

impl Default for LightGridParams {
    fn default() -> Self {
        Self {
            width: 8,
            height: 3,
            radius: 1.5,
            separation: 1.2,
            vertical_offset: 0.25,
        }
    }
}

impl LightGridParams {
    /// `width × width × height`, saturating at `usize::MAX`.
    pub fn light_count(&self) -> usize {
        (self.width as usize)
            .saturating_mul(self.width as usize)
            .saturating_mul(self.height as usize)
    }

    /// Distance between neighbouring lattice cells.
    pub fn spacing(&self) -> f32 {
        2.0 * self.radius * self.separation
    }

    /// Unjittered center of lattice cell `(x, y, z)`.
    pub fn cell_center(&self, x: u32, y: u32, z: u32) -> Vec3 {
        let half = (self.width as f32 - 1.0) * 0.5;
        let spacing = self.spacing();
        Vec3::new(
            (x as f32 - half) * spacing,
            self.vertical_offset + y as f32 * spacing,
            (z as f32 - half) * spacing,
        )
    }
}

/// Point lights built once at startup.
#[derive(Debug, Clone)]
pub struct LightGrid {
    params: LightGridParams,
    lights: Vec<PointLight>,
}

impl LightGrid {
    /// Build a grid. `Some(seed)` reproduces the same jitter and colors.
    pub fn generate(params: LightGridParams, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::build(params, &mut rng)
    }

    pub fn build<R: Rng + ?Sized>(params: LightGridParams, rng: &mut R) -> Self {
        let mut lights = Vec::with_capacity(params.light_count());

        for y in 0..params.height {
            for z in 0..params.width {
                for x in 0..params.width {
                    let angle = rng.gen_range(0.0..TAU);
                    let length = rng.gen_range(0.0..=MAX_JITTER);
                    let jitter = Vec3::new(angle.cos() * length, 0.0, angle.sin() * length);

                    let color = Vec3::new(
                        rng.gen_range(PASTEL_MIN..=1.0),
                        rng.gen_range(PASTEL_MIN..=1.0),
                        rng.gen_range(PASTEL_MIN..=1.0),
                    );

                    lights.push(PointLight {
                        position: params.cell_center(x, y, z) + jitter,
                        color,
                        radius: params.radius,
                    });
                }
            }
        }

        tracing::info!(
            "Built light grid: {}x{}x{} = {} lights (radius {}, spacing {:.2})",
            params.width,
            params.width,
            params.height,
            lights.len(),
            params.radius,
            params.spacing()
        );

        Self { params, lights }
    }

    pub fn params(&self) -> &LightGridParams {
        &self.params
    }

    pub fn lights(&self) -> &[PointLight] {
        &self.lights
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    /// Lattice cell center of the light at `index` (build order: x fastest,
    /// then z, then y).
    pub fn cell_center_of(&self, index: usize) -> Vec3 {
        let w = self.params.width as usize;
        let x = index % w;
        let z = (index / w) % w;
        let y = index / (w * w);
        self.params.cell_center(x as u32, y as u32, z as u32)
    }
}
