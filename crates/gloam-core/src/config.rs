//! Renderer configuration (YAML).
//!
//! Every field has a default, so an empty file or a missing section yields
//! the reference setup: a 1600×900 window, an 8×8×3 light grid, a 2048²
//! shadow map and the directional light at (−2.5, 5, −1.25).

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::Deserialize;

use crate::light::DirectionalLight;
use crate::light_grid::LightGridParams;
use crate::shadow::DEFAULT_SHADOW_MAP_RESOLUTION;

/// Upper bound on light-grid size; the instance buffer is sized from this.
pub const MAX_POINT_LIGHTS: usize = 16384;

pub const MAX_SHADOW_MAP_RESOLUTION: u32 = 8192;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RenderConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub light_grid: LightGridConfig,
    #[serde(default)]
    pub lighting: LightingConfig,
    #[serde(default)]
    pub shadows: ShadowConfig,
    #[serde(default)]
    pub debug: DebugConfig,
    #[serde(default)]
    pub scene: SceneConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_true")]
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            vsync: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LightGridConfig {
    #[serde(default = "default_grid_width")]
    pub width: u32,
    #[serde(default = "default_grid_height")]
    pub height: u32,
    #[serde(default = "default_radius")]
    pub radius: f32,
    #[serde(default = "default_separation")]
    pub separation: f32,
    #[serde(default = "default_vertical_offset")]
    pub vertical_offset: f32,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for LightGridConfig {
    fn default() -> Self {
        Self {
            width: default_grid_width(),
            height: default_grid_height(),
            radius: default_radius(),
            separation: default_separation(),
            vertical_offset: default_vertical_offset(),
            seed: None,
        }
    }
}

impl LightGridConfig {
    pub fn params(&self) -> LightGridParams {
        LightGridParams {
            width: self.width,
            height: self.height,
            radius: self.radius,
            separation: self.separation,
            vertical_offset: self.vertical_offset,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LightingConfig {
    #[serde(default = "default_one")]
    pub intensity: f32,
    #[serde(default = "default_glossiness")]
    pub glossiness: f32,
    #[serde(default = "default_linear")]
    pub linear: f32,
    #[serde(default = "default_quadratic")]
    pub quadratic: f32,
    #[serde(default)]
    pub directional: DirectionalConfig,
    /// Orbit the directional light around the scene.
    #[serde(default)]
    pub animate: bool,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            intensity: 1.0,
            glossiness: default_glossiness(),
            linear: default_linear(),
            quadratic: default_quadratic(),
            directional: DirectionalConfig::default(),
            animate: false,
        }
    }
}

impl LightingConfig {
    pub fn directional_light(&self) -> DirectionalLight {
        DirectionalLight {
            position: Vec3::from_array(self.directional.position),
            color: Vec3::from_array(self.directional.color),
            linear: self.linear,
            quadratic: self.quadratic,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectionalConfig {
    #[serde(default = "default_light_position")]
    pub position: [f32; 3],
    #[serde(default = "default_light_color")]
    pub color: [f32; 3],
}

impl Default for DirectionalConfig {
    fn default() -> Self {
        Self {
            position: default_light_position(),
            color: default_light_color(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShadowConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_shadow_resolution")]
    pub resolution: u32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            resolution: default_shadow_resolution(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DebugConfig {
    #[serde(default)]
    pub wireframe_volumes: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SceneConfig {
    /// PNG used as the demo ground's diffuse texture.
    #[serde(default)]
    pub ground_texture: Option<PathBuf>,
}

fn default_width() -> u32 {
    1600
}
fn default_height() -> u32 {
    900
}
fn default_true() -> bool {
    true
}
fn default_grid_width() -> u32 {
    8
}
fn default_grid_height() -> u32 {
    3
}
fn default_radius() -> f32 {
    1.5
}
fn default_separation() -> f32 {
    1.2
}
fn default_vertical_offset() -> f32 {
    0.25
}
fn default_one() -> f32 {
    1.0
}
fn default_glossiness() -> f32 {
    32.0
}
fn default_linear() -> f32 {
    0.09
}
fn default_quadratic() -> f32 {
    0.032
}
fn default_light_position() -> [f32; 3] {
    [-2.5, 5.0, -1.25]
}
fn default_light_color() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}
fn default_shadow_resolution() -> u32 {
    DEFAULT_SHADOW_MAP_RESOLUTION
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_yaml::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error reading config: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl RenderConfig {
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: RenderConfig = serde_yaml::from_str(contents).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let grid = &self.light_grid;
        if grid.width == 0 || grid.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "light_grid counts must be positive, got {}x{}x{}",
                grid.width, grid.width, grid.height
            )));
        }
        let count = grid.params().light_count();
        if count > MAX_POINT_LIGHTS {
            return Err(ConfigError::Invalid(format!(
                "light_grid has {} lights, maximum is {}",
                count, MAX_POINT_LIGHTS
            )));
        }
        if !is_positive(grid.radius) || !is_positive(grid.separation) {
            return Err(ConfigError::Invalid(
                "light_grid radius and separation must be positive".to_string(),
            ));
        }
        if !grid.vertical_offset.is_finite() {
            return Err(ConfigError::Invalid(
                "light_grid.vertical_offset must be finite".to_string(),
            ));
        }

        let lighting = &self.lighting;
        if !is_positive(lighting.glossiness) {
            return Err(ConfigError::Invalid("lighting.glossiness must be positive".to_string()));
        }
        if [lighting.intensity, lighting.linear, lighting.quadratic]
            .into_iter()
            .any(|v| !is_non_negative(v))
        {
            return Err(ConfigError::Invalid(
                "lighting intensity and attenuation coefficients must be non-negative".to_string(),
            ));
        }
        let directional = &lighting.directional;
        if directional
            .position
            .iter()
            .chain(&directional.color)
            .any(|v| !v.is_finite())
        {
            return Err(ConfigError::Invalid(
                "lighting.directional position and color must be finite".to_string(),
            ));
        }

        let resolution = self.shadows.resolution;
        if resolution == 0 || resolution > MAX_SHADOW_MAP_RESOLUTION {
            return Err(ConfigError::Invalid(format!(
                "shadows.resolution must be in 1..={}, got {}",
                MAX_SHADOW_MAP_RESOLUTION, resolution
            )));
        }
        Ok(())
    }
}

/// Finite and above zero. NaN fails.
fn is_positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

fn is_non_negative(value: f32) -> bool {
    value.is_finite() && value >= 0.0
}

/// Load, parse and validate a config file.
pub fn load_config(path: &Path) -> Result<RenderConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config = RenderConfig::from_yaml(&contents)?;
    tracing::info!(
        "Loaded config {:?}: {}x{}x{} lights, shadows {}",
        path,
        config.light_grid.width,
        config.light_grid.width,
        config.light_grid.height,
        if config.shadows.enabled { "on" } else { "off" }
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = RenderConfig::from_yaml("{}").unwrap();
        assert_eq!(config.window.width, 1600);
        assert_eq!(config.window.height, 900);
        assert_eq!(config.shadows.resolution, 2048);
        assert!(config.shadows.enabled);
        assert!(!config.debug.wireframe_volumes);
        assert!(config.scene.ground_texture.is_none());
        assert_eq!(config.lighting.linear, 0.09);
        assert_eq!(config.lighting.quadratic, 0.032);
        let light = config.lighting.directional_light();
        assert_eq!(light.position, Vec3::new(-2.5, 5.0, -1.25));
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
window:
  width: 800
  height: 600
  vsync: false
light_grid:
  width: 4
  height: 2
  radius: 2.0
  separation: 1.0
  vertical_offset: 1.0
  seed: 11
lighting:
  intensity: 2.5
  glossiness: 64.0
  linear: 0.14
  quadratic: 0.07
  directional:
    position: [1.0, 6.0, 2.0]
    color: [1.0, 0.9, 0.8]
  animate: true
shadows:
  enabled: false
  resolution: 1024
debug:
  wireframe_volumes: true
scene:
  ground_texture: textures/ground.png
"#;
        let config = RenderConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.window.width, 800);
        assert!(!config.window.vsync);
        assert_eq!(config.light_grid.params().light_count(), 32);
        assert_eq!(config.light_grid.seed, Some(11));
        assert_eq!(config.lighting.intensity, 2.5);
        assert!(config.lighting.animate);
        assert!(!config.shadows.enabled);
        assert_eq!(config.shadows.resolution, 1024);
        assert!(config.debug.wireframe_volumes);
        assert_eq!(
            config.scene.ground_texture.as_deref(),
            Some(Path::new("textures/ground.png"))
        );
        assert_eq!(config.lighting.directional_light().color, Vec3::new(1.0, 0.9, 0.8));
    }

    #[test]
    fn test_rejects_invalid_values() {
        for yaml in [
            "light_grid: { width: 0 }",
            "light_grid: { width: 200, height: 1 }",
            "light_grid: { width: 4294967295, height: 4294967295 }",
            "light_grid: { radius: 0.0 }",
            "light_grid: { radius: .nan }",
            "light_grid: { separation: .inf }",
            "light_grid: { vertical_offset: .nan }",
            "lighting: { glossiness: 0.0 }",
            "lighting: { glossiness: .nan }",
            "lighting: { linear: -1.0 }",
            "lighting: { quadratic: .nan }",
            "lighting: { intensity: .inf }",
            "lighting: { directional: { position: [.nan, 1.0, 0.0] } }",
            "shadows: { resolution: 0 }",
            "shadows: { resolution: 16384 }",
        ] {
            match RenderConfig::from_yaml(yaml) {
                Err(ConfigError::Invalid(_)) => {}
                other => panic!("Expected Invalid for '{}', got {:?}", yaml, other),
            }
        }
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gloam.yaml");
        std::fs::write(&path, "lighting:\n  glossiness: 8.0\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.lighting.glossiness, 8.0);

        let missing = dir.path().join("missing.yaml");
        assert!(matches!(load_config(&missing), Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config =
            RenderConfig::from_yaml(include_str!("../../../config/gloam.yaml")).unwrap();
        let defaults = RenderConfig::default();
        assert_eq!(config.window.width, defaults.window.width);
        assert_eq!(config.light_grid.params(), defaults.light_grid.params());
        assert_eq!(config.light_grid.seed, Some(7));
        assert_eq!(
            config.lighting.directional_light(),
            defaults.lighting.directional_light()
        );
        assert_eq!(config.shadows.resolution, defaults.shadows.resolution);
    }

    #[test]
    fn test_malformed_yaml() {
        assert!(matches!(
            RenderConfig::from_yaml("window: [1, 2"),
            Err(ConfigError::Parse(_))
        ));
    }
}
